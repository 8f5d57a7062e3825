pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("at least one badge record is required")]
    EmptyDataset,

    #[error("invalid layout configuration: {message}")]
    InvalidLayout { message: String },

    #[error("badge data JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid_layout(message: impl Into<String>) -> Self {
        Self::InvalidLayout {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            Error::invalid_layout("x")
                .to_string()
                .contains("invalid layout configuration:")
        );
        assert!(Error::EmptyDataset.to_string().contains("badge record"));
    }
}
