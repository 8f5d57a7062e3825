use crate::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margin {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Margin {
    pub const fn uniform(v: f64) -> Self {
        Self {
            left: v,
            right: v,
            top: v,
            bottom: v,
        }
    }
}

/// Grid arrangement of the badges on the canvas.
///
/// The row count is never configured; it follows from the record count (see
/// [`LayoutConfig::row_count`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub margin: Margin,
    pub column_count: usize,
    pub column_padding: f64,
    pub row_padding: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self::legacy_grid()
    }
}

impl LayoutConfig {
    /// The five-column grid of the first badge wall: 15px between columns, 10px between rows,
    /// no outer margin.
    pub const fn legacy_grid() -> Self {
        Self {
            margin: Margin::uniform(0.0),
            column_count: 5,
            column_padding: 15.0,
            row_padding: 10.0,
        }
    }

    /// One badge per row, for embedding next to prose.
    pub const fn single_column() -> Self {
        Self {
            margin: Margin::uniform(0.0),
            column_count: 1,
            column_padding: 0.0,
            row_padding: 4.0,
        }
    }

    pub fn with_columns(mut self, column_count: usize) -> Self {
        self.column_count = column_count;
        self
    }

    pub fn with_margin(mut self, margin: Margin) -> Self {
        self.margin = margin;
        self
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.column_count < 1 {
            return Err(Error::invalid_layout("columnCount must be at least 1"));
        }
        let lengths = [
            ("columnPadding", self.column_padding),
            ("rowPadding", self.row_padding),
            ("margin.left", self.margin.left),
            ("margin.right", self.margin.right),
            ("margin.top", self.margin.top),
            ("margin.bottom", self.margin.bottom),
        ];
        for (name, v) in lengths {
            if !v.is_finite() || v < 0.0 {
                return Err(Error::invalid_layout(format!(
                    "{name} must be a finite non-negative length (got {v})"
                )));
            }
        }
        Ok(())
    }

    /// `ceil(record_count / column_count)`; zero columns yield zero rows.
    pub fn row_count(&self, record_count: usize) -> usize {
        if self.column_count == 0 {
            return 0;
        }
        record_count.div_ceil(self.column_count)
    }
}
