//! Text measurement: providers, the store they are cached in, and the cache itself.

mod cache;
mod deterministic;
mod process;
mod store;


use async_trait::async_trait;
use tagbadge_core::TextSize;

pub use cache::{MetricsCache, MetricsCacheOptions, cache_key};
pub use deterministic::{DeterministicTextMetricsProvider, FixedTextMetricsProvider};
pub use process::{ProcessProviderOptions, ProcessTextMetricsProvider, parse_text_size_output};
pub use store::{InMemoryMetricsStore, JsonFileMetricsStore, MetricsStore};

/// Headless measurements come out about 1.2x smaller than the same badge in Firefox or
/// Chrome; raw sizes are scaled by this factor in both axes.
pub const MEASUREMENT_CORRECTION: f64 = 1.2;

/// Text size assumed when no measurement is available.
pub const FALLBACK_TEXT_SIZE: TextSize = TextSize::new(40.0, 12.0);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeasurementError {
    #[error("text metrics provider is unreachable: {message}")]
    Unreachable { message: String },

    #[error("text metrics provider returned unparseable output: {output:?}")]
    Unparseable { output: String },

    #[error("text metrics provider timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("selector {selector:?} matched no measurable element")]
    Selector { selector: String },
}

impl MeasurementError {
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }

    pub fn unparseable(output: impl Into<String>) -> Self {
        Self::Unparseable {
            output: output.into(),
        }
    }
}

/// Out-of-process (or otherwise expensive) text bounding-box oracle.
///
/// Implementations return the raw bounding box of the first element matching `selector` once
/// `markup` is rendered. Correction and caching happen in [`MetricsCache`].
#[async_trait]
pub trait TextMetricsProvider: Send + Sync {
    async fn measure_raw(
        &self,
        markup: &str,
        selector: &str,
    ) -> std::result::Result<TextSize, MeasurementError>;
}
