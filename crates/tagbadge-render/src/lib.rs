#![forbid(unsafe_code)]

//! Measurement-driven badge layout and SVG output.
//!
//! [`text`] measures title/value probes through a cached oracle, [`layout`] turns the measured
//! sizes into a badge grid, and [`svg`] writes the grid out as a standalone document.

pub mod layout;
pub mod svg;
pub mod text;

pub use layout::{BOX_PADDING_X, BOX_PADDING_Y, BadgeGeometry, GridPosition, compute_layout};
pub use svg::{
    ContentFill, ContentFillStrategy, FillContext, SvgDocument, SvgRenderOptions,
    render_badges_svg, render_probe_svg,
};
pub use text::{
    MeasurementError, MetricsCache, MetricsCacheOptions, MetricsStore, TextMetricsProvider,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] tagbadge_core::Error),
    #[error("text measurement failed: {0}")]
    Measurement(#[from] MeasurementError),
    #[error("metrics store error: {message}")]
    Store { message: String },
    #[error("metrics store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
