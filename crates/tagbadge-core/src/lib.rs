#![forbid(unsafe_code)]

//! Badge data model (headless).
//!
//! Records, grid configuration, and the quantized color scale shared by the layout calculator
//! and the SVG renderer. Nothing here measures text or emits markup.

pub mod color;
pub mod config;
pub mod error;
pub mod model;

pub use color::{BADGE_PALETTE, ColorScale, DEFAULT_CONTENT_COLOR, TITLE_COLOR};
pub use config::{LayoutConfig, Margin};
pub use error::{Error, Result};
pub use model::{BadgeRecord, Displayable, TextSize, fmt_number, format_percent, write_number};
