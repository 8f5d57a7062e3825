#![forbid(unsafe_code)]

//! `tagbadge` renders walls of shields-style badges as standalone SVG documents.
//!
//! Badge boxes are sized from measured text: the title and a value probe are measured through
//! a cached, pluggable text-metrics oracle, then every record is laid out on a fixed-column grid.
//!
//! # Features
//!
//! - `render` (default): the measurement-driven pipeline (`tagbadge::render`)
//! - `usvg`: a text-metrics provider backed by `usvg` and system fonts

pub use tagbadge_core::*;

#[cfg(feature = "render")]
pub mod render;
