//! Shields-style badge grid SVG output.
//!
//! Badges follow the two-segment shields.io layout (see
//! <https://github.com/badges/shields/blob/master/spec/SPECIFICATION.md>): a dark title half, a
//! colored value half, rounded corners through a mask, a top-down sheen gradient, and text
//! drawn twice for an engraved look.

pub mod fill;
mod util;

use crate::layout::BadgeGeometry;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tagbadge_core::{BadgeRecord, ColorScale, DEFAULT_CONTENT_COLOR, TITLE_COLOR};

pub use fill::{ContentFill, ContentFillStrategy, FillContext, push_shadowed_text};

pub const TITLE_TEXT_CLASS: &str = "title_text";
pub const VALUE_TEXT_CLASS: &str = "value_text";
pub const TITLE_TEXT_SELECTOR: &str = ".title_text";
pub const VALUE_TEXT_SELECTOR: &str = ".value_text";

/// Corner radius of the badge mask.
pub const CORNER_RADIUS: f64 = 3.0;
/// Horizontal offset of the title text inside the title box.
pub const TITLE_TEXT_X: f64 = 6.0;

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SvgRenderOptions {
    pub font_family: String,
    pub font_size: f64,
    /// Stylesheets pulled in with `@import` so the viewer has the measured font.
    pub font_urls: Vec<String>,
    pub title_color: String,
    pub default_content_color: String,
    /// Prefix for gradient/mask ids, for pages that inline several badge walls.
    pub id_prefix: Option<String>,
}

impl Default for SvgRenderOptions {
    fn default() -> Self {
        Self {
            font_family: "Open Sans".to_string(),
            font_size: 11.0,
            font_urls: vec!["http://fonts.googleapis.com/css?family=Open+Sans".to_string()],
            title_color: TITLE_COLOR.to_string(),
            default_content_color: DEFAULT_CONTENT_COLOR.to_string(),
            id_prefix: None,
        }
    }
}

impl SvgRenderOptions {
    fn element_id(&self, kind: &str, index: usize) -> String {
        match self.id_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}-{kind}{index}"),
            _ => format!("{kind}{index}"),
        }
    }
}

/// A complete, standalone SVG document.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgDocument {
    pub width: f64,
    pub height: f64,
    pub markup: String,
}

impl SvgDocument {
    pub fn into_string(self) -> String {
        self.markup
    }

    pub fn as_str(&self) -> &str {
        &self.markup
    }
}

impl std::fmt::Display for SvgDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.markup)
    }
}

fn push_svg_open(out: &mut String, width: f64, height: f64) {
    let _ = write!(
        out,
        r#"<svg xmlns="{SVG_NS}" xmlns:xlink="{XLINK_NS}" width="{w}" height="{h}">"#,
        w = util::fmt(width),
        h = util::fmt(height),
    );
}

fn push_font_style(out: &mut String, options: &SvgRenderOptions) {
    if options.font_urls.is_empty() {
        return;
    }
    out.push_str("<style>");
    for (i, url) in options.font_urls.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str("@import url(");
        util::escape_xml_into(out, url);
        out.push_str(");");
    }
    out.push_str("</style>");
}

fn push_font_group_open(out: &mut String, options: &SvgRenderOptions, transform_x: Option<f64>) {
    let _ = write!(
        out,
        r##"<g font-size="{size}" font-family="{family}" text-anchor="start" fill="#fff""##,
        size = util::fmt(options.font_size),
        family = util::escape_xml(&options.font_family),
    );
    if let Some(x) = transform_x {
        let _ = write!(out, r#" transform="translate({},0)""#, util::fmt(x));
    }
    out.push('>');
}

/// Standalone document holding a single text element, used to measure `text` with the same
/// font setup as the final badges.
pub fn render_probe_svg(text: &str, class: &str, options: &SvgRenderOptions) -> String {
    let mut out = String::new();
    push_svg_open(&mut out, 0.0, 0.0);
    push_font_style(&mut out, options);
    let _ = write!(
        &mut out,
        r#"<text class="{class}" font-size="{size}" font-family="{family}" text-anchor="start">"#,
        class = util::escape_xml(class),
        size = util::fmt(options.font_size),
        family = util::escape_xml(&options.font_family),
    );
    util::escape_xml_into(&mut out, text);
    out.push_str("</text></svg>");
    out
}

/// Renders every record as a badge on the grid described by `geometry`.
///
/// Fails without producing any markup when `records` is empty or does not match the record
/// count the geometry was computed for.
pub fn render_badges_svg(
    records: &[BadgeRecord],
    title: &str,
    geometry: &BadgeGeometry,
    color_scale: Option<&ColorScale>,
    fill: &ContentFill,
    options: &SvgRenderOptions,
) -> Result<SvgDocument> {
    if records.is_empty() {
        return Err(Error::Core(tagbadge_core::Error::EmptyDataset));
    }
    if records.len() != geometry.record_count {
        return Err(Error::Core(tagbadge_core::Error::invalid_layout(format!(
            "geometry was computed for {} records, got {}",
            geometry.record_count,
            records.len()
        ))));
    }

    let tw = geometry.title_box.width;
    let th = geometry.title_box.height;
    let cw = geometry.content_box.width;
    let ch = geometry.content_box.height;

    let mut out = String::with_capacity(1024 + records.len() * 1400);
    push_svg_open(&mut out, geometry.total_width, geometry.total_height);
    push_font_style(&mut out, options);

    for (i, record) in records.iter().enumerate() {
        let pos = geometry.position(i);
        let gradient_id = options.element_id("gradient", i);
        let mask_id = options.element_id("mask", i);
        let content_color = record
            .numeric_value()
            .and_then(|v| color_scale.and_then(|s| s.color_for(v)))
            .unwrap_or(options.default_content_color.as_str());

        let _ = write!(
            &mut out,
            r#"<g class="badge" transform="translate({x},{y})"><g>"#,
            x = util::fmt(pos.x),
            y = util::fmt(pos.y),
        );

        let _ = write!(
            &mut out,
            r##"<defs><linearGradient id="{gradient_id}" y2="100%" x2="0"><stop stop-opacity=".1" stop-color="#bbb" offset="0"/><stop stop-opacity=".1" offset="1"/></linearGradient></defs>"##,
            gradient_id = util::escape_xml(&gradient_id),
        );
        let _ = write!(
            &mut out,
            r##"<mask id="{mask_id}"><rect fill="#fff" rx="{rx}" height="{h}" width="{w}"/></mask>"##,
            mask_id = util::escape_xml(&mask_id),
            rx = util::fmt(CORNER_RADIUS),
            h = util::fmt(th),
            w = util::fmt(tw + cw),
        );

        let _ = write!(
            &mut out,
            r#"<g mask="url(#{mask_id})">"#,
            mask_id = util::escape_xml(&mask_id),
        );
        let _ = write!(
            &mut out,
            r#"<path d="M 0 0 h {tw} v {th} H 0 z" fill="{fill}"/>"#,
            tw = util::fmt(tw),
            th = util::fmt(th),
            fill = util::escape_xml(&options.title_color),
        );
        let _ = write!(
            &mut out,
            r#"<path d="M {tw} 0 h {cw} v {ch} H {tw} z" fill="{fill}"/>"#,
            tw = util::fmt(tw),
            cw = util::fmt(cw),
            ch = util::fmt(ch),
            fill = util::escape_xml(content_color),
        );
        let _ = write!(
            &mut out,
            r#"<path d="M 0 0 h {w} v {th} H 0 z" fill="url(#{gradient_id})"/>"#,
            w = util::fmt(tw + cw),
            th = util::fmt(th),
            gradient_id = util::escape_xml(&gradient_id),
        );
        out.push_str("</g>");

        push_font_group_open(&mut out, options, None);
        push_shadowed_text(&mut out, TITLE_TEXT_CLASS, TITLE_TEXT_X, th, title);
        out.push_str("</g>");

        push_font_group_open(&mut out, options, Some(tw));
        fill.fill(
            &mut out,
            &FillContext {
                index: i,
                content_box: geometry.content_box,
                record,
            },
        );
        out.push_str("</g>");

        out.push_str("</g></g>");
    }

    out.push_str("</svg>\n");
    tracing::debug!(
        records = records.len(),
        rows = geometry.row_count,
        width = geometry.total_width,
        height = geometry.total_height,
        bytes = out.len(),
        "rendered badge grid"
    );

    Ok(SvgDocument {
        width: geometry.total_width,
        height: geometry.total_height,
        markup: out,
    })
}
