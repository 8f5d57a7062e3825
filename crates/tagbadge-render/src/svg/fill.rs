//! Content fill strategies for the value half of a badge.
//!
//! The renderer opens a `<g>` already translated to the content box origin and hands it to the
//! strategy. Strategies only write inside that group.

use super::util::{escape_xml_into, fmt, fmt_fraction, fmt_seconds};
use std::fmt::Write as _;
use std::sync::Arc;
use tagbadge_core::{BadgeRecord, TextSize};

/// Fraction of an item's time slice spent fading in.
pub const CYCLE_ATTACK: f64 = 0.2;
/// Fraction of an item's time slice spent fully visible.
pub const CYCLE_SUSTAIN: f64 = 0.6;
/// Fraction of an item's time slice spent fading out.
pub const CYCLE_RELEASE: f64 = 0.2;

/// Inset of the bar outline from the content box edges.
pub const BAR_INSET: f64 = 3.0;
/// Content width used for bar strategies instead of a measured value width.
pub const BAR_CONTENT_WIDTH: f64 = 12.0;
pub const SWEEP_CONTENT_WIDTH: f64 = 60.0;

pub const DEFAULT_SWEEP_PERIOD_S: f64 = 2.0;
pub const DEFAULT_CYCLE_PERIOD_S: f64 = 6.0;

/// Horizontal text offset inside the content group.
pub const CONTENT_TEXT_X: f64 = 4.0;

/// What a strategy sees for one badge.
#[derive(Debug, Clone, Copy)]
pub struct FillContext<'a> {
    pub index: usize,
    pub content_box: TextSize,
    pub record: &'a BadgeRecord,
}

/// Custom value renderer.
pub trait ContentFillStrategy: Send + Sync {
    fn fill(&self, out: &mut String, ctx: &FillContext<'_>);

    /// Fixed content width, if the strategy does not size itself from the value text.
    fn content_width(&self) -> Option<f64> {
        None
    }
}

/// Built-in fill strategies, with [`ContentFill::Text`] as the default.
#[derive(Clone, Default)]
pub enum ContentFill {
    #[default]
    Text,
    /// Vertical bar filled bottom-up by the record's `0..=1` value.
    PercentBar,
    /// Horizontal bar growing from empty to full; one sweep takes `period_s / value` seconds.
    Sweep { period_s: f64 },
    /// Shows the record's list items one at a time, each for `period_s / n` seconds.
    Cycle { period_s: f64 },
    Custom(Arc<dyn ContentFillStrategy>),
}

impl std::fmt::Debug for ContentFill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => f.write_str("Text"),
            Self::PercentBar => f.write_str("PercentBar"),
            Self::Sweep { period_s } => f.debug_struct("Sweep").field("period_s", period_s).finish(),
            Self::Cycle { period_s } => f.debug_struct("Cycle").field("period_s", period_s).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl ContentFill {
    pub fn sweep() -> Self {
        Self::Sweep {
            period_s: DEFAULT_SWEEP_PERIOD_S,
        }
    }

    pub fn cycle() -> Self {
        Self::Cycle {
            period_s: DEFAULT_CYCLE_PERIOD_S,
        }
    }

    /// Width of the content text area when it is not measured.
    pub fn content_width(&self) -> Option<f64> {
        match self {
            Self::Text | Self::Cycle { .. } => None,
            Self::PercentBar => Some(BAR_CONTENT_WIDTH),
            Self::Sweep { .. } => Some(SWEEP_CONTENT_WIDTH),
            Self::Custom(s) => s.content_width(),
        }
    }

    /// The string to measure for sizing the content box from `record`.
    pub fn probe_text(&self, record: &BadgeRecord) -> String {
        match self {
            Self::Cycle { .. } => record
                .value
                .lines()
                .into_iter()
                .max_by_key(|s| s.chars().count())
                .unwrap_or_default(),
            _ => record.display_text(),
        }
    }

    pub fn fill(&self, out: &mut String, ctx: &FillContext<'_>) {
        match self {
            Self::Text => {
                push_shadowed_text(
                    out,
                    super::VALUE_TEXT_CLASS,
                    CONTENT_TEXT_X,
                    ctx.content_box.height,
                    &ctx.record.display_text(),
                );
            }
            Self::PercentBar => fill_percent_bar(out, ctx),
            Self::Sweep { period_s } => fill_sweep(out, ctx, *period_s),
            Self::Cycle { period_s } => fill_cycle(out, ctx, *period_s),
            Self::Custom(s) => s.fill(out, ctx),
        }
    }
}

/// Writes `text` twice: a dark translucent copy 1px lower, then the white foreground copy.
///
/// `class` lands on the shadow copy, which is the one measured by the metrics provider.
pub fn push_shadowed_text(out: &mut String, class: &str, x: f64, box_height: f64, text: &str) {
    let _ = write!(
        out,
        r##"<text class="{class}" fill="#010101" fill-opacity=".3" x="{x}" y="{y}">"##,
        x = fmt(x),
        y = fmt(box_height - 4.0),
    );
    escape_xml_into(out, text);
    let _ = write!(
        out,
        r#"</text><text x="{x}" y="{y}">"#,
        x = fmt(x),
        y = fmt(box_height - 5.0),
    );
    escape_xml_into(out, text);
    out.push_str("</text>");
}

fn bar_area(content_box: TextSize) -> (f64, f64) {
    let w = (content_box.width - 2.0 * BAR_INSET).max(0.0);
    let h = (content_box.height - 2.0 * BAR_INSET).max(0.0);
    (w, h)
}

fn fill_percent_bar(out: &mut String, ctx: &FillContext<'_>) {
    let (w, h) = bar_area(ctx.content_box);
    let p = ctx.record.numeric_value().unwrap_or(0.0).clamp(0.0, 1.0);
    let filled = h * p;
    let _ = write!(
        out,
        r##"<rect class="bar_outline" x="{x}" y="{y}" width="{w}" height="{h}" fill="none" stroke="#fff" stroke-width="1"/>"##,
        x = fmt(BAR_INSET),
        y = fmt(BAR_INSET),
        w = fmt(w),
        h = fmt(h),
    );
    let _ = write!(
        out,
        r##"<rect class="bar_fill" x="{x}" y="{y}" width="{w}" height="{h}" fill="#fff"/>"##,
        x = fmt(BAR_INSET),
        y = fmt(BAR_INSET + h - filled),
        w = fmt(w),
        h = fmt(filled),
    );
}

fn fill_sweep(out: &mut String, ctx: &FillContext<'_>, period_s: f64) {
    let (w, h) = bar_area(ctx.content_box);
    let rate = ctx.record.numeric_value().unwrap_or(0.0);
    let _ = write!(
        out,
        r##"<rect class="sweep_fill" x="{x}" y="{y}" width="0" height="{h}" fill="#fff">"##,
        x = fmt(BAR_INSET),
        y = fmt(BAR_INSET),
        h = fmt(h),
    );
    if rate > 0.0 && period_s.is_finite() && period_s > 0.0 {
        let _ = write!(
            out,
            r#"<animate attributeName="width" from="0" to="{w}" dur="{dur}" repeatCount="indefinite"/>"#,
            w = fmt(w),
            dur = fmt_seconds(period_s / rate),
        );
    }
    out.push_str("</rect>");
}

fn fill_cycle(out: &mut String, ctx: &FillContext<'_>, period_s: f64) {
    let items = ctx.record.value.lines();
    let n = items.len();
    if n == 0 {
        return;
    }
    if n == 1 || !(period_s.is_finite() && period_s > 0.0) {
        push_shadowed_text(
            out,
            "value_text",
            CONTENT_TEXT_X,
            ctx.content_box.height,
            &items[0],
        );
        return;
    }

    let slice = period_s / n as f64;
    let share = 1.0 / n as f64;
    let key_times = format!(
        "0;{};{};{};1",
        fmt_fraction(CYCLE_ATTACK * share),
        fmt_fraction((CYCLE_ATTACK + CYCLE_SUSTAIN) * share),
        fmt_fraction((CYCLE_ATTACK + CYCLE_SUSTAIN + CYCLE_RELEASE) * share),
    );
    for (i, item) in items.iter().enumerate() {
        let _ = write!(
            out,
            r#"<g class="cycle_item" opacity="0"><animate attributeName="opacity" values="0;1;1;0;0" keyTimes="{key_times}" dur="{dur}" begin="{begin}" repeatCount="indefinite"/>"#,
            dur = fmt_seconds(period_s),
            begin = fmt_seconds(slice * i as f64),
        );
        push_shadowed_text(
            out,
            "value_text",
            CONTENT_TEXT_X,
            ctx.content_box.height,
            item,
        );
        out.push_str("</g>");
    }
}
