use super::{MeasurementError, TextMetricsProvider};
use async_trait::async_trait;
use tagbadge_core::TextSize;

/// In-process estimate of an SVG text bounding box: `chars * font_size * char_width_factor`
/// wide, `font_size * line_height_factor` tall.
///
/// Supports `.class`, `#id`, and bare tag-name selectors. Useful offline and in tests; real
/// deployments should measure with a browser or real font metrics.
#[derive(Debug, Clone)]
pub struct DeterministicTextMetricsProvider {
    pub char_width_factor: f64,
    pub line_height_factor: f64,
    pub default_font_size: f64,
}

impl Default for DeterministicTextMetricsProvider {
    fn default() -> Self {
        Self {
            char_width_factor: 0.6,
            line_height_factor: 1.2,
            default_font_size: 16.0,
        }
    }
}

enum Selector<'a> {
    Class(&'a str),
    Id(&'a str),
    Tag(&'a str),
}

impl<'a> Selector<'a> {
    fn parse(raw: &'a str) -> Option<Self> {
        let raw = raw.trim();
        if let Some(class) = raw.strip_prefix('.') {
            return (!class.is_empty()).then_some(Self::Class(class));
        }
        if let Some(id) = raw.strip_prefix('#') {
            return (!id.is_empty()).then_some(Self::Id(id));
        }
        (!raw.is_empty()).then_some(Self::Tag(raw))
    }

    fn matches(&self, node: roxmltree::Node<'_, '_>) -> bool {
        if !node.is_element() {
            return false;
        }
        match self {
            Self::Class(class) => node
                .attribute("class")
                .is_some_and(|v| v.split_whitespace().any(|c| c == *class)),
            Self::Id(id) => node.attribute("id") == Some(*id),
            Self::Tag(tag) => node.tag_name().name() == *tag,
        }
    }
}

fn parse_font_size(raw: &str) -> Option<f64> {
    let raw = raw.trim().trim_end_matches("px").trim();
    raw.parse::<f64>().ok().filter(|v| v.is_finite() && *v > 0.0)
}

/// SVG's default `xml:space` handling: trim and collapse runs of whitespace.
fn collapsed_text(node: roxmltree::Node<'_, '_>) -> String {
    let raw: String = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl DeterministicTextMetricsProvider {
    pub fn measure_markup(
        &self,
        markup: &str,
        selector: &str,
    ) -> std::result::Result<TextSize, MeasurementError> {
        let doc = roxmltree::Document::parse(markup)
            .map_err(|e| MeasurementError::unparseable(format!("markup: {e}")))?;
        let selector_err = || MeasurementError::Selector {
            selector: selector.to_string(),
        };
        let sel = Selector::parse(selector).ok_or_else(selector_err)?;
        let node = doc
            .descendants()
            .find(|n| sel.matches(*n))
            .ok_or_else(selector_err)?;

        let font_size = node
            .ancestors()
            .filter_map(|n| n.attribute("font-size"))
            .find_map(parse_font_size)
            .unwrap_or(self.default_font_size);

        let text = collapsed_text(node);
        if text.is_empty() {
            return Ok(TextSize::default());
        }
        let chars = text.chars().count() as f64;
        Ok(TextSize::new(
            chars * font_size * self.char_width_factor,
            font_size * self.line_height_factor,
        ))
    }
}

#[async_trait]
impl TextMetricsProvider for DeterministicTextMetricsProvider {
    async fn measure_raw(
        &self,
        markup: &str,
        selector: &str,
    ) -> std::result::Result<TextSize, MeasurementError> {
        self.measure_markup(markup, selector)
    }
}

/// Returns the same size for every request. Stands in for a real oracle when none is
/// configured.
///
/// The size is a raw measurement like any other provider's, so a [`super::MetricsCache`]
/// still applies its correction factor. Pair it with a factor of `1.0` to get
/// [`super::FALLBACK_TEXT_SIZE`] through unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedTextMetricsProvider {
    pub size: TextSize,
}

impl FixedTextMetricsProvider {
    pub const fn new(size: TextSize) -> Self {
        Self { size }
    }
}

impl Default for FixedTextMetricsProvider {
    fn default() -> Self {
        Self::new(super::FALLBACK_TEXT_SIZE)
    }
}

#[async_trait]
impl TextMetricsProvider for FixedTextMetricsProvider {
    async fn measure_raw(
        &self,
        _markup: &str,
        _selector: &str,
    ) -> std::result::Result<TextSize, MeasurementError> {
        Ok(self.size)
    }
}
