use super::{MeasurementError, TextMetricsProvider};
use async_trait::async_trait;
use std::ops::Range;
use std::sync::Arc;
use tagbadge_core::TextSize;

const MEASURE_ID: &str = "tagbadge-measure-target";

/// Measures text with real font metrics: the markup is laid out by `usvg` against a font
/// database and the bounding box of the selected element is read back.
///
/// Selectors are `.class`, `#id`, or a tag name, resolved on the source markup.
#[derive(Clone)]
pub struct UsvgTextMetricsProvider {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl std::fmt::Debug for UsvgTextMetricsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsvgTextMetricsProvider")
            .field("faces", &self.fontdb.len())
            .finish()
    }
}

impl UsvgTextMetricsProvider {
    /// Provider over the fonts installed on this machine.
    pub fn with_system_fonts() -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        Self::with_fontdb(Arc::new(db))
    }

    pub fn with_fontdb(fontdb: Arc<usvg::fontdb::Database>) -> Self {
        Self { fontdb }
    }

    pub fn measure_markup(
        &self,
        markup: &str,
        selector: &str,
    ) -> std::result::Result<TextSize, MeasurementError> {
        let (markup, id) = tag_target(markup, selector)?;
        let options = usvg::Options {
            fontdb: self.fontdb.clone(),
            ..Default::default()
        };
        let tree = usvg::Tree::from_str(&markup, &options)
            .map_err(|e| MeasurementError::unparseable(format!("usvg: {e}")))?;
        let node = tree
            .node_by_id(&id)
            .ok_or_else(|| MeasurementError::Selector {
                selector: selector.to_string(),
            })?;
        let bbox = node.abs_bounding_box();
        Ok(TextSize::new(f64::from(bbox.width()), f64::from(bbox.height())).sanitized())
    }
}

fn element_matches(node: roxmltree::Node<'_, '_>, selector: &str) -> bool {
    if !node.is_element() {
        return false;
    }
    if let Some(class) = selector.strip_prefix('.') {
        return node
            .attribute("class")
            .is_some_and(|v| v.split_whitespace().any(|c| c == class));
    }
    if let Some(id) = selector.strip_prefix('#') {
        return node.attribute("id") == Some(id);
    }
    node.tag_name().name() == selector
}

/// Returns markup in which the first element matching `selector` carries an id `usvg` keeps,
/// plus that id. A root without a positive size gets a [`MEASURE_CANVAS`] square canvas,
/// since `usvg` refuses zero-sized documents.
fn tag_target(
    markup: &str,
    selector: &str,
) -> std::result::Result<(String, String), MeasurementError> {
    let selector = selector.trim();
    let selector_err = || MeasurementError::Selector {
        selector: selector.to_string(),
    };
    if selector.is_empty() {
        return Err(selector_err());
    }
    let doc = roxmltree::Document::parse(markup)
        .map_err(|e| MeasurementError::unparseable(format!("markup: {e}")))?;
    let node = doc
        .descendants()
        .find(|n| element_matches(*n, selector))
        .ok_or_else(selector_err)?;

    let mut edits: Vec<(Range<usize>, String)> = Vec::new();
    let root = doc.root_element();
    for name in ["width", "height"] {
        match root.attributes().find(|a| a.name() == name) {
            Some(attr) if !is_non_positive_length(attr.value()) => {}
            Some(attr) => edits.push((attr.range_value(), fmt_canvas())),
            None => {
                let at = after_tag_name(markup, root)?;
                edits.push((at..at, format!(r#" {name}="{}""#, fmt_canvas())));
            }
        }
    }

    let id = match node.attribute("id").filter(|id| !id.is_empty()) {
        Some(id) => id.to_string(),
        None => {
            let at = after_tag_name(markup, node)?;
            edits.push((at..at, format!(r#" id="{MEASURE_ID}""#)));
            MEASURE_ID.to_string()
        }
    };
    Ok((apply_edits(markup, edits), id))
}

const MEASURE_CANVAS: f64 = 1000.0;

fn fmt_canvas() -> String {
    tagbadge_core::fmt_number(MEASURE_CANVAS)
}

/// `true` for plain numbers (optionally `px`) that are zero or negative. Percentages and other
/// units are left to `usvg`.
fn is_non_positive_length(value: &str) -> bool {
    let value = value.trim();
    let number = value.strip_suffix("px").unwrap_or(value).trim();
    number
        .parse::<f64>()
        .is_ok_and(|v| v.is_nan() || v <= 0.0)
}

/// Byte offset right after the raw tag name of `node` (which may carry a prefix).
fn after_tag_name(
    markup: &str,
    node: roxmltree::Node<'_, '_>,
) -> std::result::Result<usize, MeasurementError> {
    let start = node.range().start;
    let name_len = markup[start + 1..]
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .ok_or_else(|| MeasurementError::unparseable("unterminated start tag"))?;
    Ok(start + 1 + name_len)
}

fn apply_edits(markup: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by_key(|(range, _)| range.start);
    let extra: usize = edits.iter().map(|(_, text)| text.len()).sum();
    let mut out = String::with_capacity(markup.len() + extra);
    let mut cursor = 0;
    for (range, text) in edits {
        out.push_str(&markup[cursor..range.start]);
        out.push_str(&text);
        cursor = range.end;
    }
    out.push_str(&markup[cursor..]);
    out
}

#[async_trait]
impl TextMetricsProvider for UsvgTextMetricsProvider {
    async fn measure_raw(
        &self,
        markup: &str,
        selector: &str,
    ) -> std::result::Result<TextSize, MeasurementError> {
        self.measure_markup(markup, selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_gets_an_id_after_its_tag_name() {
        let (markup, id) = tag_target(
            r#"<svg width="20" height="10"><text class="a b">x</text></svg>"#,
            ".b",
        )
        .expect("tagged");
        assert_eq!(id, MEASURE_ID);
        assert_eq!(
            markup,
            format!(
                r#"<svg width="20" height="10"><text id="{MEASURE_ID}" class="a b">x</text></svg>"#
            )
        );
    }

    #[test]
    fn existing_ids_are_reused() {
        let src = r#"<svg width="20" height="10"><text id="t" class="a">x</text></svg>"#;
        let (markup, id) = tag_target(src, ".a").expect("tagged");
        assert_eq!(id, "t");
        assert_eq!(markup, src);
    }

    #[test]
    fn zero_sized_roots_get_a_canvas() {
        let (markup, _) = tag_target(
            r#"<svg width="0" height="0px"><text class="a">x</text></svg>"#,
            ".a",
        )
        .expect("tagged");
        assert_eq!(
            markup,
            format!(
                r#"<svg width="1000" height="1000"><text id="{MEASURE_ID}" class="a">x</text></svg>"#
            )
        );

        let (markup, _) = tag_target("<svg><text>x</text></svg>", "text").expect("tagged");
        let doc = roxmltree::Document::parse(&markup).expect("well-formed");
        assert_eq!(doc.root_element().attribute("width"), Some("1000"));
        assert_eq!(doc.root_element().attribute("height"), Some("1000"));

        let (markup, _) =
            tag_target(r#"<svg width="100%" height="-3"><text>x</text></svg>"#, "text")
                .expect("tagged");
        let doc = roxmltree::Document::parse(&markup).expect("well-formed");
        assert_eq!(doc.root_element().attribute("width"), Some("100%"));
        assert_eq!(doc.root_element().attribute("height"), Some("1000"));
    }

    #[test]
    fn title_text_measures_with_system_fonts() {
        let provider = UsvgTextMetricsProvider::with_system_fonts();
        let mut options = crate::render::SvgRenderOptions::default();
        // Any installed family; the default one may be missing on this machine.
        if let Some((family, _)) = provider
            .fontdb
            .faces()
            .find_map(|face| face.families.first().cloned())
        {
            options.font_family = family;
        }
        let markup =
            crate::render::render_probe_svg("coverage", crate::render::TITLE_TEXT_CLASS, &options);
        let result = provider.measure_markup(&markup, crate::render::TITLE_TEXT_SELECTOR);
        // Without any installed face usvg drops the text, but the document itself must load.
        if provider.fontdb.is_empty() {
            assert!(
                !matches!(result, Err(MeasurementError::Unparseable { .. })),
                "{result:?}"
            );
            return;
        }
        let size = result.expect("measured");
        assert!(size.width > 0.0, "{size:?}");
        assert!(size.height > 0.0, "{size:?}");
    }

    #[test]
    fn unmatched_selector_is_reported() {
        assert!(matches!(
            tag_target("<svg><text>x</text></svg>", ".missing"),
            Err(MeasurementError::Selector { .. })
        ));
    }
}
