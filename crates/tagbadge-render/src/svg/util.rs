// Shared SVG string helpers for the badge renderer and the fill strategies.

/// Attribute numbers use the same formatting as badge text.
pub(crate) fn fmt(v: f64) -> String {
    tagbadge_core::fmt_number(v)
}

/// Formats a duration in seconds with at most three fractional digits (`2.5s`, `0.667s`).
pub(crate) fn fmt_seconds(v: f64) -> String {
    let ms = (v * 1000.0).round();
    format!("{}s", fmt(ms / 1000.0))
}

/// Formats a `0..=1` fraction for `keyTimes`, trimmed to four fractional digits.
pub(crate) fn fmt_fraction(v: f64) -> String {
    let k = (v.clamp(0.0, 1.0) * 10_000.0).round();
    fmt(k / 10_000.0)
}

pub(crate) fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_xml_into(&mut out, text);
    out
}

/// Appends `text` with the five XML special characters replaced by entities, safe for both
/// text nodes and quoted attribute values.
pub(crate) fn escape_xml_into(out: &mut String, text: &str) {
    let mut rest = text;
    while let Some(at) = rest.find(['&', '<', '>', '"', '\'']) {
        out.push_str(&rest[..at]);
        let (special, tail) = rest[at..].split_at(1);
        out.push_str(match special {
            "&" => "&amp;",
            "<" => "&lt;",
            ">" => "&gt;",
            "\"" => "&quot;",
            _ => "&#39;",
        });
        rest = tail;
    }
    out.push_str(rest);
}
