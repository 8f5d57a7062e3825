use serde::{Deserialize, Serialize};

/// Width/height of a measured text run or box, in SVG user units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TextSize {
    pub width: f64,
    pub height: f64,
}

impl TextSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Clamps negative or non-finite components to zero.
    pub fn sanitized(self) -> Self {
        fn clean(v: f64) -> f64 {
            if v.is_finite() && v > 0.0 { v } else { 0.0 }
        }
        Self {
            width: clean(self.width),
            height: clean(self.height),
        }
    }

    pub fn scaled(self, factor: f64) -> Self {
        Self {
            width: self.width * factor,
            height: self.height * factor,
        }
    }
}

/// A badge value as supplied by the data layer.
///
/// Lists are only meaningful to multi-item fill strategies; other consumers see the items
/// joined by a single space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Displayable {
    Number(f64),
    Text(String),
    Lines(Vec<String>),
}

impl Displayable {
    /// Numeric view of the value, used by color scales and bar proportions.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v).filter(|v| v.is_finite()),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            Self::Lines(_) => None,
        }
    }

    pub fn lines(&self) -> Vec<String> {
        match self {
            Self::Lines(items) => items.clone(),
            other => vec![other.to_display_string()],
        }
    }

    pub fn to_display_string(&self) -> String {
        match self {
            Self::Number(v) => fmt_number(*v),
            Self::Text(s) => s.clone(),
            Self::Lines(items) => items.join(" "),
        }
    }
}

impl From<f64> for Displayable {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Displayable {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Displayable {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for Displayable {
    fn from(value: Vec<String>) -> Self {
        Self::Lines(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeRecord {
    pub label: String,
    pub value: Displayable,
    #[serde(default, rename = "isPercent")]
    pub is_percent: bool,
}

impl BadgeRecord {
    pub fn new(label: impl Into<String>, value: impl Into<Displayable>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            is_percent: false,
        }
    }

    pub fn percent(label: impl Into<String>, fraction: f64) -> Self {
        Self {
            label: label.into(),
            value: Displayable::Number(fraction),
            is_percent: true,
        }
    }

    pub fn numeric_value(&self) -> Option<f64> {
        self.value.as_f64()
    }

    /// The string shown in the value half of the badge.
    pub fn display_text(&self) -> String {
        if self.is_percent {
            if let Some(v) = self.value.as_f64() {
                return format_percent(v);
            }
        }
        self.value.to_display_string()
    }

    /// Parses the `[{ "label": ..., "value": ..., "isPercent": ... }]` record list shape used by
    /// the data-loading layer.
    pub fn list_from_json_str(text: &str) -> crate::Result<Vec<BadgeRecord>> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Formats a `0..1` fraction as a percentage rounded to one decimal place (`0.2345` -> `23.5%`).
pub fn format_percent(fraction: f64) -> String {
    let tenths = round_half_away_from_zero(fraction * 1000.0);
    format!("{}%", fmt_number(tenths / 10.0))
}

fn round_half_away_from_zero(v: f64) -> f64 {
    // `x.5` products such as `0.2345 * 1000` can land a few ulps below the tie.
    let floor = v.floor();
    if (v - floor - 0.5).abs() < 1e-7 {
        if v.is_sign_negative() { floor } else { floor + 1.0 }
    } else {
        v.round()
    }
}

/// Results this close to an integer print as that integer.
const INTEGER_SNAP: f64 = 1e-6;

/// Stringifies a number the way a browser would for display: shortest round-trip form, no
/// trailing `.0`, and never `-0`. Non-finite values print as `0`.
///
/// Both badge text and SVG attributes go through this.
pub fn fmt_number(v: f64) -> String {
    let mut out = String::new();
    let _ = write_number(&mut out, v);
    out
}

/// [`fmt_number`] into an existing writer.
pub fn write_number<W: std::fmt::Write>(out: &mut W, v: f64) -> std::fmt::Result {
    let snapped = match v {
        v if !v.is_finite() => 0.0,
        v if (v - v.round()).abs() < INTEGER_SNAP => v.round(),
        v => v,
    };
    // `-0.0 + 0.0` is `+0.0`.
    write!(out, "{}", snapped + 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_print_without_float_noise() {
        assert_eq!(fmt_number(42.0), "42");
        assert_eq!(fmt_number(0.2345), "0.2345");
        assert_eq!(fmt_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(fmt_number(10.000000001), "10");
        assert_eq!(fmt_number(-1e-12), "0");
        assert_eq!(fmt_number(-0.0), "0");
        assert_eq!(fmt_number(f64::INFINITY), "0");
        assert_eq!(fmt_number(-2.5), "-2.5");
    }

    #[test]
    fn percent_rounds_to_one_decimal() {
        assert_eq!(format_percent(0.2345), "23.5%");
        assert_eq!(format_percent(0.5), "50%");
        assert_eq!(format_percent(1.0), "100%");
        assert_eq!(format_percent(0.0), "0%");
        assert_eq!(format_percent(0.12341), "12.3%");
    }

    #[test]
    fn percent_flag_only_changes_display() {
        let r = BadgeRecord::percent("coverage", 0.2345);
        assert_eq!(r.display_text(), "23.5%");
        assert_eq!(r.numeric_value(), Some(0.2345));

        let plain = BadgeRecord::new("coverage", 0.2345);
        assert_eq!(plain.display_text(), "0.2345");
    }

    #[test]
    fn percent_flag_on_non_numeric_value_falls_back_to_text() {
        let mut r = BadgeRecord::new("state", "n/a");
        r.is_percent = true;
        assert_eq!(r.display_text(), "n/a");
    }

    #[test]
    fn numbers_display_without_trailing_zero() {
        assert_eq!(Displayable::Number(8.88).to_display_string(), "8.88");
        assert_eq!(Displayable::Number(3.0).to_display_string(), "3");
        assert_eq!(Displayable::Number(-0.0).to_display_string(), "0");
    }

    #[test]
    fn numeric_strings_participate_in_scales() {
        assert_eq!(Displayable::from("0.75").as_f64(), Some(0.75));
        assert_eq!(Displayable::from("fast").as_f64(), None);
        assert_eq!(
            Displayable::Lines(vec!["a".to_string(), "b".to_string()]).as_f64(),
            None
        );
    }

    #[test]
    fn record_list_parses_from_json() {
        let records = BadgeRecord::list_from_json_str(
            r#"[
                {"label": "rust", "value": 12.5},
                {"label": "go", "value": "slow"},
                {"label": "ci", "value": 0.9, "isPercent": true},
                {"label": "todo", "value": ["lint", "test"]}
            ]"#,
        )
        .expect("records parse");
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].value, Displayable::Number(12.5));
        assert_eq!(records[1].value, Displayable::Text("slow".to_string()));
        assert!(records[2].is_percent);
        assert_eq!(records[2].display_text(), "90%");
        assert_eq!(records[3].value.lines(), vec!["lint", "test"]);
    }

    #[test]
    fn sanitized_size_drops_negative_and_nan() {
        let s = TextSize::new(-3.0, f64::NAN).sanitized();
        assert_eq!(s, TextSize::new(0.0, 0.0));
    }
}
