use serde::{Deserialize, Serialize};

/// Shields.io palette, best (green) to worst (red).
pub const BADGE_PALETTE: [&str; 6] = [
    "#4c1", "#97ca00", "#a4a61d", "#dfb317", "#fe7d37", "#e05d44",
];

/// Fill of the value half when no color scale is configured.
pub const DEFAULT_CONTENT_COLOR: &str = "#4c1";

/// Fill of the title half.
pub const TITLE_COLOR: &str = "#555";

/// Quantized step function from a numeric value to one of [`BADGE_PALETTE`]'s colors.
///
/// The two domain points mark the first quantization step: `domain[0]` maps to the first
/// color, `domain[1]` to the second, and every further step of `|domain[1] - domain[0]|` in
/// the same direction moves one color along the palette. Values on the far side of
/// `domain[0]` clamp to the first color, values past the last step clamp to the last color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorScale {
    pub domain: [f64; 2],
}

impl ColorScale {
    pub const fn new(best: f64, next: f64) -> Self {
        Self {
            domain: [best, next],
        }
    }

    pub fn palette(&self) -> &'static [&'static str; 6] {
        &BADGE_PALETTE
    }

    /// Palette index for `value`, or `None` for non-finite input.
    pub fn index_for(&self, value: f64) -> Option<usize> {
        if !value.is_finite() {
            return None;
        }
        let [d0, d1] = self.domain;
        let step = d1 - d0;
        let last = BADGE_PALETTE.len() - 1;
        if !step.is_finite() || step == 0.0 {
            return Some(if value == d0 { 0 } else { last });
        }
        let t = (value - d0) / step;
        if t <= 0.0 {
            return Some(0);
        }
        // Guard float drift at exact step boundaries (e.g. `(0.25 - 1) / -0.75`).
        let steps = (t + 1e-9).floor();
        Some((steps as usize).min(last))
    }

    pub fn color_for(&self, value: f64) -> Option<&'static str> {
        self.index_for(value).map(|i| BADGE_PALETTE[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_endpoints_pick_first_two_colors() {
        let scale = ColorScale::new(1.0, 0.25);
        assert_eq!(scale.color_for(1.0), Some(BADGE_PALETTE[0]));
        assert_eq!(scale.color_for(0.25), Some(BADGE_PALETTE[1]));
    }

    #[test]
    fn values_beyond_the_domain_clamp() {
        let scale = ColorScale::new(1.0, 0.25);
        assert_eq!(scale.color_for(5.0), Some(BADGE_PALETTE[0]));
        assert_eq!(scale.color_for(-100.0), Some(BADGE_PALETTE[5]));
    }

    #[test]
    fn intermediate_steps_walk_the_palette() {
        let scale = ColorScale::new(1.0, 0.25);
        assert_eq!(scale.index_for(0.6), Some(0));
        assert_eq!(scale.index_for(-0.5), Some(2));
        assert_eq!(scale.index_for(-1.25), Some(3));
    }

    #[test]
    fn ascending_domains_work_too() {
        let scale = ColorScale::new(0.0, 10.0);
        assert_eq!(scale.index_for(-1.0), Some(0));
        assert_eq!(scale.index_for(10.0), Some(1));
        assert_eq!(scale.index_for(35.0), Some(3));
        assert_eq!(scale.index_for(1e9), Some(5));
    }

    #[test]
    fn non_finite_values_have_no_color() {
        assert_eq!(ColorScale::new(1.0, 0.25).color_for(f64::NAN), None);
    }
}
