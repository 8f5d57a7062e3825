//! Badge box sizing and grid placement.

use serde::{Deserialize, Serialize};
use tagbadge_core::{LayoutConfig, TextSize};

/// Horizontal padding added to a measured text width (5px on each side).
pub const BOX_PADDING_X: f64 = 10.0;
/// Vertical padding added to a measured text height. The text baseline sits 4-5px above the
/// bottom edge, so the split is not symmetric around the glyphs.
pub const BOX_PADDING_Y: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPosition {
    pub row: usize,
    pub col: usize,
    pub x: f64,
    pub y: f64,
}

/// Geometry shared by every badge of one render call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BadgeGeometry {
    pub title_box: TextSize,
    pub content_box: TextSize,
    pub badge_width: f64,
    pub badge_height: f64,
    pub total_width: f64,
    pub total_height: f64,
    pub record_count: usize,
    pub row_count: usize,
    pub config: LayoutConfig,
}

impl BadgeGeometry {
    /// Absolute placement of record `index` (row-major).
    pub fn position(&self, index: usize) -> GridPosition {
        grid_position(
            index,
            &self.config,
            self.badge_width,
            self.badge_height,
        )
    }

    pub fn positions(&self) -> impl Iterator<Item = GridPosition> + '_ {
        (0..self.record_count).map(|i| self.position(i))
    }
}

pub fn box_for_text(text: TextSize) -> TextSize {
    let text = text.sanitized();
    TextSize::new(text.width + BOX_PADDING_X, text.height + BOX_PADDING_Y)
}

/// Places record `index` on the grid. Pure function of its inputs.
pub fn grid_position(
    index: usize,
    config: &LayoutConfig,
    badge_width: f64,
    badge_height: f64,
) -> GridPosition {
    let columns = config.column_count.max(1);
    let row = index / columns;
    let col = index % columns;
    GridPosition {
        row,
        col,
        x: config.margin.left + col as f64 * (badge_width + config.column_padding),
        y: config.margin.top + row as f64 * (badge_height + config.row_padding),
    }
}

pub fn compute_layout(
    title_size: TextSize,
    content_size: TextSize,
    record_count: usize,
    config: &LayoutConfig,
) -> crate::Result<BadgeGeometry> {
    config.validate()?;

    let title_box = box_for_text(title_size);
    let content_box = box_for_text(content_size);
    let badge_width = title_box.width + content_box.width;
    let badge_height = title_box.height.max(content_box.height);

    let columns = config.column_count;
    let row_count = config.row_count(record_count);

    // n badges need n - 1 gaps; counting whole slots would add one trailing padding.
    let total_width = config.margin.left
        + config.margin.right
        + columns as f64 * badge_width
        + columns.saturating_sub(1) as f64 * config.column_padding;
    let total_height = config.margin.top
        + config.margin.bottom
        + row_count as f64 * badge_height
        + row_count.saturating_sub(1) as f64 * config.row_padding;

    Ok(BadgeGeometry {
        title_box,
        content_box,
        badge_width,
        badge_height,
        total_width,
        total_height,
        record_count,
        row_count,
        config: *config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagbadge_core::Margin;

    fn geometry(records: usize, config: &LayoutConfig) -> BadgeGeometry {
        compute_layout(
            TextSize::new(30.0, 12.0),
            TextSize::new(50.0, 12.0),
            records,
            config,
        )
        .expect("layout")
    }

    #[test]
    fn boxes_add_fixed_padding() {
        let g = geometry(1, &LayoutConfig::default());
        assert_eq!(g.title_box, TextSize::new(40.0, 20.0));
        assert_eq!(g.content_box, TextSize::new(60.0, 20.0));
        assert_eq!(g.badge_width, 100.0);
        assert_eq!(g.badge_height, 20.0);
    }

    #[test]
    fn twelve_records_in_five_columns_make_three_rows() {
        let cfg = LayoutConfig::default();
        let g = geometry(12, &cfg);
        assert_eq!(g.row_count, 3);

        let p5 = g.position(5);
        assert_eq!((p5.row, p5.col), (1, 0));
        assert_eq!((p5.x, p5.y), (0.0, 30.0));

        let p4 = g.position(4);
        assert_eq!((p4.row, p4.col), (0, 4));
        assert_eq!(p4.x, 4.0 * (100.0 + 15.0));

        let p11 = g.position(11);
        assert_eq!((p11.row, p11.col), (2, 1));
    }

    #[test]
    fn canvas_fits_badges_paddings_and_margins_exactly() {
        let cfg = LayoutConfig::default().with_margin(Margin {
            left: 3.0,
            right: 7.0,
            top: 2.0,
            bottom: 5.0,
        });
        let g = geometry(12, &cfg);
        assert_eq!(g.total_width, 3.0 + 7.0 + 5.0 * 100.0 + 4.0 * 15.0);
        assert_eq!(g.total_height, 2.0 + 5.0 + 3.0 * 20.0 + 2.0 * 10.0);

        // The last column's right edge plus the right margin is the canvas edge.
        let last = g.position(4);
        assert_eq!(last.x + g.badge_width + cfg.margin.right, g.total_width);
        let bottom = g.position(11);
        assert_eq!(bottom.y + g.badge_height + cfg.margin.bottom, g.total_height);
    }

    #[test]
    fn zero_records_leave_only_margins_vertically() {
        let cfg = LayoutConfig::default().with_margin(Margin::uniform(4.0));
        let g = geometry(0, &cfg);
        assert_eq!(g.row_count, 0);
        assert_eq!(g.total_height, 8.0);
        assert_eq!(g.positions().count(), 0);
    }

    #[test]
    fn placement_is_pure() {
        let cfg = LayoutConfig::default().with_columns(3);
        let a = grid_position(7, &cfg, 80.0, 20.0);
        let b = grid_position(7, &cfg, 80.0, 20.0);
        assert_eq!(a, b);
        assert_eq!((a.row, a.col), (2, 1));
        assert_eq!((a.x, a.y), (95.0, 60.0));
    }

    #[test]
    fn placement_holds_for_every_column_count() {
        for columns in 1..=7 {
            let cfg = LayoutConfig::default().with_columns(columns);
            for n in 0..=20 {
                let g = geometry(n, &cfg);
                assert_eq!(g.row_count, n.div_ceil(columns));
                for p in g.positions() {
                    assert!(p.x + g.badge_width <= g.total_width + 1e-9);
                    assert!(p.y + g.badge_height <= g.total_height + 1e-9);
                }
            }
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = LayoutConfig::default().with_columns(0);
        let err = compute_layout(TextSize::default(), TextSize::default(), 3, &cfg).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Core(tagbadge_core::Error::InvalidLayout { .. })
        ));
    }

    #[test]
    fn taller_content_box_sets_badge_height() {
        let g = compute_layout(
            TextSize::new(10.0, 12.0),
            TextSize::new(10.0, 30.0),
            1,
            &LayoutConfig::default(),
        )
        .expect("layout");
        assert_eq!(g.badge_height, 38.0);
    }
}
