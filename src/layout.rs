// Zigzag (boustrophedon) board layout.
// Pure: same index and params always give the same position. Odd rows run right-to-left
// so consecutive steps stay adjacent and the connecting path never jumps across the board.

use serde::{Deserialize, Serialize};

use crate::types::Point;

/// Layout parameters for one presentation context (board or print sheet).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutParams {
    /// Columns per row. Values below 1 are treated as 1.
    #[serde(default = "default_columns")]
    pub columns: u32,
    #[serde(default = "default_spacing")]
    pub spacing: Point,
    #[serde(default = "default_padding")]
    pub padding: Point,
    /// Offset from a card's top-left corner to its centre, for path endpoints.
    #[serde(default = "default_center_offset")]
    pub center_offset: Point,
    #[serde(default = "default_min_height")]
    pub min_height: f32,
    #[serde(default = "default_margin")]
    pub margin: f32,
    /// When set, columns are derived from this board width instead of `columns`.
    #[serde(default)]
    pub fit_width: Option<f32>,
}

fn default_columns() -> u32 {
    3
}

fn default_spacing() -> Point {
    Point::new(220.0, 180.0)
}

fn default_padding() -> Point {
    Point::new(50.0, 50.0)
}

fn default_center_offset() -> Point {
    Point::new(70.0, 60.0)
}

fn default_min_height() -> f32 {
    600.0
}

fn default_margin() -> f32 {
    50.0
}

fn default_breakpoint() -> f32 {
    768.0
}

impl Default for LayoutParams {
    fn default() -> Self {
        LayoutParams {
            columns: default_columns(),
            spacing: default_spacing(),
            padding: default_padding(),
            center_offset: default_center_offset(),
            min_height: default_min_height(),
            margin: default_margin(),
            fit_width: None,
        }
    }
}

/// Interactive board preset for narrow viewports.
pub fn default_compact_layout() -> LayoutParams {
    LayoutParams {
        columns: 2,
        spacing: Point::new(160.0, 120.0),
        padding: Point::new(20.0, 20.0),
        ..LayoutParams::default()
    }
}

/// Print sheet preset. Height works out to `2 * padding.y + rows * spacing.y`.
pub fn default_print_layout() -> LayoutParams {
    LayoutParams {
        columns: 4,
        spacing: Point::new(240.0, 200.0),
        padding: Point::new(100.0, 100.0),
        center_offset: Point::new(80.0, 80.0),
        min_height: 0.0,
        margin: 100.0,
        fit_width: None,
    }
}

pub fn default_board_layout() -> ResponsiveLayout {
    ResponsiveLayout {
        breakpoint: default_breakpoint(),
        compact: default_compact_layout(),
        wide: LayoutParams::default(),
    }
}

/// Zigzag position of the step at `index`.
pub fn position(index: usize, columns_per_row: u32, spacing: Point, padding: Point) -> Point {
    let columns = columns_per_row.max(1) as usize;
    let row = index / columns;
    let mut col = index % columns;
    if row % 2 == 1 {
        col = columns - 1 - col;
    }
    Point::new(
        padding.x + col as f32 * spacing.x,
        padding.y + row as f32 * spacing.y,
    )
}

/// Columns that fit in `board_width` once horizontal padding is removed. Never below 1.
pub fn columns_for_width(board_width: f32, padding_x: f32, spacing_x: f32) -> u32 {
    if !(spacing_x > 0.0) {
        return 1;
    }
    let available = board_width - 2.0 * padding_x;
    let fit = (available / spacing_x).floor();
    if fit.is_finite() && fit >= 1.0 {
        fit as u32
    } else {
        1
    }
}

impl LayoutParams {
    /// Effective column count for a render pass.
    pub fn columns_per_row(&self) -> u32 {
        match self.fit_width {
            Some(width) => columns_for_width(width, self.padding.x, self.spacing.x),
            None => self.columns.max(1),
        }
    }

    pub fn position(&self, index: usize) -> Point {
        position(index, self.columns_per_row(), self.spacing, self.padding)
    }

    pub fn positions(&self, count: usize) -> Vec<Point> {
        let columns = self.columns_per_row();
        (0..count)
            .map(|i| position(i, columns, self.spacing, self.padding))
            .collect()
    }

    pub fn rows(&self, count: usize) -> usize {
        count.div_ceil(self.columns_per_row() as usize)
    }

    /// Container height needed for `count` steps.
    pub fn container_height(&self, count: usize) -> f32 {
        let content = self.padding.y + self.rows(count) as f32 * self.spacing.y + self.margin;
        content.max(self.min_height)
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.spacing.is_finite()
            && self.padding.is_finite()
            && self.center_offset.is_finite()
            && self.min_height.is_finite()
            && self.margin.is_finite()
    }
}

/// Board presets switched on viewport width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsiveLayout {
    /// Widths at or below this use the compact preset.
    #[serde(default = "default_breakpoint")]
    pub breakpoint: f32,
    #[serde(default = "default_compact_layout")]
    pub compact: LayoutParams,
    #[serde(default)]
    pub wide: LayoutParams,
}

impl Default for ResponsiveLayout {
    fn default() -> Self {
        default_board_layout()
    }
}

impl ResponsiveLayout {
    pub fn for_width(&self, viewport_width: f32) -> &LayoutParams {
        if viewport_width <= self.breakpoint {
            &self.compact
        } else {
            &self.wide
        }
    }

    /// True when a resize from `old_width` to `new_width` changes the layout preset
    /// or its column count, so positions must be recomputed.
    pub fn crosses_threshold(&self, old_width: f32, new_width: f32) -> bool {
        let old = self.for_width(old_width);
        let new = self.for_width(new_width);
        !std::ptr::eq(old, new) || old.columns_per_row() != new.columns_per_row()
    }
}
