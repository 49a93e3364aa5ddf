//! Projects resolved placements into percent-space rectangles.
//!
//! Pure math, no side effects. The renderer (or any other downstream) turns
//! these fractions into character cells or pixels; clipping of items outside
//! the visible window is its problem, not this module's.

use serde::{Deserialize, Serialize};

use crate::layout::PlacementInfo;

/// Visible time window of the grid, in minutes of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: u16,
    pub end: u16,
}

impl TimeWindow {
    pub fn new(start: u16, end: u16) -> Self {
        debug_assert!(start < end, "window {start}-{end} has no height");
        Self { start, end }
    }

    pub fn span_minutes(&self) -> u16 {
        self.end - self.start
    }
}

/// Horizontal extent of one day lane, as percentages of the full grid width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayColumn {
    pub width_percent: f64,
    pub offset_percent: f64,
}

impl DayColumn {
    /// Equal-width lane `day_index` out of `day_count`.
    pub fn nth(day_index: usize, day_count: usize) -> Self {
        debug_assert!(day_count > 0);
        debug_assert!(day_index < day_count);
        let width = 100.0 / day_count as f64;
        Self {
            width_percent: width,
            offset_percent: day_index as f64 * width,
        }
    }
}

/// Absolutely positioned block, all fields percentages of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

/// Converts one placement into its rectangle within a day lane.
pub fn project(placement: &PlacementInfo, window: TimeWindow, day: DayColumn) -> Rect {
    let span = f64::from(window.span_minutes());
    // start may precede the window; keep the subtraction signed.
    let offset_minutes = i32::from(placement.period.start) - i32::from(window.start);
    let top = f64::from(offset_minutes) / span * 100.0;
    let height = f64::from(placement.period.duration()) / span * 100.0;

    let width = day.width_percent / placement.column_count as f64;
    let left = day.offset_percent + placement.column_index as f64 * width;

    Rect {
        top,
        left,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::{DayColumn, TimeWindow, project};
    use crate::layout::{Period, PlacementInfo};

    fn info(start: u16, end: u16, column_index: usize, column_count: usize) -> PlacementInfo {
        PlacementInfo {
            period: Period::new(start, end),
            id: "X".to_string(),
            column_index,
            column_count,
        }
    }

    #[test]
    fn full_width_block_spans_its_lane() {
        // 08:00-22:00 window, 09:00-10:00 block, second of five lanes.
        let rect = project(
            &info(540, 600, 0, 1),
            TimeWindow::new(480, 1320),
            DayColumn::nth(1, 5),
        );
        assert!((rect.top - (60.0 / 840.0 * 100.0)).abs() < 1e-9);
        assert!((rect.height - (60.0 / 840.0 * 100.0)).abs() < 1e-9);
        assert!((rect.left - 20.0).abs() < 1e-9);
        assert!((rect.width - 20.0).abs() < 1e-9);
    }

    #[test]
    fn sub_columns_split_the_lane() {
        let window = TimeWindow::new(480, 1320);
        let day = DayColumn::nth(0, 5);

        let left_rect = project(&info(540, 600, 0, 2), window, day);
        let right_rect = project(&info(540, 600, 1, 2), window, day);

        assert!((left_rect.width - 10.0).abs() < 1e-9);
        assert!((left_rect.left - 0.0).abs() < 1e-9);
        assert!((right_rect.left - 10.0).abs() < 1e-9);
    }

    #[test]
    fn block_before_window_projects_above_it() {
        // Placement outside the window still projects; top just goes negative.
        let rect = project(
            &info(420, 480, 0, 1),
            TimeWindow::new(480, 1320),
            DayColumn::nth(0, 5),
        );
        assert!(rect.top < 0.0);
    }
}
