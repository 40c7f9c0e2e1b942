//! The scrolling strip: columns, view offsets, snapping and layout.
//!
//! Strip coordinates put the left edge of the first column at x = 0. The
//! horizontal view offset is the strip x shown at the working area's left
//! edge; the vertical view offset shifts the active column up.

use tracing::{debug, warn};

use crate::column::{Column, ColumnWidth, WindowHeight};
use crate::view_offset::{GestureEnd, SnapStrategy, ViewOffset};
use crate::{Axis, CenteringMode, Direction, FrameSink, Rect, Visibility, WindowId, WindowPlacement};

/// Ordered columns plus the two scrollable axes over them.
#[derive(Debug, Clone)]
pub struct ScrollingSpace {
    columns: Vec<Column>,
    active_column: usize,
    working_area: Rect,
    horizontal: ViewOffset,
    vertical: ViewOffset,
    /// Gap between columns and between windows of a column.
    pub gap: f64,
    /// How far beyond the working area off-screen columns are parked.
    pub screen_margin: f64,
    pub default_column_width: ColumnWidth,
    pub centering_mode: CenteringMode,
    /// Map touchpad travel 1:1 to pixels instead of scaling by working-area size.
    pub one_to_one: bool,
    pub snap_strategy: SnapStrategy,
}

impl ScrollingSpace {
    pub fn new(working_area: Rect) -> Self {
        Self {
            columns: Vec::new(),
            active_column: 0,
            working_area,
            horizontal: ViewOffset::default(),
            vertical: ViewOffset::default(),
            gap: 0.0,
            screen_margin: 100.0,
            default_column_width: ColumnWidth::default(),
            centering_mode: CenteringMode::default(),
            one_to_one: true,
            snap_strategy: SnapStrategy::default(),
        }
    }

    pub fn working_area(&self) -> Rect {
        self.working_area
    }

    pub fn set_working_area(&mut self, area: Rect) {
        self.working_area = area;
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn window_count(&self) -> usize {
        self.columns.iter().map(Column::len).sum()
    }

    pub fn active_column_index(&self) -> usize {
        self.active_column
    }

    pub fn active_column(&self) -> Option<&Column> {
        self.columns.get(self.active_column)
    }

    /// The focused window: the active window of the active column.
    pub fn active_window(&self) -> Option<WindowId> {
        self.active_column().and_then(Column::active_window)
    }

    pub fn contains(&self, window_id: WindowId) -> bool {
        self.find_window(window_id).is_some()
    }

    /// Column and row of a window.
    pub fn find_window(&self, window_id: WindowId) -> Option<(usize, usize)> {
        self.columns
            .iter()
            .enumerate()
            .find_map(|(col_idx, column)| column.position(window_id).map(|row| (col_idx, row)))
    }

    pub fn offset(&self, axis: Axis) -> &ViewOffset {
        match axis {
            Axis::Horizontal => &self.horizontal,
            Axis::Vertical => &self.vertical,
        }
    }

    fn offset_mut(&mut self, axis: Axis) -> &mut ViewOffset {
        match axis {
            Axis::Horizontal => &mut self.horizontal,
            Axis::Vertical => &mut self.vertical,
        }
    }

    fn column_width_px(&self, column: &Column) -> f64 {
        column.width().resolve(self.working_area.width)
    }

    /// Strip x of a column's left edge.
    fn column_x(&self, index: usize) -> f64 {
        self.columns
            .iter()
            .take(index)
            .map(|column| self.column_width_px(column) + self.gap)
            .sum()
    }

    /// Activate a column. Changing columns resets the vertical offset, since
    /// the new column has its own windows and heights.
    fn set_active_column(&mut self, index: usize) {
        let index = index.min(self.columns.len().saturating_sub(1));
        if index != self.active_column {
            self.active_column = index;
            self.vertical.set_static(0.0);
        }
    }

    /// Drop an emptied column and keep the active index pointing at the same
    /// column, or the nearest one if the active column itself went away.
    fn remove_column(&mut self, index: usize) {
        self.columns.remove(index);
        let was_active = index == self.active_column;
        if index < self.active_column {
            self.active_column -= 1;
        }
        self.active_column = self.active_column.min(self.columns.len().saturating_sub(1));
        if was_active {
            self.vertical.set_static(0.0);
        }
    }

    /// Put a window alone in a new column right after the active one.
    pub fn add_window(&mut self, window_id: WindowId, width: Option<ColumnWidth>, activate: bool) {
        let column = Column::new(window_id, width.unwrap_or(self.default_column_width));

        if self.columns.is_empty() {
            self.columns.push(column);
            self.active_column = 0;
            self.vertical.set_static(0.0);
        } else {
            let index = self.active_column + 1;
            self.columns.insert(index, column);
            if activate {
                self.set_active_column(index);
            }
        }

        debug!(
            window_id,
            columns = self.columns.len(),
            active = self.active_column,
            "Added window"
        );
    }

    /// Remove a window, deleting its column if that empties it.
    pub fn remove_window(&mut self, window_id: WindowId) -> bool {
        let Some((col_idx, _)) = self.find_window(window_id) else {
            return false;
        };

        self.columns[col_idx].remove_window(window_id);
        if self.columns[col_idx].is_empty() {
            self.remove_column(col_idx);
        }

        debug!(
            window_id,
            columns = self.columns.len(),
            active = self.active_column,
            "Removed window"
        );
        true
    }

    /// Move a window into a fresh column just left or right of the active
    /// column and activate it. Up and down are not column moves.
    pub fn move_window_to_new_column(&mut self, window_id: WindowId, direction: Direction) -> bool {
        let after_active = match direction {
            Direction::Left => false,
            Direction::Right => true,
            Direction::Up | Direction::Down => return false,
        };
        let Some((col_idx, _)) = self.find_window(window_id) else {
            return false;
        };

        self.columns[col_idx].remove_window(window_id);
        if self.columns[col_idx].is_empty() {
            self.remove_column(col_idx);
        }

        let index = if self.columns.is_empty() {
            0
        } else if after_active {
            self.active_column + 1
        } else {
            self.active_column
        };
        self.columns
            .insert(index, Column::new(window_id, self.default_column_width));
        self.active_column = index;
        self.vertical.set_static(0.0);

        debug!(window_id, index, ?direction, "Moved window to new column");
        true
    }

    pub fn move_active_window_to_new_column(&mut self, direction: Direction) -> Option<WindowId> {
        let window_id = self.active_window()?;
        self.move_window_to_new_column(window_id, direction)
            .then_some(window_id)
    }

    /// Move the focused window to the bottom of the neighbouring column.
    pub fn consume_into_column(&mut self, direction: Direction) -> Option<WindowId> {
        let mut target = match direction {
            Direction::Left => self.active_column.checked_sub(1)?,
            Direction::Right => {
                let index = self.active_column + 1;
                if index >= self.columns.len() {
                    return None;
                }
                index
            }
            Direction::Up | Direction::Down => return None,
        };
        let window_id = self.active_window()?;
        let source = self.active_column;

        self.columns[source].remove_window(window_id);
        if self.columns[source].is_empty() {
            self.columns.remove(source);
            if target > source {
                target -= 1;
            }
        }

        let column = &mut self.columns[target];
        column.add_window(window_id, None);
        column.set_active_index(column.len() - 1);
        self.active_column = target;
        self.vertical.set_static(0.0);

        debug!(window_id, target, "Consumed window into column");
        Some(window_id)
    }

    /// Swap the active column with its neighbour.
    pub fn move_column(&mut self, direction: Direction) -> bool {
        let target = match direction {
            Direction::Left if self.active_column > 0 => self.active_column - 1,
            Direction::Right if self.active_column + 1 < self.columns.len() => self.active_column + 1,
            _ => return false,
        };
        self.columns.swap(self.active_column, target);
        self.active_column = target;
        true
    }

    pub fn set_active_column_width(&mut self, width: ColumnWidth) -> bool {
        match self.columns.get_mut(self.active_column) {
            Some(column) => {
                column.set_width(width);
                true
            }
            None => false,
        }
    }

    pub fn set_window_height(&mut self, window_id: WindowId, height: WindowHeight) -> bool {
        match self.find_window(window_id) {
            Some((col_idx, _)) => self.columns[col_idx].set_window_height(window_id, height),
            None => false,
        }
    }

    /// Move keyboard focus. Horizontal moves scroll the strip according to the
    /// centering mode, vertical moves scroll the active column to the newly
    /// focused window. Returns the focused window.
    pub fn focus(&mut self, direction: Direction, now: f64) -> Option<WindowId> {
        if self.columns.is_empty() {
            return None;
        }

        match direction {
            Direction::Left => {
                self.set_active_column(self.active_column.saturating_sub(1));
                self.animate_horizontal_to_active(now);
            }
            Direction::Right => {
                self.set_active_column(self.active_column + 1);
                self.animate_horizontal_to_active(now);
            }
            Direction::Up => {
                self.columns[self.active_column].focus_up();
                self.animate_vertical_to_active(now);
            }
            Direction::Down => {
                self.columns[self.active_column].focus_down();
                self.animate_vertical_to_active(now);
            }
        }

        self.active_window()
    }

    /// Scroll both axes towards the focused window.
    pub fn focus_active(&mut self, now: f64) {
        self.animate_horizontal_to_active(now);
        self.animate_vertical_to_active(now);
    }

    fn animate_horizontal_to_active(&mut self, now: f64) {
        if let Some(target) = self.horizontal_focus_target(self.active_column) {
            self.horizontal.animate_to(now, target, 0.0, false);
        }
    }

    fn animate_vertical_to_active(&mut self, now: f64) {
        let Some(row) = self.active_column().map(Column::active_index) else {
            return;
        };
        let points = self.snap_points(Axis::Vertical);
        if let Some(&target) = points.get(row).or(points.first()) {
            self.vertical.animate_to(now, target, 0.0, false);
        }
    }

    fn horizontal_focus_target(&self, index: usize) -> Option<f64> {
        let center = self.view_offset_to_center(index)?;
        match self.centering_mode {
            CenteringMode::Center => Some(center),
            CenteringMode::JustInView => {
                let width = self.column_width_px(self.columns.get(index)?);
                let x = self.column_x(index);
                let view = self.horizontal.target();
                let area = self.working_area.width;

                if width >= area {
                    Some(center)
                } else if x < view {
                    Some(x)
                } else if x + width > view + area {
                    Some(x + width - area)
                } else {
                    Some(view)
                }
            }
        }
    }

    /// The horizontal offset that centers column `index`.
    pub fn view_offset_to_center(&self, index: usize) -> Option<f64> {
        let column = self.columns.get(index)?;
        let width = self.column_width_px(column);
        Some(self.column_x(index) - (self.working_area.width - width) / 2.0)
    }

    /// Jump the strip so the active column is centered. Does nothing while a
    /// horizontal gesture owns the axis.
    pub fn center_active_column(&mut self) {
        if self.horizontal.is_gesture() {
            return;
        }
        if let Some(target) = self.view_offset_to_center(self.active_column) {
            self.horizontal.set_static(target);
        }
    }

    /// Offsets that center each column (horizontal) or each window of the
    /// active column (vertical), in order.
    pub fn snap_points(&self, axis: Axis) -> Vec<f64> {
        match axis {
            Axis::Horizontal => {
                let area = self.working_area.width;
                let mut x = 0.0;
                let mut points = Vec::with_capacity(self.columns.len());
                for column in &self.columns {
                    let width = self.column_width_px(column);
                    points.push(x - (area - width) / 2.0);
                    x += width + self.gap;
                }
                points
            }
            Axis::Vertical => {
                let Some(column) = self.active_column() else {
                    return vec![0.0];
                };
                if column.len() <= 1 {
                    return vec![0.0];
                }
                let area = self.working_area.height;
                let mut y = 0.0;
                let mut points = Vec::with_capacity(column.len());
                for height in column.resolve_heights(area) {
                    points.push(y - (area - height) / 2.0);
                    y += height + self.gap;
                }
                points
            }
        }
    }

    pub fn begin_gesture(&mut self, axis: Axis, now: f64, is_touchpad: bool) -> bool {
        let begun = self.offset_mut(axis).begin_gesture(now, is_touchpad);
        if begun {
            debug!(?axis, is_touchpad, "Gesture began");
        }
        begun
    }

    pub fn update_gesture(&mut self, axis: Axis, delta: f64, timestamp: f64) -> bool {
        let extent = match axis {
            Axis::Horizontal => self.working_area.width,
            Axis::Vertical => self.working_area.height,
        };
        let one_to_one = self.one_to_one;
        self.offset_mut(axis)
            .update_gesture(delta, timestamp, extent, one_to_one)
    }

    /// End a gesture and snap. A snap moves the active column (horizontal) or
    /// the active window of the active column (vertical) to the chosen point.
    pub fn end_gesture(&mut self, axis: Axis, now: f64, cancelled: bool) -> Option<GestureEnd> {
        let points = self.snap_points(axis);
        let strategy = self.snap_strategy;
        let end = self
            .offset_mut(axis)
            .end_gesture(now, cancelled, &points, strategy)?;

        if let GestureEnd::Snapped { index, .. } = end {
            match axis {
                Axis::Horizontal => self.set_active_column(index),
                Axis::Vertical => {
                    if let Some(column) = self.columns.get_mut(self.active_column) {
                        column.set_active_index(index);
                    }
                }
            }
        }

        debug!(?axis, ?end, active = self.active_column, "Gesture ended");
        Some(end)
    }

    /// Settle finished animations on both axes. Returns true if either axis
    /// changed state.
    pub fn advance(&mut self, now: f64) -> bool {
        let horizontal = self.horizontal.advance(now);
        let vertical = self.vertical.advance(now);
        horizontal || vertical
    }

    /// Whether either axis moves on its own, without further input.
    pub fn is_animating(&self) -> bool {
        fn moving(offset: &ViewOffset) -> bool {
            match offset {
                ViewOffset::Static(_) => false,
                ViewOffset::Animating(_) => true,
                ViewOffset::Gesture(gesture) => gesture.deceleration.is_some(),
            }
        }
        moving(&self.horizontal) || moving(&self.vertical)
    }

    /// Park a column no further than `screen_margin` beyond the working area
    /// and classify it.
    fn constrain_column(&self, x: f64, width: f64) -> (f64, Visibility) {
        let area = self.working_area;
        let bounds = Rect::new(
            area.x - self.screen_margin,
            area.y,
            area.width + 2.0 * self.screen_margin,
            area.height,
        );

        let x = x.max(bounds.x - width).min(bounds.right());
        let column = Rect::new(x, area.y, width, area.height);
        let visibility = if column.intersects(&bounds) {
            Visibility::Visible
        } else if column.right() <= bounds.x {
            Visibility::OffScreenLeft
        } else {
            Visibility::OffScreenRight
        };
        (x, visibility)
    }

    /// Frames of every window at time `now`, in column then stacking order.
    pub fn compute_placements(&self, now: f64) -> Vec<WindowPlacement> {
        let area = self.working_area;
        let horizontal = self.horizontal.current(now);
        let vertical = self.vertical.current(now);

        let mut placements = Vec::with_capacity(self.window_count());
        let mut x = area.x - horizontal;

        for (col_idx, column) in self.columns.iter().enumerate() {
            let width = self.column_width_px(column);
            let (column_x, visibility) = self.constrain_column(x, width);

            let shift = if col_idx == self.active_column {
                vertical
            } else {
                0.0
            };
            let mut y = area.y - shift;

            for (&window_id, height) in column.windows().iter().zip(column.resolve_heights(area.height)) {
                placements.push(WindowPlacement {
                    window_id,
                    rect: Rect::new(column_x, y, width, height),
                    visibility,
                    column_index: col_idx,
                });
                y += height + self.gap;
            }

            x += width + self.gap;
        }

        placements
    }

    /// Write every window's frame to `sink`, once per window. Rejected writes
    /// are logged and not retried.
    pub fn layout<S: FrameSink + ?Sized>(&self, now: f64, sink: &mut S, animate: bool) -> Vec<WindowPlacement> {
        let placements = self.compute_placements(now);
        for placement in &placements {
            if let Err(e) = sink.set_frame(placement.window_id, placement.rect, animate) {
                warn!("Frame write failed: {}", e);
            }
        }
        placements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spring::SpringParams;
    use crate::FrameSinkError;

    #[derive(Default)]
    struct RecordingSink {
        writes: Vec<(WindowId, Rect, bool)>,
        reject: Option<WindowId>,
    }

    impl FrameSink for RecordingSink {
        fn set_frame(&mut self, window: WindowId, rect: Rect, animate: bool) -> Result<(), FrameSinkError> {
            self.writes.push((window, rect, animate));
            if self.reject == Some(window) {
                return Err(FrameSinkError::Rejected {
                    window,
                    reason: "test".to_string(),
                });
            }
            Ok(())
        }
    }

    fn space() -> ScrollingSpace {
        ScrollingSpace::new(Rect::new(0.0, 0.0, 1000.0, 800.0))
    }

    fn settle(space: &mut ScrollingSpace, start: f64) -> f64 {
        let mut now = start;
        for _ in 0..2000 {
            now += 1.0 / 120.0;
            space.advance(now);
            if !space.is_animating() {
                return now;
            }
        }
        panic!("space never settled");
    }

    fn three_fixed_columns() -> ScrollingSpace {
        let mut space = space();
        space.add_window(1, Some(ColumnWidth::Fixed(400.0)), true);
        space.add_window(2, Some(ColumnWidth::Fixed(500.0)), true);
        space.add_window(3, Some(ColumnWidth::Fixed(300.0)), true);
        space
    }

    #[test]
    fn test_add_window_creates_column_after_active() {
        let mut space = space();
        space.add_window(1, None, true);
        assert_eq!(space.active_column_index(), 0);
        space.add_window(2, None, true);
        assert_eq!(space.active_column_index(), 1);

        space.focus(Direction::Left, 0.0);
        space.add_window(3, None, true);

        let order: Vec<WindowId> = space.columns().iter().map(|c| c.windows()[0]).collect();
        assert_eq!(order, vec![1, 3, 2]);
        assert_eq!(space.active_window(), Some(3));
    }

    #[test]
    fn test_add_window_without_activation() {
        let mut space = space();
        space.add_window(1, None, false);
        space.add_window(2, None, false);
        assert_eq!(space.active_window(), Some(1));
        assert_eq!(space.column_count(), 2);
    }

    #[test]
    fn test_remove_window_deletes_empty_column_and_clamps() {
        let mut space = space();
        space.add_window(1, None, true);
        space.add_window(2, None, true);
        space.add_window(3, None, true);

        assert!(space.remove_window(3));
        assert_eq!(space.column_count(), 2);
        assert_eq!(space.active_column_index(), 1);
        assert_eq!(space.active_window(), Some(2));

        assert!(space.remove_window(1));
        assert_eq!(space.active_column_index(), 0);
        assert_eq!(space.active_window(), Some(2));

        assert!(!space.remove_window(1));
        assert!(space.remove_window(2));
        assert!(space.is_empty());
        assert_eq!(space.active_window(), None);
    }

    #[test]
    fn test_snap_points_center_each_column() {
        let space = three_fixed_columns();
        let points = space.snap_points(Axis::Horizontal);
        assert_eq!(points, vec![-300.0, 150.0, 550.0]);

        let mut centered = space.clone();
        for (idx, &point) in points.iter().enumerate() {
            centered.horizontal.set_static(point);
            let placement = &centered.compute_placements(0.0)[idx];
            let center = placement.rect.x + placement.rect.width / 2.0;
            assert_eq!(center, 500.0, "column {} not centered", idx);
        }
    }

    #[test]
    fn test_gesture_end_selects_nearest_column() {
        let mut space = three_fixed_columns();
        space.focus(Direction::Left, 0.0);
        space.focus(Direction::Left, 0.0);
        settle(&mut space, 0.0);
        assert_eq!(space.active_column_index(), 0);
        assert_eq!(space.horizontal.current(10.0), -300.0);

        assert!(space.begin_gesture(Axis::Horizontal, 20.0, true));
        space.update_gesture(Axis::Horizontal, 820.0, 20.0);
        // 520 is closest to 550.
        let end = space.end_gesture(Axis::Horizontal, 20.0, false);
        assert_eq!(end, Some(GestureEnd::Snapped { index: 2, target: 550.0 }));
        assert_eq!(space.active_column_index(), 2);
    }

    #[test]
    fn test_cancelled_gesture_keeps_active_column() {
        let mut space = three_fixed_columns();
        space.horizontal.set_static(550.0);
        assert_eq!(space.active_column_index(), 2);

        assert!(space.begin_gesture(Axis::Horizontal, 1.0, true));
        space.update_gesture(Axis::Horizontal, -450.0, 1.0);
        // Released at 100, nearest to column 1 at 150.
        assert_eq!(space.horizontal.current(1.0), 100.0);

        let end = space.end_gesture(Axis::Horizontal, 1.0, true);
        assert_eq!(end, Some(GestureEnd::Cancelled { target: 550.0 }));
        assert_eq!(space.active_column_index(), 2);
        match &space.horizontal {
            ViewOffset::Animating(spring) => {
                assert_eq!(spring.from, 100.0);
                assert_eq!(spring.to, 550.0);
                assert_eq!(spring.initial_velocity, 0.0);
                assert_eq!(spring.params, SpringParams::sticky());
            }
            other => panic!("Expected Animating, got {:?}", other),
        }

        let done = settle(&mut space, 1.0);
        assert_eq!(space.horizontal.current(done), 550.0);
        assert_eq!(space.active_column_index(), 2);
    }

    #[test]
    fn test_horizontal_snap_to_other_column_resets_vertical() {
        let mut space = space();
        space.add_window(1, None, true);
        space.add_window(2, None, true);
        space.consume_into_column(Direction::Left);
        space.add_window(3, None, true);
        space.focus(Direction::Left, 0.0);
        space.focus(Direction::Down, 0.0);
        settle(&mut space, 0.0);
        assert!(space.vertical.current(10.0) != 0.0);

        space.begin_gesture(Axis::Horizontal, 20.0, true);
        space.update_gesture(Axis::Horizontal, 700.0, 20.0);
        space.end_gesture(Axis::Horizontal, 20.0, false);
        assert_eq!(space.active_column_index(), 1);
        assert!(matches!(space.vertical, ViewOffset::Static(v) if v == 0.0));
    }

    #[test]
    fn test_vertical_snap_points() {
        let mut space = space();
        space.add_window(1, None, true);
        assert_eq!(space.snap_points(Axis::Vertical), vec![0.0]);

        space.gap = 10.0;
        space.add_window(2, None, true);
        space.consume_into_column(Direction::Left);
        space.add_window(3, None, true);
        space.consume_into_column(Direction::Left);
        assert_eq!(space.column_count(), 1);
        assert_eq!(space.snap_points(Axis::Vertical), vec![0.0, 810.0, 1620.0]);

        space.set_window_height(2, WindowHeight::Fixed(400.0));
        // Window 2 is 400 tall and centered: 810 - (800 - 400) / 2.
        assert_eq!(space.snap_points(Axis::Vertical), vec![0.0, 610.0, 1220.0]);
    }

    #[test]
    fn test_vertical_gesture_activates_window() {
        let mut space = space();
        space.add_window(1, None, true);
        space.add_window(2, None, true);
        space.consume_into_column(Direction::Left);
        assert_eq!(space.active_window(), Some(2));

        space.begin_gesture(Axis::Vertical, 0.0, true);
        space.update_gesture(Axis::Vertical, -900.0, 0.0);
        space.end_gesture(Axis::Vertical, 0.0, false);
        assert_eq!(space.active_window(), Some(1));
    }

    #[test]
    fn test_empty_space_focus_is_safe() {
        let mut space = space();
        for direction in [Direction::Left, Direction::Right, Direction::Up, Direction::Down] {
            assert_eq!(space.focus(direction, 0.0), None);
            assert_eq!(space.active_column_index(), 0);
        }
        assert!(space.compute_placements(0.0).is_empty());
        assert_eq!(space.snap_points(Axis::Horizontal), Vec::<f64>::new());
        assert_eq!(space.consume_into_column(Direction::Left), None);
        assert_eq!(space.move_active_window_to_new_column(Direction::Right), None);
    }

    #[test]
    fn test_layout_positions_columns_and_gap() {
        let mut space = space();
        space.gap = 16.0;
        space.add_window(1, None, true);
        space.add_window(2, None, true);

        let mut sink = RecordingSink::default();
        let placements = space.layout(0.0, &mut sink, false);

        let a = placements[0].rect;
        let b = placements[1].rect;
        assert_eq!(a, Rect::new(0.0, 0.0, 800.0, 800.0));
        assert_eq!(b.x, a.x + a.width + 16.0);
        assert_eq!(sink.writes.len(), 2);
        assert!(sink.writes.iter().all(|&(_, _, animate)| !animate));
    }

    #[test]
    fn test_rejected_write_does_not_stop_layout() {
        let mut space = space();
        space.add_window(1, None, true);
        space.add_window(2, None, true);

        let mut sink = RecordingSink {
            reject: Some(1),
            ..Default::default()
        };
        space.layout(0.0, &mut sink, true);
        let written: Vec<WindowId> = sink.writes.iter().map(|w| w.0).collect();
        assert_eq!(written, vec![1, 2]);
    }

    #[test]
    fn test_only_active_column_is_shifted_vertically() {
        let mut space = space();
        space.add_window(1, None, true);
        space.add_window(2, None, true);
        space.consume_into_column(Direction::Left);
        space.add_window(3, None, true);
        space.focus(Direction::Left, 0.0);
        settle(&mut space, 0.0);
        space.focus(Direction::Down, 10.0);
        settle(&mut space, 10.0);

        let placements = space.compute_placements(20.0);
        let by_id = |id| placements.iter().find(|p| p.window_id == id).map(|p| p.rect);
        assert_eq!(by_id(2).map(|r| r.y), Some(0.0));
        assert_eq!(by_id(1).map(|r| r.y), Some(-800.0));
        assert_eq!(by_id(3).map(|r| r.y), Some(0.0));
    }

    #[test]
    fn test_off_screen_columns_are_parked() {
        let mut space = space();
        for id in 1..=4 {
            space.add_window(id, None, true);
        }
        space.focus(Direction::Left, 0.0);
        space.focus(Direction::Left, 0.0);
        space.focus(Direction::Left, 0.0);
        space.horizontal.set_static(0.0);

        let placements = space.compute_placements(0.0);
        assert_eq!(placements[0].visibility, Visibility::Visible);
        assert_eq!(placements[1].visibility, Visibility::Visible);
        assert_eq!(placements[2].visibility, Visibility::OffScreenRight);
        assert_eq!(placements[2].rect.x, 1100.0);
        assert_eq!(placements[3].rect.x, 1100.0);

        space.horizontal.set_static(2400.0);
        let placements = space.compute_placements(0.0);
        assert_eq!(placements[0].visibility, Visibility::OffScreenLeft);
        assert_eq!(placements[0].rect.x, -900.0);
        assert_eq!(placements[3].visibility, Visibility::Visible);
        assert_eq!(placements[3].rect.x, 0.0);
    }

    #[test]
    fn test_parking_is_continuous() {
        let mut space = space();
        space.add_window(1, Some(ColumnWidth::Fixed(400.0)), true);
        space.add_window(2, Some(ColumnWidth::Fixed(400.0)), true);

        // Column 2 starts at strip x 400; it crosses the right parking edge
        // (1100) when the offset passes -700.
        for offset in [-690.0, -700.0, -710.0] {
            space.horizontal.set_static(offset);
            let x = space.compute_placements(0.0)[1].rect.x;
            assert_eq!(x, (400.0 - offset).min(1100.0));
        }
    }

    #[test]
    fn test_visibility_counts_the_margin() {
        let mut space = space();
        space.add_window(1, Some(ColumnWidth::Fixed(400.0)), true);
        space.add_window(2, Some(ColumnWidth::Fixed(400.0)), true);

        // Column 1 ends exactly on the widened left edge.
        space.horizontal.set_static(500.0);
        let first = &space.compute_placements(0.0)[0];
        assert_eq!(first.rect.x, -500.0);
        assert_eq!(first.visibility, Visibility::OffScreenLeft);

        space.horizontal.set_static(499.0);
        assert_eq!(space.compute_placements(0.0)[0].visibility, Visibility::Visible);

        space.screen_margin = 0.0;
        space.horizontal.set_static(-1000.0);
        let placements = space.compute_placements(0.0);
        assert_eq!(placements[0].rect.x, 1000.0);
        assert_eq!(placements[0].visibility, Visibility::OffScreenRight);
        assert_eq!(placements[1].rect.x, 1000.0);
    }

    #[test]
    fn test_move_window_to_new_column() {
        let mut space = space();
        space.add_window(1, None, true);
        space.add_window(2, None, true);
        assert_eq!(space.consume_into_column(Direction::Left), Some(2));
        assert_eq!(space.column_count(), 1);
        assert_eq!(space.columns()[0].windows(), &[1, 2]);
        assert_eq!(space.active_window(), Some(2));

        assert_eq!(space.move_active_window_to_new_column(Direction::Right), Some(2));
        assert_eq!(space.column_count(), 2);
        assert_eq!(space.active_column_index(), 1);
        assert_eq!(space.columns()[0].windows(), &[1]);

        assert_eq!(space.move_active_window_to_new_column(Direction::Left), Some(2));
        let order: Vec<WindowId> = space.columns().iter().map(|c| c.windows()[0]).collect();
        assert_eq!(order, vec![2, 1]);
        assert_eq!(space.active_column_index(), 0);

        assert!(!space.move_window_to_new_column(1, Direction::Up));
        assert!(!space.move_window_to_new_column(99, Direction::Left));
    }

    #[test]
    fn test_consume_into_right_column() {
        let mut space = space();
        space.add_window(1, None, true);
        space.add_window(2, None, true);
        space.add_window(3, None, true);
        space.focus(Direction::Left, 0.0);
        space.focus(Direction::Left, 0.0);

        assert_eq!(space.consume_into_column(Direction::Right), Some(1));
        assert_eq!(space.column_count(), 2);
        assert_eq!(space.active_column_index(), 0);
        assert_eq!(space.columns()[0].windows(), &[2, 1]);
        assert_eq!(space.active_window(), Some(1));
    }

    #[test]
    fn test_move_column() {
        let mut space = space();
        space.add_window(1, None, true);
        space.add_window(2, None, true);
        space.add_window(3, None, true);
        space.focus(Direction::Left, 0.0);

        assert!(space.move_column(Direction::Left));
        assert_eq!(space.active_column_index(), 0);
        assert_eq!(space.columns()[0].windows(), &[2]);
        assert_eq!(space.columns()[1].windows(), &[1]);

        assert!(!space.move_column(Direction::Left));
        assert!(space.move_column(Direction::Right));
        assert_eq!(space.columns()[1].windows(), &[2]);
        assert!(!space.move_column(Direction::Up));
    }

    #[test]
    fn test_focus_centers_column() {
        let mut space = three_fixed_columns();
        space.focus(Direction::Left, 0.0);
        assert!(space.horizontal.is_animating());
        assert_eq!(space.horizontal.target(), 150.0);
        let done = settle(&mut space, 0.0);
        assert_eq!(space.horizontal.current(done), 150.0);
    }

    #[test]
    fn test_focus_just_in_view() {
        let mut space = space();
        space.centering_mode = CenteringMode::JustInView;
        for id in 1..=4 {
            space.add_window(id, Some(ColumnWidth::Fixed(400.0)), true);
        }
        assert_eq!(space.active_column_index(), 3);

        space.focus(Direction::Left, 0.0);
        assert_eq!(space.horizontal.target(), 200.0);
        settle(&mut space, 0.0);

        space.focus(Direction::Left, 10.0);
        assert!(space.horizontal.is_static());
        assert_eq!(space.horizontal.current(10.0), 200.0);

        space.focus(Direction::Left, 10.0);
        assert_eq!(space.horizontal.target(), 0.0);
    }

    #[test]
    fn test_focus_up_down_scrolls_column() {
        let mut space = space();
        space.add_window(1, None, true);
        space.add_window(2, None, true);
        space.consume_into_column(Direction::Left);

        assert_eq!(space.focus(Direction::Up, 0.0), Some(1));
        assert_eq!(space.vertical.target(), 0.0);
        assert_eq!(space.focus(Direction::Down, 0.0), Some(2));
        assert_eq!(space.vertical.target(), 800.0);
    }

    #[test]
    fn test_center_active_column() {
        let mut space = three_fixed_columns();
        space.center_active_column();
        assert!(matches!(space.horizontal, ViewOffset::Static(v) if v == 550.0));
        assert_eq!(space.view_offset_to_center(7), None);
    }

    #[test]
    fn test_set_active_column_width() {
        let mut space = space();
        assert!(!space.set_active_column_width(ColumnWidth::Fixed(10.0)));
        space.add_window(1, None, true);
        assert!(space.set_active_column_width(ColumnWidth::Proportion(0.5)));
        assert_eq!(space.compute_placements(0.0)[0].rect.width, 500.0);
    }
}
