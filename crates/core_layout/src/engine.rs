//! Command surface and per-frame driver of the layout.
//!
//! [`LayoutEngine`] owns the scrolling space, the gesture classifier and the
//! frame animator, and is handed its window handles and frame sink at
//! construction. Everything runs on the caller's thread; the caller supplies
//! the time and calls [`LayoutEngine::tick`] once per frame while
//! [`LayoutEngine::needs_tick`] is true.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::column::{ColumnWidth, WindowHeight};
use crate::frame_animator::FrameAnimator;
use crate::gesture::{EventDisposition, GestureClassifier, ScrollEvent};
use crate::scrolling_space::ScrollingSpace;
use crate::{Axis, Direction, FrameSink, LayoutError, WindowHandle, WindowId, WindowPlacement};

/// Behaviour switches of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Move windows to new frames with springs on structural changes.
    pub animate_windows: bool,
    pub gestures_enabled: bool,
    /// Only react to scroll events while scanning mode is active.
    pub require_scanning_mode: bool,
    /// Activate and scroll to newly added windows.
    pub focus_new_windows: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            animate_windows: true,
            gestures_enabled: true,
            require_scanning_mode: false,
            focus_new_windows: true,
        }
    }
}

pub struct LayoutEngine<H: WindowHandle, S: FrameSink> {
    space: ScrollingSpace,
    classifier: GestureClassifier,
    animator: FrameAnimator,
    windows: HashMap<WindowId, H>,
    sink: S,
    options: EngineOptions,
    scanning: bool,
    needs_layout: bool,
}

impl<H: WindowHandle, S: FrameSink> LayoutEngine<H, S> {
    pub fn new(space: ScrollingSpace, sink: S, options: EngineOptions) -> Self {
        Self {
            space,
            classifier: GestureClassifier::new(),
            animator: FrameAnimator::new(),
            windows: HashMap::new(),
            sink,
            options,
            scanning: false,
            needs_layout: false,
        }
    }

    pub fn space(&self) -> &ScrollingSpace {
        &self.space
    }

    /// Mutable access for settings changes; schedules a layout pass.
    pub fn space_mut(&mut self) -> &mut ScrollingSpace {
        self.needs_layout = true;
        &mut self.space
    }

    pub fn classifier_mut(&mut self) -> &mut GestureClassifier {
        &mut self.classifier
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub fn set_options(&mut self, options: EngineOptions) {
        self.options = options;
    }

    pub fn window(&self, window_id: WindowId) -> Option<&H> {
        self.windows.get(&window_id)
    }

    pub fn windows(&self) -> impl Iterator<Item = &H> {
        self.windows.values()
    }

    pub fn focused_window(&self) -> Option<WindowId> {
        self.space.active_window()
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    pub fn placements(&self, now: f64) -> Vec<WindowPlacement> {
        self.space.compute_placements(now)
    }

    pub fn add_window(&mut self, handle: H, width: Option<ColumnWidth>, now: f64) -> Result<(), LayoutError> {
        let window_id = handle.id();
        if self.windows.contains_key(&window_id) {
            return Err(LayoutError::DuplicateWindow(window_id));
        }

        self.windows.insert(window_id, handle);
        self.space
            .add_window(window_id, width, self.options.focus_new_windows);
        if self.options.focus_new_windows {
            self.space.focus_active(now);
        }

        info!(window_id, "Window added");
        self.layout(now, true);
        Ok(())
    }

    pub fn remove_window(&mut self, window_id: WindowId, now: f64) -> Result<H, LayoutError> {
        let handle = self
            .windows
            .remove(&window_id)
            .ok_or(LayoutError::WindowNotFound(window_id))?;

        self.space.remove_window(window_id);
        self.animator.cancel(window_id);
        self.space.focus_active(now);

        info!(window_id, "Window removed");
        self.layout(now, true);
        Ok(handle)
    }

    pub fn focus(&mut self, direction: Direction, now: f64) -> Option<WindowId> {
        let focused = self.space.focus(direction, now);
        debug!(?direction, ?focused, "Focus");
        self.layout(now, false);
        focused
    }

    pub fn move_active_window_to_new_column(&mut self, direction: Direction, now: f64) -> Option<WindowId> {
        let moved = self.space.move_active_window_to_new_column(direction)?;
        self.space.focus_active(now);
        self.layout(now, true);
        Some(moved)
    }

    pub fn consume_into_column(&mut self, direction: Direction, now: f64) -> Option<WindowId> {
        let moved = self.space.consume_into_column(direction)?;
        self.space.focus_active(now);
        self.layout(now, true);
        Some(moved)
    }

    pub fn move_column(&mut self, direction: Direction, now: f64) -> bool {
        if !self.space.move_column(direction) {
            return false;
        }
        self.space.focus_active(now);
        self.layout(now, true);
        true
    }

    pub fn set_column_width(&mut self, width: ColumnWidth, now: f64) -> bool {
        if !self.space.set_active_column_width(width) {
            return false;
        }
        self.space.focus_active(now);
        self.layout(now, true);
        true
    }

    pub fn set_window_height(&mut self, window_id: WindowId, height: WindowHeight, now: f64) -> Result<(), LayoutError> {
        if !self.space.set_window_height(window_id, height) {
            return Err(LayoutError::WindowNotFound(window_id));
        }
        self.layout(now, true);
        Ok(())
    }

    /// Route a scroll event to the gesture machinery.
    pub fn handle_scroll(&mut self, event: &ScrollEvent) -> EventDisposition {
        if !self.options.gestures_enabled {
            return EventDisposition::PassThrough;
        }
        if self.options.require_scanning_mode && !self.scanning {
            return EventDisposition::PassThrough;
        }

        let disposition = self.classifier.handle(&mut self.space, event);
        if disposition == EventDisposition::Consumed {
            self.needs_layout = true;
        }
        disposition
    }

    /// Enter or leave scanning mode. Entering centers the active column at
    /// once; leaving releases any gesture in progress as if the touch had
    /// ended, since its remaining events will no longer reach the engine.
    pub fn set_scanning(&mut self, active: bool, now: f64) {
        if active == self.scanning {
            return;
        }
        self.scanning = active;
        info!(active, "Scanning mode");

        if active {
            self.space.center_active_column();
            self.layout(now, false);
            return;
        }

        for axis in [Axis::Horizontal, Axis::Vertical] {
            if self.space.offset(axis).is_gesture() {
                self.space.end_gesture(axis, now, false);
                self.needs_layout = true;
            }
        }
        self.classifier.reset();
    }

    /// Settle finished offset animations. Returns true if an axis changed
    /// state.
    pub fn advance_animations(&mut self, now: f64) -> bool {
        let changed = self.space.advance(now);
        if changed || self.space.is_animating() {
            self.needs_layout = true;
        }
        changed
    }

    /// Run a layout pass if anything moved since the last one.
    pub fn layout_if_needed(&mut self, now: f64) -> bool {
        if !self.needs_layout {
            return false;
        }
        self.layout(now, false);
        true
    }

    /// One frame: advance offsets, lay out, then step frame animations.
    pub fn tick(&mut self, now: f64) {
        self.advance_animations(now);
        self.layout_if_needed(now);
        self.animator.tick(now, &mut self.sink);
    }

    pub fn needs_tick(&self) -> bool {
        self.needs_layout
            || self.space.is_animating()
            || self.space.offset(Axis::Horizontal).is_gesture()
            || self.space.offset(Axis::Vertical).is_gesture()
            || self.animator.is_animating()
    }

    fn is_view_moving(&self) -> bool {
        self.space.is_animating()
            || self.space.offset(Axis::Horizontal).is_gesture()
            || self.space.offset(Axis::Vertical).is_gesture()
    }

    /// Compute placements and hand them out. With `animate`, windows whose
    /// frame changes go through the frame animator; windows already animating
    /// are retargeted. Everything else is written directly, with the animate
    /// hint set while the view is in motion.
    fn layout(&mut self, now: f64, animate: bool) {
        let placements = self.space.compute_placements(now);
        let animate = animate && self.options.animate_windows;
        let moving = self.is_view_moving();

        for placement in &placements {
            let window_id = placement.window_id;
            let to = placement.rect;

            if self.animator.is_animating_window(window_id) {
                if self.animator.target(window_id) != Some(to) {
                    let from = self.animator.current_frame(window_id, now).unwrap_or(to);
                    self.animator.animate(window_id, from, to, now);
                }
                continue;
            }

            if animate {
                let from = self.windows.get(&window_id).map(WindowHandle::current_frame);
                if let Some(from) = from.filter(|&from| from != to) {
                    self.animator.animate(window_id, from, to, now);
                    continue;
                }
            }

            if let Err(e) = self.sink.set_frame(window_id, to, moving) {
                warn!("Frame write failed: {}", e);
            }
        }

        self.needs_layout = false;
        debug!(windows = placements.len(), animate, moving, "Layout pass");
    }
}
