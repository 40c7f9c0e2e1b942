//! Panestrip core layout engine.
//!
//! Platform-agnostic scrolling tiling layout.
//!
//! Windows live in columns on an infinite horizontal strip:
//! - Each new window gets its own column to the right of the active one
//! - The working area is a viewport sliding over the strip
//! - Columns are vertically scrollable lists, not stacks that must fit
//!
//! Scroll positions are spring-animated and driven by gestures, keyboard
//! commands or programmatic moves. Time is passed in explicitly as `f64`
//! seconds on one monotonic clock; nothing in this crate reads a clock or
//! performs I/O.

pub mod column;
pub mod engine;
pub mod frame_animator;
pub mod gesture;
pub mod scrolling_space;
pub mod spring;
pub mod swipe_tracker;
pub mod view_offset;

pub use column::{Column, ColumnWidth, WindowHeight};
pub use engine::{EngineOptions, LayoutEngine};
pub use frame_animator::FrameAnimator;
pub use gesture::{EventDisposition, GestureClassifier, ScrollEvent, ScrollPhase};
pub use scrolling_space::ScrollingSpace;
pub use spring::{Spring, SpringParams};
pub use swipe_tracker::SwipeTracker;
pub use view_offset::{GestureEnd, SnapStrategy, ViewOffset};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable identifier of a window, assigned by the platform adapter.
pub type WindowId = u64;

/// Errors returned by the engine's command surface.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Window {0} not found in layout")]
    WindowNotFound(WindowId),

    #[error("Window {0} is already managed")]
    DuplicateWindow(WindowId),
}

/// A frame sink refused a write.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FrameSinkError {
    #[error("Frame write for window {window} rejected: {reason}")]
    Rejected { window: WindowId, reason: String },
}

/// A rectangle in screen coordinates (pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Overlap with a positive area; shared edges do not count.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Direction of a focus or move command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

/// A scrollable axis of the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Across columns.
    Horizontal,
    /// Inside the active column.
    Vertical,
}

/// Where a placed window sits relative to the working area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Visible,
    OffScreenLeft,
    OffScreenRight,
}

/// Computed placement for a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowPlacement {
    pub window_id: WindowId,
    pub rect: Rect,
    pub visibility: Visibility,
    /// The column index this window belongs to.
    pub column_index: usize,
}

/// How keyboard focus changes scroll the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CenteringMode {
    /// Center the focused column in the working area.
    #[default]
    Center,
    /// Only scroll as far as needed to bring the focused column into view.
    JustInView,
}

/// A window the engine lays out. Identity is the id alone.
pub trait WindowHandle {
    fn id(&self) -> WindowId;

    /// The frame the window has right now, as reported by the platform.
    fn current_frame(&self) -> Rect;
}

/// Receiver of frame writes.
///
/// Writes may be applied asynchronously and may fail; the engine never
/// retries a rejected write.
pub trait FrameSink {
    fn set_frame(&mut self, window: WindowId, rect: Rect, animate: bool) -> Result<(), FrameSinkError>;
}

impl<S: FrameSink + ?Sized> FrameSink for &mut S {
    fn set_frame(&mut self, window: WindowId, rect: Rect, animate: bool) -> Result<(), FrameSinkError> {
        (**self).set_frame(window, rect, animate)
    }
}
