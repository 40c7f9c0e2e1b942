//! Columns of vertically stacked windows.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::WindowId;

/// Width policy of a column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnWidth {
    /// Fraction of the working-area width (0.5 = half the screen).
    Proportion(f64),
    /// Absolute width in pixels.
    Fixed(f64),
}

impl Default for ColumnWidth {
    fn default() -> Self {
        Self::Proportion(0.8)
    }
}

impl ColumnWidth {
    /// Resolve to pixels for a working area `working_width` wide.
    pub fn resolve(&self, working_width: f64) -> f64 {
        match *self {
            Self::Proportion(p) => working_width * p,
            Self::Fixed(px) => px,
        }
    }
}

/// Height policy of one window inside its column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowHeight {
    /// Working-area height times `weight`.
    Auto { weight: f64 },
    /// Absolute height in pixels.
    Fixed(f64),
    /// A named preset; resolves to the full working-area height.
    Preset(u32),
}

impl Default for WindowHeight {
    fn default() -> Self {
        Self::Auto { weight: 1.0 }
    }
}

impl WindowHeight {
    /// Resolve to pixels. Each window is sized as if it owned the whole
    /// viewport height; heights are not shared between siblings.
    pub fn resolve(&self, working_height: f64) -> f64 {
        match *self {
            Self::Auto { weight } => working_height * weight,
            Self::Fixed(px) => px,
            Self::Preset(_) => working_height,
        }
    }
}

/// One horizontal slot of the strip: windows stacked top to bottom.
#[derive(Debug, Clone)]
pub struct Column {
    tiles: Vec<WindowId>,
    active_index: usize,
    width: ColumnWidth,
    heights: HashMap<WindowId, WindowHeight>,
}

impl Column {
    /// Create a column holding a single window.
    pub fn new(window_id: WindowId, width: ColumnWidth) -> Self {
        let mut heights = HashMap::new();
        heights.insert(window_id, WindowHeight::default());
        Self {
            tiles: vec![window_id],
            active_index: 0,
            width,
            heights,
        }
    }

    /// Create an empty column with the given width policy.
    pub fn empty(width: ColumnWidth) -> Self {
        Self {
            tiles: Vec::new(),
            active_index: 0,
            width,
            heights: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Windows in stacking order, top first.
    pub fn windows(&self) -> &[WindowId] {
        &self.tiles
    }

    pub fn contains(&self, window_id: WindowId) -> bool {
        self.tiles.contains(&window_id)
    }

    pub fn position(&self, window_id: WindowId) -> Option<usize> {
        self.tiles.iter().position(|&w| w == window_id)
    }

    pub fn width(&self) -> ColumnWidth {
        self.width
    }

    pub fn set_width(&mut self, width: ColumnWidth) {
        self.width = width;
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    /// Activate the window at `index`, clamped into the column.
    pub fn set_active_index(&mut self, index: usize) {
        self.active_index = index.min(self.tiles.len().saturating_sub(1));
    }

    pub fn active_window(&self) -> Option<WindowId> {
        self.tiles.get(self.active_index).copied()
    }

    /// Insert a window at `index` (bottom if `None`). The active window stays
    /// the same.
    pub fn add_window(&mut self, window_id: WindowId, index: Option<usize>) {
        let was_empty = self.tiles.is_empty();
        let idx = index.unwrap_or(self.tiles.len()).min(self.tiles.len());
        self.tiles.insert(idx, window_id);
        self.heights.insert(window_id, WindowHeight::default());

        if !was_empty && idx <= self.active_index {
            self.active_index += 1;
        }
    }

    /// Remove a window. Returns false if it is not in this column.
    pub fn remove_window(&mut self, window_id: WindowId) -> bool {
        let Some(idx) = self.position(window_id) else {
            return false;
        };

        self.tiles.remove(idx);
        self.heights.remove(&window_id);

        if idx < self.active_index {
            self.active_index -= 1;
        } else if self.active_index >= self.tiles.len() {
            self.active_index = self.tiles.len().saturating_sub(1);
        }
        true
    }

    pub fn focus_up(&mut self) -> Option<WindowId> {
        if self.tiles.is_empty() {
            return None;
        }
        self.active_index = self.active_index.saturating_sub(1);
        self.active_window()
    }

    pub fn focus_down(&mut self) -> Option<WindowId> {
        if self.tiles.is_empty() {
            return None;
        }
        self.active_index = (self.active_index + 1).min(self.tiles.len() - 1);
        self.active_window()
    }

    /// Set the height policy of a window in this column. Returns false if the
    /// window is not here.
    pub fn set_window_height(&mut self, window_id: WindowId, height: WindowHeight) -> bool {
        if !self.contains(window_id) {
            return false;
        }
        self.heights.insert(window_id, height);
        true
    }

    pub fn window_height(&self, window_id: WindowId) -> WindowHeight {
        self.heights.get(&window_id).copied().unwrap_or_default()
    }

    /// Pixel height of every window, in stacking order.
    pub fn resolve_heights(&self, working_height: f64) -> Vec<f64> {
        self.tiles
            .iter()
            .map(|&w| self.window_height(w).resolve(working_height))
            .collect()
    }
}
