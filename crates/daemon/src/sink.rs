//! Frame writes from the layout engine to the virtual window store.
//!
//! The engine writes through [`DaemonSink`], which rate-limits and
//! deduplicates against a [`FrameCache`] and queues the surviving writes for
//! the [`FrameWriter`] task. The writer applies them to the shared
//! [`WindowStore`], which is also what window handles read their current
//! frame from.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use panestrip_core_layout::{FrameSink, FrameSinkError, Rect, WindowHandle, WindowId};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::config::FrameCacheConfig;

#[derive(Debug, Clone, Copy)]
struct CachedFrame {
    frame: Rect,
    written_at: Instant,
}

/// Last written frame per window.
#[derive(Debug)]
pub struct FrameCache {
    frames: Mutex<HashMap<WindowId, CachedFrame>>,
    min_update_interval: Duration,
    position_threshold: f64,
    size_threshold: f64,
}

impl FrameCache {
    pub fn new(config: &FrameCacheConfig) -> Self {
        Self {
            frames: Mutex::new(HashMap::new()),
            min_update_interval: Duration::from_millis(config.min_update_interval_ms),
            position_threshold: config.position_threshold,
            size_threshold: config.size_threshold,
        }
    }

    /// Whether a write of `frame` should go through.
    ///
    /// Animated writes are dropped when they come too soon after the previous
    /// write or move the window less than the thresholds. A final
    /// (non-animated) write only needs to differ from the cached frame.
    pub fn should_update(&self, window: WindowId, frame: Rect, animate: bool, now: Instant) -> bool {
        let frames = self.frames.lock();
        let Some(cached) = frames.get(&window) else {
            return true;
        };

        if !animate {
            return cached.frame != frame;
        }

        if now.saturating_duration_since(cached.written_at) < self.min_update_interval {
            return false;
        }

        let position_changed = (cached.frame.x - frame.x).abs() > self.position_threshold
            || (cached.frame.y - frame.y).abs() > self.position_threshold;
        let size_changed = (cached.frame.width - frame.width).abs() > self.size_threshold
            || (cached.frame.height - frame.height).abs() > self.size_threshold;

        position_changed || size_changed
    }

    /// True if the size is within the threshold of the cached one, so the
    /// writer may skip the resize.
    pub fn only_position_changed(&self, window: WindowId, frame: Rect) -> bool {
        self.frames.lock().get(&window).is_some_and(|cached| {
            (cached.frame.width - frame.width).abs() <= self.size_threshold
                && (cached.frame.height - frame.height).abs() <= self.size_threshold
        })
    }

    pub fn update_frame(&self, window: WindowId, frame: Rect, now: Instant) {
        self.frames.lock().insert(
            window,
            CachedFrame {
                frame,
                written_at: now,
            },
        );
    }

    pub fn frame(&self, window: WindowId) -> Option<Rect> {
        self.frames.lock().get(&window).map(|cached| cached.frame)
    }

    pub fn clear(&self, window: WindowId) {
        self.frames.lock().remove(&window);
    }

    pub fn clear_all(&self) {
        self.frames.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }
}

/// State of a window hosted by the daemon.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualWindowState {
    pub title: String,
    pub app: String,
    pub frame: Rect,
    /// Number of frame writes applied.
    pub writes: u64,
}

/// Windows announced over IPC, shared between the event loop and the writer.
#[derive(Debug, Clone, Default)]
pub struct WindowStore {
    windows: Arc<Mutex<HashMap<WindowId, VirtualWindowState>>>,
}

impl WindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, window: WindowId, title: String, app: String, frame: Rect) {
        self.windows.lock().insert(
            window,
            VirtualWindowState {
                title,
                app,
                frame,
                writes: 0,
            },
        );
    }

    pub fn remove(&self, window: WindowId) -> Option<VirtualWindowState> {
        self.windows.lock().remove(&window)
    }

    pub fn contains(&self, window: WindowId) -> bool {
        self.windows.lock().contains_key(&window)
    }

    pub fn get(&self, window: WindowId) -> Option<VirtualWindowState> {
        self.windows.lock().get(&window).cloned()
    }

    pub fn frame(&self, window: WindowId) -> Option<Rect> {
        self.windows.lock().get(&window).map(|state| state.frame)
    }

    /// Apply a queued write. Returns false if the window is gone.
    fn apply(&self, write: &FrameWrite) -> bool {
        let mut windows = self.windows.lock();
        let Some(state) = windows.get_mut(&write.window) else {
            return false;
        };
        state.frame.x = write.frame.x;
        state.frame.y = write.frame.y;
        if !write.only_position {
            state.frame.width = write.frame.width;
            state.frame.height = write.frame.height;
        }
        state.writes += 1;
        true
    }
}

/// Handle the engine keeps for each managed window.
#[derive(Debug, Clone)]
pub struct VirtualWindow {
    id: WindowId,
    store: WindowStore,
}

impl VirtualWindow {
    pub fn new(id: WindowId, store: WindowStore) -> Self {
        Self { id, store }
    }
}

impl WindowHandle for VirtualWindow {
    fn id(&self) -> WindowId {
        self.id
    }

    fn current_frame(&self) -> Rect {
        self.store.frame(self.id).unwrap_or_default()
    }
}

/// A write queued for the writer task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameWrite {
    pub window: WindowId,
    pub frame: Rect,
    pub only_position: bool,
}

/// Frame sink handed to the layout engine.
pub struct DaemonSink {
    cache: Arc<FrameCache>,
    store: WindowStore,
    tx: mpsc::UnboundedSender<FrameWrite>,
}

impl DaemonSink {
    pub fn new(cache: Arc<FrameCache>, store: WindowStore, tx: mpsc::UnboundedSender<FrameWrite>) -> Self {
        Self { cache, store, tx }
    }

    pub fn cache(&self) -> &FrameCache {
        &self.cache
    }

    pub fn set_cache(&mut self, cache: Arc<FrameCache>) {
        self.cache = cache;
    }
}

impl FrameSink for DaemonSink {
    fn set_frame(&mut self, window: WindowId, rect: Rect, animate: bool) -> Result<(), FrameSinkError> {
        if !self.store.contains(window) {
            return Err(FrameSinkError::Rejected {
                window,
                reason: "unknown window".to_string(),
            });
        }

        let now = Instant::now();
        if !self.cache.should_update(window, rect, animate, now) {
            trace!(window, animate, "Frame write skipped");
            return Ok(());
        }

        // Final writes always carry the size. A position-only write leaves
        // the window at its old size, so that is what gets cached.
        let only_position = animate && self.cache.only_position_changed(window, rect);
        let applied = match self.cache.frame(window) {
            Some(cached) if only_position => Rect::new(rect.x, rect.y, cached.width, cached.height),
            _ => rect,
        };
        self.cache.update_frame(window, applied, now);

        self.tx
            .send(FrameWrite {
                window,
                frame: rect,
                only_position,
            })
            .map_err(|_| FrameSinkError::Rejected {
                window,
                reason: "frame writer stopped".to_string(),
            })
    }
}

/// Applies queued frame writes to the window store.
pub struct FrameWriter {
    store: WindowStore,
    rx: mpsc::UnboundedReceiver<FrameWrite>,
}

impl FrameWriter {
    pub fn new(store: WindowStore, rx: mpsc::UnboundedReceiver<FrameWrite>) -> Self {
        Self { store, rx }
    }

    /// Apply everything queued so far. Returns the number of writes applied.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(write) = self.rx.try_recv() {
            if self.apply(&write) {
                applied += 1;
            }
        }
        applied
    }

    /// Apply writes until every sender is dropped.
    pub async fn run(mut self) {
        while let Some(write) = self.rx.recv().await {
            self.apply(&write);
        }
        debug!("Frame writer stopped");
    }

    fn apply(&self, write: &FrameWrite) -> bool {
        let applied = self.store.apply(write);
        if applied {
            trace!(window = write.window, frame = ?write.frame, only_position = write.only_position, "Frame applied");
        } else {
            debug!(window = write.window, "Dropped frame write for closed window");
        }
        applied
    }
}

/// Sink, writer and store wired together.
pub fn frame_pipeline(config: &FrameCacheConfig, store: WindowStore) -> (DaemonSink, FrameWriter) {
    let (tx, rx) = mpsc::unbounded_channel();
    let cache = Arc::new(FrameCache::new(config));
    (
        DaemonSink::new(cache, store.clone(), tx),
        FrameWriter::new(store, rx),
    )
}
