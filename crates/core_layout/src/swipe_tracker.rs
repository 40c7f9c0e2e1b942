//! Velocity estimation for swipe gestures.

use std::collections::VecDeque;

/// Events older than this, relative to the newest push, are dropped (seconds).
pub const HISTORY_LIMIT: f64 = 0.150;

/// Per-millisecond decay factor of touchpad kinetic scrolling.
pub const DECELERATION_TOUCHPAD: f64 = 0.997;

#[derive(Debug, Clone, Copy)]
struct SwipeEvent {
    delta: f64,
    timestamp: f64,
}

/// Accumulates timestamped deltas of one gesture.
///
/// The position is the sum of every delta ever pushed; only the velocity
/// window is bounded by [`HISTORY_LIMIT`].
#[derive(Debug, Clone, Default)]
pub struct SwipeTracker {
    history: VecDeque<SwipeEvent>,
    pos: f64,
}

impl SwipeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a delta at `timestamp` (seconds).
    pub fn push(&mut self, delta: f64, timestamp: f64) {
        self.history.push_back(SwipeEvent { delta, timestamp });
        self.pos += delta;
        self.trim_history(timestamp);
    }

    /// Sum of all pushed deltas.
    pub fn position(&self) -> f64 {
        self.pos
    }

    /// Units per second over the retained window, 0 with fewer than two
    /// samples or no elapsed time.
    pub fn velocity(&self) -> f64 {
        if self.history.len() < 2 {
            return 0.0;
        }
        let (Some(first), Some(last)) = (self.history.front(), self.history.back()) else {
            return 0.0;
        };

        let total_time = last.timestamp - first.timestamp;
        if total_time <= 0.0 {
            return 0.0;
        }

        let total_delta: f64 = self.history.iter().map(|e| e.delta).sum();
        total_delta / total_time
    }

    /// Where the position would come to rest under exponential deceleration
    /// at [`DECELERATION_TOUCHPAD`] per millisecond.
    pub fn projected_end_position(&self) -> f64 {
        self.pos - self.velocity() / (1000.0 * DECELERATION_TOUCHPAD.ln())
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.pos = 0.0;
    }

    fn trim_history(&mut self, now: f64) {
        while let Some(front) = self.history.front() {
            if now - front.timestamp > HISTORY_LIMIT {
                self.history.pop_front();
            } else {
                break;
            }
        }
    }
}
