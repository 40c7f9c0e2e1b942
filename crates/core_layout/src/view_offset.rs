//! Scroll state of one axis.
//!
//! Both the horizontal strip offset and the vertical offset inside the active
//! column are a [`ViewOffset`]. Transitions are explicit method calls; a call
//! that does not apply to the current variant is a no-op so that duplicated or
//! out-of-order input events from an adapter are harmless.

use serde::{Deserialize, Serialize};

use crate::spring::{Spring, SpringParams};
use crate::swipe_tracker::SwipeTracker;

/// Touchpad travel that maps onto one working-area extent when gestures are
/// not mapped 1:1.
pub const WORKING_AREA_MOVEMENT: f64 = 1200.0;

/// How a released gesture picks its snap point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapStrategy {
    /// Snap point closest to where the user let go.
    #[default]
    Nearest,
    /// Snap point closest to where the swipe would coast to.
    Projected,
}

/// A gesture in progress.
#[derive(Debug, Clone)]
pub struct ViewGesture {
    /// Effective offset when the gesture began, minus any handed-over motion.
    pub base_offset: f64,
    pub tracker: SwipeTracker,
    /// Mirror of `tracker.position()` after the last update.
    pub delta_from_tracker: f64,
    /// Where a cancelled gesture returns to.
    pub stationary_offset: f64,
    pub is_touchpad: bool,
    /// Residual motion of an animation interrupted by this gesture, as a
    /// spring decaying towards zero.
    pub deceleration: Option<Spring>,
}

impl ViewGesture {
    fn current(&self, now: f64) -> f64 {
        let base = self.base_offset + self.delta_from_tracker;
        match &self.deceleration {
            Some(spring) => base + spring.value_at(now),
            None => base,
        }
    }
}

/// Outcome of [`ViewOffset::end_gesture`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEnd {
    /// Animating back to the stationary offset.
    Cancelled { target: f64 },
    /// Animating to the snap point at `index`.
    Snapped { index: usize, target: f64 },
    /// No snap points; the offset stays where it was released.
    Released { offset: f64 },
}

/// State of one scrollable axis.
#[derive(Debug, Clone)]
pub enum ViewOffset {
    Static(f64),
    Animating(Spring),
    Gesture(ViewGesture),
}

impl Default for ViewOffset {
    fn default() -> Self {
        Self::Static(0.0)
    }
}

impl ViewOffset {
    /// Effective scalar at `now`.
    pub fn current(&self, now: f64) -> f64 {
        match self {
            Self::Static(value) => *value,
            Self::Animating(spring) => spring.value_at(now),
            Self::Gesture(gesture) => gesture.current(now),
        }
    }

    /// The value this axis is heading to, ignoring transient motion.
    pub fn target(&self) -> f64 {
        match self {
            Self::Static(value) => *value,
            Self::Animating(spring) => spring.to,
            Self::Gesture(gesture) => gesture.base_offset + gesture.delta_from_tracker,
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, Self::Static(_))
    }

    pub fn is_animating(&self) -> bool {
        matches!(self, Self::Animating(_))
    }

    pub fn is_gesture(&self) -> bool {
        matches!(self, Self::Gesture(_))
    }

    pub fn gesture(&self) -> Option<&ViewGesture> {
        match self {
            Self::Gesture(gesture) => Some(gesture),
            _ => None,
        }
    }

    /// Jump to `value` and stop any motion.
    pub fn set_static(&mut self, value: f64) {
        *self = Self::Static(value);
    }

    /// Spring from the current effective value to `target`.
    ///
    /// Ignored during a gesture; the gesture owns the axis until it ends.
    pub fn animate_to(&mut self, now: f64, target: f64, velocity: f64, sticky: bool) {
        if self.is_gesture() {
            return;
        }
        let from = self.current(now);
        let params = SpringParams::for_view(sticky);
        if (from - target).abs() < params.epsilon && velocity == 0.0 {
            *self = Self::Static(target);
            return;
        }
        *self = Self::Animating(Spring::new(from, target, velocity, params, now));
    }

    /// Start a gesture. Returns false if one is already running.
    ///
    /// Starting over a running animation keeps its residual motion alive as
    /// the gesture's deceleration spring, so the view does not jump.
    pub fn begin_gesture(&mut self, now: f64, is_touchpad: bool) -> bool {
        let current = self.current(now);
        let (base_offset, deceleration) = match self {
            Self::Static(value) => (*value, None),
            Self::Animating(spring) => {
                let residual = Spring::new(
                    current - spring.to,
                    0.0,
                    spring.velocity_at(now),
                    spring.params,
                    now,
                );
                (spring.to, Some(residual))
            }
            Self::Gesture(_) => return false,
        };

        *self = Self::Gesture(ViewGesture {
            base_offset,
            tracker: SwipeTracker::new(),
            delta_from_tracker: 0.0,
            stationary_offset: current,
            is_touchpad,
            deceleration,
        });
        true
    }

    /// Feed one input delta. `extent` is the working-area size along this
    /// axis; it only matters for touchpads when `one_to_one` is off.
    pub fn update_gesture(&mut self, delta: f64, timestamp: f64, extent: f64, one_to_one: bool) -> bool {
        let Self::Gesture(gesture) = self else {
            return false;
        };

        let norm_factor = if one_to_one || !gesture.is_touchpad {
            1.0
        } else {
            extent / WORKING_AREA_MOVEMENT
        };

        gesture.tracker.push(delta * norm_factor, timestamp);
        gesture.delta_from_tracker = gesture.tracker.position();
        true
    }

    /// Finish a gesture. `snap_points` are in order; the closest one wins and
    /// ties go to the lower index. Returns `None` when no gesture is running.
    pub fn end_gesture(
        &mut self,
        now: f64,
        cancelled: bool,
        snap_points: &[f64],
        strategy: SnapStrategy,
    ) -> Option<GestureEnd> {
        let Self::Gesture(gesture) = self else {
            return None;
        };

        let current = gesture.current(now);

        if cancelled {
            let target = gesture.stationary_offset;
            *self = Self::Animating(Spring::new(current, target, 0.0, SpringParams::sticky(), now));
            return Some(GestureEnd::Cancelled { target });
        }

        let reference = match strategy {
            SnapStrategy::Nearest => current,
            SnapStrategy::Projected => {
                current - gesture.delta_from_tracker + gesture.tracker.projected_end_position()
            }
        };

        let Some(index) = nearest_snap_point(snap_points, reference) else {
            *self = Self::Static(current);
            return Some(GestureEnd::Released { offset: current });
        };

        let target = snap_points[index];
        *self = Self::Animating(Spring::new(current, target, 0.0, SpringParams::sticky(), now));
        Some(GestureEnd::Snapped { index, target })
    }

    /// Settle finished animations. Returns true if the variant changed.
    pub fn advance(&mut self, now: f64) -> bool {
        match self {
            Self::Static(_) => false,
            Self::Animating(spring) => {
                if spring.is_done(now) {
                    *self = Self::Static(spring.to);
                    true
                } else {
                    false
                }
            }
            Self::Gesture(gesture) => {
                if gesture.deceleration.is_some_and(|spring| spring.is_done(now)) {
                    gesture.deceleration = None;
                }
                false
            }
        }
    }
}

/// Index of the point closest to `position`; the first of equals wins.
pub fn nearest_snap_point(points: &[f64], position: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &point) in points.iter().enumerate() {
        let distance = (position - point).abs();
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((idx, distance)),
        }
    }
    best.map(|(idx, _)| idx)
}
