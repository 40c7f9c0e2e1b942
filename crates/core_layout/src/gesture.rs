//! Raw scroll events to axis gestures.
//!
//! A touch gesture starts with its direction undetermined. The first event
//! whose deltas clearly favour one axis locks it, and the lock holds for the
//! rest of the touch and any momentum that follows. Diagonal noise inside the
//! hysteresis band never switches the target axis mid-gesture.
//!
//! Mouse-wheel events carry no phase. Each one is a complete
//! begin/update/end on the axis it favours, classified independently of the
//! previous tick.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::scrolling_space::ScrollingSpace;
use crate::Axis;

/// One axis must exceed the other by this factor to lock outright.
pub const DOMINANCE_RATIO: f64 = 1.5;

/// Below this magnitude an ambiguous event is treated as noise.
pub const NOISE_FLOOR: f64 = 1.0;

/// Phase of a touch or momentum sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollPhase {
    #[default]
    None,
    Began,
    Changed,
    Ended,
    Cancelled,
}

/// A normalized scroll event from the input adapter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollEvent {
    pub delta_x: f64,
    pub delta_y: f64,
    pub phase: ScrollPhase,
    pub momentum_phase: ScrollPhase,
    /// Seconds, on the engine clock.
    pub timestamp: f64,
    pub is_touchpad: bool,
}

impl ScrollEvent {
    /// A phase-less wheel tick.
    pub fn wheel(delta_x: f64, delta_y: f64, timestamp: f64) -> Self {
        Self {
            delta_x,
            delta_y,
            phase: ScrollPhase::None,
            momentum_phase: ScrollPhase::None,
            timestamp,
            is_touchpad: false,
        }
    }

    /// A touch-phase event.
    pub fn touch(delta_x: f64, delta_y: f64, phase: ScrollPhase, timestamp: f64) -> Self {
        Self {
            delta_x,
            delta_y,
            phase,
            momentum_phase: ScrollPhase::None,
            timestamp,
            is_touchpad: true,
        }
    }

    /// A momentum event following a touch.
    pub fn momentum(delta_x: f64, delta_y: f64, momentum_phase: ScrollPhase, timestamp: f64) -> Self {
        Self {
            delta_x,
            delta_y,
            phase: ScrollPhase::None,
            momentum_phase,
            timestamp,
            is_touchpad: true,
        }
    }

    pub fn is_wheel(&self) -> bool {
        self.phase == ScrollPhase::None && self.momentum_phase == ScrollPhase::None
    }
}

/// Whether an event was used for layout or should reach the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    Consumed,
    PassThrough,
}

/// Axis favoured by a pair of deltas, or `None` while undetermined.
pub fn classify(delta_x: f64, delta_y: f64) -> Option<Axis> {
    let dx = delta_x.abs();
    let dy = delta_y.abs();

    if dx > DOMINANCE_RATIO * dy {
        Some(Axis::Horizontal)
    } else if dy > DOMINANCE_RATIO * dx {
        Some(Axis::Vertical)
    } else if dx > NOISE_FLOOR || dy > NOISE_FLOOR {
        if dx >= dy {
            Some(Axis::Horizontal)
        } else {
            Some(Axis::Vertical)
        }
    } else {
        None
    }
}

/// Direction-locking router from scroll events to [`ScrollingSpace`]
/// gestures.
#[derive(Debug, Clone, Default)]
pub struct GestureClassifier {
    locked: Option<Axis>,
    pub invert_horizontal: bool,
    pub invert_vertical: bool,
}

impl GestureClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// The axis the current sequence is locked to.
    pub fn locked_axis(&self) -> Option<Axis> {
        self.locked
    }

    /// Forget the lock without touching any gesture.
    pub fn reset(&mut self) {
        self.locked = None;
    }

    /// Delta along `axis`. Swiping left moves the strip towards later
    /// columns, so horizontal input is negated.
    fn axis_delta(&self, axis: Axis, event: &ScrollEvent) -> f64 {
        match axis {
            Axis::Horizontal => {
                if self.invert_horizontal {
                    event.delta_x
                } else {
                    -event.delta_x
                }
            }
            Axis::Vertical => {
                if self.invert_vertical {
                    -event.delta_y
                } else {
                    event.delta_y
                }
            }
        }
    }

    pub fn handle(&mut self, space: &mut ScrollingSpace, event: &ScrollEvent) -> EventDisposition {
        if event.is_wheel() {
            return self.handle_wheel(space, event);
        }
        if event.phase != ScrollPhase::None {
            return self.handle_phase(space, event);
        }
        self.handle_momentum(space, event)
    }

    fn handle_wheel(&mut self, space: &mut ScrollingSpace, event: &ScrollEvent) -> EventDisposition {
        // A touch gesture owns its axis until it ends.
        if let Some(axis) = self.locked {
            if space.offset(axis).is_gesture() {
                return EventDisposition::PassThrough;
            }
        }
        self.locked = None;

        let Some(axis) = classify(event.delta_x, event.delta_y) else {
            return EventDisposition::PassThrough;
        };
        if !space.begin_gesture(axis, event.timestamp, event.is_touchpad) {
            return EventDisposition::PassThrough;
        }
        let delta = self.axis_delta(axis, event);
        space.update_gesture(axis, delta, event.timestamp);
        space.end_gesture(axis, event.timestamp, false);

        trace!(?axis, delta, "Wheel tick");
        EventDisposition::Consumed
    }

    fn handle_phase(&mut self, space: &mut ScrollingSpace, event: &ScrollEvent) -> EventDisposition {
        match event.phase {
            ScrollPhase::Began | ScrollPhase::Changed => {
                if event.phase == ScrollPhase::Began {
                    self.locked = None;
                }

                let axis = match self.locked {
                    Some(axis) => axis,
                    None => {
                        let Some(axis) = classify(event.delta_x, event.delta_y) else {
                            return EventDisposition::PassThrough;
                        };
                        self.locked = Some(axis);
                        space.begin_gesture(axis, event.timestamp, event.is_touchpad);
                        axis
                    }
                };

                let delta = self.axis_delta(axis, event);
                space.update_gesture(axis, delta, event.timestamp);
                EventDisposition::Consumed
            }
            ScrollPhase::Ended => match self.locked {
                // The lock stays for the momentum that may follow.
                Some(axis) => {
                    space.end_gesture(axis, event.timestamp, false);
                    EventDisposition::Consumed
                }
                None => EventDisposition::PassThrough,
            },
            ScrollPhase::Cancelled => match self.locked.take() {
                Some(axis) => {
                    space.end_gesture(axis, event.timestamp, true);
                    EventDisposition::Consumed
                }
                None => EventDisposition::PassThrough,
            },
            ScrollPhase::None => EventDisposition::PassThrough,
        }
    }

    fn handle_momentum(&mut self, space: &mut ScrollingSpace, event: &ScrollEvent) -> EventDisposition {
        let Some(axis) = self.locked else {
            return EventDisposition::PassThrough;
        };

        match event.momentum_phase {
            ScrollPhase::Began | ScrollPhase::Changed => {
                let delta = self.axis_delta(axis, event);
                space.update_gesture(axis, delta, event.timestamp);
            }
            ScrollPhase::Ended | ScrollPhase::Cancelled => {
                let cancelled = event.momentum_phase == ScrollPhase::Cancelled;
                space.end_gesture(axis, event.timestamp, cancelled);
                self.locked = None;
            }
            ScrollPhase::None => return EventDisposition::PassThrough,
        }
        EventDisposition::Consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnWidth;
    use crate::view_offset::ViewOffset;
    use crate::Rect;

    fn space() -> ScrollingSpace {
        let mut space = ScrollingSpace::new(Rect::new(0.0, 0.0, 1000.0, 800.0));
        space.add_window(1, Some(ColumnWidth::Fixed(500.0)), true);
        space.add_window(2, Some(ColumnWidth::Fixed(500.0)), true);
        space
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(10.0, 2.0), Some(Axis::Horizontal));
        assert_eq!(classify(-2.0, 10.0), Some(Axis::Vertical));
        // Inside the band but above the noise floor: larger wins.
        assert_eq!(classify(5.0, 4.0), Some(Axis::Horizontal));
        assert_eq!(classify(4.0, -5.0), Some(Axis::Vertical));
        // Inside the band and below the floor.
        assert_eq!(classify(0.8, 0.7), None);
        assert_eq!(classify(0.0, 0.0), None);
        // Tiny but clearly one-sided still locks.
        assert_eq!(classify(0.5, 0.0), Some(Axis::Horizontal));
    }

    #[test]
    fn test_undetermined_events_pass_through() {
        let mut space = space();
        let mut classifier = GestureClassifier::new();

        let event = ScrollEvent::touch(0.5, 0.5, ScrollPhase::Began, 0.0);
        assert_eq!(classifier.handle(&mut space, &event), EventDisposition::PassThrough);
        assert_eq!(classifier.locked_axis(), None);
        assert!(space.offset(Axis::Horizontal).is_static());
    }

    #[test]
    fn test_lock_holds_against_opposite_axis() {
        let mut space = space();
        let mut classifier = GestureClassifier::new();

        classifier.handle(&mut space, &ScrollEvent::touch(0.0, 0.0, ScrollPhase::Began, 0.0));
        classifier.handle(&mut space, &ScrollEvent::touch(-20.0, 1.0, ScrollPhase::Changed, 0.01));
        assert_eq!(classifier.locked_axis(), Some(Axis::Horizontal));

        let disposition =
            classifier.handle(&mut space, &ScrollEvent::touch(0.0, 40.0, ScrollPhase::Changed, 0.02));
        assert_eq!(disposition, EventDisposition::Consumed);
        assert_eq!(classifier.locked_axis(), Some(Axis::Horizontal));
        assert!(space.offset(Axis::Vertical).is_static());
        // Swiping left by 20 moves the strip right by 20.
        assert_eq!(space.offset(Axis::Horizontal).current(0.02), 20.0);
    }

    #[test]
    fn test_ended_snaps_and_momentum_is_absorbed() {
        let mut space = space();
        let mut classifier = GestureClassifier::new();

        classifier.handle(&mut space, &ScrollEvent::touch(0.0, 0.0, ScrollPhase::Began, 0.0));
        classifier.handle(&mut space, &ScrollEvent::touch(-30.0, 0.0, ScrollPhase::Changed, 0.01));
        classifier.handle(&mut space, &ScrollEvent::touch(0.0, 0.0, ScrollPhase::Ended, 0.02));
        assert!(space.offset(Axis::Horizontal).is_animating());
        assert_eq!(classifier.locked_axis(), Some(Axis::Horizontal));

        let momentum = ScrollEvent::momentum(-15.0, 0.0, ScrollPhase::Began, 0.03);
        assert_eq!(classifier.handle(&mut space, &momentum), EventDisposition::Consumed);
        assert!(space.offset(Axis::Horizontal).is_animating());

        let end = ScrollEvent::momentum(0.0, 0.0, ScrollPhase::Ended, 0.2);
        assert_eq!(classifier.handle(&mut space, &end), EventDisposition::Consumed);
        assert_eq!(classifier.locked_axis(), None);
    }

    #[test]
    fn test_momentum_without_lock_passes_through() {
        let mut space = space();
        let mut classifier = GestureClassifier::new();
        let momentum = ScrollEvent::momentum(-15.0, 0.0, ScrollPhase::Changed, 0.0);
        assert_eq!(classifier.handle(&mut space, &momentum), EventDisposition::PassThrough);
    }

    #[test]
    fn test_cancel_returns_and_unlocks() {
        let mut space = space();
        let mut classifier = GestureClassifier::new();
        let before = space.offset(Axis::Horizontal).current(0.0);

        classifier.handle(&mut space, &ScrollEvent::touch(0.0, 0.0, ScrollPhase::Began, 0.0));
        classifier.handle(&mut space, &ScrollEvent::touch(-300.0, 0.0, ScrollPhase::Changed, 0.01));
        classifier.handle(&mut space, &ScrollEvent::touch(0.0, 0.0, ScrollPhase::Cancelled, 0.02));

        assert_eq!(classifier.locked_axis(), None);
        match space.offset(Axis::Horizontal) {
            ViewOffset::Animating(spring) => assert_eq!(spring.to, before),
            other => panic!("expected animation, got {:?}", other),
        }
    }

    #[test]
    fn test_began_resets_stale_lock() {
        let mut space = space();
        let mut classifier = GestureClassifier::new();

        classifier.handle(&mut space, &ScrollEvent::touch(-20.0, 0.0, ScrollPhase::Began, 0.0));
        classifier.handle(&mut space, &ScrollEvent::touch(0.0, 0.0, ScrollPhase::Ended, 0.01));
        assert_eq!(classifier.locked_axis(), Some(Axis::Horizontal));

        classifier.handle(&mut space, &ScrollEvent::touch(0.0, 30.0, ScrollPhase::Began, 1.0));
        assert_eq!(classifier.locked_axis(), Some(Axis::Vertical));
        assert!(space.offset(Axis::Vertical).is_gesture());
    }

    #[test]
    fn test_wheel_tick_is_complete_gesture() {
        let mut space = space();
        let mut classifier = GestureClassifier::new();

        let tick = ScrollEvent::wheel(-40.0, 0.0, 0.0);
        assert_eq!(classifier.handle(&mut space, &tick), EventDisposition::Consumed);
        assert!(!space.offset(Axis::Horizontal).is_gesture());
        assert_eq!(classifier.locked_axis(), None);
    }

    #[test]
    fn test_wheel_classifies_each_tick() {
        let mut space = space();
        let mut classifier = GestureClassifier::new();

        classifier.handle(&mut space, &ScrollEvent::wheel(-40.0, 0.0, 0.0));
        assert!(space.offset(Axis::Horizontal).is_animating());

        classifier.handle(&mut space, &ScrollEvent::wheel(0.0, 40.0, 0.01));
        assert!(!space.offset(Axis::Vertical).is_gesture());
        // Single-window column: the only vertical snap point is 0.
        assert_eq!(space.offset(Axis::Vertical).target(), 0.0);
    }

    #[test]
    fn test_wheel_during_touch_passes_through() {
        let mut space = space();
        let mut classifier = GestureClassifier::new();

        classifier.handle(&mut space, &ScrollEvent::touch(-20.0, 0.0, ScrollPhase::Began, 0.0));
        let tick = ScrollEvent::wheel(0.0, 40.0, 0.01);
        assert_eq!(classifier.handle(&mut space, &tick), EventDisposition::PassThrough);
        assert!(space.offset(Axis::Horizontal).is_gesture());
    }

    #[test]
    fn test_inverted_axes() {
        let mut space = space();
        let mut classifier = GestureClassifier {
            invert_horizontal: true,
            ..Default::default()
        };
        classifier.handle(&mut space, &ScrollEvent::touch(-20.0, 0.0, ScrollPhase::Began, 0.0));
        assert_eq!(space.offset(Axis::Horizontal).current(0.0), -20.0);
    }
}
