//! Spring-driven window frame transitions.
//!
//! Independent of the view offsets: the layout decides where a window should
//! end up, the animator moves it there with one spring per frame component.

use std::collections::HashMap;

use tracing::{trace, warn};

use crate::spring::{Spring, SpringParams};
use crate::{FrameSink, Rect, WindowId};

#[derive(Debug, Clone, Copy)]
struct FrameAnimation {
    x: Spring,
    y: Spring,
    width: Spring,
    height: Spring,
}

impl FrameAnimation {
    fn new(from: Rect, to: Rect, velocity: Rect, params: SpringParams, now: f64) -> Self {
        Self {
            x: Spring::new(from.x, to.x, velocity.x, params, now),
            y: Spring::new(from.y, to.y, velocity.y, params, now),
            width: Spring::new(from.width, to.width, velocity.width, params, now),
            height: Spring::new(from.height, to.height, velocity.height, params, now),
        }
    }

    fn frame_at(&self, now: f64) -> Rect {
        Rect::new(
            self.x.value_at(now),
            self.y.value_at(now),
            self.width.value_at(now),
            self.height.value_at(now),
        )
    }

    fn velocity_at(&self, now: f64) -> Rect {
        Rect::new(
            self.x.velocity_at(now),
            self.y.velocity_at(now),
            self.width.velocity_at(now),
            self.height.velocity_at(now),
        )
    }

    fn target(&self) -> Rect {
        Rect::new(self.x.to, self.y.to, self.width.to, self.height.to)
    }

    fn is_done(&self, now: f64) -> bool {
        self.x.is_done(now) && self.y.is_done(now) && self.width.is_done(now) && self.height.is_done(now)
    }
}

/// Per-window frame animations.
#[derive(Debug, Clone)]
pub struct FrameAnimator {
    animations: HashMap<WindowId, FrameAnimation>,
    params: SpringParams,
}

impl Default for FrameAnimator {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAnimator {
    pub fn new() -> Self {
        Self::with_params(SpringParams::window_frame())
    }

    pub fn with_params(params: SpringParams) -> Self {
        Self {
            animations: HashMap::new(),
            params,
        }
    }

    /// Animate `window` from `from` to `to`, replacing any running animation.
    /// A replaced animation hands over its velocity.
    pub fn animate(&mut self, window: WindowId, from: Rect, to: Rect, now: f64) {
        let velocity = self
            .animations
            .get(&window)
            .map(|animation| animation.velocity_at(now))
            .unwrap_or_default();
        self.animations
            .insert(window, FrameAnimation::new(from, to, velocity, self.params, now));
        trace!(window, ?from, ?to, "Frame animation started");
    }

    pub fn cancel(&mut self, window: WindowId) -> bool {
        self.animations.remove(&window).is_some()
    }

    pub fn cancel_all(&mut self) {
        self.animations.clear();
    }

    pub fn is_animating(&self) -> bool {
        !self.animations.is_empty()
    }

    pub fn is_animating_window(&self, window: WindowId) -> bool {
        self.animations.contains_key(&window)
    }

    /// Interpolated frame of a running animation.
    pub fn current_frame(&self, window: WindowId, now: f64) -> Option<Rect> {
        self.animations
            .get(&window)
            .map(|animation| animation.frame_at(now))
    }

    /// Where a running animation is heading.
    pub fn target(&self, window: WindowId) -> Option<Rect> {
        self.animations.get(&window).map(FrameAnimation::target)
    }

    /// Write the current frame of every animation. Finished animations write
    /// their exact target without the animate hint and are dropped. Returns
    /// the number still running.
    pub fn tick<S: FrameSink + ?Sized>(&mut self, now: f64, sink: &mut S) -> usize {
        let mut finished = Vec::new();

        for (&window, animation) in &self.animations {
            let (frame, animate) = if animation.is_done(now) {
                finished.push(window);
                (animation.target(), false)
            } else {
                (animation.frame_at(now), true)
            };

            if let Err(e) = sink.set_frame(window, frame, animate) {
                warn!("Frame write failed: {}", e);
            }
        }

        for window in finished {
            self.animations.remove(&window);
            trace!(window, "Frame animation finished");
        }

        self.animations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FrameSinkError;

    #[derive(Default)]
    struct RecordingSink {
        writes: Vec<(WindowId, Rect, bool)>,
    }

    impl FrameSink for RecordingSink {
        fn set_frame(&mut self, window: WindowId, rect: Rect, animate: bool) -> Result<(), FrameSinkError> {
            self.writes.push((window, rect, animate));
            Ok(())
        }
    }

    struct RejectingSink;

    impl FrameSink for RejectingSink {
        fn set_frame(&mut self, window: WindowId, _rect: Rect, _animate: bool) -> Result<(), FrameSinkError> {
            Err(FrameSinkError::Rejected {
                window,
                reason: "closed".to_string(),
            })
        }
    }

    const FROM: Rect = Rect {
        x: 0.0,
        y: 0.0,
        width: 400.0,
        height: 300.0,
    };
    const TO: Rect = Rect {
        x: 600.0,
        y: 50.0,
        width: 800.0,
        height: 700.0,
    };

    fn run_to_end(animator: &mut FrameAnimator, sink: &mut RecordingSink) -> f64 {
        let mut now = 0.0;
        for _ in 0..1000 {
            now += 1.0 / 60.0;
            if animator.tick(now, sink) == 0 {
                return now;
            }
        }
        panic!("animation never finished");
    }

    #[test]
    fn test_animation_ends_on_exact_target() {
        let mut animator = FrameAnimator::new();
        let mut sink = RecordingSink::default();
        animator.animate(1, FROM, TO, 0.0);
        assert!(animator.is_animating());

        run_to_end(&mut animator, &mut sink);

        assert!(!animator.is_animating());
        let last = sink.writes.last().copied();
        assert_eq!(last, Some((1, TO, false)));
        assert!(sink.writes[..sink.writes.len() - 1].iter().all(|w| w.2));
    }

    #[test]
    fn test_intermediate_frames_move_towards_target() {
        let mut animator = FrameAnimator::new();
        let mut sink = RecordingSink::default();
        animator.animate(1, FROM, TO, 0.0);
        animator.tick(0.05, &mut sink);

        let (_, frame, animate) = sink.writes[0];
        assert!(animate);
        assert!(frame.x > FROM.x && frame.x < TO.x);
        assert!(frame.width > FROM.width);
    }

    #[test]
    fn test_animate_replaces_running_animation() {
        let mut animator = FrameAnimator::new();
        animator.animate(1, FROM, TO, 0.0);
        let other = Rect::new(-100.0, 0.0, 400.0, 300.0);
        let mid = animator.current_frame(1, 0.05).unwrap_or_default();
        animator.animate(1, mid, other, 0.05);

        assert_eq!(animator.target(1), Some(other));
        assert_eq!(animator.current_frame(1, 0.05), Some(mid));
    }

    #[test]
    fn test_cancel() {
        let mut animator = FrameAnimator::new();
        animator.animate(1, FROM, TO, 0.0);
        animator.animate(2, FROM, TO, 0.0);
        assert!(animator.cancel(1));
        assert!(!animator.cancel(1));
        assert!(!animator.is_animating_window(1));
        assert!(animator.is_animating_window(2));
        animator.cancel_all();
        assert!(!animator.is_animating());
    }

    #[test]
    fn test_rejected_writes_are_not_retried() {
        let mut animator = FrameAnimator::new();
        animator.animate(1, FROM, TO, 0.0);
        // Long after the springs settled the animation finishes even though
        // the final write was rejected.
        assert_eq!(animator.tick(100.0, &mut RejectingSink), 0);
        assert!(!animator.is_animating());
    }
}
