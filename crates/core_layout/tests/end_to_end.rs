//! Whole-pipeline scenarios: columns, gestures, snapping and frame writes.

use panestrip_core_layout::{
    Axis, EngineOptions, EventDisposition, FrameSink, FrameSinkError, GestureEnd, LayoutEngine, Rect,
    ScrollEvent, ScrollPhase, ScrollingSpace, SpringParams, ViewOffset, WindowHandle, WindowId,
};

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

struct FixedWindow(WindowId, Rect);

impl WindowHandle for FixedWindow {
    fn id(&self) -> WindowId {
        self.0
    }

    fn current_frame(&self) -> Rect {
        self.1
    }
}

const WORKING_AREA: Rect = Rect {
    x: 50.0,
    y: 30.0,
    width: 1200.0,
    height: 900.0,
};

#[test]
fn two_windows_then_swipe_back_to_first() {
    let mut space = ScrollingSpace::new(WORKING_AREA);
    space.gap = 16.0;

    space.add_window(1, None, true);
    assert_eq!(space.active_column_index(), 0);
    space.add_window(2, None, true);
    assert_eq!(space.column_count(), 2);
    assert_eq!(space.active_column_index(), 1);

    let mut sink = RecordingSink::default();
    let placements = space.layout(0.0, &mut sink, false);
    let a = placements[0].rect;
    let b = placements[1].rect;
    assert_eq!(a.x, WORKING_AREA.x);
    assert_eq!(a.width, 0.8 * WORKING_AREA.width);
    assert_eq!(b.x, a.x + a.width + 16.0);
    assert_eq!(sink.writes.len(), 2);

    let t0 = 5.0;
    assert!(space.begin_gesture(Axis::Horizontal, t0, true));
    space.update_gesture(Axis::Horizontal, -50.0, t0);
    space.update_gesture(Axis::Horizontal, -50.0, t0 + 0.016);
    assert_eq!(space.offset(Axis::Horizontal).current(t0 + 0.016), -100.0);

    // Snap points: -120 (column 0) and 856 (column 1).
    let end = space.end_gesture(Axis::Horizontal, t0 + 0.016, false);
    assert_eq!(end, Some(GestureEnd::Snapped { index: 0, target: -120.0 }));
    assert_eq!(space.active_column_index(), 0);
    match space.offset(Axis::Horizontal) {
        ViewOffset::Animating(spring) => {
            assert_eq!(spring.params, SpringParams::sticky());
            assert_eq!(spring.from, -100.0);
        }
        other => panic!("expected a snap animation, got {:?}", other),
    }

    let mut now = t0 + 0.016;
    while space.is_animating() {
        now += 1.0 / 120.0;
        space.advance(now);
        assert!(now < t0 + 5.0, "snap animation never finished");
    }

    let placements = space.compute_placements(now);
    let a = placements[0].rect;
    assert_eq!(a.x + a.width / 2.0, WORKING_AREA.x + WORKING_AREA.width / 2.0);
}

#[test]
fn engine_pipeline_from_touch_events_to_frames() {
    let space = ScrollingSpace::new(WORKING_AREA);
    let options = EngineOptions {
        animate_windows: false,
        ..Default::default()
    };
    let mut engine = LayoutEngine::new(space, RecordingSink::default(), options);

    let initial = Rect::new(0.0, 0.0, 300.0, 200.0);
    engine.add_window(FixedWindow(1, initial), None, 0.0).unwrap();
    engine.add_window(FixedWindow(2, initial), None, 0.0).unwrap();
    engine.add_window(FixedWindow(3, initial), None, 0.0).unwrap();

    let mut now = 0.0;
    while engine.needs_tick() {
        now += 1.0 / 120.0;
        engine.tick(now);
    }
    assert_eq!(engine.focused_window(), Some(3));

    // Swipe right across roughly one column: the strip moves left.
    let start = now + 1.0;
    let events = [
        ScrollEvent::touch(0.0, 0.0, ScrollPhase::Began, start),
        ScrollEvent::touch(400.0, 20.0, ScrollPhase::Changed, start + 0.016),
        ScrollEvent::touch(400.0, -30.0, ScrollPhase::Changed, start + 0.032),
        ScrollEvent::touch(200.0, 0.0, ScrollPhase::Changed, start + 0.048),
        ScrollEvent::touch(0.0, 0.0, ScrollPhase::Ended, start + 0.064),
    ];
    for event in &events {
        engine.handle_scroll(event);
        engine.tick(event.timestamp);
    }
    assert_eq!(engine.focused_window(), Some(2));
    assert!(engine.space().offset(Axis::Vertical).is_static());

    // Momentum after the snap is absorbed.
    let momentum = ScrollEvent::momentum(80.0, 0.0, ScrollPhase::Began, start + 0.08);
    assert_eq!(engine.handle_scroll(&momentum), EventDisposition::Consumed);
    let momentum_end = ScrollEvent::momentum(0.0, 0.0, ScrollPhase::Ended, start + 0.3);
    engine.handle_scroll(&momentum_end);

    let mut now = start + 0.064;
    while engine.needs_tick() {
        now += 1.0 / 120.0;
        engine.tick(now);
    }

    let last_for = |id: WindowId| {
        engine
            .sink()
            .writes
            .iter()
            .rev()
            .find(|w| w.0 == id)
            .map(|&(_, rect, animate)| (rect, animate))
    };
    let (frame, animate) = last_for(2).unwrap();
    assert!(!animate);
    assert_eq!(frame.x + frame.width / 2.0, WORKING_AREA.x + WORKING_AREA.width / 2.0);
}
