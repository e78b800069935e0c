//! Touch and motion classification.

use std::ops::Sub;

use serde::{Deserialize, Serialize};

use crate::config::GestureConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchPhase {
    Began,
    Moved,
    Stationary,
    Ended,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchSample {
    pub phase: TouchPhase,
    pub position: Vec2,
}

impl TouchSample {
    pub fn new(phase: TouchPhase, x: f32, y: f32) -> Self {
        Self {
            phase,
            position: Vec2::new(x, y),
        }
    }
}

/// Everything the input devices reported during one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputFrame {
    pub dt: f32,
    /// Active contacts, one entry per finger.
    #[serde(default)]
    pub touches: Vec<TouchSample>,
    /// Squared magnitude of the device acceleration.
    #[serde(default)]
    pub motion_magnitude: f32,
}

impl InputFrame {
    pub fn idle(dt: f32) -> Self {
        Self {
            dt,
            ..Default::default()
        }
    }

    pub fn touch(dt: f32, phase: TouchPhase, x: f32, y: f32) -> Self {
        Self {
            dt,
            touches: vec![TouchSample::new(phase, x, y)],
            motion_magnitude: 0.0,
        }
    }

    pub fn motion(dt: f32, magnitude: f32) -> Self {
        Self {
            dt,
            touches: Vec::new(),
            motion_magnitude: magnitude,
        }
    }
}

/// Pre-tick state of the rest of the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GestureContext {
    /// An animation is in flight or the session is still warming up.
    pub gated: bool,
    /// The camera is capturing.
    pub capture_active: bool,
    pub on_home_page: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GestureEvent {
    SwipeLeft,
    SwipeRight,
    /// Downward scroll: go home, or replay the instructions when already there.
    ScrollHome,
    /// Upward scroll: toggle the camera.
    ScrollDetect,
    RequestDelete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeAxis {
    Horizontal,
    Vertical,
}

/// Transient classifier state. Never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GestureState {
    pub touch_origin: Vec2,
    pub last_position: Vec2,
    pub axis: Option<SwipeAxis>,
    pub accumulated_horizontal_distance: f32,
    pub horizontal_handled: bool,
    pub vertical_handled: bool,
    /// Set once two or more contacts were seen; cleared when all lift.
    pub multi_touch: bool,
    pub shaking: bool,
    pub shake_count: u32,
    pub time_since_last_shake: f32,
}

#[derive(Debug, Default)]
pub struct GestureClassifier {
    config: GestureConfig,
    state: GestureState,
}

impl GestureClassifier {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            state: GestureState::default(),
        }
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn classify(&mut self, frame: &InputFrame, context: GestureContext) -> Vec<GestureEvent> {
        let mut events = Vec::new();
        self.track_contacts(frame, context, &mut events);
        self.track_shake(frame, context, &mut events);
        events
    }

    fn track_contacts(
        &mut self,
        frame: &InputFrame,
        context: GestureContext,
        events: &mut Vec<GestureEvent>,
    ) {
        match frame.touches.as_slice() {
            [] => self.state.multi_touch = false,
            [sample] if !self.state.multi_touch => self.track_drag(*sample, context, events),
            [_] => {}
            _ => self.state.multi_touch = true,
        }
    }

    fn track_drag(
        &mut self,
        sample: TouchSample,
        context: GestureContext,
        events: &mut Vec<GestureEvent>,
    ) {
        let state = &mut self.state;
        match sample.phase {
            TouchPhase::Began => {
                state.touch_origin = sample.position;
                state.last_position = sample.position;
                state.axis = None;
                state.accumulated_horizontal_distance = 0.0;
                state.horizontal_handled = false;
                state.vertical_handled = false;
            }
            TouchPhase::Moved => {
                let step_x = sample.position.x - state.last_position.x;
                state.last_position = sample.position;

                if state.horizontal_handled || state.vertical_handled {
                    return;
                }
                if context.gated {
                    // Interrupted contacts are dropped, not resumed.
                    state.horizontal_handled = true;
                    state.vertical_handled = true;
                    return;
                }

                let direction = sample.position - state.touch_origin;
                let (distance_x, distance_y) = (direction.x.abs(), direction.y.abs());
                let mut locked_now = false;
                if state.axis.is_none() {
                    if distance_x > distance_y && distance_x > self.config.lock_distance {
                        state.axis = Some(SwipeAxis::Horizontal);
                        locked_now = true;
                    } else if distance_y > distance_x && distance_y > self.config.lock_distance {
                        state.axis = Some(SwipeAxis::Vertical);
                    }
                }

                match state.axis {
                    Some(SwipeAxis::Horizontal) if !context.capture_active => {
                        state.accumulated_horizontal_distance +=
                            if locked_now { direction.x } else { step_x };
                        let accumulated = state.accumulated_horizontal_distance;
                        if accumulated.abs() >= self.config.swipe_distance {
                            events.push(if accumulated > 0.0 {
                                GestureEvent::SwipeRight
                            } else {
                                GestureEvent::SwipeLeft
                            });
                            state.accumulated_horizontal_distance = 0.0;
                            state.horizontal_handled = true;
                        }
                    }
                    Some(SwipeAxis::Vertical) if distance_y > self.config.vertical_distance => {
                        events.push(if direction.y > 0.0 {
                            GestureEvent::ScrollHome
                        } else {
                            GestureEvent::ScrollDetect
                        });
                        state.vertical_handled = true;
                    }
                    _ => {}
                }
            }
            TouchPhase::Stationary => state.last_position = sample.position,
            TouchPhase::Ended | TouchPhase::Cancelled => {
                state.axis = None;
                state.accumulated_horizontal_distance = 0.0;
                state.horizontal_handled = false;
                state.vertical_handled = false;
            }
        }
    }

    fn track_shake(
        &mut self,
        frame: &InputFrame,
        context: GestureContext,
        events: &mut Vec<GestureEvent>,
    ) {
        let counting = !context.gated && !context.capture_active;
        let state = &mut self.state;

        if frame.motion_magnitude > self.config.shake_threshold {
            if state.shaking {
                return;
            }
            state.shaking = true;
            if !counting {
                return;
            }
            state.shake_count += 1;
            state.time_since_last_shake = 0.0;
            if state.shake_count >= self.config.shakes_to_delete && !context.on_home_page {
                events.push(GestureEvent::RequestDelete);
                state.shake_count = 0;
            }
        } else {
            state.shaking = false;
            if state.shake_count > 0 {
                state.time_since_last_shake += frame.dt;
                if state.time_since_last_shake > self.config.shake_window_seconds {
                    state.shake_count = 0;
                    state.time_since_last_shake = 0.0;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 0.1;

    fn open() -> GestureContext {
        GestureContext::default()
    }

    fn off_home() -> GestureContext {
        GestureContext {
            on_home_page: false,
            ..open()
        }
    }

    fn drag(
        classifier: &mut GestureClassifier,
        context: GestureContext,
        points: &[(f32, f32)],
    ) -> Vec<GestureEvent> {
        let mut events = Vec::new();
        let (x, y) = points[0];
        events.extend(classifier.classify(&InputFrame::touch(DT, TouchPhase::Began, x, y), context));
        for &(x, y) in &points[1..] {
            events.extend(
                classifier.classify(&InputFrame::touch(DT, TouchPhase::Moved, x, y), context),
            );
        }
        events
    }

    fn release(classifier: &mut GestureClassifier, context: GestureContext) {
        let (x, y) = (classifier.state().last_position.x, classifier.state().last_position.y);
        classifier.classify(&InputFrame::touch(DT, TouchPhase::Ended, x, y), context);
        classifier.classify(&InputFrame::idle(DT), context);
    }

    #[test]
    fn horizontal_travel_emits_one_swipe() {
        let mut classifier = GestureClassifier::default_thresholds();

        let events = drag(
            &mut classifier,
            open(),
            &[(0.0, 0.0), (100.0, 0.0), (250.0, 10.0), (400.0, 10.0), (500.0, 0.0), (900.0, 0.0)],
        );

        assert_eq!(events, vec![GestureEvent::SwipeRight]);
        assert_eq!(classifier.state().accumulated_horizontal_distance, 0.0);
        assert!(classifier.state().horizontal_handled);
    }

    #[test]
    fn travel_short_of_threshold_emits_nothing() {
        let mut classifier = GestureClassifier::default_thresholds();
        drag(&mut classifier, open(), &[(0.0, 0.0), (500.0, 0.0)]);
        release(&mut classifier, open());

        let events = drag(&mut classifier, open(), &[(0.0, 0.0), (300.0, 0.0), (499.0, 0.0)]);

        assert!(events.is_empty());
        assert_eq!(classifier.state().accumulated_horizontal_distance, 499.0);
    }

    #[test]
    fn leftward_travel_swipes_left() {
        let mut classifier = GestureClassifier::default_thresholds();
        let events = drag(&mut classifier, open(), &[(800.0, 0.0), (550.0, 0.0), (250.0, 0.0)]);
        assert_eq!(events, vec![GestureEvent::SwipeLeft]);
    }

    #[test]
    fn vertical_fires_once_per_contact() {
        let mut classifier = GestureClassifier::default_thresholds();

        let events = drag(
            &mut classifier,
            open(),
            &[(0.0, 0.0), (0.0, 300.0), (10.0, 750.0), (10.0, 1600.0), (0.0, -900.0)],
        );
        assert_eq!(events, vec![GestureEvent::ScrollHome]);

        release(&mut classifier, open());
        let events = drag(&mut classifier, open(), &[(0.0, 0.0), (0.0, -400.0), (0.0, -720.0)]);
        assert_eq!(events, vec![GestureEvent::ScrollDetect]);
    }

    #[test]
    fn vertical_contacts_never_become_horizontal() {
        let mut classifier = GestureClassifier::default_thresholds();
        let events = drag(
            &mut classifier,
            open(),
            &[(0.0, 0.0), (0.0, 300.0), (900.0, 300.0), (1600.0, 300.0)],
        );
        assert!(events.is_empty());
        assert_eq!(classifier.state().axis, Some(SwipeAxis::Vertical));
    }

    #[test]
    fn multi_touch_suspends_drags_until_all_lift() {
        let mut classifier = GestureClassifier::default_thresholds();
        let pinch = InputFrame {
            dt: DT,
            touches: vec![
                TouchSample::new(TouchPhase::Began, 0.0, 0.0),
                TouchSample::new(TouchPhase::Began, 100.0, 0.0),
            ],
            motion_magnitude: 0.0,
        };
        classifier.classify(&pinch, open());

        let events = drag(&mut classifier, open(), &[(0.0, 0.0), (300.0, 0.0), (800.0, 0.0)]);
        assert!(events.is_empty());

        classifier.classify(&InputFrame::idle(DT), open());
        let events = drag(&mut classifier, open(), &[(0.0, 0.0), (300.0, 0.0), (800.0, 0.0)]);
        assert_eq!(events, vec![GestureEvent::SwipeRight]);
    }

    #[test]
    fn gated_moves_drop_the_contact() {
        let mut classifier = GestureClassifier::default_thresholds();
        let gated = GestureContext {
            gated: true,
            ..open()
        };

        let mut events = drag(&mut classifier, gated, &[(0.0, 0.0), (300.0, 0.0)]);
        events.extend(classifier.classify(
            &InputFrame::touch(DT, TouchPhase::Moved, 900.0, 0.0),
            open(),
        ));

        assert!(events.is_empty());
        assert_eq!(classifier.state().touch_origin, Vec2::new(0.0, 0.0));
    }

    #[test]
    fn capture_blocks_horizontal_but_not_vertical() {
        let mut classifier = GestureClassifier::default_thresholds();
        let capturing = GestureContext {
            capture_active: true,
            ..open()
        };

        let events = drag(&mut classifier, capturing, &[(0.0, 0.0), (300.0, 0.0), (900.0, 0.0)]);
        assert!(events.is_empty());

        release(&mut classifier, capturing);
        let events = drag(&mut classifier, capturing, &[(0.0, 0.0), (0.0, -800.0)]);
        assert_eq!(events, vec![GestureEvent::ScrollDetect]);
    }

    fn shake_with_gap(
        classifier: &mut GestureClassifier,
        context: GestureContext,
        quiet_ticks: usize,
    ) -> Vec<GestureEvent> {
        let mut events = classifier.classify(&InputFrame::motion(DT, 60.0), context);
        for _ in 0..quiet_ticks {
            events.extend(classifier.classify(&InputFrame::motion(DT, 1.0), context));
        }
        events.extend(classifier.classify(&InputFrame::motion(DT, 60.0), context));
        events
    }

    #[test]
    fn two_quick_shakes_request_delete() {
        let mut classifier = GestureClassifier::default_thresholds();
        let events = shake_with_gap(&mut classifier, off_home(), 9);
        assert_eq!(events, vec![GestureEvent::RequestDelete]);
        assert_eq!(classifier.state().shake_count, 0);
    }

    #[test]
    fn slow_shakes_do_not_delete() {
        let mut classifier = GestureClassifier::default_thresholds();
        let events = shake_with_gap(&mut classifier, off_home(), 11);
        assert!(events.is_empty());
        assert_eq!(classifier.state().shake_count, 1);
    }

    #[test]
    fn sustained_motion_counts_once() {
        let mut classifier = GestureClassifier::default_thresholds();
        let mut events = Vec::new();
        for _ in 0..5 {
            events.extend(classifier.classify(&InputFrame::motion(DT, 80.0), off_home()));
        }
        assert!(events.is_empty());
        assert_eq!(classifier.state().shake_count, 1);
    }

    #[test]
    fn shakes_do_not_delete_home_or_during_capture() {
        let mut classifier = GestureClassifier::default_thresholds();
        let home = GestureContext {
            on_home_page: true,
            ..open()
        };
        assert!(shake_with_gap(&mut classifier, home, 2).is_empty());

        let mut classifier = GestureClassifier::default_thresholds();
        let capturing = GestureContext {
            capture_active: true,
            ..off_home()
        };
        assert!(shake_with_gap(&mut classifier, capturing, 2).is_empty());
        assert_eq!(classifier.state().shake_count, 0);
    }

    #[test]
    fn gating_keeps_shake_edge_tracking() {
        let mut classifier = GestureClassifier::default_thresholds();
        let gated = GestureContext {
            gated: true,
            ..off_home()
        };

        classifier.classify(&InputFrame::motion(DT, 60.0), gated);
        assert!(classifier.state().shaking);
        // Still above threshold when the gate lifts: not a new crossing.
        let events = classifier.classify(&InputFrame::motion(DT, 60.0), off_home());
        assert!(events.is_empty());
        assert_eq!(classifier.state().shake_count, 0);
    }

    impl GestureClassifier {
        fn default_thresholds() -> Self {
            Self::new(GestureConfig::default())
        }
    }
}
