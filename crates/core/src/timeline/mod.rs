//! Deterministic, tick-driven timing primitives.

use serde::{Deserialize, Serialize};

/// Slack for comparing accumulated frame deltas against deadlines.
pub const TIME_EPSILON: f32 = 1e-4;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PlaybackClock {
    pub time_seconds: f32,
}

impl PlaybackClock {
    pub fn advance(&mut self, delta: f32) {
        self.time_seconds = (self.time_seconds + delta).max(0.0);
    }
}

/// One-shot timer counting down to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Countdown {
    remaining: f32,
    fired: bool,
}

impl Countdown {
    pub fn new(seconds: f32) -> Self {
        Self {
            remaining: seconds.max(0.0),
            fired: false,
        }
    }

    /// Advances the timer; returns `true` on the first tick that finds it
    /// expired.
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.fired {
            return false;
        }
        self.remaining -= dt.max(0.0);
        self.fired = self.is_finished();
        self.fired
    }

    pub fn is_finished(&self) -> bool {
        self.remaining <= TIME_EPSILON
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Easing {
    Linear,
    InOutQuad,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
        }
    }
}

/// Scalar animation from `from` to `to` over a fixed duration.
#[derive(Debug, Clone, PartialEq)]
pub struct Tween {
    from: f32,
    to: f32,
    duration: f32,
    elapsed: f32,
    easing: Easing,
}

impl Tween {
    pub fn new(from: f32, to: f32, duration: f32, easing: Easing) -> Self {
        Self {
            from,
            to,
            duration: duration.max(0.0),
            elapsed: 0.0,
            easing,
        }
    }

    /// Advances the tween and returns the new value.
    pub fn advance(&mut self, dt: f32) -> f32 {
        self.elapsed = (self.elapsed + dt.max(0.0)).min(self.duration);
        self.value()
    }

    pub fn value(&self) -> f32 {
        if self.is_finished() {
            return self.to;
        }
        let progress = self.easing.apply(self.elapsed / self.duration);
        self.from + (self.to - self.from) * progress
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration - TIME_EPSILON
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledEvent<E> {
    pub due_seconds: f32,
    pub event: E,
}

/// Queue of events released once their delay has elapsed.
#[derive(Debug)]
pub struct Scheduler<E> {
    clock: PlaybackClock,
    events: Vec<ScheduledEvent<E>>,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self {
            clock: PlaybackClock::default(),
            events: Vec::new(),
        }
    }
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, delay_seconds: f32, event: E) {
        let due_seconds = self.clock.time_seconds + delay_seconds.max(0.0);
        // Stable insert keeps same-deadline events in submission order.
        let at = self
            .events
            .partition_point(|scheduled| scheduled.due_seconds <= due_seconds);
        self.events.insert(at, ScheduledEvent { due_seconds, event });
    }

    /// Advances the clock and returns every event that became due, oldest
    /// deadline first.
    pub fn tick(&mut self, dt: f32) -> Vec<E> {
        self.clock.advance(dt);
        let now = self.clock.time_seconds + TIME_EPSILON;
        let due = self
            .events
            .partition_point(|scheduled| scheduled.due_seconds <= now);
        self.events
            .drain(..due)
            .map(|scheduled| scheduled.event)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_fires_once() {
        let mut timer = Countdown::new(1.0);
        assert!(!timer.tick(0.6));
        assert!(timer.tick(0.6));
        assert!(!timer.tick(0.6));
        assert!(timer.is_finished());
    }

    #[test]
    fn zero_countdown_fires_on_first_tick() {
        let mut timer = Countdown::new(0.0);
        assert!(timer.is_finished());
        assert!(timer.tick(0.016));
        assert!(!timer.tick(0.016));
    }

    #[test]
    fn ease_in_out_is_symmetric() {
        let easing = Easing::InOutQuad;
        assert_eq!(easing.apply(0.0), 0.0);
        assert_eq!(easing.apply(1.0), 1.0);
        assert!((easing.apply(0.5) - 0.5).abs() < 1e-6);
        assert!((easing.apply(0.25) + easing.apply(0.75) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn tween_lands_on_target() {
        let mut tween = Tween::new(0.0, -1200.0, 0.8, Easing::InOutQuad);
        tween.advance(0.4);
        assert!(!tween.is_finished());
        assert!((tween.value() + 600.0).abs() < 1e-3);
        tween.advance(1.0);
        assert!(tween.is_finished());
        assert_eq!(tween.value(), -1200.0);
    }

    #[test]
    fn scheduler_releases_in_deadline_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(0.8, "late");
        scheduler.schedule(0.3, "early");
        scheduler.schedule(0.3, "early-second");

        assert!(scheduler.tick(0.2).is_empty());
        assert_eq!(scheduler.tick(0.2), vec!["early", "early-second"]);
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.tick(0.5), vec!["late"]);
        assert!(scheduler.is_empty());
    }
}
