//! User interaction intensity.
//!
//! Intensity is the weighted event rate over the last few seconds, normalised
//! so that a sustained [`SATURATION_EVENTS_PER_SEC`] reads as `1.0`.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// How far back interaction events count.
pub const INTERACTION_WINDOW: Duration = Duration::from_secs(5);

/// Weighted events per second that map to full intensity.
pub const SATURATION_EVENTS_PER_SEC: f64 = 4.0;

const MAX_EVENTS: usize = 512;

/// Tracks recent interaction events and derives an intensity in `[0, 1]`.
#[derive(Debug)]
pub struct InteractionTracker {
    events: VecDeque<(Instant, f64)>,
    window: Duration,
}

impl InteractionTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            events: VecDeque::new(),
            window,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(INTERACTION_WINDOW)
    }

    /// Weight of an event kind. Continuous gestures count more.
    pub fn weight_for(kind: &str) -> f64 {
        match kind.to_ascii_lowercase().as_str() {
            "drag" | "pinch" => 1.5,
            "tap" | "click" | "scroll" | "key" | "touch" => 1.0,
            _ => 0.5,
        }
    }

    /// Record an interaction event.
    pub fn record(&mut self, kind: &str, at: Instant) {
        self.events.push_back((at, Self::weight_for(kind)));
        self.prune(at);
        while self.events.len() > MAX_EVENTS {
            self.events.pop_front();
        }
    }

    /// Intensity at `now`, in `[0, 1]`.
    pub fn intensity(&mut self, now: Instant) -> f64 {
        self.prune(now);
        let weighted: f64 = self.events.iter().map(|(_, w)| w).sum();
        let capacity = SATURATION_EVENTS_PER_SEC * self.window.as_secs_f64();
        if capacity <= 0.0 {
            return 0.0;
        }
        (weighted / capacity).clamp(0.0, 1.0)
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    fn prune(&mut self, now: Instant) {
        let Some(cutoff) = now.checked_sub(self.window) else {
            return;
        };
        while let Some((at, _)) = self.events.front() {
            if *at < cutoff {
                self.events.pop_front();
            } else {
                break;
            }
        }
    }
}

impl Default for InteractionTracker {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_intensity_is_zero() {
        let mut tracker = InteractionTracker::with_defaults();
        assert_eq!(tracker.intensity(Instant::now()), 0.0);
    }

    #[test]
    fn test_intensity_grows_with_events() {
        let start = Instant::now();
        let mut tracker = InteractionTracker::with_defaults();
        for i in 0..5 {
            tracker.record("tap", start + Duration::from_millis(i * 100));
        }
        let now = start + Duration::from_millis(500);
        // 5 taps over a 5s window at 4/s saturation = 5 / 20
        assert!((tracker.intensity(now) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_intensity_saturates() {
        let start = Instant::now();
        let mut tracker = InteractionTracker::with_defaults();
        for i in 0..100 {
            tracker.record("drag", start + Duration::from_millis(i * 10));
        }
        assert_eq!(tracker.intensity(start + Duration::from_secs(1)), 1.0);
    }

    #[test]
    fn test_old_events_expire() {
        let start = Instant::now();
        let mut tracker = InteractionTracker::with_defaults();
        tracker.record("tap", start);
        let later = start + INTERACTION_WINDOW + Duration::from_millis(1);
        assert_eq!(tracker.intensity(later), 0.0);
        assert_eq!(tracker.event_count(), 0);
    }

    #[test]
    fn test_weights() {
        assert_eq!(InteractionTracker::weight_for("drag"), 1.5);
        assert_eq!(InteractionTracker::weight_for("CLICK"), 1.0);
        assert_eq!(InteractionTracker::weight_for("hover"), 0.5);
    }
}
