//! Telemetry intake for the adaptive controller.
//!
//! The UI pushes [`PerformanceSample`]s at its own cadence (typically ~10 Hz)
//! and reports interaction events. Both are kept in bounded rolling windows
//! owned by the controller.
//!
//! ```text
//! UI frame loop ──► PerformanceSample ──► SampleWindow (10s, FIFO) ──► averages
//! UI input      ──► interaction_event ──► InteractionTracker (5s)  ──► intensity
//! ```

mod interaction;
mod window;

pub use interaction::{InteractionTracker, INTERACTION_WINDOW, SATURATION_EVENTS_PER_SEC};
pub use window::{SampleAverages, SampleWindow, DEFAULT_MAX_SAMPLES, DEFAULT_WINDOW};

use std::time::Instant;

/// One telemetry measurement from the UI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceSample {
    pub fps: f64,
    pub frame_time_ms: f64,
    pub input_latency_ms: f64,
    pub render_time_ms: f64,
    pub timestamp: Instant,
}

impl PerformanceSample {
    pub fn new(
        fps: f64,
        frame_time_ms: f64,
        input_latency_ms: f64,
        render_time_ms: f64,
        timestamp: Instant,
    ) -> Self {
        Self {
            fps,
            frame_time_ms,
            input_latency_ms,
            render_time_ms,
            timestamp,
        }
    }

    /// Sample derived from fps and latency alone.
    pub fn from_fps(fps: f64, input_latency_ms: f64, timestamp: Instant) -> Self {
        let frame_time_ms = if fps > 0.0 { 1000.0 / fps } else { 0.0 };
        Self::new(fps, frame_time_ms, input_latency_ms, frame_time_ms, timestamp)
    }

    /// Whether every field is a usable number.
    pub fn is_finite(&self) -> bool {
        self.fps.is_finite()
            && self.frame_time_ms.is_finite()
            && self.input_latency_ms.is_finite()
            && self.render_time_ms.is_finite()
    }
}
