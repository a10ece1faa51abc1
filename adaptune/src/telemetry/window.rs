//! Rolling window of performance samples.
//!
//! Samples are appended in arrival order and pruned from the front once they
//! fall outside the window duration or exceed the sample cap.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::PerformanceSample;

/// How much history the controller averages over.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(10);

/// Hard cap on retained samples (prevents unbounded memory).
pub const DEFAULT_MAX_SAMPLES: usize = 600;

/// Averages over the samples currently in the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleAverages {
    pub fps: f64,
    pub frame_time_ms: f64,
    pub input_latency_ms: f64,
    pub render_time_ms: f64,
    pub sample_count: usize,
}

/// Bounded FIFO window of recent samples.
#[derive(Debug)]
pub struct SampleWindow {
    samples: VecDeque<PerformanceSample>,
    window_duration: Duration,
    max_samples: usize,
}

impl SampleWindow {
    pub fn new(window_duration: Duration, max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples.min(1024)),
            window_duration,
            max_samples: max_samples.max(1),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_MAX_SAMPLES)
    }

    /// Append a sample and drop anything that fell out of the window.
    ///
    /// Non-finite samples are ignored.
    pub fn push(&mut self, sample: PerformanceSample) {
        if !sample.is_finite() {
            tracing::debug!(?sample, "Dropping non-finite performance sample");
            return;
        }

        self.samples.push_back(sample);
        self.prune(sample.timestamp);

        while self.samples.len() > self.max_samples {
            self.samples.pop_front();
        }
    }

    /// Drop samples older than the window, relative to `now`.
    pub fn prune(&mut self, now: Instant) {
        let Some(cutoff) = now.checked_sub(self.window_duration) else {
            return;
        };
        while let Some(front) = self.samples.front() {
            if front.timestamp < cutoff {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Averages over the window, or `None` when it is empty.
    pub fn averages(&self) -> Option<SampleAverages> {
        if self.samples.is_empty() {
            return None;
        }

        let n = self.samples.len() as f64;
        let (fps, frame, latency, render) = self.samples.iter().fold(
            (0.0, 0.0, 0.0, 0.0),
            |(fps, frame, latency, render), s| {
                (
                    fps + s.fps,
                    frame + s.frame_time_ms,
                    latency + s.input_latency_ms,
                    render + s.render_time_ms,
                )
            },
        );

        Some(SampleAverages {
            fps: fps / n,
            frame_time_ms: frame / n,
            input_latency_ms: latency / n,
            render_time_ms: render / n,
            sample_count: self.samples.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Samples oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &PerformanceSample> {
        self.samples.iter()
    }
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self::with_defaults()
    }
}
