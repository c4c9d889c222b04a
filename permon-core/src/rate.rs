//! Rate tracking for cumulative byte counters

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::MIB;

/// Width of the sliding window the rate is computed over
pub const RATE_WINDOW: Duration = Duration::from_secs(1);

/// How the byte delta inside the window is turned into a per-second rate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateNormalization {
    /// Divide by the wall-clock time between the oldest and newest cached
    /// sample. A window shorter than one second right after startup is
    /// scaled up instead of under-reporting.
    #[default]
    Elapsed,
    /// Treat the window as exactly one second regardless of how much time
    /// the cache actually spans.
    NominalWindow,
}

/// Converts a monotonically increasing byte counter into MiB/s.
#[derive(Debug, Clone)]
pub struct RateTracker {
    start: u64,
    cache: VecDeque<(u64, Instant)>,
    window: Duration,
    normalization: RateNormalization,
}

impl RateTracker {
    /// `start` is the counter value at construction; all deltas are taken
    /// relative to it.
    pub fn new(start: u64, normalization: RateNormalization) -> Self {
        Self {
            start,
            cache: VecDeque::new(),
            window: RATE_WINDOW,
            normalization,
        }
    }

    pub fn poll(&mut self, counter: u64) -> f64 {
        self.poll_at(counter, Instant::now())
    }

    /// Record `counter` as observed at `now` and return the rate in MiB/s.
    pub fn poll_at(&mut self, counter: u64, now: Instant) -> f64 {
        let delta = counter.saturating_sub(self.start);
        self.cache.push_back((delta, now));

        while let Some(&(_, taken)) = self.cache.front() {
            if now.saturating_duration_since(taken) > self.window {
                self.cache.pop_front();
            } else {
                break;
            }
        }

        let (Some(&(first, first_at)), Some(&(last, last_at))) =
            (self.cache.front(), self.cache.back())
        else {
            return 0.0;
        };

        let bytes = last.saturating_sub(first) as f64;
        let bytes_per_sec = match self.normalization {
            RateNormalization::NominalWindow => bytes / self.window.as_secs_f64(),
            RateNormalization::Elapsed => {
                let elapsed = last_at.saturating_duration_since(first_at).as_secs_f64();
                if elapsed > 0.0 {
                    bytes / elapsed
                } else {
                    0.0
                }
            }
        };
        bytes_per_sec / MIB
    }

    pub fn normalization(&self) -> RateNormalization {
        self.normalization
    }
}
