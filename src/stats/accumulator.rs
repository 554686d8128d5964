//! Per-event success/failure counters.

use serde::{Deserialize, Serialize};

use super::histogram::{IntervalHistogram, SuccessIntervalHistogram};

/// Counts reported at a sampling point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventCounts {
    pub successes: u64,
    pub failures: u64,
}

impl EventCounts {
    pub fn attempts(&self) -> u64 {
        self.successes + self.failures
    }

    /// Fraction of attempts that succeeded, 0 when nothing was attempted
    pub fn success_ratio(&self) -> f64 {
        match self.attempts() {
            0 => 0.0,
            n => self.successes as f64 / n as f64,
        }
    }
}

/// Statistics for one event
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventStatistics {
    /// Counts since run start
    total: EventCounts,
    /// Counts since the last sample
    window: EventCounts,
    /// Report cumulative counts instead of the window
    cumulative: bool,
    /// Optional success-interval histogram
    histogram: Option<SuccessIntervalHistogram>,
}

impl EventStatistics {
    pub fn new(cumulative: bool) -> Self {
        Self {
            cumulative,
            ..Self::default()
        }
    }

    pub fn set_cumulative(&mut self, cumulative: bool) {
        self.cumulative = cumulative;
    }

    pub fn is_cumulative(&self) -> bool {
        self.cumulative
    }

    pub fn set_histogram(&mut self, histogram: SuccessIntervalHistogram) {
        self.histogram = Some(histogram);
    }

    pub fn histogram(&self) -> Option<&SuccessIntervalHistogram> {
        self.histogram.as_ref()
    }

    /// Record the outcome of one execution of the event at `step`
    pub fn record_execution(&mut self, step: u64, successes: u64, failures: u64) {
        self.total.successes += successes;
        self.total.failures += failures;
        self.window.successes += successes;
        self.window.failures += failures;
        if successes > 0 {
            if let Some(h) = self.histogram.as_mut() {
                h.record_success(step);
            }
        }
    }

    /// Counts since run start
    pub fn total(&self) -> EventCounts {
        self.total
    }

    /// Counts as currently reported (cumulative or windowed)
    pub fn current(&self) -> EventCounts {
        if self.cumulative {
            self.total
        } else {
            self.window
        }
    }

    /// Close a sampling period: report counts, reset the window, maybe flush the histogram.
    pub fn sample(&mut self) -> (EventCounts, Option<IntervalHistogram>) {
        let counts = self.current();
        self.window = EventCounts::default();
        let flushed = self.histogram.as_mut().and_then(|h| h.end_sampling_period());
        (counts, flushed)
    }
}
