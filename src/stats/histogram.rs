//! Histogram of intervals between successful event executions.
//!
//! Configured by exactly one of a bin count (1..=100000, width derived) or
//! a bin width (count derived, at most 100000 bins). Intervals are collected over a number of
//! sampling periods and then flushed as one histogram.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Largest admissible bin count
pub const MAX_BIN_TOTAL: u32 = 100_000;

/// How the bins are laid out
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Binning {
    /// Fixed number of bins; width derived from the largest interval
    Total(u32),
    /// Fixed bin width; count derived from the largest interval
    Width(f64),
}

impl Binning {
    /// Validate the `(bin_total, bin_width)` pair: exactly one must be nonzero.
    pub fn from_pair(total: u32, width: f64) -> Result<Self, ConfigError> {
        let invalid = ConfigError::InvalidBinning { total, width };
        match (total > 0, width != 0.0) {
            (true, false) if total <= MAX_BIN_TOTAL => Ok(Binning::Total(total)),
            (false, true) if width.is_finite() && width > 0.0 => Ok(Binning::Width(width)),
            _ => Err(invalid),
        }
    }
}

/// A flushed histogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalHistogram {
    /// Bin width in steps
    pub bin_width: f64,
    /// Counts per bin; bin `i` covers `[i * width, (i + 1) * width)`
    pub counts: Vec<u64>,
    /// Number of intervals binned
    pub samples: u64,
    /// Mean interval in steps
    pub mean_interval: f64,
}

/// Collects success intervals and flushes them every `sample_periods` samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessIntervalHistogram {
    binning: Binning,
    sample_periods: u32,
    periods_seen: u32,
    last_success_step: Option<u64>,
    intervals: Vec<u64>,
}

impl SuccessIntervalHistogram {
    pub fn new(bin_total: u32, bin_width: f64, sample_periods: u32) -> Result<Self, ConfigError> {
        let binning = Binning::from_pair(bin_total, bin_width)?;
        if sample_periods == 0 {
            return Err(ConfigError::ZeroSamplePeriods);
        }
        Ok(Self {
            binning,
            sample_periods,
            periods_seen: 0,
            last_success_step: None,
            intervals: Vec::new(),
        })
    }

    pub fn binning(&self) -> Binning {
        self.binning
    }

    pub fn sample_periods(&self) -> u32 {
        self.sample_periods
    }

    /// Record an execution at `step` that produced at least one success
    pub fn record_success(&mut self, step: u64) {
        if let Some(last) = self.last_success_step {
            self.intervals.push(step.saturating_sub(last));
        }
        self.last_success_step = Some(step);
    }

    /// Intervals collected since the last flush
    pub fn pending_intervals(&self) -> &[u64] {
        &self.intervals
    }

    /// Count one sampling period; returns the histogram when it is due.
    pub fn end_sampling_period(&mut self) -> Option<IntervalHistogram> {
        self.periods_seen += 1;
        if self.periods_seen < self.sample_periods {
            return None;
        }
        self.periods_seen = 0;
        let histogram = self.build();
        self.intervals.clear();
        Some(histogram)
    }

    fn build(&self) -> IntervalHistogram {
        let max = self.intervals.iter().copied().max().unwrap_or(0) as f64;
        let (bin_width, bins) = match self.binning {
            Binning::Total(total) => {
                let width = if max > 0.0 { max / total as f64 } else { 1.0 };
                (width, total as usize)
            }
            // Capped at MAX_BIN_TOTAL; longer intervals fall into the last bin
            Binning::Width(width) => (width, ((max / width).floor() + 1.0).min(MAX_BIN_TOTAL as f64) as usize),
        };

        let mut counts = vec![0u64; bins];
        for &interval in &self.intervals {
            let idx = ((interval as f64 / bin_width).floor() as usize).min(bins - 1);
            counts[idx] += 1;
        }

        let samples = self.intervals.len() as u64;
        let mean_interval = if samples > 0 {
            self.intervals.iter().sum::<u64>() as f64 / samples as f64
        } else {
            0.0
        };

        IntervalHistogram {
            bin_width,
            counts,
            samples,
            mean_interval,
        }
    }
}
