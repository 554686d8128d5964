//! Event statistics: success/failure counters and success-interval histograms.

mod accumulator;
mod histogram;

pub use accumulator::{EventCounts, EventStatistics};
pub use histogram::{Binning, IntervalHistogram, SuccessIntervalHistogram, MAX_BIN_TOTAL};
