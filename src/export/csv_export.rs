//! CSV time-series export for event statistics.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;
use serde::Serialize;

use crate::engine::NetworkSample;

/// One CSV row: one event of one network at a sampling point
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsRecord {
    pub step: u64,
    pub network: String,
    pub event: &'static str,
    pub event_id: u64,
    pub successes: u64,
    pub failures: u64,
    /// Successes over attempts (0 with no attempts)
    pub success_ratio: f64,
    /// Intervals in the histogram flushed at this sample (0 if none)
    pub interval_samples: u64,
    /// Mean success interval in steps (empty if no histogram flushed)
    pub mean_interval_steps: Option<f64>,
    /// Histogram bin width in steps
    pub bin_width_steps: Option<f64>,
    /// Histogram counts joined with ';'
    pub bin_counts: String,
}

impl From<&NetworkSample> for StatisticsRecord {
    fn from(s: &NetworkSample) -> Self {
        let histogram = s.sample.histogram.as_ref();
        Self {
            step: s.step,
            network: s.network.clone(),
            event: s.sample.event.name(),
            event_id: s.sample.event_id,
            successes: s.sample.counts.successes,
            failures: s.sample.counts.failures,
            success_ratio: s.sample.counts.success_ratio(),
            interval_samples: histogram.map_or(0, |h| h.samples),
            mean_interval_steps: histogram.map(|h| h.mean_interval),
            bin_width_steps: histogram.map(|h| h.bin_width),
            bin_counts: histogram
                .map(|h| h.counts.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(";"))
                .unwrap_or_default(),
        }
    }
}

/// CSV exporter for statistics samples
pub struct CsvExporter {
    writer: csv::Writer<File>,
    /// Rows written so far
    rows: u64,
    /// Path to output file
    path: PathBuf,
}

impl CsvExporter {
    /// Create an exporter in `dir` with a timestamped filename
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("statistics_{}.csv", timestamp));
        Self::create(path)
    }

    /// Create an exporter writing to exactly `path`
    pub fn create<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let file = File::create(&path)?;
        let writer = csv::Writer::from_writer(file);

        log::info!("CSV export started: {}", path.display());

        Ok(Self { writer, rows: 0, path })
    }

    /// Write one row per sampled event
    pub fn record(&mut self, samples: &[NetworkSample]) -> Result<()> {
        for sample in samples {
            self.writer.serialize(StatisticsRecord::from(sample))?;
            self.rows += 1;
        }
        Ok(())
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Finish writing and return the output path
    pub fn finish(mut self) -> Result<PathBuf> {
        self.writer.flush()?;
        log::info!("CSV export completed: {} ({} rows)", self.path.display(), self.rows);
        Ok(self.path)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}
