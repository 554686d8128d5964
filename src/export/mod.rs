//! Export functionality for kinetics data.
//!
//! Provides change-record rendering, CSV statistics export, and JSON
//! checkpoints.

mod checkpoint;
mod csv_export;
mod records;

pub use checkpoint::{export_checkpoint, Checkpoint, CHECKPOINT_VERSION};
pub use csv_export::{CsvExporter, StatisticsRecord};
pub use records::{
    ChangeLog, ChangeRecord, CommandRecord, HaltRecord, LogSink, NullLog, OutputMode, TransitionKind,
    TransitionRecord,
};
