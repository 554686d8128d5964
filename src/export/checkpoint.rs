//! Checkpoint save and restore.
//!
//! A checkpoint is the whole [`KineticsEngine`] (networks, pending captures,
//! statistics, scheduler and random stream position) plus the step it was
//! taken at. Floats round-trip exactly, so a restored run continues
//! bit-for-bit.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::engine::KineticsEngine;
use crate::error::KineticsError;

/// Format version written into every checkpoint
pub const CHECKPOINT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    /// Wall-clock time the checkpoint was written
    #[serde(default)]
    pub saved_at: String,
    /// Last step executed before the checkpoint
    pub step: u64,
    pub engine: KineticsEngine,
}

impl Checkpoint {
    pub fn new(step: u64, engine: &KineticsEngine) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            saved_at: Local::now().to_rfc3339(),
            step,
            engine: engine.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String, KineticsError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse and validate a checkpoint
    pub fn from_json(json: &str) -> Result<Self, KineticsError> {
        let checkpoint: Checkpoint = serde_json::from_str(json)?;
        checkpoint.validated()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), KineticsError> {
        let writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer(writer, self)?;
        log::info!("Checkpoint at step {} saved: {}", self.step, path.as_ref().display());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, KineticsError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let checkpoint: Checkpoint = serde_json::from_reader(reader)?;
        log::info!(
            "Checkpoint at step {} loaded: {}",
            checkpoint.step,
            path.as_ref().display()
        );
        checkpoint.validated()
    }

    /// Step and engine to resume from
    pub fn restore(self) -> (u64, KineticsEngine) {
        (self.step, self.engine)
    }

    fn validated(self) -> Result<Self, KineticsError> {
        if self.version != CHECKPOINT_VERSION {
            return Err(KineticsError::CheckpointVersion(self.version));
        }
        self.engine.check_invariants()?;
        Ok(self)
    }
}

/// Write a checkpoint into `dir` with a timestamped filename
///
/// Returns the path to the saved file.
pub fn export_checkpoint<P: AsRef<Path>>(dir: P, step: u64, engine: &KineticsEngine) -> anyhow::Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("checkpoint_{}_step{}.json", timestamp, step));
    Checkpoint::new(step, engine).save(&path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_mismatch_rejected() {
        let mut checkpoint = Checkpoint::new(3, &KineticsEngine::new(9));
        checkpoint.version = 99;
        let json = serde_json::to_string(&checkpoint).unwrap();
        assert!(matches!(
            Checkpoint::from_json(&json),
            Err(KineticsError::CheckpointVersion(99))
        ));
    }

    #[test]
    fn test_empty_engine_roundtrip() {
        let engine = KineticsEngine::new(9);
        let json = Checkpoint::new(0, &engine).to_json().unwrap();
        let (step, restored) = Checkpoint::from_json(&json).unwrap().restore();
        assert_eq!(step, 0);
        assert_eq!(restored, engine);
    }
}
