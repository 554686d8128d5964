//! Run parameters for the demonstration driver.
//!
//! A run file is JSON: seed, step count, sampling, the monomer cloud used
//! as the stand-in particle store, and the ordered command list.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::commands::Command;
use crate::export::OutputMode;

/// Monomer cloud for the in-memory store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudParameters {
    /// Monomer type name
    pub monomer: String,
    /// Number of monomers
    pub count: usize,
    /// Edge length of the cubic box
    pub box_length: f64,
    /// Standard deviation of the Brownian displacement per step (0 freezes)
    pub jitter_sigma: f64,
}

impl Default for CloudParameters {
    fn default() -> Self {
        Self {
            monomer: "A".to_string(),
            count: 400,
            box_length: 8.0,
            jitter_sigma: 0.05,
        }
    }
}

/// Top-level run parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunParameters {
    /// Seed of the transition stream and the monomer cloud
    pub seed: u64,
    /// Steps to run
    pub steps: u64,
    /// Steps between statistics samples
    pub sample_period: u64,
    /// Rendering of change records
    pub output_mode: OutputMode,
    pub cloud: CloudParameters,
    /// Applied in order before the first step
    pub commands: Vec<Command>,
}

impl Default for RunParameters {
    fn default() -> Self {
        Self {
            seed: 42,
            steps: 1000,
            sample_period: 100,
            output_mode: OutputMode::Text,
            cloud: CloudParameters::default(),
            commands: default_commands("actin", "A"),
        }
    }
}

impl RunParameters {
    /// Load from a JSON file, or use defaults if it can't be read or parsed
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(params) => {
                    log::info!("Loaded run parameters from {:?}", path.as_ref());
                    params
                }
                Err(e) => {
                    log::warn!("Failed to parse run parameters: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("Run parameters file not found, using defaults");
                Self::default()
            }
        }
    }

    /// Load from a JSON file, failing on any error
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading run parameters {:?}", path.as_ref()))?;
        let params = serde_json::from_str(&contents)
            .with_context(|| format!("parsing run parameters {:?}", path.as_ref()))?;
        log::info!("Loaded run parameters from {:?}", path.as_ref());
        Ok(params)
    }
}

/// A small actin-like network: nucleation, cone growth at both ends,
/// release, dissolution and the nucleotide cycle.
pub fn default_commands(acn: &str, monomer: &str) -> Vec<Command> {
    use crate::events::{EventType, PolymerEnd};
    use crate::geometry::ConeSpec;

    let acn = acn.to_string();
    let cone = ConeSpec {
        range: 1.2,
        half_angle_deg: 30.0,
        polar_angle_deg: 0.0,
        azimuth_deg: 0.0,
    };
    vec![
        Command::CreateActiveNetwork {
            acn: acn.clone(),
            monomer: monomer.to_string(),
        },
        Command::SetPolymerFormsEvent {
            acn: acn.clone(),
            duration: 20,
            min_range: 0.0,
            range: 0.8,
            spring: 128.0,
            length: 0.5,
        },
        Command::SetEventProbability {
            acn: acn.clone(),
            event: EventType::PolymerForms,
            probability: 0.1,
        },
        Command::SetBondBindsForwardConeToPolymerHeadEvent {
            acn: acn.clone(),
            duration: 10,
            cone,
            spring: 128.0,
            length: 0.5,
        },
        Command::SetBondBindsForwardConeToPolymerTailEvent {
            acn: acn.clone(),
            duration: 10,
            cone,
            spring: 128.0,
            length: 0.5,
        },
        Command::SetFixedHeadOffRate {
            acn: acn.clone(),
            rate: 0.001,
        },
        Command::SetFixedTailOffRate {
            acn: acn.clone(),
            rate: 0.01,
        },
        Command::SetBondUnbindsFromPolymerHeadEvent {
            acn: acn.clone(),
            duration: 0,
            spring: 128.0,
            length: 0.5,
        },
        Command::SetBondUnbindsFromPolymerTailEvent {
            acn: acn.clone(),
            duration: 0,
            spring: 128.0,
            length: 0.5,
        },
        Command::SetProximityOffSeparation {
            acn: acn.clone(),
            end: PolymerEnd::Tail,
            separation: 2.0,
        },
        Command::SetAtpHydrolysisProbability {
            acn: acn.clone(),
            rate: 0.05,
        },
        Command::SetAdpReleasePiProbability {
            acn: acn.clone(),
            rate: 0.02,
        },
        Command::SetAdpPhosphorylationProbability {
            acn: acn.clone(),
            rate: 0.01,
        },
        Command::SetTailAdpMultiplier {
            acn: acn.clone(),
            multiplier: 2.0,
        },
        Command::SetActivePolymerLimit { acn: acn.clone(), max: 20 },
        Command::BinEventSuccessIntervals {
            acn,
            event: EventType::PolymerForms,
            bin_total: 20,
            bin_width: 0.0,
            sample_periods: 2,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let params = RunParameters::default();
        for command in &params.commands {
            assert!(command.validate().is_ok(), "{:?}", command);
        }
    }

    #[test]
    fn test_missing_file_falls_back() {
        let params = RunParameters::load_or_default("does/not/exist.json");
        assert_eq!(params, RunParameters::default());
    }

    #[test]
    fn test_strict_load_reports_missing_file() {
        assert!(RunParameters::load("does/not/exist.json").is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let params: RunParameters = serde_json::from_str(r#"{"seed": 7, "commands": []}"#).unwrap();
        assert_eq!(params.seed, 7);
        assert!(params.commands.is_empty());
        assert_eq!(params.steps, RunParameters::default().steps);
    }
}
