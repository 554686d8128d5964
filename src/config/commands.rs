//! Configuration commands that build and tune active cell networks.
//!
//! Commands arrive as JSON objects tagged by `command`, e.g.
//! `{"command": "SetFixedHeadOffRate", "acn": "actin", "rate": 0.01}`.
//! [`Command::validate`] checks every parameter range that does not depend
//! on engine state; the engine checks the rest when applying.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::events::{checked_duration, checked_period, EventType, Hookean, PolymerEnd};
use crate::geometry::{ConeSpec, ProximityShell};
use crate::stats::Binning;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum Command {
    CreateActiveNetwork {
        acn: String,
        monomer: String,
    },
    SetFixedHeadOffRate {
        acn: String,
        rate: f64,
    },
    SetFixedTailOffRate {
        acn: String,
        rate: f64,
    },
    SetProximityOnSeparation {
        acn: String,
        end: PolymerEnd,
        #[serde(default)]
        min_separation: f64,
        separation: f64,
    },
    SetProximityOffSeparation {
        acn: String,
        end: PolymerEnd,
        separation: f64,
    },
    SetBondBindsForwardConeToPolymerHeadEvent {
        acn: String,
        duration: i64,
        #[serde(flatten)]
        cone: ConeSpec,
        spring: f64,
        length: f64,
    },
    SetBondBindsForwardConeToPolymerTailEvent {
        acn: String,
        duration: i64,
        #[serde(flatten)]
        cone: ConeSpec,
        spring: f64,
        length: f64,
    },
    SetBondUnbindsFromPolymerHeadEvent {
        acn: String,
        duration: i64,
        spring: f64,
        length: f64,
    },
    SetBondUnbindsFromPolymerTailEvent {
        acn: String,
        duration: i64,
        spring: f64,
        length: f64,
    },
    SetPolymerFormsEvent {
        acn: String,
        duration: i64,
        #[serde(default)]
        min_range: f64,
        range: f64,
        spring: f64,
        length: f64,
    },
    SetPolymerDissolvesEvent {
        acn: String,
        duration: i64,
        range: f64,
        spring: f64,
        length: f64,
    },
    SetActivePolymerLimit {
        acn: String,
        max: usize,
    },
    CancelActivePolymerLimit {
        acn: String,
    },
    #[serde(rename = "SetATPHydrolysisProbability")]
    SetAtpHydrolysisProbability {
        acn: String,
        rate: f64,
    },
    #[serde(rename = "SetADPReleasePiProbability")]
    SetAdpReleasePiProbability {
        acn: String,
        rate: f64,
    },
    #[serde(rename = "SetADPPhosphorylationProbability")]
    SetAdpPhosphorylationProbability {
        acn: String,
        rate: f64,
    },
    #[serde(rename = "SetHeadADPMultiplier")]
    SetHeadAdpMultiplier {
        acn: String,
        multiplier: f64,
    },
    #[serde(rename = "SetHeadADPPiMultiplier")]
    SetHeadAdpPiMultiplier {
        acn: String,
        multiplier: f64,
    },
    #[serde(rename = "SetTailADPMultiplier")]
    SetTailAdpMultiplier {
        acn: String,
        multiplier: f64,
    },
    SetEventExecutionPeriod {
        acn: String,
        event: EventType,
        period: i64,
    },
    SetEventProbability {
        acn: String,
        event: EventType,
        probability: f64,
    },
    SetEventActive {
        acn: String,
        event: EventType,
        active: bool,
    },
    SetNetworkActive {
        acn: String,
        active: bool,
    },
    ToggleCumulativeEventStatistics {
        acn: String,
        cumulative: bool,
    },
    BinEventSuccessIntervals {
        acn: String,
        event: EventType,
        #[serde(default)]
        bin_total: u32,
        #[serde(default)]
        bin_width: f64,
        sample_periods: u32,
    },
}

impl Command {
    /// Command name as it appears in configuration files and change records
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateActiveNetwork { .. } => "CreateActiveNetwork",
            Command::SetFixedHeadOffRate { .. } => "SetFixedHeadOffRate",
            Command::SetFixedTailOffRate { .. } => "SetFixedTailOffRate",
            Command::SetProximityOnSeparation { .. } => "SetProximityOnSeparation",
            Command::SetProximityOffSeparation { .. } => "SetProximityOffSeparation",
            Command::SetBondBindsForwardConeToPolymerHeadEvent { .. } => "SetBondBindsForwardConeToPolymerHeadEvent",
            Command::SetBondBindsForwardConeToPolymerTailEvent { .. } => "SetBondBindsForwardConeToPolymerTailEvent",
            Command::SetBondUnbindsFromPolymerHeadEvent { .. } => "SetBondUnbindsFromPolymerHeadEvent",
            Command::SetBondUnbindsFromPolymerTailEvent { .. } => "SetBondUnbindsFromPolymerTailEvent",
            Command::SetPolymerFormsEvent { .. } => "SetPolymerFormsEvent",
            Command::SetPolymerDissolvesEvent { .. } => "SetPolymerDissolvesEvent",
            Command::SetActivePolymerLimit { .. } => "SetActivePolymerLimit",
            Command::CancelActivePolymerLimit { .. } => "CancelActivePolymerLimit",
            Command::SetAtpHydrolysisProbability { .. } => "SetATPHydrolysisProbability",
            Command::SetAdpReleasePiProbability { .. } => "SetADPReleasePiProbability",
            Command::SetAdpPhosphorylationProbability { .. } => "SetADPPhosphorylationProbability",
            Command::SetHeadAdpMultiplier { .. } => "SetHeadADPMultiplier",
            Command::SetHeadAdpPiMultiplier { .. } => "SetHeadADPPiMultiplier",
            Command::SetTailAdpMultiplier { .. } => "SetTailADPMultiplier",
            Command::SetEventExecutionPeriod { .. } => "SetEventExecutionPeriod",
            Command::SetEventProbability { .. } => "SetEventProbability",
            Command::SetEventActive { .. } => "SetEventActive",
            Command::SetNetworkActive { .. } => "SetNetworkActive",
            Command::ToggleCumulativeEventStatistics { .. } => "ToggleCumulativeEventStatistics",
            Command::BinEventSuccessIntervals { .. } => "BinEventSuccessIntervals",
        }
    }

    /// Name of the network the command targets
    pub fn network(&self) -> &str {
        match self {
            Command::CreateActiveNetwork { acn, .. }
            | Command::SetFixedHeadOffRate { acn, .. }
            | Command::SetFixedTailOffRate { acn, .. }
            | Command::SetProximityOnSeparation { acn, .. }
            | Command::SetProximityOffSeparation { acn, .. }
            | Command::SetBondBindsForwardConeToPolymerHeadEvent { acn, .. }
            | Command::SetBondBindsForwardConeToPolymerTailEvent { acn, .. }
            | Command::SetBondUnbindsFromPolymerHeadEvent { acn, .. }
            | Command::SetBondUnbindsFromPolymerTailEvent { acn, .. }
            | Command::SetPolymerFormsEvent { acn, .. }
            | Command::SetPolymerDissolvesEvent { acn, .. }
            | Command::SetActivePolymerLimit { acn, .. }
            | Command::CancelActivePolymerLimit { acn }
            | Command::SetAtpHydrolysisProbability { acn, .. }
            | Command::SetAdpReleasePiProbability { acn, .. }
            | Command::SetAdpPhosphorylationProbability { acn, .. }
            | Command::SetHeadAdpMultiplier { acn, .. }
            | Command::SetHeadAdpPiMultiplier { acn, .. }
            | Command::SetTailAdpMultiplier { acn, .. }
            | Command::SetEventExecutionPeriod { acn, .. }
            | Command::SetEventProbability { acn, .. }
            | Command::SetEventActive { acn, .. }
            | Command::SetNetworkActive { acn, .. }
            | Command::ToggleCumulativeEventStatistics { acn, .. }
            | Command::BinEventSuccessIntervals { acn, .. } => acn,
        }
    }

    /// Check every parameter range that does not need engine state.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Command::CreateActiveNetwork { .. }
            | Command::CancelActivePolymerLimit { .. }
            | Command::SetEventActive { .. }
            | Command::SetNetworkActive { .. }
            | Command::ToggleCumulativeEventStatistics { .. } => Ok(()),

            Command::SetFixedHeadOffRate { rate, .. }
            | Command::SetFixedTailOffRate { rate, .. }
            | Command::SetAtpHydrolysisProbability { rate, .. }
            | Command::SetAdpReleasePiProbability { rate, .. }
            | Command::SetAdpPhosphorylationProbability { rate, .. } => {
                ConfigError::check_probability("rate", *rate).map(|_| ())
            }

            Command::SetProximityOnSeparation {
                min_separation,
                separation,
                ..
            } => ProximityShell::new(*min_separation, *separation).map(|_| ()),

            Command::SetProximityOffSeparation { separation, .. } => {
                ConfigError::check_non_negative("separation", *separation).map(|_| ())
            }

            Command::SetBondBindsForwardConeToPolymerHeadEvent {
                duration,
                cone,
                spring,
                length,
                ..
            }
            | Command::SetBondBindsForwardConeToPolymerTailEvent {
                duration,
                cone,
                spring,
                length,
                ..
            } => {
                checked_duration(*duration)?;
                cone.validate()?;
                Hookean::new(*spring, *length).map(|_| ())
            }

            Command::SetBondUnbindsFromPolymerHeadEvent {
                duration, spring, length, ..
            }
            | Command::SetBondUnbindsFromPolymerTailEvent {
                duration, spring, length, ..
            } => {
                checked_duration(*duration)?;
                Hookean::new(*spring, *length).map(|_| ())
            }

            Command::SetPolymerFormsEvent {
                duration,
                min_range,
                range,
                spring,
                length,
                ..
            } => {
                checked_duration(*duration)?;
                ProximityShell::new(*min_range, *range)?;
                Hookean::new(*spring, *length).map(|_| ())
            }

            Command::SetPolymerDissolvesEvent {
                duration,
                range,
                spring,
                length,
                ..
            } => {
                checked_duration(*duration)?;
                ConfigError::check_non_negative("range", *range)?;
                Hookean::new(*spring, *length).map(|_| ())
            }

            Command::SetActivePolymerLimit { max, .. } => {
                if *max == 0 {
                    Err(ConfigError::ZeroPolymerLimit)
                } else {
                    Ok(())
                }
            }

            Command::SetHeadAdpMultiplier { multiplier, .. }
            | Command::SetHeadAdpPiMultiplier { multiplier, .. }
            | Command::SetTailAdpMultiplier { multiplier, .. } => {
                ConfigError::check_non_negative("multiplier", *multiplier).map(|_| ())
            }

            Command::SetEventExecutionPeriod { period, .. } => checked_period(*period).map(|_| ()),

            Command::SetEventProbability {
                event, probability, ..
            } => {
                if !event.accepts_probability() {
                    return Err(ConfigError::Unsupported {
                        event: *event,
                        what: "a base probability",
                    });
                }
                ConfigError::check_probability("probability", *probability).map(|_| ())
            }

            Command::BinEventSuccessIntervals {
                bin_total,
                bin_width,
                sample_periods,
                ..
            } => {
                Binning::from_pair(*bin_total, *bin_width)?;
                if *sample_periods == 0 {
                    return Err(ConfigError::ZeroSamplePeriods);
                }
                Ok(())
            }
        }
    }
}
