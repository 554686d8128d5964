//! Error types for active-network kinetics.
//!
//! Three classes exist:
//! - [`ConfigError`]: a command was rejected at validation time
//! - [`InvariantViolation`]: internal bookkeeping is broken; the owning network halts
//! - [`KineticsError`]: the union surfaced at the crate's fallible boundaries
//!
//! Runtime skips (no candidates, population ceiling reached) are not errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::EventType;

/// A command parameter is out of range or inconsistent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Probability or rate outside [0, 1]
    #[error("{field} must lie in [0, 1], got {value}")]
    ProbabilityOutOfRange { field: &'static str, value: f64 },

    /// Negative (or non-finite) value where a non-negative one is required
    #[error("{field} must be a finite value >= 0, got {value}")]
    Negative { field: &'static str, value: f64 },

    /// Proximity shell with inner radius above outer radius
    #[error("inner radius {inner} exceeds outer radius {outer}")]
    InvertedShell { inner: f64, outer: f64 },

    /// Cone half-angle outside [0, 90] degrees
    #[error("cone half-angle must lie in [0, 90] degrees, got {0}")]
    HalfAngleOutOfRange(f64),

    /// Cone polar tilt outside [0, 180] degrees
    #[error("cone polar angle must lie in [0, 180] degrees, got {0}")]
    PolarAngleOutOfRange(f64),

    /// Cone azimuth outside [0, 360] degrees
    #[error("cone azimuth must lie in [0, 360] degrees, got {0}")]
    AzimuthOutOfRange(f64),

    /// Cone axis of zero length
    #[error("cone axis must be non-zero")]
    ZeroConeAxis,

    /// Execution period below one step
    #[error("execution period must be >= 1, got {0}")]
    InvalidPeriod(i64),

    /// Population ceiling of zero
    #[error("active polymer limit must be > 0")]
    ZeroPolymerLimit,

    /// Ceiling set again after it was cancelled for the run
    #[error("active polymer limit for '{0}' was cancelled and cannot be restored")]
    LimitCancelled(String),

    /// Both or neither of bin total / bin width given, or bin total too large
    #[error("exactly one of bin total (1..=100000) and bin width (> 0) must be given, got total {total} and width {width}")]
    InvalidBinning { total: u32, width: f64 },

    /// Histogram with zero sampling periods
    #[error("sample period count must be >= 1")]
    ZeroSamplePeriods,

    /// Network name not declared
    #[error("unknown active cell network '{0}'")]
    UnknownNetwork(String),

    /// Network declared twice
    #[error("active cell network '{0}' already exists")]
    DuplicateNetwork(String),

    /// Monomer name absent from the store vocabulary
    #[error("monomer type '{0}' not found in the polymer vocabulary")]
    UnknownMonomer(String),

    /// Event type not configured on the network
    #[error("event {event:?} is not configured on network '{network}'")]
    UnknownEvent { network: String, event: EventType },

    /// Command targets an event type that does not accept it
    #[error("event {event:?} does not support {what}")]
    Unsupported { event: EventType, what: &'static str },
}

/// Internal bookkeeping defect detected while running a network.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum InvariantViolation {
    /// Consecutive bonds do not share a monomer
    #[error("polymer {polymer} chain broken at bond {index}: tail {tail} != next head {next_head}")]
    BrokenChain {
        polymer: u64,
        index: usize,
        tail: u64,
        next_head: u64,
    },

    /// Live polymer with no bonds
    #[error("polymer {0} has no bonds")]
    EmptyPolymer(u64),

    /// Bond stored in a polymer but not in the bound state
    #[error("bond {bond} in polymer {polymer} is not bound")]
    UnboundMember { polymer: u64, bond: u64 },

    /// Population counter disagrees with the live polymer list
    #[error("network '{network}' counts {counted} live polymers but holds {held}")]
    PopulationMismatch {
        network: String,
        counted: usize,
        held: usize,
    },
}

/// Errors surfaced to the enclosing simulation loop.
#[derive(Debug, Error)]
pub enum KineticsError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("network '{network}' halted: {violation}")]
    Invariant {
        network: String,
        violation: InvariantViolation,
    },

    #[error("checkpoint I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("checkpoint serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unsupported checkpoint version {0}")]
    CheckpointVersion(u32),
}

impl ConfigError {
    /// Rejects values outside [0, 1].
    pub fn check_probability(field: &'static str, value: f64) -> Result<f64, ConfigError> {
        if (0.0..=1.0).contains(&value) {
            Ok(value)
        } else {
            Err(ConfigError::ProbabilityOutOfRange { field, value })
        }
    }

    /// Rejects negative or non-finite values.
    pub fn check_non_negative(field: &'static str, value: f64) -> Result<f64, ConfigError> {
        if value.is_finite() && value >= 0.0 {
            Ok(value)
        } else {
            Err(ConfigError::Negative { field, value })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_bounds() {
        assert!(ConfigError::check_probability("rate", 0.0).is_ok());
        assert!(ConfigError::check_probability("rate", 1.0).is_ok());
        assert!(ConfigError::check_probability("rate", -0.1).is_err());
        assert!(ConfigError::check_probability("rate", 1.01).is_err());
        assert!(ConfigError::check_probability("rate", f64::NAN).is_err());
    }

    #[test]
    fn test_non_negative() {
        assert!(ConfigError::check_non_negative("spring", 0.0).is_ok());
        assert!(ConfigError::check_non_negative("spring", -1e-9).is_err());
        assert!(ConfigError::check_non_negative("spring", f64::INFINITY).is_err());
    }
}
