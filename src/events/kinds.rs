//! Kinetic rule kinds and their parameters.
//!
//! Each network carries at most one event per [`EventType`]; the
//! [`EventKind`] variant holds the parameters the handler needs.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geometry::{ConeSpec, ProximityShell};
use crate::kinetics::{Firing, NucleotideState};

/// Identity of an event within its network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventType {
    PolymerForms,
    PolymerDissolves,
    BondBindsToPolymerHead,
    BondBindsToPolymerTail,
    BondUnbindsFromPolymerHead,
    BondUnbindsFromPolymerTail,
    AtpHydrolysis,
    AdpReleasePi,
    AdpPhosphorylation,
}

impl EventType {
    pub fn name(&self) -> &'static str {
        match self {
            EventType::PolymerForms => "PolymerForms",
            EventType::PolymerDissolves => "PolymerDissolves",
            EventType::BondBindsToPolymerHead => "BondBindsForwardConeToPolymerHead",
            EventType::BondBindsToPolymerTail => "BondBindsForwardConeToPolymerTail",
            EventType::BondUnbindsFromPolymerHead => "BondUnbindsFromPolymerHead",
            EventType::BondUnbindsFromPolymerTail => "BondUnbindsFromPolymerTail",
            EventType::AtpHydrolysis => "ATPHydrolysis",
            EventType::AdpReleasePi => "ADPReleasePi",
            EventType::AdpPhosphorylation => "ADPPhosphorylation",
        }
    }

    /// Events whose base probability may be set directly
    pub fn accepts_probability(&self) -> bool {
        !matches!(
            self,
            EventType::BondUnbindsFromPolymerHead | EventType::BondUnbindsFromPolymerTail
        )
    }
}

/// End of an active polymer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolymerEnd {
    Head,
    Tail,
}

impl PolymerEnd {
    pub fn label(&self) -> &'static str {
        match self {
            PolymerEnd::Head => "head",
            PolymerEnd::Tail => "tail",
        }
    }
}

/// Transient spring given to a bond while it is bound
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hookean {
    /// Spring constant
    pub spring_constant: f64,
    /// Unstretched length
    pub unstretched_length: f64,
}

impl Hookean {
    pub fn new(spring_constant: f64, unstretched_length: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            spring_constant: ConfigError::check_non_negative("spring constant", spring_constant)?,
            unstretched_length: ConfigError::check_non_negative("unstretched length", unstretched_length)?,
        })
    }
}

/// Two free monomers inside a shell nucleate a new polymer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Nucleation {
    pub shell: ProximityShell,
    /// Steps a forming bond may wait for its transition
    pub duration: u64,
    pub spring: Hookean,
}

/// A whole polymer dissolves
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dissolution {
    /// Minimum polymer age in steps before it may dissolve
    pub duration: u64,
    /// Bond length above which dissolution is forced (0 disables)
    pub max_extension: f64,
    /// Spring reported while dissociating
    pub spring: Hookean,
}

/// A free monomer ahead of a polymer end joins it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConeCapture {
    pub end: PolymerEnd,
    pub cone: ConeSpec,
    pub duration: u64,
    pub spring: Hookean,
}

/// The end bond of a polymer is released
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EndRelease {
    pub end: PolymerEnd,
    /// Minimum bound age in steps before the end bond may release
    pub duration: u64,
    /// Spring reported while dissociating
    pub spring: Hookean,
}

/// Nucleotide exchange on bound bonds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NucleotideChange {
    pub from: NucleotideState,
    pub to: NucleotideState,
}

/// Tagged parameters of one kinetic rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    PolymerForms(Nucleation),
    PolymerDissolves(Dissolution),
    ConeCapture(ConeCapture),
    FixedOffRate(EndRelease),
    Nucleotide(NucleotideChange),
}

impl EventKind {
    pub fn event_type(&self) -> EventType {
        match self {
            EventKind::PolymerForms(_) => EventType::PolymerForms,
            EventKind::PolymerDissolves(_) => EventType::PolymerDissolves,
            EventKind::ConeCapture(c) => match c.end {
                PolymerEnd::Head => EventType::BondBindsToPolymerHead,
                PolymerEnd::Tail => EventType::BondBindsToPolymerTail,
            },
            EventKind::FixedOffRate(r) => match r.end {
                PolymerEnd::Head => EventType::BondUnbindsFromPolymerHead,
                PolymerEnd::Tail => EventType::BondUnbindsFromPolymerTail,
            },
            EventKind::Nucleotide(n) => match n.from {
                NucleotideState::Atp => EventType::AtpHydrolysis,
                NucleotideState::AdpPi => EventType::AdpReleasePi,
                NucleotideState::Adp => EventType::AdpPhosphorylation,
            },
        }
    }

    /// Firing mode a freshly configured event starts with
    pub fn default_firing(&self) -> Firing {
        match self {
            EventKind::PolymerForms(_) | EventKind::ConeCapture(_) => Firing::ALWAYS,
            EventKind::PolymerDissolves(_) | EventKind::FixedOffRate(_) => Firing::NEVER,
            EventKind::Nucleotide(_) => Firing::Probabilistic(0.0),
        }
    }

    /// Numeric parameters for change records
    pub fn parameters(&self) -> Vec<(&'static str, f64)> {
        match self {
            EventKind::PolymerForms(n) => vec![
                ("duration", n.duration as f64),
                ("min_range", n.shell.inner),
                ("range", n.shell.outer),
                ("spring", n.spring.spring_constant),
                ("length", n.spring.unstretched_length),
            ],
            EventKind::PolymerDissolves(d) => vec![
                ("duration", d.duration as f64),
                ("range", d.max_extension),
                ("spring", d.spring.spring_constant),
                ("length", d.spring.unstretched_length),
            ],
            EventKind::ConeCapture(c) => vec![
                ("duration", c.duration as f64),
                ("range", c.cone.range),
                ("half_angle_deg", c.cone.half_angle_deg),
                ("polar_angle_deg", c.cone.polar_angle_deg),
                ("azimuth_deg", c.cone.azimuth_deg),
                ("spring", c.spring.spring_constant),
                ("length", c.spring.unstretched_length),
            ],
            EventKind::FixedOffRate(r) => vec![
                ("duration", r.duration as f64),
                ("spring", r.spring.spring_constant),
                ("length", r.spring.unstretched_length),
            ],
            EventKind::Nucleotide(_) => Vec::new(),
        }
    }
}

/// Convert a signed duration from a command
pub fn checked_duration(duration: i64) -> Result<u64, ConfigError> {
    u64::try_from(duration).map_err(|_| ConfigError::Negative {
        field: "duration",
        value: duration as f64,
    })
}

/// Convert a signed execution period from a command
pub fn checked_period(period: i64) -> Result<u64, ConfigError> {
    if period >= 1 {
        Ok(period as u64)
    } else {
        Err(ConfigError::InvalidPeriod(period))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_validation() {
        assert_eq!(checked_period(0), Err(ConfigError::InvalidPeriod(0)));
        assert_eq!(checked_period(-3), Err(ConfigError::InvalidPeriod(-3)));
        assert_eq!(checked_period(1), Ok(1));
    }

    #[test]
    fn test_duration_validation() {
        assert_eq!(checked_duration(0), Ok(0));
        assert!(checked_duration(-1).is_err());
    }

    #[test]
    fn test_kind_maps_to_type() {
        let release = EventKind::FixedOffRate(EndRelease {
            end: PolymerEnd::Tail,
            duration: 0,
            spring: Hookean::new(1.0, 0.5).unwrap(),
        });
        assert_eq!(release.event_type(), EventType::BondUnbindsFromPolymerTail);
        assert!(!release.event_type().accepts_probability());

        let hydrolysis = EventKind::Nucleotide(NucleotideChange {
            from: NucleotideState::Atp,
            to: NucleotideState::AdpPi,
        });
        assert_eq!(hydrolysis.event_type(), EventType::AtpHydrolysis);
        assert_eq!(hydrolysis.default_firing(), Firing::Probabilistic(0.0));
    }

    #[test]
    fn test_negative_spring_rejected() {
        assert!(Hookean::new(-1.0, 0.5).is_err());
        assert!(Hookean::new(1.0, -0.5).is_err());
    }
}
