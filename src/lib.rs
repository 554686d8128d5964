//! Active Cell Network - stochastic kinetics of transient active bonds
//!
//! This library drives how motor- or filament-like bond structures form,
//! grow, mature and dissociate among the monomers of a mesoscale particle
//! simulation, one domain at a time.

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod export;
pub mod geometry;
pub mod kinetics;
pub mod network;
pub mod particles;
pub mod stats;

pub use config::{Command, RunParameters};
pub use engine::{KineticsEngine, NetworkSample, TickReport};
pub use error::{ConfigError, InvariantViolation, KineticsError};
pub use events::{EventType, PolymerEnd};
pub use export::{ChangeLog, ChangeRecord, Checkpoint, OutputMode};
pub use geometry::{ConeSpec, ForwardCone, ProximityShell};
pub use kinetics::{Firing, NucleotideState, TransitionEngine};
pub use network::{ActiveBond, ActiveCellNetwork, ActivePolymer, SpringTerm};
pub use particles::{DomainAuthority, MonomerId, MonomerPool, MonomerStore};
