//! Kinetic events and their scheduling.
//!
//! An [`Event`] is one configured rule of a network (nucleation, cone
//! growth, end release, dissolution, nucleotide exchange). The
//! [`EventScheduler`] fixes their execution order.

mod kinds;
mod scheduler;

pub use kinds::{
    checked_duration, checked_period, ConeCapture, Dissolution, EndRelease, EventKind, EventType, Hookean,
    Nucleation, NucleotideChange, PolymerEnd,
};
pub use scheduler::{Event, EventId, EventScheduler, ScheduledEvent};
