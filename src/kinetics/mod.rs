//! Stochastic transition decisions and nucleotide-state bookkeeping.

mod transition;

pub use transition::{BondRole, Firing, NucleotideState, RateMultipliers, TransitionEngine};
