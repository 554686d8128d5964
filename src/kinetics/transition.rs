//! Transition probability engine.
//!
//! Every decision consumes exactly one uniform draw `u ∈ [0, 1)` and fires
//! iff `u < min(1, p * m)`, where `p` is the base probability and `m` the
//! context multiplier. The stream is a seeded ChaCha8 generator whose full
//! state (including word position) is serialized into checkpoints, so a
//! restored run continues bit-for-bit.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How an event turns eligibility into a transition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Firing {
    /// Probability applied directly each step (multiplier fixed at 1)
    FixedRate(f64),
    /// Base probability scaled by the bond's context multiplier
    Probabilistic(f64),
}

impl Firing {
    /// Always fires when geometrically eligible
    pub const ALWAYS: Firing = Firing::FixedRate(1.0);
    /// Never fires
    pub const NEVER: Firing = Firing::FixedRate(0.0);

    pub fn probability(&self) -> f64 {
        match self {
            Firing::FixedRate(p) | Firing::Probabilistic(p) => *p,
        }
    }

    /// Same mode, new base probability
    pub fn with_probability(&self, p: f64) -> Result<Firing, ConfigError> {
        let p = ConfigError::check_probability("probability", p)?;
        Ok(match self {
            Firing::FixedRate(_) => Firing::FixedRate(p),
            Firing::Probabilistic(_) => Firing::Probabilistic(p),
        })
    }

    /// Multiplier actually applied for a given context multiplier
    pub fn effective_multiplier(&self, context: f64) -> f64 {
        match self {
            Firing::FixedRate(_) => 1.0,
            Firing::Probabilistic(_) => context,
        }
    }
}

/// Nucleotide bound to an active bond
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NucleotideState {
    #[default]
    Atp,
    AdpPi,
    Adp,
}

impl NucleotideState {
    pub fn label(&self) -> &'static str {
        match self {
            NucleotideState::Atp => "ATP",
            NucleotideState::AdpPi => "ADP-Pi",
            NucleotideState::Adp => "ADP",
        }
    }
}

/// Position of a bond within its polymer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BondRole {
    Head,
    Interior,
    Tail,
}

/// Context-dependent rate multipliers, keyed on bond role and nucleotide state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateMultipliers {
    /// Head bond carrying ADP
    pub head_adp: f64,
    /// Head bond carrying ADP-Pi
    pub head_adp_pi: f64,
    /// Tail bond carrying ADP
    pub tail_adp: f64,
}

impl Default for RateMultipliers {
    fn default() -> Self {
        Self {
            head_adp: 1.0,
            head_adp_pi: 1.0,
            tail_adp: 1.0,
        }
    }
}

impl RateMultipliers {
    /// Multiplier for a bond in `role` currently holding `state`
    pub fn for_bond(&self, role: BondRole, state: NucleotideState) -> f64 {
        match (role, state) {
            (BondRole::Head, NucleotideState::Adp) => self.head_adp,
            (BondRole::Head, NucleotideState::AdpPi) => self.head_adp_pi,
            (BondRole::Tail, NucleotideState::Adp) => self.tail_adp,
            _ => 1.0,
        }
    }
}

/// Deterministic fire/no-fire decisions from a single random stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEngine {
    stream: ChaCha8Rng,
    seed: u64,
    draws: u64,
}

impl TransitionEngine {
    pub fn new(seed: u64) -> Self {
        Self {
            stream: ChaCha8Rng::seed_from_u64(seed),
            seed,
            draws: 0,
        }
    }

    /// Draw once; fire iff `u < min(1, base * multiplier)`.
    pub fn try_fire(&mut self, base: f64, multiplier: f64) -> bool {
        let threshold = (base * multiplier).min(1.0);
        let u = self.uniform();
        u < threshold
    }

    /// Draw once for an event's firing mode and context multiplier
    pub fn fire(&mut self, firing: Firing, context: f64) -> bool {
        self.try_fire(firing.probability(), firing.effective_multiplier(context))
    }

    /// Uniform value in [0, 1)
    pub fn uniform(&mut self) -> f64 {
        self.draws += 1;
        self.stream.gen::<f64>()
    }

    /// Number of draws consumed since the stream was seeded
    pub fn draws(&self) -> u64 {
        self.draws
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Word position of the underlying ChaCha stream
    pub fn stream_position(&self) -> u128 {
        self.stream.get_word_pos()
    }
}
