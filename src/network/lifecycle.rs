//! Forming bonds waiting for their transition to Bound.
//!
//! A capture holds a forming bond and the place it will attach. Each time
//! the owning event runs, the capture draws once; it binds on success and
//! expires once its duration budget is exhausted. A capture whose budget
//! ended before the current step expires without a draw.

use serde::{Deserialize, Serialize};

use super::bond::ActiveBond;
use super::polymer::PolymerId;
use crate::events::{EventId, PolymerEnd};
use crate::kinetics::{Firing, TransitionEngine};
use crate::particles::MonomerId;

/// Where a forming bond attaches once bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureTarget {
    /// Nucleates a new polymer
    NewPolymer,
    /// Extends `polymer` at `end`, whose end monomer was `anchor` at capture time
    Extend {
        polymer: PolymerId,
        end: PolymerEnd,
        anchor: MonomerId,
    },
}

/// Outcome of one evaluation of a pending capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureDecision {
    /// Forming → Bound
    Bind,
    /// Still forming
    Wait,
    /// Budget exhausted, Forming → Unbound
    Expire,
    /// Anchor no longer valid, Forming → Unbound without a draw
    Abandon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingCapture {
    /// Event that created the capture and drives its transition
    pub event: EventId,
    pub bond: ActiveBond,
    pub target: CaptureTarget,
}

impl PendingCapture {
    pub fn new(event: EventId, bond: ActiveBond, target: CaptureTarget) -> Self {
        Self { event, bond, target }
    }

    /// Monomers this capture books; the anchor of an extension is already in its polymer
    pub fn booked_monomers(&self) -> Vec<MonomerId> {
        match self.target {
            CaptureTarget::NewPolymer => vec![self.bond.head(), self.bond.tail()],
            CaptureTarget::Extend { end, .. } => match end {
                PolymerEnd::Head => vec![self.bond.head()],
                PolymerEnd::Tail => vec![self.bond.tail()],
            },
        }
    }

    /// Draw once unless the anchor is gone or the budget already ran out.
    pub fn decide(&self, step: u64, anchor_valid: bool, engine: &mut TransitionEngine, firing: Firing) -> CaptureDecision {
        if !anchor_valid {
            return CaptureDecision::Abandon;
        }
        if self.bond.budget_overrun(step) {
            return CaptureDecision::Expire;
        }
        if engine.fire(firing, 1.0) {
            CaptureDecision::Bind
        } else if self.bond.budget_exhausted(step) {
            CaptureDecision::Expire
        } else {
            CaptureDecision::Wait
        }
    }
}

/// Successes and failures of one event execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub successes: u64,
    pub failures: u64,
}

impl Tally {
    pub fn success(&mut self) {
        self.successes += 1;
    }

    pub fn failure(&mut self) {
        self.failures += 1;
    }

    pub fn attempts(&self) -> u64 {
        self.successes + self.failures
    }
}
