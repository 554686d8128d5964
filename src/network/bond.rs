//! A transient active bond between two monomers.
//!
//! State machine:
//!
//! ```text
//! Unbound --capture--> Forming --fire--> Bound --off event--> Dissociating --> Unbound
//!                         |
//!                         +--budget exhausted--> Unbound
//! ```
//!
//! The Hookean parameters exist only while the bond is bound.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::events::Hookean;
use crate::kinetics::NucleotideState;
use crate::particles::{MonomerId, MonomerStore};

/// Identifier of an active bond within its network
pub type BondId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BondState {
    Unbound,
    Forming,
    Bound,
    Dissociating,
}

/// Bond linking a head monomer to a tail monomer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveBond {
    id: BondId,
    head: MonomerId,
    tail: MonomerId,
    state: BondState,
    /// Bound nucleotide
    pub nucleotide: NucleotideState,
    spring: Option<Hookean>,
    /// Step the capture started
    created_step: u64,
    /// Step the bond became bound
    bound_step: Option<u64>,
    /// Steps the forming bond may wait for its transition
    duration_budget: u64,
}

impl ActiveBond {
    /// A bond that has just been captured and is waiting to bind
    pub fn forming(id: BondId, head: MonomerId, tail: MonomerId, step: u64, duration_budget: u64) -> Self {
        Self {
            id,
            head,
            tail,
            state: BondState::Forming,
            nucleotide: NucleotideState::Atp,
            spring: None,
            created_step: step,
            bound_step: None,
            duration_budget,
        }
    }

    pub fn id(&self) -> BondId {
        self.id
    }

    pub fn head(&self) -> MonomerId {
        self.head
    }

    pub fn tail(&self) -> MonomerId {
        self.tail
    }

    pub fn state(&self) -> BondState {
        self.state
    }

    pub fn created_step(&self) -> u64 {
        self.created_step
    }

    pub fn bound_step(&self) -> Option<u64> {
        self.bound_step
    }

    pub fn duration_budget(&self) -> u64 {
        self.duration_budget
    }

    /// Steps left before a forming bond expires
    pub fn remaining_budget(&self, step: u64) -> u64 {
        (self.created_step + self.duration_budget).saturating_sub(step)
    }

    /// A failed forming bond at `step` has run out of budget
    pub fn budget_exhausted(&self, step: u64) -> bool {
        step >= self.created_step + self.duration_budget
    }

    /// The budget ended before `step`, so no draw is owed
    pub fn budget_overrun(&self, step: u64) -> bool {
        step > self.created_step + self.duration_budget
    }

    /// Steps spent bound, 0 if not bound
    pub fn bound_age(&self, step: u64) -> u64 {
        self.bound_step.map_or(0, |s| step.saturating_sub(s))
    }

    pub fn contains(&self, monomer: MonomerId) -> bool {
        self.head == monomer || self.tail == monomer
    }

    /// Spring constant while bound, otherwise 0
    pub fn spring_constant(&self) -> f64 {
        self.spring.map_or(0.0, |s| s.spring_constant)
    }

    /// Unstretched length while bound, otherwise 0
    pub fn unstretched_length(&self) -> f64 {
        self.spring.map_or(0.0, |s| s.unstretched_length)
    }

    pub fn spring(&self) -> Option<Hookean> {
        self.spring
    }

    /// Forming → Bound; installs the binding event's spring
    pub fn bind(&mut self, step: u64, spring: Hookean) {
        debug_assert_eq!(self.state, BondState::Forming);
        self.state = BondState::Bound;
        self.bound_step = Some(step);
        self.spring = Some(spring);
    }

    /// Forming → Unbound after the budget ran out or the anchor vanished
    pub fn abandon(&mut self) {
        debug_assert_eq!(self.state, BondState::Forming);
        self.state = BondState::Unbound;
    }

    /// Bound → Dissociating → Unbound; the spring is discarded.
    pub fn dissociate(&mut self) -> Option<Hookean> {
        debug_assert_eq!(self.state, BondState::Bound);
        self.state = BondState::Dissociating;
        let spring = self.spring.take();
        self.bound_step = None;
        self.state = BondState::Unbound;
        spring
    }

    /// Vector from tail to head, `None` if either monomer is not visible
    pub fn vector(&self, store: &dyn MonomerStore) -> Option<DVec3> {
        Some(store.position(self.head)? - store.position(self.tail)?)
    }

    pub fn length(&self, store: &dyn MonomerStore) -> Option<f64> {
        self.vector(store).map(|v| v.length())
    }

    #[cfg(test)]
    pub(crate) fn bound_for_test(id: BondId, head: MonomerId, tail: MonomerId) -> Self {
        let mut bond = Self::forming(id, head, tail, 0, 0);
        bond.bind(0, Hookean::new(1.0, 0.5).unwrap());
        bond
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particles::MonomerPool;

    #[test]
    fn test_spring_only_while_bound() {
        let mut bond = ActiveBond::forming(0, 1, 2, 5, 10);
        assert_eq!(bond.spring_constant(), 0.0);

        bond.bind(7, Hookean::new(128.0, 0.5).unwrap());
        assert_eq!(bond.state(), BondState::Bound);
        assert_eq!(bond.spring_constant(), 128.0);
        assert_eq!(bond.unstretched_length(), 0.5);
        assert_eq!(bond.bound_age(10), 3);

        let spring = bond.dissociate().unwrap();
        assert_eq!(spring.spring_constant, 128.0);
        assert_eq!(bond.state(), BondState::Unbound);
        assert_eq!(bond.spring_constant(), 0.0);
        assert_eq!(bond.bound_age(20), 0);
    }

    #[test]
    fn test_budget() {
        let bond = ActiveBond::forming(0, 1, 2, 0, 10);
        assert_eq!(bond.remaining_budget(4), 6);
        assert!(!bond.budget_exhausted(9));
        assert!(bond.budget_exhausted(10));
        assert_eq!(bond.remaining_budget(12), 0);
        assert!(!bond.budget_overrun(10));
        assert!(bond.budget_overrun(11));
    }

    #[test]
    fn test_length_from_store() {
        let mut pool = MonomerPool::new();
        let a = pool.add("actin", DVec3::ZERO);
        let b = pool.add("actin", DVec3::new(0.0, 3.0, 4.0));
        let bond = ActiveBond::forming(0, b, a, 0, 0);
        assert_eq!(bond.length(&pool), Some(5.0));
        assert!(ActiveBond::forming(1, a, 99, 0, 0).length(&pool).is_none());
    }
}
