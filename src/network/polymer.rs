//! Ordered chain of bound active bonds.
//!
//! Bonds are stored from the polymer head to the polymer tail, with
//! `bonds[i].tail == bonds[i + 1].head`. The head monomer is the head of the
//! first bond and the tail monomer is the tail of the last bond.

use std::collections::VecDeque;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::bond::{ActiveBond, BondState};
use crate::error::InvariantViolation;
use crate::events::PolymerEnd;
use crate::kinetics::BondRole;
use crate::particles::{MonomerId, MonomerStore};

/// Identifier of an active polymer within its network
pub type PolymerId = u64;

/// Role of bond `index` in a chain of `len` bonds
pub fn role_at(index: usize, len: usize) -> BondRole {
    if index == 0 {
        BondRole::Head
    } else if index + 1 == len {
        BondRole::Tail
    } else {
        BondRole::Interior
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivePolymer {
    id: PolymerId,
    bonds: VecDeque<ActiveBond>,
    created_step: u64,
}

impl ActivePolymer {
    /// Polymer nucleated from a single bound bond
    pub fn nucleate(id: PolymerId, bond: ActiveBond, step: u64) -> Self {
        let mut bonds = VecDeque::with_capacity(4);
        bonds.push_back(bond);
        Self {
            id,
            bonds,
            created_step: step,
        }
    }

    /// Polymer from an explicit bond list, validated
    pub fn from_bonds(id: PolymerId, bonds: Vec<ActiveBond>, step: u64) -> Result<Self, InvariantViolation> {
        let polymer = Self {
            id,
            bonds: bonds.into(),
            created_step: step,
        };
        polymer.validate()?;
        Ok(polymer)
    }

    pub fn id(&self) -> PolymerId {
        self.id
    }

    pub fn created_step(&self) -> u64 {
        self.created_step
    }

    pub fn age(&self, step: u64) -> u64 {
        step.saturating_sub(self.created_step)
    }

    /// Total bond count
    pub fn len(&self) -> usize {
        self.bonds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bonds.is_empty()
    }

    pub fn bonds(&self) -> impl Iterator<Item = &ActiveBond> {
        self.bonds.iter()
    }

    pub(crate) fn bonds_mut(&mut self) -> impl Iterator<Item = &mut ActiveBond> {
        self.bonds.iter_mut()
    }

    /// Monomers in spatial order, head first
    pub fn monomers(&self) -> Vec<MonomerId> {
        let mut out = Vec::with_capacity(self.bonds.len() + 1);
        if let Some(first) = self.bonds.front() {
            out.push(first.head());
        }
        out.extend(self.bonds.iter().map(|b| b.tail()));
        out
    }

    pub fn end_bond(&self, end: PolymerEnd) -> Option<&ActiveBond> {
        match end {
            PolymerEnd::Head => self.bonds.front(),
            PolymerEnd::Tail => self.bonds.back(),
        }
    }

    /// Monomer at the given end
    pub fn end_monomer(&self, end: PolymerEnd) -> Option<MonomerId> {
        match end {
            PolymerEnd::Head => self.bonds.front().map(|b| b.head()),
            PolymerEnd::Tail => self.bonds.back().map(|b| b.tail()),
        }
    }

    /// Outward direction of the end bond (towards and beyond the end monomer)
    pub fn end_direction(&self, end: PolymerEnd, store: &dyn MonomerStore) -> Option<DVec3> {
        let bond = self.end_bond(end)?;
        let v = bond.vector(store)?;
        Some(match end {
            PolymerEnd::Head => v,
            PolymerEnd::Tail => -v,
        })
    }

    /// Role of the bond at `index`; a lone bond counts as the head
    pub fn role_of(&self, index: usize) -> BondRole {
        role_at(index, self.bonds.len())
    }

    /// Attach a bound bond at `end`.
    ///
    /// At the head the new bond's tail must be the current head monomer; at
    /// the tail its head must be the current tail monomer.
    pub fn grow(&mut self, end: PolymerEnd, bond: ActiveBond) -> Result<(), InvariantViolation> {
        let anchor = self.end_monomer(end).ok_or(InvariantViolation::EmptyPolymer(self.id))?;
        match end {
            PolymerEnd::Head => {
                if bond.tail() != anchor {
                    return Err(InvariantViolation::BrokenChain {
                        polymer: self.id,
                        index: 0,
                        tail: bond.tail(),
                        next_head: anchor,
                    });
                }
                self.bonds.push_front(bond);
            }
            PolymerEnd::Tail => {
                if bond.head() != anchor {
                    return Err(InvariantViolation::BrokenChain {
                        polymer: self.id,
                        index: self.bonds.len() - 1,
                        tail: anchor,
                        next_head: bond.head(),
                    });
                }
                self.bonds.push_back(bond);
            }
        }
        Ok(())
    }

    /// Detach the bond at `end`
    pub fn release(&mut self, end: PolymerEnd) -> Option<ActiveBond> {
        match end {
            PolymerEnd::Head => self.bonds.pop_front(),
            PolymerEnd::Tail => self.bonds.pop_back(),
        }
    }

    /// Detach every bond, head first
    pub fn drain(&mut self) -> Vec<ActiveBond> {
        self.bonds.drain(..).collect()
    }

    /// Check chain continuity, non-emptiness and that every bond is bound
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        if self.bonds.is_empty() {
            return Err(InvariantViolation::EmptyPolymer(self.id));
        }
        for bond in &self.bonds {
            if bond.state() != BondState::Bound {
                return Err(InvariantViolation::UnboundMember {
                    polymer: self.id,
                    bond: bond.id(),
                });
            }
        }
        for (index, (a, b)) in self.bonds.iter().zip(self.bonds.iter().skip(1)).enumerate() {
            if a.tail() != b.head() {
                return Err(InvariantViolation::BrokenChain {
                    polymer: self.id,
                    index,
                    tail: a.tail(),
                    next_head: b.head(),
                });
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn push_unchecked(&mut self, bond: ActiveBond) {
        self.bonds.push_back(bond);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particles::MonomerPool;

    fn chain() -> ActivePolymer {
        // monomers 1 - 2 - 3, head is 1
        ActivePolymer::from_bonds(
            0,
            vec![ActiveBond::bound_for_test(10, 1, 2), ActiveBond::bound_for_test(11, 2, 3)],
            0,
        )
        .unwrap()
    }

    #[test]
    fn test_ends_and_monomers() {
        let p = chain();
        assert_eq!(p.end_monomer(PolymerEnd::Head), Some(1));
        assert_eq!(p.end_monomer(PolymerEnd::Tail), Some(3));
        assert_eq!(p.monomers(), vec![1, 2, 3]);
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn test_grow_both_ends() {
        let mut p = chain();
        p.grow(PolymerEnd::Head, ActiveBond::bound_for_test(12, 0, 1)).unwrap();
        p.grow(PolymerEnd::Tail, ActiveBond::bound_for_test(13, 3, 4)).unwrap();
        assert_eq!(p.monomers(), vec![0, 1, 2, 3, 4]);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_grow_rejects_detached_bond() {
        let mut p = chain();
        let err = p.grow(PolymerEnd::Tail, ActiveBond::bound_for_test(12, 7, 8)).unwrap_err();
        assert!(matches!(err, InvariantViolation::BrokenChain { .. }));
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn test_broken_chain_detected() {
        let result = ActivePolymer::from_bonds(
            5,
            vec![ActiveBond::bound_for_test(0, 1, 2), ActiveBond::bound_for_test(1, 3, 4)],
            0,
        );
        assert_eq!(
            result.unwrap_err(),
            InvariantViolation::BrokenChain {
                polymer: 5,
                index: 0,
                tail: 2,
                next_head: 3
            }
        );
    }

    #[test]
    fn test_empty_and_unbound_detected() {
        assert_eq!(
            ActivePolymer::from_bonds(2, Vec::new(), 0).unwrap_err(),
            InvariantViolation::EmptyPolymer(2)
        );
        let forming = ActiveBond::forming(9, 1, 2, 0, 5);
        assert!(matches!(
            ActivePolymer::from_bonds(3, vec![forming], 0),
            Err(InvariantViolation::UnboundMember { polymer: 3, bond: 9 })
        ));
    }

    #[test]
    fn test_roles() {
        let mut p = chain();
        p.grow(PolymerEnd::Tail, ActiveBond::bound_for_test(12, 3, 4)).unwrap();
        assert_eq!(p.role_of(0), BondRole::Head);
        assert_eq!(p.role_of(1), BondRole::Interior);
        assert_eq!(p.role_of(2), BondRole::Tail);

        let lone = ActivePolymer::nucleate(1, ActiveBond::bound_for_test(0, 5, 6), 0);
        assert_eq!(lone.role_of(0), BondRole::Head);
    }

    #[test]
    fn test_end_direction_points_outward() {
        let mut pool = MonomerPool::new();
        let m0 = pool.add("actin", DVec3::new(0.0, 0.0, 1.0));
        let m1 = pool.add("actin", DVec3::ZERO);
        let m2 = pool.add("actin", DVec3::new(0.0, 0.0, -1.0));
        let p = ActivePolymer::from_bonds(
            0,
            vec![ActiveBond::bound_for_test(0, m0, m1), ActiveBond::bound_for_test(1, m1, m2)],
            0,
        )
        .unwrap();
        assert_eq!(p.end_direction(PolymerEnd::Head, &pool), Some(DVec3::Z));
        assert_eq!(p.end_direction(PolymerEnd::Tail, &pool), Some(-DVec3::Z));
    }

    #[test]
    fn test_release_ends() {
        let mut p = chain();
        let head = p.release(PolymerEnd::Head).unwrap();
        assert_eq!(head.head(), 1);
        assert_eq!(p.end_monomer(PolymerEnd::Head), Some(2));
        let tail = p.release(PolymerEnd::Tail).unwrap();
        assert_eq!(tail.tail(), 3);
        assert!(p.is_empty());
    }
}
