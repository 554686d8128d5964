//! Contract with the external particle store and domain decomposition.
//!
//! Active bonds never hold references into the store; they keep
//! [`MonomerId`] values and look positions up on demand. Monomers owned by
//! a neighbouring domain are read-only handles.

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Identifier of a monomer in the external particle store
pub type MonomerId = u64;

/// Identifier of a spatial domain
pub type DomainId = u32;

/// Monomer id together with the domain that owns its authoritative copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonomerHandle {
    pub id: MonomerId,
    pub domain: DomainId,
}

/// Read access to the monomers visible to this domain.
///
/// Lists must be returned in ascending id order so that candidate
/// enumeration, and therefore random-stream consumption, is reproducible.
pub trait MonomerStore {
    /// Whether `name` is a monomer type known to the polymer vocabulary
    fn has_monomer_type(&self, name: &str) -> bool;

    /// Ids of all visible monomers of the given type, ascending
    fn monomers_of_type(&self, name: &str) -> Vec<MonomerId>;

    /// Current position of a monomer, `None` if it is not visible
    fn position(&self, id: MonomerId) -> Option<DVec3>;

    /// Visible monomers of type `name` within `radius` of `id`, ascending, excluding `id`
    fn neighbours(&self, id: MonomerId, name: &str, radius: f64) -> Vec<MonomerId>;

    /// Owning domain of a monomer
    fn owner(&self, id: MonomerId) -> Option<DomainId>;

    fn handle(&self, id: MonomerId) -> Option<MonomerHandle> {
        self.owner(id).map(|domain| MonomerHandle { id, domain })
    }
}

/// Arbitration of pairs that straddle a domain boundary.
///
/// Exactly one domain must answer `true` for any pair so that a bond is
/// formed or dissociated once.
pub trait DomainAuthority {
    fn is_authority(&self, a: MonomerHandle, b: MonomerHandle) -> bool;
}

/// Serial run: this domain decides every pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleDomain;

impl DomainAuthority for SingleDomain {
    fn is_authority(&self, _a: MonomerHandle, _b: MonomerHandle) -> bool {
        true
    }
}

/// The domain owning the lower-id monomer of the pair decides.
#[derive(Debug, Clone, Copy)]
pub struct LowestOwnerWins {
    /// Domain this engine runs in
    pub local: DomainId,
}

impl DomainAuthority for LowestOwnerWins {
    fn is_authority(&self, a: MonomerHandle, b: MonomerHandle) -> bool {
        let decider = if a.id <= b.id { a.domain } else { b.domain };
        decider == self.local
    }
}
