//! Monomer store contract and an in-memory implementation.

mod pool;
mod store;

pub use pool::{Monomer, MonomerPool};
pub use store::{
    DomainAuthority, DomainId, LowestOwnerWins, MonomerHandle, MonomerId, MonomerStore, SingleDomain,
};
