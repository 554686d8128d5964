//! In-memory monomer store.
//!
//! Stands in for the simulation's bead storage in tests and the demo
//! binary. Neighbour search is a brute-force O(n) scan per query, which is
//! fine for the system sizes used here (a cell list belongs to the real
//! particle store).

use std::collections::BTreeMap;

use glam::DVec3;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Normal, UnitSphere};
use serde::{Deserialize, Serialize};

use super::store::{DomainId, MonomerId, MonomerStore};

/// One monomer in the pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Monomer {
    /// Monomer type name
    pub kind: String,
    /// Position in DPD length units
    pub position: DVec3,
    /// Owning domain
    pub domain: DomainId,
}

/// Id-ordered monomer storage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonomerPool {
    monomers: BTreeMap<MonomerId, Monomer>,
    next_id: MonomerId,
}

impl MonomerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a monomer owned by domain 0 and return its id
    pub fn add(&mut self, kind: &str, position: DVec3) -> MonomerId {
        self.add_owned(kind, position, 0)
    }

    /// Add a monomer owned by `domain`
    pub fn add_owned(&mut self, kind: &str, position: DVec3, domain: DomainId) -> MonomerId {
        let id = self.next_id;
        self.next_id += 1;
        self.monomers.insert(
            id,
            Monomer {
                kind: kind.to_string(),
                position,
                domain,
            },
        );
        id
    }

    /// Move a monomer; returns false if the id is unknown
    pub fn set_position(&mut self, id: MonomerId, position: DVec3) -> bool {
        match self.monomers.get_mut(&id) {
            Some(m) => {
                m.position = position;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.monomers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monomers.is_empty()
    }

    /// Fill a cubic box of side `box_length` with `count` monomers of `kind`.
    ///
    /// Uses its own seeded stream so the kinetic stream is left untouched.
    pub fn random_cloud(kind: &str, count: usize, box_length: f64, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut pool = Self::new();
        for _ in 0..count {
            let position = DVec3::new(
                rng.gen::<f64>() * box_length,
                rng.gen::<f64>() * box_length,
                rng.gen::<f64>() * box_length,
            );
            pool.add(kind, position);
        }
        pool
    }

    /// Displace every monomer by a Gaussian step of width `sigma` along a random direction.
    ///
    /// Crude stand-in for the force integrator so the demo has moving monomers.
    pub fn jitter<R: Rng>(&mut self, rng: &mut R, sigma: f64) {
        let normal = match Normal::new(0.0, sigma) {
            Ok(n) => n,
            Err(e) => {
                log::warn!("Invalid jitter width {}: {}", sigma, e);
                return;
            }
        };
        for monomer in self.monomers.values_mut() {
            let dir: [f64; 3] = UnitSphere.sample(rng);
            let step: f64 = normal.sample(rng);
            monomer.position += DVec3::from_array(dir) * step;
        }
    }
}

impl MonomerStore for MonomerPool {
    fn has_monomer_type(&self, name: &str) -> bool {
        self.monomers.values().any(|m| m.kind == name)
    }

    fn monomers_of_type(&self, name: &str) -> Vec<MonomerId> {
        self.monomers
            .iter()
            .filter(|(_, m)| m.kind == name)
            .map(|(id, _)| *id)
            .collect()
    }

    fn position(&self, id: MonomerId) -> Option<DVec3> {
        self.monomers.get(&id).map(|m| m.position)
    }

    fn neighbours(&self, id: MonomerId, name: &str, radius: f64) -> Vec<MonomerId> {
        let Some(origin) = self.position(id) else {
            return Vec::new();
        };
        let r2 = radius * radius;
        self.monomers
            .iter()
            .filter(|(other, m)| **other != id && m.kind == name && m.position.distance_squared(origin) <= r2)
            .map(|(other, _)| *other)
            .collect()
    }

    fn owner(&self, id: MonomerId) -> Option<DomainId> {
        self.monomers.get(&id).map(|m| m.domain)
    }
}
