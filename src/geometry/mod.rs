//! Geometric capture predicates.
//!
//! Proximity shells admit monomer pairs by separation; forward cones admit
//! monomers ahead of a polymer end along its bond direction.

mod capture;

pub use capture::{CaptureRegion, ConeSpec, ForwardCone, ProximityShell};
