//! Active cell networks: bonds, polymers and the kinetics that drive them.

mod acn;
mod bond;
mod lifecycle;
mod polymer;
mod population;

pub use acn::{ActiveCellNetwork, EventSample, NetworkKinetics, SpringTerm, StepContext};
pub use bond::{ActiveBond, BondId, BondState};
pub use lifecycle::{CaptureDecision, CaptureTarget, PendingCapture, Tally};
pub use polymer::{role_at, ActivePolymer, PolymerId};
pub use population::PopulationController;
