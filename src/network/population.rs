//! Ceiling on the number of simultaneously active polymers.
//!
//! Only blocks new nucleation; existing polymers are never evicted.
//! Pending nucleations hold a reservation so a ceiling cannot be
//! over-committed by captures that bind later.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PopulationController {
    /// Configured maximum, `None` for unlimited
    max: Option<usize>,
    /// Set once the limit has been cancelled for the run
    cancelled: bool,
    /// Live polymers
    live: usize,
    /// Nucleations in progress
    reserved: usize,
}

impl PopulationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max(&self) -> Option<usize> {
        self.max
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn live(&self) -> usize {
        self.live
    }

    pub fn reserved(&self) -> usize {
        self.reserved
    }

    /// False iff a maximum is set and live plus reserved polymers reach it
    pub fn can_form_new_polymer(&self) -> bool {
        match self.max {
            Some(max) => self.live + self.reserved < max,
            None => true,
        }
    }

    pub fn set_limit(&mut self, network: &str, max: usize) -> Result<(), ConfigError> {
        if self.cancelled {
            return Err(ConfigError::LimitCancelled(network.to_string()));
        }
        if max == 0 {
            return Err(ConfigError::ZeroPolymerLimit);
        }
        self.max = Some(max);
        Ok(())
    }

    /// Remove the ceiling for the rest of the run
    pub fn cancel_limit(&mut self) {
        self.max = None;
        self.cancelled = true;
    }

    pub fn reserve(&mut self) {
        self.reserved += 1;
    }

    pub fn release_reservation(&mut self) {
        self.reserved = self.reserved.saturating_sub(1);
    }

    pub fn on_polymer_created(&mut self) {
        self.live += 1;
    }

    pub fn on_polymer_destroyed(&mut self) {
        self.live = self.live.saturating_sub(1);
    }

    /// Forget every live polymer and reservation (network teardown)
    pub fn clear(&mut self) {
        self.live = 0;
        self.reserved = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceiling_blocks_fourth() {
        let mut pc = PopulationController::new();
        pc.set_limit("actin", 3).unwrap();
        for _ in 0..3 {
            assert!(pc.can_form_new_polymer());
            pc.on_polymer_created();
        }
        assert!(!pc.can_form_new_polymer());

        pc.on_polymer_destroyed();
        assert!(pc.can_form_new_polymer());
    }

    #[test]
    fn test_reservations_count() {
        let mut pc = PopulationController::new();
        pc.set_limit("actin", 2).unwrap();
        pc.on_polymer_created();
        pc.reserve();
        assert!(!pc.can_form_new_polymer());
        pc.release_reservation();
        assert!(pc.can_form_new_polymer());
    }

    #[test]
    fn test_cancel_is_irreversible() {
        let mut pc = PopulationController::new();
        pc.set_limit("actin", 1).unwrap();
        pc.on_polymer_created();
        assert!(!pc.can_form_new_polymer());

        pc.cancel_limit();
        assert!(pc.can_form_new_polymer());
        assert_eq!(
            pc.set_limit("actin", 5),
            Err(ConfigError::LimitCancelled("actin".to_string()))
        );
        assert_eq!(pc.max(), None);
    }

    #[test]
    fn test_zero_limit_rejected() {
        let mut pc = PopulationController::new();
        assert_eq!(pc.set_limit("actin", 0), Err(ConfigError::ZeroPolymerLimit));
    }

    #[test]
    fn test_unlimited_by_default() {
        let mut pc = PopulationController::new();
        for _ in 0..1000 {
            pc.on_polymer_created();
        }
        assert!(pc.can_form_new_polymer());
    }
}
