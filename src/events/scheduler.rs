//! Event scheduling.
//!
//! Events run in registration order, each iff it is active and the current
//! step is a multiple of its period. The scheduler owns the event id counter;
//! ids are never reused within a run.

use serde::{Deserialize, Serialize};

use super::kinds::{EventKind, EventType};
use crate::error::ConfigError;
use crate::kinetics::Firing;
use crate::stats::EventStatistics;

/// Identifier handed out by the scheduler at registration
pub type EventId = u64;

/// One configured kinetic rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    id: EventId,
    kind: EventKind,
    /// Steps between executions
    period: u64,
    firing: Firing,
    active: bool,
    pub(crate) statistics: EventStatistics,
}

impl Event {
    pub(crate) fn new(id: EventId, kind: EventKind, cumulative_statistics: bool) -> Self {
        Self {
            id,
            kind,
            period: 1,
            firing: kind.default_firing(),
            active: true,
            statistics: EventStatistics::new(cumulative_statistics),
        }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn event_type(&self) -> EventType {
        self.kind.event_type()
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    pub fn firing(&self) -> Firing {
        self.firing
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn statistics(&self) -> &EventStatistics {
        &self.statistics
    }

    /// Whether the event executes at `step`
    pub fn is_due(&self, step: u64) -> bool {
        self.active && step % self.period == 0
    }

    pub(crate) fn set_kind(&mut self, kind: EventKind) {
        debug_assert_eq!(kind.event_type(), self.kind.event_type());
        self.kind = kind;
    }

    pub(crate) fn set_period(&mut self, period: u64) -> Result<(), ConfigError> {
        if period == 0 {
            return Err(ConfigError::InvalidPeriod(0));
        }
        self.period = period;
        Ok(())
    }

    pub(crate) fn set_firing(&mut self, firing: Firing) {
        self.firing = firing;
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

/// Position of an event in the global registration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    /// Index of the owning network in the engine
    pub network: usize,
    pub event: EventId,
}

/// Registration order and id allocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventScheduler {
    next_event_id: EventId,
    order: Vec<ScheduledEvent>,
}

impl EventScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event of `network` to the order and return its fresh id
    pub fn register(&mut self, network: usize) -> EventId {
        let event = self.next_event_id;
        self.next_event_id += 1;
        self.order.push(ScheduledEvent { network, event });
        log::debug!("Registered event {} for network #{}", event, network);
        event
    }

    /// Registered events that `is_due` accepts at `step`, in registration order
    pub fn due(&self, step: u64, is_due: impl Fn(ScheduledEvent, u64) -> bool) -> Vec<ScheduledEvent> {
        self.order.iter().copied().filter(|s| is_due(*s, step)).collect()
    }

    /// All registered events, in execution order
    pub fn order(&self) -> &[ScheduledEvent] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::kinds::NucleotideChange;
    use crate::kinetics::NucleotideState;

    fn hydrolysis() -> EventKind {
        EventKind::Nucleotide(NucleotideChange {
            from: NucleotideState::Atp,
            to: NucleotideState::AdpPi,
        })
    }

    #[test]
    fn test_ids_are_sequential_and_owned() {
        let mut a = EventScheduler::new();
        let mut b = EventScheduler::new();
        assert_eq!(a.register(0), 0);
        assert_eq!(a.register(1), 1);
        // A second scheduler starts its own count
        assert_eq!(b.register(0), 0);
        assert_eq!(a.order()[1], ScheduledEvent { network: 1, event: 1 });
    }

    #[test]
    fn test_due_on_period_multiples() {
        let mut event = Event::new(0, hydrolysis(), false);
        event.set_period(5).unwrap();
        let due: Vec<u64> = (0..20).filter(|s| event.is_due(*s)).collect();
        assert_eq!(due, vec![0, 5, 10, 15]);
    }

    #[test]
    fn test_inactive_never_due() {
        let mut event = Event::new(0, hydrolysis(), false);
        event.set_active(false);
        assert!(!(0..10).any(|s| event.is_due(s)));
    }

    #[test]
    fn test_due_keeps_registration_order() {
        let mut scheduler = EventScheduler::new();
        for network in [2, 0, 1, 0] {
            scheduler.register(network);
        }
        // Event 1 cancelled: the remainder keep their order
        let due = scheduler.due(0, |s, _| s.event != 1);
        let ids: Vec<EventId> = due.iter().map(|s| s.event).collect();
        assert_eq!(ids, vec![0, 2, 3]);
        let all = scheduler.due(0, |_, _| true);
        assert_eq!(all.len(), 4);
        assert_eq!(all[1], ScheduledEvent { network: 0, event: 1 });
    }

    #[test]
    fn test_zero_period_rejected() {
        let mut event = Event::new(0, hydrolysis(), false);
        assert_eq!(event.set_period(0), Err(ConfigError::InvalidPeriod(0)));
        assert_eq!(event.period(), 1);
    }
}
