//! Active cell network: one configured system of transient active bonds.
//!
//! The network owns its events, its live polymers and the captures still
//! forming. Each event execution runs one handler:
//! - nucleation: free monomer pairs inside a proximity shell start forming
//! - cone capture: free monomers ahead of a polymer end start forming
//! - end release: end bonds dissociate (stretched or fixed-rate draw)
//! - dissolution: whole polymers dissociate
//! - nucleotide: bound bonds advance ATP → ADP-Pi → ADP → ATP
//!
//! After every handler the polymer chains and the population count are
//! checked; a violation halts the network.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::bond::{ActiveBond, BondId};
use super::lifecycle::{CaptureDecision, CaptureTarget, PendingCapture, Tally};
use super::polymer::{role_at, ActivePolymer, PolymerId};
use super::population::PopulationController;
use crate::error::{ConfigError, InvariantViolation};
use crate::events::{
    ConeCapture, Dissolution, EndRelease, Event, EventId, EventKind, EventType, Hookean, Nucleation,
    NucleotideChange, PolymerEnd,
};
use crate::export::{ChangeLog, ChangeRecord, HaltRecord, TransitionKind, TransitionRecord};
use crate::geometry::{CaptureRegion, ProximityShell};
use crate::kinetics::{Firing, RateMultipliers, TransitionEngine};
use crate::particles::{DomainAuthority, MonomerId, MonomerStore};
use crate::stats::{EventCounts, IntervalHistogram};

/// Everything a handler needs from the outside for one step
pub struct StepContext<'a> {
    pub step: u64,
    pub store: &'a dyn MonomerStore,
    pub authority: &'a dyn DomainAuthority,
    pub engine: &'a mut TransitionEngine,
    pub log: &'a mut dyn ChangeLog,
}

/// Network-wide kinetic settings shared by several events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkKinetics {
    /// Fixed per-step release probability at the head
    pub head_off_rate: f64,
    /// Fixed per-step release probability at the tail
    pub tail_off_rate: f64,
    /// Extra separation gate for head capture
    pub head_on_shell: Option<ProximityShell>,
    /// Extra separation gate for tail capture
    pub tail_on_shell: Option<ProximityShell>,
    /// Head bond length forcing release (0 disables)
    pub head_off_separation: f64,
    /// Tail bond length forcing release (0 disables)
    pub tail_off_separation: f64,
    pub multipliers: RateMultipliers,
}

impl Default for NetworkKinetics {
    fn default() -> Self {
        Self {
            head_off_rate: 0.0,
            tail_off_rate: 0.0,
            head_on_shell: None,
            tail_on_shell: None,
            head_off_separation: 0.0,
            tail_off_separation: 0.0,
            multipliers: RateMultipliers::default(),
        }
    }
}

impl NetworkKinetics {
    pub fn off_rate(&self, end: PolymerEnd) -> f64 {
        match end {
            PolymerEnd::Head => self.head_off_rate,
            PolymerEnd::Tail => self.tail_off_rate,
        }
    }

    pub fn on_shell(&self, end: PolymerEnd) -> Option<ProximityShell> {
        match end {
            PolymerEnd::Head => self.head_on_shell,
            PolymerEnd::Tail => self.tail_on_shell,
        }
    }

    pub fn off_separation(&self, end: PolymerEnd) -> f64 {
        match end {
            PolymerEnd::Head => self.head_off_separation,
            PolymerEnd::Tail => self.tail_off_separation,
        }
    }
}

/// Transient spring between two monomers, as consumed by the force integrator
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpringTerm {
    pub head: MonomerId,
    pub tail: MonomerId,
    pub spring_constant: f64,
    pub unstretched_length: f64,
}

/// Statistics of one event at a sampling point
#[derive(Debug, Clone, PartialEq)]
pub struct EventSample {
    pub event: EventType,
    pub event_id: EventId,
    pub counts: EventCounts,
    pub histogram: Option<IntervalHistogram>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveCellNetwork {
    name: String,
    /// Monomer type this network binds
    monomer: String,
    active: bool,
    cumulative_statistics: bool,
    kinetics: NetworkKinetics,
    /// Events in registration order
    events: Vec<Event>,
    polymers: BTreeMap<PolymerId, ActivePolymer>,
    /// Forming bonds, in capture order
    pending: Vec<PendingCapture>,
    population: PopulationController,
    next_polymer_id: PolymerId,
    next_bond_id: BondId,
    halted: Option<InvariantViolation>,
}

impl ActiveCellNetwork {
    pub fn new(name: &str, monomer: &str) -> Self {
        Self {
            name: name.to_string(),
            monomer: monomer.to_string(),
            active: true,
            cumulative_statistics: false,
            kinetics: NetworkKinetics::default(),
            events: Vec::new(),
            polymers: BTreeMap::new(),
            pending: Vec::new(),
            population: PopulationController::new(),
            next_polymer_id: 0,
            next_bond_id: 0,
            halted: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn monomer_type(&self) -> &str {
        &self.monomer
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Active and not halted
    pub fn is_runnable(&self) -> bool {
        self.active && self.halted.is_none()
    }

    pub fn halted(&self) -> Option<&InvariantViolation> {
        self.halted.as_ref()
    }

    pub fn kinetics(&self) -> &NetworkKinetics {
        &self.kinetics
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn event(&self, event: EventType) -> Option<&Event> {
        self.events.iter().find(|e| e.event_type() == event)
    }

    pub fn event_by_id(&self, id: EventId) -> Option<&Event> {
        self.events.iter().find(|e| e.id() == id)
    }

    pub fn polymers(&self) -> impl Iterator<Item = &ActivePolymer> {
        self.polymers.values()
    }

    pub fn polymer(&self, id: PolymerId) -> Option<&ActivePolymer> {
        self.polymers.get(&id)
    }

    pub fn polymer_count(&self) -> usize {
        self.polymers.len()
    }

    /// Bound bonds across all polymers
    pub fn live_bond_count(&self) -> usize {
        self.polymers.values().map(|p| p.len()).sum()
    }

    pub fn pending(&self) -> &[PendingCapture] {
        &self.pending
    }

    pub fn population(&self) -> &PopulationController {
        &self.population
    }

    pub fn can_form_new_polymer(&self) -> bool {
        self.population.can_form_new_polymer()
    }

    pub fn cumulative_statistics(&self) -> bool {
        self.cumulative_statistics
    }

    /// Springs of every bound bond, head polymer first
    pub fn spring_terms(&self) -> Vec<SpringTerm> {
        self.polymers
            .values()
            .flat_map(|p| p.bonds())
            .map(|b| SpringTerm {
                head: b.head(),
                tail: b.tail(),
                spring_constant: b.spring_constant(),
                unstretched_length: b.unstretched_length(),
            })
            .collect()
    }

    /// Monomers that are Forming or Bound in this network
    pub fn engaged_monomers(&self) -> BTreeSet<MonomerId> {
        let mut engaged: BTreeSet<MonomerId> = self.polymers.values().flat_map(|p| p.monomers()).collect();
        for capture in &self.pending {
            engaged.extend(capture.booked_monomers());
        }
        engaged
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Insert or update the event of `kind`'s type; returns its id and the previous parameters.
    pub(crate) fn upsert_event(
        &mut self,
        kind: EventKind,
        register: impl FnOnce() -> EventId,
    ) -> (EventId, Option<EventKind>) {
        let ty = kind.event_type();
        if let Some(event) = self.events.iter_mut().find(|e| e.event_type() == ty) {
            let before = *event.kind();
            event.set_kind(kind);
            return (event.id(), Some(before));
        }

        let id = register();
        let mut event = Event::new(id, kind, self.cumulative_statistics);
        if let EventKind::FixedOffRate(release) = kind {
            event.set_firing(Firing::FixedRate(self.kinetics.off_rate(release.end)));
        }
        self.events.push(event);
        (id, None)
    }

    pub(crate) fn event_mut(&mut self, event: EventType) -> Result<&mut Event, ConfigError> {
        let network = self.name.clone();
        self.events
            .iter_mut()
            .find(|e| e.event_type() == event)
            .ok_or(ConfigError::UnknownEvent { network, event })
    }

    pub(crate) fn kinetics_mut(&mut self) -> &mut NetworkKinetics {
        &mut self.kinetics
    }

    /// Set the fixed off rate at `end`, propagating it to the release event
    pub(crate) fn set_off_rate(&mut self, end: PolymerEnd, rate: f64) -> f64 {
        let before = self.kinetics.off_rate(end);
        match end {
            PolymerEnd::Head => self.kinetics.head_off_rate = rate,
            PolymerEnd::Tail => self.kinetics.tail_off_rate = rate,
        }
        let ty = match end {
            PolymerEnd::Head => EventType::BondUnbindsFromPolymerHead,
            PolymerEnd::Tail => EventType::BondUnbindsFromPolymerTail,
        };
        if let Ok(event) = self.event_mut(ty) {
            event.set_firing(Firing::FixedRate(rate));
        }
        before
    }

    pub(crate) fn set_population_limit(&mut self, max: usize) -> Result<Option<usize>, ConfigError> {
        let before = self.population.max();
        self.population.set_limit(&self.name, max)?;
        Ok(before)
    }

    pub(crate) fn cancel_population_limit(&mut self) -> Option<usize> {
        let before = self.population.max();
        self.population.cancel_limit();
        before
    }

    pub(crate) fn set_cumulative_statistics(&mut self, cumulative: bool) {
        self.cumulative_statistics = cumulative;
        for event in &mut self.events {
            event.statistics.set_cumulative(cumulative);
        }
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Destroy every polymer and forming bond
    pub fn teardown(&mut self) {
        for polymer in self.polymers.values_mut() {
            for mut bond in polymer.drain() {
                bond.dissociate();
            }
        }
        self.polymers.clear();
        for capture in &mut self.pending {
            capture.bond.abandon();
        }
        self.pending.clear();
        self.population.clear();
        log::info!("Network '{}' torn down", self.name);
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    /// Run one event; halts the network on an invariant violation.
    pub(crate) fn execute(&mut self, event_id: EventId, cx: &mut StepContext<'_>) -> Result<Tally, InvariantViolation> {
        let Some(index) = self.events.iter().position(|e| e.id() == event_id) else {
            log::warn!("Network '{}' has no event {}", self.name, event_id);
            return Ok(Tally::default());
        };
        let kind = *self.events[index].kind();
        let firing = self.events[index].firing();
        let ty = kind.event_type();

        let result = match kind {
            EventKind::PolymerForms(params) => self.run_nucleation(event_id, &params, firing, cx),
            EventKind::ConeCapture(params) => self.run_cone_capture(event_id, ty, &params, firing, cx),
            EventKind::FixedOffRate(params) => self.run_end_release(event_id, ty, &params, firing, cx),
            EventKind::PolymerDissolves(params) => self.run_dissolution(event_id, &params, firing, cx),
            EventKind::Nucleotide(change) => Ok(self.run_nucleotide(event_id, ty, &change, firing, cx)),
        }
        .and_then(|tally| self.check_invariants().map(|_| tally));

        match result {
            Ok(tally) => {
                self.events[index]
                    .statistics
                    .record_execution(cx.step, tally.successes, tally.failures);
                log::trace!(
                    "step {} {}::{} successes={} failures={}",
                    cx.step,
                    self.name,
                    ty.name(),
                    tally.successes,
                    tally.failures
                );
                Ok(tally)
            }
            Err(violation) => {
                log::error!("Network '{}' halted at step {}: {}", self.name, cx.step, violation);
                cx.log.record(ChangeRecord::Halted(HaltRecord {
                    step: cx.step,
                    network: self.name.clone(),
                    diagnostic: violation.to_string(),
                }));
                self.halted = Some(violation.clone());
                Err(violation)
            }
        }
    }

    /// Chain continuity of every polymer and agreement with the population count
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        for polymer in self.polymers.values() {
            polymer.validate()?;
        }
        if self.population.live() != self.polymers.len() {
            return Err(InvariantViolation::PopulationMismatch {
                network: self.name.clone(),
                counted: self.population.live(),
                held: self.polymers.len(),
            });
        }
        Ok(())
    }

    fn run_nucleation(
        &mut self,
        event_id: EventId,
        params: &Nucleation,
        firing: Firing,
        cx: &mut StepContext<'_>,
    ) -> Result<Tally, InvariantViolation> {
        let mut engaged = self.engaged_monomers();
        let mut started = 0;

        for a in cx.store.monomers_of_type(&self.monomer) {
            if !self.population.can_form_new_polymer() {
                log::trace!("Network '{}' at polymer ceiling", self.name);
                break;
            }
            if engaged.contains(&a) {
                continue;
            }
            let (Some(pos_a), Some(handle_a)) = (cx.store.position(a), cx.store.handle(a)) else {
                continue;
            };

            let store = cx.store;
            let authority = cx.authority;
            let region = CaptureRegion::Shell {
                origin: pos_a,
                shell: params.shell,
            };
            let partner = store
                .neighbours(a, &self.monomer, region.search_radius())
                .into_iter()
                .find(|b| {
                    !engaged.contains(b)
                        && store.position(*b).is_some_and(|pos_b| region.admits(pos_b))
                        && store.handle(*b).is_some_and(|h| authority.is_authority(handle_a, h))
                });

            if let Some(b) = partner {
                engaged.insert(a);
                engaged.insert(b);
                let bond = ActiveBond::forming(self.allocate_bond_id(), a, b, cx.step, params.duration);
                self.population.reserve();
                self.pending.push(PendingCapture::new(event_id, bond, CaptureTarget::NewPolymer));
                self.emit(
                    cx,
                    event_id,
                    EventType::PolymerForms,
                    TransitionKind::CaptureStarted,
                    None,
                    1,
                    vec![("head", a as f64), ("tail", b as f64)],
                );
                started += 1;
            }
        }

        let mut tally = self.advance_captures(event_id, EventType::PolymerForms, firing, params.spring, cx)?;
        if started == 0 && tally.attempts() == 0 {
            tally.failure();
        }
        Ok(tally)
    }

    fn run_cone_capture(
        &mut self,
        event_id: EventId,
        ty: EventType,
        params: &ConeCapture,
        firing: Firing,
        cx: &mut StepContext<'_>,
    ) -> Result<Tally, InvariantViolation> {
        let mut engaged = self.engaged_monomers();
        let booked: BTreeSet<PolymerId> = self
            .pending
            .iter()
            .filter_map(|c| match c.target {
                CaptureTarget::Extend { polymer, end, .. } if end == params.end => Some(polymer),
                _ => None,
            })
            .collect();
        let on_shell = self.kinetics.on_shell(params.end);
        let store = cx.store;
        let authority = cx.authority;

        let mut captures = Vec::new();
        for polymer in self.polymers.values() {
            if booked.contains(&polymer.id()) {
                continue;
            }
            let Some(anchor) = polymer.end_monomer(params.end) else {
                continue;
            };
            let (Some(apex), Some(anchor_handle)) = (store.position(anchor), store.handle(anchor)) else {
                continue;
            };
            let Some(cone) = polymer
                .end_direction(params.end, store)
                .and_then(|direction| params.cone.anchored_at(apex, direction))
            else {
                continue;
            };

            let region = CaptureRegion::Cone(cone);
            let found = store
                .neighbours(anchor, &self.monomer, region.search_radius())
                .into_iter()
                .find_map(|c| {
                    if engaged.contains(&c) {
                        return None;
                    }
                    let pos = store.position(c)?;
                    let admitted = region.admits(pos)
                        && on_shell.map_or(true, |shell| shell.contains(apex, pos))
                        && store.handle(c).is_some_and(|h| authority.is_authority(anchor_handle, h));
                    admitted.then(|| (c, cone.angle_to(pos).unwrap_or(0.0)))
                });

            if let Some((c, angle)) = found {
                engaged.insert(c);
                captures.push((polymer.id(), anchor, c, angle));
            }
        }

        let started = captures.len();
        for (polymer, anchor, monomer, angle) in captures {
            let (head, tail) = match params.end {
                PolymerEnd::Head => (monomer, anchor),
                PolymerEnd::Tail => (anchor, monomer),
            };
            let bond = ActiveBond::forming(self.allocate_bond_id(), head, tail, cx.step, params.duration);
            self.pending.push(PendingCapture::new(
                event_id,
                bond,
                CaptureTarget::Extend {
                    polymer,
                    end: params.end,
                    anchor,
                },
            ));
            self.emit(
                cx,
                event_id,
                ty,
                TransitionKind::CaptureStarted,
                Some(polymer),
                1,
                vec![
                    ("monomer", monomer as f64),
                    ("anchor", anchor as f64),
                    ("angle_deg", angle.to_degrees()),
                ],
            );
        }

        let mut tally = self.advance_captures(event_id, ty, firing, params.spring, cx)?;
        if started == 0 && tally.attempts() == 0 {
            tally.failure();
        }
        Ok(tally)
    }

    /// Draw for every capture of `event_id`; bind, keep waiting, or discard.
    fn advance_captures(
        &mut self,
        event_id: EventId,
        ty: EventType,
        firing: Firing,
        spring: Hookean,
        cx: &mut StepContext<'_>,
    ) -> Result<Tally, InvariantViolation> {
        let mut tally = Tally::default();
        let pending = std::mem::take(&mut self.pending);
        let mut kept = Vec::with_capacity(pending.len());
        let mut outcome = Ok(());

        for capture in pending {
            if capture.event != event_id || outcome.is_err() {
                kept.push(capture);
                continue;
            }
            let anchor_valid = self.anchor_valid(&capture, cx.store);
            match capture.decide(cx.step, anchor_valid, cx.engine, firing) {
                CaptureDecision::Bind => {
                    tally.success();
                    outcome = self.complete_capture(capture, event_id, ty, spring, cx);
                }
                CaptureDecision::Wait => {
                    tally.failure();
                    kept.push(capture);
                }
                CaptureDecision::Expire => {
                    tally.failure();
                    self.discard_capture(capture, event_id, ty, TransitionKind::CaptureExpired, cx);
                }
                CaptureDecision::Abandon => {
                    tally.failure();
                    self.discard_capture(capture, event_id, ty, TransitionKind::CaptureAbandoned, cx);
                }
            }
        }

        self.pending = kept;
        outcome.map(|_| tally)
    }

    /// Discard captures that can no longer bind before any event runs at `cx.step`.
    ///
    /// A capture whose budget ended before this step expires; one whose
    /// owning event has been cancelled is abandoned. Neither draws.
    pub(crate) fn expire_stale_captures(&mut self, cx: &mut StepContext<'_>) {
        if self.pending.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.pending);
        for capture in pending {
            let event_id = capture.event;
            let owner = self.events.iter().find(|e| e.id() == event_id);
            let ty = owner.map_or_else(|| capture_event_type(&capture), |e| e.event_type());
            let transition = match owner {
                Some(event) if !event.is_active() => TransitionKind::CaptureAbandoned,
                None => TransitionKind::CaptureAbandoned,
                Some(_) if capture.bond.budget_overrun(cx.step) => TransitionKind::CaptureExpired,
                Some(_) => {
                    self.pending.push(capture);
                    continue;
                }
            };
            log::debug!(
                "Network '{}' drops capture of bond {} at step {} ({:?})",
                self.name,
                capture.bond.id(),
                cx.step,
                transition
            );
            self.discard_capture(capture, event_id, ty, transition, cx);
        }
    }

    fn anchor_valid(&self, capture: &PendingCapture, store: &dyn MonomerStore) -> bool {
        let visible = capture
            .booked_monomers()
            .iter()
            .all(|m| store.position(*m).is_some());
        visible
            && match capture.target {
                CaptureTarget::NewPolymer => true,
                CaptureTarget::Extend { polymer, end, anchor } => {
                    self.polymers.get(&polymer).and_then(|p| p.end_monomer(end)) == Some(anchor)
                }
            }
    }

    fn complete_capture(
        &mut self,
        capture: PendingCapture,
        event_id: EventId,
        ty: EventType,
        spring: Hookean,
        cx: &mut StepContext<'_>,
    ) -> Result<(), InvariantViolation> {
        let PendingCapture { mut bond, target, .. } = capture;
        bond.bind(cx.step, spring);
        let parameters = vec![
            ("spring", spring.spring_constant),
            ("length", spring.unstretched_length),
        ];

        match target {
            CaptureTarget::NewPolymer => {
                self.population.release_reservation();
                let id = self.next_polymer_id;
                self.next_polymer_id += 1;
                self.polymers.insert(id, ActivePolymer::nucleate(id, bond, cx.step));
                self.population.on_polymer_created();
                self.emit(cx, event_id, ty, TransitionKind::PolymerFormed, Some(id), 1, parameters);
            }
            CaptureTarget::Extend { polymer, end, .. } => {
                self.polymers
                    .get_mut(&polymer)
                    .ok_or(InvariantViolation::EmptyPolymer(polymer))?
                    .grow(end, bond)?;
                self.emit(cx, event_id, ty, TransitionKind::BondBound, Some(polymer), 1, parameters);
            }
        }
        Ok(())
    }

    fn discard_capture(
        &mut self,
        capture: PendingCapture,
        event_id: EventId,
        ty: EventType,
        transition: TransitionKind,
        cx: &mut StepContext<'_>,
    ) {
        let PendingCapture { mut bond, target, .. } = capture;
        bond.abandon();
        let polymer = match target {
            CaptureTarget::NewPolymer => {
                self.population.release_reservation();
                None
            }
            CaptureTarget::Extend { polymer, .. } => Some(polymer),
        };
        self.emit(
            cx,
            event_id,
            ty,
            transition,
            polymer,
            1,
            vec![
                ("duration", bond.duration_budget() as f64),
                ("remaining", bond.remaining_budget(cx.step) as f64),
            ],
        );
    }

    fn run_end_release(
        &mut self,
        event_id: EventId,
        ty: EventType,
        params: &EndRelease,
        firing: Firing,
        cx: &mut StepContext<'_>,
    ) -> Result<Tally, InvariantViolation> {
        let mut tally = Tally::default();
        let off_separation = self.kinetics.off_separation(params.end);
        let ids: Vec<PolymerId> = self.polymers.keys().copied().collect();

        for id in ids {
            let Some(bond) = self.polymers.get(&id).and_then(|p| p.end_bond(params.end)) else {
                continue;
            };
            if bond.bound_age(cx.step) < params.duration {
                continue;
            }
            if !is_authority_for(bond.head(), bond.tail(), cx) {
                continue;
            }
            let stretched = off_separation > 0.0 && bond.length(cx.store).is_some_and(|l| l > off_separation);
            if !(stretched || cx.engine.fire(firing, 1.0)) {
                tally.failure();
                continue;
            }
            tally.success();

            let polymer = self
                .polymers
                .get_mut(&id)
                .ok_or(InvariantViolation::EmptyPolymer(id))?;
            let mut released = polymer.release(params.end).ok_or(InvariantViolation::EmptyPolymer(id))?;
            released.dissociate();
            let emptied = polymer.is_empty();
            let freed = match params.end {
                PolymerEnd::Head => released.head(),
                PolymerEnd::Tail => released.tail(),
            };

            if emptied {
                self.polymers.remove(&id);
                self.population.on_polymer_destroyed();
            }
            self.emit(
                cx,
                event_id,
                ty,
                TransitionKind::BondReleased,
                Some(id),
                1,
                vec![
                    ("monomer", freed as f64),
                    ("stretched", if stretched { 1.0 } else { 0.0 }),
                    ("spring", params.spring.spring_constant),
                    ("length", params.spring.unstretched_length),
                ],
            );
            if emptied {
                self.emit(cx, event_id, ty, TransitionKind::PolymerDestroyed, Some(id), 0, Vec::new());
            }
        }

        if tally.attempts() == 0 {
            tally.failure();
        }
        Ok(tally)
    }

    fn run_dissolution(
        &mut self,
        event_id: EventId,
        params: &Dissolution,
        firing: Firing,
        cx: &mut StepContext<'_>,
    ) -> Result<Tally, InvariantViolation> {
        let mut tally = Tally::default();
        let ids: Vec<PolymerId> = self.polymers.keys().copied().collect();

        for id in ids {
            let Some(polymer) = self.polymers.get(&id) else {
                continue;
            };
            if polymer.age(cx.step) < params.duration {
                continue;
            }
            let (Some(head), Some(tail)) = (
                polymer.end_monomer(PolymerEnd::Head),
                polymer.end_monomer(PolymerEnd::Tail),
            ) else {
                return Err(InvariantViolation::EmptyPolymer(id));
            };
            if !is_authority_for(head, tail, cx) {
                continue;
            }
            let stretched = params.max_extension > 0.0
                && polymer
                    .bonds()
                    .any(|b| b.length(cx.store).is_some_and(|l| l > params.max_extension));
            if !(stretched || cx.engine.fire(firing, 1.0)) {
                tally.failure();
                continue;
            }
            tally.success();

            let Some(mut polymer) = self.polymers.remove(&id) else {
                continue;
            };
            let mut bonds = polymer.drain();
            for bond in &mut bonds {
                bond.dissociate();
            }
            self.population.on_polymer_destroyed();
            self.emit(
                cx,
                event_id,
                EventType::PolymerDissolves,
                TransitionKind::PolymerDissolved,
                Some(id),
                bonds.len(),
                vec![
                    ("stretched", if stretched { 1.0 } else { 0.0 }),
                    ("spring", params.spring.spring_constant),
                    ("length", params.spring.unstretched_length),
                ],
            );
        }

        if tally.attempts() == 0 {
            tally.failure();
        }
        Ok(tally)
    }

    fn run_nucleotide(
        &mut self,
        event_id: EventId,
        ty: EventType,
        change: &NucleotideChange,
        firing: Firing,
        cx: &mut StepContext<'_>,
    ) -> Tally {
        let mut tally = Tally::default();
        let multipliers = self.kinetics.multipliers;

        for polymer in self.polymers.values_mut() {
            let len = polymer.len();
            for (index, bond) in polymer.bonds_mut().enumerate() {
                if bond.nucleotide != change.from {
                    continue;
                }
                let multiplier = multipliers.for_bond(role_at(index, len), change.from);
                if cx.engine.fire(firing, multiplier) {
                    bond.nucleotide = change.to;
                    tally.success();
                } else {
                    tally.failure();
                }
            }
        }

        if tally.successes > 0 {
            self.emit(
                cx,
                event_id,
                ty,
                TransitionKind::NucleotideChanged,
                None,
                tally.successes as usize,
                vec![("probability", firing.probability())],
            );
        }
        if tally.attempts() == 0 {
            tally.failure();
        }
        tally
    }

    fn allocate_bond_id(&mut self) -> BondId {
        let id = self.next_bond_id;
        self.next_bond_id += 1;
        id
    }

    #[allow(clippy::too_many_arguments)]
    fn emit(
        &self,
        cx: &mut StepContext<'_>,
        event_id: EventId,
        event: EventType,
        transition: TransitionKind,
        polymer: Option<PolymerId>,
        bonds_affected: usize,
        parameters: Vec<(&'static str, f64)>,
    ) {
        cx.log.record(ChangeRecord::Transition(TransitionRecord {
            step: cx.step,
            network: self.name.clone(),
            event,
            event_id,
            transition,
            polymer,
            bonds_affected,
            live_polymers: self.polymers.len(),
            live_bonds: self.live_bond_count(),
            parameters,
        }));
    }

    /// Sample every event's statistics, in registration order
    pub(crate) fn sample_statistics(&mut self) -> Vec<EventSample> {
        self.events
            .iter_mut()
            .map(|e| {
                let (counts, histogram) = e.statistics.sample();
                EventSample {
                    event: e.event_type(),
                    event_id: e.id(),
                    counts,
                    histogram,
                }
            })
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn polymers_mut_for_test(&mut self) -> &mut BTreeMap<PolymerId, ActivePolymer> {
        &mut self.polymers
    }
}

/// Event type that creates captures with this target
fn capture_event_type(capture: &PendingCapture) -> EventType {
    match capture.target {
        CaptureTarget::NewPolymer => EventType::PolymerForms,
        CaptureTarget::Extend { end: PolymerEnd::Head, .. } => EventType::BondBindsToPolymerHead,
        CaptureTarget::Extend { end: PolymerEnd::Tail, .. } => EventType::BondBindsToPolymerTail,
    }
}

fn is_authority_for(a: MonomerId, b: MonomerId, cx: &StepContext<'_>) -> bool {
    match (cx.store.handle(a), cx.store.handle(b)) {
        (Some(ha), Some(hb)) => cx.authority.is_authority(ha, hb),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NucleotideChange;
    use crate::geometry::ConeSpec;
    use crate::kinetics::NucleotideState;
    use crate::particles::{MonomerPool, SingleDomain};
    use glam::DVec3;

    fn spring() -> Hookean {
        Hookean::new(100.0, 0.5).unwrap()
    }

    fn nucleation(duration: u64) -> EventKind {
        EventKind::PolymerForms(Nucleation {
            shell: ProximityShell::new(0.0, 1.0).unwrap(),
            duration,
            spring: spring(),
        })
    }

    struct Harness {
        network: ActiveCellNetwork,
        engine: TransitionEngine,
        records: Vec<ChangeRecord>,
        next_id: EventId,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                network: ActiveCellNetwork::new("actin", "A"),
                engine: TransitionEngine::new(17),
                records: Vec::new(),
                next_id: 0,
            }
        }

        fn add(&mut self, kind: EventKind) -> EventId {
            let id = self.next_id;
            self.network.upsert_event(kind, || id);
            self.next_id += 1;
            id
        }

        fn run(&mut self, id: EventId, step: u64, pool: &MonomerPool) -> Result<Tally, InvariantViolation> {
            let mut cx = StepContext {
                step,
                store: pool,
                authority: &SingleDomain,
                engine: &mut self.engine,
                log: &mut self.records,
            };
            self.network.execute(id, &mut cx)
        }
    }

    fn pair_pool() -> MonomerPool {
        let mut pool = MonomerPool::new();
        pool.add("A", DVec3::ZERO);
        pool.add("A", DVec3::new(0.0, 0.0, 0.8));
        pool
    }

    #[test]
    fn test_nucleation_binds_immediately_at_rate_one() {
        let pool = pair_pool();
        let mut h = Harness::new();
        let id = h.add(nucleation(0));
        let tally = h.run(id, 0, &pool).unwrap();

        assert_eq!(tally.successes, 1);
        assert_eq!(h.network.polymer_count(), 1);
        assert!(h.network.pending().is_empty());
        let terms = h.network.spring_terms();
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].spring_constant, 100.0);
    }

    #[test]
    fn test_monomers_not_double_booked() {
        let mut pool = pair_pool();
        pool.add("A", DVec3::new(0.0, 0.5, 0.0));
        let mut h = Harness::new();
        let id = h.add(nucleation(5));
        h.network.event_mut(EventType::PolymerForms).unwrap().set_firing(Firing::NEVER);

        h.run(id, 0, &pool).unwrap();
        // Three monomers all within range: only one pair can form
        assert_eq!(h.network.pending().len(), 1);
        h.run(id, 1, &pool).unwrap();
        assert_eq!(h.network.pending().len(), 1);
    }

    #[test]
    fn test_capture_expires_after_budget() {
        let pool = pair_pool();
        let mut h = Harness::new();
        let id = h.add(nucleation(10));
        h.network.event_mut(EventType::PolymerForms).unwrap().set_firing(Firing::NEVER);
        h.network.set_population_limit(1).unwrap();

        for step in 0..10 {
            h.run(id, step, &pool).unwrap();
            assert_eq!(h.network.pending().len(), 1, "step {}", step);
            assert!(!h.network.can_form_new_polymer());
        }
        h.run(id, 10, &pool).unwrap();
        assert!(h.network.pending().is_empty() || h.network.pending()[0].bond.created_step() == 10);
        assert!(h.records.iter().any(|r| matches!(
            r.as_transition(),
            Some(TransitionRecord { transition: TransitionKind::CaptureExpired, step: 10, .. })
        )));
        assert_eq!(h.network.polymer_count(), 0);
    }

    #[test]
    fn test_cone_growth_at_tail() {
        let mut pool = MonomerPool::new();
        let m0 = pool.add("A", DVec3::ZERO);
        let m1 = pool.add("A", DVec3::new(0.0, 0.0, 0.8));
        let ahead = pool.add("A", DVec3::new(0.0, 0.05, 1.5));
        let behind = pool.add("A", DVec3::new(0.0, 0.0, -0.7));

        let mut h = Harness::new();
        let forms = h.add(nucleation(0));
        h.run(forms, 0, &pool).unwrap();
        let polymer = h.network.polymers().next().unwrap().clone();
        assert_eq!(polymer.monomers(), vec![m0, m1]);

        // Tail end of the (m0, m1) bond points along +z
        h.network.event_mut(EventType::PolymerForms).unwrap().set_active(false);
        let grow = h.add(EventKind::ConeCapture(ConeCapture {
            end: PolymerEnd::Tail,
            cone: ConeSpec {
                range: 1.0,
                half_angle_deg: 30.0,
                polar_angle_deg: 0.0,
                azimuth_deg: 0.0,
            },
            duration: 0,
            spring: spring(),
        }));
        h.run(grow, 1, &pool).unwrap();

        let grown = h.network.polymer(polymer.id()).unwrap();
        assert_eq!(grown.monomers(), vec![m0, m1, ahead]);
        assert!(!grown.monomers().contains(&behind));
    }

    #[test]
    fn test_release_destroys_single_bond_polymer() {
        let pool = pair_pool();
        let mut h = Harness::new();
        let forms = h.add(nucleation(0));
        h.run(forms, 0, &pool).unwrap();

        let release = h.add(EventKind::FixedOffRate(EndRelease {
            end: PolymerEnd::Head,
            duration: 0,
            spring: spring(),
        }));
        h.network.set_off_rate(PolymerEnd::Head, 1.0);
        h.run(release, 1, &pool).unwrap();

        assert_eq!(h.network.polymer_count(), 0);
        assert_eq!(h.network.population().live(), 0);
    }

    #[test]
    fn test_release_respects_minimum_bound_age() {
        let pool = pair_pool();
        let mut h = Harness::new();
        let forms = h.add(nucleation(0));
        h.run(forms, 0, &pool).unwrap();
        h.network.set_off_rate(PolymerEnd::Tail, 1.0);
        let release = h.add(EventKind::FixedOffRate(EndRelease {
            end: PolymerEnd::Tail,
            duration: 5,
            spring: spring(),
        }));

        h.run(release, 4, &pool).unwrap();
        assert_eq!(h.network.polymer_count(), 1);
        h.run(release, 5, &pool).unwrap();
        assert_eq!(h.network.polymer_count(), 0);
    }

    #[test]
    fn test_stretched_end_releases_without_draw() {
        let mut pool = pair_pool();
        let mut h = Harness::new();
        let forms = h.add(nucleation(0));
        h.run(forms, 0, &pool).unwrap();
        let release = h.add(EventKind::FixedOffRate(EndRelease {
            end: PolymerEnd::Head,
            duration: 0,
            spring: spring(),
        }));
        h.network.kinetics_mut().head_off_separation = 1.0;

        h.run(release, 1, &pool).unwrap();
        assert_eq!(h.network.polymer_count(), 1);

        pool.set_position(1, DVec3::new(0.0, 0.0, 2.0));
        let draws = h.engine.draws();
        h.run(release, 2, &pool).unwrap();
        assert_eq!(h.network.polymer_count(), 0);
        assert_eq!(h.engine.draws(), draws);
    }

    #[test]
    fn test_nucleotide_cycle() {
        let pool = pair_pool();
        let mut h = Harness::new();
        let forms = h.add(nucleation(0));
        h.run(forms, 0, &pool).unwrap();

        let hydrolysis = h.add(EventKind::Nucleotide(NucleotideChange {
            from: NucleotideState::Atp,
            to: NucleotideState::AdpPi,
        }));
        h.network
            .event_mut(EventType::AtpHydrolysis)
            .unwrap()
            .set_firing(Firing::Probabilistic(1.0));
        h.run(hydrolysis, 1, &pool).unwrap();

        let bond = h.network.polymers().next().unwrap().bonds().next().unwrap().clone();
        assert_eq!(bond.nucleotide, NucleotideState::AdpPi);
    }

    #[test]
    fn test_zero_multiplier_blocks_head_transition() {
        let pool = pair_pool();
        let mut h = Harness::new();
        let forms = h.add(nucleation(0));
        h.run(forms, 0, &pool).unwrap();

        let release_pi = h.add(EventKind::Nucleotide(NucleotideChange {
            from: NucleotideState::AdpPi,
            to: NucleotideState::Adp,
        }));
        h.network
            .event_mut(EventType::AdpReleasePi)
            .unwrap()
            .set_firing(Firing::Probabilistic(1.0));
        h.network.kinetics_mut().multipliers.head_adp_pi = 0.0;
        for polymer in h.network.polymers_mut_for_test().values_mut() {
            for bond in polymer.bonds_mut() {
                bond.nucleotide = NucleotideState::AdpPi;
            }
        }

        for step in 1..50 {
            h.run(release_pi, step, &pool).unwrap();
        }
        let bond = h.network.polymers().next().unwrap().bonds().next().unwrap().clone();
        assert_eq!(bond.nucleotide, NucleotideState::AdpPi);
    }

    #[test]
    fn test_broken_chain_halts_network() {
        let pool = pair_pool();
        let mut h = Harness::new();
        let forms = h.add(nucleation(0));
        h.run(forms, 0, &pool).unwrap();

        for polymer in h.network.polymers_mut_for_test().values_mut() {
            polymer.push_unchecked(ActiveBond::bound_for_test(99, 40, 41));
        }
        let err = h.run(forms, 1, &pool).unwrap_err();
        assert!(matches!(err, InvariantViolation::BrokenChain { .. }));
        assert!(!h.network.is_runnable());
        assert!(matches!(h.records.last(), Some(ChangeRecord::Halted(_))));
    }

    #[test]
    fn test_teardown_clears_everything() {
        let pool = pair_pool();
        let mut h = Harness::new();
        let forms = h.add(nucleation(0));
        h.run(forms, 0, &pool).unwrap();
        h.network.teardown();
        assert_eq!(h.network.polymer_count(), 0);
        assert!(h.network.engaged_monomers().is_empty());
        assert!(h.network.check_invariants().is_ok());
    }
}
