//! Kinetics engine for one spatial domain.
//!
//! Owns the event scheduler, every active cell network and the single random
//! stream. Commands configure it; `tick` advances all due events by one step.

use serde::{Deserialize, Serialize};

use crate::config::Command;
use crate::error::{ConfigError, KineticsError};
use crate::events::{
    checked_duration, checked_period, ConeCapture, Dissolution, EndRelease, EventKind, EventScheduler, EventType,
    Hookean, Nucleation, NucleotideChange, PolymerEnd,
};
use crate::export::{ChangeLog, ChangeRecord, CommandRecord};
use crate::geometry::{ConeSpec, ProximityShell};
use crate::kinetics::{Firing, NucleotideState, RateMultipliers, TransitionEngine};
use crate::network::{ActiveCellNetwork, EventSample, SpringTerm, StepContext};
use crate::particles::{DomainAuthority, MonomerStore};
use crate::stats::SuccessIntervalHistogram;

/// Outcome of one `tick`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub step: u64,
    /// Events that ran
    pub executed: usize,
    pub successes: u64,
    pub failures: u64,
}

/// One event's statistics at a sampling point, tagged with its network
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkSample {
    pub step: u64,
    pub network: String,
    pub sample: EventSample,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KineticsEngine {
    scheduler: EventScheduler,
    networks: Vec<ActiveCellNetwork>,
    transitions: TransitionEngine,
}

/// Parameter snapshot of a command: (before, after, event)
type Applied = (Vec<(&'static str, f64)>, Vec<(&'static str, f64)>, Option<EventType>);

impl KineticsEngine {
    pub fn new(seed: u64) -> Self {
        Self {
            scheduler: EventScheduler::new(),
            networks: Vec::new(),
            transitions: TransitionEngine::new(seed),
        }
    }

    pub fn networks(&self) -> &[ActiveCellNetwork] {
        &self.networks
    }

    pub fn network(&self, name: &str) -> Option<&ActiveCellNetwork> {
        self.networks.iter().find(|n| n.name() == name)
    }

    pub fn scheduler(&self) -> &EventScheduler {
        &self.scheduler
    }

    pub fn transitions(&self) -> &TransitionEngine {
        &self.transitions
    }

    /// Springs of every bound bond in every network
    pub fn spring_terms(&self) -> Vec<SpringTerm> {
        self.networks.iter().flat_map(|n| n.spring_terms()).collect()
    }

    fn index_of(&self, name: &str) -> Result<usize, ConfigError> {
        self.networks
            .iter()
            .position(|n| n.name() == name)
            .ok_or_else(|| ConfigError::UnknownNetwork(name.to_string()))
    }

    /// Validate and apply one command.
    ///
    /// A rejected command leaves the engine unchanged.
    pub fn apply(
        &mut self,
        command: &Command,
        store: &dyn MonomerStore,
        log: &mut dyn ChangeLog,
    ) -> Result<(), ConfigError> {
        let applied = command.validate().and_then(|_| self.apply_validated(command, store));
        match applied {
            Ok((before, after, event)) => {
                log::info!("Applied {} to '{}'", command.name(), command.network());
                log.record(ChangeRecord::Command(CommandRecord {
                    network: command.network().to_string(),
                    command: command.name(),
                    event,
                    before,
                    after,
                }));
                Ok(())
            }
            Err(e) => {
                log::warn!("Rejected {} for '{}': {}", command.name(), command.network(), e);
                Err(e)
            }
        }
    }

    fn apply_validated(&mut self, command: &Command, store: &dyn MonomerStore) -> Result<Applied, ConfigError> {
        match command {
            Command::CreateActiveNetwork { acn, monomer } => {
                if self.network(acn).is_some() {
                    return Err(ConfigError::DuplicateNetwork(acn.clone()));
                }
                if !store.has_monomer_type(monomer) {
                    return Err(ConfigError::UnknownMonomer(monomer.clone()));
                }
                self.networks.push(ActiveCellNetwork::new(acn, monomer));
                Ok((Vec::new(), Vec::new(), None))
            }

            Command::SetFixedHeadOffRate { acn, rate } => self.set_off_rate(acn, PolymerEnd::Head, *rate),
            Command::SetFixedTailOffRate { acn, rate } => self.set_off_rate(acn, PolymerEnd::Tail, *rate),

            Command::SetProximityOnSeparation {
                acn,
                end,
                min_separation,
                separation,
            } => {
                let index = self.index_of(acn)?;
                let shell = ProximityShell::new(*min_separation, *separation)?;
                let kinetics = self.networks[index].kinetics_mut();
                let slot = match end {
                    PolymerEnd::Head => &mut kinetics.head_on_shell,
                    PolymerEnd::Tail => &mut kinetics.tail_on_shell,
                };
                let before = slot.map_or((0.0, 0.0), |s| (s.inner, s.outer));
                *slot = Some(shell);
                Ok((
                    vec![("min_separation", before.0), ("separation", before.1)],
                    vec![("min_separation", shell.inner), ("separation", shell.outer)],
                    None,
                ))
            }

            Command::SetProximityOffSeparation { acn, end, separation } => {
                let index = self.index_of(acn)?;
                let kinetics = self.networks[index].kinetics_mut();
                let slot = match end {
                    PolymerEnd::Head => &mut kinetics.head_off_separation,
                    PolymerEnd::Tail => &mut kinetics.tail_off_separation,
                };
                let before = std::mem::replace(slot, *separation);
                Ok((vec![("separation", before)], vec![("separation", *separation)], None))
            }

            Command::SetBondBindsForwardConeToPolymerHeadEvent {
                acn,
                duration,
                cone,
                spring,
                length,
            } => self.upsert_cone(acn, PolymerEnd::Head, *duration, *cone, *spring, *length),
            Command::SetBondBindsForwardConeToPolymerTailEvent {
                acn,
                duration,
                cone,
                spring,
                length,
            } => self.upsert_cone(acn, PolymerEnd::Tail, *duration, *cone, *spring, *length),

            Command::SetBondUnbindsFromPolymerHeadEvent {
                acn,
                duration,
                spring,
                length,
            } => self.upsert_release(acn, PolymerEnd::Head, *duration, *spring, *length),
            Command::SetBondUnbindsFromPolymerTailEvent {
                acn,
                duration,
                spring,
                length,
            } => self.upsert_release(acn, PolymerEnd::Tail, *duration, *spring, *length),

            Command::SetPolymerFormsEvent {
                acn,
                duration,
                min_range,
                range,
                spring,
                length,
            } => {
                let kind = EventKind::PolymerForms(Nucleation {
                    shell: ProximityShell::new(*min_range, *range)?,
                    duration: checked_duration(*duration)?,
                    spring: Hookean::new(*spring, *length)?,
                });
                self.upsert(acn, kind)
            }

            Command::SetPolymerDissolvesEvent {
                acn,
                duration,
                range,
                spring,
                length,
            } => {
                let kind = EventKind::PolymerDissolves(Dissolution {
                    duration: checked_duration(*duration)?,
                    max_extension: ConfigError::check_non_negative("range", *range)?,
                    spring: Hookean::new(*spring, *length)?,
                });
                self.upsert(acn, kind)
            }

            Command::SetActivePolymerLimit { acn, max } => {
                let index = self.index_of(acn)?;
                let before = self.networks[index].set_population_limit(*max)?;
                Ok((limit_parameter(before), vec![("max", *max as f64)], None))
            }

            Command::CancelActivePolymerLimit { acn } => {
                let index = self.index_of(acn)?;
                let before = self.networks[index].cancel_population_limit();
                Ok((limit_parameter(before), Vec::new(), None))
            }

            Command::SetAtpHydrolysisProbability { acn, rate } => {
                self.set_nucleotide_rate(acn, NucleotideState::Atp, NucleotideState::AdpPi, *rate)
            }
            Command::SetAdpReleasePiProbability { acn, rate } => {
                self.set_nucleotide_rate(acn, NucleotideState::AdpPi, NucleotideState::Adp, *rate)
            }
            Command::SetAdpPhosphorylationProbability { acn, rate } => {
                self.set_nucleotide_rate(acn, NucleotideState::Adp, NucleotideState::Atp, *rate)
            }

            Command::SetHeadAdpMultiplier { acn, multiplier } => {
                self.set_multiplier(acn, *multiplier, |m| &mut m.head_adp)
            }
            Command::SetHeadAdpPiMultiplier { acn, multiplier } => {
                self.set_multiplier(acn, *multiplier, |m| &mut m.head_adp_pi)
            }
            Command::SetTailAdpMultiplier { acn, multiplier } => {
                self.set_multiplier(acn, *multiplier, |m| &mut m.tail_adp)
            }

            Command::SetEventExecutionPeriod { acn, event, period } => {
                let index = self.index_of(acn)?;
                let period = checked_period(*period)?;
                let target = self.networks[index].event_mut(*event)?;
                let before = target.period();
                target.set_period(period)?;
                Ok((
                    vec![("period", before as f64)],
                    vec![("period", period as f64)],
                    Some(*event),
                ))
            }

            Command::SetEventProbability {
                acn,
                event,
                probability,
            } => {
                let index = self.index_of(acn)?;
                let target = self.networks[index].event_mut(*event)?;
                let before = target.firing();
                target.set_firing(before.with_probability(*probability)?);
                Ok((
                    vec![("probability", before.probability())],
                    vec![("probability", *probability)],
                    Some(*event),
                ))
            }

            Command::SetEventActive { acn, event, active } => {
                let index = self.index_of(acn)?;
                let target = self.networks[index].event_mut(*event)?;
                let before = target.is_active();
                target.set_active(*active);
                Ok((
                    vec![("active", flag(before))],
                    vec![("active", flag(*active))],
                    Some(*event),
                ))
            }

            Command::SetNetworkActive { acn, active } => {
                let index = self.index_of(acn)?;
                let before = self.networks[index].is_active();
                self.networks[index].set_active(*active);
                Ok((vec![("active", flag(before))], vec![("active", flag(*active))], None))
            }

            Command::ToggleCumulativeEventStatistics { acn, cumulative } => {
                let index = self.index_of(acn)?;
                let before = self.networks[index].cumulative_statistics();
                self.networks[index].set_cumulative_statistics(*cumulative);
                Ok((
                    vec![("cumulative", flag(before))],
                    vec![("cumulative", flag(*cumulative))],
                    None,
                ))
            }

            Command::BinEventSuccessIntervals {
                acn,
                event,
                bin_total,
                bin_width,
                sample_periods,
            } => {
                let index = self.index_of(acn)?;
                let histogram = SuccessIntervalHistogram::new(*bin_total, *bin_width, *sample_periods)?;
                self.networks[index].event_mut(*event)?.statistics.set_histogram(histogram);
                Ok((
                    Vec::new(),
                    vec![
                        ("bin_total", *bin_total as f64),
                        ("bin_width", *bin_width),
                        ("sample_periods", *sample_periods as f64),
                    ],
                    Some(*event),
                ))
            }
        }
    }

    /// Insert or update an event, registering it with the scheduler if new
    fn upsert(&mut self, acn: &str, kind: EventKind) -> Result<Applied, ConfigError> {
        let index = self.index_of(acn)?;
        let scheduler = &mut self.scheduler;
        let (_, previous) = self.networks[index].upsert_event(kind, || scheduler.register(index));
        let before = previous.map(|k| k.parameters()).unwrap_or_default();
        Ok((before, kind.parameters(), Some(kind.event_type())))
    }

    fn upsert_cone(
        &mut self,
        acn: &str,
        end: PolymerEnd,
        duration: i64,
        cone: ConeSpec,
        spring: f64,
        length: f64,
    ) -> Result<Applied, ConfigError> {
        cone.validate()?;
        let kind = EventKind::ConeCapture(ConeCapture {
            end,
            cone,
            duration: checked_duration(duration)?,
            spring: Hookean::new(spring, length)?,
        });
        self.upsert(acn, kind)
    }

    fn upsert_release(
        &mut self,
        acn: &str,
        end: PolymerEnd,
        duration: i64,
        spring: f64,
        length: f64,
    ) -> Result<Applied, ConfigError> {
        let kind = EventKind::FixedOffRate(EndRelease {
            end,
            duration: checked_duration(duration)?,
            spring: Hookean::new(spring, length)?,
        });
        self.upsert(acn, kind)
    }

    fn set_off_rate(&mut self, acn: &str, end: PolymerEnd, rate: f64) -> Result<Applied, ConfigError> {
        let index = self.index_of(acn)?;
        let rate = ConfigError::check_probability("rate", rate)?;
        let before = self.networks[index].set_off_rate(end, rate);
        Ok((vec![("rate", before)], vec![("rate", rate)], None))
    }

    /// Set the base probability of a nucleotide event, creating it on first use
    fn set_nucleotide_rate(
        &mut self,
        acn: &str,
        from: NucleotideState,
        to: NucleotideState,
        rate: f64,
    ) -> Result<Applied, ConfigError> {
        let index = self.index_of(acn)?;
        let rate = ConfigError::check_probability("rate", rate)?;
        let kind = EventKind::Nucleotide(NucleotideChange { from, to });
        let event_type = kind.event_type();

        let scheduler = &mut self.scheduler;
        let network = &mut self.networks[index];
        network.upsert_event(kind, || scheduler.register(index));
        let event = network.event_mut(event_type)?;
        let before = event.firing().probability();
        event.set_firing(Firing::Probabilistic(rate));
        Ok((vec![("rate", before)], vec![("rate", rate)], Some(event_type)))
    }

    fn set_multiplier(
        &mut self,
        acn: &str,
        multiplier: f64,
        field: impl FnOnce(&mut RateMultipliers) -> &mut f64,
    ) -> Result<Applied, ConfigError> {
        let index = self.index_of(acn)?;
        let multiplier = ConfigError::check_non_negative("multiplier", multiplier)?;
        let slot = field(&mut self.networks[index].kinetics_mut().multipliers);
        let before = std::mem::replace(slot, multiplier);
        Ok((vec![("multiplier", before)], vec![("multiplier", multiplier)], None))
    }

    /// Run every due event once.
    ///
    /// Captures that can no longer bind are dropped first. A network that violates an invariant is halted; the remaining
    /// networks still run and the first violation is returned.
    pub fn tick(
        &mut self,
        step: u64,
        store: &dyn MonomerStore,
        authority: &dyn DomainAuthority,
        log: &mut dyn ChangeLog,
    ) -> Result<TickReport, KineticsError> {
        let mut report = TickReport {
            step,
            ..TickReport::default()
        };
        let mut first_violation = None;

        for network in self.networks.iter_mut().filter(|n| n.is_runnable()) {
            let mut cx = StepContext {
                step,
                store,
                authority,
                engine: &mut self.transitions,
                log: &mut *log,
            };
            network.expire_stale_captures(&mut cx);
        }

        let networks = &self.networks;
        let due = self.scheduler.due(step, |scheduled, step| {
            networks
                .get(scheduled.network)
                .and_then(|n| n.event_by_id(scheduled.event))
                .is_some_and(|e| e.is_due(step))
        });

        for scheduled in due {
            let Some(network) = self.networks.get_mut(scheduled.network) else {
                continue;
            };
            if !network.is_runnable() {
                continue;
            }
            let mut cx = StepContext {
                step,
                store,
                authority,
                engine: &mut self.transitions,
                log: &mut *log,
            };
            match network.execute(scheduled.event, &mut cx) {
                Ok(tally) => {
                    report.executed += 1;
                    report.successes += tally.successes;
                    report.failures += tally.failures;
                }
                Err(violation) => {
                    if first_violation.is_none() {
                        first_violation = Some(KineticsError::Invariant {
                            network: network.name().to_string(),
                            violation,
                        });
                    }
                }
            }
        }

        match first_violation {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    /// Sample the statistics of every event, network by network
    pub fn sample(&mut self, step: u64) -> Vec<NetworkSample> {
        self.networks
            .iter_mut()
            .flat_map(|n| {
                let network = n.name().to_string();
                n.sample_statistics().into_iter().map(move |sample| NetworkSample {
                    step,
                    network: network.clone(),
                    sample,
                })
            })
            .collect()
    }

    /// Destroy every polymer and pending capture of one network
    pub fn teardown_network(&mut self, name: &str) -> Result<(), ConfigError> {
        let index = self.index_of(name)?;
        self.networks[index].teardown();
        Ok(())
    }

    /// Check every network's chains and population counts
    pub fn check_invariants(&self) -> Result<(), KineticsError> {
        for network in &self.networks {
            network.check_invariants().map_err(|violation| KineticsError::Invariant {
                network: network.name().to_string(),
                violation,
            })?;
        }
        Ok(())
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

fn limit_parameter(max: Option<usize>) -> Vec<(&'static str, f64)> {
    max.map(|m| vec![("max", m as f64)]).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::NullLog;
    use crate::particles::{MonomerPool, SingleDomain};
    use glam::DVec3;

    fn create(acn: &str) -> Command {
        Command::CreateActiveNetwork {
            acn: acn.to_string(),
            monomer: "A".to_string(),
        }
    }

    fn pool() -> MonomerPool {
        let mut pool = MonomerPool::new();
        pool.add("A", DVec3::ZERO);
        pool.add("A", DVec3::new(0.5, 0.0, 0.0));
        pool
    }

    #[test]
    fn test_unknown_monomer_rejected() {
        let mut engine = KineticsEngine::new(1);
        let command = Command::CreateActiveNetwork {
            acn: "x".to_string(),
            monomer: "Z".to_string(),
        };
        assert_eq!(
            engine.apply(&command, &pool(), &mut NullLog),
            Err(ConfigError::UnknownMonomer("Z".to_string()))
        );
        assert!(engine.networks().is_empty());
    }

    #[test]
    fn test_duplicate_network_rejected() {
        let mut engine = KineticsEngine::new(1);
        let store = pool();
        engine.apply(&create("actin"), &store, &mut NullLog).unwrap();
        assert_eq!(
            engine.apply(&create("actin"), &store, &mut NullLog),
            Err(ConfigError::DuplicateNetwork("actin".to_string()))
        );
    }

    #[test]
    fn test_unknown_network_rejected() {
        let mut engine = KineticsEngine::new(1);
        let command = Command::SetFixedHeadOffRate {
            acn: "ghost".to_string(),
            rate: 0.1,
        };
        assert_eq!(
            engine.apply(&command, &pool(), &mut NullLog),
            Err(ConfigError::UnknownNetwork("ghost".to_string()))
        );
    }

    #[test]
    fn test_reconfigure_keeps_event_id() {
        let mut engine = KineticsEngine::new(1);
        let store = pool();
        engine.apply(&create("actin"), &store, &mut NullLog).unwrap();
        let forms = |range| Command::SetPolymerFormsEvent {
            acn: "actin".to_string(),
            duration: 0,
            min_range: 0.0,
            range,
            spring: 1.0,
            length: 0.5,
        };
        engine.apply(&forms(1.0), &store, &mut NullLog).unwrap();
        engine.apply(&forms(2.0), &store, &mut NullLog).unwrap();

        assert_eq!(engine.scheduler().len(), 1);
        let network = engine.network("actin").unwrap();
        assert_eq!(network.events().len(), 1);
        assert_eq!(network.events()[0].id(), 0);
    }

    #[test]
    fn test_command_record_has_before_and_after() {
        let mut engine = KineticsEngine::new(1);
        let store = pool();
        let mut records = Vec::new();
        engine.apply(&create("actin"), &store, &mut records).unwrap();
        let command = Command::SetFixedTailOffRate {
            acn: "actin".to_string(),
            rate: 0.3,
        };
        engine.apply(&command, &store, &mut records).unwrap();

        match records.last() {
            Some(ChangeRecord::Command(c)) => {
                assert_eq!(c.command, "SetFixedTailOffRate");
                assert_eq!(c.before, vec![("rate", 0.0)]);
                assert_eq!(c.after, vec![("rate", 0.3)]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_tick_forms_polymer() {
        let mut engine = KineticsEngine::new(1);
        let store = pool();
        engine.apply(&create("actin"), &store, &mut NullLog).unwrap();
        engine
            .apply(
                &Command::SetPolymerFormsEvent {
                    acn: "actin".to_string(),
                    duration: 0,
                    min_range: 0.0,
                    range: 1.0,
                    spring: 10.0,
                    length: 0.5,
                },
                &store,
                &mut NullLog,
            )
            .unwrap();

        let report = engine.tick(0, &store, &SingleDomain, &mut NullLog).unwrap();
        assert_eq!(report.executed, 1);
        assert_eq!(report.successes, 1);
        assert_eq!(engine.spring_terms().len(), 1);
    }
}
