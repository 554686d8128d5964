//! Structured change records handed to the logging collaborator.
//!
//! The kinetics layer only supplies the data; rendering is a plain text line
//! or a single XML element, selected by [`OutputMode`].

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::events::{EventId, EventType};

/// Rendering selected for the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputMode {
    #[default]
    Text,
    Xml,
}

/// What happened in a kinetic transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransitionKind {
    /// Unbound → Forming
    CaptureStarted,
    /// Forming → Unbound after the duration budget ran out
    CaptureExpired,
    /// Forming → Unbound because the anchor end changed or the event was cancelled
    CaptureAbandoned,
    /// Forming → Bound, new polymer
    PolymerFormed,
    /// Forming → Bound, polymer extended
    BondBound,
    /// Bound → Unbound at a polymer end
    BondReleased,
    /// Last bond released, polymer destroyed
    PolymerDestroyed,
    /// Whole polymer dissociated
    PolymerDissolved,
    /// Nucleotide state advanced on one or more bonds
    NucleotideChanged,
}

/// One kinetic state change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionRecord {
    pub step: u64,
    pub network: String,
    pub event: EventType,
    pub event_id: EventId,
    pub transition: TransitionKind,
    pub polymer: Option<u64>,
    pub bonds_affected: usize,
    pub live_polymers: usize,
    pub live_bonds: usize,
    pub parameters: Vec<(&'static str, f64)>,
}

/// One applied configuration command with before/after parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandRecord {
    pub network: String,
    pub command: &'static str,
    pub event: Option<EventType>,
    pub before: Vec<(&'static str, f64)>,
    pub after: Vec<(&'static str, f64)>,
}

/// A network stopped after an invariant violation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HaltRecord {
    pub step: u64,
    pub network: String,
    pub diagnostic: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ChangeRecord {
    Command(CommandRecord),
    Transition(TransitionRecord),
    Halted(HaltRecord),
}

impl ChangeRecord {
    pub fn as_transition(&self) -> Option<&TransitionRecord> {
        match self {
            ChangeRecord::Transition(t) => Some(t),
            _ => None,
        }
    }

    pub fn render(&self, mode: OutputMode) -> String {
        match mode {
            OutputMode::Text => self.render_text(),
            OutputMode::Xml => self.render_xml(),
        }
    }

    fn render_text(&self) -> String {
        let mut out = String::new();
        match self {
            ChangeRecord::Command(c) => {
                let _ = write!(out, "{} network={}", c.command, c.network);
                if let Some(event) = c.event {
                    let _ = write!(out, " event={}", event.name());
                }
                for (name, value) in &c.before {
                    let _ = write!(out, " old_{}={}", name, value);
                }
                for (name, value) in &c.after {
                    let _ = write!(out, " {}={}", name, value);
                }
            }
            ChangeRecord::Transition(t) => {
                let _ = write!(
                    out,
                    "step={} network={} event={}#{} transition={:?}",
                    t.step,
                    t.network,
                    t.event.name(),
                    t.event_id,
                    t.transition
                );
                if let Some(p) = t.polymer {
                    let _ = write!(out, " polymer={}", p);
                }
                let _ = write!(
                    out,
                    " bonds={} live_polymers={} live_bonds={}",
                    t.bonds_affected, t.live_polymers, t.live_bonds
                );
                for (name, value) in &t.parameters {
                    let _ = write!(out, " {}={}", name, value);
                }
            }
            ChangeRecord::Halted(h) => {
                let _ = write!(out, "step={} network={} HALTED: {}", h.step, h.network, h.diagnostic);
            }
        }
        out
    }

    fn render_xml(&self) -> String {
        let mut out = String::new();
        match self {
            ChangeRecord::Command(c) => {
                let _ = write!(
                    out,
                    "<Command name=\"{}\" network=\"{}\"",
                    c.command,
                    escape(&c.network)
                );
                if let Some(event) = c.event {
                    let _ = write!(out, " event=\"{}\"", event.name());
                }
                out.push('>');
                for (name, value) in &c.before {
                    let _ = write!(out, "<Before name=\"{}\">{}</Before>", name, value);
                }
                for (name, value) in &c.after {
                    let _ = write!(out, "<After name=\"{}\">{}</After>", name, value);
                }
                out.push_str("</Command>");
            }
            ChangeRecord::Transition(t) => {
                let _ = write!(
                    out,
                    "<Transition step=\"{}\" network=\"{}\" event=\"{}\" eventId=\"{}\" kind=\"{:?}\"",
                    t.step,
                    escape(&t.network),
                    t.event.name(),
                    t.event_id,
                    t.transition
                );
                if let Some(p) = t.polymer {
                    let _ = write!(out, " polymer=\"{}\"", p);
                }
                let _ = write!(
                    out,
                    " bonds=\"{}\" livePolymers=\"{}\" liveBonds=\"{}\">",
                    t.bonds_affected, t.live_polymers, t.live_bonds
                );
                for (name, value) in &t.parameters {
                    let _ = write!(out, "<Parameter name=\"{}\">{}</Parameter>", name, value);
                }
                out.push_str("</Transition>");
            }
            ChangeRecord::Halted(h) => {
                let _ = write!(
                    out,
                    "<Halted step=\"{}\" network=\"{}\">{}</Halted>",
                    h.step,
                    escape(&h.network),
                    escape(&h.diagnostic)
                );
            }
        }
        out
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Receiver of change records
pub trait ChangeLog {
    fn record(&mut self, record: ChangeRecord);
}

impl ChangeLog for Vec<ChangeRecord> {
    fn record(&mut self, record: ChangeRecord) {
        self.push(record);
    }
}

/// Discards every record
#[derive(Debug, Default)]
pub struct NullLog;

impl ChangeLog for NullLog {
    fn record(&mut self, _record: ChangeRecord) {}
}

/// Writes each record through the `log` facade
#[derive(Debug, Default)]
pub struct LogSink {
    pub mode: OutputMode,
    /// Records written so far
    pub written: u64,
}

impl LogSink {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode, written: 0 }
    }
}

impl ChangeLog for LogSink {
    fn record(&mut self, record: ChangeRecord) {
        let line = record.render(self.mode);
        match record {
            ChangeRecord::Halted(_) => log::error!("{}", line),
            ChangeRecord::Command(_) => log::info!("{}", line),
            ChangeRecord::Transition(_) => log::debug!("{}", line),
        }
        self.written += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition() -> ChangeRecord {
        ChangeRecord::Transition(TransitionRecord {
            step: 40,
            network: "actin".to_string(),
            event: EventType::PolymerForms,
            event_id: 2,
            transition: TransitionKind::PolymerFormed,
            polymer: Some(7),
            bonds_affected: 1,
            live_polymers: 3,
            live_bonds: 9,
            parameters: vec![("spring", 128.0)],
        })
    }

    #[test]
    fn test_text_rendering() {
        let line = transition().render(OutputMode::Text);
        assert_eq!(
            line,
            "step=40 network=actin event=PolymerForms#2 transition=PolymerFormed polymer=7 bonds=1 live_polymers=3 live_bonds=9 spring=128"
        );
    }

    #[test]
    fn test_xml_rendering() {
        let xml = transition().render(OutputMode::Xml);
        assert!(xml.starts_with("<Transition step=\"40\" network=\"actin\""));
        assert!(xml.contains("<Parameter name=\"spring\">128</Parameter>"));
        assert!(xml.ends_with("</Transition>"));
    }

    #[test]
    fn test_xml_escapes_names() {
        let record = ChangeRecord::Halted(HaltRecord {
            step: 1,
            network: "a<b>".to_string(),
            diagnostic: "x & y".to_string(),
        });
        let xml = record.render(OutputMode::Xml);
        assert!(xml.contains("a&lt;b&gt;"));
        assert!(xml.contains("x &amp; y"));
    }

    #[test]
    fn test_command_before_after() {
        let record = ChangeRecord::Command(CommandRecord {
            network: "actin".to_string(),
            command: "SetFixedHeadOffRate",
            event: None,
            before: vec![("rate", 0.0)],
            after: vec![("rate", 0.25)],
        });
        assert_eq!(
            record.render(OutputMode::Text),
            "SetFixedHeadOffRate network=actin old_rate=0 rate=0.25"
        );
    }
}
