//! Configuration: kinetics commands and run parameters.

mod commands;
mod parameters;

pub use commands::Command;
pub use parameters::{default_commands, CloudParameters, RunParameters};
