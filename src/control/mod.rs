//! Session control: lifecycle state machine and the interactive command
//! language.

mod controller;
mod input;

pub use controller::{Controller, ControllerError, ParameterUpdate, SimulationState};
pub use input::{Command, CommandError, ExportKind, HELP, Outcome, execute};
