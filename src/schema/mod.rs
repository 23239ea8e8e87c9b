//! Schema module - Configuration, genome and reporting types for Brush sessions.

mod config;
mod evolution;
mod genome;

pub use config::*;
pub use evolution::*;
pub use genome::*;
