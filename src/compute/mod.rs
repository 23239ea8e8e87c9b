//! Compute module - Pattern generation, scoring and evolution.

mod canvas;
mod network;
mod pattern;

pub mod evolution;

pub use canvas::*;
pub use network::*;
pub use pattern::*;
