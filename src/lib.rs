//! Project Brush - Evolve neural network generated patterns.
//!
//! A small fully connected network (a CPPN) maps pixel coordinates and a
//! latent vector to an intensity, producing a raster pattern. A genetic
//! algorithm evolves the network parameters, scoring patterns with image
//! metrics, user ratings, or a blend of both.
//!
//! # Architecture
//!
//! - `schema`: Configuration, genome and reporting types
//! - `compute`: Pattern generation, fitness evaluation and evolution
//! - `control`: Session state machine and the interactive command language
//! - `output`: PNG, `.bfilm` film and video export plus statistics logs
//! - `view`: Terminal rendering of populations and statistics
//!
//! # Example
//!
//! ```rust,no_run
//! use brush::{
//!     schema::BrushConfig,
//!     control::Controller,
//! };
//!
//! let mut controller = Controller::new(BrushConfig::default()).unwrap();
//! controller.start().unwrap();
//!
//! for _ in 0..10 {
//!     let stats = controller.step().unwrap();
//!     println!("Generation {}: best {:.3}", stats.generation, stats.best_fitness);
//! }
//!
//! // Favor the first pattern in the next generations.
//! controller.rate(0, 1.0).unwrap();
//! controller.export_images().unwrap();
//! ```

pub mod compute;
pub mod control;
pub mod output;
pub mod schema;
pub mod view;

// Re-export commonly used types
pub use compute::evolution::EvolutionEngine;
pub use compute::{Canvas, Generator, Pattern};
pub use control::{Controller, SimulationState};
pub use output::OutputHandler;
pub use schema::{BrushConfig, EvolutionParameters, GenerationStats};
