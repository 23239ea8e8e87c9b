//! Evolutionary search over generator genomes.
//!
//! # Overview
//!
//! - **Fitness Functions** (`fitness`): Pluggable image metrics, user ratings
//!   and their blend
//! - **Genome Operations** (`genome`): Random generation, crossover, and mutation
//! - **Search** (`search`): The genetic algorithm and headless run loop
//!
//! # Example
//!
//! ```rust,no_run
//! use brush::schema::BrushConfig;
//! use brush::compute::evolution::EvolutionEngine;
//!
//! let config = BrushConfig::default();
//! let params = config.params;
//!
//! let mut engine = EvolutionEngine::new(config);
//! let result = engine.run_with_callback(&params, |stats, _population| {
//!     println!("Generation {}: best fitness = {:.3}",
//!         stats.generation, stats.best_fitness);
//! });
//!
//! println!("Stopped: {:?}", result.stats.stop_reason);
//! ```
//!
//! # Fitness Metrics
//!
//! - `Symmetry`: Left/right mirror similarity
//! - `Complexity`: Normalized histogram entropy
//! - `Contrast`: Spread of intensities
//! - `EdgeDensity`: Share of pixels on a Sobel edge
//! - `ActiveArea`: Share of non-blank pixels
//! - `Coherence`: Balance between intensity clusters
//!
//! # Selection Methods
//!
//! - `RouletteWheel`: Fitness-proportionate (uniform when nothing is scored)
//! - `Tournament`: Best of `size` random picks
//! - `RankBased`: Probability proportional to rank

mod fitness;
mod genome;
mod search;

pub use fitness::{FitnessEvaluator, MetricResult, compute_metric};
pub use genome::{GenomeRng, genome_distance};
pub use search::EvolutionEngine;
