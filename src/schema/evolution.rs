//! Progress, statistics and result types reported by the evolution engine.

use serde::{Deserialize, Serialize};

use super::NetworkGenome;

/// Summary of one generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GenerationStats {
    /// Generation index (0 = initial population).
    pub generation: usize,
    /// Best fitness; 0.0 when nothing is scored.
    pub best_fitness: f32,
    /// Mean over scored patterns.
    pub average_fitness: f32,
    /// Lowest score among scored patterns.
    pub min_fitness: f32,
    /// Standard deviation over scored patterns.
    pub fitness_std: f32,
    /// Mean pairwise genome distance.
    pub diversity: f32,
    /// Patterns carrying a user rating.
    pub rated: usize,
    /// Patterns with a fitness score.
    pub scored: usize,
    pub population_size: usize,
}

/// Evolution history for plotting.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EvolutionHistory {
    /// Best fitness per generation.
    pub best_fitness: Vec<f32>,
    /// Average fitness per generation.
    pub avg_fitness: Vec<f32>,
    /// Standard deviation per generation.
    pub fitness_std: Vec<f32>,
    /// Diversity metric per generation.
    pub diversity: Vec<f32>,
}

impl EvolutionHistory {
    pub fn push(&mut self, stats: &GenerationStats) {
        self.best_fitness.push(stats.best_fitness);
        self.avg_fitness.push(stats.average_fitness);
        self.fitness_std.push(stats.fitness_std);
        self.diversity.push(stats.diversity);
    }

    pub fn len(&self) -> usize {
        self.best_fitness.len()
    }

    pub fn is_empty(&self) -> bool {
        self.best_fitness.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Score for an individual metric.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricScore {
    /// Metric name.
    pub name: String,
    /// Raw score.
    pub score: f32,
    /// Weight used.
    pub weight: f32,
}

/// Serializable snapshot of a pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternSnapshot {
    pub id: u64,
    pub fitness: Option<f32>,
    pub rating: Option<f32>,
    pub metric_scores: Vec<MetricScore>,
    pub generation: usize,
    pub genome: NetworkGenome,
}

/// Final result of a headless run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionResult {
    /// Best pattern of the final population; `None` when it is empty.
    pub best: Option<PatternSnapshot>,
    pub stats: EvolutionStats,
    pub history: EvolutionHistory,
}

/// Statistics from a headless run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Total generations run.
    pub generations: usize,
    /// Total pattern evaluations performed.
    pub total_evaluations: u64,
    /// Best fitness achieved.
    pub best_fitness: f32,
    /// Average fitness of final population.
    pub final_avg_fitness: f32,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    pub stop_reason: StopReason,
}

/// Reason a headless run stopped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Reached maximum generations.
    MaxGenerations,
    /// Reached target fitness.
    TargetReached,
    /// Stagnation limit hit.
    Stagnation,
    /// Cancelled through the cancel handle.
    Cancelled,
}
