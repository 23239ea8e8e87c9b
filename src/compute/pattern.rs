//! A single generated artwork and its scores.

use crate::schema::{MetricScore, NetworkGenome, PatternSnapshot};

use super::Canvas;
use super::evolution::MetricResult;

/// One member of a population.
#[derive(Debug, Clone)]
pub struct Pattern {
    /// Unique identifier.
    pub id: u64,
    /// Generator parameters.
    pub genome: NetworkGenome,
    /// Rendered content.
    pub canvas: Canvas,
    /// Fitness score; `None` until evaluated, or while unrated in
    /// interactive mode.
    pub fitness: Option<f32>,
    /// User rating in `[0, 1]`.
    pub rating: Option<f32>,
    /// Individual metric results.
    pub metrics: Vec<MetricResult>,
    /// Generation this pattern belongs to.
    pub generation: usize,
}

impl Pattern {
    /// Pattern whose canvas has not been rendered yet.
    pub fn unrendered(id: u64, genome: NetworkGenome, generation: usize) -> Self {
        Self {
            id,
            genome,
            canvas: Canvas::default(),
            fitness: None,
            rating: None,
            metrics: Vec::new(),
            generation,
        }
    }

    /// Fitness used for selection: unset scores count as zero.
    #[inline]
    pub fn selection_weight(&self) -> f32 {
        self.fitness.unwrap_or(0.0).max(0.0)
    }

    /// Convert to snapshot for serialization.
    pub fn to_snapshot(&self) -> PatternSnapshot {
        PatternSnapshot {
            id: self.id,
            fitness: self.fitness,
            rating: self.rating,
            metric_scores: self
                .metrics
                .iter()
                .map(|m| MetricScore {
                    name: m.metric.name().to_string(),
                    score: m.score,
                    weight: m.weight,
                })
                .collect(),
            generation: self.generation,
            genome: self.genome.clone(),
        }
    }
}

/// Order indices best-first. Unset fitness ranks below any score; ties keep
/// population order.
pub fn rank_indices(population: &[Pattern]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..population.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = population[a].fitness.unwrap_or(f32::NEG_INFINITY);
        let fb = population[b].fitness.unwrap_or(f32::NEG_INFINITY);
        fb.total_cmp(&fa)
    });
    order
}
