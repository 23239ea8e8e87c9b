//! Genetic algorithm driving pattern populations from one generation to the next.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::compute::{Generator, Pattern, rank_indices};
use crate::schema::{
    BrushConfig, EvolutionHistory, EvolutionParameters, EvolutionResult, EvolutionStats,
    GenerationStats, SelectionMethod, StopReason,
};

use super::fitness::FitnessEvaluator;
use super::genome::{GenomeRng, genome_distance};

/// Patterns sampled when estimating genome diversity.
const DIVERSITY_SAMPLE: usize = 64;

/// Evolution engine that owns the population and runs the search.
///
/// Clones share the cancel handle.
#[derive(Clone)]
pub struct EvolutionEngine {
    config: BrushConfig,
    rng: GenomeRng,
    generator: Generator,
    evaluator: FitnessEvaluator,
    population: Vec<Pattern>,
    history: EvolutionHistory,
    latest: Option<GenerationStats>,
    generation: usize,
    best_fitness: f32,
    stagnation_count: usize,
    next_id: u64,
    evaluations: u64,
    cancelled: Arc<AtomicBool>,
}

impl EvolutionEngine {
    /// Create a new evolution engine.
    pub fn new(config: BrushConfig) -> Self {
        let seed = config.random_seed.unwrap_or_else(rand::random);
        let generator = Generator::new(config.network.clone(), config.canvas);
        let evaluator = FitnessEvaluator::new(config.fitness.clone());

        Self {
            config,
            rng: GenomeRng::new(seed),
            generator,
            evaluator,
            population: Vec::new(),
            history: EvolutionHistory::default(),
            latest: None,
            generation: 0,
            best_fitness: f32::NEG_INFINITY,
            stagnation_count: 0,
            next_id: 0,
            evaluations: 0,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &BrushConfig {
        &self.config
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    pub fn evaluator(&self) -> &FitnessEvaluator {
        &self.evaluator
    }

    pub fn population(&self) -> &[Pattern] {
        &self.population
    }

    pub fn history(&self) -> &EvolutionHistory {
        &self.history
    }

    /// Index of the current generation.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Stats recorded for the current generation.
    pub fn latest_stats(&self) -> Option<&GenerationStats> {
        self.latest.as_ref()
    }

    /// Best fitness seen since the population was initialized.
    pub fn best_fitness(&self) -> f32 {
        self.best_fitness.max(0.0)
    }

    pub fn total_evaluations(&self) -> u64 {
        self.evaluations
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Drop the population and every counter.
    pub fn reset(&mut self) {
        self.population.clear();
        self.history.clear();
        self.latest = None;
        self.generation = 0;
        self.best_fitness = f32::NEG_INFINITY;
        self.stagnation_count = 0;
    }

    /// Create, render and evaluate a random population as generation 0.
    pub fn initialize(&mut self, params: &EvolutionParameters) -> GenerationStats {
        self.reset();
        self.population = self.random_population(params.population_size, 0);
        self.record_generation()
    }

    /// Advance one generation using `params`. Initializes first when no
    /// population exists.
    pub fn step(&mut self, params: &EvolutionParameters) -> GenerationStats {
        if self.population.is_empty() {
            return self.initialize(params);
        }

        let current = std::mem::take(&mut self.population);
        self.population = self.advance(&current, params);
        self.generation += 1;
        self.record_generation()
    }

    /// Build the next population from `population`.
    ///
    /// Unevaluated patterns are scored first. The result always holds exactly
    /// `params.population_size` rendered and evaluated patterns; an empty
    /// input yields a fresh random population.
    pub fn advance(
        &mut self,
        population: &[Pattern],
        params: &EvolutionParameters,
    ) -> Vec<Pattern> {
        let size = params.population_size;
        let next_generation = population
            .iter()
            .map(|p| p.generation + 1)
            .max()
            .unwrap_or(0);

        if population.is_empty() {
            return self.random_population(size, next_generation);
        }

        let mut current = population.to_vec();
        self.evaluate_pending(&mut current);

        let order = rank_indices(&current);
        let selection = self.config.genetics.selection.clone();
        let weights = selection_weights(&selection, &current, &order);

        let mut next = Vec::with_capacity(size);

        // Elitism: keep best individuals
        let elites = self.config.genetics.elitism.min(size).min(current.len());
        for &i in order.iter().take(elites) {
            let mut elite = current[i].clone();
            elite.generation = next_generation;
            next.push(elite);
        }

        let network = self.config.network.clone();
        let method = self.config.genetics.crossover;
        let strength = self.config.genetics.mutation_strength;

        while next.len() < size {
            let idx1 = select_index(&mut self.rng, &selection, &current, &weights);
            let idx2 = select_index(&mut self.rng, &selection, &current, &weights);

            let mut genome = if self.rng.chance(params.crossover_rate) {
                self.rng
                    .crossover(&current[idx1].genome, &current[idx2].genome, method)
            } else {
                current[idx1].genome.clone()
            };
            self.rng
                .mutate(&mut genome, params.mutation_rate, strength, &network);

            let id = self.allocate_id();
            next.push(Pattern::unrendered(id, genome, next_generation));
        }

        self.evaluate_pending(&mut next);
        next
    }

    /// Apply a user rating to one pattern and rescore it.
    ///
    /// Returns the new fitness. Out-of-range indices are ignored.
    pub fn rate(&mut self, index: usize, rating: f32) -> Option<f32> {
        let pattern = self.population.get_mut(index)?;
        pattern.rating = Some(rating.clamp(0.0, 1.0));
        self.evaluator.rescore(pattern)
    }

    /// Best pattern of the current population.
    pub fn best(&self) -> Option<&Pattern> {
        rank_indices(&self.population)
            .first()
            .map(|&i| &self.population[i])
    }

    /// Summarize the current population without recording it.
    pub fn stats(&self) -> GenerationStats {
        let scores: Vec<f32> = self.population.iter().filter_map(|p| p.fitness).collect();
        let rated = self.population.iter().filter(|p| p.rating.is_some()).count();

        let (best, average, min, std) = if scores.is_empty() {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            let n = scores.len() as f32;
            let average = scores.iter().sum::<f32>() / n;
            let variance = scores.iter().map(|s| (s - average).powi(2)).sum::<f32>() / n;
            (
                scores.iter().copied().fold(f32::NEG_INFINITY, f32::max),
                average,
                scores.iter().copied().fold(f32::INFINITY, f32::min),
                variance.sqrt(),
            )
        };

        GenerationStats {
            generation: self.generation,
            best_fitness: best,
            average_fitness: average,
            min_fitness: min,
            fitness_std: std,
            diversity: self.compute_diversity(),
            rated,
            scored: scores.len(),
            population_size: self.population.len(),
        }
    }

    fn record_generation(&mut self) -> GenerationStats {
        let stats = self.stats();

        if stats.scored > 0 && stats.best_fitness > self.best_fitness {
            self.best_fitness = stats.best_fitness;
            self.stagnation_count = 0;
        } else {
            self.stagnation_count += 1;
        }

        self.history.push(&stats);
        self.latest = Some(stats.clone());
        log::debug!(
            "generation {}: best {:.4}, avg {:.4}, diversity {:.4}",
            stats.generation,
            stats.best_fitness,
            stats.average_fitness,
            stats.diversity
        );
        stats
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn random_population(&mut self, size: usize, generation: usize) -> Vec<Pattern> {
        let mut population: Vec<Pattern> = (0..size)
            .map(|_| {
                let genome = self.rng.random_genome(&self.config.network);
                let id = self.allocate_id();
                Pattern::unrendered(id, genome, generation)
            })
            .collect();
        self.evaluate_pending(&mut population);
        population
    }

    /// Render and score every pattern that has not been evaluated yet.
    fn evaluate_pending(&mut self, patterns: &mut [Pattern]) {
        let generator = &self.generator;
        let evaluator = &self.evaluator;

        // Parallel evaluation
        let evaluated: u64 = patterns
            .par_iter_mut()
            .map(|pattern| {
                let unrendered = pattern.canvas.is_empty();
                if unrendered {
                    pattern.canvas = generator.render(&pattern.genome);
                }
                if unrendered || (pattern.fitness.is_none() && pattern.metrics.is_empty()) {
                    evaluator.evaluate(pattern);
                    1
                } else {
                    0
                }
            })
            .sum();

        self.evaluations += evaluated;
    }

    /// Mean pairwise genome distance over a sample of the population.
    fn compute_diversity(&self) -> f32 {
        let sample = &self.population[..self.population.len().min(DIVERSITY_SAMPLE)];
        if sample.len() < 2 {
            return 0.0;
        }

        let mut total_distance = 0.0f32;
        let mut count = 0;
        for i in 0..sample.len() {
            for j in (i + 1)..sample.len() {
                total_distance += genome_distance(&sample[i].genome, &sample[j].genome);
                count += 1;
            }
        }
        total_distance / count as f32
    }

    /// Check if evolution should stop.
    fn should_stop(&self) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }

        let run = &self.config.run;
        if self.generation >= run.max_generations {
            return Some(StopReason::MaxGenerations);
        }

        if let Some(target) = run.target_fitness
            && self.best_fitness >= target
        {
            return Some(StopReason::TargetReached);
        }

        if let Some(limit) = run.stagnation_limit
            && self.stagnation_count >= limit
        {
            return Some(StopReason::Stagnation);
        }

        None
    }

    /// Run evolution headless, calling `callback` after every generation
    /// (including the initial one).
    pub fn run_with_callback<F>(
        &mut self,
        params: &EvolutionParameters,
        mut callback: F,
    ) -> EvolutionResult
    where
        F: FnMut(&GenerationStats, &[Pattern]),
    {
        let start_time = std::time::Instant::now();

        let stats = self.initialize(params);
        callback(&stats, &self.population);

        let stop_reason = loop {
            if let Some(reason) = self.should_stop() {
                break reason;
            }

            let stats = self.step(params);
            callback(&stats, &self.population);
        };
        // A cancellation only ends the run it interrupted.
        self.cancelled.store(false, Ordering::Relaxed);

        let elapsed = start_time.elapsed().as_secs_f64();
        let final_stats = self.stats();
        log::info!(
            "Evolution stopped after {} generations ({:?}), best fitness {:.4}",
            self.generation,
            stop_reason,
            self.best_fitness()
        );

        EvolutionResult {
            best: self.best().map(Pattern::to_snapshot),
            stats: EvolutionStats {
                generations: self.generation,
                total_evaluations: self.evaluations,
                best_fitness: self.best_fitness(),
                final_avg_fitness: final_stats.average_fitness,
                elapsed_seconds: elapsed,
                stop_reason,
            },
            history: self.history.clone(),
        }
    }

    /// Run evolution (blocking).
    pub fn run(&mut self, params: &EvolutionParameters) -> EvolutionResult {
        self.run_with_callback(params, |_, _| {})
    }
}

/// Per-pattern selection weights for the weighted methods.
fn selection_weights(
    method: &SelectionMethod,
    population: &[Pattern],
    order: &[usize],
) -> Vec<f32> {
    match method {
        SelectionMethod::RouletteWheel => {
            population.iter().map(Pattern::selection_weight).collect()
        }
        SelectionMethod::RankBased => {
            // Tied scores share the mean of their rank weights; unscored
            // patterns get nothing.
            let n = order.len();
            let mut weights = vec![0.0; population.len()];
            let mut start = 0;
            while start < n {
                let Some(score) = population[order[start]].fitness else {
                    break;
                };
                let mut end = start + 1;
                while end < n && population[order[end]].fitness == Some(score) {
                    end += 1;
                }
                let shared = (start..end).map(|rank| (n - rank) as f32).sum::<f32>()
                    / (end - start) as f32;
                for &i in &order[start..end] {
                    weights[i] = shared;
                }
                start = end;
            }
            weights
        }
        SelectionMethod::Tournament { .. } => Vec::new(),
    }
}

/// Select a parent index using the specified method.
fn select_index(
    rng: &mut GenomeRng,
    method: &SelectionMethod,
    population: &[Pattern],
    weights: &[f32],
) -> usize {
    match method {
        SelectionMethod::Tournament { size } => {
            let score = |i: usize| population[i].fitness.unwrap_or(f32::NEG_INFINITY);
            let mut best_idx = rng.index(population.len());
            for _ in 1..(*size).max(1) {
                let idx = rng.index(population.len());
                if score(idx) > score(best_idx) {
                    best_idx = idx;
                }
            }
            best_idx
        }
        SelectionMethod::RouletteWheel | SelectionMethod::RankBased => rng.weighted_index(weights),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CanvasConfig, FitnessMode, NetworkConfig, NetworkGenome, RunConfig};
    use proptest::prelude::*;

    fn test_config() -> BrushConfig {
        BrushConfig {
            canvas: CanvasConfig {
                width: 12,
                height: 12,
            },
            network: NetworkConfig {
                hidden_layers: vec![6],
                latent_dim: 2,
                ..Default::default()
            },
            run: RunConfig {
                max_generations: 3,
                ..Default::default()
            },
            random_seed: Some(11),
            ..Default::default()
        }
    }

    fn params(size: usize) -> EvolutionParameters {
        EvolutionParameters {
            population_size: size,
            ..Default::default()
        }
    }

    #[test]
    fn test_evolution_engine_creation() {
        let mut engine = EvolutionEngine::new(test_config());
        let stats = engine.initialize(&params(10));

        assert_eq!(engine.population().len(), 10);
        assert_eq!(stats.generation, 0);
        assert_eq!(stats.scored, 10);
        assert!(engine.population().iter().all(|p| !p.canvas.is_empty()));
    }

    #[test]
    fn test_step_resizes_population() {
        let mut engine = EvolutionEngine::new(test_config());
        engine.initialize(&params(6));

        let stats = engine.step(&params(9));
        assert_eq!(engine.population().len(), 9);
        assert_eq!(stats.generation, 1);

        engine.step(&params(1));
        assert_eq!(engine.population().len(), 1);
        assert_eq!(engine.history().len(), 3);
    }

    #[test]
    fn test_elite_survives_unchanged() {
        let mut engine = EvolutionEngine::new(test_config());
        engine.initialize(&params(8));
        let best = engine.best().cloned().unwrap();

        engine.step(&params(8));
        let carried = engine
            .population()
            .iter()
            .find(|p| p.id == best.id)
            .expect("elite carried over");
        assert_eq!(carried.genome, best.genome);
        assert_eq!(carried.canvas, best.canvas);
        assert_eq!(carried.fitness, best.fitness);
        assert_eq!(carried.generation, 1);
    }

    #[test]
    fn test_empty_population_advances_to_random() {
        let mut engine = EvolutionEngine::new(test_config());
        let next = engine.advance(&[], &params(4));
        assert_eq!(next.len(), 4);
        assert!(next.iter().all(|p| p.fitness.is_some()));
    }

    #[test]
    fn test_same_seed_same_run() {
        let mut a = EvolutionEngine::new(test_config());
        let mut b = EvolutionEngine::new(test_config());
        let ra = a.run(&params(5));
        let rb = b.run(&params(5));
        assert_eq!(ra.history, rb.history);
    }

    #[test]
    fn test_interactive_rating_rescores() {
        let mut config = test_config();
        config.fitness.mode = FitnessMode::Interactive;
        let mut engine = EvolutionEngine::new(config);
        engine.initialize(&params(4));

        assert!(engine.population().iter().all(|p| p.fitness.is_none()));
        assert_eq!(engine.rate(2, 0.75), Some(0.75));
        assert_eq!(engine.rate(10, 0.5), None);
        assert_eq!(engine.best().map(|p| p.id), Some(engine.population()[2].id));
        assert_eq!(engine.stats().rated, 1);
    }

    #[test]
    fn test_unrated_interactive_run_selects_uniformly() {
        let mut config = test_config();
        config.fitness.mode = FitnessMode::Interactive;
        let mut engine = EvolutionEngine::new(config);
        engine.initialize(&params(5));
        let stats = engine.step(&params(5));
        assert_eq!(stats.scored, 0);
        assert_eq!(engine.population().len(), 5);
    }

    #[test]
    fn test_selection_methods() {
        for selection in [
            SelectionMethod::RouletteWheel,
            SelectionMethod::Tournament { size: 3 },
            SelectionMethod::RankBased,
        ] {
            let mut config = test_config();
            config.genetics.selection = selection;
            let mut engine = EvolutionEngine::new(config);
            let result = engine.run(&params(6));
            assert_eq!(result.stats.generations, 3);
            assert_eq!(engine.population().len(), 6);
        }
    }

    #[test]
    fn test_evolution_run() {
        let mut engine = EvolutionEngine::new(test_config());
        let mut calls = 0;
        let result = engine.run_with_callback(&params(5), |_, population| {
            assert_eq!(population.len(), 5);
            calls += 1;
        });

        assert_eq!(calls, 4);
        assert_eq!(result.stats.generations, 3);
        assert_eq!(result.stats.stop_reason, StopReason::MaxGenerations);
        assert!(result.stats.best_fitness >= 0.0);
        assert!(result.best.is_some());
        assert_eq!(result.history.len(), 4);
    }

    #[test]
    fn test_target_fitness_stops_early() {
        let mut config = test_config();
        config.run.max_generations = 100;
        config.run.target_fitness = Some(0.0);
        let mut engine = EvolutionEngine::new(config);
        let result = engine.run(&params(4));
        assert_eq!(result.stats.stop_reason, StopReason::TargetReached);
        assert_eq!(result.stats.generations, 0);
    }

    #[test]
    fn test_stagnation_stops() {
        let mut config = test_config();
        config.run.max_generations = 100;
        config.run.stagnation_limit = Some(2);
        config.fitness.mode = FitnessMode::Interactive;
        let mut engine = EvolutionEngine::new(config);
        let result = engine.run(&params(3));
        assert_eq!(result.stats.stop_reason, StopReason::Stagnation);
    }

    #[test]
    fn test_cancellation() {
        let mut config = test_config();
        config.run.max_generations = 100;
        let mut engine = EvolutionEngine::new(config);
        let cancel = engine.cancel_handle();

        // Cancel immediately
        cancel.store(true, Ordering::Relaxed);

        let result = engine.run(&params(5));
        assert_eq!(result.stats.stop_reason, StopReason::Cancelled);
    }

    #[test]
    fn test_cancellation_does_not_outlive_run() {
        let mut engine = EvolutionEngine::new(test_config());
        engine.cancel_handle().store(true, Ordering::Relaxed);
        assert_eq!(
            engine.run(&params(4)).stats.stop_reason,
            StopReason::Cancelled
        );

        let result = engine.run(&params(4));
        assert_eq!(result.stats.stop_reason, StopReason::MaxGenerations);
        assert_eq!(result.stats.generations, 3);
    }

    fn scored(fitness: &[Option<f32>]) -> Vec<Pattern> {
        let genome = NetworkGenome::zeros(&NetworkConfig::default());
        fitness
            .iter()
            .enumerate()
            .map(|(i, &f)| {
                let mut p = Pattern::unrendered(i as u64, genome.clone(), 0);
                p.fitness = f;
                p
            })
            .collect()
    }

    #[test]
    fn test_rank_weights_ignore_population_order() {
        let unscored = scored(&[None; 4]);
        let weights =
            selection_weights(&SelectionMethod::RankBased, &unscored, &rank_indices(&unscored));
        assert_eq!(weights, vec![0.0; 4]);

        let mut rng = GenomeRng::new(3);
        let mut counts = [0usize; 4];
        for _ in 0..4000 {
            counts[select_index(&mut rng, &SelectionMethod::RankBased, &unscored, &weights)] += 1;
        }
        assert!(counts.iter().all(|&c| (800..1200).contains(&c)), "{counts:?}");
    }

    #[test]
    fn test_rank_weights_share_ties() {
        let population = scored(&[Some(0.2), Some(0.9), Some(0.2), None, Some(0.2)]);
        let weights = selection_weights(
            &SelectionMethod::RankBased,
            &population,
            &rank_indices(&population),
        );
        // Ranks 5 | 4 3 2 shared | 0
        assert_eq!(weights, vec![3.0, 5.0, 3.0, 0.0, 3.0]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_advance_preserves_population_size(
            start in 1usize..10,
            size in 1usize..12,
            mutation_rate in 0.0f32..=1.0,
            crossover_rate in 0.0f32..=1.0,
            elitism in 0usize..4,
        ) {
            let mut config = test_config();
            config.genetics.elitism = elitism;
            let mut engine = EvolutionEngine::new(config);
            engine.initialize(&params(start));

            let current = engine.population().to_vec();
            let next_params = EvolutionParameters { mutation_rate, crossover_rate, population_size: size };
            let next = engine.advance(&current, &next_params);
            prop_assert_eq!(next.len(), size);
            prop_assert!(next.iter().all(|p| p.canvas.len() == 144));
        }
    }
}
