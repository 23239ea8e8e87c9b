//! Quick evolution performance test

use brush::{
    EvolutionEngine,
    schema::{BrushConfig, CanvasConfig, EvolutionParameters, RunConfig, SelectionMethod},
};
use std::time::Instant;

fn main() {
    println!("=== Evolution Performance Test ===\n");

    // Test different canvas sizes
    for size in [32, 64, 128] {
        println!("Canvas size: {}x{}", size, size);

        let mut config = BrushConfig {
            canvas: CanvasConfig {
                width: size,
                height: size,
            },
            params: EvolutionParameters {
                mutation_rate: 0.2,
                crossover_rate: 0.8,
                population_size: 20,
            },
            run: RunConfig {
                max_generations: 10,
                ..Default::default()
            },
            random_seed: Some(42),
            ..Default::default()
        };
        config.genetics.selection = SelectionMethod::Tournament { size: 3 };
        config.genetics.elitism = 2;
        let params = config.params;

        let start = Instant::now();
        let mut engine = EvolutionEngine::new(config);
        let result = engine.run(&params);
        let elapsed = start.elapsed();

        let total_evals = result.stats.total_evaluations;
        let evals_per_sec = total_evals as f64 / elapsed.as_secs_f64();

        println!("  Generations:    {}", result.stats.generations);
        println!("  Evaluations:    {}", total_evals);
        println!("  Elapsed:        {:.2}s", elapsed.as_secs_f64());
        println!("  Evals/sec:      {:.1}", evals_per_sec);
        println!("  Best fitness:   {:.4}", result.stats.best_fitness);
        println!();
    }

    println!("=== Scalability Test (fixed 64x64 canvas) ===\n");

    // Test different population sizes
    for pop_size in [10, 20, 40, 80] {
        let config = BrushConfig {
            canvas: CanvasConfig {
                width: 64,
                height: 64,
            },
            params: EvolutionParameters {
                population_size: pop_size,
                ..Default::default()
            },
            run: RunConfig {
                max_generations: 5,
                ..Default::default()
            },
            random_seed: Some(42),
            ..Default::default()
        };
        let params = config.params;

        let start = Instant::now();
        let mut engine = EvolutionEngine::new(config);
        let result = engine.run(&params);
        let elapsed = start.elapsed();

        let total_evals = result.stats.total_evaluations;
        let evals_per_sec = total_evals as f64 / elapsed.as_secs_f64();

        println!(
            "Population {}: {} evals in {:.2}s ({:.1} evals/sec)",
            pop_size,
            total_evals,
            elapsed.as_secs_f64(),
            evals_per_sec
        );
    }
}
