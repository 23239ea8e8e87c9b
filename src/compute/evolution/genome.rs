//! Genome manipulation utilities for evolutionary search.
//!
//! Provides random generation, crossover, and mutation operations.

use crate::schema::{CrossoverMethod, LayerGenome, NetworkConfig, NetworkGenome};
use rand::distributions::WeightedIndex;
use rand::prelude::*;

/// Random number generator wrapper for genome operations.
#[derive(Clone)]
pub struct GenomeRng {
    rng: StdRng,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generate a random genome within the configured bounds.
    pub fn random_genome(&mut self, config: &NetworkConfig) -> NetworkGenome {
        let sizes = config.layer_sizes();
        let layers = sizes
            .windows(2)
            .map(|w| self.random_layer(w[0], w[1], config.weight_bounds))
            .collect();
        let latent = (0..config.latent_dim)
            .map(|_| self.uniform(config.latent_bounds))
            .collect();

        NetworkGenome { layers, latent }
    }

    fn random_layer(&mut self, inputs: usize, outputs: usize, bounds: (f32, f32)) -> LayerGenome {
        LayerGenome {
            inputs,
            outputs,
            weights: (0..inputs * outputs).map(|_| self.uniform(bounds)).collect(),
            biases: (0..outputs).map(|_| self.uniform(bounds)).collect(),
        }
    }

    /// Uniform random in bounds.
    fn uniform(&mut self, bounds: (f32, f32)) -> f32 {
        self.rng.gen_range(bounds.0..=bounds.1)
    }

    /// Gaussian mutation: add noise to a value.
    pub fn gaussian_mutate(&mut self, value: f32, strength: f32, bounds: (f32, f32)) -> f32 {
        let noise: f32 = self.rng.sample(rand_distr::StandardNormal);
        let mutated = value + noise * strength * (bounds.1 - bounds.0);
        mutated.clamp(bounds.0, bounds.1)
    }

    /// Perform crossover between two genomes of the same topology.
    pub fn crossover(
        &mut self,
        parent1: &NetworkGenome,
        parent2: &NetworkGenome,
        method: CrossoverMethod,
    ) -> NetworkGenome {
        let mut child = parent1.clone();
        let t = self.rng.r#gen::<f32>();

        let mix = |rng: &mut StdRng, a: &mut f32, b: f32| {
            *a = match method {
                CrossoverMethod::Average => (*a + b) * 0.5,
                CrossoverMethod::Blend => blend(*a, b, t),
                CrossoverMethod::Uniform => {
                    if rng.gen_bool(0.5) {
                        *a
                    } else {
                        b
                    }
                }
            };
        };

        for (a, &b) in child.weights_mut().zip(parent2.weights()) {
            mix(&mut self.rng, a, b);
        }
        for (a, &b) in child.latent.iter_mut().zip(&parent2.latent) {
            mix(&mut self.rng, a, b);
        }
        child
    }

    /// Mutate each element independently with probability `rate`.
    pub fn mutate(
        &mut self,
        genome: &mut NetworkGenome,
        rate: f32,
        strength: f32,
        config: &NetworkConfig,
    ) {
        if rate <= 0.0 {
            return;
        }
        for layer in &mut genome.layers {
            for w in layer.weights.iter_mut().chain(layer.biases.iter_mut()) {
                if self.rng.r#gen::<f32>() < rate {
                    *w = self.gaussian_mutate(*w, strength, config.weight_bounds);
                }
            }
        }
        for z in &mut genome.latent {
            if self.rng.r#gen::<f32>() < rate {
                *z = self.gaussian_mutate(*z, strength, config.latent_bounds);
            }
        }
    }

    /// True with probability `p`.
    pub fn chance(&mut self, p: f32) -> bool {
        self.rng.r#gen::<f32>() < p
    }

    /// Uniform index below `n` (`n` must be non-zero).
    pub fn index(&mut self, n: usize) -> usize {
        self.rng.gen_range(0..n)
    }

    /// Pick an index proportionally to `weights`. Falls back to a uniform
    /// pick when every weight is zero.
    pub fn weighted_index(&mut self, weights: &[f32]) -> usize {
        match WeightedIndex::new(weights) {
            Ok(dist) => dist.sample(&mut self.rng),
            Err(_) => self.index(weights.len()),
        }
    }
}

/// Linear blend between two values.
fn blend(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// Mean absolute difference over every genome element.
pub fn genome_distance(g1: &NetworkGenome, g2: &NetworkGenome) -> f32 {
    let mut distance = 0.0f32;
    let mut count = 0usize;

    for (a, b) in g1.weights().zip(g2.weights()) {
        distance += (a - b).abs();
        count += 1;
    }
    for (a, b) in g1.latent.iter().zip(&g2.latent) {
        distance += (a - b).abs();
        count += 1;
    }

    if count > 0 {
        distance / count as f32
    } else {
        0.0
    }
}
