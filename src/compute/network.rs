//! Pattern generator: a fixed-topology feed-forward network queried per pixel.
//!
//! Every pixel feeds `(x, y, r, 1, latent...)` through the network and the
//! sigmoid output becomes its intensity. The network is never trained; the
//! genetic algorithm changes its weights and latent inputs directly.

use crate::schema::{Activation, COORDINATE_INPUTS, CanvasConfig, NetworkConfig, NetworkGenome};

use super::Canvas;
use super::evolution::GenomeRng;

/// Renders genomes into canvases.
#[derive(Debug, Clone)]
pub struct Generator {
    network: NetworkConfig,
    canvas: CanvasConfig,
}

impl Generator {
    pub fn new(network: NetworkConfig, canvas: CanvasConfig) -> Self {
        Self { network, canvas }
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn canvas_size(&self) -> CanvasConfig {
        self.canvas
    }

    /// Build the network for `seed` and render it.
    ///
    /// The same seed always yields the same canvas.
    pub fn generate(&self, seed: u64) -> Canvas {
        let genome = GenomeRng::new(seed).random_genome(&self.network);
        self.render(&genome)
    }

    /// Render a genome at the configured canvas size.
    pub fn render(&self, genome: &NetworkGenome) -> Canvas {
        self.render_at(genome, self.canvas.width, self.canvas.height)
    }

    /// Render a genome at an arbitrary resolution.
    ///
    /// The genome must match this generator's topology.
    pub fn render_at(&self, genome: &NetworkGenome, width: usize, height: usize) -> Canvas {
        debug_assert!(genome.matches(&self.network), "genome/topology mismatch");

        let mut canvas = Canvas::new(width, height);
        let Some(first) = genome.layers.first() else {
            return canvas;
        };
        let last = genome.layers.len() - 1;
        let scale = self.network.input_scale;

        // Latent inputs are identical for every pixel; fold them into the bias once.
        let base: Vec<f32> = (0..first.outputs)
            .map(|o| {
                let row = &first.weights[o * first.inputs..(o + 1) * first.inputs];
                first.biases[o]
                    + row[COORDINATE_INPUTS..]
                        .iter()
                        .zip(&genome.latent)
                        .map(|(w, z)| w * z)
                        .sum::<f32>()
            })
            .collect();

        let mut current: Vec<f32> = Vec::with_capacity(first.outputs);
        let mut next: Vec<f32> = Vec::new();

        for y in 0..height {
            let v = axis(y, height) * scale;
            for x in 0..width {
                let u = axis(x, width) * scale;
                let coords = [u, v, (u * u + v * v).sqrt(), 1.0];

                current.clear();
                let activation = self.activation_for(0, last);
                for (o, b) in base.iter().enumerate() {
                    let row = &first.weights[o * first.inputs..o * first.inputs + COORDINATE_INPUTS];
                    let z = b + row.iter().zip(&coords).map(|(w, c)| w * c).sum::<f32>();
                    current.push(activation.apply(z));
                }

                for (i, layer) in genome.layers.iter().enumerate().skip(1) {
                    let activation = self.activation_for(i, last);
                    next.clear();
                    for o in 0..layer.outputs {
                        let row = &layer.weights[o * layer.inputs..(o + 1) * layer.inputs];
                        let z = layer.biases[o]
                            + row.iter().zip(&current).map(|(w, a)| w * a).sum::<f32>();
                        next.push(activation.apply(z));
                    }
                    std::mem::swap(&mut current, &mut next);
                }

                canvas.pixels[y * width + x] = current[0];
            }
        }

        canvas.normalize();
        canvas
    }

    #[inline]
    fn activation_for(&self, layer: usize, last: usize) -> Activation {
        if layer == last {
            Activation::Sigmoid
        } else {
            self.network.activation
        }
    }
}

/// Map a pixel index onto `[-1, 1]`.
#[inline]
fn axis(i: usize, n: usize) -> f32 {
    if n <= 1 {
        0.0
    } else {
        2.0 * i as f32 / (n - 1) as f32 - 1.0
    }
}
