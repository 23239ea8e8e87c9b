//! Genome representation of a generator network.

use serde::{Deserialize, Serialize};

use super::NetworkConfig;

/// Evolvable parameters of one generator network.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkGenome {
    /// Dense layers from input to output.
    pub layers: Vec<LayerGenome>,
    /// Latent input vector shared by every pixel.
    pub latent: Vec<f32>,
}

/// One dense layer: `outputs x inputs` weights (row-major) plus biases.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayerGenome {
    pub inputs: usize,
    pub outputs: usize,
    pub weights: Vec<f32>,
    pub biases: Vec<f32>,
}

impl LayerGenome {
    /// Zero-initialized layer.
    pub fn zeros(inputs: usize, outputs: usize) -> Self {
        Self {
            inputs,
            outputs,
            weights: vec![0.0; inputs * outputs],
            biases: vec![0.0; outputs],
        }
    }
}

impl NetworkGenome {
    /// Zero-initialized genome with the topology described by `config`.
    pub fn zeros(config: &NetworkConfig) -> Self {
        let sizes = config.layer_sizes();
        let layers = sizes
            .windows(2)
            .map(|w| LayerGenome::zeros(w[0], w[1]))
            .collect();
        Self {
            layers,
            latent: vec![0.0; config.latent_dim],
        }
    }

    /// Get the total number of evolvable parameters.
    pub fn parameter_count(&self) -> usize {
        let layer_params: usize = self
            .layers
            .iter()
            .map(|l| l.weights.len() + l.biases.len())
            .sum();
        layer_params + self.latent.len()
    }

    /// True when the genome was built for the topology in `config`.
    pub fn matches(&self, config: &NetworkConfig) -> bool {
        let sizes = config.layer_sizes();
        self.latent.len() == config.latent_dim
            && self.layers.len() + 1 == sizes.len()
            && self.layers.iter().zip(sizes.windows(2)).all(|(l, w)| {
                l.inputs == w[0]
                    && l.outputs == w[1]
                    && l.weights.len() == w[0] * w[1]
                    && l.biases.len() == w[1]
            })
    }

    /// Visit every weight and bias.
    pub fn weights_mut(&mut self) -> impl Iterator<Item = &mut f32> {
        self.layers
            .iter_mut()
            .flat_map(|l| l.weights.iter_mut().chain(l.biases.iter_mut()))
    }

    /// Read every weight and bias in genome order.
    pub fn weights(&self) -> impl Iterator<Item = &f32> {
        self.layers
            .iter()
            .flat_map(|l| l.weights.iter().chain(l.biases.iter()))
    }
}
