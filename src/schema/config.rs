//! Configuration types for Project Brush runs.

use serde::{Deserialize, Serialize};

/// Top-level configuration for a Brush session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrushConfig {
    /// Output raster size.
    #[serde(default)]
    pub canvas: CanvasConfig,
    /// Generator network topology and parameter bounds.
    #[serde(default)]
    pub network: NetworkConfig,
    /// User-tunable evolution parameters.
    #[serde(default)]
    pub params: EvolutionParameters,
    /// Genetic operator settings.
    #[serde(default)]
    pub genetics: GeneticsConfig,
    /// Fitness mode and metrics.
    #[serde(default)]
    pub fitness: FitnessConfig,
    /// Stop conditions for headless runs.
    #[serde(default)]
    pub run: RunConfig,
    /// Export settings.
    #[serde(default)]
    pub output: OutputConfig,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            canvas: CanvasConfig::default(),
            network: NetworkConfig::default(),
            params: EvolutionParameters::default(),
            genetics: GeneticsConfig::default(),
            fitness: FitnessConfig::default(),
            run: RunConfig::default(),
            output: OutputConfig::default(),
            random_seed: None,
        }
    }
}

/// Raster size of every generated pattern.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanvasConfig {
    pub width: usize,
    pub height: usize,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
        }
    }
}

/// Hidden layer activation function.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Activation {
    #[default]
    Tanh,
    Sin,
    Gaussian,
    Sigmoid,
}

impl Activation {
    #[inline]
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Tanh => x.tanh(),
            Activation::Sin => x.sin(),
            Activation::Gaussian => (-x * x).exp(),
            Activation::Sigmoid => sigmoid(x),
        }
    }
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Generator network configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// Width of each hidden layer.
    #[serde(default = "default_hidden_layers")]
    pub hidden_layers: Vec<usize>,
    /// Length of the latent input vector fed to every pixel.
    #[serde(default = "default_latent_dim")]
    pub latent_dim: usize,
    /// Hidden layer activation.
    #[serde(default)]
    pub activation: Activation,
    /// Coordinates span `[-input_scale, input_scale]`.
    #[serde(default = "default_input_scale")]
    pub input_scale: f32,
    /// Bounds for weights and biases.
    #[serde(default = "default_weight_bounds")]
    pub weight_bounds: (f32, f32),
    /// Bounds for latent inputs.
    #[serde(default = "default_latent_bounds")]
    pub latent_bounds: (f32, f32),
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            hidden_layers: default_hidden_layers(),
            latent_dim: default_latent_dim(),
            activation: Activation::default(),
            input_scale: default_input_scale(),
            weight_bounds: default_weight_bounds(),
            latent_bounds: default_latent_bounds(),
        }
    }
}

/// Coordinate inputs per pixel: x, y, radius, bias.
pub const COORDINATE_INPUTS: usize = 4;

impl NetworkConfig {
    /// Number of network inputs per pixel.
    pub fn input_size(&self) -> usize {
        COORDINATE_INPUTS + self.latent_dim
    }

    /// Layer sizes from input to output, e.g. `[12, 16, 16, 1]`.
    pub fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(self.hidden_layers.len() + 2);
        sizes.push(self.input_size());
        sizes.extend(self.hidden_layers.iter().copied());
        sizes.push(1);
        sizes
    }
}

fn default_hidden_layers() -> Vec<usize> {
    vec![16, 16]
}
fn default_latent_dim() -> usize {
    8
}
fn default_input_scale() -> f32 {
    1.0
}
fn default_weight_bounds() -> (f32, f32) {
    (-2.0, 2.0)
}
fn default_latent_bounds() -> (f32, f32) {
    (-1.0, 1.0)
}

/// Smallest accepted population.
pub const MIN_POPULATION: usize = 1;
/// Largest accepted population.
pub const MAX_POPULATION: usize = 4096;

/// Parameters the user tunes while a session is live.
///
/// The controller is the only writer; the engine reads a copy once per
/// generation step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EvolutionParameters {
    /// Per-element mutation probability (0.0-1.0).
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f32,
    /// Crossover probability per offspring (0.0-1.0).
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f32,
    /// Number of patterns per generation.
    #[serde(default = "default_population_size")]
    pub population_size: usize,
}

impl Default for EvolutionParameters {
    fn default() -> Self {
        Self {
            mutation_rate: default_mutation_rate(),
            crossover_rate: default_crossover_rate(),
            population_size: default_population_size(),
        }
    }
}

fn default_mutation_rate() -> f32 {
    0.1
}
fn default_crossover_rate() -> f32 {
    0.7
}
fn default_population_size() -> usize {
    16
}

impl EvolutionParameters {
    /// Check every field against its bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_rate("mutation_rate", self.mutation_rate)?;
        check_rate("crossover_rate", self.crossover_rate)?;
        if !(MIN_POPULATION..=MAX_POPULATION).contains(&self.population_size) {
            return Err(ConfigError::InvalidPopulation(self.population_size));
        }
        Ok(())
    }
}

fn check_rate(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidRate { name, value })
    }
}

/// Genetic operator settings that are not exposed as live parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneticsConfig {
    /// Selection method.
    #[serde(default)]
    pub selection: SelectionMethod,
    /// Crossover method.
    #[serde(default)]
    pub crossover: CrossoverMethod,
    /// Mutation strength (std deviation relative to the bound width).
    #[serde(default = "default_mutation_strength")]
    pub mutation_strength: f32,
    /// Number of best patterns carried over unchanged.
    #[serde(default = "default_elitism")]
    pub elitism: usize,
}

impl Default for GeneticsConfig {
    fn default() -> Self {
        Self {
            selection: SelectionMethod::default(),
            crossover: CrossoverMethod::default(),
            mutation_strength: default_mutation_strength(),
            elitism: default_elitism(),
        }
    }
}

fn default_mutation_strength() -> f32 {
    0.1
}
fn default_elitism() -> usize {
    1
}

/// Parent selection method.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "method")]
pub enum SelectionMethod {
    /// Fitness-proportionate selection.
    #[default]
    RouletteWheel,
    /// Tournament selection with configurable size.
    Tournament {
        #[serde(default = "default_tournament_size")]
        size: usize,
    },
    /// Probability proportional to rank.
    RankBased,
}

fn default_tournament_size() -> usize {
    3
}

/// How two parent genomes are combined.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum CrossoverMethod {
    /// Element-wise mean of both parents.
    #[default]
    Average,
    /// Linear blend with one random factor per child.
    Blend,
    /// Each element taken from a random parent.
    Uniform,
}

/// Where fitness comes from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum FitnessMode {
    /// Automated metrics only.
    Objective,
    /// User ratings only; unrated patterns stay unscored.
    Interactive,
    /// Metrics blended with the user rating when one exists.
    #[default]
    Hybrid,
}

/// Fitness configuration with weighted metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitnessConfig {
    #[serde(default)]
    pub mode: FitnessMode,
    /// Objective metrics and their weights.
    #[serde(default = "default_metrics")]
    pub metrics: Vec<WeightedMetric>,
    /// Share of the user rating in hybrid mode (clamped to 0.0-1.0).
    #[serde(default = "default_user_weight")]
    pub user_weight: f32,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            mode: FitnessMode::default(),
            metrics: default_metrics(),
            user_weight: default_user_weight(),
        }
    }
}

fn default_metrics() -> Vec<WeightedMetric> {
    vec![
        WeightedMetric {
            metric: FitnessMetric::Symmetry,
            weight: 0.4,
        },
        WeightedMetric {
            metric: FitnessMetric::Complexity,
            weight: 0.3,
        },
        WeightedMetric {
            metric: FitnessMetric::Contrast,
            weight: 0.3,
        },
    ]
}

fn default_user_weight() -> f32 {
    0.3
}

/// A fitness metric with associated weight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightedMetric {
    pub metric: FitnessMetric,
    pub weight: f32,
}

/// Objective image metrics. Every score lies in `[0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum FitnessMetric {
    /// Left/right mirror symmetry.
    Symmetry,
    /// Normalized histogram entropy.
    Complexity,
    /// Standard deviation of the intensities, floored at 0.1.
    Contrast,
    /// Fraction of pixels on a Sobel edge.
    EdgeDensity {
        #[serde(default = "default_edge_threshold")]
        threshold: f32,
    },
    /// Fraction of pixels above a threshold.
    ActiveArea {
        #[serde(default = "default_active_threshold")]
        threshold: f32,
    },
    /// Balance of intensity clusters.
    Coherence {
        #[serde(default = "default_clusters")]
        clusters: usize,
    },
}

impl FitnessMetric {
    /// Short display name.
    pub fn name(&self) -> &'static str {
        match self {
            FitnessMetric::Symmetry => "symmetry",
            FitnessMetric::Complexity => "complexity",
            FitnessMetric::Contrast => "contrast",
            FitnessMetric::EdgeDensity { .. } => "edge_density",
            FitnessMetric::ActiveArea { .. } => "active_area",
            FitnessMetric::Coherence { .. } => "coherence",
        }
    }
}

fn default_edge_threshold() -> f32 {
    0.2
}
fn default_active_threshold() -> f32 {
    0.1
}
fn default_clusters() -> usize {
    3
}

/// Stop conditions for headless runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
    /// Stop once the best fitness reaches this value.
    #[serde(default)]
    pub target_fitness: Option<f32>,
    /// Stop if the best fitness has not improved for N generations.
    #[serde(default)]
    pub stagnation_limit: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_generations: default_max_generations(),
            target_fitness: None,
            stagnation_limit: None,
        }
    }
}

fn default_max_generations() -> usize {
    50
}

/// Color mapping used for image and video export.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Palette {
    #[default]
    Grayscale,
    Viridis,
}

/// Export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving every export.
    #[serde(default = "default_export_dir")]
    pub export_dir: String,
    #[serde(default)]
    pub palette: Palette,
    /// Frame rate of films and videos.
    #[serde(default = "default_fps")]
    pub fps: f32,
    /// Path or name of the ffmpeg binary.
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
    /// Append per-generation statistics to `evolution_log.jsonl`.
    #[serde(default)]
    pub log_statistics: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            export_dir: default_export_dir(),
            palette: Palette::default(),
            fps: default_fps(),
            ffmpeg: default_ffmpeg(),
            log_statistics: false,
        }
    }
}

fn default_export_dir() -> String {
    "exports".to_string()
}
fn default_fps() -> f32 {
    5.0
}
fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

impl BrushConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.network.hidden_layers.contains(&0) {
            return Err(ConfigError::EmptyLayer);
        }
        if self.network.input_scale <= 0.0 {
            return Err(ConfigError::InvalidInputScale);
        }

        self.params.validate()?;

        if self.genetics.mutation_strength < 0.0 {
            return Err(ConfigError::InvalidMutationStrength);
        }
        if let SelectionMethod::Tournament { size } = self.genetics.selection
            && size == 0
        {
            return Err(ConfigError::InvalidTournament);
        }

        if self.fitness.mode != FitnessMode::Interactive && self.fitness.metrics.is_empty() {
            return Err(ConfigError::NoMetrics);
        }
        for m in &self.fitness.metrics {
            if m.weight < 0.0 {
                return Err(ConfigError::InvalidWeight(format!(
                    "Weight {} for {} must be non-negative",
                    m.weight,
                    m.metric.name()
                )));
            }
            if let FitnessMetric::Coherence { clusters } = m.metric
                && clusters < 2
            {
                return Err(ConfigError::InvalidWeight(format!(
                    "coherence needs at least 2 clusters, got {clusters}"
                )));
            }
        }

        let check_bounds = |bounds: (f32, f32), name: &str| {
            if bounds.0 > bounds.1 {
                Err(ConfigError::InvalidBounds(format!(
                    "{} min ({}) > max ({})",
                    name, bounds.0, bounds.1
                )))
            } else {
                Ok(())
            }
        };
        check_bounds(self.network.weight_bounds, "weight")?;
        check_bounds(self.network.latent_bounds, "latent")?;

        if self.output.fps <= 0.0 {
            return Err(ConfigError::InvalidFrameRate);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("Canvas dimensions must be non-zero")]
    InvalidDimensions,
    #[error("Hidden layers must have at least one unit")]
    EmptyLayer,
    #[error("Input scale must be positive")]
    InvalidInputScale,
    #[error("{name} must be within 0.0..=1.0, got {value}")]
    InvalidRate { name: &'static str, value: f32 },
    #[error("Population size must be within 1..=4096, got {0}")]
    InvalidPopulation(usize),
    #[error("Mutation strength must be non-negative")]
    InvalidMutationStrength,
    #[error("Tournament size must be at least 1")]
    InvalidTournament,
    #[error("No fitness metrics specified")]
    NoMetrics,
    #[error("Invalid metric: {0}")]
    InvalidWeight(String),
    #[error("Invalid parameter bounds: {0}")]
    InvalidBounds(String),
    #[error("Frame rate must be positive")]
    InvalidFrameRate,
}
