//! Session lifecycle: owns the engine, the live parameters and the output
//! handler.

use std::fmt;
use std::path::PathBuf;

use crate::compute::Pattern;
use crate::compute::evolution::EvolutionEngine;
use crate::output::{FilmStats, OutputError, OutputHandler};
use crate::schema::{
    BrushConfig, ConfigError, EvolutionHistory, EvolutionParameters, GenerationStats,
};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimulationState {
    #[default]
    Idle,
    Running,
    Paused,
}

impl fmt::Display for SimulationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SimulationState::Idle => "idle",
            SimulationState::Running => "running",
            SimulationState::Paused => "paused",
        };
        f.write_str(name)
    }
}

/// Partial parameter edit; `None` fields are left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParameterUpdate {
    pub mutation_rate: Option<f32>,
    pub crossover_rate: Option<f32>,
    pub population_size: Option<usize>,
}

impl ParameterUpdate {
    /// Apply to a copy of `params`.
    pub fn apply_to(&self, params: &EvolutionParameters) -> EvolutionParameters {
        EvolutionParameters {
            mutation_rate: self.mutation_rate.unwrap_or(params.mutation_rate),
            crossover_rate: self.crossover_rate.unwrap_or(params.crossover_rate),
            population_size: self.population_size.unwrap_or(params.population_size),
        }
    }
}

/// Controller errors.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: SimulationState,
    },
    #[error("Parameter out of range: {0}")]
    ParameterOutOfRange(#[source] ConfigError),
    #[error("Rating {0} must be within 0.0..=1.0")]
    InvalidRating(f32),
    #[error("Pattern index {index} out of range (population of {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("No population yet; start the session first")]
    NoPopulation,
    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Drives a session: `Idle -> Running <-> Paused`, `reset` back to `Idle`.
pub struct Controller {
    state: SimulationState,
    params: EvolutionParameters,
    engine: EvolutionEngine,
    output: OutputHandler,
}

impl Controller {
    /// Create a controller from a validated configuration.
    pub fn new(config: BrushConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let params = config.params;
        let output = OutputHandler::new(config.output.clone());
        Ok(Self {
            state: SimulationState::Idle,
            params,
            engine: EvolutionEngine::new(config),
            output,
        })
    }

    /// Replace the output handler, e.g. to enable film compression.
    pub fn with_output(mut self, output: OutputHandler) -> Self {
        self.output = output;
        self
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn parameters(&self) -> &EvolutionParameters {
        &self.params
    }

    pub fn population(&self) -> &[Pattern] {
        self.engine.population()
    }

    pub fn generation(&self) -> usize {
        self.engine.generation()
    }

    /// Stats of the current population, including ratings given since the
    /// last step.
    pub fn latest_stats(&self) -> Option<GenerationStats> {
        if self.engine.population().is_empty() {
            None
        } else {
            Some(self.engine.stats())
        }
    }

    pub fn history(&self) -> &EvolutionHistory {
        self.engine.history()
    }

    pub fn engine(&self) -> &EvolutionEngine {
        &self.engine
    }

    pub fn output(&self) -> &OutputHandler {
        &self.output
    }

    /// `Idle -> Running`: create and evaluate the initial population.
    ///
    /// Stays idle with no population when the generation cannot be recorded.
    pub fn start(&mut self) -> Result<GenerationStats, ControllerError> {
        self.expect_state("start", SimulationState::Idle)?;
        let stats = self.engine.initialize(&self.params);
        if let Err(e) = self
            .output
            .record_generation(self.engine.population(), &stats)
        {
            self.engine.reset();
            self.output.reset();
            return Err(e.into());
        }

        self.transition("start", SimulationState::Idle, SimulationState::Running)?;
        log::info!(
            "Session started with {} patterns",
            self.params.population_size
        );
        Ok(stats)
    }

    /// `Running -> Paused`.
    pub fn pause(&mut self) -> Result<(), ControllerError> {
        self.transition("pause", SimulationState::Running, SimulationState::Paused)
    }

    /// `Paused -> Running`.
    pub fn resume(&mut self) -> Result<(), ControllerError> {
        self.transition("resume", SimulationState::Paused, SimulationState::Running)
    }

    /// Any state `-> Idle`, dropping the population, history and recorded
    /// frames. Parameters are kept.
    pub fn reset(&mut self) {
        log::debug!("reset from {}", self.state);
        self.engine.reset();
        self.output.reset();
        self.state = SimulationState::Idle;
    }

    /// Advance one generation. Only valid while running.
    pub fn step(&mut self) -> Result<GenerationStats, ControllerError> {
        self.expect_state("step", SimulationState::Running)?;

        let previous = self.engine.clone();
        let stats = self.engine.step(&self.params);
        if let Err(e) = self
            .output
            .record_generation(self.engine.population(), &stats)
        {
            self.engine = previous;
            return Err(e.into());
        }
        log::info!(
            "Generation {}: best {:.4}, avg {:.4}",
            stats.generation,
            stats.best_fitness,
            stats.average_fitness
        );
        Ok(stats)
    }

    /// Validate and apply a parameter edit. Takes effect at the next step.
    ///
    /// Nothing is applied when any field is out of range.
    pub fn update_parameters(
        &mut self,
        update: ParameterUpdate,
    ) -> Result<EvolutionParameters, ControllerError> {
        let candidate = update.apply_to(&self.params);
        candidate
            .validate()
            .map_err(ControllerError::ParameterOutOfRange)?;
        log::debug!("parameters updated: {:?}", candidate);
        self.params = candidate;
        Ok(candidate)
    }

    /// Rate one pattern of the current population. Returns its new fitness.
    pub fn rate(&mut self, index: usize, rating: f32) -> Result<Option<f32>, ControllerError> {
        self.check_rating(index, rating)?;
        Ok(self.engine.rate(index, rating))
    }

    /// Rate several patterns at once. Nothing is applied when any entry is
    /// invalid.
    pub fn rate_many(
        &mut self,
        ratings: &[(usize, f32)],
    ) -> Result<Vec<Option<f32>>, ControllerError> {
        for &(index, rating) in ratings {
            self.check_rating(index, rating)?;
        }
        Ok(ratings
            .iter()
            .map(|&(index, rating)| self.engine.rate(index, rating))
            .collect())
    }

    /// Write the current generation as PNG images.
    pub fn export_images(&self) -> Result<PathBuf, ControllerError> {
        if self.engine.population().is_empty() {
            return Err(ControllerError::NoPopulation);
        }
        Ok(self
            .output
            .export_images(self.engine.population(), self.engine.generation())?)
    }

    /// Write the best pattern of every recorded generation as a film.
    pub fn export_film(&self) -> Result<(PathBuf, FilmStats), ControllerError> {
        Ok(self.output.export_film()?)
    }

    /// Encode every recorded generation as a video.
    pub fn export_video(&self) -> Result<PathBuf, ControllerError> {
        Ok(self.output.export_video()?)
    }

    fn transition(
        &mut self,
        action: &'static str,
        from: SimulationState,
        to: SimulationState,
    ) -> Result<(), ControllerError> {
        if self.state != from {
            return Err(ControllerError::InvalidTransition {
                action,
                state: self.state,
            });
        }
        log::debug!("{} -> {}", self.state, to);
        self.state = to;
        Ok(())
    }

    fn expect_state(
        &self,
        action: &'static str,
        expected: SimulationState,
    ) -> Result<(), ControllerError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ControllerError::InvalidTransition {
                action,
                state: self.state,
            })
        }
    }

    fn check_rating(&self, index: usize, rating: f32) -> Result<(), ControllerError> {
        let len = self.engine.population().len();
        if len == 0 {
            return Err(ControllerError::NoPopulation);
        }
        if !(0.0..=1.0).contains(&rating) {
            return Err(ControllerError::InvalidRating(rating));
        }
        if index >= len {
            return Err(ControllerError::IndexOutOfRange { index, len });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CanvasConfig, FitnessMode, NetworkConfig, OutputConfig};
    use std::path::Path;
    use tempfile::TempDir;

    fn controller(dir: &TempDir) -> Controller {
        Controller::new(BrushConfig {
            canvas: CanvasConfig {
                width: 10,
                height: 10,
            },
            network: NetworkConfig {
                hidden_layers: vec![4],
                latent_dim: 2,
                ..Default::default()
            },
            params: EvolutionParameters {
                population_size: 5,
                ..Default::default()
            },
            output: OutputConfig {
                export_dir: dir.path().to_string_lossy().into_owned(),
                ..Default::default()
            },
            random_seed: Some(3),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_lifecycle() {
        let dir = TempDir::new().unwrap();
        let mut c = controller(&dir);
        assert_eq!(c.state(), SimulationState::Idle);

        let stats = c.start().unwrap();
        assert_eq!(stats.population_size, 5);
        assert_eq!(c.state(), SimulationState::Running);

        let stats = c.step().unwrap();
        assert_eq!(stats.generation, 1);

        c.pause().unwrap();
        assert_eq!(c.state(), SimulationState::Paused);
        c.resume().unwrap();
        assert_eq!(c.state(), SimulationState::Running);

        assert_eq!(c.output().frames().len(), 2);
        c.reset();
        assert_eq!(c.state(), SimulationState::Idle);
        assert!(c.population().is_empty());
        assert!(c.history().is_empty());
        assert!(c.output().frames().is_empty());
        assert_eq!(c.generation(), 0);
    }

    #[test]
    fn test_invalid_transitions() {
        let dir = TempDir::new().unwrap();
        let mut c = controller(&dir);

        assert!(matches!(
            c.step(),
            Err(ControllerError::InvalidTransition { action: "step", .. })
        ));
        assert!(c.pause().is_err());
        assert!(c.resume().is_err());

        c.start().unwrap();
        assert!(c.start().is_err());
        assert!(c.resume().is_err());

        c.pause().unwrap();
        assert!(c.step().is_err());
        assert!(c.pause().is_err());
    }

    #[test]
    fn test_parameter_update_validates_everything_first() {
        let dir = TempDir::new().unwrap();
        let mut c = controller(&dir);
        let before = *c.parameters();

        let err = c
            .update_parameters(ParameterUpdate {
                mutation_rate: Some(0.5),
                population_size: Some(0),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, ControllerError::ParameterOutOfRange(_)));
        assert_eq!(*c.parameters(), before);

        assert!(c
            .update_parameters(ParameterUpdate {
                crossover_rate: Some(1.5),
                ..Default::default()
            })
            .is_err());

        let applied = c
            .update_parameters(ParameterUpdate {
                mutation_rate: Some(0.5),
                population_size: Some(7),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(applied.mutation_rate, 0.5);
        assert_eq!(applied.crossover_rate, before.crossover_rate);
    }

    #[test]
    fn test_population_change_applies_at_next_step() {
        let dir = TempDir::new().unwrap();
        let mut c = controller(&dir);
        c.start().unwrap();
        c.pause().unwrap();

        c.update_parameters(ParameterUpdate {
            population_size: Some(8),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(c.population().len(), 5);

        c.resume().unwrap();
        c.step().unwrap();
        assert_eq!(c.population().len(), 8);
    }

    #[test]
    fn test_rating_validation() {
        let dir = TempDir::new().unwrap();
        let mut c = controller(&dir);
        assert!(matches!(c.rate(0, 0.5), Err(ControllerError::NoPopulation)));

        c.start().unwrap();
        assert!(matches!(
            c.rate(0, 1.5),
            Err(ControllerError::InvalidRating(_))
        ));
        assert!(matches!(
            c.rate(0, f32::NAN),
            Err(ControllerError::InvalidRating(_))
        ));
        assert!(matches!(
            c.rate(9, 0.5),
            Err(ControllerError::IndexOutOfRange { index: 9, len: 5 })
        ));
        assert!(c.rate(1, 0.5).unwrap().is_some());
        assert_eq!(c.latest_stats().unwrap().rated, 1);
    }

    #[test]
    fn test_rate_many_is_atomic() {
        let dir = TempDir::new().unwrap();
        let mut c = controller(&dir);
        c.start().unwrap();

        assert!(c.rate_many(&[(0, 0.2), (1, 3.0)]).is_err());
        assert!(c.population().iter().all(|p| p.rating.is_none()));

        let fitness = c.rate_many(&[(0, 0.2), (1, 0.9)]).unwrap();
        assert_eq!(fitness.len(), 2);
        assert_eq!(c.population()[1].rating, Some(0.9));
    }

    #[test]
    fn test_interactive_rating_sets_fitness() {
        let dir = TempDir::new().unwrap();
        let mut config = BrushConfig {
            canvas: CanvasConfig {
                width: 8,
                height: 8,
            },
            random_seed: Some(1),
            ..Default::default()
        };
        config.fitness.mode = FitnessMode::Interactive;
        config.output.export_dir = dir.path().to_string_lossy().into_owned();
        let mut c = Controller::new(config).unwrap();

        c.start().unwrap();
        assert_eq!(c.rate(0, 0.6).unwrap(), Some(0.6));
    }

    #[test]
    fn test_export_images_requires_population() {
        let dir = TempDir::new().unwrap();
        let mut c = controller(&dir);
        assert!(matches!(c.export_images(), Err(ControllerError::NoPopulation)));

        c.start().unwrap();
        let out = c.export_images().unwrap();
        assert!(out.join("pattern_4.png").exists());
    }

    #[test]
    fn test_export_film_after_steps() {
        let dir = TempDir::new().unwrap();
        let mut c = controller(&dir);
        assert!(matches!(
            c.export_film(),
            Err(ControllerError::Output(OutputError::NothingRecorded))
        ));

        c.start().unwrap();
        c.step().unwrap();
        c.step().unwrap();
        let (_, stats) = c.export_film().unwrap();
        assert_eq!(stats.frame_count, 3);
    }

    fn logging_controller(export_dir: &Path) -> Controller {
        Controller::new(BrushConfig {
            canvas: CanvasConfig {
                width: 8,
                height: 8,
            },
            params: EvolutionParameters {
                population_size: 4,
                ..Default::default()
            },
            output: OutputConfig {
                export_dir: export_dir.to_string_lossy().into_owned(),
                log_statistics: true,
                ..Default::default()
            },
            random_seed: Some(5),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_failed_start_stays_idle() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("exports");
        std::fs::write(&file, b"").unwrap();
        let mut c = logging_controller(&file);

        assert!(matches!(c.start(), Err(ControllerError::Output(_))));
        assert_eq!(c.state(), SimulationState::Idle);
        assert!(c.population().is_empty());
        assert!(c.output().frames().is_empty());

        // Retrying reports the same output failure, not a bad transition.
        assert!(matches!(c.start(), Err(ControllerError::Output(_))));

        std::fs::remove_file(&file).unwrap();
        c.start().unwrap();
        assert_eq!(c.state(), SimulationState::Running);
    }

    #[test]
    fn test_failed_step_keeps_generation() {
        let dir = TempDir::new().unwrap();
        let mut c = logging_controller(dir.path());
        c.start().unwrap();
        let before: Vec<u64> = c.population().iter().map(|p| p.id).collect();

        let log = dir.path().join(crate::output::STATS_LOG_FILE);
        std::fs::remove_file(&log).unwrap();
        std::fs::create_dir(&log).unwrap();

        assert!(matches!(c.step(), Err(ControllerError::Output(_))));
        assert_eq!(c.generation(), 0);
        assert_eq!(c.history().len(), 1);
        assert_eq!(c.output().frames().len(), 1);
        let after: Vec<u64> = c.population().iter().map(|p| p.id).collect();
        assert_eq!(before, after);

        std::fs::remove_dir(&log).unwrap();
        assert_eq!(c.step().unwrap().generation, 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = BrushConfig::default();
        config.params.mutation_rate = 2.0;
        assert!(Controller::new(config).is_err());
    }
}
