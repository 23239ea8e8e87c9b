//! Command language of the interactive session.

use std::path::PathBuf;
use std::str::FromStr;

use super::controller::{Controller, ControllerError, ParameterUpdate, SimulationState};
use crate::output::FilmStats;
use crate::schema::{EvolutionParameters, GenerationStats};

/// Help text listing every command.
pub const HELP: &str = "\
Commands:
  start                          create the initial population
  pause | stop                   pause the session
  resume                         resume a paused session
  reset                          drop the population and go back to idle
  step [n]                       advance n generations (default 1)
  rate <index> <score>           rate a pattern with a score in 0..1
  set mutation|crossover <rate>  change a rate (0..1), applied at the next step
  set population <size>          change the population size (1..4096)
  show                           draw the current population
  stats                          print statistics of the current generation
  export images|film|video       write the current results to the export directory
  help                           show this message
  quit                           leave the session";

/// What to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Images,
    Film,
    Video,
}

/// A parsed session command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Pause,
    Resume,
    Reset,
    Step(usize),
    Rate { index: usize, score: f32 },
    Set(ParameterUpdate),
    Show,
    Stats,
    Export(ExportKind),
    Help,
    Quit,
}

/// Command parsing errors.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,
    #[error("Unknown command `{0}` (type `help`)")]
    Unknown(String),
    #[error("`{command}` needs a {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[error("Invalid {argument} `{value}`")]
    InvalidArgument {
        argument: &'static str,
        value: String,
    },
    #[error("Unexpected argument `{0}`")]
    UnexpectedArgument(String),
    #[error("Unknown parameter `{0}` (mutation, crossover or population)")]
    UnknownParameter(String),
    #[error("Unknown export `{0}` (images, film or video)")]
    UnknownExport(String),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Err(CommandError::Empty);
        };
        let name = name.to_ascii_lowercase();

        let command = match name.as_str() {
            "start" => Command::Start,
            "pause" | "stop" => Command::Pause,
            "resume" => Command::Resume,
            "reset" => Command::Reset,
            "step" => match words.next() {
                None => Command::Step(1),
                Some(n) => match n.parse::<usize>() {
                    Ok(n) if n > 0 => Command::Step(n),
                    _ => return Err(invalid("generation count", n)),
                },
            },
            "rate" => {
                let index = required(&mut words, "rate", "pattern index")?;
                let score = required(&mut words, "rate", "score")?;
                Command::Rate {
                    index: index
                        .parse()
                        .map_err(|_| invalid("pattern index", index))?,
                    score: score.parse().map_err(|_| invalid("score", score))?,
                }
            }
            "set" => {
                let parameter = required(&mut words, "set", "parameter")?;
                let value = required(&mut words, "set", "value")?;
                let mut update = ParameterUpdate::default();
                match parameter.to_ascii_lowercase().as_str() {
                    "mutation" | "mutation_rate" => {
                        update.mutation_rate =
                            Some(value.parse().map_err(|_| invalid("rate", value))?);
                    }
                    "crossover" | "crossover_rate" => {
                        update.crossover_rate =
                            Some(value.parse().map_err(|_| invalid("rate", value))?);
                    }
                    "population" | "population_size" => {
                        update.population_size =
                            Some(value.parse().map_err(|_| invalid("size", value))?);
                    }
                    other => return Err(CommandError::UnknownParameter(other.to_string())),
                }
                Command::Set(update)
            }
            "show" => Command::Show,
            "stats" => Command::Stats,
            "export" => {
                let kind = required(&mut words, "export", "target")?;
                Command::Export(match kind.to_ascii_lowercase().as_str() {
                    "images" => ExportKind::Images,
                    "film" => ExportKind::Film,
                    "video" => ExportKind::Video,
                    other => return Err(CommandError::UnknownExport(other.to_string())),
                })
            }
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => return Err(CommandError::Unknown(name.clone())),
        };

        match words.next() {
            Some(extra) => Err(CommandError::UnexpectedArgument(extra.to_string())),
            None => Ok(command),
        }
    }
}

fn required<'a>(
    words: &mut impl Iterator<Item = &'a str>,
    command: &'static str,
    argument: &'static str,
) -> Result<&'a str, CommandError> {
    words
        .next()
        .ok_or(CommandError::MissingArgument { command, argument })
}

fn invalid(argument: &'static str, value: &str) -> CommandError {
    CommandError::InvalidArgument {
        argument,
        value: value.to_string(),
    }
}

/// Result of executing a command, for the session to display.
#[derive(Debug)]
pub enum Outcome {
    /// A state transition happened.
    State(SimulationState),
    /// One entry per generation produced.
    Generations(Vec<GenerationStats>),
    Rated { index: usize, fitness: Option<f32> },
    Parameters(EvolutionParameters),
    Images(PathBuf),
    Film(PathBuf, FilmStats),
    Video(PathBuf),
    Show,
    Stats,
    Help,
    Quit,
}

/// Run a command against the controller.
pub fn execute(
    controller: &mut Controller,
    command: &Command,
) -> Result<Outcome, ControllerError> {
    Ok(match *command {
        Command::Start => Outcome::Generations(vec![controller.start()?]),
        Command::Pause => {
            controller.pause()?;
            Outcome::State(controller.state())
        }
        Command::Resume => {
            controller.resume()?;
            Outcome::State(controller.state())
        }
        Command::Reset => {
            controller.reset();
            Outcome::State(controller.state())
        }
        Command::Step(n) => {
            let mut stats = Vec::new();
            for _ in 0..n {
                stats.push(controller.step()?);
            }
            Outcome::Generations(stats)
        }
        Command::Rate { index, score } => Outcome::Rated {
            index,
            fitness: controller.rate(index, score)?,
        },
        Command::Set(update) => Outcome::Parameters(controller.update_parameters(update)?),
        Command::Show => Outcome::Show,
        Command::Stats => Outcome::Stats,
        Command::Export(ExportKind::Images) => Outcome::Images(controller.export_images()?),
        Command::Export(ExportKind::Film) => {
            let (path, stats) = controller.export_film()?;
            Outcome::Film(path, stats)
        }
        Command::Export(ExportKind::Video) => Outcome::Video(controller.export_video()?),
        Command::Help => Outcome::Help,
        Command::Quit => Outcome::Quit,
    })
}
