//! Project Brush CLI - Evolve patterns headless or interactively.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use brush::{
    compute::{Generator, evolution::EvolutionEngine},
    control::{Command, Controller, HELP, Outcome, execute},
    output::{CompressionType, OutputHandler, save_canvas},
    schema::{BrushConfig, CanvasConfig},
    view::{ViewConfig, render_history, render_population, render_stats},
};

#[derive(Parser)]
#[command(name = "brush")]
#[command(about = "Evolve neural network generated patterns with a genetic algorithm")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evolve headless until a stop condition is met
    Run {
        /// Configuration file (JSON); defaults are used when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the maximum number of generations
        #[arg(short, long)]
        generations: Option<usize>,

        /// Override the random seed
        #[arg(short, long)]
        seed: Option<u64>,

        /// Write the final population as PNG images
        #[arg(long)]
        export_images: bool,

        /// Write the best pattern of every generation as a .bfilm film
        #[arg(long)]
        film: bool,

        /// Encode the best pattern of every generation as an MP4 video
        #[arg(long)]
        video: bool,

        /// LZ4-compress film frames (requires the `lz4` feature)
        #[arg(long)]
        compress: bool,

        /// Write the run result as JSON
        #[arg(long)]
        result: Option<PathBuf>,
    },

    /// Interactive session driven by commands on stdin
    Interactive {
        /// Configuration file (JSON); defaults are used when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the random seed
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Render a single random pattern to PNG
    Render {
        /// Genome seed
        #[arg(short, long)]
        seed: u64,

        /// Output path
        #[arg(short, long, default_value = "pattern.png")]
        output: PathBuf,

        /// Configuration file (JSON); defaults are used when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the canvas width
        #[arg(long)]
        width: Option<usize>,

        /// Override the canvas height
        #[arg(long)]
        height: Option<usize>,
    },

    /// Print the default configuration as JSON
    ExampleConfig,
}

fn main() -> Result<()> {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            generations,
            seed,
            export_images,
            film,
            video,
            compress,
            result,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(generations) = generations {
                config.run.max_generations = generations;
            }
            if seed.is_some() {
                config.random_seed = seed;
            }
            config.validate().context("invalid configuration")?;

            let compression = if compress {
                CompressionType::Lz4
            } else {
                CompressionType::None
            };
            run(config, export_images, film, video, compression, result)
        }

        Commands::Interactive { config, seed } => {
            let mut config = load_config(config.as_deref())?;
            if seed.is_some() {
                config.random_seed = seed;
            }
            interactive(config)
        }

        Commands::Render {
            seed,
            output,
            config,
            width,
            height,
        } => {
            let mut config = load_config(config.as_deref())?;
            config.canvas = CanvasConfig {
                width: width.unwrap_or(config.canvas.width),
                height: height.unwrap_or(config.canvas.height),
            };
            config.validate().context("invalid configuration")?;

            let canvas = config.canvas;
            let generator = Generator::new(config.network.clone(), canvas);
            let pattern = generator.generate(seed);
            save_canvas(&pattern, config.output.palette, &output)
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!(
                "Rendered {}x{} pattern with seed {} to {}",
                canvas.width,
                canvas.height,
                seed,
                output.display()
            );
            Ok(())
        }

        Commands::ExampleConfig => {
            println!(
                "{}",
                serde_json::to_string_pretty(&BrushConfig::default())?
            );
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<BrushConfig> {
    let Some(path) = path else {
        return Ok(BrushConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse config {}", path.display()))
}

fn run(
    config: BrushConfig,
    export_images: bool,
    film: bool,
    video: bool,
    compression: CompressionType,
    result_path: Option<PathBuf>,
) -> Result<()> {
    println!("Project Brush");
    println!("=============");
    println!(
        "Canvas: {}x{}, network {:?}",
        config.canvas.width,
        config.canvas.height,
        config.network.layer_sizes()
    );
    println!(
        "Population: {}, mutation {}, crossover {}, fitness {:?}",
        config.params.population_size,
        config.params.mutation_rate,
        config.params.crossover_rate,
        config.fitness.mode
    );
    println!("Max generations: {}", config.run.max_generations);
    println!();

    let params = config.params;
    let max_generations = config.run.max_generations;
    let mut output = OutputHandler::new(config.output.clone()).with_compression(compression);
    let mut engine = EvolutionEngine::new(config);

    let mut record_error = None;
    let result = engine.run_with_callback(&params, |stats, population| {
        if record_error.is_none()
            && let Err(e) = output.record_generation(population, stats)
        {
            record_error = Some(e);
        }

        // Print progress every 10%
        if stats.generation % (max_generations / 10).max(1) == 0 {
            println!("  {}", render_stats(stats));
        }
    });
    if let Some(e) = record_error {
        return Err(e).context("failed to record generation");
    }

    println!();
    println!("Stopped: {:?}", result.stats.stop_reason);
    println!(
        "Generations: {}, evaluations: {}",
        result.stats.generations, result.stats.total_evaluations
    );
    println!(
        "Best fitness: {:.4}, final average: {:.4}",
        result.stats.best_fitness, result.stats.final_avg_fitness
    );
    println!("Progress: {}", render_history(&result.history));
    println!(
        "Time: {:.2}s ({:.1} evals/s)",
        result.stats.elapsed_seconds,
        result.stats.total_evaluations as f64 / result.stats.elapsed_seconds.max(1e-9)
    );

    if export_images {
        let dir = output.export_images(engine.population(), engine.generation())?;
        println!("Images: {}", dir.display());
    }
    if film {
        let (path, stats) = output.export_film()?;
        println!("Film: {} ({})", path.display(), stats);
    }
    if video {
        let path = output.export_video()?;
        println!("Video: {}", path.display());
    }
    if let Some(path) = result_path {
        fs::write(&path, serde_json::to_string_pretty(&result)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Result: {}", path.display());
    }
    Ok(())
}

fn interactive(config: BrushConfig) -> Result<()> {
    let view = ViewConfig::default();
    let mut controller = Controller::new(config).context("invalid configuration")?;

    println!("Project Brush interactive session. Type `help` for commands.");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();
    loop {
        print!("brush ({})> ", controller.state());
        stdout.flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        match execute(&mut controller, &command) {
            Ok(Outcome::Quit) => break,
            Ok(Outcome::State(state)) => println!("state: {state}"),
            Ok(Outcome::Generations(stats)) => {
                for s in &stats {
                    println!("{}", render_stats(s));
                }
            }
            Ok(Outcome::Rated { index, fitness }) => match fitness {
                Some(f) => println!("pattern {index} fitness {f:.4}"),
                None => println!("pattern {index} unscored"),
            },
            Ok(Outcome::Parameters(params)) => println!(
                "mutation {} | crossover {} | population {} (applied at the next step)",
                params.mutation_rate, params.crossover_rate, params.population_size
            ),
            Ok(Outcome::Images(dir)) => println!("images written to {}", dir.display()),
            Ok(Outcome::Film(path, stats)) => println!("film written to {} ({stats})", path.display()),
            Ok(Outcome::Video(path)) => println!("video written to {}", path.display()),
            Ok(Outcome::Show) => {
                if controller.population().is_empty() {
                    println!("no population (type `start`)");
                } else {
                    print!("{}", render_population(controller.population(), &view));
                }
            }
            Ok(Outcome::Stats) => match controller.latest_stats() {
                Some(stats) => {
                    println!("{}", render_stats(&stats));
                    println!("history {}", render_history(controller.history()));
                }
                None => println!("no population (type `start`)"),
            },
            Ok(Outcome::Help) => println!("{HELP}"),
            Err(e) => eprintln!("error: {e}"),
        }
    }
    Ok(())
}
