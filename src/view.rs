//! Terminal rendering of populations and statistics.

use std::fmt::Write;

use crate::compute::{Canvas, Pattern};
use crate::schema::{EvolutionHistory, GenerationStats};

/// Characters from dark to bright.
const RAMP: &[u8] = b" .:-=+*#%@";

/// Layout of the population grid.
#[derive(Debug, Clone, Copy)]
pub struct ViewConfig {
    /// Thumbnails per row.
    pub columns: usize,
    /// Thumbnail width in characters.
    pub thumb_width: usize,
    /// Thumbnail height in lines.
    pub thumb_height: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            columns: 4,
            thumb_width: 16,
            thumb_height: 8,
        }
    }
}

/// ASCII art for a single canvas.
pub fn render_canvas(canvas: &Canvas, width: usize, height: usize) -> Vec<String> {
    let thumb = canvas.resample(width, height);
    thumb
        .pixels
        .chunks(width.max(1))
        .map(|row| row.iter().map(|&v| shade(v)).collect())
        .collect()
}

#[inline]
fn shade(v: f32) -> char {
    let v = if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
    let i = ((v * (RAMP.len() - 1) as f32).round() as usize).min(RAMP.len() - 1);
    RAMP[i] as char
}

/// Draw the population as a grid of thumbnails, each labeled with its index
/// and fitness.
pub fn render_population(population: &[Pattern], config: &ViewConfig) -> String {
    let columns = config.columns.max(1);
    let width = config.thumb_width.max(1);
    let mut out = String::new();

    for (row, chunk) in population.chunks(columns).enumerate() {
        let labels: Vec<String> = chunk
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let index = row * columns + i;
                let score = match p.fitness {
                    Some(f) => format!("{f:.3}"),
                    None => "-".to_string(),
                };
                let rated = if p.rating.is_some() { "*" } else { "" };
                truncate(&format!("[{index}] {score}{rated}"), width)
            })
            .collect();
        let thumbs: Vec<Vec<String>> = chunk
            .iter()
            .map(|p| render_canvas(&p.canvas, width, config.thumb_height))
            .collect();

        push_row(&mut out, labels.iter().map(String::as_str), width);
        for line in 0..config.thumb_height {
            push_row(
                &mut out,
                thumbs.iter().map(|t| t.get(line).map_or("", String::as_str)),
                width,
            );
        }
        out.push('\n');
    }
    out
}

fn push_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, width: usize) {
    let line: Vec<String> = cells.map(|c| format!("{c:<width$}")).collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

fn truncate(s: &str, width: usize) -> String {
    s.chars().take(width).collect()
}

/// One-line summary of a generation.
pub fn render_stats(stats: &GenerationStats) -> String {
    let mut line = String::new();
    let _ = write!(
        line,
        "gen {:>4} | best {:.4} | avg {:.4} | min {:.4} | std {:.4} | div {:.4} | scored {}/{}",
        stats.generation,
        stats.best_fitness,
        stats.average_fitness,
        stats.min_fitness,
        stats.fitness_std,
        stats.diversity,
        stats.scored,
        stats.population_size,
    );
    if stats.rated > 0 {
        let _ = write!(line, " | rated {}", stats.rated);
    }
    line
}

/// Sparkline of the best fitness per generation.
pub fn render_history(history: &EvolutionHistory) -> String {
    const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
    history
        .best_fitness
        .iter()
        .map(|&f| {
            let i = (f.clamp(0.0, 1.0) * (BARS.len() - 1) as f32).round() as usize;
            BARS[i.min(BARS.len() - 1)]
        })
        .collect()
}
