//! JSON-lines log of generation statistics.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use super::OutputError;
use crate::schema::GenerationStats;

/// File name of the statistics log inside the export directory.
pub const STATS_LOG_FILE: &str = "evolution_log.jsonl";

/// Appends one JSON object per generation.
#[derive(Debug, Clone)]
pub struct StatsLog {
    path: PathBuf,
}

impl StatsLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, stats: &GenerationStats) -> Result<(), OutputError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(stats)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Read every entry back, skipping blank lines.
    pub fn read_all(&self) -> Result<Vec<GenerationStats>, OutputError> {
        let reader = BufReader::new(fs::File::open(&self.path)?);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }
        Ok(entries)
    }
}
