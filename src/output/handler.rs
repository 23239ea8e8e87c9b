//! Collects per-generation results and writes every export artifact.

use std::path::{Path, PathBuf};

use super::format::CompressionType;
use super::images::export_generation;
use super::recorder::{FilmRecorder, FilmStats};
use super::stats_log::{STATS_LOG_FILE, StatsLog};
use super::video::encode_video;
use super::OutputError;
use crate::compute::{Canvas, Pattern, rank_indices};
use crate::schema::{GenerationStats, OutputConfig};

/// File name of the exported film.
pub const FILM_FILE: &str = "evolution.bfilm";
/// File name of the exported video.
pub const VIDEO_FILE: &str = "evolution.mp4";

/// Best pattern of one generation, kept for film and video export.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFrame {
    pub generation: usize,
    pub fitness: Option<f32>,
    pub canvas: Canvas,
}

/// Output handler owning the recorded history of a session.
pub struct OutputHandler {
    config: OutputConfig,
    compression: CompressionType,
    frames: Vec<RecordedFrame>,
    stats_log: Option<StatsLog>,
}

impl OutputHandler {
    pub fn new(config: OutputConfig) -> Self {
        let stats_log = config
            .log_statistics
            .then(|| StatsLog::new(Path::new(&config.export_dir).join(STATS_LOG_FILE)));
        Self {
            config,
            compression: CompressionType::None,
            frames: Vec::new(),
            stats_log,
        }
    }

    /// Compress film frames with `compression`.
    pub fn with_compression(mut self, compression: CompressionType) -> Self {
        self.compression = compression;
        self
    }

    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    pub fn export_dir(&self) -> &Path {
        Path::new(&self.config.export_dir)
    }

    /// Frames recorded so far, one per generation.
    pub fn frames(&self) -> &[RecordedFrame] {
        &self.frames
    }

    /// Forget every recorded frame.
    pub fn reset(&mut self) {
        self.frames.clear();
    }

    /// Keep the best pattern of a generation and log its statistics.
    pub fn record_generation(
        &mut self,
        population: &[Pattern],
        stats: &GenerationStats,
    ) -> Result<(), OutputError> {
        if let Some(log) = &self.stats_log {
            log.append(stats)?;
        }

        if let Some(&best) = rank_indices(population).first() {
            let best = &population[best];
            self.frames.push(RecordedFrame {
                generation: stats.generation,
                fitness: best.fitness,
                canvas: best.canvas.clone(),
            });
        }
        Ok(())
    }

    /// Write every pattern of a generation as PNG.
    pub fn export_images(
        &self,
        population: &[Pattern],
        generation: usize,
    ) -> Result<PathBuf, OutputError> {
        let dir = export_generation(population, generation, self.export_dir(), self.config.palette)?;
        log::info!(
            "Exported generation {} as {} images to {}",
            generation,
            population.len(),
            dir.display()
        );
        Ok(dir)
    }

    /// Write the recorded frames as a `.bfilm` file.
    pub fn export_film(&self) -> Result<(PathBuf, FilmStats), OutputError> {
        let Some(first) = self.frames.first() else {
            return Err(OutputError::NothingRecorded);
        };

        std::fs::create_dir_all(self.export_dir())?;
        let path = self.export_dir().join(FILM_FILE);
        let mut recorder = FilmRecorder::create(
            &path,
            first.canvas.width,
            first.canvas.height,
            self.config.fps,
            self.compression,
        )?;
        for frame in &self.frames {
            recorder.record_frame(&frame.canvas, frame.generation, frame.fitness)?;
        }
        let stats = recorder.finalize()?;

        log::info!("Exported film to {} ({})", path.display(), stats);
        Ok((path, stats))
    }

    /// Encode the recorded frames as an MP4 video.
    pub fn export_video(&self) -> Result<PathBuf, OutputError> {
        if self.frames.is_empty() {
            return Err(OutputError::NothingRecorded);
        }

        std::fs::create_dir_all(self.export_dir())?;
        let path = self.export_dir().join(VIDEO_FILE);
        let canvases: Vec<&Canvas> = self.frames.iter().map(|f| &f.canvas).collect();
        encode_video(
            &canvases,
            &path,
            self.config.fps,
            self.config.palette,
            &self.config.ffmpeg,
        )?;

        log::info!(
            "Exported {} generations as video to {}",
            self.frames.len(),
            path.display()
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::FilmPlayer;
    use crate::schema::{NetworkConfig, NetworkGenome};
    use tempfile::tempdir;

    fn handler_in(dir: &Path, log_statistics: bool) -> OutputHandler {
        OutputHandler::new(OutputConfig {
            export_dir: dir.to_string_lossy().into_owned(),
            log_statistics,
            ffmpeg: "/nonexistent/brush-ffmpeg".to_string(),
            ..Default::default()
        })
    }

    fn population(generation: usize) -> Vec<Pattern> {
        let genome = NetworkGenome::zeros(&NetworkConfig::default());
        (0..3)
            .map(|i| {
                let mut p = Pattern::unrendered(i, genome.clone(), generation);
                p.canvas = Canvas::from_pixels(4, 4, vec![i as f32 / 3.0; 16]).unwrap();
                p.fitness = Some(i as f32 / 10.0);
                p
            })
            .collect()
    }

    fn stats(generation: usize) -> GenerationStats {
        GenerationStats {
            generation,
            population_size: 3,
            ..Default::default()
        }
    }

    #[test]
    fn test_record_keeps_best() {
        let dir = tempdir().unwrap();
        let mut handler = handler_in(dir.path(), false);
        handler.record_generation(&population(0), &stats(0)).unwrap();

        assert_eq!(handler.frames().len(), 1);
        assert_eq!(handler.frames()[0].fitness, Some(0.2));
        assert!(!dir.path().join(STATS_LOG_FILE).exists());
    }

    #[test]
    fn test_statistics_log() {
        let dir = tempdir().unwrap();
        let mut handler = handler_in(dir.path(), true);
        for g in 0..4 {
            handler.record_generation(&population(g), &stats(g)).unwrap();
        }
        let entries = StatsLog::new(dir.path().join(STATS_LOG_FILE))
            .read_all()
            .unwrap();
        assert_eq!(entries.len(), 4);
    }

    #[test]
    fn test_film_export_roundtrip() {
        let dir = tempdir().unwrap();
        let mut handler = handler_in(dir.path(), false);
        for g in 0..3 {
            handler.record_generation(&population(g), &stats(g)).unwrap();
        }

        let (path, film) = handler.export_film().unwrap();
        assert_eq!(film.frame_count, 3);

        let mut player = FilmPlayer::open(&path).unwrap();
        for (recorded, frame) in handler.frames().iter().zip(player.frames()) {
            let frame = frame.unwrap();
            assert_eq!(frame.canvas, recorded.canvas);
            assert_eq!(frame.generation, recorded.generation);
        }
    }

    #[test]
    fn test_exports_without_frames() {
        let dir = tempdir().unwrap();
        let handler = handler_in(dir.path(), false);
        assert!(matches!(handler.export_film(), Err(OutputError::NothingRecorded)));
        assert!(matches!(handler.export_video(), Err(OutputError::NothingRecorded)));
    }

    #[test]
    fn test_video_without_encoder() {
        let dir = tempdir().unwrap();
        let mut handler = handler_in(dir.path(), false);
        handler.record_generation(&population(0), &stats(0)).unwrap();
        assert!(matches!(
            handler.export_video(),
            Err(OutputError::EncoderUnavailable(_))
        ));
    }

    #[test]
    fn test_failed_log_records_no_frame() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"").unwrap();
        let mut handler = handler_in(&blocker, true);

        assert!(handler.record_generation(&population(0), &stats(0)).is_err());
        assert!(handler.frames().is_empty());
    }

    #[test]
    fn test_reset_clears_frames() {
        let dir = tempdir().unwrap();
        let mut handler = handler_in(dir.path(), false);
        handler.record_generation(&population(0), &stats(0)).unwrap();
        handler.reset();
        assert!(handler.frames().is_empty());
    }
}
