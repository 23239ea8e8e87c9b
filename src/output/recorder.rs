//! Film recorder writing one canvas per generation.

use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use super::format::{CompressionType, FilmFlags, FilmHeader, FrameIndex, compress_lz4, encode_frame};
use crate::compute::Canvas;

/// Writes canvases to a `.bfilm` file.
///
/// Usage:
/// ```ignore
/// let mut recorder = FilmRecorder::create("evolution.bfilm", 64, 64, 5.0, CompressionType::None)?;
/// recorder.record_frame(&best.canvas, generation, best.fitness)?;
/// recorder.finalize()?;
/// ```
pub struct FilmRecorder {
    writer: BufWriter<File>,
    header: FilmHeader,
    frame_indices: Vec<FrameIndex>,
}

impl FilmRecorder {
    /// Create a new film file. Unavailable compression falls back to raw frames.
    pub fn create<P: AsRef<Path>>(
        path: P,
        width: usize,
        height: usize,
        fps: f32,
        compression: CompressionType,
    ) -> io::Result<Self> {
        let compression = if compression.is_available() {
            compression
        } else {
            log::warn!("{:?} compression unavailable, writing raw frames", compression);
            CompressionType::None
        };

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        let header = FilmHeader {
            width: width as u32,
            height: height as u32,
            frame_count: 0, // Will be updated on finalize
            fps,
            flags: FilmFlags { compression },
        };

        // Write placeholder header
        header.write_to(&mut writer)?;

        Ok(Self {
            writer,
            header,
            frame_indices: Vec::new(),
        })
    }

    /// Append one frame. The canvas must match the film dimensions.
    pub fn record_frame(
        &mut self,
        canvas: &Canvas,
        generation: usize,
        fitness: Option<f32>,
    ) -> io::Result<()> {
        if canvas.width != self.header.width as usize || canvas.height != self.header.height as usize
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "Canvas {}x{} does not match film {}x{}",
                    canvas.width, canvas.height, self.header.width, self.header.height
                ),
            ));
        }

        let offset = self.writer.stream_position()?;
        let raw = encode_frame(&canvas.pixels);

        let data = match self.header.flags.compression {
            CompressionType::None => raw,
            CompressionType::Lz4 => compress_lz4(&raw)?,
        };

        self.writer.write_all(&data)?;
        self.frame_indices.push(FrameIndex {
            offset,
            size: data.len() as u64,
            generation: generation as u64,
            fitness: fitness.unwrap_or(f32::NAN),
        });
        Ok(())
    }

    /// Finalize the film file.
    ///
    /// Writes frame index table and updates header with final frame count.
    pub fn finalize(mut self) -> io::Result<FilmStats> {
        // Write frame index table at current position
        let index_offset = self.writer.stream_position()?;
        for index in &self.frame_indices {
            index.write_to(&mut self.writer)?;
        }

        self.header.frame_count = self.frame_indices.len() as u64;

        // Seek back and rewrite header
        self.writer.seek(SeekFrom::Start(0))?;
        self.header.write_to(&mut self.writer)?;
        self.writer.flush()?;

        let frame_count = self.header.frame_count;
        let total_bytes = index_offset + frame_count * FrameIndex::SIZE as u64;

        Ok(FilmStats {
            frame_count,
            total_bytes,
            average_frame_size: if frame_count > 0 {
                index_offset.saturating_sub(FilmHeader::SIZE as u64) / frame_count
            } else {
                0
            },
            compression: self.header.flags.compression,
        })
    }

    /// Get number of frames recorded so far.
    pub fn frames_written(&self) -> u64 {
        self.frame_indices.len() as u64
    }
}

/// Statistics from a recording session.
#[derive(Debug, Clone)]
pub struct FilmStats {
    /// Total frames recorded.
    pub frame_count: u64,
    /// Total file size in bytes.
    pub total_bytes: u64,
    /// Average stored frame size.
    pub average_frame_size: u64,
    /// Compression used.
    pub compression: CompressionType,
}

impl std::fmt::Display for FilmStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} frames, {} bytes total, {} bytes/frame avg ({:?} compression)",
            self.frame_count, self.total_bytes, self.average_frame_size, self.compression
        )
    }
}
