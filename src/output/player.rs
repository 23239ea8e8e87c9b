//! Film player for reading back recorded generations.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use super::format::{CompressionType, FilmHeader, FrameIndex, decode_frame, decompress_lz4};
use crate::compute::Canvas;

/// One decoded film frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FilmFrame {
    pub generation: usize,
    pub fitness: Option<f32>,
    pub canvas: Canvas,
}

/// Film player for reading `.bfilm` files.
///
/// Usage:
/// ```ignore
/// let mut player = FilmPlayer::open("evolution.bfilm")?;
/// for frame in player.frames() {
///     let frame = frame?;
///     println!("generation {}: {:?}", frame.generation, frame.fitness);
/// }
/// ```
pub struct FilmPlayer {
    reader: BufReader<File>,
    header: FilmHeader,
    frame_indices: Vec<FrameIndex>,
}

impl FilmPlayer {
    /// Open a film file for playback.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let header = FilmHeader::read_from(&mut reader)?;

        // The index table sits at the end of the file
        let index_size = header
            .frame_count
            .checked_mul(FrameIndex::SIZE as u64)
            .ok_or_else(|| corrupt("frame count overflows index size"))?;
        let file_len = reader.seek(SeekFrom::End(0))?;
        let index_start = file_len
            .checked_sub(index_size)
            .filter(|&start| start >= FilmHeader::SIZE as u64)
            .ok_or_else(|| corrupt("file too short for its frame index"))?;

        reader.seek(SeekFrom::Start(index_start))?;

        let mut frame_indices = Vec::with_capacity(header.frame_count as usize);
        for _ in 0..header.frame_count {
            let index = FrameIndex::read_from(&mut reader)?;
            if index.offset.saturating_add(index.size) > index_start {
                return Err(corrupt("frame extends into the index table"));
            }
            frame_indices.push(index);
        }

        Ok(Self {
            reader,
            header,
            frame_indices,
        })
    }

    /// Get film header.
    pub fn header(&self) -> &FilmHeader {
        &self.header
    }

    /// Get total number of frames.
    pub fn frame_count(&self) -> u64 {
        self.header.frame_count
    }

    /// Canvas dimensions as `(width, height)`.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.header.width as usize, self.header.height as usize)
    }

    pub fn fps(&self) -> f32 {
        self.header.fps
    }

    /// Index entry of a frame.
    pub fn frame_index(&self, frame_index: u64) -> Option<&FrameIndex> {
        self.frame_indices.get(frame_index as usize)
    }

    /// Read a specific frame by index.
    pub fn read_frame(&mut self, frame_index: u64) -> io::Result<FilmFrame> {
        let index = *self.frame_index(frame_index).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "Frame index {} out of range ({} frames)",
                    frame_index, self.header.frame_count
                ),
            )
        })?;

        self.reader.seek(SeekFrom::Start(index.offset))?;
        let mut data = vec![0u8; index.size as usize];
        self.reader.read_exact(&mut data)?;

        let raw_data = match self.header.flags.compression {
            CompressionType::None => data,
            CompressionType::Lz4 => decompress_lz4(&data)?,
        };

        let pixel_count = self.header.pixel_count();
        if pixel_count.checked_mul(4) != Some(raw_data.len()) {
            return Err(corrupt("frame size does not match the film dimensions"));
        }

        let (width, height) = self.dimensions();
        let mut pixels = vec![0.0f32; pixel_count];
        decode_frame(&raw_data, &mut pixels)?;

        Ok(FilmFrame {
            generation: index.generation as usize,
            fitness: (!index.fitness.is_nan()).then_some(index.fitness),
            canvas: Canvas {
                width,
                height,
                pixels,
            },
        })
    }

    /// Create an iterator over all frames.
    pub fn frames(&mut self) -> FrameIterator<'_> {
        FrameIterator {
            player: self,
            current: 0,
        }
    }
}

fn corrupt(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.to_string())
}

/// Iterator over film frames.
pub struct FrameIterator<'a> {
    player: &'a mut FilmPlayer,
    current: u64,
}

impl<'a> Iterator for FrameIterator<'a> {
    type Item = io::Result<FilmFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.player.frame_count() {
            return None;
        }

        let result = self.player.read_frame(self.current);
        self.current += 1;
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.player.frame_count() - self.current) as usize;
        (remaining, Some(remaining))
    }
}

impl<'a> ExactSizeIterator for FrameIterator<'a> {}
