//! Export of evolution results: images, films, video and statistics.
//!
//! # File Format
//!
//! The `.bfilm` (Brush film) format stores the best canvas of every
//! generation with optional compression:
//!
//! ```text
//! Header (44 bytes):
//!   Magic: "BRSH" (4 bytes)
//!   Version: u16
//!   Flags: u16 (compression)
//!   Width: u32
//!   Height: u32
//!   Frame count: u64
//!   Frame rate: f32
//!   Reserved: 16 bytes
//!
//! Frame data (variable):
//!   Each frame is height * width * 4 bytes (f32 LE), optionally LZ4 compressed
//!
//! Frame index table (frame_count * 28 bytes, at end of file):
//!   Offset: u64
//!   Stored size: u64
//!   Generation: u64
//!   Fitness: f32 (NaN when unscored)
//! ```

mod format;
mod handler;
mod images;
mod palette;
mod player;
mod recorder;
mod stats_log;
mod video;

pub use format::{CompressionType, FILM_MAGIC, FILM_VERSION, FilmFlags, FilmHeader, FrameIndex};
pub use handler::{FILM_FILE, OutputHandler, RecordedFrame, VIDEO_FILE};
pub use images::{export_generation, load_canvas, save_canvas};
pub use palette::{colorize, to_rgb};
pub use player::{FilmFrame, FilmPlayer, FrameIterator};
pub use recorder::{FilmRecorder, FilmStats};
pub use stats_log::{STATS_LOG_FILE, StatsLog};
pub use video::encode_video;

/// Export errors.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Statistics serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Canvas buffer does not match its {0}x{1} size")]
    InvalidCanvas(usize, usize),
    #[error("Video encoder `{0}` is not available")]
    EncoderUnavailable(String),
    #[error("Video encoder failed ({status}): {stderr}")]
    EncoderFailed { status: String, stderr: String },
    #[error("No generations have been recorded")]
    NothingRecorded,
}
