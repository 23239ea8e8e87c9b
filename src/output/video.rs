//! MP4 export through an external `ffmpeg` process.

use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;

use super::OutputError;
use super::palette::to_rgb;
use crate::compute::Canvas;
use crate::schema::Palette;

/// Encode `frames` into a video at `path`.
///
/// Frames are colorized with `palette` and piped to `ffmpeg` as raw RGB.
/// Every frame must share the first frame's dimensions.
pub fn encode_video(
    frames: &[&Canvas],
    path: &Path,
    fps: f32,
    palette: Palette,
    ffmpeg: &str,
) -> Result<(), OutputError> {
    let Some(first) = frames.first() else {
        return Err(OutputError::NothingRecorded);
    };
    let (width, height) = (first.width, first.height);
    if let Some(odd) = frames
        .iter()
        .find(|c| c.width != width || c.height != height)
    {
        return Err(OutputError::InvalidCanvas(odd.width, odd.height));
    }

    let mut child = Command::new(ffmpeg)
        .args(["-y", "-loglevel", "error", "-nostats"])
        .args(["-f", "rawvideo", "-pixel_format", "rgb24"])
        .arg("-video_size")
        .arg(format!("{width}x{height}"))
        .arg("-framerate")
        .arg(fps.to_string())
        .args(["-i", "-"])
        .args(["-vf", "scale=trunc(iw/2)*2:trunc(ih/2)*2:flags=neighbor"])
        .args(["-c:v", "libx264", "-pix_fmt", "yuv420p"])
        .arg(path)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                OutputError::EncoderUnavailable(ffmpeg.to_string())
            }
            _ => OutputError::Io(e),
        })?;

    // stderr is drained while frames are written.
    let stderr_reader = child.stderr.take().map(|mut stderr| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            if let Err(e) = stderr.read_to_end(&mut buf) {
                log::warn!("failed to read ffmpeg stderr: {}", e);
            }
            buf
        })
    });

    if let Some(mut stdin) = child.stdin.take() {
        for canvas in frames {
            if let Err(e) = stdin.write_all(&to_rgb(palette, &canvas.pixels)) {
                log::warn!("ffmpeg stopped reading frames: {}", e);
                break;
            }
        }
    }

    let status = child.wait()?;
    let stderr = stderr_reader
        .and_then(|reader| reader.join().ok())
        .unwrap_or_default();
    if !status.success() {
        return Err(OutputError::EncoderFailed {
            status: status.to_string(),
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_encoder() {
        let dir = tempdir().unwrap();
        let canvas = Canvas::new(4, 4);
        let err = encode_video(
            &[&canvas],
            &dir.path().join("out.mp4"),
            5.0,
            Palette::Grayscale,
            "/nonexistent/brush-ffmpeg",
        )
        .unwrap_err();
        assert!(matches!(err, OutputError::EncoderUnavailable(_)));
    }

    #[test]
    fn test_no_frames() {
        let dir = tempdir().unwrap();
        let err = encode_video(
            &[],
            &dir.path().join("out.mp4"),
            5.0,
            Palette::Grayscale,
            "ffmpeg",
        )
        .unwrap_err();
        assert!(matches!(err, OutputError::NothingRecorded));
    }

    #[test]
    fn test_mismatched_frames() {
        let dir = tempdir().unwrap();
        let (a, b) = (Canvas::new(4, 4), Canvas::new(4, 2));
        let err = encode_video(
            &[&a, &b],
            &dir.path().join("out.mp4"),
            5.0,
            Palette::Grayscale,
            "ffmpeg",
        )
        .unwrap_err();
        assert!(matches!(err, OutputError::InvalidCanvas(4, 2)));
    }

    #[cfg(unix)]
    #[test]
    fn test_noisy_failing_encoder() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        // Fills the stderr pipe well past its buffer without reading stdin.
        let encoder = dir.path().join("noisy-ffmpeg");
        std::fs::write(&encoder, "#!/bin/sh\nyes error | head -c 200000 >&2\nexit 3\n").unwrap();
        std::fs::set_permissions(&encoder, std::fs::Permissions::from_mode(0o755)).unwrap();

        let frames: Vec<Canvas> = (0..4).map(|_| Canvas::new(256, 256)).collect();
        let refs: Vec<&Canvas> = frames.iter().collect();
        let err = encode_video(
            &refs,
            &dir.path().join("out.mp4"),
            5.0,
            Palette::Grayscale,
            encoder.to_str().unwrap(),
        )
        .unwrap_err();

        match err {
            OutputError::EncoderFailed { stderr, .. } => {
                assert!(stderr.len() > 100_000);
                assert!(stderr.starts_with("error"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
