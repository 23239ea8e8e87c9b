//! PNG export and import of canvases.

use std::fs;
use std::path::{Path, PathBuf};

use image::{GrayImage, RgbImage};

use super::OutputError;
use super::palette::to_rgb;
use crate::compute::{Canvas, Pattern};
use crate::schema::Palette;

/// Write one canvas as a PNG.
pub fn save_canvas(canvas: &Canvas, palette: Palette, path: &Path) -> Result<(), OutputError> {
    let (w, h) = (canvas.width as u32, canvas.height as u32);
    match palette {
        Palette::Grayscale => GrayImage::from_raw(w, h, canvas.to_luma8())
            .ok_or(OutputError::InvalidCanvas(canvas.width, canvas.height))?
            .save(path)?,
        Palette::Viridis => RgbImage::from_raw(w, h, to_rgb(palette, &canvas.pixels))
            .ok_or(OutputError::InvalidCanvas(canvas.width, canvas.height))?
            .save(path)?,
    }
    Ok(())
}

/// Read a PNG back into a canvas using its luminance.
pub fn load_canvas(path: &Path) -> Result<Canvas, OutputError> {
    let gray = image::open(path)?.to_luma8();
    let (width, height) = (gray.width() as usize, gray.height() as usize);
    Canvas::from_luma8(width, height, gray.as_raw())
        .ok_or(OutputError::InvalidCanvas(width, height))
}

/// Write `<dir>/generation_<g>/pattern_<i>.png` for every pattern.
///
/// Returns the generation directory.
pub fn export_generation(
    population: &[Pattern],
    generation: usize,
    dir: &Path,
    palette: Palette,
) -> Result<PathBuf, OutputError> {
    let generation_dir = dir.join(format!("generation_{generation}"));
    fs::create_dir_all(&generation_dir)?;

    for (i, pattern) in population.iter().enumerate() {
        save_canvas(
            &pattern.canvas,
            palette,
            &generation_dir.join(format!("pattern_{i}.png")),
        )?;
    }
    Ok(generation_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::Generator;
    use crate::schema::{CanvasConfig, NetworkConfig, NetworkGenome};
    use tempfile::tempdir;

    #[test]
    fn test_grayscale_png_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pattern.png");
        let generator = Generator::new(
            NetworkConfig::default(),
            CanvasConfig {
                width: 20,
                height: 14,
            },
        );
        let canvas = generator.generate(5);

        save_canvas(&canvas, Palette::Grayscale, &path).unwrap();
        let loaded = load_canvas(&path).unwrap();

        assert_eq!((loaded.width, loaded.height), (20, 14));
        for (a, b) in canvas.pixels.iter().zip(&loaded.pixels) {
            assert!((a - b).abs() <= 1.0 / 255.0);
        }
    }

    #[test]
    fn test_export_generation_layout() {
        let dir = tempdir().unwrap();
        let genome = NetworkGenome::zeros(&NetworkConfig::default());
        let population: Vec<Pattern> = (0..3)
            .map(|id| {
                let mut p = Pattern::unrendered(id, genome.clone(), 4);
                p.canvas = Canvas::new(6, 6);
                p
            })
            .collect();

        let out = export_generation(&population, 4, dir.path(), Palette::Viridis).unwrap();
        assert_eq!(out, dir.path().join("generation_4"));
        for i in 0..3 {
            assert!(out.join(format!("pattern_{i}.png")).exists());
        }
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempdir().unwrap();
        assert!(load_canvas(&dir.path().join("missing.png")).is_err());
    }
}
