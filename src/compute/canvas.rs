//! Raster canvas holding one generated pattern.

/// Row-major grid of intensities in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Canvas {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<f32>,
}

impl Canvas {
    /// Create a zero-filled canvas.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0.0; width * height],
        }
    }

    /// Wrap existing pixel data. Returns `None` when the length does not
    /// match `width * height`.
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<f32>) -> Option<Self> {
        (pixels.len() == width * height).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.pixels[y * self.width + x]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Min-max normalize into `[0, 1]`. A flat canvas becomes all zeros.
    pub fn normalize(&mut self) {
        if self.pixels.is_empty() {
            return;
        }
        let (min, max) = self
            .pixels
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let range = max - min + 1e-7;
        for v in &mut self.pixels {
            *v = ((*v - min) / range).clamp(0.0, 1.0);
        }
    }

    pub fn mean(&self) -> f32 {
        if self.pixels.is_empty() {
            return 0.0;
        }
        self.pixels.iter().sum::<f32>() / self.pixels.len() as f32
    }

    /// Population standard deviation.
    pub fn std(&self) -> f32 {
        if self.pixels.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let variance = self.pixels.iter().map(|&v| (v - mean).powi(2)).sum::<f32>()
            / self.pixels.len() as f32;
        variance.sqrt()
    }

    /// Quantize to 8-bit luminance.
    pub fn to_luma8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect()
    }

    /// Rebuild from 8-bit luminance.
    pub fn from_luma8(width: usize, height: usize, data: &[u8]) -> Option<Self> {
        let pixels = data.iter().map(|&b| b as f32 / 255.0).collect();
        Self::from_pixels(width, height, pixels)
    }

    /// Nearest-neighbour resample, used for thumbnails.
    pub fn resample(&self, width: usize, height: usize) -> Canvas {
        let mut out = Canvas::new(width, height);
        if self.is_empty() {
            return out;
        }
        for y in 0..height {
            let sy = y * self.height / height.max(1);
            for x in 0..width {
                let sx = x * self.width / width.max(1);
                out.pixels[y * width + x] = self.get(sx, sy);
            }
        }
        out
    }
}
