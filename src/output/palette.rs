//! Intensity to color mapping for exported images and video.

use crate::schema::Palette;

/// Viridis control points, evenly spaced over `[0, 1]`.
const VIRIDIS: [[f32; 3]; 9] = [
    [68.0, 1.0, 84.0],
    [71.0, 44.0, 122.0],
    [59.0, 81.0, 139.0],
    [44.0, 113.0, 142.0],
    [33.0, 144.0, 141.0],
    [39.0, 173.0, 129.0],
    [92.0, 200.0, 99.0],
    [170.0, 220.0, 50.0],
    [253.0, 231.0, 37.0],
];

/// Map an intensity in `[0, 1]` to RGB.
pub fn colorize(palette: Palette, value: f32) -> [u8; 3] {
    let v = if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    };
    match palette {
        Palette::Grayscale => {
            let g = (v * 255.0).round() as u8;
            [g, g, g]
        }
        Palette::Viridis => {
            let scaled = v * (VIRIDIS.len() - 1) as f32;
            let i = (scaled.floor() as usize).min(VIRIDIS.len() - 2);
            let t = scaled - i as f32;
            let (a, b) = (VIRIDIS[i], VIRIDIS[i + 1]);
            [0, 1, 2].map(|c| (a[c] + (b[c] - a[c]) * t).round() as u8)
        }
    }
}

/// Colorize a whole buffer into packed RGB bytes.
pub fn to_rgb(palette: Palette, pixels: &[f32]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(pixels.len() * 3);
    for &v in pixels {
        rgb.extend_from_slice(&colorize(palette, v));
    }
    rgb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grayscale_endpoints() {
        assert_eq!(colorize(Palette::Grayscale, 0.0), [0, 0, 0]);
        assert_eq!(colorize(Palette::Grayscale, 1.0), [255, 255, 255]);
        assert_eq!(colorize(Palette::Grayscale, 2.0), [255, 255, 255]);
    }

    #[test]
    fn test_viridis_endpoints() {
        assert_eq!(colorize(Palette::Viridis, 0.0), [68, 1, 84]);
        assert_eq!(colorize(Palette::Viridis, 1.0), [253, 231, 37]);
        assert_eq!(colorize(Palette::Viridis, 0.5), [33, 144, 141]);
    }

    #[test]
    fn test_to_rgb_length() {
        assert_eq!(to_rgb(Palette::Viridis, &[0.1, 0.2, 0.3]).len(), 9);
    }
}
