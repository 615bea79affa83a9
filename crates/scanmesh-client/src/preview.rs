use std::path::Path;

use glam::DVec3;
use image::{Rgb, RgbImage};

use crate::colormap::ColorScheme;

const BACKGROUND: Rgb<u8> = Rgb([17, 17, 17]);

// Fraction of the image kept free around the cloud.
const MARGIN: f64 = 0.05;

// Larger clouds are decimated before drawing.
const MAX_PREVIEW_POINTS: usize = 1_000_000;

/// Camera used to render the preview.
#[derive(Debug, Clone, Copy)]
pub struct PreviewCamera {
    /// Rotation around the z axis in degrees.
    pub azimuth: f64,
    /// Angle above the xy plane in degrees.
    pub elevation: f64,
}

impl Default for PreviewCamera {
    fn default() -> Self {
        Self {
            azimuth: 45.0,
            elevation: 30.0,
        }
    }
}

/// Render an orthographic scatter view of the points colored by height.
///
/// Points are drawn back to front so the ones closer to the camera stay
/// visible. The image is `size` x `size` pixels.
pub fn render_preview(
    points: &[[f64; 3]],
    scheme: ColorScheme,
    camera: PreviewCamera,
    size: u32,
) -> RgbImage {
    let mut img = RgbImage::from_pixel(size, size, BACKGROUND);
    if points.is_empty() || size == 0 {
        return img;
    }

    let stride = points.len().div_ceil(MAX_PREVIEW_POINTS);
    let points = points
        .iter()
        .step_by(stride)
        .map(|p| DVec3::from_array(*p))
        .collect::<Vec<_>>();

    let (az, el) = (camera.azimuth.to_radians(), camera.elevation.to_radians());
    let view = DVec3::new(az.cos() * el.cos(), az.sin() * el.cos(), el.sin());
    let right = DVec3::new(-az.sin(), az.cos(), 0.0);
    let up = view.cross(right);

    let (min, max) = points
        .iter()
        .fold((DVec3::INFINITY, DVec3::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(*p), hi.max(*p))
        });
    let center = (min + max) * 0.5;
    let z_range = max.z - min.z;

    // (depth, screen x, screen y, height)
    let mut projected = points
        .iter()
        .map(|p| {
            let d = *p - center;
            (d.dot(view), d.dot(right), d.dot(up), p.z)
        })
        .collect::<Vec<_>>();

    let extent = projected
        .iter()
        .fold(0.0f64, |acc, &(_, x, y, _)| acc.max(x.abs()).max(y.abs()));
    let half = size as f64 * 0.5;
    let scale = if extent > 0.0 {
        half * (1.0 - 2.0 * MARGIN) / extent
    } else {
        0.0
    };
    let radius = if size >= 400 { 1 } else { 0 };

    // far points first
    projected.sort_by(|a, b| a.0.total_cmp(&b.0));

    for (_, x, y, z) in projected {
        let t = if z_range > 0.0 { (z - min.z) / z_range } else { 0.5 };
        let color = Rgb(scheme.sample(t));
        let px = (half + x * scale).round() as i64;
        let py = (half - y * scale).round() as i64;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let (u, v) = (px + dx, py + dy);
                if u >= 0 && v >= 0 && u < size as i64 && v < size as i64 {
                    img.put_pixel(u as u32, v as u32, color);
                }
            }
        }
    }

    img
}

/// Render the preview and save it as a PNG file.
pub fn save_preview(
    path: impl AsRef<Path>,
    points: &[[f64; 3]],
    scheme: ColorScheme,
    size: u32,
) -> Result<(), image::ImageError> {
    render_preview(points, scheme, PreviewCamera::default(), size).save(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube_corners() -> Vec<[f64; 3]> {
        let mut points = Vec::new();
        for x in [0.0, 1.0] {
            for y in [0.0, 1.0] {
                for z in [0.0, 1.0] {
                    points.push([x, y, z]);
                }
            }
        }
        points
    }

    #[test]
    fn test_empty_cloud_is_background() {
        let img = render_preview(&[], ColorScheme::Viridis, PreviewCamera::default(), 32);
        assert_eq!(img.dimensions(), (32, 32));
        assert!(img.pixels().all(|p| *p == BACKGROUND));
    }

    #[test]
    fn test_points_are_drawn_inside_margin() {
        let img = render_preview(
            &cube_corners(),
            ColorScheme::Viridis,
            PreviewCamera::default(),
            100,
        );
        let drawn = img.pixels().filter(|p| **p != BACKGROUND).count();
        assert!(drawn >= 6);
        // corners of the image are never reached
        assert_eq!(*img.get_pixel(0, 0), BACKGROUND);
        assert_eq!(*img.get_pixel(99, 99), BACKGROUND);
    }

    #[test]
    fn test_height_colors() {
        // looking straight down the top point hides the bottom one
        let camera = PreviewCamera {
            azimuth: 0.0,
            elevation: 90.0,
        };
        let points = [[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 1.0, 0.0]];
        let img = render_preview(&points, ColorScheme::Jet, camera, 64);
        let colors = img
            .pixels()
            .filter(|p| **p != BACKGROUND)
            .copied()
            .collect::<std::collections::HashSet<_>>();
        assert!(colors.contains(&Rgb(ColorScheme::Jet.sample(1.0))));
        assert!(colors.contains(&Rgb(ColorScheme::Jet.sample(0.0))));
    }

    #[test]
    fn test_save_preview_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan_preview.png");
        save_preview(&path, &cube_corners(), ColorScheme::Plasma, 50).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}
