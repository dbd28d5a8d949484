//! Sobel edge density, a cheap proxy for how photographic an image is.
//!
//! Flat artwork has long uniform runs and few edge pixels; photos and dense
//! illustrations light up most of the frame.

use crate::image_processor::RasterImage;

/// Gradient magnitude above which a pixel counts as an edge.
pub const EDGE_MAGNITUDE_THRESHOLD: f64 = 30.0;

const SOBEL_X: [i32; 9] = [-1, 0, 1, -2, 0, 2, -1, 0, 1];
const SOBEL_Y: [i32; 9] = [-1, -2, -1, 0, 0, 0, 1, 2, 1];

/// Fraction of interior pixels whose Sobel gradient magnitude exceeds 30.
///
/// Grayscale is the plain mean of R, G and B. Border pixels have no full
/// 3×3 neighborhood and are excluded from both counts, so rasters narrower
/// or shorter than three pixels report 0.0.
pub fn compute_edge_density(image: &RasterImage) -> f64 {
    let w = image.width as usize;
    let h = image.height as usize;
    if w < 3 || h < 3 {
        return 0.0;
    }

    // Keep sums in thirds to stay in integers: gray * 3 = r + g + b
    let gray3: Vec<i32> = image
        .pixels
        .iter()
        .map(|p| p.r as i32 + p.g as i32 + p.b as i32)
        .collect();

    let threshold_sq = (EDGE_MAGNITUDE_THRESHOLD * 3.0).powi(2);
    let mut edge_pixels = 0usize;

    for y in 1..(h - 1) {
        for x in 1..(w - 1) {
            let mut gx = 0i32;
            let mut gy = 0i32;

            for ky in 0..3usize {
                for kx in 0..3usize {
                    let px = x + kx - 1;
                    let py = y + ky - 1;
                    let pixel = gray3[py * w + px];
                    let idx = ky * 3 + kx;
                    gx += pixel * SOBEL_X[idx];
                    gy += pixel * SOBEL_Y[idx];
                }
            }

            let magnitude_sq = (gx as f64).powi(2) + (gy as f64).powi(2);
            if magnitude_sq > threshold_sq {
                edge_pixels += 1;
            }
        }
    }

    let interior = (w - 2) * (h - 2);
    edge_pixels as f64 / interior as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgb::RGBA8;

    fn image_from_fn(w: u32, h: u32, f: impl Fn(u32, u32) -> RGBA8) -> RasterImage {
        let mut pixels = Vec::with_capacity((w * h) as usize);
        for y in 0..h {
            for x in 0..w {
                pixels.push(f(x, y));
            }
        }
        RasterImage { width: w, height: h, pixels }
    }

    #[test]
    fn test_uniform_image_has_no_edges() {
        let img = image_from_fn(10, 10, |_, _| RGBA8::new(128, 128, 128, 255));
        assert_eq!(compute_edge_density(&img), 0.0);
    }

    #[test]
    fn test_vertical_edge_density() {
        // Sharp black/white boundary between x=4 and x=5: columns 4 and 5
        // of the 8x8 interior are edges.
        let img = image_from_fn(10, 10, |x, _| {
            if x < 5 {
                RGBA8::new(0, 0, 0, 255)
            } else {
                RGBA8::new(255, 255, 255, 255)
            }
        });
        let density = compute_edge_density(&img);
        assert!((density - 16.0 / 64.0).abs() < 1e-9, "got {}", density);
    }

    #[test]
    fn test_horizontal_edge_detected() {
        let img = image_from_fn(10, 10, |_, y| {
            if y < 5 {
                RGBA8::new(0, 0, 0, 255)
            } else {
                RGBA8::new(255, 255, 255, 255)
            }
        });
        assert!(compute_edge_density(&img) > 0.0);
    }

    #[test]
    fn test_soft_gradient_stays_below_threshold() {
        // 2 levels per pixel: gradient magnitude 8 per step, well under 30
        let img = image_from_fn(50, 10, |x, _| {
            let v = (x * 2) as u8;
            RGBA8::new(v, v, v, 255)
        });
        assert_eq!(compute_edge_density(&img), 0.0);
    }

    #[test]
    fn test_checkerboard_is_all_edges() {
        let img = image_from_fn(12, 12, |x, y| {
            if (x + y) % 2 == 0 {
                RGBA8::new(0, 0, 0, 255)
            } else {
                RGBA8::new(255, 255, 255, 255)
            }
        });
        // Sobel cancels on a one-pixel checkerboard; 2x2 blocks do not.
        let blocks = image_from_fn(12, 12, |x, y| {
            if (x / 2 + y / 2) % 2 == 0 {
                RGBA8::new(0, 0, 0, 255)
            } else {
                RGBA8::new(255, 255, 255, 255)
            }
        });
        assert!(compute_edge_density(&blocks) > 0.9);
        assert!(compute_edge_density(&img) <= 1.0);
    }

    #[test]
    fn test_tiny_images_report_zero() {
        let img = image_from_fn(2, 50, |_, _| RGBA8::new(0, 0, 0, 255));
        assert_eq!(compute_edge_density(&img), 0.0);
    }
}
