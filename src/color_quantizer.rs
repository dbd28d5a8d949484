//! Color quantization: distinct-color counting and dominant palette extraction.
//!
//! The palette is built with a median cut over the visible, non-white pixels,
//! then narrowed to a handful of legible, mutually distinct swatches.

use crate::contrast::{color_distance, has_good_contrast};
use crate::image_processor::RasterImage;
use crate::swatch::ColorSwatch;
use rgb::RGBA8;
use std::collections::HashSet;

/// Representative colors requested from the median cut.
pub const DEFAULT_PALETTE_SIZE: usize = 20;
/// Upper bound on swatches in a palette result.
pub const MAX_PALETTE_COLORS: usize = 5;
/// Below this many survivors the distinctness threshold is relaxed.
pub const MIN_PREFERRED_COLORS: usize = 3;
pub const DISTINCT_THRESHOLD: f64 = 60.0;
pub const RELAXED_DISTINCT_THRESHOLD: f64 = 40.0;

const COUNT_ALPHA_FLOOR: u8 = 10;
const PALETTE_ALPHA_FLOOR: u8 = 125;
const NEAR_WHITE: u8 = 250;
const MAX_SAMPLES: usize = 50_000;

/// Count visually distinct colors: each channel is reduced to 4 bits and
/// pixels with alpha <= 10 are ignored.
pub fn count_distinct_colors(image: &RasterImage) -> usize {
    let mut seen = HashSet::new();
    for p in &image.pixels {
        if p.a > COUNT_ALPHA_FLOOR {
            seen.insert((p.r >> 4, p.g >> 4, p.b >> 4));
        }
    }
    seen.len()
}

/// Extract up to five legible, well separated swatches ordered by dominance.
///
/// May return an empty palette (fully transparent or all-white images).
pub fn extract_palette(image: &RasterImage, palette_size: usize) -> Vec<ColorSwatch> {
    let dominant = dominant_colors(image, palette_size);

    let mut selected = select_distinct(&dominant, DISTINCT_THRESHOLD);
    if selected.len() < MIN_PREFERRED_COLORS {
        selected = select_distinct(&dominant, RELAXED_DISTINCT_THRESHOLD);
    }

    log::debug!(
        "extracted {} palette colors from {} dominant candidates",
        selected.len(),
        dominant.len()
    );
    selected
}

/// Median-cut quantization to at most `num_colors` representatives, most
/// populated box first.
pub fn dominant_colors(image: &RasterImage, num_colors: usize) -> Vec<ColorSwatch> {
    let samples = palette_samples(&image.pixels);
    if samples.is_empty() || num_colors == 0 {
        return Vec::new();
    }

    let mut boxes = median_cut(samples, num_colors);
    boxes.sort_by(|a, b| b.len().cmp(&a.len()));
    boxes
        .iter()
        .map(|b| ColorSwatch::from(box_average(b)))
        .collect()
}

/// Greedy pass over `candidates` in order, keeping colors with good contrast
/// that are at least `threshold` away from everything kept so far.
pub fn select_distinct(candidates: &[ColorSwatch], threshold: f64) -> Vec<ColorSwatch> {
    let mut selected: Vec<ColorSwatch> = Vec::with_capacity(MAX_PALETTE_COLORS);
    for &color in candidates {
        if !has_good_contrast(color) {
            continue;
        }
        if selected
            .iter()
            .any(|kept| color_distance(color, *kept) < threshold)
        {
            continue;
        }
        selected.push(color);
        if selected.len() >= MAX_PALETTE_COLORS {
            break;
        }
    }
    selected
}

/// Opaque enough and not near-white; sampled down for large rasters.
fn palette_samples(pixels: &[RGBA8]) -> Vec<(u8, u8, u8)> {
    let step = (pixels.len() / MAX_SAMPLES).max(1);
    pixels
        .iter()
        .step_by(step)
        .filter(|p| p.a >= PALETTE_ALPHA_FLOOR)
        .filter(|p| !(p.r > NEAR_WHITE && p.g > NEAR_WHITE && p.b > NEAR_WHITE))
        .map(|p| (p.r, p.g, p.b))
        .collect()
}

/// Median-cut: recursively split the color box along its widest channel.
fn median_cut(colors: Vec<(u8, u8, u8)>, num_colors: usize) -> Vec<Vec<(u8, u8, u8)>> {
    let mut boxes: Vec<Vec<(u8, u8, u8)>> = vec![colors];
    while boxes.len() < num_colors {
        // Find the box with the largest range to split
        let mut best_idx = 0;
        let mut best_range = 0u16;
        for (i, b) in boxes.iter().enumerate() {
            let range = box_max_range(b);
            if range > best_range || (range == best_range && b.len() > boxes[best_idx].len()) {
                best_range = range;
                best_idx = i;
            }
        }
        // Every box is a single color: nothing left to separate.
        if best_range == 0 || boxes[best_idx].len() < 2 {
            break;
        }
        let to_split = boxes.remove(best_idx);
        let (a, b) = split_box(to_split);
        if !a.is_empty() {
            boxes.push(a);
        }
        if !b.is_empty() {
            boxes.push(b);
        }
    }
    boxes
}

fn channel_ranges(colors: &[(u8, u8, u8)]) -> (u8, u8, u8) {
    let (mut rmin, mut rmax) = (255u8, 0u8);
    let (mut gmin, mut gmax) = (255u8, 0u8);
    let (mut bmin, mut bmax) = (255u8, 0u8);
    for &(r, g, b) in colors {
        rmin = rmin.min(r);
        rmax = rmax.max(r);
        gmin = gmin.min(g);
        gmax = gmax.max(g);
        bmin = bmin.min(b);
        bmax = bmax.max(b);
    }
    (
        rmax.saturating_sub(rmin),
        gmax.saturating_sub(gmin),
        bmax.saturating_sub(bmin),
    )
}

fn box_max_range(colors: &[(u8, u8, u8)]) -> u16 {
    let (rr, gr, br) = channel_ranges(colors);
    (rr as u16).max(gr as u16).max(br as u16)
}

fn split_box(mut colors: Vec<(u8, u8, u8)>) -> (Vec<(u8, u8, u8)>, Vec<(u8, u8, u8)>) {
    let (rr, gr, br) = channel_ranges(&colors);

    if rr >= gr && rr >= br {
        colors.sort_by_key(|c| c.0);
    } else if gr >= br {
        colors.sort_by_key(|c| c.1);
    } else {
        colors.sort_by_key(|c| c.2);
    }

    let mid = colors.len() / 2;
    let right = colors.split_off(mid);
    (colors, right)
}

fn box_average(colors: &[(u8, u8, u8)]) -> RGBA8 {
    if colors.is_empty() {
        return RGBA8::new(0, 0, 0, 255);
    }
    let (mut sr, mut sg, mut sb) = (0u64, 0u64, 0u64);
    for &(r, g, b) in colors {
        sr += r as u64;
        sg += g as u64;
        sb += b as u64;
    }
    let n = colors.len() as u64;
    RGBA8::new((sr / n) as u8, (sg / n) as u8, (sb / n) as u8, 255)
}
