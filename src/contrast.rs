//! Luminance, brightness and contrast helpers.
//!
//! Two lightness measures live here and they are not interchangeable:
//! WCAG relative luminance (gamma-corrected, 0.0–1.0) drives contrast ratios
//! and the outline table, while perceptual brightness (0–255, plain weighted
//! average) drives the categorical legibility rules in `background`.

use crate::image_processor::RasterImage;
use crate::swatch::ColorSwatch;
use serde::{Deserialize, Serialize};

/// Minimum contrast a palette color needs against white or black.
pub const MIN_PALETTE_CONTRAST: f64 = 2.5;
/// Pixels at or below this alpha do not count towards logo brightness.
pub const VISIBLE_ALPHA: u8 = 20;
/// Brightness assumed when nothing visible can be measured.
pub const NEUTRAL_BRIGHTNESS: f64 = 128.0;

fn linearize(c: u8) -> f64 {
    let c = c as f64 / 255.0;
    if c <= 0.03928 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// WCAG relative luminance in [0, 1].
pub fn luminance(r: u8, g: u8, b: u8) -> f64 {
    0.2126 * linearize(r) + 0.7152 * linearize(g) + 0.0722 * linearize(b)
}

pub fn swatch_luminance(c: ColorSwatch) -> f64 {
    luminance(c.r, c.g, c.b)
}

/// WCAG contrast ratio, 1.0 (identical) to 21.0 (black on white).
pub fn contrast_ratio(a: ColorSwatch, b: ColorSwatch) -> f64 {
    let la = swatch_luminance(a);
    let lb = swatch_luminance(b);
    (la.max(lb) + 0.05) / (la.min(lb) + 0.05)
}

/// Perceptual brightness in [0, 255].
pub fn brightness(r: u8, g: u8, b: u8) -> f64 {
    0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
}

pub fn swatch_brightness(c: ColorSwatch) -> f64 {
    brightness(c.r, c.g, c.b)
}

/// Euclidean distance in RGB space, 0 to ~441.7.
pub fn color_distance(a: ColorSwatch, b: ColorSwatch) -> f64 {
    let dr = a.r as f64 - b.r as f64;
    let dg = a.g as f64 - b.g as f64;
    let db = a.b as f64 - b.b as f64;
    (dr * dr + dg * dg + db * db).sqrt()
}

/// A color stays legible if it reaches 2.5:1 against white or black.
pub fn has_good_contrast(c: ColorSwatch) -> bool {
    contrast_ratio(c, ColorSwatch::WHITE) >= MIN_PALETTE_CONTRAST
        || contrast_ratio(c, ColorSwatch::BLACK) >= MIN_PALETTE_CONTRAST
}

/// Mean brightness over visible pixels (alpha > 20). Returns 128 when the
/// raster has no visible pixel.
pub fn image_brightness(image: &RasterImage) -> f64 {
    let mut total = 0.0;
    let mut visible = 0usize;
    for p in &image.pixels {
        if p.a > VISIBLE_ALPHA {
            total += brightness(p.r, p.g, p.b);
            visible += 1;
        }
    }
    if visible == 0 {
        NEUTRAL_BRIGHTNESS
    } else {
        total / visible as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlineColor {
    White,
    Black,
}

impl OutlineColor {
    pub fn swatch(self) -> ColorSwatch {
        match self {
            OutlineColor::White => ColorSwatch::WHITE,
            OutlineColor::Black => ColorSwatch::BLACK,
        }
    }
}

/// Hairline border that stays visible on a given card background.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    pub color: OutlineColor,
    pub opacity: f64,
}

impl Outline {
    /// CSS `rgba()` form for the display layer.
    pub fn to_css(&self) -> String {
        let c = self.color.swatch();
        format!("rgba({}, {}, {}, {})", c.r, c.g, c.b, self.opacity)
    }
}

/// Outline lookup by background luminance band.
pub fn adaptive_outline_for(background: ColorSwatch) -> Outline {
    let lum = swatch_luminance(background);

    let outline = if lum <= 0.18 {
        Outline { color: OutlineColor::White, opacity: 0.45 }
    } else if lum <= 0.35 {
        Outline { color: OutlineColor::White, opacity: 0.35 }
    } else if lum <= 0.65 {
        let white = contrast_ratio(ColorSwatch::WHITE, background);
        let black = contrast_ratio(ColorSwatch::BLACK, background);
        let color = if white > black { OutlineColor::White } else { OutlineColor::Black };
        Outline { color, opacity: 0.25 }
    } else if lum <= 0.82 {
        Outline { color: OutlineColor::Black, opacity: 0.35 }
    } else {
        Outline { color: OutlineColor::Black, opacity: 0.50 }
    };

    log::debug!("outline for {} (luminance {:.3}): {:?}", background, lum, outline);
    outline
}

/// Outline for a color given as text; unparseable input is treated as white.
pub fn adaptive_outline_for_str(background: &str) -> Outline {
    adaptive_outline_for(background.parse().unwrap_or(ColorSwatch::WHITE))
}
