//! Background selection for processed logos.
//!
//! Two questions are answered here: which color a freshly processed logo
//! should sit on by default, and which colors are safe to offer as
//! alternatives. Both are pure functions over rasters, palettes and
//! brightness values; the session decides when to call them.

use crate::contrast::{adaptive_outline_for, color_distance, image_brightness, swatch_brightness, Outline};
use crate::error::SessionError;
use crate::image_processor::RasterImage;
use crate::swatch::ColorSwatch;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of border pixels sampled when guessing the original background.
pub const DETECTION_SAMPLES: usize = 8;
/// Detected backgrounds above this agreement are trusted.
pub const CONFIDENT_DETECTION: f64 = 0.6;
/// A detected background this close to a palette color is corroborated.
pub const PALETTE_MATCH_DISTANCE: f64 = 30.0;
/// Logo/background brightness difference under which the pair is illegible.
pub const ILLEGIBLE_BRIGHTNESS_DIFF: f64 = 50.0;
/// Minimum brightness difference for an offered background.
pub const MIN_BRIGHTNESS_DIFF: f64 = 100.0;
/// Offered backgrounds must be at least this far from every logo color.
pub const LOGO_COLOR_DISTANCE: f64 = 150.0;
/// Spacing between entries of the candidate list.
pub const CANDIDATE_SPACING: f64 = 60.0;
pub const MAX_CANDIDATES: usize = 7;

/// Modal border color of an original upload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectedBackground {
    pub color: ColorSwatch,
    /// Fraction of the sample points that agreed, 0.5 to 1.0.
    pub confidence: f64,
}

/// Corners, then top/bottom midpoints, then left/right midpoints.
fn sample_points(width: u32, height: u32) -> [(u32, u32); DETECTION_SAMPLES] {
    let (r, b) = (width - 1, height - 1);
    let (mx, my) = (width / 2, height / 2);
    [(0, 0), (r, 0), (0, b), (r, b), (mx, 0), (mx, b), (0, my), (r, my)]
}

/// Guess the background of an original (pre-removal) upload from its border.
///
/// Alpha is ignored. At least half the samples must agree exactly; ties go
/// to the color sampled first.
pub fn detect_background(original: &RasterImage) -> Option<DetectedBackground> {
    if original.width == 0 || original.height == 0 {
        return None;
    }

    // First-seen order is kept so ties resolve to the earliest sample.
    let mut tally: Vec<(ColorSwatch, usize)> = Vec::with_capacity(DETECTION_SAMPLES);
    for (x, y) in sample_points(original.width, original.height) {
        let color = ColorSwatch::from(original.pixel(x, y));
        match tally.iter_mut().find(|(c, _)| *c == color) {
            Some((_, count)) => *count += 1,
            None => tally.push((color, 1)),
        }
    }

    let mut best: Option<(ColorSwatch, usize)> = None;
    for (color, count) in tally {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((color, count));
        }
    }

    let (color, count) = best?;
    if count * 2 < DETECTION_SAMPLES {
        return None;
    }
    Some(DetectedBackground {
        color,
        confidence: count as f64 / DETECTION_SAMPLES as f64,
    })
}

/// Default background from the original, the processed logo and the palette.
pub fn select_default(original: &RasterImage, processed: &RasterImage, palette: &[ColorSwatch]) -> ColorSwatch {
    choose_default(detect_background(original), image_brightness(processed), palette)
}

/// Decision step of [`select_default`] once detection and logo brightness
/// are known.
pub fn choose_default(
    detected: Option<DetectedBackground>,
    logo_brightness: f64,
    palette: &[ColorSwatch],
) -> ColorSwatch {
    if let Some(bg) = detected.filter(|d| d.confidence > CONFIDENT_DETECTION) {
        let corroborated = palette
            .iter()
            .any(|c| color_distance(bg.color, *c) < PALETTE_MATCH_DISTANCE);
        if corroborated {
            log::debug!("detected background {} matches the palette", bg.color);
            return bg.color;
        }

        let bg_brightness = swatch_brightness(bg.color);
        if (logo_brightness - bg_brightness).abs() < ILLEGIBLE_BRIGHTNESS_DIFF {
            let flipped = if bg_brightness < 128.0 { ColorSwatch::WHITE } else { ColorSwatch::BLACK };
            log::debug!(
                "detected background {} too close to logo brightness {:.0}, using {}",
                bg.color,
                logo_brightness,
                flipped
            );
            return flipped;
        }
        return bg.color;
    }

    if logo_brightness > 128.0 {
        ColorSwatch::BLACK
    } else {
        ColorSwatch::WHITE
    }
}

/// Why a color was not offered as a background.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum Rejection {
    #[error("dark background ({bg:.0}) with non-bright logo ({logo:.0})")]
    DarkPolarity { bg: f64, logo: f64 },

    #[error("bright background ({bg:.0}) with non-dark logo ({logo:.0})")]
    BrightPolarity { bg: f64, logo: f64 },

    #[error("insufficient brightness contrast ({diff:.0} < 100)")]
    InsufficientContrast { diff: f64 },

    #[error("matches logo color {logo_color}")]
    MatchesLogoColor { logo_color: ColorSwatch },
}

/// Per-color legibility test. Rules run in a fixed order and the first one
/// that fires is reported.
pub fn check_candidate(
    color: ColorSwatch,
    logo_brightness: f64,
    original_palette: &[ColorSwatch],
) -> Result<(), Rejection> {
    let bg = swatch_brightness(color);
    let logo = logo_brightness;

    if bg < 60.0 && logo < 150.0 {
        return Err(Rejection::DarkPolarity { bg, logo });
    }
    if bg > 195.0 && logo > 100.0 {
        return Err(Rejection::BrightPolarity { bg, logo });
    }
    let diff = (logo - bg).abs();
    if diff < MIN_BRIGHTNESS_DIFF {
        return Err(Rejection::InsufficientContrast { diff });
    }
    if let Some(logo_color) = original_palette
        .iter()
        .find(|c| color_distance(color, **c) < LOGO_COLOR_DISTANCE)
    {
        return Err(Rejection::MatchesLogoColor { logo_color: *logo_color });
    }
    Ok(())
}

fn passes(color: ColorSwatch, logo_brightness: f64, original_palette: &[ColorSwatch]) -> bool {
    match check_candidate(color, logo_brightness, original_palette) {
        Ok(()) => true,
        Err(rejection) => {
            log::debug!("filtered {}: {}", color, rejection);
            false
        }
    }
}

/// Keep the palette members that are legible behind the logo, in order.
pub fn filter_candidates(
    palette: &[ColorSwatch],
    logo_brightness: f64,
    original_palette: &[ColorSwatch],
) -> Vec<ColorSwatch> {
    let kept: Vec<ColorSwatch> = palette
        .iter()
        .copied()
        .filter(|c| passes(*c, logo_brightness, original_palette))
        .collect();
    log::debug!(
        "logo brightness {:.0}: {} -> {} colors",
        logo_brightness,
        palette.len(),
        kept.len()
    );
    kept
}

/// Default background plus the alternatives offered for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundChoice {
    pub default: ColorSwatch,
    pub candidates: Vec<ColorSwatch>,
}

impl BackgroundChoice {
    /// Build the offered list: white, black, then `offered` in order, each
    /// kept only if it passes [`check_candidate`] and sits at least 60 away
    /// from what is already listed. A default that did not make the list is
    /// put first, displacing listed colors closer than 60 to it.
    pub fn assemble(
        default: ColorSwatch,
        offered: &[ColorSwatch],
        logo_brightness: f64,
        original_palette: &[ColorSwatch],
    ) -> Self {
        let mut candidates: Vec<ColorSwatch> = Vec::with_capacity(MAX_CANDIDATES);
        let pool = [ColorSwatch::WHITE, ColorSwatch::BLACK]
            .into_iter()
            .chain(offered.iter().copied());

        for color in pool {
            if candidates.len() >= MAX_CANDIDATES {
                break;
            }
            if candidates
                .iter()
                .any(|kept| color_distance(color, *kept) < CANDIDATE_SPACING)
            {
                continue;
            }
            if passes(color, logo_brightness, original_palette) {
                candidates.push(color);
            }
        }

        if !candidates.contains(&default) {
            candidates.retain(|kept| color_distance(default, *kept) >= CANDIDATE_SPACING);
            candidates.insert(0, default);
            candidates.truncate(MAX_CANDIDATES);
        }

        Self { default, candidates }
    }

    /// Rebuild the candidate list under the current rules, keeping the
    /// default.
    pub fn rebuild(&mut self, offered: &[ColorSwatch], logo_brightness: f64, original_palette: &[ColorSwatch]) {
        *self = Self::assemble(self.default, offered, logo_brightness, original_palette);
    }

    /// Flag another listed candidate as the default.
    pub fn set_default(&mut self, color: ColorSwatch) -> Result<(), SessionError> {
        if !self.candidates.contains(&color) {
            return Err(SessionError::NotACandidate(color.to_hex()));
        }
        self.default = color;
        Ok(())
    }

    pub fn outline(&self) -> Outline {
        adaptive_outline_for(self.default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgb::RGBA8;

    fn hex(s: &str) -> ColorSwatch {
        s.parse().unwrap()
    }

    /// `size`x`size` raster with a `border`-wide frame around a filled center.
    fn framed(size: u32, border: u32, frame: RGBA8, center: RGBA8) -> RasterImage {
        let mut pixels = Vec::with_capacity((size * size) as usize);
        for y in 0..size {
            for x in 0..size {
                let edge = x < border || y < border || x >= size - border || y >= size - border;
                pixels.push(if edge { frame } else { center });
            }
        }
        RasterImage { width: size, height: size, pixels }
    }

    fn flat(size: u32, color: RGBA8) -> RasterImage {
        RasterImage {
            width: size,
            height: size,
            pixels: vec![color; (size * size) as usize],
        }
    }

    #[test]
    fn test_detects_uniform_border() {
        let img = framed(20, 2, RGBA8::new(255, 255, 255, 255), RGBA8::new(10, 20, 90, 255));
        let detected = detect_background(&img).unwrap();
        assert_eq!(detected.color, ColorSwatch::WHITE);
        assert_eq!(detected.confidence, 1.0);
    }

    #[test]
    fn test_detection_needs_half_the_samples() {
        // Left half red, right half blue: corners and midpoints split 4/4,
        // top/bottom midpoints land on the right half (x = w/2).
        let mut img = flat(10, RGBA8::new(200, 0, 0, 255));
        for y in 0..10 {
            for x in 5..10 {
                img.pixels[(y * 10 + x) as usize] = RGBA8::new(0, 0, 200, 255);
            }
        }
        let detected = detect_background(&img).unwrap();
        // red: (0,0) (0,9) (0,5) = 3, blue: the other 5
        assert_eq!(detected.color, ColorSwatch::new(0, 0, 200));
        assert_eq!(detected.confidence, 5.0 / 8.0);
    }

    #[test]
    fn test_detection_fails_on_mixed_border() {
        let mut img = flat(10, RGBA8::new(0, 0, 0, 255));
        let points = sample_points(10, 10);
        for (i, (x, y)) in points.iter().enumerate() {
            let v = (i * 30) as u8;
            img.pixels[(y * 10 + x) as usize] = RGBA8::new(v, v, v, 255);
        }
        assert!(detect_background(&img).is_none());
    }

    #[test]
    fn test_detection_tie_goes_to_first_sampled() {
        // Top row white, bottom row black, middle row split: 4/4 tie
        let mut img = flat(9, RGBA8::new(0, 0, 0, 255));
        for x in 0..9 {
            img.pixels[x] = RGBA8::new(255, 255, 255, 255);
        }
        img.pixels[4 * 9] = RGBA8::new(255, 255, 255, 255);
        let detected = detect_background(&img).unwrap();
        assert_eq!(detected.color, ColorSwatch::WHITE);
        assert_eq!(detected.confidence, 0.5);
    }

    #[test]
    fn test_detection_ignores_alpha() {
        let img = framed(12, 1, RGBA8::new(255, 255, 255, 0), RGBA8::new(0, 0, 0, 255));
        assert_eq!(detect_background(&img).unwrap().color, ColorSwatch::WHITE);
    }

    #[test]
    fn test_white_border_dark_logo_keeps_white() {
        let original = framed(40, 4, RGBA8::new(255, 255, 255, 255), RGBA8::new(30, 30, 30, 255));
        let processed = flat(20, RGBA8::new(30, 30, 30, 255));
        let palette = vec![hex("#1E1E1E")];
        assert!((image_brightness(&processed) - 30.0).abs() < 1e-6);
        assert_eq!(select_default(&original, &processed, &palette), ColorSwatch::WHITE);
    }

    #[test]
    fn test_palette_match_wins_over_legibility() {
        let detected = DetectedBackground { color: hex("#102030"), confidence: 1.0 };
        // Logo brightness equal to the background would otherwise flip it
        let palette = vec![hex("#112233")];
        assert_eq!(choose_default(Some(detected), 28.0, &palette), hex("#102030"));
    }

    #[test]
    fn test_illegible_detection_flips() {
        let dark = DetectedBackground { color: hex("#202020"), confidence: 0.75 };
        assert_eq!(choose_default(Some(dark), 40.0, &[]), ColorSwatch::WHITE);

        let light = DetectedBackground { color: hex("#F0F0F0"), confidence: 0.75 };
        assert_eq!(choose_default(Some(light), 230.0, &[]), ColorSwatch::BLACK);
    }

    #[test]
    fn test_low_confidence_falls_back_to_inversion() {
        let weak = DetectedBackground { color: hex("#FF0000"), confidence: 0.5 };
        assert_eq!(choose_default(Some(weak), 200.0, &[]), ColorSwatch::BLACK);
        assert_eq!(choose_default(None, 128.0, &[]), ColorSwatch::WHITE);
        assert_eq!(choose_default(None, 128.5, &[]), ColorSwatch::BLACK);
    }

    #[test]
    fn test_bright_logo_keeps_near_black() {
        assert_eq!(check_candidate(hex("#101010"), 200.0, &[]), Ok(()));
        assert_eq!(filter_candidates(&[hex("#101010")], 200.0, &[]), vec![hex("#101010")]);
    }

    #[test]
    fn test_bright_logo_rejects_near_white() {
        let result = check_candidate(hex("#F5F5F5"), 200.0, &[]);
        assert!(matches!(result, Err(Rejection::BrightPolarity { .. })));
    }

    #[test]
    fn test_dark_polarity_and_contrast_rules() {
        assert!(matches!(
            check_candidate(ColorSwatch::BLACK, 149.0, &[]),
            Err(Rejection::DarkPolarity { .. })
        ));
        // bg 128, logo 200: no polarity rule, diff 72
        assert!(matches!(
            check_candidate(ColorSwatch::new(128, 128, 128), 200.0, &[]),
            Err(Rejection::InsufficientContrast { .. })
        ));
    }

    #[test]
    fn test_logo_color_similarity_rejects() {
        let logo_colors = vec![hex("#0A0A0A")];
        assert_eq!(
            check_candidate(ColorSwatch::BLACK, 220.0, &logo_colors),
            Err(Rejection::MatchesLogoColor { logo_color: hex("#0A0A0A") })
        );
    }

    #[test]
    fn test_filter_is_idempotent() {
        let palette = vec![hex("#101010"), hex("#F5F5F5"), hex("#3050A0"), hex("#000000"), hex("#808080")];
        let original = vec![hex("#E0E0E0")];
        let once = filter_candidates(&palette, 220.0, &original);
        let twice = filter_candidates(&once, 220.0, &original);
        assert_eq!(once, twice);
        assert_eq!(once, vec![hex("#101010"), hex("#3050A0"), hex("#000000")]);
    }

    #[test]
    fn test_assemble_orders_white_black_palette() {
        let choice = BackgroundChoice::assemble(
            ColorSwatch::WHITE,
            &[hex("#FFFF00")],
            0.0,
            &[],
        );
        // Black fails the dark-polarity rule for a black logo
        assert_eq!(choice.candidates, vec![ColorSwatch::WHITE, hex("#FFFF00")]);
        assert_eq!(choice.default, ColorSwatch::WHITE);
    }

    #[test]
    fn test_assemble_caps_at_seven() {
        let offered = vec![
            hex("#FFFF00"),
            hex("#00FFFF"),
            hex("#FF00FF"),
            hex("#00FF00"),
            hex("#FF8000"),
            hex("#80FF80"),
            hex("#FF80FF"),
            hex("#8080FF"),
        ];
        let choice = BackgroundChoice::assemble(ColorSwatch::WHITE, &offered, 0.0, &[]);
        assert_eq!(choice.candidates.len(), MAX_CANDIDATES);
        assert_eq!(choice.candidates[0], ColorSwatch::WHITE);
        for (i, a) in choice.candidates.iter().enumerate() {
            for b in &choice.candidates[i + 1..] {
                assert!(color_distance(*a, *b) >= CANDIDATE_SPACING);
            }
        }
    }

    #[test]
    fn test_assemble_inserts_failing_default() {
        let logo_color = hex("#3050A0");
        let choice = BackgroundChoice::assemble(logo_color, &[logo_color], 200.0, &[logo_color]);
        assert_eq!(choice.candidates, vec![logo_color, ColorSwatch::BLACK]);
        assert!(choice.candidates.contains(&choice.default));
    }

    #[test]
    fn test_inserted_default_displaces_lookalikes() {
        let border = hex("#F0F0F0");
        let choice = BackgroundChoice::assemble(border, &[], 30.0, &[hex("#141E5A")]);
        assert_eq!(choice.candidates, vec![border]);
        for (i, a) in choice.candidates.iter().enumerate() {
            for b in &choice.candidates[i + 1..] {
                assert!(color_distance(*a, *b) >= CANDIDATE_SPACING);
            }
        }
    }

    #[test]
    fn test_set_default_requires_candidate() {
        let mut choice = BackgroundChoice::assemble(ColorSwatch::WHITE, &[hex("#FFFF00")], 0.0, &[]);
        choice.set_default(hex("#FFFF00")).unwrap();
        assert_eq!(choice.default, hex("#FFFF00"));
        assert_eq!(choice.candidates.len(), 2);

        let err = choice.set_default(hex("#123456")).unwrap_err();
        assert!(matches!(err, SessionError::NotACandidate(ref c) if c == "#123456"));
        assert_eq!(choice.default, hex("#FFFF00"));
    }

    #[test]
    fn test_rebuild_keeps_default() {
        let mut choice = BackgroundChoice {
            default: hex("#FFFF00"),
            candidates: vec![hex("#FFFF00"), hex("#F5F5F5")],
        };
        choice.rebuild(&[hex("#FFFF00")], 0.0, &[]);
        assert_eq!(choice.default, hex("#FFFF00"));
        assert_eq!(choice.candidates, vec![ColorSwatch::WHITE, hex("#FFFF00")]);
    }

    #[test]
    fn test_outline_follows_default() {
        let choice = BackgroundChoice::assemble(ColorSwatch::WHITE, &[], 0.0, &[]);
        assert_eq!(choice.outline().opacity, 0.50);
    }
}
