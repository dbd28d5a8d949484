//! Logo quality screening.
//!
//! An upload is scored by folding an ordered list of independent rules over a
//! running evaluation that starts at 100 points. Hard errors always reject;
//! warnings only reject in combination (a low score *and* several warnings),
//! which keeps gradient and illustration logos from being turned away on a
//! single noisy signal.

use crate::color_quantizer::count_distinct_colors;
use crate::edge_detector::compute_edge_density;
use crate::image_processor::{self, DEFAULT_MAX_SIDE};
use serde::{Deserialize, Serialize};
use std::path::Path;

const MB: f64 = 1024.0 * 1024.0;

/// Limits applied by the scorer.
#[derive(Debug, Clone)]
pub struct QualityThresholds {
    /// Accepted format tags, compared after lowercasing and dropping `image/`.
    pub allowed_formats: Vec<String>,
    pub max_file_size: u64,
    pub warn_file_size: u64,
    pub max_dimension: u32,
    pub min_dimension: u32,
    /// KB per 1000 pixels.
    pub max_size_efficiency: f64,
    pub very_high_colors: usize,
    pub max_colors: usize,
    pub warn_colors: usize,
    pub very_high_edge_density: f64,
    pub max_edge_density: f64,
    pub warn_edge_density: f64,
    /// Longest side of the raster the color and edge measurements run on.
    pub analysis_max_side: u32,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            allowed_formats: vec!["jpeg".into(), "jpg".into(), "png".into()],
            max_file_size: 5 * 1024 * 1024,
            warn_file_size: 2 * 1024 * 1024,
            max_dimension: 2500,
            min_dimension: 150,
            max_size_efficiency: 0.5,
            very_high_colors: 100,
            max_colors: 50,
            warn_colors: 20,
            very_high_edge_density: 0.55,
            max_edge_density: 0.40,
            warn_edge_density: 0.25,
            analysis_max_side: DEFAULT_MAX_SIDE,
        }
    }
}

/// An uploaded file as handed over by the upload layer.
#[derive(Debug, Clone)]
pub struct FileDescriptor {
    pub bytes: Vec<u8>,
    /// MIME-like tag as declared by the uploader, e.g. `image/png`.
    pub declared_format: String,
    pub size_bytes: u64,
    pub filename: String,
}

impl FileDescriptor {
    pub fn new(filename: impl Into<String>, declared_format: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            size_bytes: bytes.len() as u64,
            bytes,
            declared_format: declared_format.into(),
            filename: filename.into(),
        }
    }

    /// Read a file from disk, declaring its format from the extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let declared = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream");
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(filename, declared, bytes))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Png,
    Jpeg,
}

impl FileFormat {
    /// Parse a declared tag against the allowed list.
    pub fn from_declared(declared: &str, allowed: &[String]) -> Option<Self> {
        let lowered = declared.trim().to_lowercase();
        let tag = lowered.strip_prefix("image/").unwrap_or(&lowered);
        if !allowed.iter().any(|a| a == tag) {
            return None;
        }
        match tag {
            "png" => Some(FileFormat::Png),
            "jpeg" | "jpg" => Some(FileFormat::Jpeg),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Likely,
    Borderline,
    LikelyNot,
    Low,
}

impl Confidence {
    pub fn from_score(score: u8) -> Self {
        match score {
            80..=u8::MAX => Confidence::High,
            60..=79 => Confidence::Likely,
            40..=59 => Confidence::Borderline,
            20..=39 => Confidence::LikelyNot,
            _ => Confidence::Low,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Confidence::High => "High confidence logo",
            Confidence::Likely => "Likely logo",
            Confidence::Borderline => "Borderline - complex logo or illustration",
            Confidence::LikelyNot => "Likely not a logo (processing anyway)",
            Confidence::Low => "Low quality image",
        }
    }
}

/// Measurements recorded alongside a verdict. Fields after `file_type` are
/// absent when the format gate short-circuits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub file_type: String,
    pub file_size_bytes: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub size_efficiency: Option<f64>,
    pub unique_colors: Option<usize>,
    pub edge_density: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub score: u8,
    pub confidence: Confidence,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub metrics: ValidationMetrics,
}

impl ValidationResult {
    /// Errors joined the way they are shown to the operator.
    pub fn error_message(&self) -> String {
        self.errors.join(". ")
    }
}

/// Inputs every scoring rule reads.
#[derive(Debug, Clone, Copy)]
pub struct LogoMeasurements {
    pub format: FileFormat,
    pub size_bytes: u64,
    pub width: u32,
    pub height: u32,
    pub unique_colors: usize,
    pub edge_density: f64,
}

/// Running state threaded through the rules.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub score: i32,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub metrics: ValidationMetrics,
}

impl Evaluation {
    fn start(file_type: &str) -> Self {
        Self {
            score: 100,
            errors: Vec::new(),
            warnings: Vec::new(),
            metrics: ValidationMetrics {
                file_type: file_type.to_string(),
                ..Default::default()
            },
        }
    }

    fn error(mut self, message: String, penalty: i32) -> Self {
        self.errors.push(message);
        self.score -= penalty;
        self
    }

    fn warning(mut self, message: String, penalty: i32) -> Self {
        self.warnings.push(message);
        self.score -= penalty;
        self
    }
}

pub type Rule = fn(Evaluation, &LogoMeasurements, &QualityThresholds) -> Evaluation;

/// Scoring rules in application order.
pub const RULES: [Rule; 6] = [
    check_file_size,
    check_dimensions,
    check_size_efficiency,
    check_color_count,
    check_edge_density,
    check_format_preference,
];

pub fn check_file_size(ev: Evaluation, m: &LogoMeasurements, t: &QualityThresholds) -> Evaluation {
    let mut ev = ev;
    ev.metrics.file_size_bytes = Some(m.size_bytes);
    let size_mb = m.size_bytes as f64 / MB;

    if m.size_bytes > t.max_file_size {
        ev.error(
            format!(
                "File too large ({:.2}MB). Maximum: {}MB",
                size_mb,
                t.max_file_size as f64 / MB
            ),
            30,
        )
    } else if m.size_bytes > t.warn_file_size {
        ev.warning(
            format!(
                "Large file size ({:.2}MB). Logos typically under {}MB",
                size_mb,
                t.warn_file_size as f64 / MB
            ),
            10,
        )
    } else {
        ev
    }
}

pub fn check_dimensions(ev: Evaluation, m: &LogoMeasurements, t: &QualityThresholds) -> Evaluation {
    let mut ev = ev;
    ev.metrics.width = Some(m.width);
    ev.metrics.height = Some(m.height);

    if m.width > t.max_dimension || m.height > t.max_dimension {
        ev = ev.error(
            format!(
                "Dimensions too large ({}x{}). Maximum: {}x{}px",
                m.width, m.height, t.max_dimension, t.max_dimension
            ),
            40,
        );
    }
    if m.width < t.min_dimension || m.height < t.min_dimension {
        ev = ev.error(
            format!(
                "Dimensions too small ({}x{}). Minimum: {}x{}px",
                m.width, m.height, t.min_dimension, t.min_dimension
            ),
            40,
        );
    }
    ev
}

pub fn check_size_efficiency(ev: Evaluation, m: &LogoMeasurements, t: &QualityThresholds) -> Evaluation {
    let mut ev = ev;
    let pixels = m.width as f64 * m.height as f64;
    // Zero pixels divides to infinity and trips the warning.
    let efficiency = (m.size_bytes as f64 / 1024.0) / (pixels / 1000.0);
    ev.metrics.size_efficiency = Some(efficiency);

    if efficiency > t.max_size_efficiency {
        ev.warning(
            format!(
                "High file size ratio ({:.2} KB/1000px). Suggests photo-like complexity",
                efficiency
            ),
            15,
        )
    } else {
        ev
    }
}

pub fn check_color_count(ev: Evaluation, m: &LogoMeasurements, t: &QualityThresholds) -> Evaluation {
    let mut ev = ev;
    let count = m.unique_colors;
    ev.metrics.unique_colors = Some(count);

    if count > t.very_high_colors {
        ev.warning(
            format!("Very high color count ({}). May indicate photo-like complexity", count),
            20,
        )
    } else if count > t.max_colors {
        ev.warning(
            format!("High color count ({}). Could be gradient logo or illustration", count),
            10,
        )
    } else if count > t.warn_colors {
        ev.warning(
            format!("Moderate color count ({}). Likely logo with gradients", count),
            5,
        )
    } else {
        ev
    }
}

pub fn check_edge_density(ev: Evaluation, m: &LogoMeasurements, t: &QualityThresholds) -> Evaluation {
    let mut ev = ev;
    let density = m.edge_density;
    ev.metrics.edge_density = Some(density);
    let pct = density * 100.0;

    if density > t.very_high_edge_density {
        ev.warning(
            format!("Very high complexity ({:.0}% edge density). Likely photograph", pct),
            30,
        )
    } else if density > t.max_edge_density {
        ev.warning(
            format!("High complexity ({:.0}% edge density). May be detailed illustration", pct),
            15,
        )
    } else if density > t.warn_edge_density {
        ev.warning(
            format!("Moderate complexity ({:.0}% edge density). May be complex logo", pct),
            5,
        )
    } else {
        ev
    }
}

pub fn check_format_preference(ev: Evaluation, m: &LogoMeasurements, _t: &QualityThresholds) -> Evaluation {
    match m.format {
        FileFormat::Png => {
            let mut ev = ev;
            ev.score += 5;
            ev
        }
        FileFormat::Jpeg => ev.warning(
            "JPEG format. PNG is preferred for logos (supports transparency)".to_string(),
            0,
        ),
    }
}

/// Score already-taken measurements. Pure; no decoding.
pub fn score_measurements(file_type: &str, m: &LogoMeasurements, t: &QualityThresholds) -> ValidationResult {
    let ev = RULES
        .iter()
        .fold(Evaluation::start(file_type), |ev, rule| rule(ev, m, t));
    finish(ev)
}

fn finish(ev: Evaluation) -> ValidationResult {
    let Evaluation { score, mut errors, warnings, metrics } = ev;
    let score = score.clamp(0, 100) as u8;

    let is_valid = if !errors.is_empty() {
        false
    } else if score < 30 && warnings.len() >= 3 {
        errors.push("Multiple quality indicators suggest this is not a logo".to_string());
        false
    } else {
        true
    };

    ValidationResult {
        is_valid,
        score,
        confidence: Confidence::from_score(score),
        errors,
        warnings,
        metrics,
    }
}

fn reject_format(file_type: &str) -> ValidationResult {
    ValidationResult {
        is_valid: false,
        score: 0,
        confidence: Confidence::Low,
        errors: vec![format!(
            "Invalid file format ({}). Only JPG and PNG files are accepted",
            file_type
        )],
        warnings: Vec::new(),
        metrics: ValidationMetrics {
            file_type: file_type.to_string(),
            ..Default::default()
        },
    }
}

/// Decode what is needed from the upload and score it.
///
/// Undecodable content does not fail the call: it measures as 0x0 with no
/// colors and no edges, which the dimension rule rejects.
pub fn validate_logo(file: &FileDescriptor, thresholds: &QualityThresholds) -> ValidationResult {
    let file_type = file.declared_format.trim().to_lowercase();
    let Some(format) = FileFormat::from_declared(&file_type, &thresholds.allowed_formats) else {
        log::warn!("{}: rejected format {}", file.filename, file_type);
        return reject_format(&file_type);
    };

    let (width, height) = image_processor::probe_dimensions(&file.bytes).unwrap_or_else(|e| {
        log::warn!("{}: could not read dimensions: {}", file.filename, e);
        (0, 0)
    });

    let (unique_colors, edge_density) =
        match image_processor::load_image(&file.bytes, Some(thresholds.analysis_max_side)) {
            Ok(raster) => (count_distinct_colors(&raster), compute_edge_density(&raster)),
            Err(e) => {
                log::warn!("{}: measurement decode failed: {}", file.filename, e);
                (0, 0.0)
            }
        };

    let measurements = LogoMeasurements {
        format,
        size_bytes: file.size_bytes,
        width,
        height,
        unique_colors,
        edge_density,
    };
    let result = score_measurements(&file_type, &measurements, thresholds);

    log::info!(
        "{}: score {} ({}), valid={}",
        file.filename,
        result.score,
        result.confidence.label(),
        result.is_valid
    );
    for warning in &result.warnings {
        log::warn!("{}: {}", file.filename, warning);
    }
    result
}
