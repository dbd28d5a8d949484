//! brandmark - logo screening and card background selection
//!
//! This library decides whether an uploaded image is usable as a brand logo
//! and, once its background has been removed, which card background it
//! should be displayed on.
//!
//! ## Features
//!
//! - **Logo screening** from file size, dimensions, distinct-color count and
//!   Sobel edge density, folded into a 0-100 score
//! - **Palette extraction** using median-cut quantization with contrast and
//!   distinctness filtering
//! - **Background selection** from the original border, the processed logo's
//!   brightness and the palette
//! - **Batch sessions** with a pluggable background remover (remove.bg) and
//!   bounded, versioned history storage
//!
//! ## Example
//!
//! ```rust,no_run
//! use brandmark::{validate_file, QualityThresholds};
//! use std::path::Path;
//!
//! let result = validate_file(Path::new("logo.png"), &QualityThresholds::default())?;
//! println!("score {} ({})", result.score, result.confidence.label());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod background;
pub mod batch;
pub mod color_quantizer;
pub mod config;
pub mod contrast;
pub mod edge_detector;
pub mod error;
pub mod image_processor;
pub mod pipeline;
pub mod quality;
pub mod remover;
pub mod store;
pub mod swatch;

pub use background::{
    check_candidate, choose_default, detect_background, filter_candidates, select_default,
    BackgroundChoice, DetectedBackground, Rejection,
};
pub use batch::{CreditUsage, ImageOutcome, ProcessingBatch, CURRENT_POLICY_VERSION};
pub use color_quantizer::{count_distinct_colors, extract_palette};
pub use config::{PipelineConfig, RemoveBgConfig};
pub use contrast::{
    adaptive_outline_for, adaptive_outline_for_str, brightness, color_distance, contrast_ratio,
    image_brightness, luminance, Outline, OutlineColor,
};
pub use edge_detector::compute_edge_density;
pub use error::{DecodeError, RemovalError, RemovalFailure, SessionError, StoreError};
pub use image_processor::{load_image, RasterImage};
pub use pipeline::{analyze_offline, BackgroundAnalysis, ProcessOutcome, Session};
pub use quality::{validate_logo, Confidence, FileDescriptor, QualityThresholds, ValidationResult};
pub use remover::{BackgroundRemover, RemoveBgClient, RemovalRequest, RemovalResponse};
pub use store::{BatchStore, JsonFileStore, MemoryStore};
pub use swatch::ColorSwatch;
pub use anyhow::Result;

/// Validate a logo file on disk, declaring its format from the extension.
///
/// # Example
///
/// ```rust,no_run
/// use brandmark::{validate_file, QualityThresholds};
/// use std::path::Path;
///
/// let result = validate_file(Path::new("mark.jpg"), &QualityThresholds::default())?;
/// assert!(result.score <= 100);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn validate_file(path: &std::path::Path, thresholds: &QualityThresholds) -> Result<ValidationResult> {
    let file = FileDescriptor::from_path(path)?;
    Ok(validate_logo(&file, thresholds))
}

/// Background analysis for an original upload and, optionally, its
/// background-removed version, both read from disk.
pub fn analyze_files(
    original: &std::path::Path,
    processed: Option<&std::path::Path>,
    config: &PipelineConfig,
) -> Result<BackgroundAnalysis> {
    let original_bytes = std::fs::read(original)?;
    let processed_bytes = processed.map(std::fs::read).transpose()?;
    analyze_offline(&original_bytes, processed_bytes.as_deref(), config)
}
