//! Processing session: staging, batch runs and background overrides.
//!
//! A [`Session`] owns everything that outlives a single call: the staged
//! uploads, the loaded history and the settings. The analysis modules it
//! drives stay pure, so each image of a batch is an independent pipeline:
//!
//! 1. palette and border detection on the original upload
//! 2. background removal through the collaborator
//! 3. brightness of the processed logo
//! 4. candidate filtering and default selection
//! 5. re-encode for storage

use crate::background::{
    choose_default, detect_background, filter_candidates, BackgroundChoice, DetectedBackground,
};
use crate::batch::{CreditUsage, ImageOutcome, ProcessingBatch};
use crate::color_quantizer::{extract_palette, DEFAULT_PALETTE_SIZE};
use crate::config::{PipelineConfig, RemoveBgConfig};
use crate::contrast::{image_brightness, Outline, NEUTRAL_BRIGHTNESS};
use crate::error::{SessionError, StoreError};
use crate::image_processor::{encode_png_data_url, load_image, raw_data_url};
use crate::quality::{validate_logo, FileDescriptor, QualityThresholds, ValidationResult};
use crate::remover::{BackgroundRemover, CreditInfo, RemovalRequest};
use crate::store::{migrate_history, persist_history, BatchStore};
use crate::swatch::ColorSwatch;
use rayon::prelude::*;
use serde::Serialize;

/// An accepted upload waiting for the next batch.
#[derive(Debug, Clone)]
pub struct StagedUpload {
    pub file: FileDescriptor,
    pub validation: ValidationResult,
}

/// A finished batch and whether it reached the store.
#[derive(Debug)]
pub struct ProcessOutcome {
    pub batch: ProcessingBatch,
    /// Batches saved, or why saving failed. The batch is valid either way.
    pub persistence: Result<usize, StoreError>,
}

pub struct Session {
    config: PipelineConfig,
    removal: RemoveBgConfig,
    thresholds: QualityThresholds,
    staged: Vec<StagedUpload>,
    history: Vec<ProcessingBatch>,
}

impl Session {
    /// Session with an empty history.
    pub fn new(config: PipelineConfig) -> Self {
        let thresholds = QualityThresholds {
            analysis_max_side: config.analysis_max_side,
            ..QualityThresholds::default()
        };
        Self {
            config,
            removal: RemoveBgConfig::default(),
            thresholds,
            staged: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Load history from `store`, migrating records written under an older
    /// filtering policy and saving them back once.
    pub fn open(store: &dyn BatchStore, config: PipelineConfig) -> Result<Self, SessionError> {
        let mut session = Self::new(config);
        let mut history = store.load_batches()?;
        let migrated = migrate_history(&mut history);
        session.history = history;

        if migrated > 0 {
            log::info!("re-saving history after migrating {} batches", migrated);
            if let Err(e) = persist_history(store, &mut session.history, &session.config.degrade_caps) {
                log::warn!("migrated history kept in memory only: {}", e);
            }
        }
        Ok(session)
    }

    pub fn with_thresholds(mut self, thresholds: QualityThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Request parameters for the background-removal collaborator.
    pub fn with_removal_config(mut self, removal: RemoveBgConfig) -> Self {
        self.removal = removal;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn history(&self) -> &[ProcessingBatch] {
        &self.history
    }

    pub fn staged(&self) -> &[StagedUpload] {
        &self.staged
    }

    /// Validate an upload and stage it for the next batch.
    pub fn stage(&mut self, file: FileDescriptor) -> Result<ValidationResult, SessionError> {
        if self.staged.len() >= self.config.max_images {
            return Err(SessionError::StagingFull(self.config.max_images));
        }

        let validation = validate_logo(&file, &self.thresholds);
        if !validation.is_valid {
            return Err(SessionError::Rejected(validation.error_message()));
        }

        log::info!(
            "staged {} ({}/{})",
            file.filename,
            self.staged.len() + 1,
            self.config.max_images
        );
        self.staged.push(StagedUpload {
            file,
            validation: validation.clone(),
        });
        Ok(validation)
    }

    /// Drop a staged upload by position.
    pub fn unstage(&mut self, index: usize) -> Option<StagedUpload> {
        (index < self.staged.len()).then(|| self.staged.remove(index))
    }

    /// Run every staged upload through the pipeline and record the batch.
    ///
    /// Failures on individual images are recorded in the batch rather than
    /// aborting it. The new batch goes to the front of the history, which is
    /// then trimmed and saved. If the stored history cannot be read it is not
    /// overwritten, and the load error is returned in
    /// [`ProcessOutcome::persistence`].
    pub fn process(
        &mut self,
        remover: &dyn BackgroundRemover,
        store: &dyn BatchStore,
    ) -> Result<ProcessOutcome, SessionError> {
        if self.staged.is_empty() {
            return Err(SessionError::NothingStaged);
        }
        let staged = std::mem::take(&mut self.staged);
        log::info!("processing batch of {} images", staged.len());

        let run = |upload: &StagedUpload| process_upload(upload, remover, &self.config, &self.removal);
        let results: Vec<(ImageOutcome, Option<CreditInfo>)> = if self.config.parallel {
            staged.par_iter().map(run).collect()
        } else {
            staged.iter().map(run).collect()
        };

        let (outcomes, reports): (Vec<_>, Vec<_>) = results.into_iter().unzip();
        let credits = CreditUsage::tally(outcomes.len(), &reports);
        let batch = ProcessingBatch::new(self.config.operator.clone(), outcomes, credits);
        log::info!("batch complete: {}", batch.summary());

        // Read-modify-write against whatever the store holds now.
        // An unreadable store is left untouched; the batch stays in memory.
        let reload = match store.load_batches() {
            Ok(mut stored) => {
                migrate_history(&mut stored);
                self.history = stored;
                Ok(())
            }
            Err(e) => {
                log::error!("could not reload history, batch not saved: {}", e);
                Err(e)
            }
        };
        self.history.insert(0, batch.clone());
        self.history.truncate(self.config.history_capacity);
        let persistence =
            reload.and_then(|()| persist_history(store, &mut self.history, &self.config.degrade_caps));

        Ok(ProcessOutcome { batch, persistence })
    }

    /// Flag another offered color as the default background of one image and
    /// save the history. Returns the number of batches saved.
    pub fn override_background(
        &mut self,
        batch: usize,
        image: usize,
        color: ColorSwatch,
        store: &dyn BatchStore,
    ) -> Result<usize, SessionError> {
        let record = self
            .history
            .get_mut(batch)
            .ok_or(SessionError::UnknownBatch(batch))?;
        let outcome = record
            .outcomes
            .get_mut(image)
            .ok_or(SessionError::UnknownImage { batch, image })?;
        let choice = outcome
            .choice_mut()
            .ok_or(SessionError::NoChoice { batch, image })?;

        choice.set_default(color)?;
        log::info!("batch {} image {}: default background set to {}", batch, image, color);

        Ok(persist_history(store, &mut self.history, &self.config.degrade_caps)?)
    }
}

fn original_analysis(upload: &StagedUpload, config: &PipelineConfig) -> (Vec<ColorSwatch>, Option<DetectedBackground>) {
    let name = &upload.file.filename;
    let palette = match load_image(&upload.file.bytes, Some(config.analysis_max_side)) {
        Ok(raster) => extract_palette(&raster, DEFAULT_PALETTE_SIZE),
        Err(e) => {
            log::warn!("{}: palette extraction skipped: {}", name, e);
            Vec::new()
        }
    };
    let detected = match load_image(&upload.file.bytes, None) {
        Ok(raster) => detect_background(&raster),
        Err(e) => {
            log::warn!("{}: background detection skipped: {}", name, e);
            None
        }
    };
    (palette, detected)
}

fn process_upload(
    upload: &StagedUpload,
    remover: &dyn BackgroundRemover,
    config: &PipelineConfig,
    removal: &RemoveBgConfig,
) -> (ImageOutcome, Option<CreditInfo>) {
    let name = upload.file.filename.clone();
    let (palette, detected) = original_analysis(upload, config);

    let request = RemovalRequest::new(name.clone(), upload.file.bytes.clone(), removal);
    let response = match remover.remove_background(&request) {
        Ok(response) => response,
        Err(e) => {
            let failure = e.failure();
            log::warn!("{}: {}", name, e);
            let outcome = ImageOutcome::Failed {
                filename: name,
                reason: failure.reason(),
                failure,
                original_url: raw_data_url(&upload.file.bytes),
                palette,
            };
            return (outcome, None);
        }
    };

    let brightness = match load_image(&response.bytes, None) {
        Ok(raster) => image_brightness(&raster),
        Err(e) => {
            log::warn!("{}: processed image unreadable, assuming mid brightness: {}", name, e);
            NEUTRAL_BRIGHTNESS
        }
    };

    let filtered = filter_candidates(&palette, brightness, &palette);
    let offered = if filtered.is_empty() { palette.clone() } else { filtered };
    let default = choose_default(detected, brightness, &palette);
    let choice = BackgroundChoice::assemble(default, &offered, brightness, &palette);

    let processed_url = encode_png_data_url(&response.bytes, config.storage_max_side).unwrap_or_else(|e| {
        log::warn!("{}: storing processed image as received: {}", name, e);
        raw_data_url(&response.bytes)
    });

    log::info!(
        "{}: {} colors, logo brightness {:.0}, default background {}",
        name,
        palette.len(),
        brightness,
        choice.default
    );

    let outcome = ImageOutcome::Processed {
        filename: name,
        processed_url,
        original_palette: palette,
        offered_colors: offered,
        logo_brightness: Some(brightness),
        choice,
        validation: Some(upload.validation.clone()),
    };
    (outcome, response.credits)
}

/// Background analysis of an already processed logo, without a session or
/// network access.
#[derive(Debug, Clone, Serialize)]
pub struct BackgroundAnalysis {
    pub palette: Vec<ColorSwatch>,
    pub logo_brightness: f64,
    pub detected_background: Option<ColorSwatch>,
    pub detection_confidence: Option<f64>,
    pub offered_colors: Vec<ColorSwatch>,
    pub choice: BackgroundChoice,
    pub outline: Outline,
}

/// Run the selection steps on an original upload and its processed version.
/// Without a processed image, the original stands in for both.
pub fn analyze_offline(
    original: &[u8],
    processed: Option<&[u8]>,
    config: &PipelineConfig,
) -> crate::Result<BackgroundAnalysis> {
    let analysis = load_image(original, Some(config.analysis_max_side))?;
    let palette = extract_palette(&analysis, DEFAULT_PALETTE_SIZE);
    let detected = detect_background(&load_image(original, None)?);

    let processed_raster = load_image(processed.unwrap_or(original), None)?;
    let brightness = image_brightness(&processed_raster);

    let filtered = filter_candidates(&palette, brightness, &palette);
    let offered = if filtered.is_empty() { palette.clone() } else { filtered };
    let choice = BackgroundChoice::assemble(
        choose_default(detected, brightness, &palette),
        &offered,
        brightness,
        &palette,
    );
    let outline = choice.outline();

    Ok(BackgroundAnalysis {
        logo_brightness: brightness,
        detected_background: detected.map(|d| d.color),
        detection_confidence: detected.map(|d| d.confidence),
        palette,
        offered_colors: offered,
        choice,
        outline,
    })
}
