//! Records of completed processing runs, as persisted in history.

use crate::background::BackgroundChoice;
use crate::error::RemovalFailure;
use crate::quality::ValidationResult;
use crate::remover::CreditInfo;
use crate::swatch::ColorSwatch;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version of the background filtering rules records are built with.
///
/// Version 1 records predate the logo-color similarity rule and may lack a
/// stored logo brightness.
pub const CURRENT_POLICY_VERSION: u32 = 2;

fn legacy_policy_version() -> u32 {
    1
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditUsage {
    pub used: u64,
    pub remaining: Option<u64>,
    pub limit: Option<u64>,
}

impl CreditUsage {
    /// One credit per image; counters from the last image that reported any.
    pub fn tally(image_count: usize, reports: &[Option<CreditInfo>]) -> Self {
        let last = reports.iter().rev().flatten().next();
        Self {
            used: image_count as u64,
            remaining: last.and_then(|c| c.remaining),
            limit: last.and_then(|c| c.limit),
        }
    }
}

/// Result for one image of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImageOutcome {
    Failed {
        filename: String,
        reason: String,
        failure: RemovalFailure,
        /// The upload as a data URL, so the original can still be shown.
        original_url: String,
        #[serde(default)]
        palette: Vec<ColorSwatch>,
    },
    Processed {
        filename: String,
        /// Processed logo as a PNG data URL.
        processed_url: String,
        /// Palette of the original upload, unfiltered.
        original_palette: Vec<ColorSwatch>,
        /// Palette members offered as backgrounds after contrast filtering.
        offered_colors: Vec<ColorSwatch>,
        #[serde(default)]
        logo_brightness: Option<f64>,
        choice: BackgroundChoice,
        #[serde(default)]
        validation: Option<ValidationResult>,
    },
}

impl ImageOutcome {
    pub fn filename(&self) -> &str {
        match self {
            ImageOutcome::Failed { filename, .. } | ImageOutcome::Processed { filename, .. } => filename,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ImageOutcome::Failed { .. })
    }

    pub fn choice(&self) -> Option<&BackgroundChoice> {
        match self {
            ImageOutcome::Processed { choice, .. } => Some(choice),
            ImageOutcome::Failed { .. } => None,
        }
    }

    pub fn choice_mut(&mut self) -> Option<&mut BackgroundChoice> {
        match self {
            ImageOutcome::Processed { choice, .. } => Some(choice),
            ImageOutcome::Failed { .. } => None,
        }
    }
}

/// One completed upload-and-process cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingBatch {
    pub timestamp: DateTime<Utc>,
    pub operator: String,
    pub outcomes: Vec<ImageOutcome>,
    pub credits: CreditUsage,
    #[serde(default = "legacy_policy_version")]
    pub policy_version: u32,
}

impl ProcessingBatch {
    pub fn new(operator: impl Into<String>, outcomes: Vec<ImageOutcome>, credits: CreditUsage) -> Self {
        Self {
            timestamp: Utc::now(),
            operator: operator.into(),
            outcomes,
            credits,
            policy_version: CURRENT_POLICY_VERSION,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_failed()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    pub fn needs_migration(&self) -> bool {
        self.policy_version < CURRENT_POLICY_VERSION
    }

    /// Header line for listings, e.g. `2026-03-01 14:05 UTC by Dana (3 ok, 1 failed)`.
    pub fn summary(&self) -> String {
        format!(
            "{} by {} ({} ok, {} failed)",
            self.timestamp.format("%Y-%m-%d %H:%M UTC"),
            self.operator,
            self.succeeded(),
            self.failed()
        )
    }
}
