//! Session and collaborator settings.

use crate::image_processor::DEFAULT_MAX_SIDE;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Sentinel left in unconfigured deployments.
pub const PLACEHOLDER_API_KEY: &str = "YOUR_REMOVE_BG_API_KEY_HERE";

/// Settings for one processing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Images accepted into one batch.
    pub max_images: usize,
    /// Batches kept in history.
    pub history_capacity: usize,
    /// Batch counts tried, in order, when the store runs out of room.
    pub degrade_caps: Vec<usize>,
    /// Longest side of the raster palette extraction runs on.
    pub analysis_max_side: u32,
    /// Longest side of processed logos as stored.
    pub storage_max_side: u32,
    pub operator: String,
    /// Run independent images of a batch on the rayon pool.
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_images: 8,
            history_capacity: 10,
            degrade_caps: vec![10, 2, 1],
            analysis_max_side: DEFAULT_MAX_SIDE,
            storage_max_side: 600,
            operator: "Unknown".to_string(),
            parallel: true,
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// remove.bg request settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoveBgConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub crop: bool,
    pub crop_margin: String,
    pub scale: String,
    pub position: String,
    pub size: String,
    pub format: String,
}

impl Default for RemoveBgConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.remove.bg/v1.0/removebg".to_string(),
            api_key: None,
            timeout_secs: 60,
            crop: true,
            crop_margin: "15%".to_string(),
            scale: "100%".to_string(),
            position: "center".to_string(),
            size: "auto".to_string(),
            format: "png".to_string(),
        }
    }
}

impl RemoveBgConfig {
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key;
        self
    }

    /// The key, if one is set and is not the placeholder.
    pub fn usable_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty() && *k != PLACEHOLDER_API_KEY)
    }
}
