//! Batch history persistence.
//!
//! A store holds the whole history as one document, newest batch first.
//! Saving can run out of room; [`persist_history`] then retries with fewer
//! batches before giving up.

use crate::background::filter_candidates;
use crate::batch::{ImageOutcome, ProcessingBatch, CURRENT_POLICY_VERSION};
use crate::contrast::{image_brightness, NEUTRAL_BRIGHTNESS};
use crate::error::StoreError;
use crate::image_processor::{decode_data_url, load_image};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Default quota for file-backed history, in serialized bytes.
pub const DEFAULT_QUOTA_BYTES: usize = 5_000_000;

/// Storage collaborator for batch history.
pub trait BatchStore: Send + Sync {
    fn load_batches(&self) -> Result<Vec<ProcessingBatch>, StoreError>;
    fn save_batches(&self, batches: &[ProcessingBatch]) -> Result<(), StoreError>;
}

fn serialize_within(batches: &[ProcessingBatch], quota: Option<usize>) -> Result<String, StoreError> {
    let json = serde_json::to_string(batches)?;
    if let Some(quota) = quota {
        if json.len() > quota {
            return Err(StoreError::QuotaExceeded { bytes: json.len(), quota });
        }
    }
    Ok(json)
}

/// History kept as a JSON file with a size quota.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    quota_bytes: usize,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            quota_bytes: DEFAULT_QUOTA_BYTES,
        }
    }

    pub fn with_quota(mut self, quota_bytes: usize) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BatchStore for JsonFileStore {
    /// A missing file is an empty history.
    fn load_batches(&self) -> Result<Vec<ProcessingBatch>, StoreError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn save_batches(&self, batches: &[ProcessingBatch]) -> Result<(), StoreError> {
        let json = serialize_within(batches, Some(self.quota_bytes))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        // Write then rename so a failed write leaves the old history intact.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-process history, optionally with a quota.
#[derive(Debug, Default)]
pub struct MemoryStore {
    batches: Mutex<Vec<ProcessingBatch>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    pub fn with_batches(batches: Vec<ProcessingBatch>) -> Self {
        Self {
            batches: Mutex::new(batches),
            quota_bytes: None,
        }
    }

    pub fn len(&self) -> usize {
        self.batches.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BatchStore for MemoryStore {
    fn load_batches(&self) -> Result<Vec<ProcessingBatch>, StoreError> {
        let batches = self
            .batches
            .lock()
            .map_err(|_| StoreError::Io(std::io::Error::other("memory store lock poisoned")))?;
        Ok(batches.clone())
    }

    fn save_batches(&self, batches: &[ProcessingBatch]) -> Result<(), StoreError> {
        serialize_within(batches, self.quota_bytes)?;
        let mut stored = self
            .batches
            .lock()
            .map_err(|_| StoreError::Io(std::io::Error::other("memory store lock poisoned")))?;
        *stored = batches.to_vec();
        Ok(())
    }
}

/// Save `history`, shrinking it through `caps` while the store reports a
/// quota failure. On success `history` is truncated to what was saved and
/// the saved length is returned. Other failures are returned immediately.
pub fn persist_history(
    store: &dyn BatchStore,
    history: &mut Vec<ProcessingBatch>,
    caps: &[usize],
) -> Result<usize, StoreError> {
    let mut last_err: Option<StoreError> = None;

    for &cap in caps {
        let count = history.len().min(cap);
        match store.save_batches(&history[..count]) {
            Ok(()) => {
                if count < history.len() {
                    log::warn!("history reduced to {} batches to fit storage", count);
                }
                history.truncate(count);
                return Ok(count);
            }
            Err(e) if e.is_quota() => {
                log::warn!("saving {} batches failed: {}", count, e);
                last_err = Some(e);
            }
            Err(e) => {
                log::error!("saving history failed: {}", e);
                return Err(e);
            }
        }
    }

    let err = last_err.unwrap_or(StoreError::QuotaExceeded { bytes: 0, quota: 0 });
    log::error!("history not saved after {} attempts: {}", caps.len(), err);
    Err(err)
}

/// Logo brightness recovered from a stored processed image.
fn stored_brightness(processed_url: &str) -> f64 {
    decode_data_url(processed_url)
        .and_then(|bytes| load_image(&bytes, None).ok())
        .map(|raster| image_brightness(&raster))
        .unwrap_or(NEUTRAL_BRIGHTNESS)
}

fn migrate_outcome(outcome: &mut ImageOutcome) {
    if let ImageOutcome::Processed {
        processed_url,
        original_palette,
        offered_colors,
        logo_brightness,
        choice,
        ..
    } = outcome
    {
        let brightness = *logo_brightness.get_or_insert_with(|| stored_brightness(processed_url));

        let filtered = filter_candidates(original_palette, brightness, original_palette);
        *offered_colors = if filtered.is_empty() { original_palette.clone() } else { filtered };

        choice.rebuild(offered_colors, brightness, original_palette);
    }
}

/// Bring older records up to the current filtering policy. Returns how many
/// batches changed.
pub fn migrate_history(batches: &mut [ProcessingBatch]) -> usize {
    let mut migrated = 0;
    for batch in batches.iter_mut().filter(|b| b.needs_migration()) {
        log::info!(
            "migrating batch from {} (policy v{} -> v{})",
            batch.timestamp,
            batch.policy_version,
            CURRENT_POLICY_VERSION
        );
        batch.outcomes.iter_mut().for_each(migrate_outcome);
        batch.policy_version = CURRENT_POLICY_VERSION;
        migrated += 1;
    }
    migrated
}
