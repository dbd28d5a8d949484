//! Error types shared across the pipeline.
//!
//! Measurement code never surfaces these to the scorer: a failed decode
//! degrades to a neutral measurement instead. They exist for the callers
//! that do need to branch on what went wrong (collaborators and the session).

use thiserror::Error;

/// Failure to turn encoded bytes into a raster.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unrecognised image format: {0}")]
    UnknownFormat(String),

    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("image has no pixels ({width}x{height})")]
    Empty { width: u32, height: u32 },
}

impl From<image::ImageError> for DecodeError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Unsupported(e) => DecodeError::UnknownFormat(e.to_string()),
            other => DecodeError::Decode(other.to_string()),
        }
    }
}

/// Classified background-removal failure, derived from the HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RemovalFailure {
    InsufficientCredits,
    RateLimited,
    InvalidInput,
    ServiceError,
    Unknown(String),
}

impl RemovalFailure {
    /// Map a non-success status (plus the service's own message, if any)
    /// to a failure class.
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        match status {
            402 => RemovalFailure::InsufficientCredits,
            429 => RemovalFailure::RateLimited,
            400 => RemovalFailure::InvalidInput,
            500 => RemovalFailure::ServiceError,
            _ => RemovalFailure::Unknown(message.unwrap_or_else(|| "API request failed".to_string())),
        }
    }

    /// Operator-facing reason recorded on the failed image.
    pub fn reason(&self) -> String {
        match self {
            RemovalFailure::InsufficientCredits => "No API credits remaining".to_string(),
            RemovalFailure::RateLimited => "Rate limit exceeded".to_string(),
            RemovalFailure::InvalidInput => "Invalid image format or size".to_string(),
            RemovalFailure::ServiceError => "API service error".to_string(),
            RemovalFailure::Unknown(msg) => msg.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RemovalError {
    #[error("background removal failed: {}", .0.reason())]
    Service(RemovalFailure),

    #[error("background removal request failed: {0}")]
    Transport(String),

    #[error("background removal is not configured: {0}")]
    Config(String),
}

impl RemovalError {
    pub fn failure(&self) -> RemovalFailure {
        match self {
            RemovalError::Service(f) => f.clone(),
            RemovalError::Transport(msg) | RemovalError::Config(msg) => {
                RemovalFailure::Unknown(msg.clone())
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("storage quota exceeded ({bytes} bytes, quota {quota})")]
    QuotaExceeded { bytes: usize, quota: usize },
}

impl StoreError {
    pub fn is_quota(&self) -> bool {
        matches!(self, StoreError::QuotaExceeded { .. })
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Maximum {0} images reached")]
    StagingFull(usize),

    #[error("{0}")]
    Rejected(String),

    #[error("no batch at index {0}")]
    UnknownBatch(usize),

    #[error("no image at index {image} in batch {batch}")]
    UnknownImage { batch: usize, image: usize },

    #[error("image {image} in batch {batch} has no background choice (processing failed)")]
    NoChoice { batch: usize, image: usize },

    #[error("{0} is not one of the offered background colors")]
    NotACandidate(String),

    #[error("nothing staged for processing")]
    NothingStaged,

    #[error(transparent)]
    Removal(#[from] RemovalError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(RemovalFailure::from_status(402, None), RemovalFailure::InsufficientCredits);
        assert_eq!(RemovalFailure::from_status(429, None), RemovalFailure::RateLimited);
        assert_eq!(RemovalFailure::from_status(400, Some("x".into())), RemovalFailure::InvalidInput);
        assert_eq!(RemovalFailure::from_status(500, None), RemovalFailure::ServiceError);
        assert_eq!(
            RemovalFailure::from_status(403, Some("Forbidden".into())),
            RemovalFailure::Unknown("Forbidden".into())
        );
        assert_eq!(
            RemovalFailure::from_status(503, None).reason(),
            "API request failed"
        );
    }

    #[test]
    fn test_reasons_are_operator_facing() {
        assert_eq!(RemovalFailure::InsufficientCredits.reason(), "No API credits remaining");
        assert_eq!(RemovalFailure::RateLimited.reason(), "Rate limit exceeded");
    }

    #[test]
    fn test_quota_detection() {
        let err = StoreError::QuotaExceeded { bytes: 10, quota: 5 };
        assert!(err.is_quota());
        let err = StoreError::Io(std::io::Error::other("disk"));
        assert!(!err.is_quota());
    }
}
