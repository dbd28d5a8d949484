//! Background-removal collaborator.
//!
//! The session only sees [`BackgroundRemover`]; [`RemoveBgClient`] is the
//! production implementation against the remove.bg HTTP API.

use crate::config::RemoveBgConfig;
use crate::error::{RemovalError, RemovalFailure};
use reqwest::blocking::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One image to strip, with the crop/scale/position parameters applied by
/// the service.
#[derive(Debug, Clone)]
pub struct RemovalRequest {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub crop: bool,
    pub crop_margin: String,
    pub scale: String,
    pub position: String,
    pub size: String,
    pub format: String,
}

impl RemovalRequest {
    /// Request with the parameters from `config`.
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>, config: &RemoveBgConfig) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            crop: config.crop,
            crop_margin: config.crop_margin.clone(),
            scale: config.scale.clone(),
            position: config.position.clone(),
            size: config.size.clone(),
            format: config.format.clone(),
        }
    }
}

/// Credit counters reported alongside a successful removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditInfo {
    pub charged: Option<u64>,
    pub remaining: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct RemovalResponse {
    /// Encoded image, background removed, cropped and centered.
    pub bytes: Vec<u8>,
    pub credits: Option<CreditInfo>,
}

/// Anything that can strip the background from an encoded image.
pub trait BackgroundRemover: Send + Sync {
    fn remove_background(&self, request: &RemovalRequest) -> Result<RemovalResponse, RemovalError>;
}

/// remove.bg over blocking HTTP.
pub struct RemoveBgClient {
    endpoint: String,
    api_key: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl RemoveBgClient {
    /// Fails with [`RemovalError::Config`] when no usable key is configured.
    pub fn new(config: &RemoveBgConfig) -> Result<Self, RemovalError> {
        let api_key = config.usable_api_key().ok_or_else(|| {
            RemovalError::Config(
                "no remove.bg API key set (use --api-key or REMOVE_BG_API_KEY)".to_string(),
            )
        })?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RemovalError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            api_key: api_key.to_string(),
            client,
            timeout_secs: config.timeout_secs,
        })
    }

    fn form(request: &RemovalRequest) -> Result<Form, RemovalError> {
        let mime = mime_guess::from_path(&request.filename).first_or_octet_stream();
        let part = Part::bytes(request.bytes.clone())
            .file_name(request.filename.clone())
            .mime_str(mime.essence_str())
            .map_err(|e| RemovalError::Transport(e.to_string()))?;

        Ok(Form::new()
            .part("image_file", part)
            .text("size", request.size.clone())
            .text("format", request.format.clone())
            .text("crop", request.crop.to_string())
            .text("crop_margin", request.crop_margin.clone())
            .text("scale", request.scale.clone())
            .text("position", request.position.clone()))
    }
}

/// Error body returned by the service.
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Deserialize)]
struct ErrorEntry {
    title: Option<String>,
}

/// First `errors[].title` of an error body, if it parses.
fn error_title(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()?
        .errors
        .into_iter()
        .find_map(|e| e.title)
}

/// Integer credit header; fractional values truncate.
fn credit_header(headers: &reqwest::header::HeaderMap, name: &str) -> Option<u64> {
    let value = headers.get(name)?.to_str().ok()?.trim();
    value
        .parse::<u64>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().filter(|v| *v >= 0.0).map(|v| v as u64))
}

fn read_credits(headers: &reqwest::header::HeaderMap) -> Option<CreditInfo> {
    let remaining = credit_header(headers, "X-RateLimit-Remaining")?;
    Some(CreditInfo {
        charged: credit_header(headers, "X-Credits-Charged"),
        remaining: Some(remaining),
        limit: credit_header(headers, "X-RateLimit-Limit"),
    })
}

impl BackgroundRemover for RemoveBgClient {
    fn remove_background(&self, request: &RemovalRequest) -> Result<RemovalResponse, RemovalError> {
        let form = Self::form(request)?;

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Api-Key", &self.api_key)
            .multipart(form)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    RemovalError::Transport(format!("Request timed out after {}s", self.timeout_secs))
                } else {
                    RemovalError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let failure = RemovalFailure::from_status(status.as_u16(), error_title(&body));
            log::warn!(
                "{}: remove.bg returned {}: {}",
                request.filename,
                status.as_u16(),
                failure.reason()
            );
            return Err(RemovalError::Service(failure));
        }

        let credits = read_credits(response.headers());
        let bytes = response
            .bytes()
            .map_err(|e| RemovalError::Transport(e.to_string()))?
            .to_vec();

        log::info!(
            "{}: background removed ({} bytes, credits remaining {:?})",
            request.filename,
            bytes.len(),
            credits.and_then(|c| c.remaining)
        );
        Ok(RemovalResponse { bytes, credits })
    }
}
