//! # Media Ingestion Module
//!
//! Turns a chat-native photo into a durable public URL: the bytes are
//! fetched from Telegram, sniffed and size-checked, then uploaded to Imgur.
//! Transient HTTP failures are retried with jittered exponential backoff and
//! the upload side is guarded by a [`CircuitBreaker`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use image::ImageFormat;
use rand::Rng;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use teloxide::prelude::*;
use teloxide::types::FileId;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::circuit_breaker::CircuitBreaker;
use crate::config::{MediaConfig, RecoveryConfig};

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("could not resolve attachment: {0}")]
    Fetch(String),
    #[error("download failed: {0}")]
    Download(String),
    #[error("image is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("upload failed: {0}")]
    Upload(String),
    #[error("image host rejected the upload ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("image host temporarily disabled after repeated failures")]
    CircuitOpen,
    #[error("request timed out: {0}")]
    Timeout(String),
}

impl MediaError {
    /// Whether another attempt may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MediaError::Download(_) | MediaError::Upload(_) | MediaError::Timeout(_)
        )
    }

    fn from_http(err: reqwest::Error, upload: bool) -> Self {
        if err.is_timeout() {
            return MediaError::Timeout(err.to_string());
        }
        if let Some(status) = err.status() {
            if status.is_client_error() && status.as_u16() != 429 {
                return MediaError::Rejected {
                    status: status.as_u16(),
                    message: err.to_string(),
                };
            }
        }
        if upload {
            MediaError::Upload(err.to_string())
        } else {
            MediaError::Download(err.to_string())
        }
    }
}

/// Fetch-then-rehost pipeline consumed by the dialog
#[async_trait]
pub trait MediaIngestion: Send + Sync {
    /// Raw bytes behind a chat attachment reference
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, MediaError>;

    /// Upload bytes to the image host, returning the public URL
    async fn upload(&self, bytes: Vec<u8>) -> Result<String, MediaError>;

    async fn ingest(&self, reference: &str) -> Result<String, MediaError> {
        let bytes = self.fetch(reference).await?;
        self.upload(bytes).await
    }
}

/// Check size and magic bytes of a fetched image
pub fn validate_image(bytes: &[u8], max_size: u64) -> Result<ImageFormat, MediaError> {
    let size = bytes.len() as u64;
    if size > max_size {
        return Err(MediaError::TooLarge {
            size,
            limit: max_size,
        });
    }

    let format = image::guess_format(bytes)
        .map_err(|e| MediaError::UnsupportedFormat(e.to_string()))?;
    match format {
        ImageFormat::Png
        | ImageFormat::Jpeg
        | ImageFormat::Gif
        | ImageFormat::WebP
        | ImageFormat::Bmp => Ok(format),
        other => Err(MediaError::UnsupportedFormat(format!("{other:?}"))),
    }
}

fn mime_type(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Delay before retry number `attempt` (0-based), without jitter
pub fn backoff_delay(recovery: &RecoveryConfig, attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    let millis = recovery
        .base_retry_delay_ms
        .saturating_mul(factor)
        .min(recovery.max_retry_delay_ms);
    Duration::from_millis(millis)
}

#[derive(Debug, Deserialize)]
struct ImgurEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    status: u16,
    #[serde(default)]
    data: serde_json::Value,
}

/// Extract the public link from an Imgur upload response body
pub fn parse_upload_response(body: &str) -> Result<String, MediaError> {
    let envelope: ImgurEnvelope = serde_json::from_str(body)
        .map_err(|e| MediaError::Upload(format!("unreadable response: {e}")))?;

    if let Some(link) = envelope.data.get("link").and_then(|link| link.as_str()) {
        if envelope.success || envelope.status == 200 {
            return Ok(link.to_string());
        }
    }

    let message = envelope
        .data
        .get("error")
        .map(|error| match error.as_str() {
            Some(text) => text.to_string(),
            None => error.to_string(),
        })
        .unwrap_or_else(|| "response carried no link".to_string());
    Err(MediaError::Rejected {
        status: envelope.status,
        message,
    })
}

/// Telegram attachment fetcher paired with an Imgur uploader
pub struct TelegramImgurIngestion {
    bot: Bot,
    http: reqwest::Client,
    config: MediaConfig,
    breaker: CircuitBreaker,
}

impl TelegramImgurIngestion {
    pub fn new(bot: Bot, config: MediaConfig) -> Result<Self, MediaError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.recovery.request_timeout_secs))
            .build()
            .map_err(|e| MediaError::Upload(format!("failed to build HTTP client: {e}")))?;
        let breaker = CircuitBreaker::new(&config.recovery);
        Ok(Self {
            bot,
            http,
            config,
            breaker,
        })
    }

    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, MediaError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, MediaError>> + Send,
        T: Send,
    {
        let recovery = &self.config.recovery;
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < recovery.max_retries => {
                    let delay = backoff_delay(recovery, attempt);
                    let jitter_ms = rand::thread_rng().gen_range(0..=delay.as_millis() as u64 / 4);
                    let delay = delay + Duration::from_millis(jitter_ms);
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient media failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl MediaIngestion for TelegramImgurIngestion {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, MediaError> {
        let file = self
            .bot
            .get_file(FileId(reference.to_string()))
            .await
            .map_err(|e| MediaError::Fetch(e.to_string()))?;

        let declared = u64::from(file.size);
        if declared > self.config.max_image_size {
            return Err(MediaError::TooLarge {
                size: declared,
                limit: self.config.max_image_size,
            });
        }

        let url = format!(
            "https://api.telegram.org/file/bot{}/{}",
            self.bot.token(),
            file.path
        );

        let http = &self.http;
        let url = url.as_str();
        let bytes = self
            .with_retry("download", move || async move {
                let response = http
                    .get(url)
                    .send()
                    .await
                    .and_then(|response| response.error_for_status())
                    .map_err(|e| MediaError::from_http(e, false))?;
                response
                    .bytes()
                    .await
                    .map_err(|e| MediaError::from_http(e, false))
            })
            .await?;

        let format = validate_image(&bytes, self.config.max_image_size)?;
        debug!(bytes = bytes.len(), format = ?format, "Attachment downloaded");
        Ok(bytes.to_vec())
    }

    async fn upload(&self, bytes: Vec<u8>) -> Result<String, MediaError> {
        if self.breaker.is_open() {
            warn!("Image host circuit is open, failing fast");
            return Err(MediaError::CircuitOpen);
        }

        let format = validate_image(&bytes, self.config.max_image_size)?;
        let extension = format.extensions_str().first().copied().unwrap_or("img");
        let authorization = format!("Client-ID {}", self.config.imgur_client_id);
        let authorization = authorization.as_str();
        let upload_url = self.config.upload_url.as_str();
        let http = &self.http;
        let bytes = &bytes;

        let result = self
            .with_retry("upload", move || async move {
                let part = Part::bytes(bytes.clone())
                    .file_name(format!("image.{extension}"))
                    .mime_str(mime_type(format))
                    .map_err(|e| MediaError::Upload(e.to_string()))?;
                let form = Form::new().part("image", part);

                let response = http
                    .post(upload_url)
                    .header(AUTHORIZATION, authorization)
                    .multipart(form)
                    .send()
                    .await
                    .map_err(|e| MediaError::from_http(e, true))?;

                let status = response.status();
                let body = response
                    .text()
                    .await
                    .map_err(|e| MediaError::from_http(e, true))?;
                if status.is_server_error() || status.as_u16() == 429 {
                    return Err(MediaError::Upload(format!("image host returned {status}")));
                }
                parse_upload_response(&body)
            })
            .await;

        match &result {
            Ok(link) => {
                self.breaker.record_success();
                info!(link = %link, "Image uploaded");
            }
            Err(e) => {
                self.breaker.record_failure();
                warn!(error = %e, failures = self.breaker.failure_count(), "Image upload failed");
            }
        }
        result
    }
}
