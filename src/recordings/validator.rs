//! # Upload Validation
//!
//! Decides whether an incoming multipart file part may be stored. Every check
//! here is a pure decision: nothing is written and nothing is logged. The
//! upload handler runs these checks before (media type, field name) and while
//! (size) bytes are streamed, and stops the pipeline on the first rejection.

use crate::config::StorageConfig;
use thiserror::Error;

/// Containers accepted by exact match, on top of the `audio/*` family.
/// Browsers record WebM/Opus and announce it as `audio/webm;codecs=opus`.
pub const ACCEPTED_CONTAINERS: &[&str] = &["audio/webm"];

/// Reasons an upload is refused. All of them map to HTTP 400.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("No audio file provided")]
    MissingFile,

    #[error("Invalid file type '{0}'. Only audio files are allowed")]
    InvalidMediaType(String),

    #[error("Invalid file type: no content type declared. Only audio files are allowed")]
    MissingMediaType,

    #[error("File too large. Maximum size is {}MB.", format_megabytes(.limit))]
    TooLarge { limit: u64 },

    #[error("Audio file is empty")]
    EmptyFile,

    #[error("File upload error: Unexpected field '{0}'")]
    UnexpectedField(String),

    #[error("File upload error: only one audio file may be uploaded per request")]
    DuplicateFile,

    #[error("File upload error: {0}")]
    Malformed(String),
}

fn format_megabytes(bytes: &u64) -> String {
    let megabytes = *bytes as f64 / (1024.0 * 1024.0);
    format!("{}", (megabytes * 100.0).round() / 100.0)
}

/// Limits applied to every upload, taken from the storage configuration.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    /// Largest accepted payload in bytes (inclusive).
    pub max_bytes: u64,
    /// The only multipart field name that may carry the file.
    pub field_name: String,
}

impl UploadPolicy {
    pub fn new(max_bytes: u64, field_name: impl Into<String>) -> Self {
        Self {
            max_bytes,
            field_name: field_name.into(),
        }
    }

    pub fn from_config(storage: &StorageConfig) -> Self {
        Self::new(storage.max_upload_bytes, storage.field_name.clone())
    }

    /// A file part must arrive under the configured field name.
    pub fn check_field(&self, field_name: &str) -> Result<(), ValidationError> {
        if field_name == self.field_name {
            Ok(())
        } else {
            Err(ValidationError::UnexpectedField(field_name.to_string()))
        }
    }

    /// Gate on the declared media type of the file part.
    pub fn check_media_type(&self, media_type: Option<&str>) -> Result<(), ValidationError> {
        let declared = media_type.ok_or(ValidationError::MissingMediaType)?;
        if is_audio_media_type(declared) {
            Ok(())
        } else {
            Err(ValidationError::InvalidMediaType(declared.to_string()))
        }
    }

    /// Called with the running byte count after each received chunk, so an
    /// oversized upload is refused as soon as it crosses the limit.
    pub fn check_size(&self, received: u64) -> Result<(), ValidationError> {
        if received > self.max_bytes {
            Err(ValidationError::TooLarge {
                limit: self.max_bytes,
            })
        } else {
            Ok(())
        }
    }

    /// Final check once the whole part has been received.
    pub fn check_complete(&self, total: u64) -> Result<(), ValidationError> {
        self.check_size(total)?;
        if total == 0 {
            return Err(ValidationError::EmptyFile);
        }
        Ok(())
    }
}

/// `audio/*` with a non-empty subtype, or one of the accepted containers.
/// Parameters such as `;codecs=opus` are ignored and matching is
/// case-insensitive.
pub fn is_audio_media_type(media_type: &str) -> bool {
    let essence = media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if ACCEPTED_CONTAINERS.contains(&essence.as_str()) {
        return true;
    }

    match essence.split_once('/') {
        Some((top, sub)) => top == "audio" && !sub.is_empty(),
        None => false,
    }
}
