//! # Error Handling
//!
//! Every failure a handler can report is an [`AppError`]. Actix converts it to
//! an HTTP response through the `ResponseError` impl below, so handlers can
//! simply return `Err(...)` or use `?`.
//!
//! ## Response Format:
//! Errors share the body shape the recorder client expects:
//! ```json
//! { "success": false, "error": "Only audio files are allowed" }
//! ```
//!
//! ## Status Mapping:
//! - `Validation` → 400: the client can fix the request and retry
//! - `StorageUnavailable`, `WriteFailure`, `ListingUnavailable`,
//!   `SimulationFailed` → 500: server-side problem, details are
//!   logged for the operator and kept out of the response body

use crate::recordings::{StoreError, ValidationError};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    /// The upload was refused before anything was stored.
    Validation(ValidationError),

    /// The recordings directory could not be created or written to.
    StorageUnavailable(String),

    /// The payload could not be fully persisted (disk full, I/O error).
    WriteFailure(String),

    /// The recordings directory could not be read.
    ListingUnavailable(String),

    /// The simulation process could not be started or awaited.
    SimulationFailed(String),
}

impl AppError {
    /// The message placed in the response body. Server-side details stay in
    /// the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(err) => err.to_string(),
            AppError::StorageUnavailable(_) => "Recording storage is unavailable".to_string(),
            AppError::WriteFailure(_) => "Failed to process audio file".to_string(),
            AppError::ListingUnavailable(_) => "Failed to list recordings".to_string(),
            AppError::SimulationFailed(_) => "Failed to run simulation".to_string(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(err) => write!(f, "Validation error: {}", err),
            AppError::StorageUnavailable(msg) => write!(f, "Storage unavailable: {}", msg),
            AppError::WriteFailure(msg) => write!(f, "Write failure: {}", msg),
            AppError::ListingUnavailable(msg) => write!(f, "Listing unavailable: {}", msg),
            AppError::SimulationFailed(msg) => write!(f, "Simulation failed: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::StorageUnavailable(_)
            | AppError::WriteFailure(_)
            | AppError::ListingUnavailable(_)
            | AppError::SimulationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": self.public_message(),
        }))
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

/// Store failures keep their full description (path and I/O error) for the
/// logs; only the category reaches the client.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::StorageUnavailable { .. } => AppError::StorageUnavailable(err.to_string()),
            StoreError::WriteFailure { .. } => AppError::WriteFailure(err.to_string()),
            StoreError::ListingUnavailable { .. } => AppError::ListingUnavailable(err.to_string()),
        }
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        AppError::Validation(ValidationError::Malformed(err.to_string()))
    }
}

pub type AppResult<T> = Result<T, AppError>;
