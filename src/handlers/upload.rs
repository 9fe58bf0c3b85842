//! # Upload Endpoint
//!
//! `POST /upload` accepts one recording as a multipart form and stores it.
//!
//! ## Request lifecycle:
//! 1. **Received**: multipart parts are read one at a time
//! 2. **Validating**: field name and media type are checked before the first
//!    byte is written; size is checked as every chunk arrives
//! 3. **Rejected** (400) or **Persisting**: the part streams into a hidden
//!    temporary file in the recordings directory
//! 4. **Persisted** (200) or **Failed** (500): the temporary file is committed
//!    under its generated name
//!
//! The recording is only committed once the whole multipart body has been
//! read, so a request that turns out to be invalid later on (a second file,
//! a broken trailer, a client disconnect) never leaves a recording behind.
//!
//! ## Response:
//! ```json
//! {
//!   "success": true,
//!   "message": "Audio recording saved successfully!",
//!   "file": {
//!     "originalName": "recording.webm",
//!     "savedName": "recording_2025-01-15T10-30-45-123Z.webm",
//!     "size": 51200,
//!     "path": "/srv/recorder/recordings/recording_2025-01-15T10-30-45-123Z.webm",
//!     "timestamp": "2025-01-15T10:30:45.123Z"
//!   }
//! }
//! ```

use crate::error::{AppError, AppResult};
use crate::recordings::{PendingRecording, StoredRecording, ValidationError};
use crate::state::{AppState, UploadOutcome};
use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpResponse};
use futures_util::stream::StreamExt;
use serde::Serialize;
use tracing::{debug, error, info, warn};

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: &'static str,
    pub file: StoredRecording,
}

pub async fn upload_recording(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> AppResult<HttpResponse> {
    info!("Upload request received");

    let pending = match receive_upload(&state, &mut payload).await {
        Ok(pending) => pending,
        Err(err) => return Err(upload_failed(&state, err)),
    };

    let stored = match pending.commit().await {
        Ok(stored) => stored,
        Err(err) => return Err(upload_failed(&state, err.into())),
    };

    info!(
        saved_name = %stored.saved_name,
        size_kb = %format!("{:.2}", stored.size as f64 / 1024.0),
        path = %stored.path,
        original_name = ?stored.original_name,
        timestamp = %stored.timestamp.to_rfc3339(),
        "Audio recording saved"
    );
    state.record_upload(UploadOutcome::Stored { bytes: stored.size });

    Ok(HttpResponse::Ok().json(UploadResponse {
        success: true,
        message: "Audio recording saved successfully!",
        file: stored,
    }))
}

/// Log a failed upload at the right level and count it.
fn upload_failed(state: &AppState, err: AppError) -> AppError {
    match &err {
        AppError::Validation(reason) => {
            warn!(reason = %reason, "Upload rejected");
            state.record_upload(UploadOutcome::Rejected);
        }
        other => {
            error!(error = %other, "Upload failed");
            state.record_upload(UploadOutcome::Failed);
        }
    }
    err
}

/// Read the whole multipart body and return the (uncommitted) recording.
///
/// A rejected part is aborted on the spot; any other early return drops the
/// pending recording, which deletes its temporary file.
async fn receive_upload(state: &AppState, payload: &mut Multipart) -> AppResult<PendingRecording> {
    let policy = &state.policy;
    let mut pending: Option<PendingRecording> = None;

    while let Some(item) = payload.next().await {
        let mut field = item?;

        let field_name = field
            .content_disposition()
            .and_then(|cd| cd.get_name())
            .unwrap_or_default()
            .to_string();
        let original_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);
        let media_type = field.content_type().map(|mime| mime.to_string());

        debug!(
            field_name = %field_name,
            media_type = ?media_type,
            original_name = ?original_name,
            "Multipart part received"
        );

        // Plain form fields ride along with the file; they are read and ignored.
        let is_file_part = original_name.is_some() || field_name == policy.field_name;
        if !is_file_part {
            drain(&mut field).await?;
            continue;
        }

        policy.check_field(&field_name)?;
        if pending.is_some() {
            return Err(ValidationError::DuplicateFile.into());
        }
        policy.check_media_type(media_type.as_deref())?;

        let mut recording = state.store.begin(original_name).await?;
        if let Err(err) = stream_part(state, &mut field, &mut recording).await {
            recording.abort().await;
            return Err(err);
        }

        pending = Some(recording);
    }

    pending.ok_or_else(|| ValidationError::MissingFile.into())
}

/// Copy one file part into the pending recording, enforcing the size limit
/// as each chunk arrives.
async fn stream_part(
    state: &AppState,
    field: &mut Field,
    recording: &mut PendingRecording,
) -> AppResult<()> {
    while let Some(chunk) = field.next().await {
        let chunk = chunk?;
        state
            .policy
            .check_size(recording.bytes_written() + chunk.len() as u64)?;
        recording.write(&chunk).await?;
    }
    state.policy.check_complete(recording.bytes_written())?;
    Ok(())
}

async fn drain(field: &mut Field) -> AppResult<()> {
    while let Some(chunk) = field.next().await {
        chunk?;
    }
    Ok(())
}
