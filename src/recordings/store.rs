//! # Recording Store
//!
//! The store owns the recordings directory. It is the only component that
//! touches the filesystem, and the directory itself is the only index: there
//! is no in-memory catalogue to keep in sync.
//!
//! ## Write path
//! 1. [`RecordingStore::begin`] creates the directory if needed and opens a
//!    hidden temporary file (`.upload-<uuid>.part`).
//! 2. [`PendingRecording::write`] appends chunks as they arrive from the network.
//! 3. [`PendingRecording::commit`] syncs the data to disk and links the
//!    temporary file to its final `recording_<timestamp>.webm` name. Linking
//!    fails with `AlreadyExists` instead of replacing an existing file, so a
//!    name collision moves on to the next disambiguated name and no upload can
//!    ever overwrite another.
//!
//! A pending recording that is aborted or dropped removes its temporary file.
//! Temporary files are hidden and do not carry the `.webm` extension, so the
//! listing never reports a partially written recording.

use super::naming::{is_recording_file_name, recording_file_name};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// How many disambiguated names are tried for one instant before giving up.
const MAX_NAME_ATTEMPTS: u32 = 64;

/// Suffix of in-progress uploads.
const TEMP_SUFFIX: &str = ".part";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("recordings directory {} is unavailable: {}", .path.display(), .source)]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write recording {}: {}", .path.display(), .source)]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to list recordings in {}: {}", .path.display(), .source)]
    ListingUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Metadata returned to the uploader for a recording that has been persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecording {
    /// Client-supplied file name. Informational only, never used for paths.
    pub original_name: Option<String>,
    pub saved_name: String,
    pub size: u64,
    pub path: String,
    pub timestamp: DateTime<Utc>,
}

/// One recording as seen by the listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordingEntry {
    pub filename: String,
    pub size: u64,
    pub created: DateTime<Utc>,
    pub path: String,
}

/// Presence and writability of the recordings directory, for health checks.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    pub path: String,
    pub exists: bool,
    pub writable: bool,
}

/// Handle on the recordings directory. Cheap to clone; holds no open files.
#[derive(Debug, Clone)]
pub struct RecordingStore {
    dir: PathBuf,
}

impl RecordingStore {
    /// Relative directories are resolved against the working directory so
    /// that every path reported to clients is absolute.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let dir = std::path::absolute(&dir).unwrap_or(dir);
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the directory and any missing parents.
    ///
    /// Safe to call concurrently: an existing directory (including one created
    /// by a racing request a moment earlier) counts as success.
    pub async fn ensure_dir(&self) -> StoreResult<()> {
        match fs::create_dir_all(&self.dir).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists && self.dir.is_dir() => Ok(()),
            Err(source) => Err(StoreError::StorageUnavailable {
                path: self.dir.clone(),
                source,
            }),
        }
    }

    /// Start a new upload. Nothing is visible to the listing until
    /// [`PendingRecording::commit`] succeeds.
    pub async fn begin(&self, original_name: Option<String>) -> StoreResult<PendingRecording> {
        self.ensure_dir().await?;

        let temp_path = self
            .dir
            .join(format!(".upload-{}{}", Uuid::new_v4(), TEMP_SUFFIX));

        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .await
            .map_err(|source| StoreError::StorageUnavailable {
                path: self.dir.clone(),
                source,
            })?;

        debug!(temp_path = %temp_path.display(), "Opened temporary upload file");

        Ok(PendingRecording {
            file: Some(file),
            temp_path,
            dir: self.dir.clone(),
            original_name,
            bytes_written: 0,
            finished: false,
        })
    }

    /// Every recording in the directory, newest first.
    ///
    /// Either the complete list is returned or an error; entries that vanish
    /// between reading the directory and inspecting them are skipped.
    pub async fn list(&self) -> StoreResult<Vec<RecordingEntry>> {
        let listing_error = |source: io::Error| StoreError::ListingUnavailable {
            path: self.dir.clone(),
            source,
        };

        let mut entries = fs::read_dir(&self.dir).await.map_err(listing_error)?;
        let mut recordings = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(listing_error)? {
            let Some(filename) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !is_recording_file_name(&filename) {
                continue;
            }

            let path = entry.path();
            let metadata = match fs::metadata(&path).await {
                Ok(metadata) => metadata,
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => return Err(listing_error(err)),
            };
            if !metadata.is_file() {
                continue;
            }

            // Birth time is not available on every filesystem.
            let created = metadata
                .created()
                .or_else(|_| metadata.modified())
                .map_err(listing_error)?;

            recordings.push(RecordingEntry {
                filename,
                size: metadata.len(),
                created: DateTime::<Utc>::from(created),
                path: path.to_string_lossy().into_owned(),
            });
        }

        sort_newest_first(&mut recordings);
        Ok(recordings)
    }

    pub async fn status(&self) -> StoreStatus {
        let (exists, writable) = match fs::metadata(&self.dir).await {
            Ok(metadata) if metadata.is_dir() => (true, !metadata.permissions().readonly()),
            _ => (false, false),
        };

        StoreStatus {
            path: self.dir.to_string_lossy().into_owned(),
            exists,
            writable,
        }
    }
}

/// Newest first; equal timestamps fall back to the file name so that the
/// order is stable between calls.
fn sort_newest_first(recordings: &mut [RecordingEntry]) {
    recordings.sort_by(|a, b| {
        b.created
            .cmp(&a.created)
            .then_with(|| b.filename.cmp(&a.filename))
    });
}

/// An upload in progress, backed by a hidden temporary file.
pub struct PendingRecording {
    file: Option<fs::File>,
    temp_path: PathBuf,
    dir: PathBuf,
    original_name: Option<String>,
    bytes_written: u64,
    finished: bool,
}

impl PendingRecording {
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub async fn write(&mut self, chunk: &[u8]) -> StoreResult<()> {
        let file = self.file.as_mut().ok_or_else(|| StoreError::WriteFailure {
            path: self.temp_path.clone(),
            source: io::Error::other("upload already finished"),
        })?;

        file.write_all(chunk)
            .await
            .map_err(|source| StoreError::WriteFailure {
                path: self.temp_path.clone(),
                source,
            })?;

        self.bytes_written += chunk.len() as u64;
        Ok(())
    }

    /// Make the recording durable and visible under a fresh name.
    pub async fn commit(self) -> StoreResult<StoredRecording> {
        self.commit_at(Utc::now()).await
    }

    pub(crate) async fn commit_at(mut self, accepted_at: DateTime<Utc>) -> StoreResult<StoredRecording> {
        if let Some(mut file) = self.file.take() {
            let synced = async {
                file.flush().await?;
                file.sync_all().await
            }
            .await;
            if let Err(source) = synced {
                return Err(StoreError::WriteFailure {
                    path: self.temp_path.clone(),
                    source,
                });
            }
        }

        let (saved_name, final_path) = self.claim_name(accepted_at).await?;

        self.finished = true;
        if let Err(err) = fs::remove_file(&self.temp_path).await {
            warn!(
                temp_path = %self.temp_path.display(),
                error = %err,
                "Recording saved but temporary file could not be removed"
            );
        }

        Ok(StoredRecording {
            original_name: self.original_name.take(),
            saved_name,
            size: self.bytes_written,
            path: final_path.to_string_lossy().into_owned(),
            timestamp: accepted_at,
        })
    }

    /// Link the temporary file to the first free name for `accepted_at`.
    async fn claim_name(&self, accepted_at: DateTime<Utc>) -> StoreResult<(String, PathBuf)> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = recording_file_name(accepted_at, attempt);
            let final_path = self.dir.join(&name);

            match fs::hard_link(&self.temp_path, &final_path).await {
                Ok(()) => return Ok((name, final_path)),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(name = %name, "Recording name taken, trying next");
                }
                Err(source) => {
                    return Err(StoreError::WriteFailure {
                        path: final_path,
                        source,
                    })
                }
            }
        }

        Err(StoreError::WriteFailure {
            path: self.dir.join(recording_file_name(accepted_at, 0)),
            source: io::Error::new(
                io::ErrorKind::AlreadyExists,
                "no free recording name for this timestamp",
            ),
        })
    }

    /// Discard the upload and its temporary file.
    pub async fn abort(mut self) {
        self.finished = true;
        drop(self.file.take());
        if let Err(err) = fs::remove_file(&self.temp_path).await {
            if err.kind() != io::ErrorKind::NotFound {
                warn!(
                    temp_path = %self.temp_path.display(),
                    error = %err,
                    "Failed to remove aborted upload"
                );
            }
        }
    }
}

impl Drop for PendingRecording {
    fn drop(&mut self) {
        if !self.finished {
            drop(self.file.take());
            let _ = std::fs::remove_file(&self.temp_path);
        }
    }
}
