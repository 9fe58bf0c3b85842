//! # Application State
//!
//! State shared by every request handler. The upload pipeline itself keeps no
//! mutable state here: the recordings directory is the only thing concurrent
//! uploads share, and the store coordinates through the filesystem. The only
//! mutable data is request metrics, which never influence an upload's outcome.
//!
//! ## Arc<RwLock<T>> Pattern
//! - **Arc**: every actix worker holds a clone of `AppState`
//! - **RwLock**: many readers (health checks) or one writer (a finishing request)

use crate::config::AppConfig;
use crate::recordings::{RecordingStore, UploadPolicy};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct AppState {
    /// Configuration is fixed for the lifetime of the process.
    pub config: Arc<AppConfig>,

    /// Handle on the recordings directory.
    pub store: RecordingStore,

    /// Size, media type and field rules for uploads.
    pub policy: UploadPolicy,

    pub metrics: Arc<RwLock<AppMetrics>>,

    pub start_time: Instant,
}

/// Counters collected across all HTTP requests.
#[derive(Debug, Default, Clone)]
pub struct AppMetrics {
    pub request_count: u64,
    pub error_count: u64,

    /// Uploads that produced a stored recording.
    pub uploads_accepted: u64,
    /// Uploads refused by validation (HTTP 400).
    pub uploads_rejected: u64,
    /// Uploads that passed validation but could not be stored (HTTP 500).
    pub uploads_failed: u64,
    /// Total bytes written to the recordings directory.
    pub bytes_stored: u64,

    /// Key: endpoint name (e.g. "POST /upload")
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

/// How an upload request ended, for the upload counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Stored { bytes: u64 },
    Rejected,
    Failed,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let store = RecordingStore::new(config.storage.recordings_dir.clone());
        let policy = UploadPolicy::from_config(&config.storage);

        Self {
            config: Arc::new(config),
            store,
            policy,
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
        }
    }

    pub fn get_config(&self) -> Arc<AppConfig> {
        Arc::clone(&self.config)
    }

    // A panic while a writer held the lock leaves plain counters behind, so a
    // poisoned lock is still safe to use.
    fn with_metrics<R>(&self, update: impl FnOnce(&mut AppMetrics) -> R) -> R {
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        update(&mut metrics)
    }

    pub fn increment_request_count(&self) {
        self.with_metrics(|metrics| metrics.request_count += 1);
    }

    pub fn increment_error_count(&self) {
        self.with_metrics(|metrics| metrics.error_count += 1);
    }

    /// Record one finished request against its endpoint (e.g. "GET /recordings").
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        self.with_metrics(|metrics| {
            let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();

            endpoint_metric.request_count += 1;
            endpoint_metric.total_duration_ms += duration_ms;

            if is_error {
                endpoint_metric.error_count += 1;
            }
        });
    }

    pub fn record_upload(&self, outcome: UploadOutcome) {
        self.with_metrics(|metrics| match outcome {
            UploadOutcome::Stored { bytes } => {
                metrics.uploads_accepted += 1;
                metrics.bytes_stored += bytes;
            }
            UploadOutcome::Rejected => metrics.uploads_rejected += 1,
            UploadOutcome::Failed => metrics.uploads_failed += 1,
        });
    }

    /// Copy of the current metrics, so the lock is not held while a response
    /// is serialized.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        self.metrics.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl AppMetrics {
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

impl EndpointMetric {
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}
