//! # Recording Persistence
//!
//! Everything between "a browser sent us some audio" and "a file exists on
//! disk" lives here:
//!
//! - **naming**: turns the moment an upload is accepted into a unique file name
//! - **validator**: decides whether an upload may be stored at all
//! - **store**: writes recordings atomically and lists what has been stored
//!
//! The HTTP handlers in `handlers/` only orchestrate these pieces.

pub mod naming;
pub mod store;
pub mod validator;

pub use store::{PendingRecording, RecordingStore, StoreError, StoredRecording};
pub use validator::{UploadPolicy, ValidationError};
