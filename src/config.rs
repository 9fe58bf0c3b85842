//! # Configuration Management
//!
//! Application settings come from three sources, highest priority first:
//! 1. Environment variables (`APP_SERVER__PORT`, `APP_STORAGE__RECORDINGS_DIR`, ...)
//!    plus the plain `HOST` / `PORT` variables used by deployment platforms
//! 2. An optional `config.toml` in the working directory
//! 3. Built-in defaults (the `Default` impl below)
//!
//! Nested keys are separated by a double underscore so that field names that
//! contain underscores (`recordings_dir`, `max_upload_bytes`) survive the
//! mapping from environment variable to config key.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Default upload limit: 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Multipart field that carries the recording.
pub const DEFAULT_FIELD_NAME: &str = "audio-file";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub assets: AssetsConfig,
    pub simulation: SimulationConfig,
}

/// Where the HTTP server listens.
///
/// - `host = "127.0.0.1"`: only accept connections from this machine
/// - `host = "0.0.0.0"`: accept connections from any interface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Upload persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Flat directory holding every recording. Created on startup and again
    /// on demand if it disappears.
    pub recordings_dir: PathBuf,
    /// Largest accepted upload in bytes.
    pub max_upload_bytes: u64,
    /// Name of the multipart field carrying the audio file.
    pub field_name: String,
}

/// Static client bundle (the recorder page and its script).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    pub public_dir: PathBuf,
}

/// External program started by `POST /run-sim`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub program: String,
    pub script: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            storage: StorageConfig {
                recordings_dir: PathBuf::from("recordings"),
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
                field_name: DEFAULT_FIELD_NAME.to_string(),
            },
            assets: AssetsConfig {
                public_dir: PathBuf::from("public"),
            },
            simulation: SimulationConfig {
                program: "python3".to_string(),
                script: PathBuf::from("../backend/simulate.py"),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, `config.toml` and the environment.
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER__HOST=0.0.0.0`
    /// - `APP_STORAGE__RECORDINGS_DIR=/var/lib/recorder`
    /// - `APP_STORAGE__MAX_UPLOAD_BYTES=5242880`
    /// - `HOST=0.0.0.0` / `PORT=8080`: deployment platform overrides
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // required(false): a missing config.toml is fine
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Reject settings that would make every request fail.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.storage.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("Maximum upload size must be greater than 0"));
        }

        if self.storage.field_name.trim().is_empty() {
            return Err(anyhow::anyhow!("Upload field name cannot be empty"));
        }

        if self.storage.recordings_dir.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("Recordings directory cannot be empty"));
        }

        if self.simulation.program.trim().is_empty() {
            return Err(anyhow::anyhow!("Simulation program cannot be empty"));
        }

        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.storage.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.storage.field_name, "audio-file");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.storage.max_upload_bytes = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.storage.field_name = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.storage.recordings_dir = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_defaults_survive_config_roundtrip() {
        let config: AppConfig = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default()).unwrap())
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.storage.recordings_dir, PathBuf::from("recordings"));
        assert_eq!(config.simulation.program, "python3");
        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
    }
}
