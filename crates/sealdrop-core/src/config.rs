use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use sealdrop_crypto::{KdfParams, DEFAULT_PBKDF2_ITERATIONS, MIN_PBKDF2_ITERATIONS};

use crate::error::{SealdropError, SealdropResult};

/// Top-level configuration (loaded from sealdrop.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SealdropConfig {
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub crypto: CryptoConfig,
    pub share: ShareConfig,
}

impl SealdropConfig {
    pub fn from_toml_str(s: &str) -> SealdropResult<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| SealdropError::Config(format!("parsing config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would weaken the share format or cannot work.
    pub fn validate(&self) -> SealdropResult<()> {
        if self.crypto.pbkdf2_iterations < MIN_PBKDF2_ITERATIONS {
            return Err(SealdropError::Config(format!(
                "crypto.pbkdf2_iterations must be at least {MIN_PBKDF2_ITERATIONS}, got {}",
                self.crypto.pbkdf2_iterations
            )));
        }
        if self.storage.backend == StorageBackend::S3 && self.storage.bucket.is_empty() {
            return Err(SealdropError::Config(
                "storage.bucket must be set for the s3 backend".into(),
            ));
        }
        if self.share.max_upload_bytes == 0 {
            return Err(SealdropError::Config(
                "share.max_upload_bytes must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local, lost on exit. For tests and demos.
    Memory,
    /// Local directory under `root`
    Fs,
    /// S3-compatible object store
    S3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend kind (default: fs)
    pub backend: StorageBackend,
    /// Root directory for the fs backend
    pub root: PathBuf,
    /// S3 endpoint
    pub endpoint: String,
    /// S3 region (default: us-east-1)
    pub region: String,
    /// S3 bucket name
    pub bucket: String,
    /// Key prefix under which envelopes and metadata are stored
    pub prefix: String,
    /// Enforce HTTPS for S3 connections (error on HTTP endpoints)
    pub enforce_tls: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Fs,
            root: PathBuf::from("~/.local/share/sealdrop"),
            endpoint: "http://localhost:9000".into(),
            region: "us-east-1".into(),
            bucket: "sealdrop".into(),
            prefix: "shares".into(),
            enforce_tls: false,
        }
    }
}

/// Share encryption configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// PBKDF2-HMAC-SHA256 iterations for password-protected shares.
    /// Uploader and recipient must agree on this value.
    pub pbkdf2_iterations: u32,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            pbkdf2_iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

impl CryptoConfig {
    pub fn kdf_params(&self) -> KdfParams {
        KdfParams {
            iterations: self.pbkdf2_iterations,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Public base URL used to build share links
    pub base_url: String,
    /// Largest plaintext accepted for upload, in bytes (default: 100 MiB)
    pub max_upload_bytes: u64,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".into(),
            max_upload_bytes: 100 * 1024 * 1024,
        }
    }
}
