//! OpenDAL Operator factory for sealdrop storage backends

use anyhow::{Context, Result};
use opendal::Operator;
use std::path::{Path, PathBuf};

use sealdrop_core::config::{StorageBackend, StorageConfig};

/// S3 credentials, kept out of the config file.
#[derive(Clone)]
pub struct S3Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for S3Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .finish()
    }
}

impl S3Credentials {
    /// Read AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY, falling back to the
    /// SEALDROP_ prefixed variants.
    pub fn from_env() -> Result<Self> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .or_else(|_| std::env::var("SEALDROP_ACCESS_KEY_ID"))
            .context(
                "S3 credentials not set\n\
                 Set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY environment variables.",
            )?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .or_else(|_| std::env::var("SEALDROP_SECRET_ACCESS_KEY"))
            .context("AWS_SECRET_ACCESS_KEY environment variable not set")?;
        Ok(Self {
            access_key_id,
            secret_access_key,
        })
    }
}

/// Build an operator for the configured backend.
///
/// `credentials` is only consulted for the S3 backend. If `enforce_tls` is
/// set and the S3 endpoint uses HTTP this returns an error; otherwise a
/// warning is logged for non-HTTPS endpoints.
pub fn build_operator(
    storage: &StorageConfig,
    credentials: Option<&S3Credentials>,
) -> Result<Operator> {
    match storage.backend {
        StorageBackend::Memory => memory_operator(),
        StorageBackend::Fs => fs_operator(&expand_tilde(&storage.root)),
        StorageBackend::S3 => {
            let credentials =
                credentials.context("the s3 backend needs credentials")?;
            s3_operator(storage, credentials)
        }
    }
}

/// In-process store; contents vanish with the operator.
pub fn memory_operator() -> Result<Operator> {
    Ok(Operator::new(opendal::services::Memory::default())
        .context("creating OpenDAL memory operator")?
        .finish())
}

/// Store rooted at a local directory.
pub fn fs_operator(root: &Path) -> Result<Operator> {
    let builder = opendal::services::Fs::default().root(&root.to_string_lossy());
    Ok(Operator::new(builder)
        .with_context(|| format!("creating OpenDAL fs operator at {}", root.display()))?
        .layer(opendal::layers::LoggingLayer::default())
        .finish())
}

fn s3_operator(storage: &StorageConfig, credentials: &S3Credentials) -> Result<Operator> {
    if storage.endpoint.starts_with("http://") {
        if storage.enforce_tls {
            anyhow::bail!(
                "S3 endpoint uses plaintext HTTP ({}), but enforce_tls is enabled. \
                 Use an HTTPS endpoint or set storage.enforce_tls = false for local development.",
                storage.endpoint
            );
        }
        tracing::warn!(
            endpoint = %storage.endpoint,
            "S3 endpoint uses plaintext HTTP; credentials are transmitted unencrypted"
        );
    }

    // opendal 0.55: S3 builder uses consuming pattern (methods take `self`, return `Self`)
    let builder = opendal::services::S3::default()
        .endpoint(&storage.endpoint)
        .region(&storage.region)
        .bucket(&storage.bucket)
        .access_key_id(&credentials.access_key_id)
        .secret_access_key(&credentials.secret_access_key);

    let op = Operator::new(builder)
        .context("creating OpenDAL S3 operator")?
        .layer(opendal::layers::LoggingLayer::default())
        .layer(
            opendal::layers::RetryLayer::new()
                .with_max_times(5)
                .with_jitter(),
        )
        .finish();

    Ok(op)
}

/// Expand `~` in path to the user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    match path.to_str().and_then(|s| s.strip_prefix("~/")) {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_default();
            PathBuf::from(home).join(rest)
        }
        None => path.to_path_buf(),
    }
}
