use thiserror::Error;

use sealdrop_crypto::CryptoError;

pub type SealdropResult<T> = Result<T, SealdropError>;

#[derive(Debug, Error)]
pub enum SealdropError {
    #[error("share not found: {0}")]
    NotFound(String),

    #[error("invalid share id or link: {0}")]
    InvalidLink(String),

    #[error("share is password protected")]
    PasswordRequired,

    #[error("upload too large: {size} bytes (limit {limit})")]
    TooLarge { size: u64, limit: u64 },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("storage backend error: {0}")]
    Backend(#[from] opendal::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SealdropError {
    /// True when decryption failed for any reason the user must not be told
    /// apart (wrong password, wrong key, tampered envelope).
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, SealdropError::Crypto(e) if e.is_authentication_failure())
    }
}
