use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

/// Message shown for every failed tag check. Wrong passwords, wrong keys and
/// tampered envelopes must be indistinguishable to the user.
pub const GENERIC_DECRYPT_FAILURE: &str =
    "could not decrypt share: wrong password or corrupted data";

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("refusing to encrypt an empty payload")]
    EmptyPayload,

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// A password-derived envelope was opened without a password.
    #[error("share is password protected")]
    PasswordRequired,

    /// Tag verification failed inside the cipher.
    #[error("{}", GENERIC_DECRYPT_FAILURE)]
    AuthenticationFailure,

    /// Tag verification failed while decrypting with a password.
    #[error("{}", GENERIC_DECRYPT_FAILURE)]
    WrongPassword,

    /// Tag verification failed while decrypting with an explicit key.
    #[error("{}", GENERIC_DECRYPT_FAILURE)]
    DecryptionFailed,

    #[error("encryption failed")]
    EncryptionFailed,

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("share access: cannot {event} while {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },
}

impl CryptoError {
    /// True for any of the three names of a failed tag check.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            CryptoError::AuthenticationFailure
                | CryptoError::WrongPassword
                | CryptoError::DecryptionFailed
        )
    }
}
