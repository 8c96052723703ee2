//! Key derivation: PBKDF2-HMAC-SHA256 password → content key

use pbkdf2::pbkdf2_hmac;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::{CryptoError, CryptoResult};
use crate::keys::ContentKey;
use crate::{DEFAULT_PBKDF2_ITERATIONS, KEY_SIZE, MIN_SALT_SIZE};

/// PBKDF2 parameters for KDF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// HMAC-SHA256 rounds (default: 600_000)
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

/// Derive a 256-bit content key from a password and salt using PBKDF2-HMAC-SHA256.
///
/// The salt must be at least 16 bytes; it is stored alongside the ciphertext
/// and does not need to be secret. The same `(password, salt, params)` always
/// yields the same key, which is what lets a recipient re-derive it.
pub fn derive_key(
    password: &SecretString,
    salt: &[u8],
    params: &KdfParams,
) -> CryptoResult<ContentKey> {
    let password = password.expose_secret();
    if password.is_empty() {
        return Err(CryptoError::KeyDerivation("password must not be empty".into()));
    }
    if salt.len() < MIN_SALT_SIZE {
        return Err(CryptoError::KeyDerivation(format!(
            "salt must be at least {MIN_SALT_SIZE} bytes, got {}",
            salt.len()
        )));
    }
    if params.iterations == 0 {
        return Err(CryptoError::KeyDerivation(
            "iteration count must be non-zero".into(),
        ));
    }

    let mut key = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, params.iterations, &mut key);
    let derived = ContentKey::from_bytes(key);
    key.zeroize();

    Ok(derived)
}
