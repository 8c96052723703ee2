//! Key material: content keys and PBKDF2 salts

use rand::RngCore;
use zeroize::Zeroize;

use crate::error::{CryptoError, CryptoResult};
use crate::{KEY_SIZE, MIN_SALT_SIZE, SALT_SIZE};

/// A 256-bit AES key, either derived from a password or generated at random.
///
/// Zeroized on drop to prevent secrets lingering in memory.
#[derive(Clone)]
pub struct ContentKey {
    bytes: [u8; KEY_SIZE],
}

impl ContentKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Build a key from untrusted input (e.g. a decoded envelope field).
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let bytes: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::MalformedEnvelope(format!(
                "key must be {KEY_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for ContentKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A per-file PBKDF2 salt. Not secret, but never reused across files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Salt(Vec<u8>);

impl Salt {
    pub fn from_vec(bytes: Vec<u8>) -> CryptoResult<Self> {
        if bytes.len() < MIN_SALT_SIZE {
            return Err(CryptoError::MalformedEnvelope(format!(
                "salt must be at least {MIN_SALT_SIZE} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Generate a random 256-bit content key for keyless sharing.
pub fn generate_content_key() -> ContentKey {
    let mut bytes = [0u8; KEY_SIZE];
    rand::thread_rng().fill_bytes(&mut bytes);
    ContentKey::from_bytes(bytes)
}

/// Generate a fresh 16-byte salt for password-derived sharing.
pub fn generate_salt() -> Salt {
    let mut bytes = vec![0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut bytes);
    Salt(bytes)
}
