//! AES-256-GCM payload encryption/decryption
//!
//! Ciphertext layout (binary):
//! ```text
//! [N bytes: ciphertext][16 bytes: GCM tag]
//! ```
//!
//! The 96-bit IV travels beside the ciphertext rather than inside it, so the
//! envelope can store it as its own field. A fresh IV is drawn for every
//! `encrypt` call; callers cannot supply one.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};
use crate::keys::ContentKey;
use crate::{IV_SIZE, TAG_SIZE};

/// A 96-bit AES-GCM nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Iv([u8; IV_SIZE]);

impl Iv {
    pub fn from_bytes(bytes: [u8; IV_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let bytes: [u8; IV_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::MalformedEnvelope(format!(
                "iv must be {IV_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; IV_SIZE] {
        &self.0
    }

    fn random() -> Self {
        let mut bytes = [0u8; IV_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }
}

/// Encrypt a payload with AES-256-GCM under a freshly generated IV.
///
/// Returns `(ciphertext || tag, iv)`.
pub fn encrypt(plaintext: &[u8], key: &ContentKey) -> CryptoResult<(Vec<u8>, Iv)> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let iv = Iv::random();

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(iv.as_bytes()), plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    Ok((ciphertext, iv))
}

/// Decrypt `ciphertext || tag` with AES-256-GCM.
///
/// Any tag mismatch (wrong key, wrong IV, altered ciphertext) yields
/// [`CryptoError::AuthenticationFailure`]; no partial plaintext is returned.
pub fn decrypt(ciphertext: &[u8], key: &ContentKey, iv: &Iv) -> CryptoResult<Vec<u8>> {
    if ciphertext.len() < TAG_SIZE {
        return Err(CryptoError::AuthenticationFailure);
    }

    let cipher = Aes256Gcm::new(key.as_bytes().into());
    cipher
        .decrypt(Nonce::from_slice(iv.as_bytes()), ciphertext)
        .map_err(|_| CryptoError::AuthenticationFailure)
}
