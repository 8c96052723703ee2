//! Upload-time encryption: plaintext → [`ShareEnvelope`]

use secrecy::SecretString;
use tracing::debug;

use crate::cipher;
use crate::envelope::{FileInfo, ShareEnvelope};
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::{derive_key, KdfParams};
use crate::keys::{generate_content_key, generate_salt};

/// Seals files for sharing. Holds only KDF parameters, never key material,
/// so one instance can serve any number of concurrent uploads.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncryptionService {
    params: KdfParams,
}

impl EncryptionService {
    pub fn new(params: KdfParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &KdfParams {
        &self.params
    }

    /// Encrypt `plaintext` for sharing.
    ///
    /// - With a password: fresh salt, PBKDF2-derived key, `PasswordDerived`
    ///   envelope carrying the salt and no key.
    /// - Without: fresh random key, `RandomKey` envelope carrying the key and
    ///   no salt.
    ///
    /// Empty payloads are rejected with [`CryptoError::EmptyPayload`].
    pub fn encrypt_for_share(
        &self,
        file_name: &str,
        plaintext: &[u8],
        password: Option<&SecretString>,
    ) -> CryptoResult<ShareEnvelope> {
        if plaintext.is_empty() {
            return Err(CryptoError::EmptyPayload);
        }

        let file = FileInfo {
            file_name: file_name.to_string(),
            file_size: plaintext.len() as u64,
        };

        let envelope = match password {
            Some(password) => {
                let salt = generate_salt();
                let key = derive_key(password, salt.as_bytes(), &self.params)?;
                let (ciphertext, iv) = cipher::encrypt(plaintext, &key)?;
                ShareEnvelope::PasswordDerived {
                    file,
                    ciphertext,
                    salt,
                    iv,
                }
            }
            None => {
                let key = generate_content_key();
                let (ciphertext, iv) = cipher::encrypt(plaintext, &key)?;
                ShareEnvelope::RandomKey {
                    file,
                    ciphertext,
                    key,
                    iv,
                }
            }
        };

        debug!(
            key_mode = %envelope.key_mode(),
            bytes = plaintext.len(),
            "sealed share payload"
        );
        Ok(envelope)
    }
}
