//! Retrieval-time decryption: [`ShareEnvelope`] → plaintext

use secrecy::SecretString;
use tracing::debug;

use crate::cipher::{self, Iv};
use crate::envelope::ShareEnvelope;
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::{derive_key, KdfParams};
use crate::keys::{ContentKey, Salt};

/// Opens sealed shares. Stateless apart from the KDF parameters, which must
/// match those used at upload time.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecryptionService {
    params: KdfParams,
}

impl DecryptionService {
    pub fn new(params: KdfParams) -> Self {
        Self { params }
    }

    /// Re-derive the key from `password` and the stored salt, then decrypt.
    ///
    /// A failed tag check surfaces as [`CryptoError::WrongPassword`] whether
    /// the password was wrong or the envelope was altered.
    pub fn decrypt_with_password(
        &self,
        ciphertext: &[u8],
        salt: &Salt,
        iv: &Iv,
        password: &SecretString,
    ) -> CryptoResult<Vec<u8>> {
        let key = derive_key(password, salt.as_bytes(), &self.params)?;
        cipher::decrypt(ciphertext, &key, iv).map_err(|e| match e {
            CryptoError::AuthenticationFailure => CryptoError::WrongPassword,
            other => other,
        })
    }

    /// Decrypt with an explicit key. A failed tag check surfaces as
    /// [`CryptoError::DecryptionFailed`].
    pub fn decrypt_with_key(
        &self,
        ciphertext: &[u8],
        iv: &Iv,
        key: &ContentKey,
    ) -> CryptoResult<Vec<u8>> {
        cipher::decrypt(ciphertext, key, iv).map_err(|e| match e {
            CryptoError::AuthenticationFailure => CryptoError::DecryptionFailed,
            other => other,
        })
    }

    /// Decrypt whichever variant `envelope` is. A password is required for
    /// password-derived envelopes and ignored for keyless ones.
    pub fn open(
        &self,
        envelope: &ShareEnvelope,
        password: Option<&SecretString>,
    ) -> CryptoResult<Vec<u8>> {
        let plaintext = match envelope {
            ShareEnvelope::PasswordDerived {
                ciphertext,
                salt,
                iv,
                ..
            } => {
                let password = password.ok_or(CryptoError::PasswordRequired)?;
                self.decrypt_with_password(ciphertext, salt, iv, password)?
            }
            ShareEnvelope::RandomKey {
                ciphertext, key, iv, ..
            } => self.decrypt_with_key(ciphertext, iv, key)?,
        };

        debug!(
            key_mode = %envelope.key_mode(),
            bytes = plaintext.len(),
            "opened share payload"
        );
        Ok(plaintext)
    }
}
