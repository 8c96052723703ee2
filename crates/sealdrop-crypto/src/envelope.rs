//! Share envelopes and their wire formats
//!
//! [`ShareEnvelope`] is the in-memory form: a tagged variant whose shape
//! guarantees that exactly one of `salt` (password mode) or `key` (keyless
//! mode) exists. Three serialized forms sit at the boundaries:
//!
//! - [`EnvelopeRecord`]: what the store persists (versioned JSON, base64 fields)
//! - [`ShareMetadata`]: the metadata fetch response
//! - [`EnvelopeResponse`]: the envelope fetch response
//!
//! Every decode path re-validates the key-mode shape and the IV, salt and key
//! sizes; a record that violates it is [`CryptoError::MalformedEnvelope`].
//! The ciphertext itself is only judged by the GCM tag.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::cipher::Iv;
use crate::error::{CryptoError, CryptoResult};
use crate::keys::{ContentKey, Salt};

/// Current [`EnvelopeRecord`] format version
pub const ENVELOPE_VERSION: u32 = 1;

/// How the content key of a share is obtained. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMode {
    /// Key is PBKDF2(password, salt); the password never reaches the server.
    PasswordDerived,
    /// Key is random and stored with the envelope.
    RandomKey,
}

impl KeyMode {
    pub fn is_password_protected(self) -> bool {
        matches!(self, KeyMode::PasswordDerived)
    }
}

impl std::fmt::Display for KeyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyMode::PasswordDerived => f.write_str("password"),
            KeyMode::RandomKey => f.write_str("keyless"),
        }
    }
}

/// Plaintext file metadata. Not confidential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub file_name: String,
    pub file_size: u64,
}

/// Everything needed to later decrypt one shared file.
#[derive(Debug, Clone)]
pub enum ShareEnvelope {
    PasswordDerived {
        file: FileInfo,
        ciphertext: Vec<u8>,
        salt: Salt,
        iv: Iv,
    },
    RandomKey {
        file: FileInfo,
        ciphertext: Vec<u8>,
        key: ContentKey,
        iv: Iv,
    },
}

impl ShareEnvelope {
    pub fn key_mode(&self) -> KeyMode {
        match self {
            ShareEnvelope::PasswordDerived { .. } => KeyMode::PasswordDerived,
            ShareEnvelope::RandomKey { .. } => KeyMode::RandomKey,
        }
    }

    pub fn file(&self) -> &FileInfo {
        match self {
            ShareEnvelope::PasswordDerived { file, .. } | ShareEnvelope::RandomKey { file, .. } => {
                file
            }
        }
    }

    pub fn ciphertext(&self) -> &[u8] {
        match self {
            ShareEnvelope::PasswordDerived { ciphertext, .. }
            | ShareEnvelope::RandomKey { ciphertext, .. } => ciphertext,
        }
    }

    pub fn iv(&self) -> &Iv {
        match self {
            ShareEnvelope::PasswordDerived { iv, .. } | ShareEnvelope::RandomKey { iv, .. } => iv,
        }
    }

    pub fn salt(&self) -> Option<&Salt> {
        match self {
            ShareEnvelope::PasswordDerived { salt, .. } => Some(salt),
            ShareEnvelope::RandomKey { .. } => None,
        }
    }

    pub fn key(&self) -> Option<&ContentKey> {
        match self {
            ShareEnvelope::PasswordDerived { .. } => None,
            ShareEnvelope::RandomKey { key, .. } => Some(key),
        }
    }

    /// The metadata fetch response for this envelope.
    pub fn metadata(&self) -> ShareMetadata {
        let file = self.file();
        ShareMetadata {
            file_name: file.file_name.clone(),
            file_size: file.file_size,
            is_password_protected: self.key_mode().is_password_protected(),
        }
    }

    /// The envelope fetch response: `key` only in keyless mode, `salt` only
    /// in password mode.
    pub fn to_response(&self) -> EnvelopeResponse {
        EnvelopeResponse {
            ciphertext: STANDARD.encode(self.ciphertext()),
            salt: self.salt().map(|s| STANDARD.encode(s.as_bytes())),
            iv: STANDARD.encode(self.iv().as_bytes()),
            key: self.key().map(|k| STANDARD.encode(k.as_bytes())),
        }
    }

    /// Rebuild an envelope on the recipient side from a fetch response and the
    /// key mode learned from the metadata fetch.
    pub fn from_response(
        metadata: &ShareMetadata,
        response: &EnvelopeResponse,
    ) -> CryptoResult<Self> {
        let file = FileInfo {
            file_name: metadata.file_name.clone(),
            file_size: metadata.file_size,
        };
        decode_fields(
            metadata.key_mode(),
            file,
            &response.ciphertext,
            &response.iv,
            response.salt.as_deref(),
            response.key.as_deref(),
        )
    }

    pub fn to_record(&self) -> EnvelopeRecord {
        let file = self.file();
        let response = self.to_response();
        EnvelopeRecord {
            version: ENVELOPE_VERSION,
            key_mode: self.key_mode(),
            file_name: file.file_name.clone(),
            file_size: file.file_size,
            ciphertext: response.ciphertext,
            iv: response.iv,
            salt: response.salt,
            key: response.key,
        }
    }

    pub fn from_record(record: &EnvelopeRecord) -> CryptoResult<Self> {
        if record.version != ENVELOPE_VERSION {
            return Err(CryptoError::MalformedEnvelope(format!(
                "unsupported envelope version {}",
                record.version
            )));
        }
        decode_fields(
            record.key_mode,
            FileInfo {
                file_name: record.file_name.clone(),
                file_size: record.file_size,
            },
            &record.ciphertext,
            &record.iv,
            record.salt.as_deref(),
            record.key.as_deref(),
        )
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> CryptoResult<Vec<u8>> {
        serde_json::to_vec(&self.to_record())
            .map_err(|e| CryptoError::MalformedEnvelope(format!("serialization: {e}")))
    }

    /// Deserialize and validate from JSON bytes
    pub fn from_bytes(data: &[u8]) -> CryptoResult<Self> {
        let record: EnvelopeRecord = serde_json::from_slice(data)
            .map_err(|e| CryptoError::MalformedEnvelope(format!("deserialization: {e}")))?;
        Self::from_record(&record)
    }
}

/// Persisted form of a [`ShareEnvelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeRecord {
    /// Envelope format version
    pub version: u32,
    pub key_mode: KeyMode,
    pub file_name: String,
    /// Plaintext size in bytes
    pub file_size: u64,
    /// base64 `ciphertext || tag`
    pub ciphertext: String,
    /// base64, 12 bytes
    pub iv: String,
    /// base64, present only for `password_derived`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    /// base64, present only for `random_key`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// Metadata fetch response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareMetadata {
    pub file_name: String,
    pub file_size: u64,
    /// Maps 1:1 to [`KeyMode::PasswordDerived`].
    pub is_password_protected: bool,
}

impl ShareMetadata {
    pub fn key_mode(&self) -> KeyMode {
        if self.is_password_protected {
            KeyMode::PasswordDerived
        } else {
            KeyMode::RandomKey
        }
    }
}

/// Envelope fetch response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeResponse {
    pub ciphertext: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    pub iv: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

fn decode_fields(
    mode: KeyMode,
    file: FileInfo,
    ciphertext: &str,
    iv: &str,
    salt: Option<&str>,
    key: Option<&str>,
) -> CryptoResult<ShareEnvelope> {
    // Ciphertext length is left to the tag check: a truncated or padded
    // ciphertext must fail exactly like a wrong password.
    let ciphertext = base64_decode("ciphertext", ciphertext)?;
    let iv = Iv::from_slice(&base64_decode("iv", iv)?)?;

    match (mode, salt, key) {
        (KeyMode::PasswordDerived, Some(salt), None) => Ok(ShareEnvelope::PasswordDerived {
            file,
            ciphertext,
            salt: Salt::from_vec(base64_decode("salt", salt)?)?,
            iv,
        }),
        (KeyMode::RandomKey, None, Some(key)) => {
            let mut raw = base64_decode("key", key)?;
            let key = ContentKey::from_slice(&raw);
            zeroize::Zeroize::zeroize(&mut raw);
            Ok(ShareEnvelope::RandomKey {
                file,
                ciphertext,
                key: key?,
                iv,
            })
        }
        (KeyMode::PasswordDerived, _, _) => Err(CryptoError::MalformedEnvelope(
            "password-derived envelope needs a salt and no key".into(),
        )),
        (KeyMode::RandomKey, _, _) => Err(CryptoError::MalformedEnvelope(
            "random-key envelope needs a key and no salt".into(),
        )),
    }
}

fn base64_decode(field: &str, s: &str) -> CryptoResult<Vec<u8>> {
    STANDARD
        .decode(s)
        .map_err(|e| CryptoError::MalformedEnvelope(format!("{field}: base64 decode: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_content_key, generate_salt};
    use crate::{IV_SIZE, TAG_SIZE};

    fn password_envelope() -> ShareEnvelope {
        ShareEnvelope::PasswordDerived {
            file: FileInfo {
                file_name: "notes.txt".into(),
                file_size: 4,
            },
            ciphertext: vec![9u8; 4 + TAG_SIZE],
            salt: generate_salt(),
            iv: Iv::from_bytes([3u8; IV_SIZE]),
        }
    }

    fn keyless_envelope() -> ShareEnvelope {
        ShareEnvelope::RandomKey {
            file: FileInfo {
                file_name: "photo.jpg".into(),
                file_size: 10,
            },
            ciphertext: vec![1u8; 10 + TAG_SIZE],
            key: generate_content_key(),
            iv: Iv::from_bytes([5u8; IV_SIZE]),
        }
    }

    #[test]
    fn test_record_roundtrip_password() {
        let envelope = password_envelope();
        let bytes = envelope.to_bytes().unwrap();
        let restored = ShareEnvelope::from_bytes(&bytes).unwrap();

        assert_eq!(restored.key_mode(), KeyMode::PasswordDerived);
        assert_eq!(restored.file(), envelope.file());
        assert_eq!(restored.ciphertext(), envelope.ciphertext());
        assert_eq!(restored.iv(), envelope.iv());
        assert_eq!(restored.salt(), envelope.salt());
        assert!(restored.key().is_none());
    }

    #[test]
    fn test_record_omits_absent_fields() {
        let json = String::from_utf8(password_envelope().to_bytes().unwrap()).unwrap();
        assert!(json.contains("\"salt\""));
        assert!(!json.contains("\"key\""), "password mode must never carry a key");

        let json = String::from_utf8(keyless_envelope().to_bytes().unwrap()).unwrap();
        assert!(json.contains("\"key\""));
        assert!(!json.contains("\"salt\""));
    }

    #[test]
    fn test_metadata_flag_tracks_mode() {
        assert!(password_envelope().metadata().is_password_protected);
        assert!(!keyless_envelope().metadata().is_password_protected);

        let json = serde_json::to_string(&password_envelope().metadata()).unwrap();
        assert!(json.contains("isPasswordProtected"));
        assert!(json.contains("fileName"));
    }

    #[test]
    fn test_response_roundtrip_keyless() {
        let envelope = keyless_envelope();
        let response = envelope.to_response();
        assert!(response.key.is_some());
        assert!(response.salt.is_none());

        let rebuilt = ShareEnvelope::from_response(&envelope.metadata(), &response).unwrap();
        assert_eq!(
            rebuilt.key().unwrap().as_bytes(),
            envelope.key().unwrap().as_bytes()
        );
    }

    #[test]
    fn test_response_contradicting_mode_rejected() {
        // A keyless response presented as password-protected
        let envelope = keyless_envelope();
        let mut metadata = envelope.metadata();
        metadata.is_password_protected = true;

        let result = ShareEnvelope::from_response(&metadata, &envelope.to_response());
        assert!(matches!(result, Err(CryptoError::MalformedEnvelope(_))));
    }

    #[test]
    fn test_record_with_both_salt_and_key_rejected() {
        let mut record = password_envelope().to_record();
        record.key = Some(STANDARD.encode([0u8; 32]));

        let result = ShareEnvelope::from_record(&record);
        assert!(matches!(result, Err(CryptoError::MalformedEnvelope(_))));
    }

    #[test]
    fn test_record_bad_iv_length_rejected() {
        let mut record = keyless_envelope().to_record();
        record.iv = STANDARD.encode([0u8; 16]);

        assert!(ShareEnvelope::from_record(&record).is_err());
    }

    #[test]
    fn test_record_short_salt_rejected() {
        let mut record = password_envelope().to_record();
        record.salt = Some(STANDARD.encode([0u8; 8]));

        assert!(ShareEnvelope::from_record(&record).is_err());
    }

    #[test]
    fn test_resized_ciphertext_fails_like_wrong_password() {
        use crate::decrypt::DecryptionService;
        use crate::encrypt::EncryptionService;
        use crate::kdf::KdfParams;
        use secrecy::SecretString;

        let params = KdfParams { iterations: 1_000 };
        let pw = SecretString::from("pw");
        let envelope = EncryptionService::new(params)
            .encrypt_for_share("hello.txt", b"hello world", Some(&pw))
            .unwrap();
        let record = envelope.to_record();
        let original = STANDARD.decode(&record.ciphertext).unwrap();

        let mut extended = original.clone();
        extended.push(0);
        let resized = [
            original[..original.len() - 1].to_vec(),
            original[..TAG_SIZE - 1].to_vec(),
            Vec::new(),
            extended,
        ];

        for ciphertext in resized {
            let mut record = record.clone();
            record.ciphertext = STANDARD.encode(&ciphertext);

            let restored = ShareEnvelope::from_record(&record).unwrap();
            let err = DecryptionService::new(params)
                .open(&restored, Some(&pw))
                .unwrap_err();
            assert!(matches!(err, CryptoError::WrongPassword), "len {}", ciphertext.len());
        }
    }

    #[test]
    fn test_record_unknown_version_rejected() {
        let mut record = keyless_envelope().to_record();
        record.version = 99;

        assert!(ShareEnvelope::from_record(&record).is_err());
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        let result = ShareEnvelope::from_bytes(b"not json");
        assert!(matches!(result, Err(CryptoError::MalformedEnvelope(_))));
    }
}
