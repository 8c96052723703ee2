//! sealdrop-crypto: client-side encryption for shared files
//!
//! A file is sealed before it leaves the client; the server only ever stores
//! the resulting [`ShareEnvelope`]. Two mutually exclusive key modes exist:
//!
//! ```text
//! PasswordDerived
//!   salt  = 16 random bytes (fresh per file)
//!   key   = PBKDF2-HMAC-SHA256(password, salt) → 256-bit     (never leaves the client)
//!   (ciphertext, iv) = AES-256-GCM(key, plaintext)           (iv = 96-bit random per call)
//!
//! RandomKey
//!   key   = 256 random bits                                   (stored server-side with the envelope)
//!   (ciphertext, iv) = AES-256-GCM(key, plaintext)
//! ```
//!
//! Recipients walk the [`ShareAccess`] state machine: fetch metadata to learn
//! the key mode, optionally supply a password, fetch the envelope, decrypt.

pub mod access;
pub mod cipher;
pub mod decrypt;
pub mod encrypt;
pub mod envelope;
pub mod error;
pub mod kdf;
pub mod keys;

pub use access::{AccessState, ShareAccess};
pub use cipher::{decrypt, encrypt, Iv};
pub use decrypt::DecryptionService;
pub use encrypt::EncryptionService;
pub use envelope::{
    EnvelopeRecord, EnvelopeResponse, FileInfo, KeyMode, ShareEnvelope, ShareMetadata,
};
pub use error::{CryptoError, CryptoResult};
pub use kdf::{derive_key, KdfParams};
pub use keys::{generate_content_key, generate_salt, ContentKey, Salt};

/// Size of an AES-256 key in bytes
pub const KEY_SIZE: usize = 32;

/// Size of an AES-GCM nonce (96-bit)
pub const IV_SIZE: usize = 12;

/// Size of a freshly generated PBKDF2 salt
pub const SALT_SIZE: usize = 16;

/// Smallest salt accepted when deriving or decoding
pub const MIN_SALT_SIZE: usize = 16;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;

/// Default PBKDF2-HMAC-SHA256 iteration count
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 600_000;

/// Lowest iteration count a deployment may configure
pub const MIN_PBKDF2_ITERATIONS: u32 = 100_000;
