//! sealdrop-store: ciphertext-only share storage (OpenDAL) and share client

pub mod client;
pub mod health;
pub mod operator;
pub mod store;

pub use client::{OpenedShare, ShareClient, UploadReceipt};
pub use health::check_health;
pub use operator::{build_operator, memory_operator, S3Credentials};
pub use store::EnvelopeStore;
