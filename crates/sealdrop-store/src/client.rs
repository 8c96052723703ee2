//! Share client: encryption services wired to an [`EnvelopeStore`]
//!
//! Upload seals locally and hands only the envelope to the store. Opening
//! walks [`ShareAccess`] against the store: metadata, optional password,
//! envelope, decrypt.

use opendal::Operator;
use secrecy::SecretString;
use tracing::{debug, info, warn};

use sealdrop_core::config::SealdropConfig;
use sealdrop_core::{FileId, SealdropError, SealdropResult, ShareLink};
use sealdrop_crypto::{
    DecryptionService, EncryptionService, KdfParams, KeyMode, ShareAccess, ShareMetadata,
};

use crate::store::EnvelopeStore;

/// Result of a successful upload
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub file_id: FileId,
    pub key_mode: KeyMode,
    pub link: ShareLink,
    /// Stored ciphertext size including the GCM tag
    pub ciphertext_bytes: usize,
}

/// A decrypted share
#[derive(Debug)]
pub struct OpenedShare {
    pub metadata: ShareMetadata,
    pub plaintext: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ShareClient {
    store: EnvelopeStore,
    encryption: EncryptionService,
    decryption: DecryptionService,
    base_url: String,
    max_upload_bytes: u64,
}

impl ShareClient {
    pub fn new(
        store: EnvelopeStore,
        params: KdfParams,
        base_url: &str,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            store,
            encryption: EncryptionService::new(params),
            decryption: DecryptionService::new(params),
            base_url: base_url.to_string(),
            max_upload_bytes,
        }
    }

    pub fn from_config(op: Operator, config: &SealdropConfig) -> Self {
        Self::new(
            EnvelopeStore::new(op, &config.storage.prefix),
            config.crypto.kdf_params(),
            &config.share.base_url,
            config.share.max_upload_bytes,
        )
    }

    pub fn store(&self) -> &EnvelopeStore {
        &self.store
    }

    /// Seal `plaintext` and persist the envelope. With a password the store
    /// receives only ciphertext, salt and IV.
    pub async fn upload(
        &self,
        file_name: &str,
        plaintext: &[u8],
        password: Option<&SecretString>,
    ) -> SealdropResult<UploadReceipt> {
        let size = plaintext.len() as u64;
        if size > self.max_upload_bytes {
            return Err(SealdropError::TooLarge {
                size,
                limit: self.max_upload_bytes,
            });
        }

        let envelope = self
            .encryption
            .encrypt_for_share(file_name, plaintext, password)?;
        let file_id = self.store.put(&envelope).await?;

        Ok(UploadReceipt {
            file_id,
            key_mode: envelope.key_mode(),
            link: ShareLink::new(&self.base_url, file_id),
            ciphertext_bytes: envelope.ciphertext().len(),
        })
    }

    pub async fn metadata(&self, id: &FileId) -> SealdropResult<ShareMetadata> {
        self.store.metadata(id).await
    }

    /// Fetch and decrypt a share.
    ///
    /// `prompt` is called only if the metadata marks the share as password
    /// protected; returning `None` aborts with
    /// [`SealdropError::PasswordRequired`]. Each call is one attempt; a wrong
    /// password means calling `open` again.
    pub async fn open<F>(&self, id: &FileId, prompt: F) -> SealdropResult<OpenedShare>
    where
        F: FnOnce(&ShareMetadata) -> Option<SecretString>,
    {
        let mut access = ShareAccess::new();

        let metadata = self.store.metadata(id).await?;
        let mode = access.metadata_fetched(metadata.clone())?;
        debug!(file_id = %id, key_mode = %mode, "share metadata fetched");

        if access.needs_password() {
            let password = prompt(&metadata).ok_or(SealdropError::PasswordRequired)?;
            access.password_entered(password)?;
        }

        let response = self.store.fetch_envelope(id).await?;
        access.envelope_fetched(&response)?;

        match access.decrypt(&self.decryption) {
            Ok(plaintext) => {
                info!(file_id = %id, bytes = plaintext.len(), "share opened");
                Ok(OpenedShare {
                    metadata,
                    plaintext,
                })
            }
            Err(e) => {
                warn!(file_id = %id, key_mode = %mode, "share could not be opened");
                Err(e.into())
            }
        }
    }

    pub async fn delete(&self, id: &FileId) -> SealdropResult<()> {
        self.store.delete(id).await
    }
}
