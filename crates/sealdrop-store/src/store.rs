//! Share envelope store on an OpenDAL operator
//!
//! Object layout:
//! ```text
//! {prefix}/envelopes/{file_id}.json   EnvelopeRecord (ciphertext, iv, salt | key)
//! {prefix}/meta/{file_id}.json        ShareMetadata (fileName, fileSize, isPasswordProtected)
//! ```
//!
//! The store only ever handles ciphertext. For keyless shares the record
//! also holds the content key, which is returned on envelope fetch; password
//! shares carry only the salt.

use opendal::{ErrorKind, Operator};
use tracing::{debug, info, warn};

use sealdrop_core::{FileId, SealdropError, SealdropResult};
use sealdrop_crypto::{EnvelopeResponse, ShareEnvelope, ShareMetadata};

#[derive(Debug, Clone)]
pub struct EnvelopeStore {
    op: Operator,
    prefix: String,
}

impl EnvelopeStore {
    pub fn new(op: Operator, prefix: &str) -> Self {
        Self {
            op,
            prefix: prefix.trim_matches('/').to_string(),
        }
    }

    pub fn operator(&self) -> &Operator {
        &self.op
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Persist an envelope and mint its file ID.
    pub async fn put(&self, envelope: &ShareEnvelope) -> SealdropResult<FileId> {
        let id = FileId::new();
        let record = envelope.to_bytes()?;
        let metadata = serde_json::to_vec(&envelope.metadata())
            .map_err(|e| SealdropError::Storage(format!("serializing metadata: {e}")))?;

        // Envelope first: a share becomes visible once its metadata exists.
        let envelope_path = self.envelope_path(&id);
        self.op.write(&envelope_path, record).await?;
        if let Err(e) = self.op.write(&self.meta_path(&id), metadata).await {
            if let Err(cleanup) = self.op.delete(&envelope_path).await {
                warn!(file_id = %id, error = %cleanup, "failed to remove orphaned envelope");
            }
            return Err(e.into());
        }

        info!(
            file_id = %id,
            key_mode = %envelope.key_mode(),
            bytes = envelope.ciphertext().len(),
            "stored share envelope"
        );
        Ok(id)
    }

    /// Metadata fetch: plaintext file info plus the password flag.
    pub async fn metadata(&self, id: &FileId) -> SealdropResult<ShareMetadata> {
        let data = self.read(&self.meta_path(id), id).await?;
        serde_json::from_slice(&data)
            .map_err(|e| SealdropError::Storage(format!("corrupt metadata for {id}: {e}")))
    }

    /// Envelope fetch. The stored record is validated before anything is
    /// returned.
    pub async fn fetch_envelope(&self, id: &FileId) -> SealdropResult<EnvelopeResponse> {
        let data = self.read(&self.envelope_path(id), id).await?;
        let envelope = ShareEnvelope::from_bytes(&data)?;
        debug!(file_id = %id, key_mode = %envelope.key_mode(), "fetched share envelope");
        Ok(envelope.to_response())
    }

    /// True once the share resolves, i.e. its metadata exists.
    pub async fn exists(&self, id: &FileId) -> SealdropResult<bool> {
        self.object_exists(&self.meta_path(id)).await
    }

    /// Remove a share. Metadata goes first so the share stops resolving
    /// before its ciphertext disappears.
    ///
    /// A share counts as present while either object remains, so a delete
    /// that failed halfway can be retried until the envelope is gone.
    pub async fn delete(&self, id: &FileId) -> SealdropResult<()> {
        let meta_path = self.meta_path(id);
        let envelope_path = self.envelope_path(id);
        if !self.object_exists(&meta_path).await? && !self.object_exists(&envelope_path).await? {
            return Err(SealdropError::NotFound(id.to_string()));
        }
        self.delete_object(&meta_path).await?;
        self.delete_object(&envelope_path).await?;
        info!(file_id = %id, "deleted share");
        Ok(())
    }

    async fn object_exists(&self, path: &str) -> SealdropResult<bool> {
        match self.op.stat(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_object(&self, path: &str) -> SealdropResult<()> {
        match self.op.delete(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn read(&self, path: &str, id: &FileId) -> SealdropResult<Vec<u8>> {
        match self.op.read(path).await {
            Ok(buf) => Ok(buf.to_vec()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(SealdropError::NotFound(id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn envelope_path(&self, id: &FileId) -> String {
        self.object_path("envelopes", id)
    }

    fn meta_path(&self, id: &FileId) -> String {
        self.object_path("meta", id)
    }

    fn object_path(&self, kind: &str, id: &FileId) -> String {
        if self.prefix.is_empty() {
            format!("{kind}/{id}.json")
        } else {
            format!("{}/{kind}/{id}.json", self.prefix)
        }
    }
}
