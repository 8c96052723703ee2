//! Recipient-side share access flow
//!
//! ```text
//! Requested
//!   └─ metadata_fetched ─► MetadataFetched{key_mode}
//!        ├─ password_entered ─► PasswordPrompted ─ envelope_fetched ─► EnvelopeFetched
//!        └─ envelope_fetched (keyless) ───────────────────────────────► EnvelopeFetched
//! EnvelopeFetched ─ decrypt ─► Succeeded | Failed
//! ```
//!
//! The key mode is read once from metadata and cannot change afterwards.
//! `Succeeded` and `Failed` are terminal; a retry is a new [`ShareAccess`].
//! Any error raised by a legal event moves the flow to `Failed`.

use secrecy::SecretString;

use crate::decrypt::DecryptionService;
use crate::envelope::{EnvelopeResponse, KeyMode, ShareEnvelope, ShareMetadata};
use crate::error::{CryptoError, CryptoResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessState {
    Requested,
    MetadataFetched(KeyMode),
    PasswordPrompted,
    EnvelopeFetched,
    Succeeded,
    Failed,
}

impl AccessState {
    pub fn is_terminal(self) -> bool {
        matches!(self, AccessState::Succeeded | AccessState::Failed)
    }

    fn name(self) -> &'static str {
        match self {
            AccessState::Requested => "requested",
            AccessState::MetadataFetched(_) => "metadata fetched",
            AccessState::PasswordPrompted => "password prompted",
            AccessState::EnvelopeFetched => "envelope fetched",
            AccessState::Succeeded => "succeeded",
            AccessState::Failed => "failed",
        }
    }
}

/// One attempt at opening a share.
#[derive(Debug)]
pub struct ShareAccess {
    state: AccessState,
    metadata: Option<ShareMetadata>,
    password: Option<SecretString>,
    envelope: Option<ShareEnvelope>,
}

impl Default for ShareAccess {
    fn default() -> Self {
        Self::new()
    }
}

impl ShareAccess {
    pub fn new() -> Self {
        Self {
            state: AccessState::Requested,
            metadata: None,
            password: None,
            envelope: None,
        }
    }

    pub fn state(&self) -> AccessState {
        self.state
    }

    pub fn metadata(&self) -> Option<&ShareMetadata> {
        self.metadata.as_ref()
    }

    /// True once metadata says the share is protected and no password has
    /// been entered yet.
    pub fn needs_password(&self) -> bool {
        self.state == AccessState::MetadataFetched(KeyMode::PasswordDerived)
    }

    /// Record the metadata fetch. Fixes the key mode for the rest of the flow.
    pub fn metadata_fetched(&mut self, metadata: ShareMetadata) -> CryptoResult<KeyMode> {
        self.require(
            self.state == AccessState::Requested,
            "accept metadata",
        )?;
        let mode = metadata.key_mode();
        self.metadata = Some(metadata);
        self.state = AccessState::MetadataFetched(mode);
        Ok(mode)
    }

    /// Record the password typed by the recipient. Only legal for
    /// password-protected shares, before the envelope is fetched.
    pub fn password_entered(&mut self, password: SecretString) -> CryptoResult<()> {
        self.require(self.needs_password(), "accept a password")?;
        self.password = Some(password);
        self.state = AccessState::PasswordPrompted;
        Ok(())
    }

    /// Record the envelope fetch and check its shape against the key mode.
    pub fn envelope_fetched(&mut self, response: &EnvelopeResponse) -> CryptoResult<()> {
        let ready = matches!(
            self.state,
            AccessState::PasswordPrompted | AccessState::MetadataFetched(KeyMode::RandomKey)
        );
        self.require(ready, "accept an envelope")?;

        let metadata = self
            .metadata
            .as_ref()
            .ok_or(CryptoError::InvalidTransition {
                state: self.state.name(),
                event: "accept an envelope",
            })?;

        match ShareEnvelope::from_response(metadata, response) {
            Ok(envelope) => {
                self.envelope = Some(envelope);
                self.state = AccessState::EnvelopeFetched;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Decrypt the fetched envelope. Key material and the password are
    /// dropped whatever the outcome.
    pub fn decrypt(&mut self, service: &DecryptionService) -> CryptoResult<Vec<u8>> {
        self.require(self.state == AccessState::EnvelopeFetched, "decrypt")?;

        let envelope = self.envelope.take();
        let password = self.password.take();
        let result = match envelope.as_ref() {
            Some(envelope) => service.open(envelope, password.as_ref()),
            None => Err(CryptoError::InvalidTransition {
                state: self.state.name(),
                event: "decrypt",
            }),
        };

        match result {
            Ok(plaintext) => {
                self.state = AccessState::Succeeded;
                Ok(plaintext)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn require(&self, legal: bool, event: &'static str) -> CryptoResult<()> {
        if legal {
            Ok(())
        } else {
            Err(CryptoError::InvalidTransition {
                state: self.state.name(),
                event,
            })
        }
    }

    fn fail(&mut self, err: CryptoError) -> CryptoError {
        self.state = AccessState::Failed;
        self.password = None;
        self.envelope = None;
        err
    }
}
