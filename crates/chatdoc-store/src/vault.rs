use std::sync::Arc;

use crate::error::WriteOutcome;
use crate::substrate::Substrate;
use crate::types::CredentialBundle;

/// Single optional BYOK bundle, stored apart from the conversation history.
///
/// No validation happens here; callers decide whether a bundle is complete
/// enough to protect new entries.
pub struct CredentialVault {
    substrate: Arc<dyn Substrate>,
    key: String,
}

impl CredentialVault {
    pub fn new(substrate: Arc<dyn Substrate>, key: impl Into<String>) -> Self {
        Self {
            substrate,
            key: key.into(),
        }
    }

    pub fn get(&self) -> Option<CredentialBundle> {
        let raw = match self.substrate.read(&self.key) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "failed to read stored credentials");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(bundle) => Some(bundle),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "stored credentials are malformed, ignoring");
                None
            }
        }
    }

    pub fn set(&self, bundle: &CredentialBundle) -> WriteOutcome {
        let serialized = match serde_json::to_string(bundle) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "failed to serialize credentials");
                return WriteOutcome::NotDurable;
            }
        };

        match self.substrate.write(&self.key, &serialized) {
            Ok(()) => WriteOutcome::Written,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "failed to save credentials");
                WriteOutcome::NotDurable
            }
        }
    }

    /// Remove the stored bundle entirely.
    pub fn clear(&self) -> WriteOutcome {
        match self.substrate.delete(&self.key) {
            Ok(()) => WriteOutcome::Written,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "failed to clear credentials");
                WriteOutcome::NotDurable
            }
        }
    }
}
