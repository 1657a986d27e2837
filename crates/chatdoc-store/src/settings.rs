use std::sync::Arc;

use crate::error::WriteOutcome;
use crate::substrate::Substrate;

pub const DEFAULT_API_BASE_URL: &str = "https://chatdoc-main-4df34c0.d2.zuplo.dev";

/// Base URL of the remote document service, overridable by the user.
pub struct Settings {
    substrate: Arc<dyn Substrate>,
    key: String,
}

impl Settings {
    pub fn new(substrate: Arc<dyn Substrate>, key: impl Into<String>) -> Self {
        Self {
            substrate,
            key: key.into(),
        }
    }

    pub fn api_base_url(&self) -> String {
        let stored = match self.substrate.read(&self.key) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "failed to read API base URL");
                None
            }
        };

        stored
            .and_then(|raw| serde_json::from_str::<String>(&raw).ok())
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
    }

    pub fn set_api_base_url(&self, url: &str) -> WriteOutcome {
        let serialized = match serde_json::to_string(url.trim()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "failed to serialize API base URL");
                return WriteOutcome::NotDurable;
            }
        };

        match self.substrate.write(&self.key, &serialized) {
            Ok(()) => WriteOutcome::Written,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "failed to save API base URL");
                WriteOutcome::NotDurable
            }
        }
    }

    /// Forget the override and go back to the default URL.
    pub fn reset(&self) -> WriteOutcome {
        match self.substrate.delete(&self.key) {
            Ok(()) => WriteOutcome::Written,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "failed to reset API base URL");
                WriteOutcome::NotDurable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::substrate::MemorySubstrate;

    fn settings() -> Settings {
        Settings::new(Arc::new(MemorySubstrate::new()), "apiBaseUrl")
    }

    #[test]
    fn test_default_url() {
        assert_eq!(settings().api_base_url(), DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_set_and_reset() {
        let settings = settings();
        let _ = settings.set_api_base_url(" http://localhost:8000 ");
        assert_eq!(settings.api_base_url(), "http://localhost:8000");

        let _ = settings.reset();
        assert_eq!(settings.api_base_url(), DEFAULT_API_BASE_URL);
    }
}
