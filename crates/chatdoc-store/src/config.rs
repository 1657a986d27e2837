use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_history_key")]
    pub history_key: String,

    #[serde(default = "default_credentials_key")]
    pub credentials_key: String,

    #[serde(default = "default_settings_key")]
    pub settings_key: String,

    #[serde(default)]
    pub context: ContextConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            history_key: default_history_key(),
            credentials_key: default_credentials_key(),
            settings_key: default_settings_key(),
            context: ContextConfig::default(),
        }
    }
}

/// Limits for the history block sent along with a new question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Messages included normally (4 exchanges).
    #[serde(default = "default_window")]
    pub window: usize,

    /// Messages included when the normal window is too long.
    #[serde(default = "default_fallback_window")]
    pub fallback_window: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            window: default_window(),
            fallback_window: default_fallback_window(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chatdoc")
}

fn default_history_key() -> String {
    "chatdoc_history".to_string()
}

fn default_credentials_key() -> String {
    "chatdoc_byok_keys".to_string()
}

fn default_settings_key() -> String {
    "apiBaseUrl".to_string()
}

fn default_max_chars() -> usize {
    4000
}

fn default_window() -> usize {
    8
}

fn default_fallback_window() -> usize {
    4
}
