//! Portable backup of the whole conversation history.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::collection::Collection;
use crate::error::{ImportError, Result};
use crate::types::ConversationEntry;

/// Pretty-printed JSON of the collection, the same shape it is persisted in.
pub fn export(collection: &Collection) -> Result<String> {
    Ok(serde_json::to_string_pretty(collection)?)
}

/// Strictly decode an exported document. Either every entry is valid or
/// the whole document is refused.
pub fn decode(text: &str) -> std::result::Result<Collection, ImportError> {
    let document: Value = serde_json::from_str(text).map_err(ImportError::Parse)?;

    let entries = document
        .get("entries")
        .and_then(Value::as_array)
        .ok_or(ImportError::MissingEntries)?;

    let decoded = entries
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            ConversationEntry::deserialize(raw)
                .map_err(|source| ImportError::InvalidEntry { index, source })
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Collection::from_entries(decoded).map_err(ImportError::DuplicateId)
}

/// Suggested file name for an export taken on `today`.
pub fn export_file_name(today: NaiveDate) -> String {
    format!("chatdoc-history-{}.json", today.format("%Y-%m-%d"))
}
