//! Keyed conversation collection with a newest-first ordered view.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::ConversationEntry;

/// On-disk shape: `{ "entries": [...] }`, newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionDocument {
    pub entries: Vec<ConversationEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "CollectionDocument", try_from = "CollectionDocument")]
pub struct Collection {
    entries: HashMap<String, ConversationEntry>,
    order: Vec<String>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a newest-first list. Fails on the first repeated id.
    pub fn from_entries(entries: Vec<ConversationEntry>) -> Result<Self, String> {
        let mut collection = Self::new();
        // Entries arrive newest first, so append instead of prepend.
        for entry in entries {
            let id = entry.id().to_string();
            if collection.entries.contains_key(&id) {
                return Err(id);
            }
            collection.order.push(id.clone());
            collection.entries.insert(id, entry);
        }
        Ok(collection)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&ConversationEntry> {
        self.entries.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut ConversationEntry> {
        self.entries.get_mut(id)
    }

    /// Insert as the newest entry. Returns `false` if the id is already present.
    pub fn push_front(&mut self, entry: ConversationEntry) -> bool {
        if self.entries.contains_key(entry.id()) {
            return false;
        }
        let id = entry.id().to_string();
        self.order.insert(0, id.clone());
        self.entries.insert(id, entry);
        true
    }

    /// Insert as the oldest entry. Returns `false` if the id is already present.
    pub(crate) fn push_back(&mut self, entry: ConversationEntry) -> bool {
        if self.entries.contains_key(entry.id()) {
            return false;
        }
        let id = entry.id().to_string();
        self.order.push(id.clone());
        self.entries.insert(id, entry);
        true
    }

    pub fn remove(&mut self, id: &str) -> Option<ConversationEntry> {
        let entry = self.entries.remove(id)?;
        self.order.retain(|existing| existing != id);
        Some(entry)
    }

    /// Keep only entries matching `keep`; returns how many were dropped.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&ConversationEntry) -> bool,
    {
        let before = self.order.len();
        let entries = &mut self.entries;
        self.order.retain(|id| {
            let kept = entries.get(id).is_some_and(|entry| keep(entry));
            if !kept {
                entries.remove(id);
            }
            kept
        });
        before - self.order.len()
    }

    /// Entries newest first.
    pub fn iter(&self) -> impl Iterator<Item = &ConversationEntry> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    pub fn ids(&self) -> &[String] {
        &self.order
    }

    pub fn into_entries(mut self) -> Vec<ConversationEntry> {
        self.order
            .iter()
            .filter_map(|id| self.entries.remove(id))
            .collect()
    }
}

impl From<Collection> for CollectionDocument {
    fn from(collection: Collection) -> Self {
        Self {
            entries: collection.into_entries(),
        }
    }
}

impl TryFrom<CollectionDocument> for Collection {
    type Error = String;

    fn try_from(document: CollectionDocument) -> Result<Self, Self::Error> {
        Self::from_entries(document.entries).map_err(|id| format!("duplicate entry id '{id}'"))
    }
}
