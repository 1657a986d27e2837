use chrono::NaiveDate;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::collection::Collection;
use crate::error::{ImportError, Result, WriteOutcome};
use crate::expiry::{self, SweepResult};
use crate::substrate::Substrate;
use crate::transfer;
use crate::types::{ConversationEntry, EntryPatch, Message};

/// Persisted collection of conversation entries.
///
/// Every mutation is load → change → save under one lock, so in-process
/// callers and the expiry sweep never lose each other's writes. Other
/// processes sharing the same substrate are last-writer-wins.
///
/// Stored text that only partly decodes is copied to [`RecordStore::corrupt_key`]
/// before the first write replaces it.
pub struct RecordStore {
    substrate: Arc<dyn Substrate>,
    key: String,
    write_lock: Mutex<()>,
}

/// What a read of the history key produced.
enum Snapshot {
    Clean(Collection),
    /// Some or all of `raw` could not be decoded; `collection` is what survived.
    Damaged { collection: Collection, raw: String },
    Unreadable,
}

impl RecordStore {
    pub fn new(substrate: Arc<dyn Substrate>, key: impl Into<String>) -> Self {
        Self {
            substrate,
            key: key.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Where undecodable history is kept aside.
    pub fn corrupt_key(&self) -> String {
        format!("{}.corrupt", self.key)
    }

    /// Read the persisted collection. Missing or unreadable data yields an
    /// empty collection; malformed or repeated entries are skipped.
    pub fn load(&self) -> Collection {
        match self.snapshot() {
            Snapshot::Clean(collection) | Snapshot::Damaged { collection, .. } => collection,
            Snapshot::Unreadable => Collection::new(),
        }
    }

    fn snapshot(&self) -> Snapshot {
        match self.substrate.read(&self.key) {
            Ok(Some(raw)) => self.decode_stored(raw),
            Ok(None) => Snapshot::Clean(Collection::new()),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "failed to read conversation history");
                Snapshot::Unreadable
            }
        }
    }

    /// Decode entry by entry, keeping every entry that is valid on its own.
    fn decode_stored(&self, raw: String) -> Snapshot {
        let document: Value = match serde_json::from_str(&raw) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "stored conversation history is malformed, treating as empty");
                return Snapshot::Damaged {
                    collection: Collection::new(),
                    raw,
                };
            }
        };

        let Some(entries) = document.get("entries").and_then(Value::as_array) else {
            tracing::warn!(key = %self.key, "stored conversation history has no entries array, treating as empty");
            return Snapshot::Damaged {
                collection: Collection::new(),
                raw,
            };
        };

        let mut collection = Collection::new();
        let mut skipped = 0;
        for (index, value) in entries.iter().enumerate() {
            match ConversationEntry::deserialize(value) {
                Ok(entry) => {
                    let id = entry.id().to_string();
                    if !collection.push_back(entry) {
                        tracing::warn!(key = %self.key, index, id = %id, "repeated entry id in stored history, skipping");
                        skipped += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!(key = %self.key, index, error = %e, "malformed entry in stored history, skipping");
                    skipped += 1;
                }
            }
        }

        if skipped == 0 {
            Snapshot::Clean(collection)
        } else {
            Snapshot::Damaged { collection, raw }
        }
    }

    /// Copy damaged stored text aside so a rewrite never destroys it.
    fn preserve(&self, raw: &str) -> Result<()> {
        let corrupt_key = self.corrupt_key();
        self.substrate.write(&corrupt_key, raw)?;
        tracing::warn!(key = %self.key, copy = %corrupt_key, "kept a copy of the damaged conversation history");
        Ok(())
    }

    pub fn save(&self, collection: &Collection) -> WriteOutcome {
        let _guard = self.write_lock.lock();
        self.write(collection)
    }

    fn write(&self, collection: &Collection) -> WriteOutcome {
        let serialized = match serde_json::to_string(collection) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "failed to serialize conversation history");
                return WriteOutcome::NotDurable;
            }
        };

        match self.substrate.write(&self.key, &serialized) {
            Ok(()) => WriteOutcome::Written,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "failed to save conversation history");
                WriteOutcome::NotDurable
            }
        }
    }

    /// Apply `change` to the current collection and persist it if it
    /// reports a modification. Stored data that could not be read, or could
    /// not be copied aside, is never overwritten.
    fn mutate<R>(&self, change: impl FnOnce(&mut Collection) -> (bool, R)) -> (WriteOutcome, R) {
        let _guard = self.write_lock.lock();
        let (mut collection, damaged) = match self.snapshot() {
            Snapshot::Clean(collection) => (collection, None),
            Snapshot::Damaged { collection, raw } => (collection, Some(raw)),
            Snapshot::Unreadable => {
                let (changed, result) = change(&mut Collection::new());
                let outcome = if changed {
                    WriteOutcome::NotDurable
                } else {
                    WriteOutcome::Unchanged
                };
                return (outcome, result);
            }
        };

        let (changed, result) = change(&mut collection);
        if !changed {
            return (WriteOutcome::Unchanged, result);
        }

        if let Some(raw) = damaged {
            if let Err(e) = self.preserve(&raw) {
                tracing::warn!(key = %self.key, error = %e, "could not keep a copy of the damaged history, leaving it in place");
                return (WriteOutcome::NotDurable, result);
            }
        }

        (self.write(&collection), result)
    }

    /// Add a new entry as the most recent one. A repeated id is refused.
    pub fn insert(&self, entry: ConversationEntry) -> WriteOutcome {
        let id = entry.id().to_string();
        let (outcome, inserted) = self.mutate(|c| {
            let inserted = c.push_front(entry);
            (inserted, inserted)
        });
        if !inserted {
            tracing::warn!(id = %id, "entry id already present, insert ignored");
        }
        outcome
    }

    pub fn update(&self, id: &str, patch: EntryPatch) -> WriteOutcome {
        let (outcome, ()) = self.mutate(|c| match c.get_mut(id) {
            Some(entry) => {
                entry.apply(patch);
                (true, ())
            }
            None => {
                tracing::debug!(id = %id, "update for unknown entry ignored");
                (false, ())
            }
        });
        outcome
    }

    pub fn append_message(&self, id: &str, message: Message) -> WriteOutcome {
        let (outcome, ()) = self.mutate(|c| match c.get_mut(id) {
            Some(entry) => {
                entry.push_turn(message);
                (true, ())
            }
            None => {
                tracing::debug!(id = %id, "message for unknown entry dropped");
                (false, ())
            }
        });
        outcome
    }

    pub fn remove(&self, id: &str) -> WriteOutcome {
        let (outcome, ()) = self.mutate(|c| (c.remove(id).is_some(), ()));
        outcome
    }

    pub fn get(&self, id: &str) -> Option<ConversationEntry> {
        self.load().get(id).cloned()
    }

    /// All entries, newest first.
    pub fn list(&self) -> Vec<ConversationEntry> {
        self.load().into_entries()
    }

    /// Drop every expired entry as of `today` and persist the result.
    pub fn sweep_expired(&self, today: NaiveDate) -> SweepResult {
        let (outcome, (removed, remaining)) = self.mutate(|c| {
            let removed = expiry::sweep_in_place(c, today);
            (removed > 0, (removed, c.len()))
        });

        if removed > 0 {
            tracing::info!(removed, remaining, %today, "expired conversations swept");
        }

        SweepResult {
            removed,
            remaining,
            outcome,
        }
    }

    pub fn expired_count(&self, today: NaiveDate) -> usize {
        expiry::expired_count(&self.load(), today)
    }

    pub fn export(&self) -> Result<String> {
        transfer::export(&self.load())
    }

    /// Replace the whole collection with `text`. Nothing changes on failure.
    pub fn import(&self, text: &str) -> std::result::Result<usize, ImportError> {
        let collection = transfer::decode(text)?;
        let count = collection.len();

        let _guard = self.write_lock.lock();
        if let Snapshot::Damaged { raw, .. } = self.snapshot() {
            self.preserve(&raw).map_err(ImportError::Persist)?;
        }
        let serialized = serde_json::to_string(&collection)
            .map_err(|e| ImportError::Persist(e.into()))?;
        self.substrate
            .write(&self.key, &serialized)
            .map_err(ImportError::Persist)?;

        tracing::info!(entries = count, "conversation history imported");
        Ok(count)
    }
}
