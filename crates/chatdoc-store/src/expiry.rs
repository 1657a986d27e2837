//! Calendar-day retention for unprotected conversations.
//!
//! An entry expires once the local calendar day it was created on is over,
//! no matter how little time has passed: an upload at 23:59 is gone at
//! midnight. Protected entries never expire.

use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};

use crate::collection::Collection;
use crate::error::WriteOutcome;
use crate::types::ConversationEntry;

pub const EXPIRY_NOTICE: &str = "Will be auto-deleted at midnight";

/// Outcome of one sweep against the persisted collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepResult {
    pub removed: usize,
    pub remaining: usize,
    pub outcome: WriteOutcome,
}

/// Local calendar day an entry was created on.
pub fn created_day(entry: &ConversationEntry) -> NaiveDate {
    entry.created_at().with_timezone(&Local).date_naive()
}

pub fn is_expired(entry: &ConversationEntry, today: NaiveDate) -> bool {
    !entry.is_protected() && created_day(entry) < today
}

/// Copy of `collection` without expired entries, plus how many were dropped.
pub fn sweep(collection: &Collection, today: NaiveDate) -> (Collection, usize) {
    let mut kept = collection.clone();
    let removed = sweep_in_place(&mut kept, today);
    (kept, removed)
}

pub(crate) fn sweep_in_place(collection: &mut Collection, today: NaiveDate) -> usize {
    collection.retain(|entry| !is_expired(entry, today))
}

pub fn expired_count(collection: &Collection, today: NaiveDate) -> usize {
    collection
        .iter()
        .filter(|entry| is_expired(entry, today))
        .count()
}

/// Warning shown next to an unprotected entry that is not from today.
pub fn expiry_notice(entry: &ConversationEntry, today: NaiveDate) -> Option<&'static str> {
    if entry.is_protected() || created_day(entry) == today {
        None
    } else {
        Some(EXPIRY_NOTICE)
    }
}

/// Short human label for when an entry was created, relative to `today`.
pub fn relative_day(created_at: DateTime<Utc>, today: NaiveDate) -> String {
    let day = created_at.with_timezone(&Local).date_naive();
    let diff = (day - today).num_days();

    match diff {
        0 => "Today".to_string(),
        -1 => "Yesterday".to_string(),
        d if d > -7 => format!("{} days ago", d.abs()),
        _ if day.year() != today.year() => day.format("%b %-d, %Y").to_string(),
        _ => day.format("%b %-d").to_string(),
    }
}
