//! Correlation queue: inbound messages awaiting a reviewer's selection.
//!
//! Owned by the relay coordinator task; nothing else touches it. Entries are
//! looked up from the outside by timestamp only, so a later entry with the
//! same timestamp shadows an earlier one. Internally every entry carries an
//! [`EntryId`] so a finished generation attaches to exactly the entry it was
//! started for, or to nothing if that entry is gone.

use serde::Serialize;
use uuid::Uuid;

use ghostwriter_core::{CandidateList, InboundMessage, Timestamp};

/// Identity of one queued entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CorrelationEntry {
    pub id: EntryId,
    pub message: InboundMessage,
    /// Empty until generation finishes.
    pub candidates: Vec<String>,
    pub enqueued_at: Timestamp,
}

impl CorrelationEntry {
    pub fn is_ready(&self) -> bool {
        !self.candidates.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct CorrelationQueue {
    entries: Vec<CorrelationEntry>,
}

impl CorrelationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry for `message`. Duplicate timestamps are accepted.
    pub fn enqueue(&mut self, message: InboundMessage, candidates: Vec<String>) -> EntryId {
        let id = EntryId::new();
        self.entries.push(CorrelationEntry {
            id,
            message,
            candidates,
            enqueued_at: Timestamp::now(),
        });
        id
    }

    /// Append generated candidates to the entry. Returns `false` when the
    /// entry no longer exists.
    pub fn attach_candidates(&mut self, id: EntryId, candidates: CandidateList) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.candidates.extend(candidates.into_inner());
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: EntryId) -> Option<&CorrelationEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Newest entry with this timestamp.
    pub fn find_by_timestamp(&self, timestamp: Timestamp) -> Option<&CorrelationEntry> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.message.timestamp == timestamp)
    }

    /// Newest entry matching both sender and timestamp.
    pub fn find_by_key(&self, timestamp: Timestamp, sender_key: &str) -> Option<&CorrelationEntry> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.message.timestamp == timestamp && e.message.sender_key == sender_key)
    }

    pub fn remove(&mut self, id: EntryId) -> Option<CorrelationEntry> {
        let pos = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(pos))
    }

    /// Remove the entry `find_by_timestamp` would return. No-op if absent.
    pub fn remove_by_timestamp(&mut self, timestamp: Timestamp) -> Option<CorrelationEntry> {
        let pos = self
            .entries
            .iter()
            .rposition(|e| e.message.timestamp == timestamp)?;
        Some(self.entries.remove(pos))
    }

    /// Drop every entry, returning how many there were.
    pub fn clear(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of the pending entries, oldest first.
    pub fn snapshot(&self) -> Vec<CorrelationEntry> {
        self.entries.clone()
    }
}
