//! Flattened, time-ordered view of every post in a thread.
//!
//! Entries are kept sorted by `(timestamp, id)` so colliding timestamps still
//! order deterministically. Readers get an immutable snapshot; an insertion
//! publishes a fresh one instead of mutating what was handed out.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct ChronologicalIndex {
    entries: Vec<(DateTime<Utc>, String)>,
    timestamps: HashMap<String, DateTime<Utc>>,
    snapshot: Arc<[String]>,
}

impl Default for ChronologicalIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn compare(entry: &(DateTime<Utc>, String), timestamp: DateTime<Utc>, id: &str) -> Ordering {
    entry
        .0
        .cmp(&timestamp)
        .then_with(|| entry.1.as_str().cmp(id))
}

impl ChronologicalIndex {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            timestamps: HashMap::new(),
            snapshot: Arc::from(Vec::<String>::new()),
        }
    }

    /// Places each id at its `(timestamp, id)` position, moving it if it was
    /// previously indexed under another timestamp. Returns whether the order
    /// changed.
    pub fn notify_inserted<I, S>(&mut self, items: I) -> bool
    where
        I: IntoIterator<Item = (S, DateTime<Utc>)>,
        S: AsRef<str>,
    {
        let mut changed = false;
        for (id, timestamp) in items {
            changed |= self.place(id.as_ref(), timestamp);
        }
        if changed {
            self.snapshot = self.entries.iter().map(|(_, id)| id.clone()).collect();
        }
        changed
    }

    fn place(&mut self, id: &str, timestamp: DateTime<Utc>) -> bool {
        if let Some(previous) = self.timestamps.get(id).copied() {
            if previous == timestamp {
                return false;
            }
            if let Ok(pos) = self
                .entries
                .binary_search_by(|entry| compare(entry, previous, id))
            {
                self.entries.remove(pos);
            }
        }

        let pos = match self
            .entries
            .binary_search_by(|entry| compare(entry, timestamp, id))
        {
            Ok(pos) | Err(pos) => pos,
        };
        self.entries.insert(pos, (timestamp, id.to_string()));
        self.timestamps.insert(id.to_string(), timestamp);
        true
    }

    pub fn sequence(&self) -> Arc<[String]> {
        Arc::clone(&self.snapshot)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        let timestamp = *self.timestamps.get(id)?;
        self.entries
            .binary_search_by(|entry| compare(entry, timestamp, id))
            .ok()
    }

    pub fn get(&self, position: usize) -> Option<&str> {
        self.entries.get(position).map(|(_, id)| id.as_str())
    }

    pub fn first(&self) -> Option<&str> {
        self.get(0)
    }

    pub fn last(&self) -> Option<&str> {
        self.entries.last().map(|(_, id)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
