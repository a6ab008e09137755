//! Ad-hoc queue: a per-session list of items independent of any playlist

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Queue position {position} out of range (queue has {len} items)")]
    OutOfRange { position: usize, len: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdhocQueue {
    items: Vec<i64>,
}

impl AdhocQueue {
    /// Append an item; returns false if it is already queued
    pub fn append(&mut self, id: i64) -> bool {
        if self.items.contains(&id) {
            return false;
        }
        self.items.push(id);
        true
    }

    /// Remove an item by value; returns false if it was not queued
    pub fn remove(&mut self, id: i64) -> bool {
        let before = self.items.len();
        self.items.retain(|&item| item != id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Item at `position` together with the queue length
    pub fn play_from(&self, position: usize) -> Result<(i64, usize), QueueError> {
        self.items
            .get(position)
            .map(|&id| (id, self.items.len()))
            .ok_or(QueueError::OutOfRange {
                position,
                len: self.items.len(),
            })
    }

    pub fn items(&self) -> &[i64] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
