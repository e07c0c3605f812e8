//! Append-only, index-addressable console message log.

use crate::entry::Entry;

/// Ordered history of console output.
///
/// Entries are never removed or rewritten: an entry's index is the log
/// length at the moment it was appended, and clearing the console is itself
/// an appended entry.
#[derive(Debug, Default)]
pub struct MessageLog {
    history: Vec<Entry>,
    total_bytes: usize,
}

impl MessageLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            history: Vec::with_capacity(32),
            total_bytes: 0,
        }
    }

    /// Append an entry and return its index.
    pub fn append(&mut self, entry: Entry) -> usize {
        let index = self.history.len();
        self.total_bytes = self.total_bytes.saturating_add(entry.approx_bytes());
        tracing::debug!(
            index,
            kind = entry.kind().label(),
            total_bytes = self.total_bytes,
            "appended console message"
        );
        self.history.push(entry);
        index
    }

    /// Append a clear marker. Earlier entries stay in the log.
    pub fn clear(&mut self) -> usize {
        self.append(Entry::clear())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.history.get(index)
    }

    /// Entries `[start, end)`, clamped to the log.
    #[must_use]
    pub fn slice(&self, start: usize, end: usize) -> &[Entry] {
        let end = end.min(self.history.len());
        let start = start.min(end);
        &self.history[start..end]
    }
}
