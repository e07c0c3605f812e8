//! Index-based replication of the message log to a remote peer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::message_log::MessageLog;

/// Entries `[start_index, len)` as two index-aligned sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBatch {
    pub start_index: usize,
    pub message_types: Vec<String>,
    pub messages: Vec<String>,
}

impl MessageBatch {
    #[must_use]
    pub fn empty(start_index: usize) -> Self {
        Self {
            start_index,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// A pull the log could never legitimately answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("Requested non-existent console message index.")]
    NonexistentIndex { start_index: usize, len: usize },
}

/// Answer a pull starting at `start_index`.
///
/// Requesting index 0 from an empty log is the peer's bootstrap request and
/// yields an empty batch. Any other start at or past the end of the log is
/// protocol misuse. The batch is not capped.
///
/// # Errors
/// Returns [`SyncError::NonexistentIndex`] for a non-zero start past the end.
pub fn get_messages(log: &MessageLog, start_index: usize) -> Result<MessageBatch, SyncError> {
    let len = log.len();
    let count = len.saturating_sub(start_index);
    if count < 1 {
        if start_index != 0 {
            return Err(SyncError::NonexistentIndex { start_index, len });
        }
        return Ok(MessageBatch::empty(start_index));
    }

    let mut message_types = Vec::with_capacity(count);
    let mut messages = Vec::with_capacity(count);
    for entry in log.slice(start_index, len) {
        message_types.push(entry.kind().label().to_string());
        messages.push(entry.payload().to_string());
    }

    Ok(MessageBatch {
        start_index,
        message_types,
        messages,
    })
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::entry::Entry;

    #[test]
    fn test_bootstrap_on_empty_log() {
        let log = MessageLog::new();
        let batch = assert_ok!(get_messages(&log, 0));
        assert!(batch.is_empty());
        assert!(batch.message_types.is_empty());
        assert_eq!(batch.start_index, 0);
    }

    #[test]
    fn test_start_past_end_is_misuse() {
        let mut log = MessageLog::new();
        log.append(Entry::html("a"));

        let err = assert_err!(get_messages(&log, 1));
        assert_eq!(err, SyncError::NonexistentIndex { start_index: 1, len: 1 });
        assert_eq!(err.to_string(), "Requested non-existent console message index.");
        assert_err!(get_messages(&MessageLog::new(), 3));
    }

    #[test]
    fn test_batch_is_index_aligned() {
        let mut log = MessageLog::new();
        log.append(Entry::html("one"));
        log.append(Entry::begin_group("g", false));
        log.append(Entry::end_group());
        log.clear();

        let batch = assert_ok!(get_messages(&log, 1));
        assert_eq!(batch.start_index, 1);
        assert_eq!(batch.message_types, vec!["groupCollapsed", "groupEnd", "clear"]);
        assert_eq!(batch.messages, vec!["g", "", ""]);
    }

    #[test]
    fn test_batch_wire_shape() {
        let batch = MessageBatch {
            start_index: 2,
            message_types: vec!["html".into()],
            messages: vec!["<b>x</b>".into()],
        };
        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json["start_index"], 2);
        assert_eq!(json["message_types"][0], "html");
    }
}
