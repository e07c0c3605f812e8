//! Wire protocol between the console front end and the server.

use page_console_core::MessageBatch;
use serde::{Deserialize, Serialize};

/// Protocol decode/encode error.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Invalid message: {0}")]
    Json(#[from] serde_json::Error),
}

/// Message from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Evaluate console input.
    SubmitScript { source: String },
    /// Pull entries from `start_index` on.
    GetMessages { start_index: usize },
    /// Ping for keepalive.
    Ping,
}

impl ClientMessage {
    /// Decode a text frame.
    ///
    /// # Errors
    /// Returns error if the frame is not a known client message.
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Message from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The connection is now the session's peer.
    Attached { session_id: String },
    /// A new entry exists at `index`.
    DidOutputMessage { index: usize },
    /// Reply to a pull.
    DidGetMessages {
        start_index: usize,
        message_types: Vec<String>,
        messages: Vec<String>,
    },
    /// The client broke the sync protocol.
    DidMisbehave { reason: String },
    /// Error message.
    Error { message: String },
    /// Pong response.
    Pong,
}

impl ServerMessage {
    /// Encode as a text frame.
    ///
    /// # Errors
    /// Returns error if serialization fails.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl From<MessageBatch> for ServerMessage {
    fn from(batch: MessageBatch) -> Self {
        Self::DidGetMessages {
            start_index: batch.start_index,
            message_types: batch.message_types,
            messages: batch.messages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_tags() {
        let msg = ClientMessage::from_json(r#"{"type":"get_messages","start_index":4}"#).unwrap();
        assert_eq!(msg, ClientMessage::GetMessages { start_index: 4 });

        let msg = ClientMessage::from_json(r#"{"type":"submit_script","source":"1+1"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::SubmitScript {
                source: "1+1".into()
            }
        );
    }

    #[test]
    fn test_unknown_message_rejected() {
        let err = ClientMessage::from_json(r#"{"type":"resize","cols":80}"#).unwrap_err();
        assert!(err.to_string().starts_with("Invalid message"));
    }

    #[test]
    fn test_batch_reply_shape() {
        let batch = MessageBatch {
            start_index: 2,
            message_types: vec!["html".into(), "groupEnd".into()],
            messages: vec!["<b>x</b>".into(), String::new()],
        };
        let json = ServerMessage::from(batch).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["type"], "did_get_messages");
        assert_eq!(value["start_index"], 2);
        assert_eq!(value["message_types"][1], "groupEnd");
        assert_eq!(value["messages"][0], "<b>x</b>");
    }
}
