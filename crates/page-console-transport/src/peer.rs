//! Console peer that forwards session callbacks onto a connection's outbound
//! channel.

use page_console_core::{ConsolePeer, MessageBatch};
use tokio::sync::mpsc;

use crate::protocol::ServerMessage;

/// Session-side view of one connected client.
///
/// Sends never block the session thread; messages for a client that has
/// gone away are dropped.
#[derive(Debug, Clone)]
pub struct ChannelPeer {
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ChannelPeer {
    #[must_use]
    pub const fn new(tx: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self { tx }
    }

    fn send(&self, message: ServerMessage) {
        if self.tx.send(message).is_err() {
            tracing::debug!("console peer channel closed; dropping message");
        }
    }
}

impl ConsolePeer for ChannelPeer {
    fn did_output_message(&self, index: usize) {
        self.send(ServerMessage::DidOutputMessage { index });
    }

    fn did_get_messages(&self, batch: MessageBatch) {
        self.send(batch.into());
    }

    fn did_misbehave(&self, reason: &str) {
        self.send(ServerMessage::DidMisbehave {
            reason: reason.to_string(),
        });
    }
}
