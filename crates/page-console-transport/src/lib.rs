//! Transport layer for the page console.
//!
//! Provides:
//! - Wire protocol (type-tagged JSON)
//! - `ChannelPeer`, the session-facing end of a connection
//! - WebSocket transport (feature: websocket)

pub mod peer;
pub mod protocol;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use peer::ChannelPeer;
pub use protocol::{ClientMessage, ProtocolError, ServerMessage};
