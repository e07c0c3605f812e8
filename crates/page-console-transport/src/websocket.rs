//! WebSocket transport for the console front end.

use std::sync::Arc;

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use page_console_core::ConsolePeer;
use page_console_session::{ConsoleHandle, HandleError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::{
    peer::ChannelPeer,
    protocol::{ClientMessage, ServerMessage},
};

/// WebSocket handler state.
#[derive(Debug, Clone)]
pub struct WsState {
    /// The console session connections attach to.
    pub console: ConsoleHandle,
}

impl WsState {
    #[must_use]
    pub const fn new(console: ConsoleHandle) -> Self {
        Self { console }
    }
}

/// WebSocket upgrade handler.
///
/// Use this as an Axum route handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WsState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: WsState) {
    let (mut sender, mut receiver) = socket.split();
    let console = state.console;

    // Outbound frames: session callbacks and direct replies share one queue.
    let (tx, rx) = mpsc::unbounded_channel::<ServerMessage>();

    let send_task = tokio::spawn(async move {
        let mut outgoing = UnboundedReceiverStream::new(rx);
        while let Some(msg) = outgoing.next().await {
            let json = match msg.to_json() {
                Ok(j) => j,
                Err(e) => {
                    tracing::error!("Failed to serialize message: {e}");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // The newest connection becomes the session's peer.
    let peer: Arc<dyn ConsolePeer> = Arc::new(ChannelPeer::new(tx.clone()));
    if let Err(e) = console.attach_peer(Arc::clone(&peer)).await {
        tracing::error!("Failed to attach console peer: {e}");
        let _ = tx.send(ServerMessage::Error {
            message: e.to_string(),
        });
        send_task.abort();
        return;
    }
    let _ = tx.send(ServerMessage::Attached {
        session_id: console.session_id().to_string(),
    });

    while let Some(msg) = receiver.next().await {
        let text = match msg {
            Ok(Message::Text(t)) => t.as_str().to_owned(),
            Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                Ok(s) => s,
                Err(_) => continue,
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::error!("WebSocket error: {e}");
                break;
            }
        };

        let client_msg = match ClientMessage::from_json(&text) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Invalid client message: {e}");
                let _ = tx.send(ServerMessage::Error {
                    message: e.to_string(),
                });
                continue;
            }
        };

        if let Err(e) = dispatch(&console, client_msg, &tx).await {
            tracing::error!("Console session unavailable: {e}");
            let _ = tx.send(ServerMessage::Error {
                message: e.to_string(),
            });
            break;
        }
    }

    let _ = console.detach_peer(peer).await;
    send_task.abort();
    tracing::info!(session_id = %console.session_id(), "console client disconnected");
}

async fn dispatch(
    console: &ConsoleHandle,
    msg: ClientMessage,
    tx: &mpsc::UnboundedSender<ServerMessage>,
) -> Result<(), HandleError> {
    match msg {
        ClientMessage::SubmitScript { source } => console.submit_script(source).await,
        // The batch or misbehavior report arrives through the peer.
        ClientMessage::GetMessages { start_index } => console.request_messages(start_index).await,
        ClientMessage::Ping => {
            let _ = tx.send(ServerMessage::Pong);
            Ok(())
        }
    }
}

/// Create WebSocket router.
///
/// # Example
/// ```ignore
/// let app = Router::new()
///     .merge(create_ws_router(console));
/// ```
#[must_use]
pub fn create_ws_router(console: ConsoleHandle) -> axum::Router {
    axum::Router::new()
        .route("/ws", axum::routing::get(ws_handler))
        .with_state(WsState::new(console))
}
