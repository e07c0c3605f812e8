//! Channel front end for a console session.
//!
//! The session is single-threaded: it lives on one blocking task and drains
//! commands in order, so every index is assigned on that task and a pull only
//! observes appends that have fully completed.

use std::sync::Arc;

use page_console_core::{ConsolePeer, Interpreter, MessageBatch, SyncError};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use uuid::Uuid;

use crate::{config::ConsoleConfig, console::ConsoleSession};

/// Console handle error.
#[derive(Debug, thiserror::Error)]
pub enum HandleError {
    #[error("Console session has stopped")]
    Closed,
    #[error("Console session dropped the reply")]
    NoReply(#[from] oneshot::error::RecvError),
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),
}

type PullReply = oneshot::Sender<Result<MessageBatch, SyncError>>;

/// Work for the session task.
enum Command {
    SubmitScript { source: String },
    /// With a reply channel the result goes back to the caller; without one it
    /// goes to the attached peer.
    GetMessages {
        start_index: usize,
        reply: Option<PullReply>,
    },
    AttachPeer(Arc<dyn ConsolePeer>),
    DetachPeer(Arc<dyn ConsolePeer>),
    Shutdown,
}

/// Cloneable handle to a running console session.
#[derive(Debug, Clone)]
pub struct ConsoleHandle {
    session_id: Uuid,
    commands: mpsc::Sender<Command>,
}

impl ConsoleHandle {
    /// Start a session for `interpreter` on a dedicated blocking task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<I>(interpreter: I, config: &ConsoleConfig) -> (Self, JoinHandle<()>)
    where
        I: Interpreter + 'static,
    {
        let session = ConsoleSession::with_config(interpreter, config);
        let session_id = session.id();
        let (commands, rx) = mpsc::channel(config.channel_capacity());

        let task = tokio::task::spawn_blocking(move || run_session(session, rx));
        tracing::info!(%session_id, "console session started");

        (
            Self {
                session_id,
                commands,
            },
            task,
        )
    }

    #[must_use]
    pub const fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Whether the session task has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn send(&self, command: Command) -> Result<(), HandleError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| HandleError::Closed)
    }

    /// Queue console input for evaluation.
    ///
    /// # Errors
    /// Returns [`HandleError::Closed`] if the session has stopped.
    pub async fn submit_script(&self, source: impl Into<String>) -> Result<(), HandleError> {
        self.send(Command::SubmitScript {
            source: source.into(),
        })
        .await
    }

    /// Pull entries from `start_index` and wait for the batch.
    ///
    /// # Errors
    /// Returns [`HandleError::Sync`] for a non-existent start index, or a
    /// channel error if the session has stopped.
    pub async fn get_messages(&self, start_index: usize) -> Result<MessageBatch, HandleError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::GetMessages {
            start_index,
            reply: Some(reply),
        })
        .await?;
        Ok(rx.await??)
    }

    /// Pull entries on behalf of the attached peer. The batch, or a
    /// misbehavior report, is delivered through the peer.
    ///
    /// # Errors
    /// Returns [`HandleError::Closed`] if the session has stopped.
    pub async fn request_messages(&self, start_index: usize) -> Result<(), HandleError> {
        self.send(Command::GetMessages {
            start_index,
            reply: None,
        })
        .await
    }

    /// # Errors
    /// Returns [`HandleError::Closed`] if the session has stopped.
    pub async fn attach_peer(&self, peer: Arc<dyn ConsolePeer>) -> Result<(), HandleError> {
        self.send(Command::AttachPeer(peer)).await
    }

    /// Detach `peer`, unless a newer peer has replaced it since.
    ///
    /// # Errors
    /// Returns [`HandleError::Closed`] if the session has stopped.
    pub async fn detach_peer(&self, peer: Arc<dyn ConsolePeer>) -> Result<(), HandleError> {
        self.send(Command::DetachPeer(peer)).await
    }

    /// Stop the session after the commands already queued.
    ///
    /// # Errors
    /// Returns [`HandleError::Closed`] if the session has already stopped.
    pub async fn shutdown(&self) -> Result<(), HandleError> {
        self.send(Command::Shutdown).await
    }
}

fn run_session<I: Interpreter>(mut session: ConsoleSession<I>, mut rx: mpsc::Receiver<Command>) {
    while let Some(command) = rx.blocking_recv() {
        match command {
            Command::SubmitScript { source } => {
                session.handle_input(&source);
            }
            Command::GetMessages {
                start_index,
                reply: Some(reply),
            } => {
                let _ = reply.send(session.get_messages(start_index));
            }
            Command::GetMessages {
                start_index,
                reply: None,
            } => session.send_messages(start_index),
            Command::AttachPeer(peer) => session.attach_peer(peer),
            Command::DetachPeer(peer) => session.detach_peer(&peer),
            Command::Shutdown => break,
        }
    }
    tracing::info!(session_id = %session.id(), entries = session.log().len(), "console session stopped");
}
