//! Client handle — the push capability the core holds for a connected client
//!
//! The core never manages a client's lifecycle; it only keeps a reference
//! and calls back into it. Each call may fail independently.

use crate::error::{ChatError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Callback target for one connected client
#[async_trait]
pub trait ClientHandle: Send + Sync {
    /// Stable identity of this connection
    ///
    /// Subscriptions are keyed by it, so two handles with the same id are
    /// the same subscriber.
    fn id(&self) -> &str;

    /// Informational popup (directory changes, "participant not exist!")
    async fn notify(&self, text: &str) -> Result<()>;

    /// Append a line to the client's message log
    async fn deliver(&self, text: &str) -> Result<()>;

    /// The client's current session vanished
    async fn session_closed(&self) -> Result<()>;
}

/// A callback as seen by the receiving side of a `ChannelHandle`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ClientEvent {
    Notify { text: String },
    Deliver { text: String },
    SessionClosed,
}

/// In-process handle backed by an unbounded channel
///
/// A transport task owns the receiver and forwards events to the remote
/// client. Once the receiver is dropped every call fails with
/// `ChatError::Delivery`.
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    id: String,
    tx: mpsc::UnboundedSender<ClientEvent>,
}

impl ChannelHandle {
    /// Create a handle with a generated id (`client-<uuid>`)
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        Self::with_id(format!("client-{}", uuid::Uuid::new_v4()))
    }

    /// Create a handle with a caller-chosen id
    pub fn with_id(id: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { id: id.into(), tx }, rx)
    }

    /// Whether the receiving side has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, event: ClientEvent) -> Result<()> {
        self.tx.send(event).map_err(|_| ChatError::Delivery {
            recipient: self.id.clone(),
            reason: "channel closed".to_string(),
        })
    }
}

#[async_trait]
impl ClientHandle for ChannelHandle {
    fn id(&self) -> &str {
        &self.id
    }

    async fn notify(&self, text: &str) -> Result<()> {
        self.send(ClientEvent::Notify {
            text: text.to_string(),
        })
    }

    async fn deliver(&self, text: &str) -> Result<()> {
        self.send(ClientEvent::Deliver {
            text: text.to_string(),
        })
    }

    async fn session_closed(&self) -> Result<()> {
        self.send(ClientEvent::SessionClosed)
    }
}
