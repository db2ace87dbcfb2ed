//! Chat service trait — the caller-facing surface a transport binds to
//!
//! A transport (RPC, WebSocket, in-process) holds an `Arc<dyn ChatService>`
//! and maps its own failures to `ChatError::Communication`. Delivery
//! problems inside the core never reach the caller; they are logged where
//! they happen.

use crate::coordinator::SessionCoordinator;
use crate::error::Result;
use crate::handle::ClientHandle;
use crate::types::{ClientLocation, DirectoryEntry, EnterOutcome};
use async_trait::async_trait;
use std::sync::Arc;

/// Operations available to chat clients
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Announce a newly connected client
    async fn client_start(&self, client_id: &str) -> Result<()>;

    /// Disconnect a client, eliminating the sessions it created
    async fn client_quit(&self, client_id: &str, handle: Arc<dyn ClientHandle>) -> Result<()>;

    /// Current directory (name, creator)
    async fn get_session_list(&self) -> Result<Vec<DirectoryEntry>>;

    /// Receive directory-change notices
    async fn subscribe(&self, handle: Arc<dyn ClientHandle>) -> Result<()>;

    /// Stop receiving directory-change notices
    async fn unsubscribe(&self, handle: Arc<dyn ClientHandle>) -> Result<()>;

    async fn create_session(&self, name: &str, creator_id: &str) -> Result<()>;

    async fn destroy_session(&self, name: &str) -> Result<()>;

    async fn enter_session(
        &self,
        name: &str,
        client_id: &str,
        handle: Arc<dyn ClientHandle>,
    ) -> Result<EnterOutcome>;

    async fn exit_session(&self, name: &str, client_id: &str) -> Result<()>;

    async fn list_participants(&self, name: &str) -> Result<Vec<String>>;

    /// Send a line; an empty `receiver_id` broadcasts to the whole session
    async fn send_message(
        &self,
        name: &str,
        sender_id: &str,
        receiver_id: &str,
        text: &str,
    ) -> Result<()>;

    async fn find_client(&self, client_id: &str) -> Result<ClientLocation>;
}

#[async_trait]
impl ChatService for SessionCoordinator {
    async fn client_start(&self, client_id: &str) -> Result<()> {
        SessionCoordinator::client_start(self, client_id)
    }

    async fn client_quit(&self, client_id: &str, handle: Arc<dyn ClientHandle>) -> Result<()> {
        SessionCoordinator::client_quit(self, client_id, handle.as_ref()).await
    }

    async fn get_session_list(&self) -> Result<Vec<DirectoryEntry>> {
        SessionCoordinator::get_session_list(self)
    }

    async fn subscribe(&self, handle: Arc<dyn ClientHandle>) -> Result<()> {
        SessionCoordinator::subscribe(self, handle)
    }

    async fn unsubscribe(&self, handle: Arc<dyn ClientHandle>) -> Result<()> {
        SessionCoordinator::unsubscribe(self, handle.as_ref())
    }

    async fn create_session(&self, name: &str, creator_id: &str) -> Result<()> {
        SessionCoordinator::create_session(self, name, creator_id).await
    }

    async fn destroy_session(&self, name: &str) -> Result<()> {
        SessionCoordinator::destroy_session(self, name).await
    }

    async fn enter_session(
        &self,
        name: &str,
        client_id: &str,
        handle: Arc<dyn ClientHandle>,
    ) -> Result<EnterOutcome> {
        SessionCoordinator::enter_session(self, name, client_id, handle).await
    }

    async fn exit_session(&self, name: &str, client_id: &str) -> Result<()> {
        SessionCoordinator::exit_session(self, name, client_id).await
    }

    async fn list_participants(&self, name: &str) -> Result<Vec<String>> {
        SessionCoordinator::list_participants(self, name)
    }

    async fn send_message(
        &self,
        name: &str,
        sender_id: &str,
        receiver_id: &str,
        text: &str,
    ) -> Result<()> {
        SessionCoordinator::send_message(self, name, sender_id, receiver_id, text)
            .await
            .map(|_| ())
    }

    async fn find_client(&self, client_id: &str) -> Result<ClientLocation> {
        SessionCoordinator::find_client(self, client_id)
    }
}
