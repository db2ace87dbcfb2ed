//! Session (chatroom) — one room's membership and message delivery
//!
//! Each session carries its own lock, so traffic in one room never waits on
//! another. Handle calls are made on a snapshot taken under the lock, after
//! the lock has been released.

use crate::delivery::{fan_out, Delivery, DeliveryReport};
use crate::error::{ChatError, Result};
use crate::handle::ClientHandle;
use crate::message::RECEIVER_ABSENT_NOTICE;
use crate::types::DirectoryEntry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Membership state guarded by the session lock
///
/// `participants` and the keys of `handles` always hold the same ids.
#[derive(Default)]
pub(crate) struct Members {
    participants: Vec<String>,
    handles: HashMap<String, Arc<dyn ClientHandle>>,
    closed: bool,
}

impl Members {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn add(&mut self, client_id: &str, handle: Arc<dyn ClientHandle>) {
        self.participants.push(client_id.to_string());
        self.handles.insert(client_id.to_string(), handle);
    }

    pub(crate) fn remove(&mut self, client_id: &str) -> bool {
        let before = self.participants.len();
        self.participants.retain(|p| p != client_id);
        self.handles.remove(client_id);
        self.participants.len() != before
    }

    pub(crate) fn contains(&self, client_id: &str) -> bool {
        self.handles.contains_key(client_id)
    }

    pub(crate) fn list(&self) -> Vec<String> {
        self.participants.clone()
    }

    /// Handles in participant order
    pub(crate) fn recipients(&self) -> Vec<Arc<dyn ClientHandle>> {
        self.participants
            .iter()
            .filter_map(|id| self.handles.get(id).cloned())
            .collect()
    }

    fn handle(&self, client_id: &str) -> Option<Arc<dyn ClientHandle>> {
        self.handles.get(client_id).cloned()
    }
}

/// A live chat session
pub struct Session {
    name: String,
    creator: String,
    members: Mutex<Members>,
    delivery_timeout: Duration,
}

impl Session {
    /// Create an empty session; the creator is not joined automatically
    pub fn new(
        name: impl Into<String>,
        creator: impl Into<String>,
        delivery_timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            creator: creator.into(),
            members: Mutex::new(Members::default()),
            delivery_timeout,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn creator(&self) -> &str {
        &self.creator
    }

    /// Directory projection of this session
    pub fn entry(&self) -> DirectoryEntry {
        DirectoryEntry::new(&self.name, &self.creator)
    }

    /// Append a participant
    ///
    /// Uniqueness is the caller's job. Fails once the session has been
    /// torn down.
    pub fn add_participant(&self, client_id: &str, handle: Arc<dyn ClientHandle>) -> Result<()> {
        self.with_members(|members| {
            if members.is_closed() {
                return Err(ChatError::SessionNotFound(self.name.clone()));
            }
            members.add(client_id, handle);
            Ok(())
        })
    }

    /// Remove a participant; returns false if it was not present
    pub fn remove_participant(&self, client_id: &str) -> Result<bool> {
        let removed = self.lock()?.remove(client_id);
        if !removed {
            tracing::warn!(
                session = %self.name,
                client = %client_id,
                "Tried to remove a client that is not a participant"
            );
        }
        Ok(removed)
    }

    /// Snapshot of the participant ids in join order
    pub fn list_participants(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.list())
    }

    pub fn contains(&self, client_id: &str) -> Result<bool> {
        Ok(self.lock()?.contains(client_id))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.participants.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.participants.is_empty())
    }

    /// Whether the session has been destroyed or eliminated
    pub fn is_closed(&self) -> Result<bool> {
        Ok(self.lock()?.is_closed())
    }

    /// Deliver `text` to every participant
    pub async fn broadcast(&self, text: &str) -> Result<DeliveryReport> {
        let recipients = self.lock()?.recipients();
        Ok(self
            .deliver_to(&recipients, &Delivery::Message(text.to_string()))
            .await)
    }

    /// Deliver `text` to sender and receiver, or tell the sender the receiver is absent
    pub async fn send_direct(
        &self,
        text: &str,
        sender_id: &str,
        receiver_id: &str,
    ) -> Result<DeliveryReport> {
        let (sender, receiver) = {
            let members = self.lock()?;
            (members.handle(sender_id), members.handle(receiver_id))
        };

        let Some(sender) = sender else {
            tracing::warn!(
                session = %self.name,
                sender = %sender_id,
                "Direct message from a client that is not a participant"
            );
            return Ok(DeliveryReport::default());
        };

        match receiver {
            Some(receiver) => {
                let mut recipients = vec![sender];
                if receiver_id != sender_id {
                    recipients.push(receiver);
                }
                Ok(self
                    .deliver_to(&recipients, &Delivery::Message(text.to_string()))
                    .await)
            }
            None => {
                tracing::debug!(
                    session = %self.name,
                    sender = %sender_id,
                    receiver = %receiver_id,
                    "Direct message receiver not present"
                );
                Ok(self
                    .deliver_to(
                        &[sender],
                        &Delivery::Notice(RECEIVER_ABSENT_NOTICE.to_string()),
                    )
                    .await)
            }
        }
    }

    /// Run `f` under the session lock
    pub(crate) fn with_members<R>(&self, f: impl FnOnce(&mut Members) -> Result<R>) -> Result<R> {
        let mut members = self.lock()?;
        f(&mut members)
    }

    /// Run `f` with `joining` and `leaving` both locked
    ///
    /// The two locks are taken in session-name order so concurrent moves in
    /// opposite directions cannot deadlock. The sessions must differ.
    pub(crate) fn with_pair<R>(
        joining: &Session,
        leaving: &Session,
        f: impl FnOnce(&mut Members, &mut Members) -> Result<R>,
    ) -> Result<R> {
        if joining.name < leaving.name {
            let mut joining_members = joining.lock()?;
            let mut leaving_members = leaving.lock()?;
            f(&mut joining_members, &mut leaving_members)
        } else {
            let mut leaving_members = leaving.lock()?;
            let mut joining_members = joining.lock()?;
            f(&mut joining_members, &mut leaving_members)
        }
    }

    /// Close the session and evict everyone
    ///
    /// Returns the evicted members in join order. A second call returns an
    /// empty list.
    pub(crate) fn teardown(&self) -> Result<Vec<(String, Arc<dyn ClientHandle>)>> {
        let mut members = self.lock()?;
        members.closed = true;
        let participants = std::mem::take(&mut members.participants);
        let mut handles = std::mem::take(&mut members.handles);
        Ok(participants
            .into_iter()
            .filter_map(|id| handles.remove(&id).map(|h| (id, h)))
            .collect())
    }

    pub(crate) async fn deliver_to(
        &self,
        recipients: &[Arc<dyn ClientHandle>],
        delivery: &Delivery,
    ) -> DeliveryReport {
        fan_out(recipients, delivery, self.delivery_timeout).await
    }

    fn lock(&self) -> Result<MutexGuard<'_, Members>> {
        self.members.lock().map_err(|e| {
            ChatError::LockPoisoned(format!("Session '{}' lock poisoned: {}", self.name, e))
        })
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("name", &self.name)
            .field("creator", &self.creator)
            .finish_non_exhaustive()
    }
}
