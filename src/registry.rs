//! Subscription registry — the global session directory plus change notices
//!
//! The directory (name → creator) and the subscriber set share one lock.
//! Every mutation happens in two steps: a synchronous step under the lock
//! that returns an [`Announcement`] (notice text + recipient snapshot), and
//! an async dispatch that runs after the lock is gone. The coordinator uses
//! the first step inside its own critical sections and dispatches later;
//! standalone callers use the async wrappers.

use crate::config::{CoordinatorConfig, CreatorMatch};
use crate::delivery::{fan_out, Delivery, DeliveryReport};
use crate::error::{ChatError, Result};
use crate::handle::ClientHandle;
use crate::message::{CREATOR_OFFLINE_NOTICE, ROOM_CREATED_NOTICE, ROOM_DESTROYED_NOTICE};
use crate::types::DirectoryEntry;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

#[derive(Default)]
struct Directory {
    /// Session name → creator id
    entries: BTreeMap<String, String>,
    /// Handle id → handle
    subscribers: HashMap<String, Arc<dyn ClientHandle>>,
}

impl Directory {
    fn subscriber_snapshot(&self) -> Vec<Arc<dyn ClientHandle>> {
        self.subscribers.values().cloned().collect()
    }
}

/// A directory-change notice waiting to be sent
#[must_use = "an announcement does nothing until dispatched"]
pub struct Announcement {
    text: &'static str,
    recipients: Vec<Arc<dyn ClientHandle>>,
}

impl Announcement {
    pub fn text(&self) -> &str {
        self.text
    }

    pub fn recipient_count(&self) -> usize {
        self.recipients.len()
    }

    /// Notify every recipient; call with no core lock held
    pub async fn dispatch(self, timeout: Duration) -> DeliveryReport {
        tracing::debug!(
            notice = %self.text(),
            recipients = self.recipient_count(),
            "Dispatching directory notice"
        );
        fan_out(
            &self.recipients,
            &Delivery::Notice(self.text.to_string()),
            timeout,
        )
        .await
    }
}

/// Outcome of reaping a quitting creator
pub struct Reaped {
    /// Removed session names, sorted
    pub sessions: Vec<String>,
    /// Present when at least one session was removed
    pub announcement: Option<Announcement>,
}

/// Global directory and directory-change subscribers
pub struct SubscriptionRegistry {
    state: RwLock<Directory>,
    creator_match: CreatorMatch,
    delivery_timeout: Duration,
}

impl SubscriptionRegistry {
    pub fn new(creator_match: CreatorMatch, delivery_timeout: Duration) -> Self {
        Self {
            state: RwLock::new(Directory::default()),
            creator_match,
            delivery_timeout,
        }
    }

    pub fn from_config(config: &CoordinatorConfig) -> Self {
        Self::new(config.creator_match, config.delivery_timeout())
    }

    /// Add a directory entry and notify subscribers
    pub async fn register_session(&self, name: &str, creator: &str) -> Result<DeliveryReport> {
        let announcement = self.insert_entry(name, creator)?;
        Ok(announcement.dispatch(self.delivery_timeout).await)
    }

    /// Remove a directory entry and notify subscribers; absent names are a no-op
    pub async fn unregister_session(&self, name: &str) -> Result<DeliveryReport> {
        match self.remove_entry(name)? {
            Some(announcement) => Ok(announcement.dispatch(self.delivery_timeout).await),
            None => Ok(DeliveryReport::default()),
        }
    }

    /// Drop every entry created by `client_id` and unsubscribe `handle`
    ///
    /// `handle` is unsubscribed before the "creator goes off line" notice is
    /// addressed, so the departing client is not told about its own rooms.
    /// Returns the removed session names so the caller can eliminate the
    /// live sessions.
    pub async fn reap_creator(
        &self,
        client_id: &str,
        handle: &dyn ClientHandle,
    ) -> Result<Vec<String>> {
        let reaped = self.reap(client_id, handle.id())?;
        if let Some(announcement) = reaped.announcement {
            announcement.dispatch(self.delivery_timeout).await;
        }
        Ok(reaped.sessions)
    }

    pub(crate) fn insert_entry(&self, name: &str, creator: &str) -> Result<Announcement> {
        let mut state = self.write()?;
        if state.entries.contains_key(name) {
            return Err(ChatError::Conflict(name.to_string()));
        }
        state.entries.insert(name.to_string(), creator.to_string());
        tracing::debug!(session = %name, creator = %creator, "Directory entry registered");

        Ok(Announcement {
            text: ROOM_CREATED_NOTICE,
            recipients: state.subscriber_snapshot(),
        })
    }

    pub(crate) fn remove_entry(&self, name: &str) -> Result<Option<Announcement>> {
        let mut state = self.write()?;
        if state.entries.remove(name).is_none() {
            return Ok(None);
        }
        tracing::debug!(session = %name, "Directory entry unregistered");

        Ok(Some(Announcement {
            text: ROOM_DESTROYED_NOTICE,
            recipients: state.subscriber_snapshot(),
        }))
    }

    /// Scan, remove and unsubscribe in one critical section
    ///
    /// The quitting handle is unsubscribed before the snapshot, so it does
    /// not receive the notice.
    pub(crate) fn reap(&self, client_id: &str, handle_id: &str) -> Result<Reaped> {
        let mut state = self.write()?;
        let creator_match = self.creator_match;

        let sessions: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, creator)| creator_match.matches(creator, client_id))
            .map(|(name, _)| name.clone())
            .collect();
        for name in &sessions {
            state.entries.remove(name);
        }
        state.subscribers.remove(handle_id);

        let announcement = if sessions.is_empty() {
            None
        } else {
            tracing::info!(
                client = %client_id,
                sessions = ?sessions,
                "Reaped sessions of departed creator"
            );
            Some(Announcement {
                text: CREATOR_OFFLINE_NOTICE,
                recipients: state.subscriber_snapshot(),
            })
        };

        Ok(Reaped {
            sessions,
            announcement,
        })
    }

    /// Add a subscriber; re-subscribing replaces the stored handle
    pub fn subscribe(&self, handle: Arc<dyn ClientHandle>) -> Result<()> {
        let id = handle.id().to_string();
        self.write()?.subscribers.insert(id.clone(), handle);
        tracing::debug!(subscriber = %id, "Subscribed to directory changes");
        Ok(())
    }

    /// Remove a subscriber; returns false if it was not subscribed
    pub fn unsubscribe(&self, handle: &dyn ClientHandle) -> Result<bool> {
        let removed = self.write()?.subscribers.remove(handle.id()).is_some();
        if removed {
            tracing::debug!(subscriber = %handle.id(), "Unsubscribed from directory changes");
        }
        Ok(removed)
    }

    pub fn is_subscribed(&self, handle_id: &str) -> Result<bool> {
        Ok(self.read()?.subscribers.contains_key(handle_id))
    }

    pub fn subscriber_count(&self) -> Result<usize> {
        Ok(self.read()?.subscribers.len())
    }

    /// Directory listing, sorted by session name
    pub fn entries(&self) -> Result<Vec<DirectoryEntry>> {
        Ok(self
            .read()?
            .entries
            .iter()
            .map(|(name, creator)| DirectoryEntry::new(name, creator))
            .collect())
    }

    pub fn creator_of(&self, name: &str) -> Result<Option<String>> {
        Ok(self.read()?.entries.get(name).cloned())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.entries.is_empty())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Directory>> {
        self.state.read().map_err(|e| {
            ChatError::LockPoisoned(format!("Subscription registry lock poisoned: {}", e))
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Directory>> {
        self.state.write().map_err(|e| {
            ChatError::LockPoisoned(format!("Subscription registry lock poisoned: {}", e))
        })
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::from_config(&CoordinatorConfig::default())
    }
}
