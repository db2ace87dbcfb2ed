//! Session coordinator — the single entry point for every chat operation
//!
//! Owns the session table and sequences the multi-step operations that touch
//! the table, individual sessions, the position tracker and the directory.
//!
//! ## Locking
//!
//! Locks are always taken in the order
//! **session table → session → position tracker** and
//! **session table → registry**, never the reverse. A move between sessions
//! holds two session locks, taken in session-name order. No lock is held
//! while a client handle is called: every fan-out runs on a snapshot after
//! the last guard has been dropped.

use crate::config::CoordinatorConfig;
use crate::delivery::{fan_out, Delivery, DeliveryReport};
use crate::error::{ChatError, Result};
use crate::handle::ClientHandle;
use crate::message;
use crate::position::PositionTracker;
use crate::registry::SubscriptionRegistry;
use crate::session::{Members, Session};
use crate::types::{ClientLocation, DirectoryEntry, EnterOutcome};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

type SessionTable = HashMap<String, Arc<Session>>;

enum Admission {
    /// Target session was torn down
    Closed,
    /// Position changed since it was read
    Moved,
    /// Already a participant
    Present(Vec<String>),
    Joined(Joined),
}

struct Joined {
    participants: Vec<String>,
    /// Members to tell about the join
    audience: Vec<Arc<dyn ClientHandle>>,
    /// Members of the session left behind, when the client moved
    left_behind: Option<Vec<Arc<dyn ClientHandle>>>,
}

/// Orchestrates sessions, directory, subscriptions and client positions
pub struct SessionCoordinator {
    config: CoordinatorConfig,

    /// Live sessions (name → session)
    sessions: RwLock<SessionTable>,

    registry: SubscriptionRegistry,

    positions: PositionTracker,
}

impl SessionCoordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            registry: SubscriptionRegistry::from_config(&config),
            positions: PositionTracker::new(),
            sessions: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub fn positions(&self) -> &PositionTracker {
        &self.positions
    }

    /// Register a client as known and idle
    pub fn client_start(&self, client_id: &str) -> Result<()> {
        require_non_empty("client id", client_id)?;
        self.positions.start(client_id)
    }

    /// Tear down everything a departing client owns
    ///
    /// Leaves the occupied session first, then forgets the position, then
    /// eliminates every session the client created. Unknown clients are
    /// accepted, so calling this twice is harmless.
    pub async fn client_quit(&self, client_id: &str, handle: &dyn ClientHandle) -> Result<()> {
        if let ClientLocation::InSession(current) = self.positions.locate(client_id)? {
            match self.exit_session(&current, client_id).await {
                Ok(()) => {}
                Err(ChatError::SessionNotFound(_)) => {
                    tracing::warn!(
                        client = %client_id,
                        session = %current,
                        "Quitting client was positioned in a session that no longer exists"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        self.positions.stop(client_id)?;

        // Table lock spans reap → remove so a same-named create cannot slip in.
        let (announcement, evicted, eliminated) = {
            let mut sessions = self.write_sessions()?;
            let reaped = self.registry.reap(client_id, handle.id())?;
            let mut evicted = Vec::new();
            for name in &reaped.sessions {
                match sessions.remove(name) {
                    Some(session) => evicted.extend(self.evict(&session)?),
                    None => tracing::warn!(
                        session = %name,
                        "Directory entry had no live session"
                    ),
                }
            }
            (reaped.announcement, evicted, reaped.sessions)
        };

        let mut report = self.notify_closed(&evicted).await;
        if let Some(announcement) = announcement {
            report.merge(announcement.dispatch(self.config.delivery_timeout()).await);
        }

        tracing::info!(
            client = %client_id,
            eliminated = ?eliminated,
            undelivered = report.failures.len(),
            "Client quit"
        );
        Ok(())
    }

    /// Directory listing (name, creator), sorted by name
    pub fn get_session_list(&self) -> Result<Vec<DirectoryEntry>> {
        self.registry.entries()
    }

    pub fn subscribe(&self, handle: Arc<dyn ClientHandle>) -> Result<()> {
        self.registry.subscribe(handle)
    }

    pub fn unsubscribe(&self, handle: &dyn ClientHandle) -> Result<()> {
        self.registry.unsubscribe(handle).map(|_| ())
    }

    /// Create an empty session owned by `creator_id`
    ///
    /// The creator is not joined. Duplicate names fail with `Conflict`.
    pub async fn create_session(&self, name: &str, creator_id: &str) -> Result<()> {
        require_non_empty("session name", name)?;

        let announcement = {
            let mut sessions = self.write_sessions()?;
            if sessions.contains_key(name) {
                return Err(ChatError::Conflict(name.to_string()));
            }
            let session = Session::new(name, creator_id, self.config.delivery_timeout());
            sessions.insert(name.to_string(), Arc::new(session));

            // Directory entry goes last; it is what clients get told about.
            match self.registry.insert_entry(name, creator_id) {
                Ok(announcement) => announcement,
                Err(e) => {
                    sessions.remove(name);
                    return Err(e);
                }
            }
        };

        tracing::info!(session = %name, creator = %creator_id, "Session created");
        announcement.dispatch(self.config.delivery_timeout()).await;
        Ok(())
    }

    /// Destroy a session, evicting its participants
    ///
    /// Ownership is not checked here; clients compare the directory's
    /// creator with their own id before calling.
    pub async fn destroy_session(&self, name: &str) -> Result<()> {
        let (announcement, evicted) = {
            let mut sessions = self.write_sessions()?;
            let session = sessions
                .remove(name)
                .ok_or_else(|| ChatError::SessionNotFound(name.to_string()))?;
            let evicted = self.evict(&session)?;
            let announcement = self.registry.remove_entry(name)?;
            (announcement, evicted)
        };

        let mut report = self.notify_closed(&evicted).await;
        if let Some(announcement) = announcement {
            report.merge(announcement.dispatch(self.config.delivery_timeout()).await);
        }
        tracing::info!(
            session = %name,
            evicted = evicted.len(),
            undelivered = report.failures.len(),
            "Session destroyed"
        );
        Ok(())
    }

    /// Join a session
    ///
    /// A missing session is `EnterOutcome::NotFound` and changes nothing.
    /// A client positioned in another session is moved: it joins the target
    /// and leaves the old session in one step, with both session locks held.
    /// Re-entering the current session returns the list without re-joining.
    pub async fn enter_session(
        &self,
        name: &str,
        client_id: &str,
        handle: Arc<dyn ClientHandle>,
    ) -> Result<EnterOutcome> {
        match self.lookup(name)? {
            Some(session) => self.join(&session, client_id, handle).await,
            None => Ok(EnterOutcome::NotFound),
        }
    }

    async fn join(
        &self,
        session: &Session,
        client_id: &str,
        handle: Arc<dyn ClientHandle>,
    ) -> Result<EnterOutcome> {
        let name = session.name();
        let (joined, previous) = loop {
            let expected = self.positions.locate(client_id)?;
            let previous = match &expected {
                ClientLocation::InSession(current) if current != name => self.lookup(current)?,
                _ => None,
            };

            let step = match &previous {
                Some(previous) => Session::with_pair(session, previous, |joining, leaving| {
                    self.admit(name, client_id, &handle, &expected, joining, Some(leaving))
                })?,
                None => session.with_members(|joining| {
                    self.admit(name, client_id, &handle, &expected, joining, None)
                })?,
            };

            match step {
                Admission::Moved => {
                    tracing::debug!(
                        client = %client_id,
                        session = %name,
                        "Client position changed during enter, retrying"
                    );
                }
                Admission::Closed => return Ok(EnterOutcome::NotFound),
                Admission::Present(participants) => return Ok(EnterOutcome::Entered(participants)),
                Admission::Joined(joined) => break (joined, previous),
            }
        };

        let timestamp = self.timestamp();
        if let (Some(previous), Some(left_behind)) = (&previous, &joined.left_behind) {
            tracing::debug!(
                client = %client_id,
                from = %previous.name(),
                to = %name,
                "Client moved between sessions"
            );
            if !left_behind.is_empty() {
                let line = message::leave_line(&timestamp, client_id);
                previous
                    .deliver_to(left_behind, &Delivery::Message(line))
                    .await;
            }
        }

        tracing::debug!(session = %name, client = %client_id, "Client entered session");
        if !joined.audience.is_empty() {
            let line = message::join_line(&timestamp, client_id);
            session
                .deliver_to(&joined.audience, &Delivery::Message(line))
                .await;
        }
        Ok(EnterOutcome::Entered(joined.participants))
    }

    /// Membership change for one enter attempt; runs with the session locks held
    ///
    /// Nothing is touched unless the target is open and the client's position
    /// still reads `expected`.
    fn admit(
        &self,
        name: &str,
        client_id: &str,
        handle: &Arc<dyn ClientHandle>,
        expected: &ClientLocation,
        joining: &mut Members,
        leaving: Option<&mut Members>,
    ) -> Result<Admission> {
        if joining.is_closed() {
            return Ok(Admission::Closed);
        }
        if self.positions.locate(client_id)? != *expected {
            return Ok(Admission::Moved);
        }
        if joining.contains(client_id) {
            return Ok(Admission::Present(joining.list()));
        }

        let audience = joining.recipients();
        joining.add(client_id, handle.clone());
        let left_behind = match leaving {
            Some(leaving) => leaving.remove(client_id).then(|| leaving.recipients()),
            None => None,
        };
        self.positions.set_position(client_id, name)?;

        Ok(Admission::Joined(Joined {
            participants: joining.list(),
            audience,
            left_behind,
        }))
    }

    /// Leave a session and tell the remaining participants
    pub async fn exit_session(&self, name: &str, client_id: &str) -> Result<()> {
        let session = self
            .lookup(name)?
            .ok_or_else(|| ChatError::SessionNotFound(name.to_string()))?;

        let remaining = session.with_members(|members| {
            let removed = members.remove(client_id);
            self.positions.clear_if(client_id, name)?;
            Ok(removed.then(|| members.recipients()))
        })?;

        let Some(remaining) = remaining else {
            tracing::warn!(
                session = %name,
                client = %client_id,
                "Exit from a session the client was not in"
            );
            return Ok(());
        };

        tracing::debug!(session = %name, client = %client_id, "Client left session");
        if !remaining.is_empty() {
            let line = message::leave_line(&self.timestamp(), client_id);
            session
                .deliver_to(&remaining, &Delivery::Message(line))
                .await;
        }
        Ok(())
    }

    pub fn list_participants(&self, name: &str) -> Result<Vec<String>> {
        self.lookup(name)?
            .ok_or_else(|| ChatError::SessionNotFound(name.to_string()))?
            .list_participants()
    }

    /// Send a timestamped line; an empty `receiver_id` broadcasts
    pub async fn send_message(
        &self,
        name: &str,
        sender_id: &str,
        receiver_id: &str,
        text: &str,
    ) -> Result<DeliveryReport> {
        let session = self
            .lookup(name)?
            .ok_or_else(|| ChatError::SessionNotFound(name.to_string()))?;

        let line = message::chat_line(&self.timestamp(), sender_id, receiver_id, text);
        if receiver_id.is_empty() {
            session.broadcast(&line).await
        } else {
            session.send_direct(&line, sender_id, receiver_id).await
        }
    }

    pub fn find_client(&self, client_id: &str) -> Result<ClientLocation> {
        self.positions.locate(client_id)
    }

    /// Live session by name
    pub fn session(&self, name: &str) -> Result<Option<Arc<Session>>> {
        self.lookup(name)
    }

    pub fn session_count(&self) -> Result<usize> {
        Ok(self.read_sessions()?.len())
    }

    /// Close a session that has already left the table
    ///
    /// Shared by destroy and cascade elimination. Runs under the table lock;
    /// returns the handles that still need a `session_closed` push.
    fn evict(&self, session: &Session) -> Result<Vec<Arc<dyn ClientHandle>>> {
        let members = session.teardown()?;
        let mut handles = Vec::with_capacity(members.len());
        for (client_id, handle) in members {
            self.positions.clear_if(&client_id, session.name())?;
            handles.push(handle);
        }
        Ok(handles)
    }

    async fn notify_closed(&self, handles: &[Arc<dyn ClientHandle>]) -> DeliveryReport {
        fan_out(handles, &Delivery::SessionClosed, self.config.delivery_timeout()).await
    }

    fn lookup(&self, name: &str) -> Result<Option<Arc<Session>>> {
        Ok(self.read_sessions()?.get(name).cloned())
    }

    fn timestamp(&self) -> String {
        message::timestamp(&self.config.timestamp_format)
    }

    fn read_sessions(&self) -> Result<RwLockReadGuard<'_, SessionTable>> {
        self.sessions.read().map_err(|e| {
            ChatError::LockPoisoned(format!("Session table lock poisoned: {}", e))
        })
    }

    fn write_sessions(&self) -> Result<RwLockWriteGuard<'_, SessionTable>> {
        self.sessions.write().map_err(|e| {
            ChatError::LockPoisoned(format!("Session table lock poisoned: {}", e))
        })
    }
}

impl Default for SessionCoordinator {
    fn default() -> Self {
        Self::new(CoordinatorConfig::default())
    }
}

fn require_non_empty(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ChatError::InvalidInput(format!("{} cannot be empty", what)));
    }
    Ok(())
}
