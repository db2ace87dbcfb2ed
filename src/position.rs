//! Position tracker — where is client X right now
//!
//! `""` means known but idle; a missing key means never started (or quit).

use crate::error::{ChatError, Result};
use crate::types::ClientLocation;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Client id → occupied session name
#[derive(Default)]
pub struct PositionTracker {
    positions: RwLock<HashMap<String, String>>,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a client as known and idle
    pub fn start(&self, client_id: &str) -> Result<()> {
        self.write()?.insert(client_id.to_string(), String::new());
        tracing::debug!(client = %client_id, "Client started");
        Ok(())
    }

    pub fn set_position(&self, client_id: &str, session: &str) -> Result<()> {
        self.write()?.insert(client_id.to_string(), session.to_string());
        Ok(())
    }

    /// Current session name, `""` when idle
    pub fn get_position(&self, client_id: &str) -> Result<String> {
        self.read()?
            .get(client_id)
            .cloned()
            .ok_or_else(|| ChatError::ClientNotFound(client_id.to_string()))
    }

    /// Forget a client entirely
    pub fn stop(&self, client_id: &str) -> Result<()> {
        self.write()?.remove(client_id);
        tracing::debug!(client = %client_id, "Client stopped");
        Ok(())
    }

    /// Reset to idle only if the client is still recorded in `session`
    ///
    /// Returns whether the record was reset.
    pub(crate) fn clear_if(&self, client_id: &str, session: &str) -> Result<bool> {
        let mut positions = self.write()?;
        match positions.get_mut(client_id) {
            Some(current) if current.as_str() == session => {
                current.clear();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn locate(&self, client_id: &str) -> Result<ClientLocation> {
        let position = self.read()?.get(client_id).cloned();
        Ok(ClientLocation::from_position(position))
    }

    /// Number of known clients
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, String>>> {
        self.positions.read().map_err(|e| {
            ChatError::LockPoisoned(format!("Position tracker lock poisoned: {}", e))
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, String>>> {
        self.positions.write().map_err(|e| {
            ChatError::LockPoisoned(format!("Position tracker lock poisoned: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_and_get() {
        let tracker = PositionTracker::new();
        tracker.start("alice").unwrap();
        assert_eq!(tracker.get_position("alice").unwrap(), "");
        assert_eq!(tracker.locate("alice").unwrap(), ClientLocation::Idle);
    }

    #[test]
    fn test_get_unknown_client() {
        let tracker = PositionTracker::new();
        let err = tracker.get_position("ghost").unwrap_err();
        assert!(matches!(err, ChatError::ClientNotFound(_)));
        assert_eq!(tracker.locate("ghost").unwrap(), ClientLocation::Unknown);
    }

    #[test]
    fn test_start_is_idempotent() {
        let tracker = PositionTracker::new();
        tracker.start("alice").unwrap();
        tracker.start("alice").unwrap();
        assert_eq!(tracker.len().unwrap(), 1);
        assert_eq!(tracker.get_position("alice").unwrap(), "");
    }

    #[test]
    fn test_set_and_stop() {
        let tracker = PositionTracker::new();
        tracker.start("alice").unwrap();
        tracker.set_position("alice", "lobby").unwrap();
        assert_eq!(
            tracker.locate("alice").unwrap(),
            ClientLocation::InSession("lobby".into())
        );

        tracker.stop("alice").unwrap();
        assert!(tracker.is_empty().unwrap());
        tracker.stop("alice").unwrap();
    }

    #[test]
    fn test_clear_if_only_matching_session() {
        let tracker = PositionTracker::new();
        tracker.start("alice").unwrap();
        tracker.set_position("alice", "lobby").unwrap();

        assert!(!tracker.clear_if("alice", "kitchen").unwrap());
        assert_eq!(tracker.get_position("alice").unwrap(), "lobby");

        assert!(tracker.clear_if("alice", "lobby").unwrap());
        assert_eq!(tracker.get_position("alice").unwrap(), "");

        assert!(!tracker.clear_if("ghost", "lobby").unwrap());
        assert_eq!(tracker.locate("ghost").unwrap(), ClientLocation::Unknown);
    }
}
