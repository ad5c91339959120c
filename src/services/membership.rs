//! Membership tracker: which connection sits in which room.
//!
//! The room's participant list is authoritative for fan-out; this index
//! exists so a disconnect can find its room without scanning the registry.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::state::{ConnectionId, RoomKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub room: RoomKey,
    /// Display name inside the room.
    pub name: String,
}

#[derive(Clone, Default)]
pub struct MembershipTracker {
    inner: Arc<RwLock<HashMap<ConnectionId, Membership>>>,
}

impl MembershipTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a membership, returning the one it replaced.
    pub async fn insert(&self, client_id: ConnectionId, membership: Membership) -> Option<Membership> {
        self.inner.write().await.insert(client_id, membership)
    }

    /// Forget a connection. `None` if it never completed a join.
    pub async fn remove(&self, client_id: ConnectionId) -> Option<Membership> {
        self.inner.write().await.remove(&client_id)
    }

    pub async fn get(&self, client_id: ConnectionId) -> Option<Membership> {
        self.inner.read().await.get(&client_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[cfg(test)]
#[path = "membership_test.rs"]
mod tests;
