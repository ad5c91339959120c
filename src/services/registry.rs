//! Room registry: maps a room key to its live state.
//!
//! DESIGN
//! ======
//! Rooms are created lazily on first join and kept in a
//! `RwLock<HashMap<RoomKey, SharedRoom>>`. Lookups take the read lock;
//! creation re-checks under the write lock so two racing first-joins always
//! resolve to the same room.
//!
//! EVICTION
//! ========
//! `EvictionPolicy::Never` keeps every room until process exit. With
//! `IdleAfter`, a background reaper unlinks rooms that are empty and idle.
//! The reaper marks the room `evicted` under its own lock; a join that
//! resolved the room just before eviction sees the flag and retries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::services::room::RoomError;
use crate::state::{Language, RoomKey, RoomKind, RoomState, SharedRoom};

const ROOM_ID_LEN: usize = 9;
const ROOM_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const MIN_REAP_INTERVAL: Duration = Duration::from_millis(100);

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Rooms live until process exit.
    Never,
    /// Empty rooms idle for at least this long are reaped.
    IdleAfter(Duration),
}

/// Lightweight listing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSummary {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub language: Language,
    pub participants: usize,
}

// =============================================================================
// REGISTRY
// =============================================================================

#[derive(Clone)]
pub struct RoomRegistry {
    rooms: Arc<RwLock<HashMap<RoomKey, SharedRoom>>>,
    policy: EvictionPolicy,
}

impl RoomRegistry {
    #[must_use]
    pub fn new(policy: EvictionPolicy) -> Self {
        Self { rooms: Arc::new(RwLock::new(HashMap::new())), policy }
    }

    #[must_use]
    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Resolve a room, creating an empty one if the key is unseen.
    pub async fn get_or_create(&self, key: &RoomKey) -> SharedRoom {
        if let Some(room) = self.rooms.read().await.get(key) {
            return Arc::clone(room);
        }

        let mut rooms = self.rooms.write().await;
        let room = rooms.entry(key.clone()).or_insert_with(|| {
            info!(room = %key, "room created");
            Arc::new(Mutex::new(RoomState::new(key.clone())))
        });
        Arc::clone(room)
    }

    /// Resolve an existing room.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::NotFound` if no live room has this key.
    pub async fn get(&self, key: &RoomKey) -> Result<SharedRoom, RoomError> {
        self.rooms
            .read()
            .await
            .get(key)
            .map(Arc::clone)
            .ok_or_else(|| RoomError::NotFound(key.clone()))
    }

    /// Create a named study group under a fresh random id.
    pub async fn create_group(&self, name: Option<&str>) -> (String, String) {
        let mut rooms = self.rooms.write().await;
        let key = loop {
            let key = RoomKey::study_group(generate_room_id());
            if !rooms.contains_key(&key) {
                break key;
            }
        };

        let mut room = RoomState::new(key.clone());
        let name = match name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => crate::state::default_group_name(&key.id),
        };
        if let Some(group) = room.group.as_mut() {
            group.name.clone_from(&name);
        }
        info!(room = %key, %name, "study group created");

        let id = key.id.clone();
        rooms.insert(key, Arc::new(Mutex::new(room)));
        (id, name)
    }

    /// Summaries for every live room of one kind, sorted by id.
    pub async fn list(&self, kind: RoomKind) -> Vec<RoomSummary> {
        let rooms: Vec<SharedRoom> = {
            let map = self.rooms.read().await;
            map.iter()
                .filter(|(key, _)| key.kind == kind)
                .map(|(_, room)| Arc::clone(room))
                .collect()
        };

        let mut out = Vec::with_capacity(rooms.len());
        for room in rooms {
            let room = room.lock().await;
            if room.evicted {
                continue;
            }
            out.push(RoomSummary {
                id: room.key.id.clone(),
                name: room.group.as_ref().map(|g| g.name.clone()),
                language: room.language,
                participants: room.participants.len(),
            });
        }
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Unlink rooms with no participants and no activity for `max_idle`.
    /// Rooms whose lock is currently held are skipped this round.
    pub async fn reap_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut rooms = self.rooms.write().await;
        let before = rooms.len();

        rooms.retain(|key, room| {
            let Ok(mut room) = room.try_lock() else {
                return true;
            };
            if room.participants.is_empty() && now.saturating_duration_since(room.last_activity) >= max_idle {
                room.evicted = true;
                info!(room = %key, "evicted idle room");
                return false;
            }
            true
        });

        before - rooms.len()
    }
}

// =============================================================================
// REAPER
// =============================================================================

/// Spawn the idle-room reaper if the policy asks for one.
pub fn spawn_reaper(registry: RoomRegistry, interval: Duration) -> Option<JoinHandle<()>> {
    let EvictionPolicy::IdleAfter(max_idle) = registry.policy() else {
        return None;
    };
    info!(idle_secs = max_idle.as_secs(), interval_secs = interval.as_secs(), "room reaper configured");

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(MIN_REAP_INTERVAL));
        loop {
            ticker.tick().await;
            let reaped = registry.reap_idle(max_idle).await;
            if reaped > 0 {
                let remaining = registry.len().await;
                debug!(reaped, remaining, "reaper pass");
            }
        }
    }))
}

// =============================================================================
// HELPERS
// =============================================================================

/// Random 9-character lowercase base-36 id, same shape the clients generate.
#[must_use]
pub fn generate_room_id() -> String {
    let mut rng = rand::rng();
    (0..ROOM_ID_LEN)
        .map(|_| char::from(ROOM_ID_ALPHABET[rng.random_range(0..ROOM_ID_ALPHABET.len())]))
        .collect()
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
