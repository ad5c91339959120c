//! Shared application state and the room data model.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the room registry, the connection membership index, and the
//! optional code execution collaborator. Each room lives behind its own
//! mutex so edits in one room never wait on another.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::event::ServerEvent;
use crate::services::executor::CodeExecutor;
use crate::services::membership::MembershipTracker;
use crate::services::registry::{EvictionPolicy, RoomRegistry};

/// Opaque per-connection identifier. Lives as long as the socket does.
pub type ConnectionId = Uuid;

/// Default display name for study-group participants that never sent one.
pub const ANONYMOUS: &str = "Anonymous";

// =============================================================================
// ROOM IDENTITY
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomKind {
    Pair,
    StudyGroup,
}

impl RoomKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pair => "pair",
            Self::StudyGroup => "study_group",
        }
    }
}

/// Registry key. Pair sessions and study groups live in separate namespaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomKey {
    pub kind: RoomKind,
    pub id: String,
}

impl RoomKey {
    #[must_use]
    pub fn pair(id: impl Into<String>) -> Self {
        Self { kind: RoomKind::Pair, id: id.into() }
    }

    #[must_use]
    pub fn study_group(id: impl Into<String>) -> Self {
        Self { kind: RoomKind::StudyGroup, id: id.into() }
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.as_str(), self.id)
    }
}

// =============================================================================
// ROOM CONTENT
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Javascript,
    Python,
    Java,
    Cpp,
}

/// One chat line. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub username: String,
    pub text: String,
    /// Milliseconds since Unix epoch, stamped on arrival at the room.
    pub timestamp: i64,
}

/// One entry in the question board. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub username: String,
    pub text: String,
    pub timestamp: i64,
}

/// A connected member of a room.
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: ConnectionId,
    pub name: String,
    /// Outbound queue of the participant's socket.
    pub tx: mpsc::Sender<ServerEvent>,
}

/// Study-group extras. Logs are append-only, ordered by arrival.
#[derive(Debug, Clone, Default)]
pub struct GroupLog {
    pub name: String,
    pub messages: Vec<ChatMessage>,
    pub questions: Vec<Question>,
}

// =============================================================================
// ROOM STATE
// =============================================================================

/// Authoritative state of one room. Always accessed under the room mutex.
pub struct RoomState {
    pub key: RoomKey,
    pub code: String,
    pub language: Language,
    /// Members in join order.
    pub participants: Vec<Participant>,
    /// `Some` for study groups, `None` for pair sessions.
    pub group: Option<GroupLog>,
    pub last_activity: Instant,
    /// Set by the reaper once the room is unlinked from the registry.
    pub evicted: bool,
}

impl RoomState {
    #[must_use]
    pub fn new(key: RoomKey) -> Self {
        let group = match key.kind {
            RoomKind::Pair => None,
            RoomKind::StudyGroup => Some(GroupLog { name: default_group_name(&key.id), ..GroupLog::default() }),
        };
        Self {
            key,
            code: String::new(),
            language: Language::default(),
            participants: Vec::new(),
            group,
            last_activity: Instant::now(),
            evicted: false,
        }
    }

    #[must_use]
    pub fn is_member(&self, id: ConnectionId) -> bool {
        self.participants.iter().any(|p| p.id == id)
    }

    #[must_use]
    pub fn participant(&self, id: ConnectionId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}

#[must_use]
pub fn default_group_name(id: &str) -> String {
    format!("Study Group {id}")
}

/// Shared handle to one room.
pub type SharedRoom = Arc<tokio::sync::Mutex<RoomState>>;

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Copy.
#[derive(Clone)]
pub struct AppState {
    pub rooms: RoomRegistry,
    pub members: MembershipTracker,
    /// Optional run/analyze collaborator. `None` if no upstream is configured.
    pub executor: Option<Arc<dyn CodeExecutor>>,
    /// Capacity of each connection's outbound queue.
    pub queue_capacity: usize,
}

impl AppState {
    #[must_use]
    pub fn new(policy: EvictionPolicy, executor: Option<Arc<dyn CodeExecutor>>, queue_capacity: usize) -> Self {
        Self { rooms: RoomRegistry::new(policy), members: MembershipTracker::new(), executor, queue_capacity }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
#[path = "state_helpers_test.rs"]
pub mod test_helpers;

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
