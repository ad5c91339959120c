//! Event: the realtime envelope spoken by the browser clients.
//!
//! ARCHITECTURE
//! ============
//! Every websocket text frame is `{"event": <name>, "data": <payload>}`.
//! Inbound frames decode into `ClientEvent`, outbound frames are built as
//! `ServerEvent`. Event names are the kebab-case variant names and must
//! stay byte-for-byte compatible with the existing pair and study clients.
//!
//! DESIGN
//! ======
//! - Payloads are typed per event; anything that fails to decode is
//!   rejected at the boundary before it can touch room state.
//! - Field names follow the clients (`sessionId`, `groupId`, `groupName`),
//!   hence the camelCase renames.
//! - Timestamps are milliseconds since the Unix epoch.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::state::{ChatMessage, Language, Question};

// =============================================================================
// INBOUND
// =============================================================================

/// Events a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Payload is the bare session id.
    JoinPairSession(String),
    JoinStudyGroup(GroupJoin),
    CodeChange(CodeChange),
    GroupCodeChange(GroupCodeChange),
    SendMessage(SendMessage),
    AddQuestion(AddQuestion),
}

/// `join-study-group` payload. The study client sends only the group id;
/// newer clients may attach a display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupJoin {
    Id(String),
    Named {
        #[serde(rename = "groupId")]
        group_id: String,
        #[serde(default)]
        username: Option<String>,
    },
}

impl GroupJoin {
    #[must_use]
    pub fn group_id(&self) -> &str {
        match self {
            Self::Id(id) | Self::Named { group_id: id, .. } => id,
        }
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Id(_) => None,
            Self::Named { username, .. } => username.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeChange {
    pub session_id: String,
    pub code: String,
    /// Absent means "keep the room's current language".
    #[serde(default)]
    pub language: Option<Language>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupCodeChange {
    pub group_id: String,
    pub code: String,
    #[serde(default)]
    pub language: Option<Language>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    pub group_id: String,
    pub message: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddQuestion {
    pub group_id: String,
    pub question: String,
    #[serde(default)]
    pub username: String,
}

// =============================================================================
// OUTBOUND
// =============================================================================

/// Events the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    SessionState(CodeSnapshot),
    GroupState(GroupSnapshot),
    CodeUpdate(CodeSnapshot),
    GroupCodeUpdate(CodeSnapshot),
    /// Payload is the participant id.
    UserJoined(String),
    UserLeft(String),
    UserJoinedGroup(UserName),
    UserLeftGroup(UserName),
    NewMessage(ChatMessage),
    NewQuestion(Question),
}

impl ServerEvent {
    /// Wire name of the event, for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionState(_) => "session-state",
            Self::GroupState(_) => "group-state",
            Self::CodeUpdate(_) => "code-update",
            Self::GroupCodeUpdate(_) => "group-code-update",
            Self::UserJoined(_) => "user-joined",
            Self::UserLeft(_) => "user-left",
            Self::UserJoinedGroup(_) => "user-joined-group",
            Self::UserLeftGroup(_) => "user-left-group",
            Self::NewMessage(_) => "new-message",
            Self::NewQuestion(_) => "new-question",
        }
    }
}

/// Current buffer and language. Used for `session-state` and both
/// code-update events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSnapshot {
    pub code: String,
    pub language: Language,
}

/// Full study-group state sent to a joining participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSnapshot {
    pub code: String,
    pub language: Language,
    pub group_name: String,
    pub messages: Vec<ChatMessage>,
    pub questions: Vec<Question>,
    /// Roster in join order.
    pub users: Vec<UserName>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserName {
    pub name: String,
}

// =============================================================================
// CODEC
// =============================================================================

/// Decode one inbound text frame.
///
/// # Errors
///
/// Returns the serde error for unknown events or malformed payloads.
pub fn decode(text: &str) -> Result<ClientEvent, serde_json::Error> {
    serde_json::from_str(text)
}

/// Encode one outbound event as a text frame.
///
/// # Errors
///
/// Returns the serde error if serialization fails.
pub fn encode(event: &ServerEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}

/// Current time as milliseconds since Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

#[cfg(test)]
#[path = "event_test.rs"]
mod tests;
