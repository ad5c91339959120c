//! Room service: join/leave, edits, chat and questions.
//!
//! DESIGN
//! ======
//! Every operation resolves the room through the registry, takes the room
//! mutex, mutates state, and fans out while still holding the lock. That
//! makes each room a single-writer sequence: last write wins for the code
//! buffer, logs append in arrival order, and every recipient observes the
//! same commit order.
//!
//! FAN-OUT RULES
//! =============
//! - Snapshot on join: joining connection only.
//! - Code updates: everyone except the editor (no echo).
//! - Chat messages and questions: everyone including the author; clients
//!   render their own lines from the broadcast.
//! - Roster changes: everyone except the subject.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::event::{CodeSnapshot, GroupSnapshot, ServerEvent, UserName, now_ms};
use crate::services::broadcast::{broadcast, send_to};
use crate::services::membership::Membership;
use crate::state::{
    ANONYMOUS, AppState, ChatMessage, ConnectionId, Language, Participant, Question, RoomKey, RoomKind, RoomState,
};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("room not found: {0}")]
    NotFound(RoomKey),
    #[error("connection is not a member of {0}")]
    NotMember(RoomKey),
    #[error("empty text")]
    EmptyText,
}

impl crate::error::ErrorCode for RoomError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_ROOM_NOT_FOUND",
            Self::NotMember(_) => "E_NOT_MEMBER",
            Self::EmptyText => "E_EMPTY_TEXT",
        }
    }
}

// =============================================================================
// JOIN / LEAVE
// =============================================================================

/// Join a room, creating it on first use. The snapshot is queued on `tx`
/// before the lock is released, so no later broadcast can overtake it.
///
/// A connection is in at most one room: joining elsewhere leaves the old
/// room first. Re-joining the same room refreshes the snapshot silently.
pub async fn join(
    state: &AppState,
    key: RoomKey,
    client_id: ConnectionId,
    name: Option<&str>,
    tx: mpsc::Sender<ServerEvent>,
) {
    if let Some(current) = state.members.get(client_id).await {
        if current.room != key {
            leave(state, client_id).await;
        }
    }

    let name = display_name(key.kind, client_id, name);

    loop {
        let shared = state.rooms.get_or_create(&key).await;
        let mut room = shared.lock().await;
        if room.evicted {
            // Reaped between lookup and lock; the registry hands out a fresh room next time.
            continue;
        }

        let participant = Participant { id: client_id, name: name.clone(), tx };
        let rejoin = if let Some(existing) = room.participants.iter_mut().find(|p| p.id == client_id) {
            *existing = participant.clone();
            true
        } else {
            room.participants.push(participant.clone());
            false
        };
        room.touch();

        send_to(&participant, &snapshot(&room));
        if !rejoin {
            let joined = match key.kind {
                RoomKind::Pair => ServerEvent::UserJoined(client_id.to_string()),
                RoomKind::StudyGroup => ServerEvent::UserJoinedGroup(UserName { name: name.clone() }),
            };
            broadcast(&room.participants, &joined, Some(client_id));
        }

        state
            .members
            .insert(client_id, Membership { room: key.clone(), name })
            .await;
        info!(room = %key, %client_id, rejoin, participants = room.participants.len(), "client joined room");
        return;
    }
}

/// Remove a connection from its room and notify the remaining members. The
/// study-group notice carries the name recorded in the membership at join.
/// Returns `false` (and does nothing) if the connection never joined.
pub async fn leave(state: &AppState, client_id: ConnectionId) -> bool {
    let Some(membership) = state.members.remove(client_id).await else {
        return false;
    };
    let Ok(shared) = state.rooms.get(&membership.room).await else {
        return false;
    };

    let mut room = shared.lock().await;
    let Some(pos) = room.participants.iter().position(|p| p.id == client_id) else {
        return false;
    };
    room.participants.remove(pos);
    room.touch();

    let Membership { room: key, name } = membership;
    info!(room = %key, %client_id, %name, remaining = room.participants.len(), "client left room");
    let left = match key.kind {
        RoomKind::Pair => ServerEvent::UserLeft(client_id.to_string()),
        RoomKind::StudyGroup => ServerEvent::UserLeftGroup(UserName { name }),
    };
    broadcast(&room.participants, &left, Some(client_id));
    true
}

// =============================================================================
// EDITS
// =============================================================================

/// Replace the room's buffer (last write wins) and push it to every other
/// member. `language: None` keeps the current language.
///
/// # Errors
///
/// `NotFound` for unknown rooms, `NotMember` if the editor has not joined.
pub async fn apply_edit(
    state: &AppState,
    key: &RoomKey,
    client_id: ConnectionId,
    code: String,
    language: Option<Language>,
) -> Result<(), RoomError> {
    let shared = state.rooms.get(key).await?;
    let mut room = shared.lock().await;
    if !room.is_member(client_id) {
        return Err(RoomError::NotMember(key.clone()));
    }

    room.code = code;
    if let Some(language) = language {
        room.language = language;
    }
    room.touch();

    let update = CodeSnapshot { code: room.code.clone(), language: room.language };
    let event = match key.kind {
        RoomKind::Pair => ServerEvent::CodeUpdate(update),
        RoomKind::StudyGroup => ServerEvent::GroupCodeUpdate(update),
    };
    let delivered = broadcast(&room.participants, &event, Some(client_id));
    debug!(room = %key, %client_id, bytes = room.code.len(), delivered, "code updated");
    Ok(())
}

// =============================================================================
// CHAT / QUESTIONS
// =============================================================================

/// Append a chat message and broadcast it to every member, author included.
///
/// # Errors
///
/// `NotFound`, `NotMember`, or `EmptyText` for whitespace-only text.
pub async fn post_message(
    state: &AppState,
    group_id: &str,
    client_id: ConnectionId,
    text: String,
    username: &str,
) -> Result<ChatMessage, RoomError> {
    let key = RoomKey::study_group(group_id);
    if text.trim().is_empty() {
        return Err(RoomError::EmptyText);
    }

    let shared = state.rooms.get(&key).await?;
    let mut guard = shared.lock().await;
    let room = &mut *guard;
    let author = author_name(room, &key, client_id, username)?;
    room.touch();
    let Some(group) = room.group.as_mut() else {
        return Err(RoomError::NotFound(key));
    };

    let message = ChatMessage { username: author, text, timestamp: now_ms() };
    group.messages.push(message.clone());

    broadcast(&room.participants, &ServerEvent::NewMessage(message.clone()), None);
    debug!(room = %key, %client_id, count = group.messages.len(), "chat message posted");
    Ok(message)
}

/// Append a question and broadcast it to every member, author included.
///
/// # Errors
///
/// `NotFound`, `NotMember`, or `EmptyText` for whitespace-only text.
pub async fn post_question(
    state: &AppState,
    group_id: &str,
    client_id: ConnectionId,
    text: String,
    username: &str,
) -> Result<Question, RoomError> {
    let key = RoomKey::study_group(group_id);
    if text.trim().is_empty() {
        return Err(RoomError::EmptyText);
    }

    let shared = state.rooms.get(&key).await?;
    let mut guard = shared.lock().await;
    let room = &mut *guard;
    let author = author_name(room, &key, client_id, username)?;
    room.touch();
    let Some(group) = room.group.as_mut() else {
        return Err(RoomError::NotFound(key));
    };

    let question = Question { username: author, text, timestamp: now_ms() };
    group.questions.push(question.clone());

    broadcast(&room.participants, &ServerEvent::NewQuestion(question.clone()), None);
    debug!(room = %key, %client_id, count = group.questions.len(), "question posted");
    Ok(question)
}

// =============================================================================
// HELPERS
// =============================================================================

/// Snapshot of the room for a joining connection.
fn snapshot(room: &RoomState) -> ServerEvent {
    match &room.group {
        None => ServerEvent::SessionState(CodeSnapshot { code: room.code.clone(), language: room.language }),
        Some(group) => ServerEvent::GroupState(GroupSnapshot {
            code: room.code.clone(),
            language: room.language,
            group_name: group.name.clone(),
            messages: group.messages.clone(),
            questions: group.questions.clone(),
            users: room
                .participants
                .iter()
                .map(|p| UserName { name: p.name.clone() })
                .collect(),
        }),
    }
}

fn display_name(kind: RoomKind, client_id: ConnectionId, requested: Option<&str>) -> String {
    match (kind, requested.map(str::trim)) {
        (_, Some(name)) if !name.is_empty() => name.to_owned(),
        (RoomKind::Pair, _) => client_id.to_string(),
        (RoomKind::StudyGroup, _) => ANONYMOUS.to_owned(),
    }
}

/// Author for a log entry: the payload's username, else the member's name.
fn author_name(room: &RoomState, key: &RoomKey, client_id: ConnectionId, username: &str) -> Result<String, RoomError> {
    let Some(member) = room.participant(client_id) else {
        warn!(room = %key, %client_id, "post from non-member ignored");
        return Err(RoomError::NotMember(key.clone()));
    };
    let username = username.trim();
    if username.is_empty() {
        return Ok(member.name.clone());
    }
    Ok(username.to_owned())
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
