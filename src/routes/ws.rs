//! WebSocket handler: realtime event relay.
//!
//! DESIGN
//! ======
//! On upgrade, generates a connection id and enters a `select!` loop:
//! - Incoming client events → decode + dispatch to the room service
//! - Events queued by room fan-out → forward to the socket
//!
//! The room service never writes to sockets; every outbound event, the join
//! snapshot included, travels through the connection's bounded queue. That
//! keeps per-connection ordering identical to room commit order.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → allocate queue, log connect
//! 2. Client sends events → dispatch → room service mutates and fans out
//! 3. Close or socket error → leave the current room → log disconnect

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::event::{self, ClientEvent, ServerEvent};
use crate::services::room::{self, RoomError};
use crate::state::{AppState, ConnectionId, RoomKey};

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4();
    let (client_tx, mut client_rx) = mpsc::channel::<ServerEvent>(state.queue_capacity);

    info!(%client_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        process_inbound_text(&state, client_id, &client_tx, text.as_str()).await;
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(event) = client_rx.recv() => {
                if send_event(&mut socket, &event).await.is_err() {
                    break;
                }
            }
        }
    }

    room::leave(&state, client_id).await;
    let joined = state.members.len().await;
    info!(%client_id, joined, "ws: client disconnected");
}

// =============================================================================
// EVENT DISPATCH
// =============================================================================

/// Decode and apply one inbound text frame. Returns `true` if the event was
/// applied, `false` if it was malformed or rejected (both are logged and
/// otherwise ignored).
async fn process_inbound_text(
    state: &AppState,
    client_id: ConnectionId,
    client_tx: &mpsc::Sender<ServerEvent>,
    text: &str,
) -> bool {
    let event = match event::decode(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(%client_id, error = %e, "ws: malformed inbound event");
            return false;
        }
    };

    match dispatch_event(state, client_id, client_tx, event).await {
        Ok(()) => true,
        Err(e) => {
            warn!(%client_id, error = %e, code = crate::error::ErrorCode::error_code(&e), "ws: event rejected");
            false
        }
    }
}

async fn dispatch_event(
    state: &AppState,
    client_id: ConnectionId,
    client_tx: &mpsc::Sender<ServerEvent>,
    event: ClientEvent,
) -> Result<(), RoomError> {
    match event {
        ClientEvent::JoinPairSession(session_id) => {
            room::join(state, RoomKey::pair(session_id), client_id, None, client_tx.clone()).await;
            Ok(())
        }
        ClientEvent::JoinStudyGroup(join) => {
            let key = RoomKey::study_group(join.group_id());
            room::join(state, key, client_id, join.username(), client_tx.clone()).await;
            Ok(())
        }
        ClientEvent::CodeChange(change) => {
            let key = RoomKey::pair(change.session_id);
            room::apply_edit(state, &key, client_id, change.code, change.language).await
        }
        ClientEvent::GroupCodeChange(change) => {
            let key = RoomKey::study_group(change.group_id);
            room::apply_edit(state, &key, client_id, change.code, change.language).await
        }
        ClientEvent::SendMessage(msg) => {
            room::post_message(state, &msg.group_id, client_id, msg.message, &msg.username)
                .await
                .map(|_| ())
        }
        ClientEvent::AddQuestion(q) => {
            room::post_question(state, &q.group_id, client_id, q.question, &q.username)
                .await
                .map(|_| ())
        }
    }
}

// =============================================================================
// OUTBOUND
// =============================================================================

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), ()> {
    let json = match event::encode(event) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize event");
            return Err(());
        }
    };
    debug!(event = event.name(), "ws: send event");
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
