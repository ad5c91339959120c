//! Broadcast dispatcher: fan-out of one event to a room's participants.
//!
//! DESIGN
//! ======
//! Delivery is fire-and-forget: each recipient's outbound queue gets a
//! `try_send`, and a full or closed queue drops the event for that
//! recipient only. Callers hold the room lock while dispatching, so every
//! recipient sees a room's events in commit order.

use tracing::{debug, warn};

use crate::event::ServerEvent;
use crate::state::{ConnectionId, Participant};

/// Deliver `event` to every participant except `exclude`. Returns the
/// number of queues that accepted the event.
pub fn broadcast(participants: &[Participant], event: &ServerEvent, exclude: Option<ConnectionId>) -> usize {
    let mut delivered = 0;
    for participant in participants {
        if exclude == Some(participant.id) {
            continue;
        }
        if send_to(participant, event) {
            delivered += 1;
        }
    }
    debug!(event = event.name(), delivered, excluded = exclude.is_some(), "broadcast");
    delivered
}

/// Deliver `event` to a single participant.
pub fn send_to(participant: &Participant, event: &ServerEvent) -> bool {
    match participant.tx.try_send(event.clone()) {
        Ok(()) => true,
        Err(e) => {
            // Best-effort: a slow or gone client misses this event.
            warn!(client_id = %participant.id, event = event.name(), error = %e, "dropped outbound event");
            false
        }
    }
}

#[cfg(test)]
#[path = "broadcast_test.rs"]
mod tests;
