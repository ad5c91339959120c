//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own room state, fan-out, and the remote code runner so
//! route handlers can stay focused on protocol translation.

pub mod broadcast;
pub mod executor;
pub mod membership;
pub mod registry;
pub mod room;
