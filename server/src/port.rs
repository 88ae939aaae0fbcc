//! The abstract boundary between the engine and whatever transport is
//! actually moving bytes.
//!
//! Grounded on the teacher's `ServerMessage`/`GameMessage` channel-message
//! enums in `network.rs`: there, the network layer and the main loop talk
//! only through two closed message types. Here that same shape is promoted
//! to a typed port so the engine never needs to know a player id resolves
//! to a `SocketAddr`.

use shared::ServerMessage;

/// An inbound event, already resolved to the session that sent it.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Join { player_id: String, name: String, color: (f32, f32, f32) },
    Start,
    Input { player_id: String, direction: shared::Direction },
    Redraw { player_id: String },
    Heartbeat { player_id: String },
    Disconnect { player_id: String },
}

/// An outbound event the engine wants delivered. Addressing is always by
/// player id; the concrete transport resolves ids to sockets.
#[derive(Debug, Clone)]
pub enum OutboundEvent {
    ToOne { player_id: String, message: ServerMessage },
    ToAll { message: ServerMessage },
    ToAllExcept { player_id: String, message: ServerMessage },
}
