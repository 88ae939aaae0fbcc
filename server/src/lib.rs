//! # Arena Server Library
//!
//! The authoritative server for the light-cycle arena: a tick-driven
//! simulation that owns every player's trail, detects collisions against a
//! per-player spatial partition, and streams incremental state to whatever
//! is on the other end of a Client Port.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! The server runs the one true copy of the game. Clients never predict or
//! roll back; they render whatever the engine decides happened. A tick is
//! the engine's only unit of time, and it always runs to completion before
//! anything is sent back out.
//!
//! ### Session Management
//! Handles the complete lifecycle of a connection: minting a session on
//! first contact, rebinding it on reconnect within the grace period, and
//! tearing it (and the player behind it) down once that grace period
//! expires without a `heartbeat`.
//!
//! ### Delta Transport
//! Each tick, every connected client receives only the segments of every
//! trail it hasn't already been sent, tracked via a per-(receiver, source)
//! watermark. A client-initiated `redraw` resets its watermarks to force a
//! full resend.
//!
//! ## Architecture Design
//!
//! ### Single-Writer Engine
//! [`engine::Engine`] is the only thing that ever mutates player state, and
//! it does so synchronously inside one tick. The network layer only ever
//! enqueues input or toggles a session's pending-deletion flag; it never
//! reaches into a player directly.
//!
//! ### UDP Transport
//! [`network::Server`] binds one UDP socket and splits receive, send, and
//! tick-drive duties across cooperating `tokio` tasks connected to the
//! engine purely by channel, so a slow or bursty peer can never stall a
//! tick.
//!
//! ## Module Organization
//!
//! - [`player`] — per-player kinematic and transport state.
//! - [`partition`] — the per-player spatial grid collision queries run against.
//! - [`round`] — the idle/countdown/playing round lifecycle state machine.
//! - [`engine`] — the tick scheduler and simulation step; the single writer.
//! - [`transport`] — per-client segment-delta diffing and watermark bookkeeping.
//! - [`port`] — the typed inbound/outbound event boundary between engine and transport.
//! - [`session`] — session-id/socket-address bookkeeping and reconnect/timeout handling.
//! - [`network`] — the concrete UDP + bincode transport behind the Client Port.
//! - [`error`] — the typed error taxonomy consumed only at the process boundary.
//!
//! ## Usage Example
//!
//! ```no_run
//! use server::network::Server;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), server::error::EngineError> {
//!     env_logger::init();
//!     let tick_duration = Duration::from_secs_f64(1.0 / 30.0);
//!     let mut server = Server::new("0.0.0.0:8080", tick_duration, 8).await?;
//!     server.run().await
//! }
//! ```

pub mod engine;
pub mod error;
pub mod network;
pub mod partition;
pub mod player;
pub mod port;
pub mod round;
pub mod session;
pub mod transport;
