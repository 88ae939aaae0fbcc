//! # Arena Shared Library
//!
//! This crate contains all data shared between the authoritative server and
//! anything that speaks its wire protocol: geometry primitives, tuning
//! constants, and the message types exchanged over a Client Port.
//!
//! ## Core Components
//!
//! ### Tuning Constants
//! Field dimensions and timing parameters that every consumer of the wire
//! protocol must agree on: aspect ratio, line width, move speed, tick rate,
//! spatial partition resolution, and the grace-period durations around round
//! start and session timeout.
//!
//! ### Geometry (`geometry`)
//! Axis-aligned points, segments, directions, and the fat-line collision
//! primitive the engine runs every sub-tick.
//!
//! ### Network Protocol (`protocol`)
//! The complete message set crossing a Client Port in either direction,
//! encoded with `serde` for transport via `bincode`.
//!
//! ## Design Philosophy
//!
//! ### Determinism
//! Every type here is a plain data value; nothing in this crate owns a clock,
//! a socket, or any other source of nondeterminism. The engine is the only
//! thing that decides when time advances.
//!
//! ### Serialization
//! All wire types implement `Serialize`/`Deserialize` for binary encoding via
//! `bincode`, keeping datagrams small enough to fit the per-tick delta budget.

pub mod geometry;
pub mod protocol;

pub use geometry::{fat_aabb, line_to_line, Aabb, Direction, Point, Segment};
pub use protocol::{
    ClientMessage, GameSettings, HelloRequest, PlayerInfo, PlayerSegments, ServerMessage,
};

/// Half-width of the field along X. The playable field spans
/// `[-ASPECT_RATIO, ASPECT_RATIO]` on X and `[-1.0, 1.0]` on Y.
pub const ASPECT_RATIO: f64 = 1.5;

/// Perpendicular half-thickness used to inflate a segment into its fat
/// bounding box for both partition membership and line-to-line collision.
pub const LINE_WIDTH: f64 = 0.002;

/// Head travel speed, in field units per second.
pub const MOVE_SPEED: f64 = 0.3;

/// Ticks per second. The scheduler runs at this rate whenever a round is
/// being played (and idles at the same rate between rounds to service
/// redraw requests).
pub const TICK_RATE: u32 = 30;

/// Sub-ticks per tick. Splitting a tick into finer windows lets a player
/// queue more than one turn between outbound broadcasts without changing how
/// often state is sent.
pub const SUB_TICK_RATE: u32 = 2;

/// Cells per axis in each player's spatial partition grid.
pub const NUM_PARTITIONS: usize = 10;

/// Minimum distance a freshly spawned head must keep from every field edge.
pub const MIN_SPAWN_DIST: f64 = 0.1;

/// Delay between `start` being accepted and the round becoming `Playing`,
/// in milliseconds.
pub const ROUND_START_DELAY_MS: u64 = 3000;

/// How long a disconnected session is kept alive awaiting reconnect before
/// its player is removed, in milliseconds.
pub const SESSION_TIMEOUT_MS: u64 = 3000;

/// Expected interval between client heartbeats, in milliseconds. Advisory
/// only; the server acts solely on `SESSION_TIMEOUT_MS`.
pub const HEARTBEAT_INTERVAL_MS: u64 = 1000;

/// Duration of a single sub-tick window, in milliseconds.
pub fn sub_tick_millis() -> f64 {
    1000.0 / (TICK_RATE as f64 * SUB_TICK_RATE as f64)
}
