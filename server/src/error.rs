//! Error taxonomy for the boundary `main.rs` owns: socket setup and the
//! handshake framing around a join. Everything inside a tick is infallible
//! by construction (the engine never returns a `Result`); only I/O at the
//! process edge can actually fail.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to bind UDP socket on {addr}: {source}")]
    Bind { addr: String, #[source] source: std::io::Error },

    #[error("failed to send datagram to {addr}: {source}")]
    Send { addr: String, #[source] source: std::io::Error },

    #[error("malformed datagram from {addr}: {source}")]
    Decode { addr: String, #[source] source: bincode::Error },

    #[error("join handshake from {addr} named an unknown session id")]
    UnknownSession { addr: String },

    #[error("rejected join from {addr}: server is at max_players capacity")]
    ServerFull { addr: String },
}
