//! Wire protocol exchanged over a Client Port.
//!
//! Every variant here is carried in exactly one direction. `ClientMessage`
//! travels inbound (client to server); `ServerMessage` travels outbound.
//! Both are encoded with `bincode` for transport, the same codec choice the
//! rest of this workspace's network layer uses throughout.

use crate::geometry::{Direction, Segment};
use serde::{Deserialize, Serialize};

/// Handshake payload carried by the inbound `join` event. Either names an
/// existing session to reconnect to, or asks for a brand new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HelloRequest {
    Reconnect { session_id: String },
    NewSession { username: String, color: (f32, f32, f32) },
}

/// Inbound events, each implicitly scoped to the session that sent them by
/// the Client Port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientMessage {
    Join(HelloRequest),
    Start,
    Input(Direction),
    Redraw,
    Heartbeat,
    Disconnect,
}

/// Settings a client needs once, at join time, to interpret subsequent
/// `game_state` deltas correctly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GameSettings {
    pub aspect_ratio: f64,
    pub line_width: f64,
}

/// Identity and score snapshot for one player, broadcast whenever any of
/// these fields changes (join, rename, or score increment).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: String,
    pub name: String,
    pub color: (f32, f32, f32),
    pub score: u32,
}

/// The segments of one player's trail a particular client has not yet seen,
/// as produced by the delta transport (see `server::transport`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSegments {
    pub id: String,
    pub missing_segments: Vec<Segment>,
}

/// Outbound events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerMessage {
    Session(String),
    GameSettings(GameSettings),
    ModifyPlayer(PlayerInfo),
    GameState(Vec<PlayerSegments>),
    Starting,
    RoundOver,
    Remove(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    #[test]
    fn client_message_join_roundtrips() {
        let msg = ClientMessage::Join(HelloRequest::NewSession {
            username: "p1".to_string(),
            color: (1.0, 0.0, 0.0),
        });
        let encoded = bincode::serialize(&msg).unwrap();
        let decoded: ClientMessage = bincode::deserialize(&encoded).unwrap();
        match decoded {
            ClientMessage::Join(HelloRequest::NewSession { username, color }) => {
                assert_eq!(username, "p1");
                assert_eq!(color, (1.0, 0.0, 0.0));
            }
            _ => panic!("wrong variant after roundtrip"),
        }
    }

    #[test]
    fn client_message_reconnect_roundtrips() {
        let msg = ClientMessage::Join(HelloRequest::Reconnect {
            session_id: "abc123".to_string(),
        });
        let encoded = bincode::serialize(&msg).unwrap();
        let decoded: ClientMessage = bincode::deserialize(&encoded).unwrap();
        match decoded {
            ClientMessage::Join(HelloRequest::Reconnect { session_id }) => {
                assert_eq!(session_id, "abc123");
            }
            _ => panic!("wrong variant after roundtrip"),
        }
    }

    #[test]
    fn client_message_input_roundtrips() {
        let msg = ClientMessage::Input(Direction::Left);
        let encoded = bincode::serialize(&msg).unwrap();
        let decoded: ClientMessage = bincode::deserialize(&encoded).unwrap();
        match decoded {
            ClientMessage::Input(dir) => assert_eq!(dir, Direction::Left),
            _ => panic!("wrong variant after roundtrip"),
        }
    }

    #[test]
    fn server_message_game_state_roundtrips() {
        let msg = ServerMessage::GameState(vec![PlayerSegments {
            id: "p1".to_string(),
            missing_segments: vec![Segment::new(Point::new(0.0, 0.0), Point::new(1.0, 0.0))],
        }]);
        let encoded = bincode::serialize(&msg).unwrap();
        let decoded: ServerMessage = bincode::deserialize(&encoded).unwrap();
        match decoded {
            ServerMessage::GameState(players) => {
                assert_eq!(players.len(), 1);
                assert_eq!(players[0].id, "p1");
                assert_eq!(players[0].missing_segments.len(), 1);
            }
            _ => panic!("wrong variant after roundtrip"),
        }
    }

    #[test]
    fn server_message_modify_player_roundtrips() {
        let msg = ServerMessage::ModifyPlayer(PlayerInfo {
            id: "p1".to_string(),
            name: "alice".to_string(),
            color: (0.2, 0.4, 0.6),
            score: 3,
        });
        let encoded = bincode::serialize(&msg).unwrap();
        let decoded: ServerMessage = bincode::deserialize(&encoded).unwrap();
        match decoded {
            ServerMessage::ModifyPlayer(info) => {
                assert_eq!(info.id, "p1");
                assert_eq!(info.score, 3);
            }
            _ => panic!("wrong variant after roundtrip"),
        }
    }

    #[test]
    fn unit_variants_roundtrip() {
        for msg in [ServerMessage::Starting, ServerMessage::RoundOver] {
            let encoded = bincode::serialize(&msg).unwrap();
            let _decoded: ServerMessage = bincode::deserialize(&encoded).unwrap();
        }
        for msg in [ClientMessage::Start, ClientMessage::Redraw, ClientMessage::Heartbeat, ClientMessage::Disconnect] {
            let encoded = bincode::serialize(&msg).unwrap();
            let _decoded: ClientMessage = bincode::deserialize(&encoded).unwrap();
        }
    }
}
