//! Per-client delta transport.
//!
//! Grounded on the teacher's `broadcast_game_state` (snapshot the
//! authoritative state, build one packet, send to everyone), generalized so
//! each receiver gets only the segments it hasn't seen yet, tracked via a
//! watermark stored on the receiving player itself.

use crate::player::Player;
use shared::PlayerSegments;
use std::collections::HashMap;

/// Builds one `PlayerSegments` delta per source player for a single
/// receiving client, advancing that client's watermarks as it goes.
///
/// The watermark advances to `len - 1`, not `len`: the live head segment is
/// still growing, so it is deliberately re-sent (enlarged) on the next
/// delta rather than considered fully delivered.
pub fn deltas_for_receiver(receiver: &mut Player, players: &HashMap<String, Player>, order: &[String]) -> Vec<PlayerSegments> {
    let mut out = Vec::new();
    for id in order {
        let source = match players.get(id) {
            Some(p) => p,
            None => continue,
        };
        if source.segments.is_empty() {
            continue;
        }
        let watermark = *receiver.last_sent_segment_indices.get(id).unwrap_or(&0);
        if watermark >= source.segments.len() {
            continue;
        }
        let missing_segments = source.segments[watermark..].to_vec();
        if !missing_segments.is_empty() {
            out.push(PlayerSegments { id: id.clone(), missing_segments });
        }
        let new_watermark = source.segments.len() - 1;
        if new_watermark > watermark {
            receiver.last_sent_segment_indices.insert(id.clone(), new_watermark);
        }
    }
    out
}

/// Resets every watermark a client holds, causing the next delta it
/// receives to contain every player's full trail.
pub fn reset_watermarks(receiver: &mut Player) {
    receiver.last_sent_segment_indices.clear();
    receiver.pending_redraw = true;
}
