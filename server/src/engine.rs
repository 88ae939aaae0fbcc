//! The authoritative tick engine: the single writer of all player state.
//!
//! The tick scheduler and simulation step (spec components E and F) live
//! together here because they share one invariant the teacher's
//! `process_inputs`/`update_physics` split also leans on: everything that
//! touches player state during a tick runs on one thread, in one fixed
//! order, to completion, before anything is sent back out over the wire.

use crate::player::Player;
use crate::port::{InboundEvent, OutboundEvent};
use crate::round::RoundManager;
use crate::transport;
use log::info;
use rand::Rng;
use shared::{
    line_to_line, Direction, GameSettings, PlayerInfo, Point, Segment, ServerMessage, ASPECT_RATIO,
    LINE_WIDTH, MIN_SPAWN_DIST, MOVE_SPEED, ROUND_START_DELAY_MS, SUB_TICK_RATE,
};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

pub struct Engine {
    players: HashMap<String, Player>,
    /// Stable visiting order (insertion order of each player's id), so a
    /// tick's outcome never depends on `HashMap` iteration order.
    order: Vec<String>,
    round: RoundManager,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            players: HashMap::new(),
            order: Vec::new(),
            round: RoundManager::new(),
        }
    }

    pub fn player_count(&self) -> usize {
        self.order.len()
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.players.contains_key(player_id)
    }

    /// Read-only access to a player's current state, for tests and
    /// diagnostics. The tick loop never reaches back in through this;
    /// mutation stays confined to the methods above.
    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.get(player_id)
    }

    pub fn round_phase(&self) -> crate::round::RoundPhase {
        self.round.phase()
    }

    /// Stable visiting order, exposed so the transport layer can resolve
    /// every connected player's address for a broadcast.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Routes a single resolved inbound event (join, start, input, redraw)
    /// to the matching handler. Heartbeat and disconnect never reach the
    /// engine: they are session-layer concerns handled directly by the
    /// network task that owns the `SessionManager`.
    pub fn handle_event(&mut self, event: InboundEvent, now: Instant) -> Vec<OutboundEvent> {
        match event {
            InboundEvent::Join { player_id, name, color } => self.handle_join(player_id, name, color),
            InboundEvent::Start => self.handle_start(now),
            InboundEvent::Input { player_id, direction } => {
                self.handle_input(&player_id, direction, now);
                Vec::new()
            }
            InboundEvent::Redraw { player_id } => {
                self.handle_redraw(&player_id);
                Vec::new()
            }
            InboundEvent::Heartbeat { .. } | InboundEvent::Disconnect { .. } => Vec::new(),
        }
    }

    /// Handles `join`: creates the player if this is a new id, sends the
    /// full handshake (settings, every existing player's identity and
    /// trail) to the newcomer, and announces the newcomer to everyone else.
    pub fn handle_join(&mut self, player_id: String, name: String, color: (f32, f32, f32)) -> Vec<OutboundEvent> {
        let mut events = Vec::new();

        if !self.players.contains_key(&player_id) {
            self.players.insert(player_id.clone(), Player::new(player_id.clone(), name.clone(), color));
            self.order.push(player_id.clone());
        }

        events.push(OutboundEvent::ToOne {
            player_id: player_id.clone(),
            message: ServerMessage::GameSettings(GameSettings {
                aspect_ratio: ASPECT_RATIO,
                line_width: LINE_WIDTH,
            }),
        });

        for existing_id in self.order.clone() {
            let existing = &self.players[&existing_id];
            events.push(OutboundEvent::ToOne {
                player_id: player_id.clone(),
                message: ServerMessage::ModifyPlayer(PlayerInfo {
                    id: existing.id.clone(),
                    name: existing.name.clone(),
                    color: existing.color,
                    score: existing.score,
                }),
            });
            if !existing.segments.is_empty() {
                events.push(OutboundEvent::ToOne {
                    player_id: player_id.clone(),
                    message: ServerMessage::GameState(vec![shared::PlayerSegments {
                        id: existing.id.clone(),
                        missing_segments: existing.segments.clone(),
                    }]),
                });
            }
        }
        if let Some(newcomer) = self.players.get_mut(&player_id) {
            for existing_id in &self.order {
                if existing_id == &player_id {
                    continue;
                }
                let watermark = self.players[existing_id].segments.len().saturating_sub(1);
                newcomer.last_sent_segment_indices.insert(existing_id.clone(), watermark);
            }
        }

        events.push(OutboundEvent::ToAllExcept {
            player_id: player_id.clone(),
            message: ServerMessage::ModifyPlayer(PlayerInfo { id: player_id, name, color, score: 0 }),
        });

        events
    }

    /// Handles `start`: requires at least two connected players and an idle
    /// round. Respawns every player and begins the countdown.
    pub fn handle_start(&mut self, now: Instant) -> Vec<OutboundEvent> {
        if !self.round.is_idle() || self.order.len() < 2 {
            return Vec::new();
        }

        let mut rng = rand::thread_rng();
        for id in &self.order {
            let player = self.players.get_mut(id).expect("id in order is always present");
            let spawn = random_spawn(&mut rng);
            let direction = random_direction(&mut rng);
            player.respawn(spawn, direction);
        }
        // Every player's trail was just wiped back down to a single seed
        // segment, so every receiver's watermark against every source is
        // stale; reset the lot the same way a redraw does.
        for player in self.players.values_mut() {
            transport::reset_watermarks(player);
        }
        self.round.start(now, Duration::from_millis(ROUND_START_DELAY_MS));

        vec![OutboundEvent::ToAll { message: ServerMessage::Starting }]
    }

    /// Handles `input`. During the countdown, an early input is remembered
    /// as the player's starting direction (overriding the random spawn
    /// heading once the round begins) and accepted unconditionally. Once
    /// playing, the input is queued for sub-tick admission.
    pub fn handle_input(&mut self, player_id: &str, direction: Direction, now: Instant) {
        let Some(player) = self.players.get_mut(player_id) else { return };
        if self.round.is_countdown() {
            player.starting_direction = Some(direction);
        } else if self.round.is_playing() {
            player.queue_input(direction, now);
        }
    }

    pub fn handle_redraw(&mut self, player_id: &str) {
        if let Some(player) = self.players.get_mut(player_id) {
            transport::reset_watermarks(player);
        }
    }

    /// Handles `disconnect`/session-timeout removal: drops the player
    /// entirely and tells every remaining client to forget it.
    pub fn handle_remove(&mut self, player_id: &str) -> Vec<OutboundEvent> {
        if self.players.remove(player_id).is_none() {
            return Vec::new();
        }
        self.order.retain(|id| id != player_id);
        for player in self.players.values_mut() {
            player.last_sent_segment_indices.remove(player_id);
        }
        vec![OutboundEvent::ToAll { message: ServerMessage::Remove(player_id.to_string()) }]
    }

    /// Runs one full tick: the countdown-to-playing transition, every
    /// sub-tick of simulation if playing, and always the per-client delta
    /// transport.
    pub fn tick(&mut self, now: Instant) -> Vec<OutboundEvent> {
        let mut events = Vec::new();

        if self.round.is_countdown() && self.round.poll_countdown_elapsed(now) {
            self.apply_starting_directions();
        }

        if self.round.is_playing() {
            events.extend(self.run_playing_tick(now));
        }

        events.extend(self.build_transport_events());
        events
    }

    fn apply_starting_directions(&mut self) {
        for id in self.order.clone() {
            let player = self.players.get_mut(&id).unwrap();
            if let Some(direction) = player.starting_direction.take() {
                let spawn = player.segments[0].start;
                player.respawn(spawn, direction);
            }
        }
    }

    fn run_playing_tick(&mut self, tick_end: Instant) -> Vec<OutboundEvent> {
        let sub_tick = Duration::from_secs_f64(shared::sub_tick_millis() / 1000.0);
        let tick_start = tick_end - sub_tick * SUB_TICK_RATE;

        let alive_at_tick_start: HashSet<String> = self
            .order
            .iter()
            .filter(|id| !self.players[*id].dead)
            .cloned()
            .collect();
        self.round.record_alive(alive_at_tick_start);

        'ticks: for sub in 0..SUB_TICK_RATE {
            let window_start = tick_start + sub_tick * sub;
            let window_end = window_start + sub_tick;

            for id in self.order.clone() {
                self.step_player(&id, window_start, window_end);
            }

            let alive_ids: HashSet<String> = self
                .order
                .iter()
                .filter(|id| !self.players[*id].dead)
                .cloned()
                .collect();
            if alive_ids.len() <= 1 {
                break 'ticks;
            }
            // Per §4.F: prevAlive is re-recorded after every sub-tick that
            // doesn't end the round, so a simultaneous death on a *later*
            // sub-tick of this same tick attributes wins only to players who
            // were still alive entering that sub-tick, not to a player who
            // had already died in an earlier sub-tick of this tick.
            self.round.record_alive(alive_ids);
        }

        let alive = self.order.iter().filter(|id| !self.players[*id].dead).count();
        if alive <= 1 {
            self.finish_round()
        } else {
            Vec::new()
        }
    }

    /// Advances one player through admission, extension, boundary, and
    /// collision testing for a single sub-tick window. The player is
    /// temporarily removed from the map so the rest of `players` can be
    /// borrowed immutably for collision queries.
    fn step_player(&mut self, id: &str, window_start: Instant, window_end: Instant) {
        let Some(mut player) = self.players.remove(id) else { return };
        if player.dead {
            self.players.insert(id.to_string(), player);
            return;
        }

        if let Some(direction) = player.admit_input(window_start, window_end) {
            player.add_segment(direction);
        }

        let distance = MOVE_SPEED * shared::sub_tick_millis() / 1000.0;
        let (old_end, new_end) = player.extend_head(distance);

        if !in_bounds(new_end) {
            player.dead = true;
        } else {
            let travel = Segment::new(old_end, new_end);
            let head_index = player.head_index();

            let self_hit = first_collision(&travel, &player.partitions, &player.segments, Some(head_index));
            let hit = self_hit.or_else(|| {
                self.players.values().find_map(|other| {
                    first_collision(&travel, &other.partitions, &other.segments, None)
                })
            });

            if let Some(point) = hit {
                player.dead = true;
                player.snap_head(point);
            }
        }
        // Index the final travel slice regardless of why the player stopped
        // moving (survived, hit a boundary, or collided): other players'
        // collision queries this same sub-tick must still see it (§4.F step 5).
        player.index_travel(Segment::new(old_end, player.head_end()));

        self.players.insert(id.to_string(), player);
    }

    fn finish_round(&mut self) -> Vec<OutboundEvent> {
        let mut events = Vec::new();
        let alive: Vec<String> = self.order.iter().filter(|id| !self.players[*id].dead).cloned().collect();

        let winners: Vec<String> = if alive.len() == 1 {
            alive
        } else {
            self.round.prev_alive().iter().cloned().collect()
        };

        for winner_id in &winners {
            if let Some(player) = self.players.get_mut(winner_id) {
                player.score += 1;
                events.push(OutboundEvent::ToAll {
                    message: ServerMessage::ModifyPlayer(PlayerInfo {
                        id: player.id.clone(),
                        name: player.name.clone(),
                        color: player.color,
                        score: player.score,
                    }),
                });
            }
        }

        info!("round over, winners: {:?}", winners);
        events.push(OutboundEvent::ToAll { message: ServerMessage::RoundOver });
        self.round.end_round();
        events
    }

    fn build_transport_events(&mut self) -> Vec<OutboundEvent> {
        let mut events = Vec::new();
        let order = self.order.clone();
        for id in &order {
            let Some(mut receiver) = self.players.remove(id) else { continue };
            let deltas = transport::deltas_for_receiver(&mut receiver, &self.players, &order);
            receiver.pending_redraw = false;
            self.players.insert(id.clone(), receiver);

            if !deltas.is_empty() {
                events.push(OutboundEvent::ToOne {
                    player_id: id.clone(),
                    message: ServerMessage::GameState(deltas),
                });
            }
        }
        events
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

fn in_bounds(point: Point) -> bool {
    point.x >= -ASPECT_RATIO && point.x <= ASPECT_RATIO && point.y >= -1.0 && point.y <= 1.0
}

fn random_spawn(rng: &mut impl Rng) -> Point {
    let margin = MIN_SPAWN_DIST;
    let x = rng.gen_range((-ASPECT_RATIO + margin)..(ASPECT_RATIO - margin));
    let y = rng.gen_range((-1.0 + margin)..(1.0 - margin));
    Point::new(x, y)
}

fn random_direction(rng: &mut impl Rng) -> Direction {
    match rng.gen_range(0..4) {
        0 => Direction::Up,
        1 => Direction::Right,
        2 => Direction::Down,
        _ => Direction::Left,
    }
}

/// Tests `travel` against every candidate segment a partition's cells
/// report, skipping `skip_head_index`'s two most recent segments when
/// present (the segment a player just turned out of, and its own head).
fn first_collision(
    travel: &Segment,
    partitions: &crate::partition::Partition,
    segments: &[Segment],
    skip_head_index: Option<usize>,
) -> Option<Point> {
    let candidates = partitions.candidates_touching(travel);
    for idx in candidates {
        if let Some(head_index) = skip_head_index {
            if head_index.saturating_sub(idx) < 2 {
                continue;
            }
        }
        if idx >= segments.len() {
            continue;
        }
        if let Some((start, _end)) = line_to_line(travel, &segments[idx]) {
            return Some(start);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_creates_player_and_announces_to_others() {
        let mut engine = Engine::new();
        let events = engine.handle_join("p1".to_string(), "alice".to_string(), (1.0, 0.0, 0.0));
        assert!(engine.contains("p1"));
        assert!(events.iter().any(|e| matches!(e, OutboundEvent::ToOne { message: ServerMessage::GameSettings(_), .. })));

        let events2 = engine.handle_join("p2".to_string(), "bob".to_string(), (0.0, 1.0, 0.0));
        assert!(events2.iter().any(|e| matches!(e, OutboundEvent::ToAllExcept { player_id, .. } if player_id == "p2")));
    }

    #[test]
    fn start_requires_two_players() {
        let mut engine = Engine::new();
        engine.handle_join("p1".to_string(), "a".to_string(), (1.0, 0.0, 0.0));
        let events = engine.handle_start(Instant::now());
        assert!(events.is_empty());
        assert!(engine.round.is_idle());
    }

    #[test]
    fn start_with_two_players_begins_countdown() {
        let mut engine = Engine::new();
        engine.handle_join("p1".to_string(), "a".to_string(), (1.0, 0.0, 0.0));
        engine.handle_join("p2".to_string(), "b".to_string(), (0.0, 1.0, 0.0));
        let events = engine.handle_start(Instant::now());
        assert!(matches!(events[0], OutboundEvent::ToAll { message: ServerMessage::Starting }));
        assert!(engine.round.is_countdown());
    }

    #[test]
    fn remove_drops_player_and_broadcasts() {
        let mut engine = Engine::new();
        engine.handle_join("p1".to_string(), "a".to_string(), (1.0, 0.0, 0.0));
        let events = engine.handle_remove("p1");
        assert!(!engine.contains("p1"));
        assert!(matches!(&events[0], OutboundEvent::ToAll { message: ServerMessage::Remove(id) } if id == "p1"));
    }

    /// A travel slice that only touches the segment a head just turned out
    /// of (`headIndex - segIdx < 2`) must not register as a self-hit, per
    /// §4.F step 4. Once that same segment is two or more indices behind the
    /// head, it becomes a live collision target again.
    #[test]
    fn first_collision_skips_the_two_most_recent_segments() {
        let seg_prev = Segment::new(Point::new(0.0, 0.0), Point::new(0.05, 0.0));
        let segments = vec![seg_prev];
        let mut partitions = crate::partition::Partition::new();
        partitions.insert(0, &segments[0]);

        let travel = Segment::new(Point::new(0.02, 0.05), Point::new(0.02, -0.05));

        assert!(first_collision(&travel, &partitions, &segments, Some(1)).is_none());
        assert!(first_collision(&travel, &partitions, &segments, Some(2)).is_some());
    }

    /// A travel slice re-crossing a segment from several turns earlier in
    /// the same trail is a genuine self-collision: this is the geometric
    /// shape a tight turning sequence like the self-collision scenario in
    /// the design notes eventually produces.
    #[test]
    fn first_collision_detects_a_re_crossed_earlier_segment() {
        let seg0 = Segment::new(Point::new(0.0, 0.0), Point::new(0.1, 0.0));
        let seg1 = Segment::new(Point::new(0.1, 0.0), Point::new(0.1, 0.1));
        let seg2 = Segment::new(Point::new(0.1, 0.1), Point::new(0.0, 0.1));
        let segments = vec![seg0, seg1, seg2];
        let mut partitions = crate::partition::Partition::new();
        for (i, seg) in segments.iter().enumerate() {
            partitions.insert(i, seg);
        }

        // Heading straight down from inside the loop, back through seg0's
        // footprint at x = 0.
        let travel = Segment::new(Point::new(0.0, 0.05), Point::new(0.0, -0.01));
        let hit = first_collision(&travel, &partitions, &segments, Some(3));
        assert!(hit.is_some());
    }

    /// §4.F step 5 runs unconditionally: even a player who dies by leaving
    /// the field this sub-tick must have its final travel slice indexed, so
    /// another player's collision query this same sub-tick can still see it.
    #[test]
    fn boundary_death_still_indexes_the_final_travel_slice() {
        let mut engine = Engine::new();
        engine.handle_join("p1".to_string(), "a".to_string(), (1.0, 0.0, 0.0));
        engine.handle_join("p2".to_string(), "b".to_string(), (0.0, 1.0, 0.0));

        {
            let p1 = engine.players.get_mut("p1").unwrap();
            p1.respawn(Point::new(0.0, 0.999), Direction::Up);
            let idx = p1.head_index();
            p1.segments[idx].end = Point::new(0.0, 0.999);
        }
        engine.players.get_mut("p2").unwrap().respawn(Point::new(1.0, -0.9), Direction::Right);

        engine.run_playing_tick(Instant::now());

        let p1 = &engine.players["p1"];
        assert!(p1.dead);
        let head = p1.segments.last().unwrap();
        assert!(
            p1.partitions.candidates_touching(head).contains(&p1.head_index()),
            "the dying head's final slice must still be indexed"
        );
    }

    /// The simultaneous-death tie policy (DESIGN.md open question 1):
    /// everyone alive at the start of the tick in which the round ends gets
    /// a score increment when nobody survives the tick.
    #[test]
    fn simultaneous_death_awards_every_player_alive_at_tick_start() {
        let mut engine = Engine::new();
        engine.handle_join("p1".to_string(), "a".to_string(), (1.0, 0.0, 0.0));
        engine.handle_join("p2".to_string(), "b".to_string(), (0.0, 1.0, 0.0));
        engine.players.get_mut("p1").unwrap().respawn(Point::new(-0.1, 0.0), Direction::Right);
        engine.players.get_mut("p2").unwrap().respawn(Point::new(0.1, 0.0), Direction::Left);
        engine.players.get_mut("p1").unwrap().dead = true;
        engine.players.get_mut("p2").unwrap().dead = true;
        engine.round.record_alive(["p1".to_string(), "p2".to_string()].into_iter().collect());

        let events = engine.finish_round();

        assert_eq!(engine.players["p1"].score, 1);
        assert_eq!(engine.players["p2"].score, 1);
        assert!(engine.round.is_idle());
        assert!(events.iter().any(|e| matches!(e, OutboundEvent::ToAll { message: ServerMessage::RoundOver })));
        let modify_count = events
            .iter()
            .filter(|e| matches!(e, OutboundEvent::ToAll { message: ServerMessage::ModifyPlayer(_) }))
            .count();
        assert_eq!(modify_count, 2);
    }

    /// Regression test for the per-sub-tick `prevAlive` update (§4.F): a
    /// player who already died in an earlier sub-tick of a tick must not be
    /// credited with a win just because the round happens to end later in
    /// that same tick.
    #[test]
    fn prev_alive_excludes_a_player_that_already_died_earlier_in_the_same_tick() {
        let mut engine = Engine::new();
        engine.handle_join("p1".to_string(), "a".to_string(), (1.0, 0.0, 0.0));
        engine.handle_join("p2".to_string(), "b".to_string(), (0.0, 1.0, 0.0));
        engine.handle_join("p3".to_string(), "c".to_string(), (0.0, 0.0, 1.0));

        // p1 is one sub-tick's travel (0.005 field units) away from the
        // boundary: it dies in sub-tick 0 of the upcoming tick.
        {
            let p1 = engine.players.get_mut("p1").unwrap();
            p1.respawn(Point::new(0.0, 0.999), Direction::Up);
            let idx = p1.head_index();
            p1.segments[idx].end = Point::new(0.0, 0.999);
        }
        // p2 and p3 are two sub-ticks' travel from the same boundary: both
        // stay in bounds through sub-tick 0, then both exit simultaneously
        // in sub-tick 1.
        for (id, x) in [("p2", 0.5), ("p3", -0.5)] {
            let p = engine.players.get_mut(id).unwrap();
            p.respawn(Point::new(x, 0.991), Direction::Up);
            let idx = p.head_index();
            p.segments[idx].end = Point::new(x, 0.991);
        }

        let events = engine.run_playing_tick(Instant::now());

        assert!(engine.players["p1"].dead);
        assert!(engine.players["p2"].dead);
        assert!(engine.players["p3"].dead);

        assert_eq!(engine.players["p1"].score, 0, "p1 died a sub-tick early and must not be attributed a win");
        assert_eq!(engine.players["p2"].score, 1);
        assert_eq!(engine.players["p3"].score, 1);
        assert!(events.iter().any(|e| matches!(e, OutboundEvent::ToAll { message: ServerMessage::RoundOver })));
    }

    #[test]
    fn sole_survivor_is_the_only_winner() {
        let mut engine = Engine::new();
        engine.handle_join("p1".to_string(), "a".to_string(), (1.0, 0.0, 0.0));
        engine.handle_join("p2".to_string(), "b".to_string(), (0.0, 1.0, 0.0));
        engine.players.get_mut("p1").unwrap().respawn(Point::new(0.0, 0.0), Direction::Right);
        engine.players.get_mut("p2").unwrap().respawn(Point::new(0.0, 0.5), Direction::Right);
        engine.players.get_mut("p2").unwrap().dead = true;
        engine.round.record_alive(["p1".to_string(), "p2".to_string()].into_iter().collect());

        engine.finish_round();

        assert_eq!(engine.players["p1"].score, 1);
        assert_eq!(engine.players["p2"].score, 0);
    }
}
