//! Authoritative per-player state.
//!
//! Mirrors the teacher's `game::Player`/`client_manager::Client` split: the
//! kinematic state a tick mutates every sub-tick lives here, alongside the
//! transport bookkeeping (watermarks, pending redraw) that the delta
//! transport needs when this player is also acting as a connected receiver.

use crate::partition::Partition;
use shared::{Direction, Point, Segment, LINE_WIDTH};
use std::collections::{HashMap, VecDeque};
use std::time::Instant;

/// A queued direction input awaiting sub-tick admission.
#[derive(Debug, Clone, Copy)]
pub struct PendingInput {
    pub direction: Direction,
    pub received_at: Instant,
}

#[derive(Debug)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub color: (f32, f32, f32),
    pub score: u32,

    pub direction: Direction,
    pub segments: Vec<Segment>,
    pub dead: bool,

    pub pending_direction_inputs: VecDeque<PendingInput>,
    pub starting_direction: Option<Direction>,

    pub partitions: Partition,

    /// Per-peer watermark: how much of each *source* player's segment list
    /// this player (acting as the receiving client) has already been sent.
    pub last_sent_segment_indices: HashMap<String, usize>,
    pub pending_redraw: bool,
}

impl Player {
    pub fn new(id: String, name: String, color: (f32, f32, f32)) -> Self {
        Self {
            id,
            name,
            color,
            score: 0,
            direction: Direction::Right,
            segments: Vec::new(),
            dead: true,
            pending_direction_inputs: VecDeque::new(),
            starting_direction: None,
            partitions: Partition::new(),
            last_sent_segment_indices: HashMap::new(),
            pending_redraw: false,
        }
    }

    /// Resets all round-scoped state and seeds a fresh trail at `spawn`
    /// heading `direction`. Score and transport watermarks survive a
    /// respawn; everything else does not.
    pub fn respawn(&mut self, spawn: Point, direction: Direction) {
        self.direction = direction;
        self.dead = false;
        self.pending_direction_inputs.clear();
        self.starting_direction = None;
        self.partitions.clear();

        let (dx, dy) = direction.step();
        let seed_end = Point::new(spawn.x + dx * LINE_WIDTH, spawn.y + dy * LINE_WIDTH);
        let seed = Segment::new(spawn, seed_end);
        self.segments = vec![seed];
        self.partitions.insert(0, &seed);
    }

    pub fn queue_input(&mut self, direction: Direction, received_at: Instant) {
        self.pending_direction_inputs.push_back(PendingInput { direction, received_at });
    }

    /// Index of the live head segment.
    pub fn head_index(&self) -> usize {
        self.segments.len() - 1
    }

    pub fn head_end(&self) -> Point {
        self.segments.last().expect("live player has at least one segment").end
    }

    /// Scans the pending queue for the first input whose timestamp falls in
    /// `[window_start, window_end)` and whose direction is a legal turn.
    /// Drops every older entry (admitted or not) since it has been
    /// superseded by the passage of this sub-tick.
    pub fn admit_input(&mut self, window_start: Instant, window_end: Instant) -> Option<Direction> {
        let mut admitted = None;
        while let Some(front) = self.pending_direction_inputs.front() {
            if front.received_at >= window_end {
                break;
            }
            let input = self.pending_direction_inputs.pop_front().unwrap();
            if input.received_at < window_start {
                continue;
            }
            if input.direction.is_valid_turn_from(self.direction) {
                admitted = Some(input.direction);
                break;
            }
        }
        admitted
    }

    /// Performs the turn: pushes a new zero-length segment whose start
    /// point is offset from the current head's end by a `LINE_WIDTH` nub
    /// along both the new direction and the reverse of the old one, so
    /// perpendicular trail segments visually connect without a gap.
    pub fn add_segment(&mut self, new_direction: Direction) {
        let old_end = self.head_end();
        let (old_dx, old_dy) = self.direction.step();
        let (new_dx, new_dy) = new_direction.step();
        let start = Point::new(
            old_end.x + LINE_WIDTH * (new_dx - old_dx),
            old_end.y + LINE_WIDTH * (new_dy - old_dy),
        );
        let index = self.segments.len();
        let segment = Segment::new(start, start);
        self.segments.push(segment);
        self.partitions.insert(index, &segment);
        self.direction = new_direction;
    }

    /// Grows the head segment by `distance` along the current direction,
    /// returning the travel slice `(old_end, new_end)`.
    pub fn extend_head(&mut self, distance: f64) -> (Point, Point) {
        let (dx, dy) = self.direction.step();
        let index = self.head_index();
        let old_end = self.segments[index].end;
        let new_end = Point::new(old_end.x + dx * distance, old_end.y + dy * distance);
        self.segments[index].end = new_end;
        (old_end, new_end)
    }

    /// Snaps the head endpoint to `point`, used to stop a dying trail
    /// exactly at its true collision point rather than its full overshoot.
    pub fn snap_head(&mut self, point: Point) {
        let index = self.head_index();
        self.segments[index].end = point;
    }

    /// Records the current head's travel slice in the spatial partition.
    pub fn index_travel(&mut self, travel: Segment) {
        let index = self.head_index();
        self.partitions.insert(index, &travel);
    }
}
