//! Axis-aligned geometry primitives for the arena.
//!
//! Every segment the engine ever creates is axis-aligned (either its two
//! endpoints share an X coordinate or share a Y coordinate). This module
//! leans on that invariant throughout: the fat bounding box of a segment,
//! and the line-to-line collision test, both assume it and do not handle
//! diagonal segments.

use crate::LINE_WIDTH;
use serde::{Deserialize, Serialize};

/// A point in field coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned segment from `start` to `end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// True if this segment's endpoints share an X or a Y coordinate.
    pub fn is_axis_aligned(&self) -> bool {
        self.start.x == self.end.x || self.start.y == self.end.y
    }

    /// True if this segment runs along the Y axis (constant X).
    pub fn is_vertical(&self) -> bool {
        self.start.x == self.end.x
    }

    fn length(&self) -> f64 {
        if self.is_vertical() {
            (self.end.y - self.start.y).abs()
        } else {
            (self.end.x - self.start.x).abs()
        }
    }
}

/// One of the four directions a head may travel. Segments it produces are
/// always axis-aligned by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    /// The direction a 180-degree turn from this one would face.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Unit step for this direction: (dx, dy) with +Y up, +X right.
    pub fn step(self) -> (f64, f64) {
        match self {
            Direction::Up => (0.0, 1.0),
            Direction::Down => (0.0, -1.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
        }
    }

    /// Whether `self` is a legal turn away from `current` (neither identical
    /// nor a reversal).
    pub fn is_valid_turn_from(self, current: Direction) -> bool {
        self != current && self != current.opposite()
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Aabb {
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }
}

/// The fat bounding box of a segment: its axis-aligned extent inflated by
/// `LINE_WIDTH` perpendicular to its own axis. This is the shape used for
/// both spatial partition membership and pairwise collision testing, since a
/// rendered trail has real thickness even though a `Segment` is a
/// zero-width line.
pub fn fat_aabb(segment: &Segment) -> Aabb {
    let (min_x, max_x) = if segment.start.x <= segment.end.x {
        (segment.start.x, segment.end.x)
    } else {
        (segment.end.x, segment.start.x)
    };
    let (min_y, max_y) = if segment.start.y <= segment.end.y {
        (segment.start.y, segment.end.y)
    } else {
        (segment.end.y, segment.start.y)
    };

    if segment.is_vertical() {
        Aabb {
            min_x: min_x - LINE_WIDTH,
            max_x: max_x + LINE_WIDTH,
            min_y,
            max_y,
        }
    } else {
        Aabb {
            min_x,
            max_x,
            min_y: min_y - LINE_WIDTH,
            max_y: max_y + LINE_WIDTH,
        }
    }
}

/// Tests two axis-aligned segments for collision via their fat bounding
/// boxes, returning the entry and exit points of the overlap region along
/// `a`'s direction of travel, or `None` if they don't touch.
///
/// `a` is treated as the moving segment (typically a head's travel slice
/// this sub-tick) and `b` as the stationary trail segment being tested
/// against. The returned `start` point is where `a` first enters `b`'s fat
/// box, used to snap a dying head's visible trail to the true point of
/// impact rather than its full, slightly-overshot travel distance.
pub fn line_to_line(a: &Segment, b: &Segment) -> Option<(Point, Point)> {
    let box_a = fat_aabb(a);
    let box_b = fat_aabb(b);

    if !box_a.overlaps(&box_b) {
        return None;
    }

    let overlap = Aabb {
        min_x: box_a.min_x.max(box_b.min_x),
        max_x: box_a.max_x.min(box_b.max_x),
        min_y: box_a.min_y.max(box_b.min_y),
        max_y: box_a.max_y.min(box_b.max_y),
    };

    // Pick the corner of the overlap region nearest a's start as the entry
    // point, and the opposite corner as the exit point, biased by a's
    // direction of travel along each axis.
    let (entry_x, exit_x) = if a.end.x >= a.start.x {
        (overlap.min_x, overlap.max_x)
    } else {
        (overlap.max_x, overlap.min_x)
    };
    let (entry_y, exit_y) = if a.end.y >= a.start.y {
        (overlap.min_y, overlap.max_y)
    } else {
        (overlap.max_y, overlap.min_y)
    };

    Some((Point::new(entry_x, entry_y), Point::new(exit_x, exit_y)))
}

/// Given a segment traversed at `speed` field-units/second starting at wall
/// clock `start_time_ms`, returns the wall-clock time at which `point` (which
/// must lie on the segment) was reached.
pub fn lerp_time(segment: &Segment, point: Point, start_time_ms: f64, speed: f64) -> f64 {
    let total_len = segment.length();
    if total_len == 0.0 {
        return start_time_ms;
    }
    let traveled = if segment.is_vertical() {
        (point.y - segment.start.y).abs()
    } else {
        (point.x - segment.start.x).abs()
    };
    let fraction = (traveled / total_len).clamp(0.0, 1.0);
    let duration_ms = (total_len / speed) * 1000.0;
    start_time_ms + fraction * duration_ms
}
