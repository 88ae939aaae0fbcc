//! Round lifecycle state machine: Idle -> Countdown -> Playing -> Idle.
//!
//! Grounded in the teacher's tick-oriented `GameState` (a single struct the
//! main loop consults and mutates each tick), generalized from "always
//! simulating" into the idle/countdown/playing machine an arena needs
//! between rounds.

use std::collections::HashSet;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Idle,
    Countdown,
    Playing,
}

#[derive(Debug)]
pub struct RoundManager {
    phase: RoundPhase,
    countdown_deadline: Option<Instant>,
    /// Players alive at the start of the tick currently being processed;
    /// used to attribute wins when every remaining player dies in the same
    /// tick.
    prev_alive: HashSet<String>,
}

impl RoundManager {
    pub fn new() -> Self {
        Self {
            phase: RoundPhase::Idle,
            countdown_deadline: None,
            prev_alive: HashSet::new(),
        }
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == RoundPhase::Idle
    }

    pub fn is_countdown(&self) -> bool {
        self.phase == RoundPhase::Countdown
    }

    pub fn is_playing(&self) -> bool {
        self.phase == RoundPhase::Playing
    }

    /// Begins the countdown. Caller is responsible for checking the
    /// `players >= 2` precondition and for respawning every player.
    pub fn start(&mut self, now: Instant, countdown: std::time::Duration) {
        self.phase = RoundPhase::Countdown;
        self.countdown_deadline = Some(now + countdown);
    }

    /// True exactly once, the first tick at or after the countdown
    /// deadline; transitions the phase to `Playing` as a side effect.
    pub fn poll_countdown_elapsed(&mut self, now: Instant) -> bool {
        match self.countdown_deadline {
            Some(deadline) if now >= deadline => {
                self.phase = RoundPhase::Playing;
                self.countdown_deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn record_alive(&mut self, alive: HashSet<String>) {
        self.prev_alive = alive;
    }

    pub fn prev_alive(&self) -> &HashSet<String> {
        &self.prev_alive
    }

    pub fn end_round(&mut self) {
        self.phase = RoundPhase::Idle;
        self.countdown_deadline = None;
        self.prev_alive.clear();
    }
}

impl Default for RoundManager {
    fn default() -> Self {
        Self::new()
    }
}
