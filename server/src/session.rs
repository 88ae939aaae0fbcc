//! Session bookkeeping: maps a `SocketAddr` to the durable player id a
//! client holds across reconnects, and tracks the grace period a dropped
//! connection gets before its player is actually removed.
//!
//! Grounded on the teacher's `ClientManager`: an id-keyed map plus an
//! addr-to-id index, `is_timed_out`/`check_timeouts` scanning `last_seen`.
//! The generalization here is the session token itself (a random string a
//! client can present later to `Reconnect` instead of the server simply
//! trusting whichever socket address shows up) and the two-phase removal
//! (`mark_pending_deletion` then `check_timeouts`) needed because a client
//! that drops its UDP socket sends no disconnect message at all.

use log::info;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub addr: SocketAddr,
    pub last_seen: Instant,
    pub pending_deletion: bool,
}

impl Session {
    fn new(id: String, addr: SocketAddr) -> Self {
        Self { id, addr, last_seen: Instant::now(), pending_deletion: false }
    }

    fn is_timed_out(&self, timeout: Duration) -> bool {
        self.pending_deletion && self.last_seen.elapsed() > timeout
    }
}

#[derive(Debug)]
pub struct SessionManager {
    sessions: HashMap<String, Session>,
    by_addr: HashMap<SocketAddr, String>,
    max_players: usize,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::with_capacity(usize::MAX)
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// A manager that refuses new sessions once `max_players` are bound,
    /// mirroring the teacher's `ClientManager::max_clients` cap.
    pub fn with_capacity(max_players: usize) -> Self {
        Self { sessions: HashMap::new(), by_addr: HashMap::new(), max_players }
    }

    pub fn is_full(&self) -> bool {
        self.sessions.len() >= self.max_players
    }

    /// Issues a fresh session token for a client connecting for the first
    /// time, bound to the socket address its packets arrive from. Returns
    /// `None` without registering anything if the server is already at
    /// `max_players`.
    pub fn bind_new(&mut self, addr: SocketAddr) -> Option<String> {
        if self.is_full() {
            return None;
        }
        let id: String = rand::thread_rng().sample_iter(&Alphanumeric).take(16).map(char::from).collect();
        info!("new session {} from {}", id, addr);
        self.sessions.insert(id.clone(), Session::new(id.clone(), addr));
        self.by_addr.insert(addr, id.clone());
        Some(id)
    }

    /// Rebinds an existing session to a new address, clearing the pending
    /// deletion flag a dropped connection may have set. Returns `false` if
    /// `session_id` is unknown.
    pub fn reconnect(&mut self, session_id: &str, addr: SocketAddr) -> bool {
        let Some(session) = self.sessions.get_mut(session_id) else { return false };
        self.by_addr.remove(&session.addr);
        session.addr = addr;
        session.last_seen = Instant::now();
        session.pending_deletion = false;
        self.by_addr.insert(addr, session_id.to_string());
        info!("session {} reconnected from {}", session_id, addr);
        true
    }

    /// A heartbeat refreshes `last_seen` and, per spec, cancels any pending
    /// removal — a client that resumes plain heartbeats after a `disconnect`
    /// without going through the `Reconnect` handshake still gets to stay.
    pub fn touch(&mut self, session_id: &str) {
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.last_seen = Instant::now();
            session.pending_deletion = false;
        }
    }

    /// Marks a session's connection as gone without removing the player it
    /// belongs to immediately, giving the client a grace period to
    /// reconnect and resume play.
    pub fn mark_pending_deletion(&mut self, session_id: &str) {
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.pending_deletion = true;
            session.last_seen = Instant::now();
        }
    }

    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<String> {
        self.by_addr.get(&addr).cloned()
    }

    pub fn addr_of(&self, session_id: &str) -> Option<SocketAddr> {
        self.sessions.get(session_id).map(|session| session.addr)
    }

    /// Returns the ids of every session whose grace period has expired,
    /// removing them from the manager as it goes. Callers are responsible
    /// for removing the corresponding player from the engine.
    pub fn check_timeouts(&mut self, timeout: Duration) -> Vec<String> {
        let timed_out: Vec<String> = self
            .sessions
            .values()
            .filter(|session| session.is_timed_out(timeout))
            .map(|session| session.id.clone())
            .collect();

        for id in &timed_out {
            self.remove(id);
        }
        timed_out
    }

    pub fn remove(&mut self, session_id: &str) {
        if let Some(session) = self.sessions.remove(session_id) {
            self.by_addr.remove(&session.addr);
            info!("session {} removed", session_id);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    #[test]
    fn bind_new_registers_addr_lookup() {
        let mut sessions = SessionManager::new();
        let id = sessions.bind_new(addr(9000)).unwrap();
        assert_eq!(sessions.find_by_addr(addr(9000)), Some(id));
    }

    #[test]
    fn bind_new_rejects_connections_past_capacity() {
        let mut sessions = SessionManager::with_capacity(1);
        assert!(sessions.bind_new(addr(9000)).is_some());
        assert!(sessions.bind_new(addr(9001)).is_none());
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn reconnect_moves_addr_binding() {
        let mut sessions = SessionManager::new();
        let id = sessions.bind_new(addr(9000)).unwrap();
        sessions.mark_pending_deletion(&id);

        assert!(sessions.reconnect(&id, addr(9001)));
        assert_eq!(sessions.find_by_addr(addr(9001)), Some(id.clone()));
        assert_eq!(sessions.find_by_addr(addr(9000)), None);
    }

    #[test]
    fn reconnect_with_unknown_id_fails() {
        let mut sessions = SessionManager::new();
        assert!(!sessions.reconnect("not-a-real-session", addr(9000)));
    }

    #[test]
    fn pending_deletion_is_required_before_timeout_applies() {
        let mut sessions = SessionManager::new();
        let id = sessions.bind_new(addr(9000));
        // Never marked pending_deletion, so it must never time out even
        // after an arbitrarily long duration has notionally elapsed.
        let timed_out = sessions.check_timeouts(Duration::from_secs(0));
        assert!(timed_out.is_empty());
        assert_eq!(sessions.len(), 1);
        let _ = id;
    }

    #[test]
    fn check_timeouts_removes_expired_pending_sessions() {
        let mut sessions = SessionManager::new();
        let id = sessions.bind_new(addr(9000)).unwrap();
        sessions.mark_pending_deletion(&id);

        let timed_out = sessions.check_timeouts(Duration::from_secs(0));
        assert_eq!(timed_out, vec![id]);
        assert!(sessions.is_empty());
    }
}
