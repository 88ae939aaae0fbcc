//! # Server Network Layer
//!
//! Wires a UDP socket to the authoritative [`Engine`]. Grounded directly on
//! the teacher's receiver/sender/timeout-checker task split and its
//! `tokio::select!` main loop, generalized for a single-writer engine: the
//! engine and the session table are owned exclusively by the main loop
//! task, so neither is wrapped in a lock. The only state two threads ever
//! touch is the unbounded channels connecting them.
//!
//! ## Packet Flow
//!
//! 1. **Incoming**: UDP datagram -> decode -> forward to main loop -> resolve
//!    session -> dispatch to the engine.
//! 2. **Outgoing**: engine's [`OutboundEvent`]s -> resolve player id to
//!    address -> encode -> forward to the sender task -> UDP send.

use crate::engine::Engine;
use crate::error::EngineError;
use crate::port::{InboundEvent, OutboundEvent};
use crate::session::SessionManager;
use bincode::{deserialize, serialize};
use log::{error, info, warn};
use shared::{ClientMessage, HelloRequest, ServerMessage, SESSION_TIMEOUT_MS};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::interval;

/// A decoded datagram, handed from the receiver task to the main loop.
#[derive(Debug)]
struct InboundDatagram {
    addr: SocketAddr,
    message: ClientMessage,
}

/// A single outgoing datagram, handed from the main loop to the sender task.
#[derive(Debug)]
struct OutboundDatagram {
    addr: SocketAddr,
    bytes: Vec<u8>,
}

pub struct Server {
    socket: Arc<UdpSocket>,
    sessions: SessionManager,
    engine: Engine,
    tick_duration: Duration,

    inbound_tx: mpsc::UnboundedSender<InboundDatagram>,
    inbound_rx: mpsc::UnboundedReceiver<InboundDatagram>,
    outbound_tx: mpsc::UnboundedSender<OutboundDatagram>,
    outbound_rx: Option<mpsc::UnboundedReceiver<OutboundDatagram>>,
}

impl Server {
    pub async fn new(addr: &str, tick_duration: Duration, max_players: usize) -> Result<Self, EngineError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| EngineError::Bind { addr: addr.to_string(), source })?;
        info!("listening on {}", addr);

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket: Arc::new(socket),
            sessions: SessionManager::with_capacity(max_players),
            engine: Engine::new(),
            tick_duration,
            inbound_tx,
            inbound_rx,
            outbound_tx,
            outbound_rx: Some(outbound_rx),
        })
    }

    /// The address the server's UDP socket is actually bound to. Useful when
    /// binding to port 0 and letting the OS pick, e.g. in tests.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Listens for datagrams and forwards successfully decoded ones to the
    /// main loop. A datagram that fails to decode is logged and dropped;
    /// it never reaches the engine.
    fn spawn_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let inbound_tx = self.inbound_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];
            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match deserialize::<ClientMessage>(&buffer[0..len]) {
                        Ok(message) => {
                            if inbound_tx.send(InboundDatagram { addr, message }).is_err() {
                                break;
                            }
                        }
                        Err(source) => {
                            warn!("{}", EngineError::Decode { addr: addr.to_string(), source });
                        }
                    },
                    Err(e) => {
                        error!("error receiving datagram: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    fn spawn_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let mut outbound_rx = self.outbound_rx.take().expect("spawn_sender called once");

        tokio::spawn(async move {
            while let Some(datagram) = outbound_rx.recv().await {
                if let Err(source) = socket.send_to(&datagram.bytes, datagram.addr).await {
                    error!("{}", EngineError::Send { addr: datagram.addr.to_string(), source });
                }
            }
        });
    }

    fn enqueue(&self, addr: SocketAddr, message: &ServerMessage) {
        match serialize(message) {
            Ok(bytes) => {
                if self.outbound_tx.send(OutboundDatagram { addr, bytes }).is_err() {
                    error!("sender task has terminated");
                }
            }
            Err(e) => error!("failed to encode outbound message: {}", e),
        }
    }

    /// Resolves an [`OutboundEvent`] to concrete addresses and enqueues it.
    fn dispatch_outbound(&self, event: OutboundEvent) {
        match event {
            OutboundEvent::ToOne { player_id, message } => {
                if let Some(addr) = self.sessions.addr_of(&player_id) {
                    self.enqueue(addr, &message);
                }
            }
            OutboundEvent::ToAll { message } => {
                for id in self.engine.order() {
                    if let Some(addr) = self.sessions.addr_of(id) {
                        self.enqueue(addr, &message);
                    }
                }
            }
            OutboundEvent::ToAllExcept { player_id, message } => {
                for id in self.engine.order() {
                    if *id == player_id {
                        continue;
                    }
                    if let Some(addr) = self.sessions.addr_of(id) {
                        self.enqueue(addr, &message);
                    }
                }
            }
        }
    }

    /// Resolves a `join` request to a player id, creating or reconnecting a
    /// session as needed, and returns the id the engine should use.
    fn resolve_join(&mut self, addr: SocketAddr, request: HelloRequest) -> Option<String> {
        match request {
            HelloRequest::NewSession { username, color } => {
                let Some(session_id) = self.sessions.bind_new(addr) else {
                    warn!("{}", EngineError::ServerFull { addr: addr.to_string() });
                    return None;
                };
                self.enqueue(addr, &ServerMessage::Session(session_id.clone()));
                for event in self.engine.handle_join(session_id.clone(), username, color) {
                    self.dispatch_outbound(event);
                }
                Some(session_id)
            }
            HelloRequest::Reconnect { session_id } => {
                if self.sessions.reconnect(&session_id, addr) {
                    self.enqueue(addr, &ServerMessage::Session(session_id.clone()));
                    Some(session_id)
                } else {
                    warn!("{}", EngineError::UnknownSession { addr: addr.to_string() });
                    None
                }
            }
        }
    }

    fn handle_inbound(&mut self, datagram: InboundDatagram, now: Instant) {
        let InboundDatagram { addr, message } = datagram;

        if let ClientMessage::Join(request) = message {
            self.resolve_join(addr, request);
            return;
        }

        let Some(player_id) = self.sessions.find_by_addr(addr) else {
            warn!("{}", EngineError::UnknownSession { addr: addr.to_string() });
            return;
        };

        match message {
            ClientMessage::Join(_) => unreachable!("handled above"),
            ClientMessage::Start => {
                for event in self.engine.handle_event(InboundEvent::Start, now) {
                    self.dispatch_outbound(event);
                }
            }
            ClientMessage::Input(direction) => {
                for event in self.engine.handle_event(InboundEvent::Input { player_id, direction }, now) {
                    self.dispatch_outbound(event);
                }
            }
            ClientMessage::Redraw => {
                for event in self.engine.handle_event(InboundEvent::Redraw { player_id }, now) {
                    self.dispatch_outbound(event);
                }
            }
            ClientMessage::Heartbeat => {
                self.sessions.touch(&player_id);
            }
            ClientMessage::Disconnect => {
                self.sessions.mark_pending_deletion(&player_id);
            }
        }
    }

    /// Drives the server until the process is killed. Never returns `Ok`.
    pub async fn run(&mut self) -> Result<(), EngineError> {
        self.spawn_receiver();
        self.spawn_sender();

        let mut tick_interval = interval(self.tick_duration);

        info!("server started, tick duration {:?}", self.tick_duration);

        loop {
            tokio::select! {
                datagram = self.inbound_rx.recv() => {
                    match datagram {
                        Some(datagram) => self.handle_inbound(datagram, Instant::now()),
                        None => {
                            info!("receiver task terminated, shutting down");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    let now = Instant::now();

                    let timed_out = self.sessions.check_timeouts(Duration::from_millis(SESSION_TIMEOUT_MS));
                    for player_id in timed_out {
                        for event in self.engine.handle_remove(&player_id) {
                            self.dispatch_outbound(event);
                        }
                    }

                    for event in self.engine.tick(now) {
                        self.dispatch_outbound(event);
                    }
                },
            }
        }

        Ok(())
    }
}
