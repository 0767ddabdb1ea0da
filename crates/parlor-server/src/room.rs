//! The per-room engine: membership, connections, and the broadcaster.
//!
//! A `Room` is a single-writer mailbox: every intent, socket lifecycle
//! event, and timer fire that targets it is processed while holding the
//! room's `Mutex`, so no two events for the same room ever race each
//! other. The round state machine itself lives in [`crate::engine`] as
//! methods on `Room`.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use parlor_core::domain::{Player, PlayerId, RoomSettings, RoomStatus, Seat, SessionId, Token};
use parlor_core::protocol::{RoomSnapshot, ServerMessage};
use tokio::sync::mpsc;

use crate::engine::GameState;

/// Outbound channel capacity per connection: bounded, so a slow or dead
/// peer's overflow closes its socket rather than blocking the engine.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

pub type PlayerTx = mpsc::Sender<ServerMessage>;
pub type PlayerRx = mpsc::Receiver<ServerMessage>;

/// A room's record of one player: identity plus connection bookkeeping.
pub struct Connection {
    pub player: Player,
    pub token: Token,
    pub session_id: SessionId,
    /// `None` once the socket has closed and not yet been rebound.
    pub sender: Option<PlayerTx>,
    /// Set when the player's socket drops while `IN_GAME`; cleared on
    /// reconnect. Monotonic `generation` lets a stale grace-window timer
    /// recognize it no longer applies.
    pub disconnected_at: Option<std::time::Instant>,
    pub disconnect_generation: u64,
}

pub struct Room {
    pub id: uuid::Uuid,
    pub join_code: String,
    pub host_id: PlayerId,
    pub status: RoomStatus,
    pub settings: RoomSettings,
    pub created_at: u64,
    pub connections: HashMap<PlayerId, Connection>,
    pub next_player_id: PlayerId,
    pub game: Option<GameState>,
    /// Incremented every time a new turn timer is armed; invalidates any
    /// in-flight timer task for a prior turn.
    pub turn_timer_generation: u64,
    /// Incremented every time a dealing/reveal/round-end hold timer is
    /// armed, for the same reason.
    pub phase_timer_generation: u64,
    pub vote_yes: std::collections::BTreeSet<Seat>,
}

impl Room {
    pub fn new(id: uuid::Uuid, join_code: String, settings: RoomSettings) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            id,
            join_code,
            host_id: 0,
            status: RoomStatus::Lobby,
            settings,
            created_at,
            connections: HashMap::new(),
            next_player_id: 1,
            game: None,
            turn_timer_generation: 0,
            phase_timer_generation: 0,
            vote_yes: std::collections::BTreeSet::new(),
        }
    }

    // ── Broadcaster ────────────────────────────────────────────────────

    /// Send a message to a specific player's outbound queue. Overflow or
    /// a gone receiver is treated as a disconnect by the caller, not here
    /// — this method never blocks and never panics.
    pub fn send_to_player(&mut self, player_id: PlayerId, msg: ServerMessage) {
        let Some(conn) = self.connections.get_mut(&player_id) else {
            return;
        };
        let Some(tx) = &conn.sender else {
            return;
        };
        if tx.try_send(msg).is_err() {
            conn.sender = None;
        }
    }

    pub fn broadcast(&mut self, msg: ServerMessage) {
        let ids: Vec<PlayerId> = self.connections.keys().copied().collect();
        for id in ids {
            self.send_to_player(id, msg.clone());
        }
    }

    pub fn broadcast_except(&mut self, exclude: PlayerId, msg: ServerMessage) {
        let ids: Vec<PlayerId> = self
            .connections
            .keys()
            .copied()
            .filter(|&id| id != exclude)
            .collect();
        for id in ids {
            self.send_to_player(id, msg.clone());
        }
    }

    // ── Membership helpers ────────────────────────────────────────────

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn player_count(&self) -> usize {
        self.connections.len()
    }

    pub fn players_sorted_by_seat(&self) -> Vec<Player> {
        let mut players: Vec<Player> = self.connections.values().map(|c| c.player.clone()).collect();
        players.sort_by_key(|p| p.seat);
        players
    }

    /// Smallest non-negative seat not currently assigned.
    pub fn next_free_seat(&self) -> Seat {
        let mut taken: Vec<Seat> = self.connections.values().map(|c| c.player.seat).collect();
        taken.sort_unstable();
        let mut seat = 0;
        for s in taken {
            if s == seat {
                seat += 1;
            } else if s > seat {
                break;
            }
        }
        seat
    }

    pub fn find_by_session(&self, session_id: &str) -> Option<PlayerId> {
        self.connections
            .iter()
            .find(|(_, c)| c.session_id == session_id)
            .map(|(&id, _)| id)
    }

    pub fn find_by_name_ci(&self, name: &str) -> Option<PlayerId> {
        let lower = name.to_lowercase();
        self.connections
            .iter()
            .find(|(_, c)| c.player.name.to_lowercase() == lower)
            .map(|(&id, _)| id)
    }

    pub fn find_by_token(&self, token: &str) -> Option<PlayerId> {
        self.connections
            .iter()
            .find(|(_, c)| c.token == token)
            .map(|(&id, _)| id)
    }

    pub fn connected_seats(&self) -> std::collections::BTreeSet<Seat> {
        self.connections
            .values()
            .filter(|c| c.player.connected)
            .map(|c| c.player.seat)
            .collect()
    }

    pub fn seat_of(&self, player_id: PlayerId) -> Option<Seat> {
        self.connections.get(&player_id).map(|c| c.player.seat)
    }

    pub fn player_id_at_seat(&self, seat: Seat) -> Option<PlayerId> {
        self.connections
            .iter()
            .find(|(_, c)| c.player.seat == seat)
            .map(|(&id, _)| id)
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.id.to_string(),
            join_code: self.join_code.clone(),
            host_id: self.host_id,
            status: self.status,
            settings: self.settings,
            players: self.players_sorted_by_seat(),
            created_at: self.created_at,
        }
    }

    /// Reassign host to the next-joined remaining player.
    pub fn reassign_host_if_needed(&mut self) {
        if self.connections.contains_key(&self.host_id) {
            return;
        }
        if let Some(&next) = self.connections.keys().min() {
            self.host_id = next;
        }
    }
}
