//! Core domain value types shared by the engine and the wire protocol.
//!
//! These types carry no behavior beyond small derived helpers — the
//! state machine that mutates them lives in `parlor-server`.

use serde::{Deserialize, Serialize};

/// Stable per-room player identity. Never reused within a room's lifetime.
pub type PlayerId = u32;

/// 0-based dense seat index, assigned at join time (smallest free integer).
pub type Seat = u32;

/// Opaque bearer credential handed back from the HTTP surface and
/// presented by the client on the message channel's `JOIN` intent.
pub type Token = String;

/// Client-supplied identifier, stable across tab reloads for the same
/// browser. Used only to recognize reconnecting players.
pub type SessionId = String;

/// A hidden card's identity. Never serialized outside a `REVEAL` for the
/// seat it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CardType {
    Safe,
    Doom,
}

/// A connected player's stable record within a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub avatar_id: u32,
    pub seat: Seat,
    pub alive: bool,
    pub connected: bool,
    pub ready: bool,
    pub has_cheese: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: String, avatar_id: u32, seat: Seat) -> Self {
        Self {
            id,
            name,
            avatar_id,
            seat,
            alive: true,
            connected: true,
            ready: false,
            has_cheese: false,
        }
    }
}

/// Host-configurable room settings. Mutable only by the host, only in `LOBBY`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RoomSettings {
    pub turn_timer_seconds: u32,
    pub cheese_enabled: bool,
    pub cheese_count: u32,
}

impl RoomSettings {
    pub fn clamp_cheese_count(&mut self, max_cheese_count: u32) {
        self.cheese_count = self.cheese_count.min(max_cheese_count);
    }
}

/// Patch applied by `UPDATE_SETTINGS`; unset fields are left unchanged.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SettingsPatch {
    pub cheese_enabled: Option<bool>,
    pub cheese_count: Option<u32>,
}

/// Whether a room is accepting lobby changes or running a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoomStatus {
    Lobby,
    InGame,
}

/// The round state machine's current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    DealerSetup,
    Dealing,
    Turns,
    AwaitingReveal,
    FinalReveal,
    RoundEnd,
    GameEnd,
}

/// Why a player left the room's broadcast roster (`PLAYER_LEFT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaveReason {
    Disconnected,
    Left,
}
