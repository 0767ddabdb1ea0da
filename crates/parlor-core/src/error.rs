//! Wire-level error taxonomy.
//!
//! `ErrorCode` is the machine-readable discriminant sent to clients
//! inside `ServerMessage::Error`. `parlor-server` maps its internal
//! `thiserror` error enums onto these codes at the boundary, so the
//! mapping lives in one place instead of being duplicated at every
//! call site.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Identity / auth
    InvalidToken,
    NotInRoom,
    SessionAlreadyInRoom,
    // Room lifecycle
    RoomNotFound,
    RoomFull,
    GameInProgress,
    NameTaken,
    // Authorization
    NotHost,
    NotDealer,
    // Turn legality
    NotYourTurn,
    AlreadyActed,
    InvalidTarget,
    InvalidAction,
    // Start legality
    NotEnoughPlayers,
    NotAllReady,
    // Dealer composition
    MissingAssignments,
    InvalidComposition,
    // Cheese
    AlreadyHasCheese,
    NoCheeseToSteal,
    // Parse
    InvalidMessage,
    InvalidRequest,
    UnknownOp,
}

impl ErrorCode {
    /// Default human-readable text for this code, used when the caller
    /// doesn't have a more specific message to attach.
    pub fn default_message(self) -> &'static str {
        match self {
            ErrorCode::InvalidToken => "token is invalid or expired",
            ErrorCode::NotInRoom => "not bound to a room",
            ErrorCode::SessionAlreadyInRoom => "this session already has a connected player in the room",
            ErrorCode::RoomNotFound => "room not found",
            ErrorCode::RoomFull => "room is full",
            ErrorCode::GameInProgress => "game already in progress",
            ErrorCode::NameTaken => "name is already taken in this room",
            ErrorCode::NotHost => "only the host can do that",
            ErrorCode::NotDealer => "only the dealer can do that",
            ErrorCode::NotYourTurn => "it is not your turn",
            ErrorCode::AlreadyActed => "you have already acted this round",
            ErrorCode::InvalidTarget => "invalid target seat",
            ErrorCode::InvalidAction => "action is not legal right now",
            ErrorCode::NotEnoughPlayers => "not enough players to start",
            ErrorCode::NotAllReady => "not all players are ready",
            ErrorCode::MissingAssignments => "composition must cover every alive seat",
            ErrorCode::InvalidComposition => "composition must contain at least one SAFE and one DOOM",
            ErrorCode::AlreadyHasCheese => "you already hold cheese",
            ErrorCode::NoCheeseToSteal => "target has no cheese to steal",
            ErrorCode::InvalidMessage => "malformed message",
            ErrorCode::InvalidRequest => "malformed request",
            ErrorCode::UnknownOp => "unrecognized op",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.default_message())
    }
}
