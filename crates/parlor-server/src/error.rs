//! Internal error types, mapped onto the wire [`ErrorCode`] taxonomy
//! at the boundary so the rest of the engine can just use `?`.

use parlor_core::error::ErrorCode;
use parlor_core::protocol::ServerMessage;
use thiserror::Error;

/// Everything that can go wrong processing an intent inside a room.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RoomError {
    #[error("not in room")]
    NotInRoom,
    #[error("not host")]
    NotHost,
    #[error("not dealer")]
    NotDealer,
    #[error("not your turn")]
    NotYourTurn,
    #[error("already acted")]
    AlreadyActed,
    #[error("invalid target")]
    InvalidTarget,
    #[error("invalid action")]
    InvalidAction,
    #[error("not enough players")]
    NotEnoughPlayers,
    #[error("not all ready")]
    NotAllReady,
    #[error("missing assignments")]
    MissingAssignments,
    #[error("invalid composition")]
    InvalidComposition,
    #[error("already has cheese")]
    AlreadyHasCheese,
    #[error("no cheese to steal")]
    NoCheeseToSteal,
}

impl RoomError {
    pub fn code(self) -> ErrorCode {
        match self {
            RoomError::NotInRoom => ErrorCode::NotInRoom,
            RoomError::NotHost => ErrorCode::NotHost,
            RoomError::NotDealer => ErrorCode::NotDealer,
            RoomError::NotYourTurn => ErrorCode::NotYourTurn,
            RoomError::AlreadyActed => ErrorCode::AlreadyActed,
            RoomError::InvalidTarget => ErrorCode::InvalidTarget,
            RoomError::InvalidAction => ErrorCode::InvalidAction,
            RoomError::NotEnoughPlayers => ErrorCode::NotEnoughPlayers,
            RoomError::NotAllReady => ErrorCode::NotAllReady,
            RoomError::MissingAssignments => ErrorCode::MissingAssignments,
            RoomError::InvalidComposition => ErrorCode::InvalidComposition,
            RoomError::AlreadyHasCheese => ErrorCode::AlreadyHasCheese,
            RoomError::NoCheeseToSteal => ErrorCode::NoCheeseToSteal,
        }
    }

    pub fn into_message(self) -> ServerMessage {
        ServerMessage::error_default(self.code())
    }
}

/// Errors from the process-wide registry (room/token lookup).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    #[error("room not found")]
    RoomNotFound,
    #[error("room full")]
    RoomFull,
    #[error("game in progress")]
    GameInProgress,
    #[error("name taken")]
    NameTaken,
    #[error("invalid token")]
    InvalidToken,
    #[error("session already in room")]
    SessionAlreadyInRoom,
    #[error("invalid request")]
    InvalidRequest,
}

impl RegistryError {
    pub fn code(self) -> ErrorCode {
        match self {
            RegistryError::RoomNotFound => ErrorCode::RoomNotFound,
            RegistryError::RoomFull => ErrorCode::RoomFull,
            RegistryError::GameInProgress => ErrorCode::GameInProgress,
            RegistryError::NameTaken => ErrorCode::NameTaken,
            RegistryError::InvalidToken => ErrorCode::InvalidToken,
            RegistryError::SessionAlreadyInRoom => ErrorCode::SessionAlreadyInRoom,
            RegistryError::InvalidRequest => ErrorCode::InvalidRequest,
        }
    }

    pub fn into_message(self) -> ServerMessage {
        ServerMessage::error_default(self.code())
    }
}
