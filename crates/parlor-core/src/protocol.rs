//! Wire protocol: client intents and server events.
//!
//! Every frame is JSON-text, with the discriminant carried in the `op`
//! field. Deserialization failures never reach the engine — the codec
//! rejects them with `INVALID_MESSAGE` or `UNKNOWN_OP` before a room
//! ever sees the bytes.

use serde::{Deserialize, Serialize};

use crate::domain::{
    CardType, LeaveReason, Phase, Player, PlayerId, RoomSettings, RoomStatus, Seat, SettingsPatch,
    Token,
};
use crate::error::ErrorCode;

/// Client → server intents.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all_fields = "camelCase")]
pub enum ClientMessage {
    Join {
        token: Token,
        name: String,
        avatar_id: u32,
    },
    Ready {
        ready: bool,
    },
    StartGame,
    UpdateSettings {
        settings: SettingsPatch,
    },
    ActionDrink,
    ActionSwap {
        target_seat: Seat,
    },
    ActionStealCheese {
        target_seat: Seat,
    },
    DealerSet {
        composition: Vec<CardType>,
    },
    DealerPreview {
        seat: Seat,
        card_type: Option<CardType>,
    },
    StartReveal,
    VoteRematch {
        vote: bool,
    },
    LeaveRoom,
    Ping {
        t: i64,
    },
}

/// Room membership snapshot sent inside `STATE`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room_id: String,
    pub join_code: String,
    pub host_id: PlayerId,
    pub status: RoomStatus,
    pub settings: RoomSettings,
    pub players: Vec<Player>,
    pub created_at: u64,
}

/// Game-state snapshot sent inside `STATE` (absent when `status = LOBBY`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub phase: Phase,
    pub dealer_seat: Seat,
    pub turn_seat: Option<Seat>,
    pub round_index: u32,
    pub alive_seats: Vec<Seat>,
    pub facedown_seats: Vec<Seat>,
    pub acted_seats: Vec<Seat>,
    pub deadline_ts: Option<i64>,
    pub cheese_seats: Vec<Seat>,
}

/// Voting phase tag sent inside `VOTE_UPDATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VotePhase {
    Voting,
    Starting,
}

/// Server → client events.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all_fields = "camelCase")]
pub enum ServerMessage {
    State {
        room: RoomSnapshot,
        game: Option<GameSnapshot>,
        your_seat: Option<Seat>,
        your_player_id: PlayerId,
    },
    LobbyUpdate {
        players: Vec<Player>,
        settings: RoomSettings,
    },
    Phase {
        phase: Phase,
        dealer_seat: Seat,
        turn_seat: Option<Seat>,
        deadline_ts: Option<i64>,
        alive_seats: Vec<Seat>,
    },
    Dealt {
        alive_seats: Vec<Seat>,
    },
    Swap {
        from_seat: Seat,
        to_seat: Seat,
    },
    Reveal {
        seat: Seat,
        card_type: CardType,
    },
    Elim {
        seat: Seat,
    },
    CheeseStolen {
        from_seat: Seat,
        to_seat: Seat,
    },
    CheeseUpdate {
        cheese_seats: Vec<Seat>,
    },
    DealerPreview {
        seat: Seat,
        assigned: bool,
    },
    VoteUpdate {
        voted_yes: Vec<Seat>,
        required_votes: usize,
        phase: VotePhase,
    },
    PlayerLeft {
        seat: Seat,
        reason: LeaveReason,
    },
    RoundEnd {
        next_dealer_seat: Seat,
    },
    GameEnd {
        winner_seat: Seat,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
    Pong {
        t: i64,
    },
}

impl ServerMessage {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code,
            message: message.into(),
        }
    }

    pub fn error_default(code: ErrorCode) -> Self {
        ServerMessage::error(code, code.default_message())
    }
}

/// Name validity: 1–20 printable characters.
pub fn validate_name(name: &str) -> bool {
    let len = name.chars().count();
    len >= crate::config::NAME_MIN_LEN
        && len <= crate::config::NAME_MAX_LEN
        && name.chars().all(|c| !c.is_control())
        && !name.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_message_tag_matches_expected_ops() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"op":"ACTION_SWAP","targetSeat":2}"#).unwrap();
        match msg {
            ClientMessage::ActionSwap { target_seat } => assert_eq!(target_seat, 2),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn unknown_op_fails_to_parse() {
        let result: Result<ClientMessage, _> = serde_json::from_str(r#"{"op":"NOT_A_REAL_OP"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn reveal_serializes_card_type_with_op_tag() {
        let msg = ServerMessage::Reveal {
            seat: 1,
            card_type: CardType::Doom,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""op":"REVEAL""#));
        assert!(json.contains(r#""cardType":"DOOM""#));
    }

    #[test]
    fn dealer_preview_server_event_never_carries_card_type() {
        let msg = ServerMessage::DealerPreview {
            seat: 0,
            assigned: true,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("cardType"));
    }

    #[test]
    fn name_validation_boundaries() {
        assert!(validate_name("A"));
        assert!(validate_name(&"A".repeat(20)));
        assert!(!validate_name(""));
        assert!(!validate_name(&"A".repeat(21)));
        assert!(!validate_name("   "));
    }
}
