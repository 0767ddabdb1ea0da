//! Default tunable constants. `parlor-server` may override
//! any of these from the environment at startup; these are the values
//! used when no override is present.

pub const MIN_PLAYERS: usize = 3;
pub const DEFAULT_MAX_PLAYERS: usize = 8;

pub const JOIN_CODE_LENGTH: usize = 6;
/// 32-symbol alphabet, excludes visually ambiguous `0 O I 1`.
pub const JOIN_CODE_ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";

pub const DEFAULT_TURN_TIMER_SECS: u32 = 30;
pub const DEFAULT_DISCONNECTED_TURN_TIMEOUT_SECS: u32 = 5;
pub const DEFAULT_RECONNECT_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_PER_REVEAL_DURATION_MS: u64 = 900;
pub const DEFAULT_DEALING_HOLD_MS: u64 = 600;
pub const DEFAULT_ROUND_END_HOLD_MS: u64 = 1500;

pub const DEFAULT_CHEESE_COUNT: u32 = 2;
pub const MAX_CHEESE_COUNT: u32 = 3;

pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 15;
pub const DEFAULT_REAP_INTERVAL_SECS: u64 = 30;

pub const NAME_MIN_LEN: usize = 1;
pub const NAME_MAX_LEN: usize = 20;
