//! Process configuration, read from the environment at startup.

use parlor_core::config as defaults;

#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    pub port: u16,
    pub max_players: usize,
    pub default_turn_timer_secs: u32,
    pub disconnected_turn_timeout_secs: u32,
    pub reconnect_timeout_secs: u64,
    pub per_reveal_duration_ms: u64,
    pub dealing_hold_ms: u64,
    pub round_end_hold_ms: u64,
    pub default_cheese_count: u32,
    pub max_cheese_count: u32,
    pub heartbeat_interval_secs: u64,
    pub reap_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            max_players: defaults::DEFAULT_MAX_PLAYERS,
            default_turn_timer_secs: defaults::DEFAULT_TURN_TIMER_SECS,
            disconnected_turn_timeout_secs: defaults::DEFAULT_DISCONNECTED_TURN_TIMEOUT_SECS,
            reconnect_timeout_secs: defaults::DEFAULT_RECONNECT_TIMEOUT_SECS,
            per_reveal_duration_ms: defaults::DEFAULT_PER_REVEAL_DURATION_MS,
            dealing_hold_ms: defaults::DEFAULT_DEALING_HOLD_MS,
            round_end_hold_ms: defaults::DEFAULT_ROUND_END_HOLD_MS,
            default_cheese_count: defaults::DEFAULT_CHEESE_COUNT,
            max_cheese_count: defaults::MAX_CHEESE_COUNT,
            heartbeat_interval_secs: defaults::DEFAULT_HEARTBEAT_INTERVAL_SECS,
            reap_interval_secs: defaults::DEFAULT_REAP_INTERVAL_SECS,
        }
    }
}

impl ServerConfig {
    /// Build from environment variables, falling back to defaults for
    /// anything unset or unparsable.
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            port: env_or("PORT", base.port),
            max_players: env_or("MAX_PLAYERS", base.max_players),
            default_turn_timer_secs: env_or("DEFAULT_TURN_TIMER_SECS", base.default_turn_timer_secs),
            disconnected_turn_timeout_secs: env_or(
                "DISCONNECTED_TURN_TIMEOUT_SECS",
                base.disconnected_turn_timeout_secs,
            ),
            reconnect_timeout_secs: env_or("RECONNECT_TIMEOUT_SECS", base.reconnect_timeout_secs),
            per_reveal_duration_ms: env_or("PER_REVEAL_DURATION_MS", base.per_reveal_duration_ms),
            dealing_hold_ms: env_or("DEALING_HOLD_MS", base.dealing_hold_ms),
            round_end_hold_ms: env_or("ROUND_END_HOLD_MS", base.round_end_hold_ms),
            default_cheese_count: env_or("DEFAULT_CHEESE_COUNT", base.default_cheese_count),
            max_cheese_count: env_or("MAX_CHEESE_COUNT", base.max_cheese_count),
            heartbeat_interval_secs: env_or("HEARTBEAT_INTERVAL_SECS", base.heartbeat_interval_secs),
            reap_interval_secs: env_or("REAP_INTERVAL_SECS", base.reap_interval_secs),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
