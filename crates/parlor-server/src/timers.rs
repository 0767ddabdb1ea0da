//! Timer scheduling: turn timeouts, the transient phase holds, and the
//! reconnect grace window.
//!
//! Every timer fire re-acquires the room's mutex and checks a generation
//! counter before touching state, so a cancelled or superseded timer is a
//! no-op rather than a race. Nothing here ever
//! mutates a `Room` directly from the timer callback — each fire re-enters
//! through the same serialized path any other event would.

use std::sync::Arc;
use std::time::Duration;

use parlor_core::domain::{Phase, PlayerId, RoomStatus, Seat};
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::config::ServerConfig;
use crate::room::Room;

/// Arm the turn timer that's already been set by the engine (`deadlineTs`
/// was just computed); spawn the task that fires the synthetic timeout.
pub fn schedule_turn_timeout(room: Arc<Mutex<Room>>, cfg: ServerConfig, seat: Seat) {
    tokio::spawn(async move {
        let (generation, delay) = {
            let guard = room.lock().await;
            let Some(game) = guard.game.as_ref() else { return };
            let Some(deadline) = game.deadline_ts else { return };
            let now = crate::engine::now_ms();
            let delay_ms = (deadline - now).max(0) as u64;
            (guard.turn_timer_generation(), Duration::from_millis(delay_ms))
        };
        sleep(delay).await;

        let mut guard = room.lock().await;
        if guard.turn_timer_generation() != generation {
            return;
        }
        let Some(game) = guard.game.as_ref() else { return };
        if game.phase != Phase::Turns || game.turn_seat != Some(seat) {
            return;
        }
        tracing::debug!(room_id = %guard.id, seat, "turn timer fired, synthesizing drink");
        match guard.resolve_drink(seat, &cfg) {
            Ok(events) => {
                dispatch(&mut guard, &cfg, events);
                let next_turn_seat = if guard.game.as_ref().map(|g| g.phase) == Some(Phase::Turns) {
                    guard.game.as_ref().and_then(|g| g.turn_seat)
                } else {
                    None
                };
                if let Some(next_seat) = next_turn_seat {
                    let room_clone = room.clone();
                    drop(guard);
                    schedule_turn_timeout(room_clone, cfg, next_seat);
                }
            }
            Err(_) => {}
        }
    });
}

/// `DEALING` → `TURNS`/`AWAITING_REVEAL` after the visual hold.
pub fn schedule_dealing_hold(room: Arc<Mutex<Room>>, cfg: ServerConfig) {
    tokio::spawn(async move {
        sleep(Duration::from_millis(cfg.dealing_hold_ms)).await;
        let mut guard = room.lock().await;
        if guard.game.as_ref().map(|g| g.phase) != Some(Phase::Dealing) {
            return;
        }
        let events = guard.advance_from_dealing(&cfg);
        let turn_seat = guard.game.as_ref().and_then(|g| g.turn_seat);
        dispatch(&mut guard, &cfg, events);
        if let Some(seat) = turn_seat {
            let room_clone = room.clone();
            drop(guard);
            schedule_turn_timeout(room_clone, cfg, seat);
        }
    });
}

/// Reveal loop for `FINAL_REVEAL`: one seat at a time, paced by
/// `PER_REVEAL_DURATION_MS`, then `checkRoundEnd`.
pub fn schedule_final_reveal(room: Arc<Mutex<Room>>, cfg: ServerConfig) {
    tokio::spawn(async move {
        let generation = {
            let guard = room.lock().await;
            guard.phase_timer_generation()
        };
        loop {
            sleep(Duration::from_millis(cfg.per_reveal_duration_ms)).await;
            let mut guard = room.lock().await;
            if guard.phase_timer_generation() != generation {
                return;
            }
            if guard.game.as_ref().map(|g| g.phase) != Some(Phase::FinalReveal) {
                return;
            }
            let Some(events) = guard.reveal_next_facedown() else {
                break;
            };
            dispatch(&mut guard, &cfg, events);
            if !guard.has_pending_facedown() {
                break;
            }
        }

        let mut guard = room.lock().await;
        if guard.game.as_ref().map(|g| g.phase) != Some(Phase::FinalReveal) {
            return;
        }
        let events = guard.check_round_end();
        let ended_game = guard.game.as_ref().map(|g| g.phase) == Some(Phase::GameEnd);
        dispatch(&mut guard, &cfg, events);
        if !ended_game {
            let room_clone = room.clone();
            drop(guard);
            schedule_round_end_hold(room_clone, cfg);
        }
    });
}

/// Short hold on `ROUND_END` before the next `DEALER_SETUP`.
pub fn schedule_round_end_hold(room: Arc<Mutex<Room>>, cfg: ServerConfig) {
    tokio::spawn(async move {
        let generation = {
            let guard = room.lock().await;
            guard.phase_timer_generation()
        };
        sleep(Duration::from_millis(cfg.round_end_hold_ms)).await;
        let mut guard = room.lock().await;
        if guard.phase_timer_generation() != generation {
            return;
        }
        if guard.game.as_ref().map(|g| g.phase) != Some(Phase::RoundEnd) {
            return;
        }
        let events = guard.begin_next_round();
        dispatch(&mut guard, &cfg, events);
    });
}

/// Grace window for a disconnected player. A no-op if the player
/// reconnected or left before it elapsed.
pub fn schedule_reconnect_grace(room: Arc<Mutex<Room>>, cfg: ServerConfig, player_id: PlayerId) {
    tokio::spawn(async move {
        let generation = {
            let guard = room.lock().await;
            guard
                .connections
                .get(&player_id)
                .map(|c| c.disconnect_generation)
        };
        let Some(generation) = generation else { return };
        sleep(Duration::from_secs(cfg.reconnect_timeout_secs)).await;

        let mut guard = room.lock().await;
        let still_disconnected = guard
            .connections
            .get(&player_id)
            .map(|c| c.disconnect_generation == generation && !c.player.connected)
            .unwrap_or(false);
        if !still_disconnected {
            return;
        }

        let voting = guard.status == RoomStatus::InGame
            && guard.game.as_ref().map(|g| g.phase) == Some(Phase::GameEnd);

        if voting {
            let seat = guard.seat_of(player_id);
            guard.connections.remove(&player_id);
            guard.reassign_host_if_needed();
            if let Some(seat) = seat {
                guard.broadcast(parlor_core::protocol::ServerMessage::PlayerLeft {
                    seat,
                    reason: parlor_core::domain::LeaveReason::Disconnected,
                });
            }
            if let Some(events) = guard.recompute_vote_on_connectivity_change() {
                dispatch(&mut guard, &cfg, events);
            }
        } else if guard.game.as_ref().map(|g| g.phase) == Some(Phase::AwaitingReveal)
            && guard.seat_of(player_id) == guard.game.as_ref().map(|g| g.dealer_seat)
        {
            // Dealer disconnected and the usual grace elapsed with nobody
            // issuing START_REVEAL for them: auto-trigger it.
            guard.auto_start_reveal();
            drop(guard);
            schedule_final_reveal(room.clone(), cfg);
        } else {
            if let Some(seat) = guard.seat_of(player_id) {
                if let Some(conn) = guard.connections.get_mut(&player_id) {
                    conn.player.alive = false;
                }
                if let Some(game) = guard.game.as_mut() {
                    game.alive_seats.retain(|&s| s != seat);
                }
            }
            if guard.game.is_some() {
                let events = guard.check_round_end();
                let ended_game = guard.game.as_ref().map(|g| g.phase) == Some(Phase::GameEnd);
                dispatch(&mut guard, &cfg, events);
                if !ended_game {
                    let room_clone = room.clone();
                    drop(guard);
                    schedule_round_end_hold(room_clone, cfg);
                }
            }
        }
    });
}

/// Broadcast a batch of engine-emitted events, then re-derive and send any
/// follow-up `CHEESE_UPDATE` a cheese-affecting event implies. Kept as a
/// single chokepoint so every timer callback dispatches identically to the
/// intent-handling path in `ws_handler`.
pub fn dispatch(room: &mut Room, _cfg: &ServerConfig, events: Vec<parlor_core::protocol::ServerMessage>) {
    let needs_cheese_update = events.iter().any(|e| {
        matches!(
            e,
            parlor_core::protocol::ServerMessage::CheeseStolen { .. }
                | parlor_core::protocol::ServerMessage::Dealt { .. }
        )
    });
    for event in events {
        room.broadcast(event);
    }
    if needs_cheese_update {
        room.broadcast(parlor_core::protocol::ServerMessage::CheeseUpdate {
            cheese_seats: room.cheese_seats(),
        });
    }
}
