//! WebSocket handler: the message channel's connection lifecycle.
//!
//! Every connection starts unbound. The first frame must be `JOIN`,
//! carrying the bearer token handed out by the HTTP surface; everything
//! else is rejected with `NOT_IN_ROOM`. Once bound, inbound frames are
//! deserialized and dispatched against the room's engine one at a time —
//! the room's `Mutex` is the single-writer mailbox — and a per-connection
//! writer task drains the bounded outbound queue onto the socket so a
//! slow reader never blocks the engine.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use parlor_core::domain::{LeaveReason, Phase, PlayerId, RoomStatus};
use parlor_core::error::ErrorCode;
use parlor_core::protocol::{ClientMessage, ServerMessage};
use tokio::sync::{Mutex, mpsc};

use crate::config::ServerConfig;
use crate::registry::RoomRegistry;
use crate::room::{OUTBOUND_QUEUE_CAPACITY, Room};
use crate::timers;

pub async fn handle_socket(socket: WebSocket, registry: Arc<RoomRegistry>, cfg: ServerConfig) {
    let (mut ws_sink, mut ws_stream) = socket.split();

    // Unbound phase: only JOIN is legal.
    let (room, player_id) = loop {
        let frame = match ws_stream.next().await {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | None => return,
            Some(Ok(_)) => continue,
            Some(Err(_)) => return,
        };

        let msg: ClientMessage = match serde_json::from_str(&frame) {
            Ok(m) => m,
            Err(_) => {
                let _ = send_raw(&mut ws_sink, &ServerMessage::error_default(ErrorCode::InvalidMessage)).await;
                continue;
            }
        };

        let ClientMessage::Join { token, .. } = msg else {
            let _ = send_raw(&mut ws_sink, &ServerMessage::error_default(ErrorCode::NotInRoom)).await;
            continue;
        };

        let Some((room_id, player_id)) = registry.lookup_by_token(&token).await else {
            let _ = send_raw(&mut ws_sink, &ServerMessage::error_default(ErrorCode::InvalidToken)).await;
            continue;
        };
        let Some(room) = registry.room_handle(room_id).await else {
            let _ = send_raw(&mut ws_sink, &ServerMessage::error_default(ErrorCode::InvalidToken)).await;
            continue;
        };
        break (room, player_id);
    };

    let (tx, mut rx) = mpsc::channel::<ServerMessage>(OUTBOUND_QUEUE_CAPACITY);
    bind_connection(&room, &cfg, player_id, tx).await;

    // Writer task: drains the bounded outbound queue onto the socket, and
    // pings it once per heartbeat interval so an idle-but-alive peer isn't
    // starved out by the reader's read timeout below.
    let heartbeat_period = std::time::Duration::from_secs(cfg.heartbeat_interval_secs);
    let writer = tokio::spawn(async move {
        let mut ping_tick = tokio::time::interval(heartbeat_period);
        ping_tick.tick().await; // first tick fires immediately
        loop {
            tokio::select! {
                msg = rx.recv() => {
                    let Some(msg) = msg else { break };
                    if send_raw(&mut ws_sink, &msg).await.is_err() {
                        break;
                    }
                }
                _ = ping_tick.tick() => {
                    if ws_sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Reader loop: every subsequent frame dispatches through the engine.
    // A connection that misses two consecutive heartbeat intervals is
    // treated as dead.
    let read_timeout = heartbeat_period * 2;
    loop {
        match tokio::time::timeout(read_timeout, ws_stream.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => handle_frame(&room, &cfg, player_id, &text).await,
            Ok(Some(Ok(Message::Close(_)))) | Ok(None) => break,
            Ok(Some(Ok(_))) => continue,
            Ok(Some(Err(_))) => break,
            Err(_timed_out) => break,
        }
    }

    on_disconnect(&room, &cfg, &registry, player_id).await;
    writer.abort();
}

async fn send_raw(
    sink: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(msg).expect("ServerMessage always serializes");
    sink.send(Message::Text(text.into())).await
}

/// Bind (or rebind, on reconnect) a socket to its player, then push the
/// full `STATE` snapshot.
async fn bind_connection(room: &Arc<Mutex<Room>>, cfg: &ServerConfig, player_id: PlayerId, tx: mpsc::Sender<ServerMessage>) {
    let mut guard = room.lock().await;
    let was_disconnected = guard
        .connections
        .get(&player_id)
        .map(|c| !c.player.connected)
        .unwrap_or(false);

    let Some(conn) = guard.connections.get_mut(&player_id) else {
        return;
    };
    conn.sender = Some(tx);
    conn.player.connected = true;
    conn.disconnected_at = None;
    conn.disconnect_generation += 1;
    let seat = conn.player.seat;

    let state = state_snapshot(&guard, player_id);
    guard.send_to_player(player_id, state);

    if was_disconnected {
        guard.broadcast_except(
            player_id,
            ServerMessage::LobbyUpdate {
                players: guard.players_sorted_by_seat(),
                settings: guard.settings,
            },
        );
        let rearm_turn = guard.game.as_ref().map(|g| g.phase) == Some(Phase::Turns)
            && guard.game.as_ref().and_then(|g| g.turn_seat) == Some(seat);
        if rearm_turn {
            guard.rearm_disconnected_turn_timer(cfg);
            timers::schedule_turn_timeout(room.clone(), *cfg, seat);
        }
        if guard.game.as_ref().map(|g| g.phase) == Some(Phase::GameEnd) {
            if let Some(events) = guard.recompute_vote_on_connectivity_change() {
                timers::dispatch(&mut guard, cfg, events);
            }
        }
    }
}

fn state_snapshot(room: &Room, player_id: PlayerId) -> ServerMessage {
    let cheese_seats = room.cheese_seats();
    ServerMessage::State {
        room: room.snapshot(),
        game: room.game.as_ref().map(|g| g.snapshot(cheese_seats)),
        your_seat: room.seat_of(player_id),
        your_player_id: player_id,
    }
}

async fn handle_frame(room: &Arc<Mutex<Room>>, cfg: &ServerConfig, player_id: PlayerId, text: &str) {
    let msg: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(_) => {
            let mut guard = room.lock().await;
            guard.send_to_player(player_id, ServerMessage::error_default(ErrorCode::InvalidMessage));
            return;
        }
    };

    match msg {
        ClientMessage::Join { .. } => {
            // Already bound; a second JOIN is a no-op rebind attempt, ignored.
        }
        ClientMessage::Ping { t } => {
            let mut guard = room.lock().await;
            guard.send_to_player(player_id, ServerMessage::Pong { t });
        }
        ClientMessage::Ready { ready } => {
            let mut guard = room.lock().await;
            if guard.status != RoomStatus::Lobby {
                guard.send_to_player(player_id, ServerMessage::error_default(ErrorCode::InvalidAction));
                return;
            }
            if let Some(conn) = guard.connections.get_mut(&player_id) {
                conn.player.ready = ready;
            }
            guard.broadcast(ServerMessage::LobbyUpdate {
                players: guard.players_sorted_by_seat(),
                settings: guard.settings,
            });
        }
        ClientMessage::UpdateSettings { settings } => {
            let mut guard = room.lock().await;
            if guard.host_id != player_id || guard.status != RoomStatus::Lobby {
                guard.send_to_player(player_id, ServerMessage::error_default(ErrorCode::NotHost));
                return;
            }
            if let Some(cheese_enabled) = settings.cheese_enabled {
                guard.settings.cheese_enabled = cheese_enabled;
            }
            if let Some(cheese_count) = settings.cheese_count {
                guard.settings.cheese_count = cheese_count;
                guard.settings.clamp_cheese_count(cfg.max_cheese_count);
            }
            guard.broadcast(ServerMessage::LobbyUpdate {
                players: guard.players_sorted_by_seat(),
                settings: guard.settings,
            });
        }
        ClientMessage::StartGame => {
            let mut guard = room.lock().await;
            match guard.start_game(player_id) {
                Ok(events) => {
                    timers::dispatch(&mut guard, cfg, events);
                    drop(guard);
                }
                Err(e) => guard.send_to_player(player_id, e.into_message()),
            }
        }
        ClientMessage::DealerSet { composition } => {
            let mut guard = room.lock().await;
            match guard.dealer_set(player_id, composition) {
                Ok(events) => {
                    timers::dispatch(&mut guard, cfg, events);
                    drop(guard);
                    timers::schedule_dealing_hold(room.clone(), *cfg);
                }
                Err(e) => guard.send_to_player(player_id, e.into_message()),
            }
        }
        ClientMessage::DealerPreview { seat, card_type } => {
            let mut guard = room.lock().await;
            match guard.dealer_preview(player_id, seat, card_type) {
                Ok(event) => guard.broadcast_except(player_id, event),
                Err(e) => guard.send_to_player(player_id, e.into_message()),
            }
        }
        ClientMessage::ActionDrink => {
            let mut guard = room.lock().await;
            match guard.action_drink(player_id, cfg) {
                Ok(events) => dispatch_and_followup(&mut guard, room, cfg, events).await,
                Err(e) => guard.send_to_player(player_id, e.into_message()),
            }
        }
        ClientMessage::ActionSwap { target_seat } => {
            let mut guard = room.lock().await;
            match guard.action_swap(player_id, target_seat, cfg) {
                Ok(events) => dispatch_and_followup(&mut guard, room, cfg, events).await,
                Err(e) => guard.send_to_player(player_id, e.into_message()),
            }
        }
        ClientMessage::ActionStealCheese { target_seat } => {
            let mut guard = room.lock().await;
            match guard.action_steal_cheese(player_id, target_seat, cfg) {
                Ok(events) => dispatch_and_followup(&mut guard, room, cfg, events).await,
                Err(e) => guard.send_to_player(player_id, e.into_message()),
            }
        }
        ClientMessage::StartReveal => {
            let mut guard = room.lock().await;
            match guard.start_reveal(player_id) {
                Ok(()) => {
                    drop(guard);
                    timers::schedule_final_reveal(room.clone(), *cfg);
                }
                Err(e) => guard.send_to_player(player_id, e.into_message()),
            }
        }
        ClientMessage::VoteRematch { vote } => {
            let mut guard = room.lock().await;
            match guard.vote_rematch(player_id, vote) {
                Ok(events) => timers::dispatch(&mut guard, cfg, events),
                Err(e) => guard.send_to_player(player_id, e.into_message()),
            }
        }
        ClientMessage::LeaveRoom => {
            handle_leave(room, cfg, player_id).await;
        }
    }
}

/// Dispatch events from a `TURNS` action, then schedule the follow-up the
/// resulting phase implies: another turn timeout, or nothing (the round
/// now waits in `AWAITING_REVEAL` for `START_REVEAL`).
async fn dispatch_and_followup(
    guard: &mut Room,
    room: &Arc<Mutex<Room>>,
    cfg: &ServerConfig,
    events: Vec<ServerMessage>,
) {
    timers::dispatch(guard, cfg, events);
    let next_turn_seat = if guard.game.as_ref().map(|g| g.phase) == Some(Phase::Turns) {
        guard.game.as_ref().and_then(|g| g.turn_seat)
    } else {
        None
    };
    if let Some(seat) = next_turn_seat {
        let room_clone = room.clone();
        let cfg = *cfg;
        tokio::spawn(async move {
            timers::schedule_turn_timeout(room_clone, cfg, seat);
        });
    }
}

async fn handle_leave(room: &Arc<Mutex<Room>>, cfg: &ServerConfig, player_id: PlayerId) {
    let mut guard = room.lock().await;
    let Some(seat) = guard.seat_of(player_id) else {
        return;
    };
    guard.connections.remove(&player_id);
    guard.reassign_host_if_needed();
    guard.broadcast(ServerMessage::PlayerLeft {
        seat,
        reason: LeaveReason::Left,
    });

    if guard.game.as_ref().map(|g| g.phase) == Some(Phase::GameEnd) {
        if let Some(events) = guard.recompute_vote_on_connectivity_change() {
            timers::dispatch(&mut guard, cfg, events);
        }
    } else if guard.game.is_some() {
        if let Some(game) = guard.game.as_mut() {
            game.alive_seats.retain(|&s| s != seat);
        }
        let events = guard.check_round_end();
        let ended_game = guard.game.as_ref().map(|g| g.phase) == Some(Phase::GameEnd);
        timers::dispatch(&mut guard, cfg, events);
        if !ended_game {
            let room_clone = room.clone();
            let cfg = *cfg;
            drop(guard);
            timers::schedule_round_end_hold(room_clone, cfg);
        }
    }
}

/// Socket dropped without a `LEAVE_ROOM`.
async fn on_disconnect(room: &Arc<Mutex<Room>>, cfg: &ServerConfig, registry: &Arc<RoomRegistry>, player_id: PlayerId) {
    let mut guard = room.lock().await;
    let Some(conn) = guard.connections.get(&player_id) else {
        return;
    };
    // A newer connection already rebound this player; this stale task has
    // nothing left to do.
    if conn.player.connected && conn.sender.is_some() {
        return;
    }

    if guard.status == RoomStatus::Lobby {
        let Some(seat) = guard.seat_of(player_id) else { return };
        let token = guard.connections.get(&player_id).map(|c| c.token.clone());
        guard.connections.remove(&player_id);
        guard.reassign_host_if_needed();
        guard.broadcast(ServerMessage::PlayerLeft {
            seat,
            reason: LeaveReason::Disconnected,
        });
        drop(guard);
        if let Some(token) = token {
            registry.remove_player_token(&token).await;
        }
        return;
    }

    // IN_GAME: mark disconnected, start the reconnect grace window.
    let was_dealer_in_setup = guard.game.as_ref().map(|g| g.phase) == Some(Phase::DealerSetup)
        && guard.seat_of(player_id) == guard.game.as_ref().map(|g| g.dealer_seat);

    if let Some(conn) = guard.connections.get_mut(&player_id) {
        conn.player.connected = false;
        conn.disconnected_at = Some(std::time::Instant::now());
        conn.disconnect_generation += 1;
    }
    guard.broadcast(ServerMessage::LobbyUpdate {
        players: guard.players_sorted_by_seat(),
        settings: guard.settings,
    });

    if was_dealer_in_setup {
        // A dealer disconnect in DEALER_SETUP is committed immediately,
        // without waiting for the reconnect grace.
        let events = guard.auto_compose_disconnected_dealer();
        timers::dispatch(&mut guard, cfg, events);
        drop(guard);
        timers::schedule_dealing_hold(room.clone(), *cfg);
        return;
    }

    if guard.game.as_ref().map(|g| g.phase) == Some(Phase::Turns)
        && guard.game.as_ref().and_then(|g| g.turn_seat) == guard.seat_of(player_id)
    {
        guard.rearm_disconnected_turn_timer(cfg);
        let seat = guard.seat_of(player_id).unwrap();
        drop(guard);
        timers::schedule_turn_timeout(room.clone(), *cfg, seat);
        timers::schedule_reconnect_grace(room.clone(), *cfg, player_id);
        return;
    }

    if guard.game.as_ref().map(|g| g.phase) == Some(Phase::GameEnd) {
        if let Some(events) = guard.recompute_vote_on_connectivity_change() {
            timers::dispatch(&mut guard, cfg, events);
        }
    }
    drop(guard);
    timers::schedule_reconnect_grace(room.clone(), *cfg, player_id);
}
