//! The round state machine: dealer-driven deal, turn progression,
//! swap/drink resolution, reveal, and rematch voting.
//!
//! Every method here is a pure state transition over `&mut Room` plus the
//! bits of [`ServerConfig`] it needs (timer durations); it never touches
//! a socket. Callers ([`crate::ws_handler`], [`crate::timers`]) broadcast
//! the returned events and schedule any follow-up timers.

use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

use parlor_core::domain::{CardType, Phase, PlayerId, Seat};
use parlor_core::protocol::{GameSnapshot, ServerMessage, VotePhase};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::config::ServerConfig;
use crate::error::RoomError;
use crate::room::Room;

pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Server-side round state. Card identities live in `card_by_seat` and
/// are never serialized wholesale — only a `REVEAL` for that exact seat
/// ever carries one.
pub struct GameState {
    pub phase: Phase,
    pub dealer_seat: Seat,
    pub turn_seat: Option<Seat>,
    pub round_index: u32,
    pub alive_seats: Vec<Seat>,
    pub facedown_seats: BTreeSet<Seat>,
    pub acted_seats: BTreeSet<Seat>,
    pub deadline_ts: Option<i64>,
    pub card_by_seat: std::collections::HashMap<Seat, CardType>,
}

impl GameState {
    pub fn snapshot(&self, cheese_seats: Vec<Seat>) -> GameSnapshot {
        GameSnapshot {
            phase: self.phase,
            dealer_seat: self.dealer_seat,
            turn_seat: self.turn_seat,
            round_index: self.round_index,
            alive_seats: self.alive_seats.clone(),
            facedown_seats: self.facedown_seats.iter().copied().collect(),
            acted_seats: self.acted_seats.iter().copied().collect(),
            deadline_ts: self.deadline_ts,
            cheese_seats,
        }
    }
}

/// Smallest alive seat strictly greater than `from`, wrapping to the
/// smallest alive seat overall.
fn next_alive_clockwise(alive: &[Seat], from: Seat) -> Seat {
    alive
        .iter()
        .copied()
        .find(|&s| s > from)
        .unwrap_or(alive[0])
}

/// Validate a composition: must cover every alive seat (in ascending seat
/// order) and contain at least one SAFE and one DOOM.
fn validate_composition(
    alive_seats: &[Seat],
    composition: &[CardType],
) -> Result<std::collections::HashMap<Seat, CardType>, RoomError> {
    if composition.len() != alive_seats.len() {
        return Err(RoomError::MissingAssignments);
    }
    let has_safe = composition.iter().any(|c| *c == CardType::Safe);
    let has_doom = composition.iter().any(|c| *c == CardType::Doom);
    if !has_safe || !has_doom {
        return Err(RoomError::InvalidComposition);
    }
    Ok(alive_seats
        .iter()
        .copied()
        .zip(composition.iter().copied())
        .collect())
}

/// Synthesize a valid random composition for a dealer who disconnected
/// mid-`DEALER_SETUP`. Guarantees >=1 SAFE and >=1 DOOM.
fn synthesize_composition(alive_seats: &[Seat]) -> std::collections::HashMap<Seat, CardType> {
    let n = alive_seats.len();
    debug_assert!(n >= 2, "dealer setup requires >=2 alive seats");
    let mut shuffled = alive_seats.to_vec();
    let mut rng = rand::rng();
    shuffled.shuffle(&mut rng);
    let doom_count = rng.random_range(1..n);
    shuffled
        .into_iter()
        .enumerate()
        .map(|(i, seat)| {
            let card = if i < doom_count { CardType::Doom } else { CardType::Safe };
            (seat, card)
        })
        .collect()
}

impl Room {
    // ── Lobby → DEALER_SETUP ──────────────────────────────────────────

    pub fn can_start_game(&self, caller: PlayerId) -> Result<(), RoomError> {
        if caller != self.host_id {
            return Err(RoomError::NotHost);
        }
        if self.connections.len() < parlor_core::config::MIN_PLAYERS {
            return Err(RoomError::NotEnoughPlayers);
        }
        let all_ready = self
            .connections
            .values()
            .all(|c| c.player.id == self.host_id || c.player.ready);
        if !all_ready {
            return Err(RoomError::NotAllReady);
        }
        Ok(())
    }

    /// `LOBBY` → `DEALER_SETUP`. Marks everyone alive, clears cheese,
    /// picks a uniformly random dealer.
    pub fn start_game(&mut self, caller: PlayerId) -> Result<Vec<ServerMessage>, RoomError> {
        self.can_start_game(caller)?;

        for conn in self.connections.values_mut() {
            conn.player.alive = true;
            conn.player.has_cheese = false;
        }
        let alive_seats: Vec<Seat> = {
            let mut seats: Vec<Seat> = self.connections.values().map(|c| c.player.seat).collect();
            seats.sort_unstable();
            seats
        };
        let dealer_seat = *alive_seats.choose(&mut rand::rng()).expect("room is non-empty");

        self.status = parlor_core::domain::RoomStatus::InGame;
        self.game = Some(GameState {
            phase: Phase::DealerSetup,
            dealer_seat,
            turn_seat: None,
            round_index: 0,
            alive_seats,
            facedown_seats: BTreeSet::new(),
            acted_seats: BTreeSet::new(),
            deadline_ts: None,
            card_by_seat: std::collections::HashMap::new(),
        });

        Ok(vec![self.phase_event()])
    }

    fn phase_event(&self) -> ServerMessage {
        let game = self.game.as_ref().expect("game active");
        ServerMessage::Phase {
            phase: game.phase,
            dealer_seat: game.dealer_seat,
            turn_seat: game.turn_seat,
            deadline_ts: game.deadline_ts,
            alive_seats: game.alive_seats.clone(),
        }
    }

    // ── DEALER_SETUP ───────────────────────────────────────────────────

    fn dealer_player_id(&self) -> Option<PlayerId> {
        let seat = self.game.as_ref()?.dealer_seat;
        self.player_id_at_seat(seat)
    }

    /// `DEALER_SET` — the dealer commits a composition.
    pub fn dealer_set(
        &mut self,
        caller: PlayerId,
        composition: Vec<CardType>,
    ) -> Result<Vec<ServerMessage>, RoomError> {
        {
            let game = self.game.as_ref().ok_or(RoomError::InvalidAction)?;
            if game.phase != Phase::DealerSetup {
                return Err(RoomError::InvalidAction);
            }
        }
        if Some(caller) != self.dealer_player_id() {
            return Err(RoomError::NotDealer);
        }
        let alive = self.game.as_ref().unwrap().alive_seats.clone();
        let assignment = validate_composition(&alive, &composition)?;
        Ok(self.commit_composition(assignment))
    }

    /// Dealer disconnected mid-`DEALER_SETUP`: synthesize and commit
    /// immediately.
    pub fn auto_compose_disconnected_dealer(&mut self) -> Vec<ServerMessage> {
        let alive = self.game.as_ref().unwrap().alive_seats.clone();
        let assignment = synthesize_composition(&alive);
        self.commit_composition(assignment)
    }

    fn commit_composition(
        &mut self,
        assignment: std::collections::HashMap<Seat, CardType>,
    ) -> Vec<ServerMessage> {
        self.distribute_cheese();

        let alive = self.game.as_ref().unwrap().alive_seats.clone();
        let game = self.game.as_mut().unwrap();
        game.card_by_seat = assignment;
        game.facedown_seats = alive.iter().copied().collect();
        game.acted_seats.clear();
        game.phase = Phase::Dealing;

        vec![ServerMessage::Dealt { alive_seats: alive }]
    }

    /// Cheese distribution: runs exactly once per round, at
    /// composition-commit time.
    fn distribute_cheese(&mut self) {
        let alive = self.game.as_ref().unwrap().alive_seats.clone();
        for conn in self.connections.values_mut() {
            conn.player.has_cheese = false;
        }
        if !self.settings.cheese_enabled || alive.len() < 3 {
            return;
        }
        let count = (self.settings.cheese_count as usize).min(alive.len() - 1);
        if count == 0 {
            return;
        }
        let mut rng = rand::rng();
        let chosen: Vec<Seat> = alive.choose_multiple(&mut rng, count).copied().collect();
        let chosen: BTreeSet<Seat> = chosen.into_iter().collect();
        for conn in self.connections.values_mut() {
            if chosen.contains(&conn.player.seat) {
                conn.player.has_cheese = true;
            }
        }
    }

    pub fn cheese_seats(&self) -> Vec<Seat> {
        let mut seats: Vec<Seat> = self
            .connections
            .values()
            .filter(|c| c.player.has_cheese)
            .map(|c| c.player.seat)
            .collect();
        seats.sort_unstable();
        seats
    }

    /// `DEALER_PREVIEW` forwarding: never carries a card type.
    pub fn dealer_preview(
        &self,
        caller: PlayerId,
        seat: Seat,
        card_type: Option<CardType>,
    ) -> Result<ServerMessage, RoomError> {
        let game = self.game.as_ref().ok_or(RoomError::InvalidAction)?;
        if game.phase != Phase::DealerSetup {
            return Err(RoomError::InvalidAction);
        }
        if Some(caller) != self.dealer_player_id() {
            return Err(RoomError::NotDealer);
        }
        Ok(ServerMessage::DealerPreview {
            seat,
            assigned: card_type.is_some(),
        })
    }

    // ── DEALING → TURNS ──────────────────────────────────────────────

    /// Transient `DEALING` hold elapsed: enter `TURNS`, or skip straight
    /// to `AWAITING_REVEAL` if the dealer has no eligible non-dealer
    /// neighbor.
    pub fn advance_from_dealing(&mut self, cfg: &ServerConfig) -> Vec<ServerMessage> {
        let game = self.game.as_mut().unwrap();
        if game.phase != Phase::Dealing {
            return Vec::new();
        }
        let first = next_alive_clockwise(&game.alive_seats, game.dealer_seat);
        if first == game.dealer_seat {
            game.phase = Phase::AwaitingReveal;
            game.turn_seat = None;
            game.deadline_ts = None;
        } else {
            game.phase = Phase::Turns;
            game.turn_seat = Some(first);
        }
        let mut events = vec![self.phase_event()];
        if self.game.as_ref().unwrap().phase == Phase::Turns {
            self.arm_turn_deadline(cfg);
            events = vec![self.phase_event()];
        }
        events
    }

    fn arm_turn_deadline(&mut self, cfg: &ServerConfig) {
        let Some(turn_seat) = self.game.as_ref().and_then(|g| g.turn_seat) else {
            return;
        };
        let connected = self
            .player_id_at_seat(turn_seat)
            .and_then(|id| self.connections.get(&id))
            .map(|c| c.player.connected)
            .unwrap_or(false);
        let secs = if connected {
            self.settings.turn_timer_seconds
        } else {
            cfg.disconnected_turn_timeout_secs
        };
        self.turn_timer_generation += 1;
        if let Some(game) = self.game.as_mut() {
            game.deadline_ts = Some(now_ms() + (secs as i64) * 1000);
        }
    }

    /// Re-arm the turn timer with the disconnected-owner duration, for
    /// when the current turn's seat owner disconnects mid-`TURNS`.
    pub fn rearm_disconnected_turn_timer(&mut self, cfg: &ServerConfig) {
        if self.game.as_ref().map(|g| g.phase) != Some(Phase::Turns) {
            return;
        }
        self.arm_turn_deadline(cfg);
    }

    pub fn turn_timer_generation(&self) -> u64 {
        self.turn_timer_generation
    }

    // ── TURNS ──────────────────────────────────────────────────────────

    fn require_turns_actor(&self, caller: PlayerId) -> Result<Seat, RoomError> {
        let game = self.game.as_ref().ok_or(RoomError::InvalidAction)?;
        if game.phase != Phase::Turns {
            return Err(RoomError::InvalidAction);
        }
        let seat = self.seat_of(caller).ok_or(RoomError::NotInRoom)?;
        if game.turn_seat != Some(seat) {
            return Err(RoomError::NotYourTurn);
        }
        if game.acted_seats.contains(&seat) {
            return Err(RoomError::AlreadyActed);
        }
        Ok(seat)
    }

    pub fn action_drink(
        &mut self,
        caller: PlayerId,
        cfg: &ServerConfig,
    ) -> Result<Vec<ServerMessage>, RoomError> {
        let seat = self.require_turns_actor(caller)?;
        self.resolve_drink(seat, cfg)
    }

    /// Shared by `ACTION_DRINK` and the turn-timeout synthetic default:
    /// a timed-out turn resolves as if the owner had drunk.
    pub fn resolve_drink(&mut self, seat: Seat, cfg: &ServerConfig) -> Result<Vec<ServerMessage>, RoomError> {
        let mut events = Vec::new();
        let card = {
            let game = self.game.as_ref().unwrap();
            *game.card_by_seat.get(&seat).ok_or(RoomError::InvalidAction)?
        };
        let eliminated = self.reveal_seat(seat, card, &mut events);
        {
            let game = self.game.as_mut().unwrap();
            game.acted_seats.insert(seat);
            game.facedown_seats.remove(&seat);
        }
        if eliminated {
            self.eliminate_seat(seat);
        }
        events.extend(self.advance_after_action(cfg));
        Ok(events)
    }

    pub fn action_swap(
        &mut self,
        caller: PlayerId,
        target_seat: Seat,
        cfg: &ServerConfig,
    ) -> Result<Vec<ServerMessage>, RoomError> {
        let seat = self.require_turns_actor(caller)?;
        {
            let game = self.game.as_ref().unwrap();
            if target_seat == seat
                || !game.alive_seats.contains(&target_seat)
                || !game.facedown_seats.contains(&target_seat)
            {
                return Err(RoomError::InvalidTarget);
            }
        }
        {
            let game = self.game.as_mut().unwrap();
            let a = game.card_by_seat.get(&seat).copied();
            let b = game.card_by_seat.get(&target_seat).copied();
            if let (Some(a), Some(b)) = (a, b) {
                game.card_by_seat.insert(seat, b);
                game.card_by_seat.insert(target_seat, a);
            }
            game.acted_seats.insert(seat);
        }
        let mut events = vec![ServerMessage::Swap {
            from_seat: seat,
            to_seat: target_seat,
        }];
        events.extend(self.advance_after_action(cfg));
        Ok(events)
    }

    pub fn action_steal_cheese(
        &mut self,
        caller: PlayerId,
        target_seat: Seat,
        cfg: &ServerConfig,
    ) -> Result<Vec<ServerMessage>, RoomError> {
        let seat = self.require_turns_actor(caller)?;
        if !self.settings.cheese_enabled {
            return Err(RoomError::InvalidAction);
        }
        {
            let game = self.game.as_ref().unwrap();
            if target_seat == seat || !game.alive_seats.contains(&target_seat) {
                return Err(RoomError::InvalidTarget);
            }
        }
        let self_has_cheese = self
            .player_id_at_seat(seat)
            .and_then(|id| self.connections.get(&id))
            .map(|c| c.player.has_cheese)
            .unwrap_or(false);
        if self_has_cheese {
            return Err(RoomError::AlreadyHasCheese);
        }
        let target_has_cheese = self
            .player_id_at_seat(target_seat)
            .and_then(|id| self.connections.get(&id))
            .map(|c| c.player.has_cheese)
            .unwrap_or(false);
        if !target_has_cheese {
            return Err(RoomError::NoCheeseToSteal);
        }
        if let Some(id) = self.player_id_at_seat(target_seat) {
            if let Some(c) = self.connections.get_mut(&id) {
                c.player.has_cheese = false;
            }
        }
        if let Some(id) = self.player_id_at_seat(seat) {
            if let Some(c) = self.connections.get_mut(&id) {
                c.player.has_cheese = true;
            }
        }
        if let Some(game) = self.game.as_mut() {
            game.acted_seats.insert(seat);
        }
        let mut events = vec![ServerMessage::CheeseStolen {
            from_seat: target_seat,
            to_seat: seat,
        }];
        events.extend(self.advance_after_action(cfg));
        Ok(events)
    }

    /// Reveal a seat's card and apply cheese-inverted elimination.
    /// Returns whether the seat is eliminated; appends the `REVEAL` (and
    /// `ELIM`, if applicable) events to `events`.
    fn reveal_seat(&self, seat: Seat, card: CardType, events: &mut Vec<ServerMessage>) -> bool {
        events.push(ServerMessage::Reveal { seat, card_type: card });
        let has_cheese = self
            .player_id_at_seat(seat)
            .and_then(|id| self.connections.get(&id))
            .map(|c| c.player.has_cheese)
            .unwrap_or(false);
        let base_eliminates = card == CardType::Doom;
        let eliminates = if has_cheese { !base_eliminates } else { base_eliminates };
        if eliminates {
            events.push(ServerMessage::Elim { seat });
        }
        eliminates
    }

    fn eliminate_seat(&mut self, seat: Seat) {
        if let Some(id) = self.player_id_at_seat(seat) {
            if let Some(c) = self.connections.get_mut(&id) {
                c.player.alive = false;
            }
        }
        if let Some(game) = self.game.as_mut() {
            game.alive_seats.retain(|&s| s != seat);
        }
    }

    /// Advancement policy: move to the next alive non-dealer seat that
    /// hasn't acted; otherwise enter `AWAITING_REVEAL`.
    fn advance_after_action(&mut self, cfg: &ServerConfig) -> Vec<ServerMessage> {
        let (dealer, cur, alive, acted) = {
            let game = self.game.as_ref().unwrap();
            (
                game.dealer_seat,
                game.turn_seat.unwrap(),
                game.alive_seats.clone(),
                game.acted_seats.clone(),
            )
        };

        if alive.is_empty() {
            return self.check_round_end();
        }

        let mut candidate = next_alive_clockwise(&alive, cur);
        let mut steps = 0;
        while (candidate == dealer || acted.contains(&candidate)) && steps < alive.len() {
            candidate = next_alive_clockwise(&alive, candidate);
            steps += 1;
        }

        let eligible = candidate != dealer && !acted.contains(&candidate);

        if eligible {
            let game = self.game.as_mut().unwrap();
            game.turn_seat = Some(candidate);
            self.arm_turn_deadline(cfg);
            vec![self.phase_event()]
        } else {
            let game = self.game.as_mut().unwrap();
            game.phase = Phase::AwaitingReveal;
            game.turn_seat = None;
            game.deadline_ts = None;
            vec![self.phase_event()]
        }
    }

    // ── AWAITING_REVEAL / FINAL_REVEAL ──────────────────────────────────

    pub fn start_reveal(&mut self, caller: PlayerId) -> Result<(), RoomError> {
        let game = self.game.as_ref().ok_or(RoomError::InvalidAction)?;
        if game.phase != Phase::AwaitingReveal {
            return Err(RoomError::InvalidAction);
        }
        if Some(caller) != self.dealer_player_id() {
            return Err(RoomError::NotDealer);
        }
        self.begin_final_reveal();
        Ok(())
    }

    /// Auto-trigger after the usual grace when the dealer is disconnected
    /// during `AWAITING_REVEAL`.
    pub fn auto_start_reveal(&mut self) {
        if self.game.as_ref().map(|g| g.phase) == Some(Phase::AwaitingReveal) {
            self.begin_final_reveal();
        }
    }

    fn begin_final_reveal(&mut self) {
        if let Some(game) = self.game.as_mut() {
            game.phase = Phase::FinalReveal;
        }
        self.phase_timer_generation += 1;
    }

    pub fn phase_timer_generation(&self) -> u64 {
        self.phase_timer_generation
    }

    /// Reveal the next still-facedown seat, applying cheese-inverted
    /// elimination. Returns `None` once every facedown seat has been
    /// revealed, signalling the caller to call [`Room::check_round_end`].
    pub fn reveal_next_facedown(&mut self) -> Option<Vec<ServerMessage>> {
        let next_seat = self
            .game
            .as_ref()
            .and_then(|g| g.facedown_seats.iter().next().copied())?;
        let card = *self.game.as_ref().unwrap().card_by_seat.get(&next_seat).unwrap();
        let mut events = Vec::new();
        let eliminated = self.reveal_seat(next_seat, card, &mut events);
        if let Some(game) = self.game.as_mut() {
            game.facedown_seats.remove(&next_seat);
        }
        if eliminated {
            self.eliminate_seat(next_seat);
        }
        Some(events)
    }

    pub fn has_pending_facedown(&self) -> bool {
        self.game
            .as_ref()
            .map(|g| !g.facedown_seats.is_empty())
            .unwrap_or(false)
    }

    /// `GAME_END` if <=1 alive, else `ROUND_END` followed (after a hold,
    /// scheduled by the caller) by the next `DEALER_SETUP`.
    pub fn check_round_end(&mut self) -> Vec<ServerMessage> {
        let alive = self.game.as_ref().unwrap().alive_seats.clone();
        if alive.len() <= 1 {
            let game = self.game.as_mut().unwrap();
            game.phase = Phase::GameEnd;
            game.turn_seat = None;
            game.deadline_ts = None;
            self.vote_yes.clear();
            let winner_seat = alive.first().copied().unwrap_or(game.dealer_seat);
            return vec![ServerMessage::GameEnd { winner_seat }];
        }
        let prev_dealer = self.game.as_ref().unwrap().dealer_seat;
        let next_dealer = next_alive_clockwise(&alive, prev_dealer);
        let game = self.game.as_mut().unwrap();
        game.phase = Phase::RoundEnd;
        game.turn_seat = None;
        game.deadline_ts = None;
        self.phase_timer_generation += 1;
        vec![ServerMessage::RoundEnd { next_dealer_seat: next_dealer }]
    }

    /// After the round-end hold: reset per-round bookkeeping, rotate the
    /// dealer, and return to `DEALER_SETUP`.
    pub fn begin_next_round(&mut self) -> Vec<ServerMessage> {
        let alive = self.game.as_ref().unwrap().alive_seats.clone();
        let prev_dealer = self.game.as_ref().unwrap().dealer_seat;
        let next_dealer = next_alive_clockwise(&alive, prev_dealer);
        let game = self.game.as_mut().unwrap();
        game.facedown_seats.clear();
        game.acted_seats.clear();
        game.card_by_seat.clear();
        game.dealer_seat = next_dealer;
        game.round_index += 1;
        game.phase = Phase::DealerSetup;
        vec![self.phase_event()]
    }

    // ── Voting ─────────────────────────────────────────────────────────

    pub fn required_votes(&self) -> usize {
        self.connected_seats().len()
    }

    pub fn vote_rematch(&mut self, caller: PlayerId, vote: bool) -> Result<Vec<ServerMessage>, RoomError> {
        if self.game.as_ref().map(|g| g.phase) != Some(Phase::GameEnd) {
            return Err(RoomError::InvalidAction);
        }
        let seat = self.seat_of(caller).ok_or(RoomError::NotInRoom)?;
        if vote {
            self.vote_yes.insert(seat);
        } else {
            self.vote_yes.remove(&seat);
        }
        Ok(self.evaluate_vote())
    }

    fn evaluate_vote(&mut self) -> Vec<ServerMessage> {
        let connected = self.connected_seats();
        self.vote_yes.retain(|s| connected.contains(s));
        let required = connected.len();
        let resolved = required > 0 && self.vote_yes == connected;

        if resolved {
            let mut events = vec![ServerMessage::VoteUpdate {
                voted_yes: self.vote_yes.iter().copied().collect(),
                required_votes: required,
                phase: VotePhase::Starting,
            }];
            events.extend(self.return_to_lobby());
            events
        } else {
            vec![ServerMessage::VoteUpdate {
                voted_yes: self.vote_yes.iter().copied().collect(),
                required_votes: required,
                phase: VotePhase::Voting,
            }]
        }
    }

    /// A disconnect/grace-expiry during voting shrinks the quorum; call
    /// this after mutating `connections` or `vote_yes` on that path too.
    pub fn recompute_vote_on_connectivity_change(&mut self) -> Option<Vec<ServerMessage>> {
        if self.game.as_ref().map(|g| g.phase) != Some(Phase::GameEnd) {
            return None;
        }
        Some(self.evaluate_vote())
    }

    /// `GAME_END` → `LOBBY`: discard game state, clear readiness/cheese,
    /// reset players alive.
    pub fn return_to_lobby(&mut self) -> Vec<ServerMessage> {
        self.game = None;
        self.status = parlor_core::domain::RoomStatus::Lobby;
        self.vote_yes.clear();
        for conn in self.connections.values_mut() {
            conn.player.ready = false;
            conn.player.alive = true;
            conn.player.has_cheese = false;
        }
        vec![ServerMessage::LobbyUpdate {
            players: self.players_sorted_by_seat(),
            settings: self.settings,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::{Connection, Room};
    use parlor_core::domain::{Player, RoomSettings};

    fn test_room(n_players: usize) -> Room {
        let settings = RoomSettings {
            turn_timer_seconds: 30,
            cheese_enabled: true,
            cheese_count: 1,
        };
        let mut room = Room::new(uuid::Uuid::new_v4(), "ABCDEF".into(), settings);
        room.host_id = 1;
        for i in 0..n_players {
            let id = (i + 1) as PlayerId;
            room.connections.insert(
                id,
                Connection {
                    player: Player::new(id, format!("p{i}"), 0, i as Seat),
                    token: format!("tok{i}"),
                    session_id: format!("sess{i}"),
                    sender: None,
                    disconnected_at: None,
                    disconnect_generation: 0,
                },
            );
        }
        room
    }

    #[test]
    fn start_game_enters_dealer_setup_with_all_seats_alive() {
        let mut room = test_room(4);
        for conn in room.connections.values_mut() {
            conn.player.ready = true;
        }
        room.start_game(1).unwrap();
        let game = room.game.as_ref().unwrap();
        assert_eq!(game.phase, Phase::DealerSetup);
        assert_eq!(game.alive_seats, vec![0, 1, 2, 3]);
    }

    #[test]
    fn dealer_set_by_non_dealer_is_rejected() {
        let mut room = test_room(3);
        for conn in room.connections.values_mut() {
            conn.player.ready = true;
        }
        room.start_game(1).unwrap();
        let dealer_id = room.player_id_at_seat(room.game.as_ref().unwrap().dealer_seat).unwrap();
        let impostor = (1..=3).find(|&id| id != dealer_id).unwrap();
        let composition = vec![CardType::Doom, CardType::Safe, CardType::Safe];
        assert_eq!(
            room.dealer_set(impostor, composition),
            Err(RoomError::NotDealer)
        );
    }

    #[test]
    fn cheese_inverts_elimination_on_doom_reveal() {
        let mut room = test_room(3);
        room.game = Some(GameState {
            phase: Phase::Turns,
            dealer_seat: 0,
            turn_seat: Some(1),
            round_index: 0,
            alive_seats: vec![0, 1, 2],
            facedown_seats: BTreeSet::new(),
            acted_seats: BTreeSet::new(),
            deadline_ts: None,
            card_by_seat: [(1, CardType::Doom)].into_iter().collect(),
        });
        let seat1_id = room.player_id_at_seat(1).unwrap();
        room.connections.get_mut(&seat1_id).unwrap().player.has_cheese = true;

        let mut events = Vec::new();
        let eliminated = room.reveal_seat(1, CardType::Doom, &mut events);
        assert!(!eliminated, "cheese should invert a DOOM reveal into survival");
        assert!(events.iter().any(|e| matches!(e, ServerMessage::Reveal { seat: 1, .. })));
        assert!(!events.iter().any(|e| matches!(e, ServerMessage::Elim { .. })));
    }

    #[test]
    fn next_alive_clockwise_wraps() {
        let alive = vec![0, 2, 5];
        assert_eq!(next_alive_clockwise(&alive, 0), 2);
        assert_eq!(next_alive_clockwise(&alive, 2), 5);
        assert_eq!(next_alive_clockwise(&alive, 5), 0);
    }

    #[test]
    fn validate_composition_requires_both_kinds() {
        let alive = vec![0, 1, 2];
        let all_safe = vec![CardType::Safe, CardType::Safe, CardType::Safe];
        assert_eq!(
            validate_composition(&alive, &all_safe),
            Err(RoomError::InvalidComposition)
        );
        let wrong_len = vec![CardType::Safe, CardType::Doom];
        assert_eq!(
            validate_composition(&alive, &wrong_len),
            Err(RoomError::MissingAssignments)
        );
        let valid = vec![CardType::Doom, CardType::Safe, CardType::Safe];
        let map = validate_composition(&alive, &valid).unwrap();
        assert_eq!(map[&0], CardType::Doom);
        assert_eq!(map[&1], CardType::Safe);
        assert_eq!(map[&2], CardType::Safe);
    }

    #[test]
    fn synthesize_composition_always_has_both_kinds() {
        for _ in 0..50 {
            let alive = vec![0, 1, 2, 3];
            let comp = synthesize_composition(&alive);
            assert_eq!(comp.len(), 4);
            assert!(comp.values().any(|c| *c == CardType::Safe));
            assert!(comp.values().any(|c| *c == CardType::Doom));
        }
    }
}
