//! The process-wide `RoomRegistry`: room creation, join-code and token
//! lookup, session-based reconnection, and reaping.

use std::collections::HashMap;
use std::sync::Arc;

use parlor_core::domain::{Player, PlayerId, RoomSettings, SessionId, Token};
use rand::seq::SliceRandom;
use tokio::sync::Mutex;

use crate::error::RegistryError;
use crate::room::Room;

/// One registered binding: which room/player a bearer token resolves to.
#[derive(Clone)]
struct TokenBinding {
    room_id: uuid::Uuid,
    player_id: PlayerId,
}

pub struct RoomRegistry {
    rooms: Mutex<HashMap<uuid::Uuid, Arc<Mutex<Room>>>>,
    join_codes: Mutex<HashMap<String, uuid::Uuid>>,
    tokens: Mutex<HashMap<Token, TokenBinding>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            join_codes: Mutex::new(HashMap::new()),
            tokens: Mutex::new(HashMap::new()),
        }
    }

    fn generate_token() -> Token {
        uuid::Uuid::new_v4().to_string()
    }

    async fn generate_unique_join_code(&self, join_codes: &HashMap<String, uuid::Uuid>) -> String {
        let mut rng = rand::rng();
        loop {
            let code: String = (0..parlor_core::config::JOIN_CODE_LENGTH)
                .map(|_| {
                    let &b = parlor_core::config::JOIN_CODE_ALPHABET.choose(&mut rng).unwrap();
                    b as char
                })
                .collect();
            if !join_codes.contains_key(&code) {
                return code;
            }
        }
    }

    /// `POST /rooms`: creates the room with the caller as host.
    pub async fn create_room(
        &self,
        host_name: String,
        avatar_id: u32,
        session_id: SessionId,
        settings: RoomSettings,
    ) -> Result<(uuid::Uuid, String, Token), RegistryError> {
        if !parlor_core::protocol::validate_name(&host_name) {
            return Err(RegistryError::InvalidRequest);
        }

        let room_id = uuid::Uuid::new_v4();
        let mut join_codes = self.join_codes.lock().await;
        let join_code = self.generate_unique_join_code(&join_codes).await;

        let mut room = Room::new(room_id, join_code.clone(), settings);
        let player_id = room.next_player_id;
        room.next_player_id += 1;
        let seat = room.next_free_seat();
        let token = Self::generate_token();
        room.connections.insert(
            player_id,
            crate::room::Connection {
                player: Player::new(player_id, host_name, avatar_id, seat),
                token: token.clone(),
                session_id,
                sender: None,
                disconnected_at: None,
                disconnect_generation: 0,
            },
        );
        room.host_id = player_id;

        join_codes.insert(join_code.clone(), room_id);
        drop(join_codes);

        self.rooms.lock().await.insert(room_id, Arc::new(Mutex::new(room)));
        self.tokens
            .lock()
            .await
            .insert(token.clone(), TokenBinding { room_id, player_id });

        Ok((room_id, join_code, token))
    }

    /// `POST /rooms/join`: joins by code, or reconnects by session.
    pub async fn join_room(
        &self,
        join_code: &str,
        name: String,
        avatar_id: u32,
        session_id: SessionId,
        max_players: usize,
    ) -> Result<(uuid::Uuid, Token, bool), RegistryError> {
        if !parlor_core::protocol::validate_name(&name) {
            return Err(RegistryError::InvalidRequest);
        }

        let room_id = *self
            .join_codes
            .lock()
            .await
            .get(join_code)
            .ok_or(RegistryError::RoomNotFound)?;
        let room_arc = self
            .rooms
            .lock()
            .await
            .get(&room_id)
            .cloned()
            .ok_or(RegistryError::RoomNotFound)?;

        let mut room = room_arc.lock().await;

        if let Some(existing_id) = room.find_by_session(&session_id) {
            let conn = room.connections.get(&existing_id).unwrap();
            if conn.player.connected {
                return Err(RegistryError::SessionAlreadyInRoom);
            }
            let token = conn.token.clone();
            return Ok((room_id, token, true));
        }

        if room.status != parlor_core::domain::RoomStatus::Lobby {
            return Err(RegistryError::GameInProgress);
        }
        if room.player_count() >= max_players {
            return Err(RegistryError::RoomFull);
        }
        if room.find_by_name_ci(&name).is_some() {
            return Err(RegistryError::NameTaken);
        }

        let player_id = room.next_player_id;
        room.next_player_id += 1;
        let seat = room.next_free_seat();
        let token = Self::generate_token();
        room.connections.insert(
            player_id,
            crate::room::Connection {
                player: Player::new(player_id, name, avatar_id, seat),
                token: token.clone(),
                session_id,
                sender: None,
                disconnected_at: None,
                disconnect_generation: 0,
            },
        );
        drop(room);

        self.tokens
            .lock()
            .await
            .insert(token.clone(), TokenBinding { room_id, player_id });

        Ok((room_id, token, false))
    }

    pub async fn lookup_by_token(&self, token: &str) -> Option<(uuid::Uuid, PlayerId)> {
        let binding = self.tokens.lock().await.get(token).cloned()?;
        Some((binding.room_id, binding.player_id))
    }

    pub async fn room_handle(&self, room_id: uuid::Uuid) -> Option<Arc<Mutex<Room>>> {
        self.rooms.lock().await.get(&room_id).cloned()
    }

    pub async fn remove_player_token(&self, token: &str) {
        self.tokens.lock().await.remove(token);
    }

    /// Periodic sweep: drop rooms with no remaining players and
    /// invalidate their tokens/join-codes in the same pass.
    pub async fn reap_empty(&self) {
        let mut rooms = self.rooms.lock().await;
        let mut dead = Vec::new();
        for (&id, room) in rooms.iter() {
            if room.lock().await.is_empty() {
                dead.push(id);
            }
        }
        if dead.is_empty() {
            return;
        }
        for id in &dead {
            rooms.remove(id);
        }
        drop(rooms);

        let mut join_codes = self.join_codes.lock().await;
        join_codes.retain(|_, room_id| !dead.contains(room_id));
        drop(join_codes);

        let mut tokens = self.tokens.lock().await;
        tokens.retain(|_, binding| !dead.contains(&binding.room_id));
    }

    pub async fn live_room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }
}
