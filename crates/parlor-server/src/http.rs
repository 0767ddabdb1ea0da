//! External HTTP surface: room creation, session-based join, and a
//! liveness probe. The message channel itself is the WebSocket route
//! wired up in `main.rs` / handled by [`crate::ws_handler`].

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use parlor_core::domain::RoomSettings;
use serde::{Deserialize, Serialize};

use crate::config::ServerConfig;
use crate::error::RegistryError;
use crate::registry::RoomRegistry;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RoomRegistry>,
    pub config: ServerConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub host_name: String,
    pub avatar_id: u32,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResponse {
    pub room_id: String,
    pub join_code: String,
    pub token: String,
}

/// `POST /rooms`.
pub async fn create_room(
    State(state): State<AppState>,
    Json(req): Json<CreateRoomRequest>,
) -> Result<Json<CreateRoomResponse>, ApiError> {
    let settings = RoomSettings {
        turn_timer_seconds: state.config.default_turn_timer_secs,
        cheese_enabled: true,
        cheese_count: state.config.default_cheese_count,
    };
    let (room_id, join_code, token) = state
        .registry
        .create_room(req.host_name, req.avatar_id, req.session_id, settings)
        .await?;
    Ok(Json(CreateRoomResponse {
        room_id: room_id.to_string(),
        join_code,
        token,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    pub join_code: String,
    pub name: String,
    pub avatar_id: u32,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomResponse {
    pub room_id: String,
    pub token: String,
}

/// `POST /rooms/join`.
pub async fn join_room(
    State(state): State<AppState>,
    Json(req): Json<JoinRoomRequest>,
) -> Result<Json<JoinRoomResponse>, ApiError> {
    let (room_id, token, _is_reconnect) = state
        .registry
        .join_room(
            &req.join_code,
            req.name,
            req.avatar_id,
            req.session_id,
            state.config.max_players,
        )
        .await?;
    Ok(Json(JoinRoomResponse {
        room_id: room_id.to_string(),
        token,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub live_rooms: usize,
}

/// `GET /healthz`.
pub async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        live_rooms: state.registry.live_room_count().await,
    })
}

/// Wraps [`RegistryError`] so handlers can use `?` and still answer with
/// the wire error taxonomy instead of a bare HTTP status.
pub struct ApiError(RegistryError);

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            RegistryError::RoomNotFound => StatusCode::NOT_FOUND,
            RegistryError::RoomFull | RegistryError::GameInProgress | RegistryError::NameTaken => {
                StatusCode::CONFLICT
            }
            RegistryError::SessionAlreadyInRoom => StatusCode::CONFLICT,
            RegistryError::InvalidToken | RegistryError::InvalidRequest => StatusCode::BAD_REQUEST,
        };
        let code = self.0.code();
        let body = Json(serde_json::json!({
            "code": code,
            "message": code.default_message(),
        }));
        (status, body).into_response()
    }
}
