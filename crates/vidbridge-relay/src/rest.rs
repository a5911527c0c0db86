//! REST surface: credential issuance, room creation/lookup, health.
//!
//! Shares [`AppState`] and [`RelayError`] with the socket transport so the
//! two surfaces stay consistent about identity and persistence.

use axum::extract::{ConnectInfo, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use vidbridge_store::models::{CreateRoomOptions, PublicRoom, PublicUser};

use crate::auth::extract_bearer;
use crate::error::RelayError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/rooms", post(create_room))
        .route("/api/rooms/{room_id}", get(get_room))
        .route("/health", get(health))
}

/// Applied ahead of the REST router: 100 requests per 15 minutes per
/// remote address, across every `/api/*` route. `/health` is exempt --
/// it carries no user input and orchestrators poll it frequently. The
/// remote address is unavailable unless the server was bound with
/// `into_make_service_with_connect_info`; when absent (e.g. in-process
/// tests) the request passes through unthrottled.
pub async fn rate_limit(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }
    if let Some(ConnectInfo(addr)) = connect_info {
        if !state.rest_rate_limiter.check(addr.ip()) {
            return RelayError::RateLimited.into_response();
        }
    }
    next.run(request).await
}

#[derive(Deserialize)]
struct RegisterRequest {
    email: String,
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct AuthResponse {
    token: String,
    user: PublicUser,
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), RelayError> {
    let (token, user) = state
        .credentials
        .register(&body.email, &body.username, &body.password)
        .await?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, RelayError> {
    let (token, user) = state.credentials.login(&body.email, &body.password).await?;
    Ok(Json(AuthResponse { token, user }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRoomRequest {
    name: String,
    #[serde(default)]
    is_private: bool,
    /// Accepted for compatibility with clients that still send a
    /// per-room password; the Room Store has no such attribute, so it is
    /// parsed and discarded.
    #[serde(default)]
    #[allow(dead_code)]
    password: Option<String>,
    #[serde(default)]
    waiting_room_enabled: bool,
}

#[derive(Serialize)]
struct RoomResponse {
    room: PublicRoom,
}

async fn create_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<RoomResponse>), RelayError> {
    let token = extract_bearer(headers.get("authorization").and_then(|v| v.to_str().ok()));
    let claims = token.and_then(|t| state.tokens.verify(t)).ok_or(RelayError::Unauthorized)?;

    let room = state
        .rooms
        .create_room(
            &body.name,
            &claims.sub,
            CreateRoomOptions {
                is_private: body.is_private,
                waiting_room_enabled: body.waiting_room_enabled,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(RoomResponse { room: PublicRoom::from(&room) })))
}

async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomResponse>, RelayError> {
    let room = state.rooms.get_room(&room_id).await?.ok_or(RelayError::NotFound)?;
    Ok(Json(RoomResponse { room: PublicRoom::from(&room) }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    active_rooms: usize,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        active_rooms: state.room_runtime.room_count(),
    })
}
