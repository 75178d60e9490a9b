//! HTTP room endpoints (axum).

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use ludo_common::RelayError;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use super::store::{JoinOutcome, Room, RoomStore};
use crate::broadcast::{BroadcastStatsSnapshot, RoomBroadcaster};
use crate::protocol::{ChannelKind, RoomEvent};

/// Shared state accessible from handlers.
#[derive(Clone)]
pub struct ApiState {
    pub broadcaster: RoomBroadcaster,
    pub store: Arc<dyn RoomStore>,
    pub max_players: u32,
    pub start_time: Instant,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub player_id: String,
    pub room_code: String,
}

#[derive(Debug, Deserialize)]
pub struct JoinRoomRequest {
    pub player_id: String,
    pub room_code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRoomResponse {
    pub ok: bool,
    pub room_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectionCounts {
    pub state: usize,
    pub voice: usize,
}

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub backend: &'static str,
    pub store: &'static str,
    pub rooms_stored: usize,
    pub active_rooms: usize,
    pub connections: ConnectionCounts,
    pub broadcast: BroadcastStatsSnapshot,
    pub uptime_secs: u64,
}

/// Handler failures, rendered as `{"ok": false, "error": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Store(msg) => ApiError::Conflict(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = serde_json::json!({ "ok": false, "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

/// Build the room API router.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/api/room/create", post(create_room_handler))
        .route("/api/room/join", post(join_room_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn require(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{field} must not be empty")));
    }
    Ok(())
}

/// GET /
async fn root_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Ludo backend running" }))
}

/// GET /health
async fn health_handler(State(state): State<ApiState>) -> Result<Json<HealthResponse>, ApiError> {
    let registry = state.broadcaster.registry();
    Ok(Json(HealthResponse {
        backend: "running",
        store: state.store.backend(),
        rooms_stored: state.store.room_count().await?,
        active_rooms: registry.room_count().await,
        connections: ConnectionCounts {
            state: registry.connection_count(ChannelKind::State).await,
            voice: registry.connection_count(ChannelKind::Voice).await,
        },
        broadcast: state.broadcaster.stats(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    }))
}

/// POST /api/room/create
async fn create_room_handler(
    State(state): State<ApiState>,
    Json(req): Json<CreateRoomRequest>,
) -> Result<Json<CreateRoomResponse>, ApiError> {
    require("player_id", &req.player_id)?;
    require("room_code", &req.room_code)?;

    let room = Room::new(&req.room_code, &req.player_id, state.max_players);
    let room_id = state.store.create_room(room).await?;
    Ok(Json(CreateRoomResponse { ok: true, room_id }))
}

/// POST /api/room/join
///
/// Seats the player when the room is stored and has a free seat, then
/// announces the join on the room's state channel in every case.
async fn join_room_handler(
    State(state): State<ApiState>,
    Json(req): Json<JoinRoomRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    require("player_id", &req.player_id)?;
    require("room_code", &req.room_code)?;

    match state.store.add_player(&req.room_code, &req.player_id).await? {
        JoinOutcome::Full => {
            warn!(room = %req.room_code, player = %req.player_id, "room full, player not seated");
        }
        outcome => {
            info!(room = %req.room_code, player = %req.player_id, ?outcome, "player joined");
        }
    }

    let event = RoomEvent::PlayerJoined {
        player_id: req.player_id,
    };
    state
        .broadcaster
        .broadcast_state(&req.room_code, &event.to_value())
        .await;
    Ok(Json(OkResponse { ok: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ConnectionHandle, ConnectionRegistry};
    use crate::protocol::Outbound;
    use crate::rooms::MemoryRoomStore;
    use axum::body::Body;
    use axum::http::{header, Request};
    use ludo_common::ConnectionId;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    fn make_state() -> ApiState {
        let registry = ConnectionRegistry::new();
        ApiState {
            broadcaster: RoomBroadcaster::new(registry, Duration::from_millis(50)),
            store: Arc::new(MemoryRoomStore::new()),
            max_players: 2,
            start_time: Instant::now(),
        }
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn root_reports_running() {
        let app = router(make_state());
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["message"], "Ludo backend running");
    }

    #[tokio::test]
    async fn health_reports_counts() {
        let state = make_state();
        let (tx, _rx) = mpsc::channel(4);
        state
            .broadcaster
            .registry()
            .connect("R1", ChannelKind::Voice, ConnectionHandle::new(ConnectionId::new(), tx))
            .await;

        let app = router(state);
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let parsed = body_json(resp).await;
        assert_eq!(parsed["backend"], "running");
        assert_eq!(parsed["store"], "memory");
        assert_eq!(parsed["active_rooms"], 1);
        assert_eq!(parsed["connections"]["voice"], 1);
        assert_eq!(parsed["connections"]["state"], 0);
        assert!(parsed["broadcast"]["state_delivered"].is_number());
    }

    #[tokio::test]
    async fn create_room_returns_id_and_stores_room() {
        let state = make_state();
        let store = Arc::clone(&state.store);
        let app = router(state);

        let resp = app
            .oneshot(post_json(
                "/api/room/create",
                serde_json::json!({"player_id": "p1", "room_code": "R1"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let parsed = body_json(resp).await;
        assert_eq!(parsed["ok"], true);

        let room = store.get_room("R1").await.unwrap().unwrap();
        assert_eq!(parsed["room_id"], room.id.as_str());
        assert_eq!(room.max_players, 2);
    }

    #[tokio::test]
    async fn create_duplicate_room_conflicts() {
        let app = router(make_state());
        let body = serde_json::json!({"player_id": "p1", "room_code": "R1"});

        let first = app.clone().oneshot(post_json("/api/room/create", body.clone())).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app.oneshot(post_json("/api/room/create", body)).await.unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(second).await["ok"], false);
    }

    #[tokio::test]
    async fn blank_fields_are_bad_request() {
        let app = router(make_state());
        let resp = app
            .oneshot(post_json(
                "/api/room/join",
                serde_json::json!({"player_id": " ", "room_code": "R1"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let app = router(make_state());
        let req = Request::builder()
            .method("POST")
            .uri("/api/room/join")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"player_id\":"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn join_unknown_room_with_no_members_is_ok() {
        let state = make_state();
        let broadcaster = state.broadcaster.clone();
        let app = router(state);

        let resp = app
            .oneshot(post_json(
                "/api/room/join",
                serde_json::json!({"player_id": "p7", "room_code": "R1"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["ok"], true);
        assert_eq!(broadcaster.stats(), BroadcastStatsSnapshot::default());
    }

    #[tokio::test]
    async fn join_announces_to_state_members_only() {
        let state = make_state();
        let registry = state.broadcaster.registry().clone();
        let (state_tx, mut state_rx) = mpsc::channel(4);
        let (voice_tx, mut voice_rx) = mpsc::channel(4);
        registry
            .connect("R1", ChannelKind::State, ConnectionHandle::new(ConnectionId::new(), state_tx))
            .await;
        registry
            .connect("R1", ChannelKind::Voice, ConnectionHandle::new(ConnectionId::new(), voice_tx))
            .await;
        let app = router(state);

        let resp = app
            .oneshot(post_json(
                "/api/room/join",
                serde_json::json!({"player_id": "p7", "room_code": "R1"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let Outbound::State(text) = state_rx.try_recv().unwrap() else {
            panic!("expected a state frame");
        };
        let got: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(got, serde_json::json!({"type": "player_joined", "player_id": "p7"}));
        assert!(voice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn join_full_room_announces_without_seating() {
        let state = make_state();
        state.store.create_room(Room::new("R1", "p1", 2)).await.unwrap();
        state.store.add_player("R1", "p2").await.unwrap();
        let broadcaster = state.broadcaster.clone();
        let store = Arc::clone(&state.store);
        let (tx, mut rx) = mpsc::channel(4);
        broadcaster
            .registry()
            .connect("R1", ChannelKind::State, ConnectionHandle::new(ConnectionId::new(), tx))
            .await;
        let app = router(state);

        let resp = app
            .oneshot(post_json(
                "/api/room/join",
                serde_json::json!({"player_id": "p3", "room_code": "R1"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, serde_json::json!({"ok": true}));

        let Outbound::State(text) = rx.try_recv().unwrap() else {
            panic!("expected a state frame");
        };
        let got: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(got, serde_json::json!({"type": "player_joined", "player_id": "p3"}));

        let room = store.get_room("R1").await.unwrap().unwrap();
        assert_eq!(room.players, vec!["p1".to_string(), "p2".to_string()]);
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let app = router(make_state());
        let req = Request::builder().uri("/nonexistent").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
