use axum::{
    extract::{ws::WebSocketUpgrade, Path, State},
    http::{HeaderValue, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use application::{
    GlobalMessageDto, LoginRequest, PrivateMessageDto, RegisterUserRequest, TokenDto,
};

use crate::{error::ApiError, state::AppState, ws_connection::WebSocketConnection};

#[derive(Debug, Deserialize)]
struct CredentialsPayload {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(websocket_upgrade))
        .route("/ws", get(websocket_upgrade))
        .route("/health", get(health))
        .route("/auth/register", post(register_user))
        .route("/auth/login", post(login_user))
        .route("/messages", get(recent_messages))
        .route("/private-messages/{user1}/{user2}", get(private_messages))
        .route("/online-users", get(online_users))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(origin = %origin, error = %err, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsPayload>,
) -> Result<Json<TokenDto>, ApiError> {
    let dto = state
        .user_service
        .register(RegisterUserRequest {
            username: payload.username,
            password: payload.password,
        })
        .await?;

    Ok(Json(dto))
}

async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsPayload>,
) -> Result<Json<TokenDto>, ApiError> {
    let dto = state
        .user_service
        .login(LoginRequest {
            username: payload.username,
            password: payload.password,
        })
        .await?;

    Ok(Json(dto))
}

async fn recent_messages(
    State(state): State<AppState>,
) -> Result<Json<Vec<GlobalMessageDto>>, ApiError> {
    let items = state.history_service.recent_global().await?;
    Ok(Json(items))
}

async fn private_messages(
    State(state): State<AppState>,
    Path((user1, user2)): Path<(String, String)>,
) -> Result<Json<Vec<PrivateMessageDto>>, ApiError> {
    let items = state.history_service.conversation(&user1, &user2).await?;
    Ok(Json(items))
}

async fn online_users(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.registry().snapshot().await)
}

async fn websocket_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| WebSocketConnection::new(socket, state.message_router).run())
}
