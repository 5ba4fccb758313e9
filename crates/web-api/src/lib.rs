//! Web API 层。
//!
//! 提供 Axum 路由：HTTP 注册/登录/历史查询接口，以及把 WebSocket 连接接入消息路由核心的驱动。

mod auth;
mod error;
mod routes;
mod state;
mod ws_connection;

pub use auth::JwtService;
pub use config::JwtConfig;
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
