//! 主应用程序入口
//!
//! 加载配置、组装适配器与核心组件，启动 Axum Web API 与 WebSocket 服务。

use std::sync::Arc;

use application::{
    Clock, ConnectionRegistry, HistoryService, MessageRouter, MessageRouterDependencies,
    SessionAuthenticator, SystemClock, TokenService, UserService, UserServiceDependencies,
};
use config::AppConfig;
use infrastructure::Infrastructure;
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;
    tracing::info!(config = %config.sanitize(), "configuration loaded");

    let infra = Infrastructure::from_config(&config).await?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let tokens: Arc<dyn TokenService> = Arc::new(JwtService::new(config.jwt.clone()));

    // 创建应用层服务
    let user_service = UserService::new(UserServiceDependencies {
        user_repository: infra.user_repository.clone(),
        password_hasher: infra.password_hasher.clone(),
        token_service: tokens.clone(),
        clock: clock.clone(),
    });
    let history_service =
        HistoryService::new(infra.message_repository.clone(), config.history.global_limit);

    // 进程内唯一的连接注册表，注入到每个连接的处理流程中
    let message_router = MessageRouter::new(MessageRouterDependencies {
        authenticator: SessionAuthenticator::new(tokens, infra.user_repository, clock.clone()),
        registry: Arc::new(ConnectionRegistry::new()),
        message_repository: infra.message_repository,
        clock,
    });

    let state = AppState::new(
        Arc::new(user_service),
        Arc::new(history_service),
        Arc::new(message_router),
    );

    // 启动 Web 服务器
    let app = router(state, &config.server.cors_origins);
    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!("聊天服务器启动在 http://{}", address);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
