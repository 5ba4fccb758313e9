#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use application::{
    Clock, ConnectionRegistry, HistoryService, MessageRouter, MessageRouterDependencies,
    SessionAuthenticator, SystemClock, TokenService, UserService, UserServiceDependencies,
};
use futures_util::{SinkExt, StreamExt};
use infrastructure::Infrastructure;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::{net::TcpListener, net::TcpStream, sync::oneshot, time::timeout};
use tokio_tungstenite::{
    connect_async, tungstenite::Message as TungsteniteMessage, MaybeTlsStream, WebSocketStream,
};
use web_api::{router as build_router_fn, AppState, JwtConfig, JwtService};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const GLOBAL_LIMIT: u32 = 200;

/// 使用内存存储启动的完整服务
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        let infra = Infrastructure::in_memory(4);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let tokens: Arc<dyn TokenService> = Arc::new(JwtService::new(JwtConfig {
            secret: "integration-test-secret".to_string(),
            expiration_hours: 24,
        }));

        let user_service = UserService::new(UserServiceDependencies {
            user_repository: infra.user_repository.clone(),
            password_hasher: infra.password_hasher.clone(),
            token_service: tokens.clone(),
            clock: clock.clone(),
        });
        let history_service = HistoryService::new(infra.message_repository.clone(), GLOBAL_LIMIT);
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
        let router = build_router_fn(state, &[]);

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, router.into_make_service())
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        Self {
            addr,
            client: Client::new(),
            shutdown: Some(shutdown_tx),
        }
    }

    pub fn http(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn register(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.http("/auth/register"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("register request")
    }

    pub async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.http("/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("login request")
    }

    /// 注册用户并返回会话令牌
    pub async fn token_for(&self, username: &str) -> String {
        let body: Value = self
            .register(username, "secret")
            .await
            .json()
            .await
            .expect("register json");
        body["token"].as_str().expect("token field").to_string()
    }

    pub async fn get_json(&self, path: &str) -> Value {
        self.client
            .get(self.http(path))
            .send()
            .await
            .expect("get request")
            .json()
            .await
            .expect("json body")
    }

    pub async fn connect(&self) -> WsStream {
        let (ws, _) = connect_async(format!("ws://{}/ws", self.addr))
            .await
            .expect("ws connect");
        ws
    }

    /// 建立连接、发送 join 并消费自己的那条在线列表广播
    pub async fn join(&self, token: &str) -> WsStream {
        let mut ws = self.connect().await;
        send_json(&mut ws, json!({ "type": "join", "token": token })).await;
        let presence = next_json(&mut ws).await;
        assert_eq!(presence["type"], "onlineUsers", "unexpected {presence}");
        ws
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub async fn send_json(ws: &mut WsStream, value: Value) {
    ws.send(TungsteniteMessage::text(value.to_string()))
        .await
        .expect("ws send");
}

/// 读取下一条文本帧，跳过控制帧
pub async fn next_json(ws: &mut WsStream) -> Value {
    loop {
        let message = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for ws message")
            .expect("ws stream ended")
            .expect("ws error");
        if let TungsteniteMessage::Text(payload) = message {
            return serde_json::from_str(payload.as_str()).expect("valid json");
        }
    }
}

/// 在给定时间内没有任何文本帧到达
pub async fn assert_silent(ws: &mut WsStream) {
    let deadline = Duration::from_millis(200);
    loop {
        match timeout(deadline, ws.next()).await {
            Err(_) => return,
            Ok(Some(Ok(TungsteniteMessage::Text(payload)))) => {
                panic!("unexpected message: {}", payload.as_str())
            }
            Ok(Some(Ok(_))) => continue,
            Ok(other) => panic!("connection ended unexpectedly: {other:?}"),
        }
    }
}
