//! 消息路由
//!
//! 每个连接的状态机：`未认证 -> 已认证`，连接关闭后进入隐式的 `已关闭`，不会再回到前两个状态。
//! 入站信封按到达顺序逐条处理，每条的规则依次为：
//! 1. `join`：认证 -> 注册 -> 广播在线列表，任一步失败即停止
//! 2. 其他任何 `type`（包括未知类型和字段不全的帧）都先要求连接已注册，
//!    否则回复 `not authenticated` 并丢弃，之后才做完整解码
//! 3. `chat`：持久化后广播给所有连接（包括发送方）
//! 4. `private`：持久化后投递给接收方（如在线）并回送发送方
//!
//! 持久化失败只记录日志，实时投递照常进行。

use std::sync::Arc;

use domain::{
    ClientEnvelope, EnvelopeError, GlobalMessage, Identity, MessageId, PrivateMessage,
    RawEnvelope, ServerEnvelope,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    authenticator::{AuthError, SessionAuthenticator},
    clock::Clock,
    connection::ConnectionHandle,
    presence::PresenceNotifier,
    registry::ConnectionRegistry,
    repository::MessageRepository,
};

/// 单条入站信封处理失败的原因，只回报给出错的连接
#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("connection already authenticated as another user")]
    IdentityConflict,
}

impl RouteError {
    /// 回给客户端的 `error` 信封文本
    pub fn client_message(&self) -> String {
        match self {
            Self::Envelope(EnvelopeError::Malformed(_)) => "server error".into(),
            Self::Envelope(EnvelopeError::UnknownType(tag)) => {
                format!("unknown message type: {tag}")
            }
            Self::Auth(AuthError::MissingToken) => "token required".into(),
            Self::Auth(AuthError::InvalidToken) => "invalid token".into(),
            Self::Auth(AuthError::Store(_)) => "server error".into(),
            Self::NotAuthenticated => "not authenticated".into(),
            Self::IdentityConflict => "already authenticated".into(),
        }
    }
}

pub struct MessageRouterDependencies {
    pub authenticator: SessionAuthenticator,
    pub registry: Arc<ConnectionRegistry>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub clock: Arc<dyn Clock>,
}

pub struct MessageRouter {
    deps: MessageRouterDependencies,
    presence: PresenceNotifier,
}

impl MessageRouter {
    pub fn new(deps: MessageRouterDependencies) -> Self {
        let presence = PresenceNotifier::new(deps.registry.clone());
        Self { deps, presence }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.deps.registry
    }

    /// 处理一条入站文本帧；返回后该帧的持久化与投递都已完成
    pub async fn handle(&self, connection: &ConnectionHandle, text: &str) {
        if let Err(err) = self.route(connection, text).await {
            warn!(connection_id = %connection.id(), error = %err, "envelope rejected");
            if connection
                .send(ServerEnvelope::error(err.client_message()))
                .is_err()
            {
                debug!(connection_id = %connection.id(), "connection closed before error reply");
            }
        }
    }

    /// 连接关闭时调用；仅当连接曾注册过时才注销并广播在线列表
    pub async fn disconnect(&self, connection: &ConnectionHandle) {
        if let Some(identity) = self.deps.registry.unregister(connection.id()).await {
            info!(
                connection_id = %connection.id(),
                username = %identity.username,
                "user left"
            );
            self.presence.announce().await;
        }
    }

    async fn route(&self, connection: &ConnectionHandle, text: &str) -> Result<(), RouteError> {
        let raw = RawEnvelope::parse(text)?;
        // 非 join 帧先检查连接是否已注册，再解码
        let identity = if raw.is_join() {
            None
        } else {
            Some(self.require_identity(connection).await?)
        };

        match (raw.decode()?, identity) {
            (ClientEnvelope::Join { token }, _) => self.join(connection, token.as_deref()).await,
            (ClientEnvelope::Chat { content, time }, Some(identity)) => {
                self.chat(&identity, content, time).await;
                Ok(())
            }
            (ClientEnvelope::Private { content, to, time }, Some(identity)) => {
                self.private(connection, &identity, content, to, time).await;
                Ok(())
            }
            (_, None) => Err(RouteError::NotAuthenticated),
        }
    }

    async fn require_identity(&self, connection: &ConnectionHandle) -> Result<Identity, RouteError> {
        self.deps
            .registry
            .lookup(connection.id())
            .await
            .ok_or(RouteError::NotAuthenticated)
    }

    async fn join(
        &self,
        connection: &ConnectionHandle,
        token: Option<&str>,
    ) -> Result<(), RouteError> {
        let identity = self.deps.authenticator.authenticate(token).await?;

        if let Some(current) = self.deps.registry.lookup(connection.id()).await {
            if current != identity {
                return Err(RouteError::IdentityConflict);
            }
        }

        self.deps.registry.register(connection, identity.clone()).await;
        info!(
            connection_id = %connection.id(),
            username = %identity.username,
            "user joined"
        );
        self.presence.announce().await;
        Ok(())
    }

    async fn chat(&self, identity: &Identity, content: String, time: Option<String>) {
        let time = self.resolve_time(time);
        let record = GlobalMessage {
            id: MessageId::from(Uuid::new_v4()),
            username: identity.username.clone(),
            content: content.clone(),
            time: time.clone(),
            created_at: self.deps.clock.now(),
        };

        if let Err(err) = self.deps.message_repository.append_global(record).await {
            error!(
                error = %err,
                username = %identity.username,
                "failed to persist chat message, broadcasting anyway"
            );
        }

        let delivered = self
            .deps
            .registry
            .broadcast(&ServerEnvelope::Chat {
                username: identity.username.as_str().to_owned(),
                message: content,
                time,
            })
            .await;
        debug!(username = %identity.username, delivered, "chat message broadcast");
    }

    async fn private(
        &self,
        connection: &ConnectionHandle,
        identity: &Identity,
        content: String,
        to: String,
        time: Option<String>,
    ) {
        let time = self.resolve_time(time);
        let record = PrivateMessage {
            id: MessageId::from(Uuid::new_v4()),
            from_user: identity.username.clone(),
            to_user: to.clone(),
            content: content.clone(),
            time: time.clone(),
            created_at: self.deps.clock.now(),
        };

        if let Err(err) = self.deps.message_repository.append_private(record).await {
            error!(
                error = %err,
                from = %identity.username,
                to = %to,
                "failed to persist private message, delivering anyway"
            );
        }

        let envelope = ServerEnvelope::Private {
            from: identity.username.as_str().to_owned(),
            content,
            time,
        };

        match self.deps.registry.find_connection(&to).await {
            Some(recipient) if recipient.id() != connection.id() => {
                if let Err(err) = recipient.send(envelope.clone()) {
                    debug!(error = %err, to = %to, "recipient closed before delivery");
                }
            }
            Some(_) => {}
            None => debug!(to = %to, "recipient offline, message stored only"),
        }

        if let Err(err) = connection.send(envelope) {
            debug!(error = %err, "sender closed before echo");
        }
    }

    fn resolve_time(&self, time: Option<String>) -> String {
        time.filter(|time| !time.is_empty())
            .unwrap_or_else(|| self.deps.clock.wall_clock_label())
    }
}
