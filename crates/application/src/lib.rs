//! 应用层实现。
//!
//! 这里是实时连接与消息路由的核心：会话认证、连接注册表、全局广播与私信投递、
//! 在线状态通知；同时提供 HTTP 用例服务，以及对外部适配器（凭据存储、持久化
//! 消息日志、密码哈希、时钟）的抽象。

pub mod authenticator;
pub mod clock;
pub mod connection;
pub mod credentials;
pub mod dto;
pub mod error;
pub mod presence;
pub mod registry;
pub mod repository;
pub mod router;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;

pub use authenticator::{AuthError, SessionAuthenticator};
pub use clock::{Clock, SystemClock};
pub use connection::{ConnectionHandle, ConnectionId, OutboundReceiver, TransportError};
pub use credentials::{PasswordHasher, PasswordHasherError, TokenClaims, TokenError, TokenService};
pub use dto::{GlobalMessageDto, PrivateMessageDto, TokenDto};
pub use error::ApplicationError;
pub use presence::PresenceNotifier;
pub use registry::ConnectionRegistry;
pub use repository::{MessageRepository, UserRepository};
pub use router::{MessageRouter, MessageRouterDependencies, RouteError};
pub use services::{
    HistoryService, LoginRequest, RegisterUserRequest, UserService, UserServiceDependencies,
};
