//! 基础设施层实现。
//!
//! 提供凭据存储与消息日志的 Postgres/内存仓储、bcrypt 密码哈希，实现应用层定义的接口。

pub mod builder;
pub mod memory;
pub mod migrations;
pub mod password;
pub mod repository;

pub use builder::{Infrastructure, InfrastructureError};
pub use memory::{InMemoryMessageRepository, InMemoryUserRepository};
pub use migrations::MIGRATOR;
pub use password::BcryptPasswordHasher;
pub use repository::{create_pg_pool, PgMessageRepository, PgStorage, PgUserRepository};
