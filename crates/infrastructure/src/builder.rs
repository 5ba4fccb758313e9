use std::sync::Arc;

use application::{MessageRepository, PasswordHasher, UserRepository};
use config::AppConfig;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    memory::{InMemoryMessageRepository, InMemoryUserRepository},
    migrations::MIGRATOR,
    password::BcryptPasswordHasher,
    repository::{create_pg_pool, PgStorage},
};

#[derive(Debug, Error)]
pub enum InfrastructureError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// 组装好的外部适配器
#[derive(Clone)]
pub struct Infrastructure {
    pub user_repository: Arc<dyn UserRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub password_hasher: Arc<dyn PasswordHasher>,
}

impl Infrastructure {
    /// 配置了 `database.url` 时连接 Postgres 并执行迁移，否则使用进程内存储
    pub async fn from_config(config: &AppConfig) -> Result<Self, InfrastructureError> {
        match config.database.url.as_deref() {
            Some(url) => {
                Self::connect(
                    url,
                    config.database.max_connections,
                    config.security.bcrypt_cost,
                )
                .await
            }
            None => {
                warn!("database.url not set, messages will not survive a restart");
                Ok(Self::in_memory(config.security.bcrypt_cost))
            }
        }
    }

    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        bcrypt_cost: u32,
    ) -> Result<Self, InfrastructureError> {
        let pool = create_pg_pool(database_url, max_connections).await?;
        MIGRATOR.run(&pool).await?;
        info!(max_connections, "postgres storage ready");

        let storage = PgStorage::new(pool);
        Ok(Self {
            user_repository: storage.user_repository,
            message_repository: storage.message_repository,
            password_hasher: Arc::new(BcryptPasswordHasher::new(Some(bcrypt_cost))),
        })
    }

    pub fn in_memory(bcrypt_cost: u32) -> Self {
        Self {
            user_repository: Arc::new(InMemoryUserRepository::new()),
            message_repository: Arc::new(InMemoryMessageRepository::new()),
            password_hasher: Arc::new(BcryptPasswordHasher::new(Some(bcrypt_cost))),
        }
    }
}
