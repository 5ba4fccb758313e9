//! 进程内存储
//!
//! 未配置数据库时使用，进程退出后数据丢失。语义与 Postgres 实现保持一致：
//! 用户名唯一、消息按写入顺序排列。

use std::collections::HashMap;

use application::{MessageRepository, UserRepository};
use async_trait::async_trait;
use domain::{GlobalMessage, PrivateMessage, RepositoryError, User, Username};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        if users.contains_key(user.username.as_str()) {
            return Err(RepositoryError::Conflict);
        }
        users.insert(user.username.as_str().to_owned(), user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &Username) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().await.get(username.as_str()).cloned())
    }

    async fn ensure_exists(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        let stored = users
            .entry(user.username.as_str().to_owned())
            .or_insert(user);
        Ok(stored.clone())
    }
}

#[derive(Default)]
pub struct InMemoryMessageRepository {
    globals: RwLock<Vec<GlobalMessage>>,
    privates: RwLock<Vec<PrivateMessage>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn append_global(&self, message: GlobalMessage) -> Result<(), RepositoryError> {
        self.globals.write().await.push(message);
        Ok(())
    }

    async fn append_private(&self, message: PrivateMessage) -> Result<(), RepositoryError> {
        self.privates.write().await.push(message);
        Ok(())
    }

    async fn recent_global(&self, limit: u32) -> Result<Vec<GlobalMessage>, RepositoryError> {
        let globals = self.globals.read().await;
        let skip = globals.len().saturating_sub(limit as usize);
        Ok(globals[skip..].to_vec())
    }

    async fn conversation(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Vec<PrivateMessage>, RepositoryError> {
        let privates = self.privates.read().await;
        Ok(privates
            .iter()
            .filter(|message| message.is_between(user_a, user_b))
            .cloned()
            .collect())
    }
}
