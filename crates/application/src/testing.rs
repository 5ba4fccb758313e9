//! 单元测试共用的内存替身

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use domain::{
    GlobalMessage, PasswordHash, PrivateMessage, RepositoryError, Timestamp, User, UserId,
    Username,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    clock::Clock,
    credentials::{PasswordHasher, PasswordHasherError, TokenClaims, TokenError, TokenService},
    repository::{MessageRepository, UserRepository},
};

/// `valid:<username>` 形式的令牌视为有效
pub struct StaticTokens;

impl TokenService for StaticTokens {
    fn issue(&self, user: &User) -> Result<String, TokenError> {
        Ok(format!("valid:{}", user.username))
    }

    fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let username = token
            .strip_prefix("valid:")
            .ok_or_else(|| TokenError::Invalid("bad signature".into()))?;
        Ok(TokenClaims {
            user_id: Uuid::nil(),
            username: username.to_owned(),
            exp: i64::MAX,
        })
    }
}

pub struct FixedClock {
    pub now: Timestamp,
    pub label: String,
}

impl Default for FixedClock {
    fn default() -> Self {
        Self {
            now: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
            label: "09:30".into(),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.now
    }

    fn wall_clock_label(&self) -> String {
        self.label.clone()
    }
}

/// 明文比较的密码哈希替身
pub struct PlainHasher;

#[async_trait]
impl PasswordHasher for PlainHasher {
    async fn hash(&self, plaintext: &str) -> Result<PasswordHash, PasswordHasherError> {
        PasswordHash::new(format!("plain:{plaintext}"))
            .map_err(|err| PasswordHasherError::hash_error(err.to_string()))
    }

    async fn verify(
        &self,
        plaintext: &str,
        hashed: &PasswordHash,
    ) -> Result<bool, PasswordHasherError> {
        Ok(hashed.as_str() == format!("plain:{plaintext}"))
    }
}

#[derive(Default)]
pub struct MemoryUsers {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryUsers {
    pub async fn get(&self, username: &str) -> Option<User> {
        self.users.read().await.get(username).cloned()
    }

    pub async fn insert_with_password(&self, username: &str) -> User {
        let user = User::register(
            UserId::from(Uuid::new_v4()),
            Username::parse(username).unwrap(),
            PasswordHash::new("plain:secret").unwrap(),
            FixedClock::default().now,
        );
        self.users
            .write()
            .await
            .insert(username.to_owned(), user.clone());
        user
    }
}

#[async_trait]
impl UserRepository for MemoryUsers {
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
        Ok(users
            .entry(user.username.as_str().to_owned())
            .or_insert(user)
            .clone())
    }
}

#[derive(Default)]
pub struct RecordingLog {
    pub globals: RwLock<Vec<GlobalMessage>>,
    pub privates: RwLock<Vec<PrivateMessage>>,
}

#[async_trait]
impl MessageRepository for RecordingLog {
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
        Ok(self
            .privates
            .read()
            .await
            .iter()
            .filter(|message| message.is_between(user_a, user_b))
            .cloned()
            .collect())
    }
}
