use std::sync::Arc;

use application::{MessageRepository, UserRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    GlobalMessage, MessageId, PasswordHash, PrivateMessage, RepositoryError, User, UserId,
    Username,
};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use uuid::Uuid;

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Conflict,
        other => RepositoryError::storage(other.to_string()),
    }
}

fn invalid_data(message: impl Into<String>) -> RepositoryError {
    RepositoryError::storage(message)
}

#[derive(Debug, FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRecord> for User {
    type Error = RepositoryError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        let username = Username::parse(value.username).map_err(|err| invalid_data(err.to_string()))?;
        let password =
            PasswordHash::new(value.password_hash).map_err(|err| invalid_data(err.to_string()))?;

        Ok(User {
            id: UserId::from(value.id),
            username,
            password,
            created_at: value.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct GlobalMessageRecord {
    id: Uuid,
    username: String,
    content: String,
    time: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<GlobalMessageRecord> for GlobalMessage {
    type Error = RepositoryError;

    fn try_from(value: GlobalMessageRecord) -> Result<Self, Self::Error> {
        Ok(GlobalMessage {
            id: MessageId::from(value.id),
            username: Username::parse(value.username).map_err(|err| invalid_data(err.to_string()))?,
            content: value.content,
            time: value.time,
            created_at: value.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct PrivateMessageRecord {
    id: Uuid,
    from_user: String,
    to_user: String,
    content: String,
    time: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<PrivateMessageRecord> for PrivateMessage {
    type Error = RepositoryError;

    fn try_from(value: PrivateMessageRecord) -> Result<Self, Self::Error> {
        Ok(PrivateMessage {
            id: MessageId::from(value.id),
            from_user: Username::parse(value.from_user)
                .map_err(|err| invalid_data(err.to_string()))?,
            to_user: value.to_user,
            content: value.content,
            time: value.time,
            created_at: value.created_at,
        })
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (id, username, password_hash, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, password_hash, created_at
            "#,
        )
        .bind(Uuid::from(user.id))
        .bind(user.username.as_str())
        .bind(user.password.as_str())
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        User::try_from(record)
    }

    async fn find_by_username(&self, username: &Username) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"SELECT id, username, password_hash, created_at FROM users WHERE username = $1"#,
        )
        .bind(username.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn ensure_exists(&self, user: User) -> Result<User, RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (username) DO NOTHING
            "#,
        )
        .bind(Uuid::from(user.id))
        .bind(user.username.as_str())
        .bind(user.password.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        self.find_by_username(&user.username)
            .await?
            .ok_or(RepositoryError::NotFound)
    }
}

#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn append_global(&self, message: GlobalMessage) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO global_messages (id, username, content, time, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::from(message.id))
        .bind(message.username.as_str())
        .bind(&message.content)
        .bind(&message.time)
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(())
    }

    async fn append_private(&self, message: PrivateMessage) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO private_messages (id, from_user, to_user, content, time, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::from(message.id))
        .bind(message.from_user.as_str())
        .bind(&message.to_user)
        .bind(&message.content)
        .bind(&message.time)
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(())
    }

    async fn recent_global(&self, limit: u32) -> Result<Vec<GlobalMessage>, RepositoryError> {
        let records = sqlx::query_as::<_, GlobalMessageRecord>(
            r#"
            SELECT id, username, content, time, created_at FROM (
                SELECT seq, id, username, content, time, created_at
                FROM global_messages
                ORDER BY created_at DESC, seq DESC
                LIMIT $1
            ) recent
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(GlobalMessage::try_from).collect()
    }

    async fn conversation(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Vec<PrivateMessage>, RepositoryError> {
        let records = sqlx::query_as::<_, PrivateMessageRecord>(
            r#"
            SELECT id, from_user, to_user, content, time, created_at
            FROM private_messages
            WHERE (from_user = $1 AND to_user = $2) OR (from_user = $2 AND to_user = $1)
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(PrivateMessage::try_from).collect()
    }
}

#[derive(Clone)]
pub struct PgStorage {
    pub pool: PgPool,
    pub user_repository: Arc<PgUserRepository>,
    pub message_repository: Arc<PgMessageRepository>,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self {
            user_repository: Arc::new(PgUserRepository::new(pool.clone())),
            message_repository: Arc::new(PgMessageRepository::new(pool.clone())),
            pool,
        }
    }
}

pub async fn create_pg_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}
