//! 会话认证
//!
//! 校验 `join` 信封中的令牌，成功时确保凭据存储中存在对应的用户记录后再返回身份。

use std::sync::Arc;

use domain::{Identity, User, UserId, Username};
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

use crate::{clock::Clock, credentials::TokenService, repository::UserRepository};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("token required")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("credential store unavailable: {0}")]
    Store(String),
}

pub struct SessionAuthenticator {
    tokens: Arc<dyn TokenService>,
    users: Arc<dyn UserRepository>,
    clock: Arc<dyn Clock>,
}

impl SessionAuthenticator {
    pub fn new(
        tokens: Arc<dyn TokenService>,
        users: Arc<dyn UserRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tokens,
            users,
            clock,
        }
    }

    pub async fn authenticate(&self, token: Option<&str>) -> Result<Identity, AuthError> {
        let token = token
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let claims = self.tokens.verify(token).map_err(|err| {
            debug!(error = %err, "join rejected");
            AuthError::InvalidToken
        })?;
        let username = Username::parse(claims.username).map_err(|_| AuthError::InvalidToken)?;

        // 后续按作者查找消息时用户记录必须存在
        let placeholder = User::external(
            UserId::from(Uuid::new_v4()),
            username.clone(),
            self.clock.now(),
        );
        self.users.ensure_exists(placeholder).await.map_err(|err| {
            error!(error = %err, username = %username, "failed to ensure user record");
            AuthError::Store(err.to_string())
        })?;

        Ok(Identity::new(username))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockUserRepository;
    use crate::testing::{FixedClock, MemoryUsers, StaticTokens};
    use domain::RepositoryError;

    fn authenticator(users: Arc<dyn UserRepository>) -> SessionAuthenticator {
        SessionAuthenticator::new(Arc::new(StaticTokens), users, Arc::new(FixedClock::default()))
    }

    #[tokio::test]
    async fn valid_token_yields_identity_and_user_record() {
        let users = Arc::new(MemoryUsers::default());
        let auth = authenticator(users.clone());

        let identity = auth.authenticate(Some("valid:alice")).await.unwrap();
        assert_eq!(identity.username.as_str(), "alice");

        let stored = users.get("alice").await.unwrap();
        assert!(!stored.can_login_with_password());
    }

    #[tokio::test]
    async fn existing_user_record_is_left_untouched() {
        let users = Arc::new(MemoryUsers::default());
        let existing = users.insert_with_password("alice").await;
        let auth = authenticator(users.clone());

        auth.authenticate(Some("valid:alice")).await.unwrap();
        assert_eq!(users.get("alice").await.unwrap(), existing);
    }

    #[tokio::test]
    async fn missing_or_empty_token_is_reported_separately() {
        let auth = authenticator(Arc::new(MemoryUsers::default()));
        assert_eq!(auth.authenticate(None).await, Err(AuthError::MissingToken));
        assert_eq!(auth.authenticate(Some("")).await, Err(AuthError::MissingToken));
    }

    #[tokio::test]
    async fn invalid_token_never_touches_the_store() {
        let mut users = MockUserRepository::new();
        users.expect_ensure_exists().never();
        let auth = authenticator(Arc::new(users));

        assert_eq!(
            auth.authenticate(Some("forged")).await,
            Err(AuthError::InvalidToken)
        );
        assert_eq!(
            auth.authenticate(Some("valid:   ")).await,
            Err(AuthError::InvalidToken)
        );
    }

    #[tokio::test]
    async fn store_failure_rejects_the_join() {
        let mut users = MockUserRepository::new();
        users
            .expect_ensure_exists()
            .times(1)
            .returning(|_| Err(RepositoryError::storage("connection refused")));
        let auth = authenticator(Arc::new(users));

        assert!(matches!(
            auth.authenticate(Some("valid:alice")).await,
            Err(AuthError::Store(_))
        ));
    }
}
