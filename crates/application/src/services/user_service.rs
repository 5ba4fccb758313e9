use std::sync::Arc;

use domain::{DomainError, RepositoryError, User, UserId, Username};
use tracing::info;
use uuid::Uuid;

use crate::{
    clock::Clock,
    credentials::{PasswordHasher, TokenService},
    dto::TokenDto,
    error::ApplicationError,
    repository::UserRepository,
};

#[derive(Debug, Clone)]
pub struct RegisterUserRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub struct UserServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub token_service: Arc<dyn TokenService>,
    pub clock: Arc<dyn Clock>,
}

pub struct UserService {
    deps: UserServiceDependencies,
}

impl UserService {
    pub fn new(deps: UserServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn register(&self, request: RegisterUserRequest) -> Result<TokenDto, ApplicationError> {
        let username = Username::parse(request.username)?;
        if request.password.is_empty() {
            return Err(DomainError::invalid_argument("password", "must not be empty").into());
        }

        if self
            .deps
            .user_repository
            .find_by_username(&username)
            .await?
            .is_some()
        {
            return Err(DomainError::UserAlreadyExists.into());
        }

        let password_hash = self.deps.password_hasher.hash(&request.password).await?;
        let user = User::register(
            UserId::from(Uuid::new_v4()),
            username,
            password_hash,
            self.deps.clock.now(),
        );

        // 并发注册同名用户时由唯一约束兜底
        let stored = match self.deps.user_repository.create(user).await {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict) => return Err(DomainError::UserAlreadyExists.into()),
            Err(err) => return Err(err.into()),
        };
        info!(username = %stored.username, "user registered");

        self.issue(&stored)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<TokenDto, ApplicationError> {
        let username =
            Username::parse(request.username).map_err(|_| ApplicationError::Authentication)?;
        let user = self
            .deps
            .user_repository
            .find_by_username(&username)
            .await?
            .ok_or(ApplicationError::Authentication)?;

        // 经令牌自动创建的用户没有可用密码
        if !user.can_login_with_password() {
            return Err(ApplicationError::Authentication);
        }

        let password_ok = self
            .deps
            .password_hasher
            .verify(&request.password, &user.password)
            .await?;
        if !password_ok {
            return Err(ApplicationError::Authentication);
        }

        self.issue(&user)
    }

    fn issue(&self, user: &User) -> Result<TokenDto, ApplicationError> {
        let token = self.deps.token_service.issue(user)?;
        Ok(TokenDto {
            token,
            username: user.username.as_str().to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockUserRepository;
    use crate::testing::{FixedClock, MemoryUsers, PlainHasher, StaticTokens};

    fn service(users: Arc<dyn UserRepository>) -> UserService {
        UserService::new(UserServiceDependencies {
            user_repository: users,
            password_hasher: Arc::new(PlainHasher),
            token_service: Arc::new(StaticTokens),
            clock: Arc::new(FixedClock::default()),
        })
    }

    fn register_request(username: &str, password: &str) -> RegisterUserRequest {
        RegisterUserRequest {
            username: username.into(),
            password: password.into(),
        }
    }

    fn login_request(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn register_then_login_issues_tokens() {
        let users = Arc::new(MemoryUsers::default());
        let service = service(users.clone());

        let registered = service
            .register(register_request("alice", "secret"))
            .await
            .unwrap();
        assert_eq!(registered.username, "alice");
        assert_eq!(registered.token, "valid:alice");
        assert_eq!(users.get("alice").await.unwrap().password.as_str(), "plain:secret");

        let logged_in = service.login(login_request("alice", "secret")).await.unwrap();
        assert_eq!(logged_in, registered);
    }

    #[tokio::test]
    async fn register_rejects_missing_fields() {
        let service = service(Arc::new(MemoryUsers::default()));
        assert!(matches!(
            service.register(register_request("", "secret")).await,
            Err(ApplicationError::Domain(DomainError::InvalidArgument { .. }))
        ));
        assert!(matches!(
            service.register(register_request("alice", "")).await,
            Err(ApplicationError::Domain(DomainError::InvalidArgument { .. }))
        ));
    }

    #[tokio::test]
    async fn register_rejects_taken_username() {
        let users = Arc::new(MemoryUsers::default());
        users.insert_with_password("alice").await;
        let service = service(users);

        assert!(matches!(
            service.register(register_request("alice", "other")).await,
            Err(ApplicationError::Domain(DomainError::UserAlreadyExists))
        ));
    }

    #[tokio::test]
    async fn register_maps_unique_violation_to_conflict() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_username().returning(|_| Ok(None));
        users
            .expect_create()
            .times(1)
            .returning(|_| Err(RepositoryError::Conflict));
        let service = service(Arc::new(users));

        assert!(matches!(
            service.register(register_request("alice", "secret")).await,
            Err(ApplicationError::Domain(DomainError::UserAlreadyExists))
        ));
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let users = Arc::new(MemoryUsers::default());
        users.insert_with_password("alice").await;
        users
            .ensure_exists(User::external(
                UserId::from(Uuid::new_v4()),
                Username::parse("bob").unwrap(),
                FixedClock::default().now,
            ))
            .await
            .unwrap();
        let service = service(users);

        for (username, password) in [
            ("alice", "wrong"),
            ("nobody", "secret"),
            ("bob", "external"),
            ("", "secret"),
        ] {
            assert!(
                matches!(
                    service.login(login_request(username, password)).await,
                    Err(ApplicationError::Authentication)
                ),
                "{username} should not log in"
            );
        }
    }
}
