//! 凭据存储相关端口
//!
//! 核心只需要校验会话令牌；签发令牌和密码哈希仅供 HTTP 登录/注册用例使用。

use async_trait::async_trait;
use domain::{PasswordHash, User};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PasswordHasherError {
    #[error("hash error: {0}")]
    Hash(String),
    #[error("verify error: {0}")]
    Verify(String),
}

impl PasswordHasherError {
    pub fn hash_error(message: impl Into<String>) -> Self {
        Self::Hash(message.into())
    }

    pub fn verify_error(message: impl Into<String>) -> Self {
        Self::Verify(message.into())
    }
}

#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, plaintext: &str) -> Result<PasswordHash, PasswordHasherError>;
    async fn verify(
        &self,
        plaintext: &str,
        hashed: &PasswordHash,
    ) -> Result<bool, PasswordHasherError>;
}

/// 会话令牌中携带的声明
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: Uuid,
    pub username: String,
    pub exp: i64, // 过期时间 (Unix timestamp)
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token generation failed: {0}")]
    Issue(String),
    #[error("invalid token: {0}")]
    Invalid(String),
}

/// 签名会话令牌的签发与校验，令牌格式对核心不透明
pub trait TokenService: Send + Sync {
    fn issue(&self, user: &User) -> Result<String, TokenError>;
    fn verify(&self, token: &str) -> Result<TokenClaims, TokenError>;
}
