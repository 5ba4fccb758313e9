use domain::{DomainError, RepositoryError};
use thiserror::Error;

use crate::credentials::{PasswordHasherError, TokenError};

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("password error: {0}")]
    Password(#[from] PasswordHasherError),
    #[error("token error: {0}")]
    Token(#[from] TokenError),
    #[error("authentication failed")]
    Authentication,
}
