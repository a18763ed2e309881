//! Service-level error types.

use database::{DatabaseError, ValidationError};
use finance_core::CoreError;
use thiserror::Error;

/// Errors returned by business operations.
///
/// Display strings are Portuguese; the web layer shows them to users.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage failure or missing/duplicate record.
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// A form field failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A calculation rejected its input.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The user is not allowed to see or change the resource.
    #[error("Você não tem permissão para esta ação")]
    Forbidden,

    /// Wrong email or password.
    #[error("E-mail ou senha incorretos")]
    InvalidCredentials,

    #[error("Convite não encontrado")]
    InviteNotFound,

    #[error("Este convite expirou")]
    InviteExpired,

    #[error("Este convite já atingiu o número máximo de usos")]
    InviteExhausted,

    #[error("Você já é membro deste grupo")]
    AlreadyMember,

    /// The group would be left without an administrator.
    #[error("O grupo precisa de pelo menos um administrador")]
    LastAdmin,

    #[error("{0}")]
    InvalidInput(String),

    /// Password hashing failed or a stored hash is malformed.
    #[error("Falha ao processar a senha")]
    PasswordHash(#[from] bcrypt::BcryptError),

    /// Report file could not be generated.
    #[error("Falha ao gerar o arquivo: {0}")]
    Export(String),
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::Database(DatabaseError::Sqlx(err))
    }
}

impl ServiceError {
    /// Shorthand for `InvalidInput`.
    pub fn invalid(message: impl Into<String>) -> Self {
        ServiceError::InvalidInput(message.into())
    }
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
