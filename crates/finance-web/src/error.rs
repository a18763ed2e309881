//! Error types for the web interface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use database::DatabaseError;
use finance_core::CoreError;
use services::ServiceError;
use thiserror::Error;

/// Errors that end a request with an error status.
#[derive(Debug, Error)]
pub enum AppError {
    /// Failure reported by a business operation.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// No valid session.
    #[error("Sessão expirada. Entre novamente.")]
    Unauthorized,

    /// Malformed request input.
    #[error("{0}")]
    BadRequest(String),

    /// Template rendering failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Service(ServiceError::Database(err))
    }
}

impl From<askama::Error> for AppError {
    fn from(err: askama::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Portuguese text for a calculation error.
fn core_message(err: &CoreError) -> String {
    match err {
        CoreError::SplitTotal { total } => {
            format!("As porcentagens da divisão devem somar 100% (soma atual: {total:.2}%)")
        }
        CoreError::EmptySplit => "Informe pelo menos um participante na divisão".to_string(),
        CoreError::InvalidPercentage(p) => format!("Porcentagem inválida: {p}"),
        CoreError::DuplicateParticipant(_) => "Participante repetido na divisão".to_string(),
        CoreError::InvalidInstallmentCount => {
            "O número de parcelas deve ser pelo menos 1".to_string()
        }
        CoreError::NonPositiveAmount(_) => "O valor deve ser maior que zero".to_string(),
        CoreError::UnknownVariant { value, .. } => format!("Opção inválida: {value}"),
        CoreError::InvalidMonth(m) => format!("Mês inválido: {m}"),
        CoreError::InvalidYear(y) => format!("Ano inválido: {y}"),
    }
}

fn duplicate_message(entity: &str) -> &'static str {
    match entity {
        "User" => "Este e-mail já está cadastrado",
        "ExpensePayment" => "Esta despesa já foi paga neste mês",
        "ExpenseSplit" => "Participante repetido na divisão",
        "GroupMember" => "Este usuário já é membro do grupo",
        "Budget" => "Já existe um orçamento com este nome neste mês",
        "BudgetCategory" => "Esta categoria já está no orçamento",
        _ => "Registro já existe",
    }
}

/// Message shown to the user for a service failure.
pub fn user_message(err: &ServiceError) -> String {
    match err {
        ServiceError::Core(core) => core_message(core),
        ServiceError::Database(DatabaseError::NotFound { .. }) => {
            "Registro não encontrado".to_string()
        }
        ServiceError::Database(DatabaseError::AlreadyExists { entity, .. }) => {
            duplicate_message(entity).to_string()
        }
        ServiceError::Database(_) | ServiceError::Export(_) | ServiceError::PasswordHash(_) => {
            "Erro interno. Tente novamente.".to_string()
        }
        other => other.to_string(),
    }
}

/// Whether a failed form submission should be shown inline on the form.
pub fn is_form_error(err: &ServiceError) -> bool {
    matches!(
        err,
        ServiceError::Validation(_)
            | ServiceError::Core(_)
            | ServiceError::InvalidInput(_)
            | ServiceError::InvalidCredentials
            | ServiceError::InviteNotFound
            | ServiceError::InviteExpired
            | ServiceError::InviteExhausted
            | ServiceError::AlreadyMember
            | ServiceError::LastAdmin
            | ServiceError::Database(DatabaseError::AlreadyExists { .. })
    )
}

impl AppError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Service(err) => match err {
                ServiceError::Validation(_)
                | ServiceError::Core(_)
                | ServiceError::InvalidInput(_)
                | ServiceError::InviteExpired
                | ServiceError::InviteExhausted => StatusCode::BAD_REQUEST,
                ServiceError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                ServiceError::Forbidden => StatusCode::FORBIDDEN,
                ServiceError::InviteNotFound
                | ServiceError::Database(DatabaseError::NotFound { .. }) => StatusCode::NOT_FOUND,
                ServiceError::AlreadyMember
                | ServiceError::LastAdmin
                | ServiceError::Database(DatabaseError::AlreadyExists { .. }) => {
                    StatusCode::CONFLICT
                }
                ServiceError::Database(_)
                | ServiceError::Export(_)
                | ServiceError::PasswordHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Service(err) => user_message(err),
            AppError::Internal(_) => "Erro interno. Tente novamente.".to_string(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        (status, message).into_response()
    }
}

/// Result type for handlers.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use database::ValidationError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::from(ServiceError::Forbidden), StatusCode::FORBIDDEN),
            (AppError::from(ServiceError::invalid("x")), StatusCode::BAD_REQUEST),
            (AppError::from(ServiceError::InviteNotFound), StatusCode::NOT_FOUND),
            (AppError::from(ServiceError::AlreadyMember), StatusCode::CONFLICT),
            (AppError::from(DatabaseError::not_found("Expense", 3)), StatusCode::NOT_FOUND),
            (
                AppError::from(ServiceError::Validation(ValidationError::Empty("Nome".into()))),
                StatusCode::BAD_REQUEST,
            ),
            (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
            (AppError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.status(), status, "{err:?}");
        }
    }

    #[test]
    fn test_messages_are_portuguese_and_hide_internals() {
        let dup = ServiceError::Database(DatabaseError::AlreadyExists {
            entity: "ExpensePayment",
            id: "1/03/2025".into(),
        });
        assert_eq!(user_message(&dup), "Esta despesa já foi paga neste mês");
        assert!(is_form_error(&dup));

        let export = ServiceError::Export("zip: disk full".into());
        assert_eq!(user_message(&export), "Erro interno. Tente novamente.");
        assert!(!is_form_error(&export));

        let split = ServiceError::Core(CoreError::SplitTotal { total: 90.0 });
        assert!(user_message(&split).contains("somar 100%"));
    }
}
