//! Input validation for form fields before they reach the database.
//!
//! Messages are in Portuguese because they are shown to users as-is.

use std::fmt;

/// Validation error types.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Invalid email format.
    InvalidEmail(String),
    /// Value too long.
    TooLong { field: String, max: usize, actual: usize },
    /// Empty value where one is required.
    Empty(String),
    /// Amount must be strictly positive.
    NonPositive { field: String, value: f64 },
    /// Day of month outside 1..=31.
    InvalidDay(i64),
    /// Password shorter than the minimum.
    WeakPassword { min: usize },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidEmail(msg) => write!(f, "E-mail inválido: {}", msg),
            ValidationError::TooLong { field, max, actual } => {
                write!(f, "{} é longo demais ({} caracteres, máximo {})", field, actual, max)
            }
            ValidationError::Empty(field) => write!(f, "{} não pode ficar vazio", field),
            ValidationError::NonPositive { field, value } => {
                write!(f, "{} deve ser maior que zero (recebido {})", field, value)
            }
            ValidationError::InvalidDay(day) => {
                write!(f, "Dia {} inválido, use um valor entre 1 e 31", day)
            }
            ValidationError::WeakPassword { min } => {
                write!(f, "A senha deve ter pelo menos {} caracteres", min)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Maximum allowed length for email addresses.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum allowed length for names and descriptions.
pub const MAX_NAME_LENGTH: usize = 120;

/// Maximum allowed length for category labels.
pub const MAX_CATEGORY_LENGTH: usize = 60;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Validate an email address (basic format check).
///
/// Checks for exactly one `@`, a non-empty local part, and a dotted domain
/// that neither starts nor ends with a dot.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Empty("E-mail".to_string()));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "E-mail".to_string(),
            max: MAX_EMAIL_LENGTH,
            actual: email.len(),
        });
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::InvalidEmail("falta o @".to_string()));
    };

    if domain.contains('@') {
        return Err(ValidationError::InvalidEmail(
            "deve conter apenas um @".to_string(),
        ));
    }

    if local.is_empty() {
        return Err(ValidationError::InvalidEmail(
            "falta a parte antes do @".to_string(),
        ));
    }

    if domain.is_empty() || !domain.contains('.') {
        return Err(ValidationError::InvalidEmail(
            "domínio incompleto".to_string(),
        ));
    }

    if domain.starts_with('.') || domain.ends_with('.') || domain.contains("..") {
        return Err(ValidationError::InvalidEmail(
            "domínio mal formado".to_string(),
        ));
    }

    Ok(())
}

/// Validate a required free-text field such as a name or description.
pub fn validate_name(field: &str, value: &str) -> Result<(), ValidationError> {
    validate_text(field, value, MAX_NAME_LENGTH)
}

/// Validate a category label.
pub fn validate_category(value: &str) -> Result<(), ValidationError> {
    validate_text("Categoria", value, MAX_CATEGORY_LENGTH)
}

fn validate_text(field: &str, value: &str, max: usize) -> Result<(), ValidationError> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Empty(field.to_string()));
    }

    let len = value.chars().count();
    if len > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
            actual: len,
        });
    }

    Ok(())
}

/// Validate a money amount that must be strictly positive and finite.
pub fn validate_amount(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::NonPositive {
            field: field.to_string(),
            value,
        });
    }
    Ok(())
}

/// Validate a day-of-month.
pub fn validate_day(day: i64) -> Result<(), ValidationError> {
    if !(1..=31).contains(&day) {
        return Err(ValidationError::InvalidDay(day));
    }
    Ok(())
}

/// Validate a password's length.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::WeakPassword {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    Ok(())
}
