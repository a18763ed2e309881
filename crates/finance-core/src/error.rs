//! Error types for financial calculations.

use thiserror::Error;

/// Errors raised by input that cannot be calculated on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Split percentages do not add up to 100.
    #[error("split percentages must sum to 100, got {total:.2}")]
    SplitTotal { total: f64 },

    /// A split needs at least one participant.
    #[error("split requires at least one participant")]
    EmptySplit,

    /// A single split percentage is outside 0..=100.
    #[error("invalid split percentage: {0}")]
    InvalidPercentage(f64),

    /// The same participant appears twice in a split.
    #[error("duplicate split participant: {0}")]
    DuplicateParticipant(i64),

    /// An installment plan needs at least one installment.
    #[error("installment count must be at least 1")]
    InvalidInstallmentCount,

    /// Amount must be strictly positive.
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(f64),

    /// Unknown enum value coming from user input or storage.
    #[error("unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    /// A month outside 1..=12.
    #[error("invalid month: {0}")]
    InvalidMonth(u32),

    /// A year outside the supported calendar range.
    #[error("invalid year: {0}")]
    InvalidYear(i32),
}

/// Result type for calculation operations.
pub type Result<T> = std::result::Result<T, CoreError>;
