//! Pure financial calculations for the family finance tracker.
//!
//! Nothing in this crate touches the database or the network. It provides:
//!
//! - [`tax`] - Simples Nacional bracket lookup, effective rate, INSS
//! - [`installment`] - credit-card installment amortization
//! - [`split`] - weighted expense splitting among participants
//! - [`recurrence`] - schedule arithmetic for recurring transactions
//! - [`invite_code`] - group invite code generation
//! - [`period`] / [`money`] - month/year periods and cent rounding
//!
//! # Example
//!
//! ```rust
//! use finance_core::tax::{calculate, InssConfig};
//!
//! let inss = InssConfig { pro_labore: 1412.0, rate: 0.11, ceiling: 7786.02 };
//! let calc = calculate(100_000.0, 5_000.0, &inss);
//! assert_eq!(calc.bracket.number, 1);
//! assert!(calc.bracket_warning.is_none());
//! ```

pub mod error;
pub mod installment;
pub mod invite_code;
pub mod money;
pub mod period;
pub mod recurrence;
pub mod split;
pub mod tax;

pub use error::{CoreError, Result};
pub use period::Period;
