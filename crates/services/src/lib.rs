//! Business operations for the family finance tracker.
//!
//! Each module groups the operations of one area as plain async functions
//! taking a [`database::Database`] and the acting user's ID. Ownership and
//! group membership are checked here; the web layer only maps errors to
//! responses.

pub mod accounts;
pub mod auth;
pub mod budget;
pub mod cards;
pub mod error;
pub mod expenses;
pub mod export;
pub mod goals;
pub mod groups;
pub mod income;
pub mod notifications;
pub mod recurring;
pub mod reports;
pub mod settings;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{Result, ServiceError};
pub use settings::{FinancialSettings, SettingsCache};
