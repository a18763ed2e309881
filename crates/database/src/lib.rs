//! SQLite persistence layer for the family finance tracker.
//!
//! This crate provides async database operations for users, groups, accounts,
//! expenses, income, cards, budgets, goals, notifications and settings using
//! SQLx with SQLite. Each entity gets its own module of plain async functions
//! taking a pool (or any SQLite executor, so they can join a transaction).
//!
//! # Example
//!
//! ```no_run
//! use database::{Database, user};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:finance.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     // Create a user
//!     let user = user::create_user(db.pool(), "Ana", "ana@example.com", "hash").await?;
//!     println!("created user {}", user.id);
//!
//!     Ok(())
//! }
//! ```

pub mod account;
pub mod budget;
pub mod card;
pub mod error;
pub mod expense;
pub mod goal;
pub mod group;
pub mod income;
pub mod invite;
pub mod models;
pub mod notification;
pub mod recurring;
pub mod session;
pub mod settings;
pub mod user;
pub mod validation;

pub use error::{DatabaseError, Result};
pub use models::{
    Account, AccountKind, Budget, BudgetCategory, CreditCard, Expense, ExpenseKind,
    ExpensePayment, ExpenseSplit, FamilyGroup, GoalContribution, GroupGoal, GroupInvite,
    GroupMember, Income, Installment, MemberInfo, NewExpense, NewIncome, Notification,
    NotificationKind, RecurringTransaction, Role, Session, Setting, TransactionKind, User,
};
pub use validation::ValidationError;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    const DEFAULT_POOL_SIZE: u32 = 10;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example() -> database::Result<()> {
    /// // File database
    /// let db = database::Database::connect("sqlite:data/finance.db?mode=rwc").await?;
    ///
    /// // In-memory database (for testing)
    /// let db = database::Database::connect("sqlite::memory:").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(
            "Connected to database: {} (pool size: {})",
            url,
            pool_size
        );

        Ok(Self { pool })
    }

    /// Fresh in-memory database with migrations applied.
    ///
    /// Used by tests across the workspace.
    pub async fn in_memory() -> Result<Self> {
        let db = Self::connect_with_pool_size("sqlite::memory:", 1).await?;
        db.migrate().await?;
        Ok(db)
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start a transaction for multi-row writes that must be atomic.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_user_crud() {
        let db = Database::in_memory().await.unwrap();

        // Create
        let created = user::create_user(db.pool(), "Alice", "alice@example.com", "h")
            .await
            .unwrap();

        // Read
        let fetched = user::get_user(db.pool(), created.id).await.unwrap();
        assert_eq!(fetched.name, "Alice");

        // Update
        user::update_user_name(db.pool(), created.id, "Alicia").await.unwrap();
        let fetched = user::get_user(db.pool(), created.id).await.unwrap();
        assert_eq!(fetched.name, "Alicia");

        // Duplicate email
        let dup = user::create_user(db.pool(), "Other", "alice@example.com", "h").await;
        assert!(matches!(dup, Err(DatabaseError::AlreadyExists { .. })));

        // Delete
        user::delete_user(db.pool(), created.id).await.unwrap();
        let result = user::get_user(db.pool(), created.id).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_transaction_rollback_discards_rows() {
        let db = Database::in_memory().await.unwrap();

        let mut tx = db.begin().await.unwrap();
        sqlx::query("INSERT INTO settings (key, value) VALUES ('pro_labore', '2000')")
            .execute(&mut *tx)
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        let rows = settings::list_settings(db.pool()).await.unwrap();
        assert!(rows.is_empty());
    }
}
