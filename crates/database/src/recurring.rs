//! Recurring transaction storage.

use chrono::NaiveDate;
use sqlx::{SqliteExecutor, SqlitePool};

use crate::error::{DatabaseError, Result};
use crate::models::{RecurringTransaction, TransactionKind};

const RECURRING_COLUMNS: &str = "id, owner_id, kind, description, amount, category, frequency, \
    start_date, next_run, active, created_at";

/// Create a recurring transaction. `next_run` starts at `start_date`.
pub async fn create_recurring(
    pool: &SqlitePool,
    owner_id: i64,
    kind: TransactionKind,
    description: &str,
    amount: f64,
    category: &str,
    frequency: &str,
    start_date: NaiveDate,
) -> Result<RecurringTransaction> {
    let query = format!(
        r#"
        INSERT INTO recurring_transactions
            (owner_id, kind, description, amount, category, frequency, start_date, next_run)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {RECURRING_COLUMNS}
        "#
    );

    let recurring = sqlx::query_as::<_, RecurringTransaction>(&query)
        .bind(owner_id)
        .bind(kind)
        .bind(description)
        .bind(amount)
        .bind(category)
        .bind(frequency)
        .bind(start_date)
        .bind(start_date)
        .fetch_one(pool)
        .await?;

    Ok(recurring)
}

/// Get a recurring transaction by ID.
pub async fn get_recurring(pool: &SqlitePool, id: i64) -> Result<RecurringTransaction> {
    let query = format!("SELECT {RECURRING_COLUMNS} FROM recurring_transactions WHERE id = ?");
    sqlx::query_as::<_, RecurringTransaction>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("RecurringTransaction", id))
}

/// All recurring transactions of a user.
pub async fn list_recurring(pool: &SqlitePool, owner_id: i64) -> Result<Vec<RecurringTransaction>> {
    let query = format!(
        r#"
        SELECT {RECURRING_COLUMNS} FROM recurring_transactions
        WHERE owner_id = ?
        ORDER BY active DESC, next_run
        "#
    );
    let items = sqlx::query_as::<_, RecurringTransaction>(&query)
        .bind(owner_id)
        .fetch_all(pool)
        .await?;

    Ok(items)
}

/// Active items whose `next_run` is on or before `today`.
pub async fn list_due(
    pool: &SqlitePool,
    owner_id: i64,
    today: NaiveDate,
) -> Result<Vec<RecurringTransaction>> {
    let query = format!(
        r#"
        SELECT {RECURRING_COLUMNS}
        FROM recurring_transactions
        WHERE owner_id = ? AND active = 1 AND next_run <= ?
        ORDER BY next_run, id
        "#
    );
    let items = sqlx::query_as::<_, RecurringTransaction>(&query)
        .bind(owner_id)
        .bind(today)
        .fetch_all(pool)
        .await?;

    Ok(items)
}

/// Move the schedule forward.
pub async fn set_next_run<'e>(
    exec: impl SqliteExecutor<'e>,
    id: i64,
    next_run: NaiveDate,
) -> Result<()> {
    sqlx::query("UPDATE recurring_transactions SET next_run = ? WHERE id = ?")
        .bind(next_run)
        .bind(id)
        .execute(exec)
        .await?;

    Ok(())
}

/// Update the editable fields.
pub async fn update_recurring(
    pool: &SqlitePool,
    id: i64,
    description: &str,
    amount: f64,
    category: &str,
    frequency: &str,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE recurring_transactions
        SET description = ?, amount = ?, category = ?, frequency = ?
        WHERE id = ?
        "#,
    )
    .bind(description)
    .bind(amount)
    .bind(category)
    .bind(frequency)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("RecurringTransaction", id));
    }

    Ok(())
}

/// Pause or resume.
pub async fn set_active(pool: &SqlitePool, id: i64, active: bool) -> Result<()> {
    let result = sqlx::query("UPDATE recurring_transactions SET active = ? WHERE id = ?")
        .bind(active)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("RecurringTransaction", id));
    }

    Ok(())
}

/// Delete a recurring transaction.
pub async fn delete_recurring(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM recurring_transactions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("RecurringTransaction", id));
    }

    Ok(())
}
