//! Income records.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor, SqlitePool};

use crate::error::{DatabaseError, Result};
use crate::models::{Income, NewIncome};

const INCOME_COLUMNS: &str = "id, owner_id, account_id, description, amount_usd, exchange_rate, \
    amount_brl, gross_amount, tax_amount, net_amount, effective_rate, received_on, created_at";

/// Income totals for one month.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct MonthlyIncomeTotals {
    pub month: i64,
    pub gross: f64,
    pub tax: f64,
    pub net: f64,
}

/// Insert an income with its computed amounts.
pub async fn insert_income<'e>(exec: impl SqliteExecutor<'e>, new: &NewIncome) -> Result<Income> {
    let query = format!(
        r#"
        INSERT INTO incomes (
            owner_id, account_id, description, amount_usd, exchange_rate, amount_brl,
            gross_amount, tax_amount, net_amount, effective_rate, received_on
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {INCOME_COLUMNS}
        "#
    );

    let income = sqlx::query_as::<_, Income>(&query)
        .bind(new.owner_id)
        .bind(new.account_id)
        .bind(&new.description)
        .bind(new.amount_usd)
        .bind(new.exchange_rate)
        .bind(new.amount_brl)
        .bind(new.gross_amount)
        .bind(new.tax_amount)
        .bind(new.net_amount)
        .bind(new.effective_rate)
        .bind(new.received_on)
        .fetch_one(exec)
        .await?;

    Ok(income)
}

/// Get an income by ID.
pub async fn get_income(pool: &SqlitePool, id: i64) -> Result<Income> {
    let query = format!("SELECT {INCOME_COLUMNS} FROM incomes WHERE id = ?");
    sqlx::query_as::<_, Income>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Income", id))
}

/// Incomes received in `[start, end)`, newest first.
pub async fn list_between(
    pool: &SqlitePool,
    owner_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Income>> {
    let query = format!(
        r#"
        SELECT {INCOME_COLUMNS}
        FROM incomes
        WHERE owner_id = ? AND received_on >= ? AND received_on < ?
        ORDER BY received_on DESC, id DESC
        "#
    );
    let incomes = sqlx::query_as::<_, Income>(&query)
        .bind(owner_id)
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await?;

    Ok(incomes)
}

/// Gross revenue received in `[start, end)`.
pub async fn sum_gross_between<'e>(
    exec: impl SqliteExecutor<'e>,
    owner_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<f64> {
    let total = sqlx::query_scalar::<_, f64>(
        r#"
        SELECT COALESCE(SUM(gross_amount), 0.0)
        FROM incomes
        WHERE owner_id = ? AND received_on >= ? AND received_on < ?
        "#,
    )
    .bind(owner_id)
    .bind(start)
    .bind(end)
    .fetch_one(exec)
    .await?;

    Ok(total)
}

/// Per-month totals for a year. Months without income are absent.
pub async fn monthly_totals(
    pool: &SqlitePool,
    owner_id: i64,
    year: i32,
) -> Result<Vec<MonthlyIncomeTotals>> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN);
    let end = NaiveDate::from_ymd_opt(year + 1, 1, 1).unwrap_or(NaiveDate::MAX);

    let rows = sqlx::query_as::<_, MonthlyIncomeTotals>(
        r#"
        SELECT CAST(strftime('%m', received_on) AS INTEGER) AS month,
               SUM(gross_amount) AS gross,
               SUM(tax_amount) AS tax,
               SUM(net_amount) AS net
        FROM incomes
        WHERE owner_id = ? AND received_on >= ? AND received_on < ?
        GROUP BY month
        ORDER BY month
        "#,
    )
    .bind(owner_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Delete an income.
pub async fn delete_income(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM incomes WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Income", id));
    }

    Ok(())
}
