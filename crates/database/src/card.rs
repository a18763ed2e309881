//! Credit cards and installment purchases.

use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{CreditCard, Installment};

const CARD_COLUMNS: &str = "id, owner_id, name, credit_limit, closing_day, due_day, created_at";
const INSTALLMENT_COLUMNS: &str = "id, card_id, description, total_amount, installment_amount, \
    total_installments, start_date, finished_notified, created_at";

/// Create a credit card.
pub async fn create_card(
    pool: &SqlitePool,
    owner_id: i64,
    name: &str,
    credit_limit: f64,
    closing_day: i64,
    due_day: i64,
) -> Result<CreditCard> {
    let query = format!(
        r#"
        INSERT INTO credit_cards (owner_id, name, credit_limit, closing_day, due_day)
        VALUES (?, ?, ?, ?, ?)
        RETURNING {CARD_COLUMNS}
        "#
    );

    let card = sqlx::query_as::<_, CreditCard>(&query)
        .bind(owner_id)
        .bind(name)
        .bind(credit_limit)
        .bind(closing_day)
        .bind(due_day)
        .fetch_one(pool)
        .await?;

    Ok(card)
}

/// Get a card by ID.
pub async fn get_card(pool: &SqlitePool, id: i64) -> Result<CreditCard> {
    let query = format!("SELECT {CARD_COLUMNS} FROM credit_cards WHERE id = ?");
    sqlx::query_as::<_, CreditCard>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("CreditCard", id))
}

/// Cards owned by a user.
pub async fn list_cards(pool: &SqlitePool, owner_id: i64) -> Result<Vec<CreditCard>> {
    let query = format!("SELECT {CARD_COLUMNS} FROM credit_cards WHERE owner_id = ? ORDER BY name");
    let cards = sqlx::query_as::<_, CreditCard>(&query)
        .bind(owner_id)
        .fetch_all(pool)
        .await?;

    Ok(cards)
}

/// Update a card.
pub async fn update_card(
    pool: &SqlitePool,
    id: i64,
    name: &str,
    credit_limit: f64,
    closing_day: i64,
    due_day: i64,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE credit_cards
        SET name = ?, credit_limit = ?, closing_day = ?, due_day = ?
        WHERE id = ?
        "#,
    )
    .bind(name)
    .bind(credit_limit)
    .bind(closing_day)
    .bind(due_day)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("CreditCard", id));
    }

    Ok(())
}

/// Delete a card and its installments.
pub async fn delete_card(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM credit_cards WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("CreditCard", id));
    }

    Ok(())
}

/// Add an installment purchase to a card.
pub async fn insert_installment(
    pool: &SqlitePool,
    card_id: i64,
    description: &str,
    total_amount: f64,
    installment_amount: f64,
    total_installments: i64,
    start_date: NaiveDate,
) -> Result<Installment> {
    let query = format!(
        r#"
        INSERT INTO installments
            (card_id, description, total_amount, installment_amount, total_installments, start_date)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING {INSTALLMENT_COLUMNS}
        "#
    );

    let installment = sqlx::query_as::<_, Installment>(&query)
        .bind(card_id)
        .bind(description)
        .bind(total_amount)
        .bind(installment_amount)
        .bind(total_installments)
        .bind(start_date)
        .fetch_one(pool)
        .await?;

    Ok(installment)
}

/// Get an installment by ID.
pub async fn get_installment(pool: &SqlitePool, id: i64) -> Result<Installment> {
    let query = format!("SELECT {INSTALLMENT_COLUMNS} FROM installments WHERE id = ?");
    sqlx::query_as::<_, Installment>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Installment", id))
}

/// Installments of one card, oldest first.
pub async fn list_installments(pool: &SqlitePool, card_id: i64) -> Result<Vec<Installment>> {
    let query = format!(
        "SELECT {INSTALLMENT_COLUMNS} FROM installments WHERE card_id = ? ORDER BY start_date, id"
    );
    let installments = sqlx::query_as::<_, Installment>(&query)
        .bind(card_id)
        .fetch_all(pool)
        .await?;

    Ok(installments)
}

/// Installments across all of a user's cards.
pub async fn list_installments_for_owner(
    pool: &SqlitePool,
    owner_id: i64,
) -> Result<Vec<Installment>> {
    let installments = sqlx::query_as::<_, Installment>(
        r#"
        SELECT i.id, i.card_id, i.description, i.total_amount, i.installment_amount,
               i.total_installments, i.start_date, i.finished_notified, i.created_at
        FROM installments i
        INNER JOIN credit_cards c ON c.id = i.card_id
        WHERE c.owner_id = ?
        ORDER BY i.start_date, i.id
        "#,
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    Ok(installments)
}

/// Flag an installment as having announced its last charge.
///
/// Returns false if it was already flagged.
pub async fn mark_finished_notified(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE installments SET finished_notified = 1 WHERE id = ? AND finished_notified = 0",
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete an installment purchase.
pub async fn delete_installment(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM installments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Installment", id));
    }

    Ok(())
}
