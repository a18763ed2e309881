//! Budgets and per-category limits.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{Budget, BudgetCategory};

const BUDGET_COLUMNS: &str = "id, owner_id, name, month, year, created_at";
const CATEGORY_COLUMNS: &str =
    "id, budget_id, category, limit_amount, spent, notified_at_80, notified_at_100";

/// Create a budget for a month.
pub async fn create_budget(
    pool: &SqlitePool,
    owner_id: i64,
    name: &str,
    month: i64,
    year: i64,
) -> Result<Budget> {
    let query = format!(
        r#"
        INSERT INTO budgets (owner_id, name, month, year)
        VALUES (?, ?, ?, ?)
        RETURNING {BUDGET_COLUMNS}
        "#
    );

    sqlx::query_as::<_, Budget>(&query)
        .bind(owner_id)
        .bind(name)
        .bind(month)
        .bind(year)
        .fetch_one(pool)
        .await
        .map_err(DatabaseError::unique_violation(
            "Budget",
            format!("{} {:02}/{}", name, month, year),
        ))
}

/// Get a budget by ID.
pub async fn get_budget(pool: &SqlitePool, id: i64) -> Result<Budget> {
    let query = format!("SELECT {BUDGET_COLUMNS} FROM budgets WHERE id = ?");
    sqlx::query_as::<_, Budget>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Budget", id))
}

/// Budgets of a user for a month.
pub async fn list_budgets(
    pool: &SqlitePool,
    owner_id: i64,
    month: i64,
    year: i64,
) -> Result<Vec<Budget>> {
    let query = format!(
        r#"
        SELECT {BUDGET_COLUMNS} FROM budgets
        WHERE owner_id = ? AND month = ? AND year = ?
        ORDER BY name
        "#
    );
    let budgets = sqlx::query_as::<_, Budget>(&query)
        .bind(owner_id)
        .bind(month)
        .bind(year)
        .fetch_all(pool)
        .await?;

    Ok(budgets)
}

/// Delete a budget and its categories.
pub async fn delete_budget(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM budgets WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Budget", id));
    }

    Ok(())
}

/// Add a category limit to a budget. Flags start cleared.
pub async fn add_category(
    pool: &SqlitePool,
    budget_id: i64,
    category: &str,
    limit_amount: f64,
) -> Result<BudgetCategory> {
    let query = format!(
        r#"
        INSERT INTO budget_categories (budget_id, category, limit_amount)
        VALUES (?, ?, ?)
        RETURNING {CATEGORY_COLUMNS}
        "#
    );

    sqlx::query_as::<_, BudgetCategory>(&query)
        .bind(budget_id)
        .bind(category)
        .bind(limit_amount)
        .fetch_one(pool)
        .await
        .map_err(DatabaseError::unique_violation(
            "BudgetCategory",
            format!("{}/{}", budget_id, category),
        ))
}

/// Get a budget category by ID.
pub async fn get_category(pool: &SqlitePool, id: i64) -> Result<BudgetCategory> {
    let query = format!("SELECT {CATEGORY_COLUMNS} FROM budget_categories WHERE id = ?");
    sqlx::query_as::<_, BudgetCategory>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("BudgetCategory", id))
}

/// Categories of a budget.
pub async fn list_categories(pool: &SqlitePool, budget_id: i64) -> Result<Vec<BudgetCategory>> {
    let query = format!(
        "SELECT {CATEGORY_COLUMNS} FROM budget_categories WHERE budget_id = ? ORDER BY category"
    );
    let categories = sqlx::query_as::<_, BudgetCategory>(&query)
        .bind(budget_id)
        .fetch_all(pool)
        .await?;

    Ok(categories)
}

/// Every budget category of a user that tracks `category` in a month.
pub async fn categories_for_period(
    pool: &SqlitePool,
    owner_id: i64,
    category: &str,
    month: i64,
    year: i64,
) -> Result<Vec<BudgetCategory>> {
    let categories = sqlx::query_as::<_, BudgetCategory>(
        r#"
        SELECT c.id, c.budget_id, c.category, c.limit_amount, c.spent,
               c.notified_at_80, c.notified_at_100
        FROM budget_categories c
        INNER JOIN budgets b ON b.id = c.budget_id
        WHERE b.owner_id = ? AND c.category = ? AND b.month = ? AND b.year = ?
        ORDER BY c.id
        "#,
    )
    .bind(owner_id)
    .bind(category)
    .bind(month)
    .bind(year)
    .fetch_all(pool)
    .await?;

    Ok(categories)
}

/// Change the limit of a category.
pub async fn update_limit(pool: &SqlitePool, id: i64, limit_amount: f64) -> Result<()> {
    let result = sqlx::query("UPDATE budget_categories SET limit_amount = ? WHERE id = ?")
        .bind(limit_amount)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("BudgetCategory", id));
    }

    Ok(())
}

/// Store the recomputed spent amount.
pub async fn update_spent(pool: &SqlitePool, id: i64, spent: f64) -> Result<()> {
    sqlx::query("UPDATE budget_categories SET spent = ? WHERE id = ?")
        .bind(spent)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Set the 80% flag. Returns false if it was already set.
pub async fn mark_notified_80(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE budget_categories SET notified_at_80 = 1 WHERE id = ? AND notified_at_80 = 0",
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Set the 100% flag. Returns false if it was already set.
pub async fn mark_notified_100(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE budget_categories SET notified_at_100 = 1 WHERE id = ? AND notified_at_100 = 0",
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a category from its budget.
pub async fn delete_category(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM budget_categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("BudgetCategory", id));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{user, Database};

    #[tokio::test]
    async fn test_flags_are_set_once() {
        let db = Database::in_memory().await.unwrap();
        let pool = db.pool();
        let ana = user::create_user(pool, "Ana", "ana@example.com", "h").await.unwrap();

        let budget = create_budget(pool, ana.id, "Mensal", 5, 2025).await.unwrap();
        let food = add_category(pool, budget.id, "Alimentação", 1000.0).await.unwrap();
        assert!(!food.notified_at_80);

        assert!(mark_notified_80(pool, food.id).await.unwrap());
        assert!(!mark_notified_80(pool, food.id).await.unwrap());

        let food = get_category(pool, food.id).await.unwrap();
        assert!(food.notified_at_80);
        assert!(!food.notified_at_100);
    }

    #[tokio::test]
    async fn test_duplicates_rejected() {
        let db = Database::in_memory().await.unwrap();
        let pool = db.pool();
        let ana = user::create_user(pool, "Ana", "ana@example.com", "h").await.unwrap();

        let budget = create_budget(pool, ana.id, "Mensal", 5, 2025).await.unwrap();
        assert!(matches!(
            create_budget(pool, ana.id, "Mensal", 5, 2025).await,
            Err(DatabaseError::AlreadyExists { .. })
        ));
        add_category(pool, budget.id, "Lazer", 200.0).await.unwrap();
        assert!(matches!(
            add_category(pool, budget.id, "Lazer", 300.0).await,
            Err(DatabaseError::AlreadyExists { .. })
        ));

        let tracked = categories_for_period(pool, ana.id, "Lazer", 5, 2025).await.unwrap();
        assert_eq!(tracked.len(), 1);
        assert!(categories_for_period(pool, ana.id, "Lazer", 6, 2025).await.unwrap().is_empty());
    }
}
