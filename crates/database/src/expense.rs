//! Expense, payment and split operations.

use sqlx::{SqliteExecutor, SqlitePool};

use crate::error::{DatabaseError, Result};
use crate::models::{Expense, ExpensePayment, ExpenseSplit, NewExpense};

const EXPENSE_COLUMNS: &str = "id, owner_id, account_id, group_id, description, amount, \
    category, kind, due_day, active, created_at";

/// Insert an expense.
pub async fn insert_expense<'e>(
    exec: impl SqliteExecutor<'e>,
    new: &NewExpense,
) -> Result<Expense> {
    let query = format!(
        r#"
        INSERT INTO expenses
            (owner_id, account_id, group_id, description, amount, category, kind, due_day)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {EXPENSE_COLUMNS}
        "#
    );

    let expense = sqlx::query_as::<_, Expense>(&query)
        .bind(new.owner_id)
        .bind(new.account_id)
        .bind(new.group_id)
        .bind(&new.description)
        .bind(new.amount)
        .bind(&new.category)
        .bind(new.kind)
        .bind(new.due_day)
        .fetch_one(exec)
        .await?;

    Ok(expense)
}

/// Get an expense by ID.
pub async fn get_expense<'e>(exec: impl SqliteExecutor<'e>, id: i64) -> Result<Expense> {
    let query = format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = ?");
    sqlx::query_as::<_, Expense>(&query)
        .bind(id)
        .fetch_optional(exec)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Expense", id))
}

/// Expenses owned by a user, active first.
pub async fn list_expenses(pool: &SqlitePool, owner_id: i64) -> Result<Vec<Expense>> {
    let query = format!(
        r#"
        SELECT {EXPENSE_COLUMNS} FROM expenses
        WHERE owner_id = ?
        ORDER BY active DESC, kind, description
        "#
    );
    let expenses = sqlx::query_as::<_, Expense>(&query)
        .bind(owner_id)
        .fetch_all(pool)
        .await?;

    Ok(expenses)
}

/// Active expenses owned by a user.
pub async fn list_active_expenses(pool: &SqlitePool, owner_id: i64) -> Result<Vec<Expense>> {
    let query = format!(
        r#"
        SELECT {EXPENSE_COLUMNS} FROM expenses
        WHERE owner_id = ? AND active = 1
        ORDER BY due_day, description
        "#
    );
    let expenses = sqlx::query_as::<_, Expense>(&query)
        .bind(owner_id)
        .fetch_all(pool)
        .await?;

    Ok(expenses)
}

/// Overwrite the editable fields of an expense.
pub async fn update_expense<'e>(
    exec: impl SqliteExecutor<'e>,
    id: i64,
    new: &NewExpense,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE expenses
        SET account_id = ?, group_id = ?, description = ?, amount = ?,
            category = ?, kind = ?, due_day = ?
        WHERE id = ?
        "#,
    )
    .bind(new.account_id)
    .bind(new.group_id)
    .bind(&new.description)
    .bind(new.amount)
    .bind(&new.category)
    .bind(new.kind)
    .bind(new.due_day)
    .bind(id)
    .execute(exec)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Expense", id));
    }

    Ok(())
}

/// Activate or deactivate an expense.
pub async fn set_active(pool: &SqlitePool, id: i64, active: bool) -> Result<()> {
    let result = sqlx::query("UPDATE expenses SET active = ? WHERE id = ?")
        .bind(active)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Expense", id));
    }

    Ok(())
}

/// Delete an expense with its payments and splits.
pub async fn delete_expense(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM expenses WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Expense", id));
    }

    Ok(())
}

/// Record the payment of an expense for a month.
///
/// At most one payment exists per (expense, month, year).
pub async fn insert_payment<'e>(
    exec: impl SqliteExecutor<'e>,
    expense_id: i64,
    month: i64,
    year: i64,
    amount: f64,
) -> Result<ExpensePayment> {
    sqlx::query_as::<_, ExpensePayment>(
        r#"
        INSERT INTO expense_payments (expense_id, month, year, amount)
        VALUES (?, ?, ?, ?)
        RETURNING id, expense_id, month, year, amount, paid_at
        "#,
    )
    .bind(expense_id)
    .bind(month)
    .bind(year)
    .bind(amount)
    .fetch_one(exec)
    .await
    .map_err(DatabaseError::unique_violation(
        "ExpensePayment",
        format!("{}/{:02}/{}", expense_id, month, year),
    ))
}

/// Payment of an expense for a month, if any.
pub async fn get_payment(
    pool: &SqlitePool,
    expense_id: i64,
    month: i64,
    year: i64,
) -> Result<Option<ExpensePayment>> {
    let payment = sqlx::query_as::<_, ExpensePayment>(
        r#"
        SELECT id, expense_id, month, year, amount, paid_at
        FROM expense_payments
        WHERE expense_id = ? AND month = ? AND year = ?
        "#,
    )
    .bind(expense_id)
    .bind(month)
    .bind(year)
    .fetch_optional(pool)
    .await?;

    Ok(payment)
}

/// Remove the payment for a month. Returns whether one existed.
pub async fn delete_payment(
    pool: &SqlitePool,
    expense_id: i64,
    month: i64,
    year: i64,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM expense_payments
        WHERE expense_id = ? AND month = ? AND year = ?
        "#,
    )
    .bind(expense_id)
    .bind(month)
    .bind(year)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Every payment recorded for one expense, oldest period first.
pub async fn list_payments_for_expense(
    pool: &SqlitePool,
    expense_id: i64,
) -> Result<Vec<ExpensePayment>> {
    let payments = sqlx::query_as::<_, ExpensePayment>(
        r#"
        SELECT id, expense_id, month, year, amount, paid_at
        FROM expense_payments
        WHERE expense_id = ?
        ORDER BY year, month
        "#,
    )
    .bind(expense_id)
    .fetch_all(pool)
    .await?;

    Ok(payments)
}

/// Payments of a user's expenses in a month.
pub async fn list_payments_for_period(
    pool: &SqlitePool,
    owner_id: i64,
    month: i64,
    year: i64,
) -> Result<Vec<ExpensePayment>> {
    let payments = sqlx::query_as::<_, ExpensePayment>(
        r#"
        SELECT p.id, p.expense_id, p.month, p.year, p.amount, p.paid_at
        FROM expense_payments p
        INNER JOIN expenses e ON e.id = p.expense_id
        WHERE e.owner_id = ? AND p.month = ? AND p.year = ?
        ORDER BY p.paid_at
        "#,
    )
    .bind(owner_id)
    .bind(month)
    .bind(year)
    .fetch_all(pool)
    .await?;

    Ok(payments)
}

/// Sum of payments in one category for a month.
pub async fn sum_paid_in_category(
    pool: &SqlitePool,
    owner_id: i64,
    category: &str,
    month: i64,
    year: i64,
) -> Result<f64> {
    let total = sqlx::query_scalar::<_, f64>(
        r#"
        SELECT COALESCE(SUM(p.amount), 0.0)
        FROM expense_payments p
        INNER JOIN expenses e ON e.id = p.expense_id
        WHERE e.owner_id = ? AND e.category = ? AND p.month = ? AND p.year = ?
        "#,
    )
    .bind(owner_id)
    .bind(category)
    .bind(month)
    .bind(year)
    .fetch_one(pool)
    .await?;

    Ok(total)
}

/// Paid totals grouped by category for a month, largest first.
pub async fn totals_by_category(
    pool: &SqlitePool,
    owner_id: i64,
    month: i64,
    year: i64,
) -> Result<Vec<(String, f64)>> {
    let rows = sqlx::query_as::<_, (String, f64)>(
        r#"
        SELECT e.category, SUM(p.amount) AS total
        FROM expense_payments p
        INNER JOIN expenses e ON e.id = p.expense_id
        WHERE e.owner_id = ? AND p.month = ? AND p.year = ?
        GROUP BY e.category
        ORDER BY total DESC
        "#,
    )
    .bind(owner_id)
    .bind(month)
    .bind(year)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Paid totals grouped by category for a whole year, largest first.
pub async fn yearly_totals_by_category(
    pool: &SqlitePool,
    owner_id: i64,
    year: i64,
) -> Result<Vec<(String, f64)>> {
    let rows = sqlx::query_as::<_, (String, f64)>(
        r#"
        SELECT e.category, SUM(p.amount) AS total
        FROM expense_payments p
        INNER JOIN expenses e ON e.id = p.expense_id
        WHERE e.owner_id = ? AND p.year = ?
        GROUP BY e.category
        ORDER BY total DESC
        "#,
    )
    .bind(owner_id)
    .bind(year)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Paid totals per month for a year. Months without payments are absent.
pub async fn monthly_paid_totals(
    pool: &SqlitePool,
    owner_id: i64,
    year: i64,
) -> Result<Vec<(i64, f64)>> {
    let rows = sqlx::query_as::<_, (i64, f64)>(
        r#"
        SELECT p.month, SUM(p.amount)
        FROM expense_payments p
        INNER JOIN expenses e ON e.id = p.expense_id
        WHERE e.owner_id = ? AND p.year = ?
        GROUP BY p.month
        ORDER BY p.month
        "#,
    )
    .bind(owner_id)
    .bind(year)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Insert one participant's share of an expense.
pub async fn insert_split<'e>(
    exec: impl SqliteExecutor<'e>,
    expense_id: i64,
    user_id: i64,
    percentage: f64,
    amount: f64,
) -> Result<ExpenseSplit> {
    sqlx::query_as::<_, ExpenseSplit>(
        r#"
        INSERT INTO expense_splits (expense_id, user_id, percentage, amount)
        VALUES (?, ?, ?, ?)
        RETURNING id, expense_id, user_id, percentage, amount
        "#,
    )
    .bind(expense_id)
    .bind(user_id)
    .bind(percentage)
    .bind(amount)
    .fetch_one(exec)
    .await
    .map_err(DatabaseError::unique_violation(
        "ExpenseSplit",
        format!("{}/{}", expense_id, user_id),
    ))
}

/// Shares of an expense.
pub async fn list_splits<'e>(
    exec: impl SqliteExecutor<'e>,
    expense_id: i64,
) -> Result<Vec<ExpenseSplit>> {
    let splits = sqlx::query_as::<_, ExpenseSplit>(
        r#"
        SELECT id, expense_id, user_id, percentage, amount
        FROM expense_splits
        WHERE expense_id = ?
        ORDER BY id
        "#,
    )
    .bind(expense_id)
    .fetch_all(exec)
    .await?;

    Ok(splits)
}

/// Overwrite the amount of one share.
pub async fn set_split_amount<'e>(
    exec: impl SqliteExecutor<'e>,
    split_id: i64,
    amount: f64,
) -> Result<()> {
    let result = sqlx::query("UPDATE expense_splits SET amount = ? WHERE id = ?")
        .bind(amount)
        .bind(split_id)
        .execute(exec)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("ExpenseSplit", split_id));
    }

    Ok(())
}

/// Sum of a user's shares across all active split expenses.
pub async fn user_split_total(pool: &SqlitePool, user_id: i64) -> Result<f64> {
    let total = sqlx::query_scalar::<_, f64>(
        r#"
        SELECT COALESCE(SUM(s.amount), 0.0)
        FROM expense_splits s
        INNER JOIN expenses e ON e.id = s.expense_id
        WHERE s.user_id = ? AND e.active = 1
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(total)
}

/// Count all expense rows (used to check atomic creation).
pub async fn count_expenses(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM expenses")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExpenseKind;
    use crate::{user, Database};

    fn new_expense(owner_id: i64, description: &str, amount: f64, category: &str) -> NewExpense {
        NewExpense {
            owner_id,
            account_id: None,
            group_id: None,
            description: description.to_string(),
            amount,
            category: category.to_string(),
            kind: ExpenseKind::Fixed,
            due_day: Some(10),
        }
    }

    #[tokio::test]
    async fn test_one_payment_per_period() {
        let db = Database::in_memory().await.unwrap();
        let pool = db.pool();
        let ana = user::create_user(pool, "Ana", "ana@example.com", "h").await.unwrap();
        let rent = insert_expense(pool, &new_expense(ana.id, "Aluguel", 1500.0, "Moradia"))
            .await
            .unwrap();

        insert_payment(pool, rent.id, 3, 2025, 1500.0).await.unwrap();
        let dup = insert_payment(pool, rent.id, 3, 2025, 1500.0).await;
        assert!(matches!(dup, Err(DatabaseError::AlreadyExists { .. })));

        // A different month is fine
        insert_payment(pool, rent.id, 4, 2025, 1500.0).await.unwrap();

        assert!(get_payment(pool, rent.id, 3, 2025).await.unwrap().is_some());
        assert!(delete_payment(pool, rent.id, 3, 2025).await.unwrap());
        assert!(!delete_payment(pool, rent.id, 3, 2025).await.unwrap());
    }

    #[tokio::test]
    async fn test_category_aggregates() {
        let db = Database::in_memory().await.unwrap();
        let pool = db.pool();
        let ana = user::create_user(pool, "Ana", "ana@example.com", "h").await.unwrap();
        let rent = insert_expense(pool, &new_expense(ana.id, "Aluguel", 1500.0, "Moradia"))
            .await
            .unwrap();
        let market = insert_expense(pool, &new_expense(ana.id, "Mercado", 600.0, "Alimentação"))
            .await
            .unwrap();
        let bakery = insert_expense(pool, &new_expense(ana.id, "Padaria", 100.0, "Alimentação"))
            .await
            .unwrap();

        insert_payment(pool, rent.id, 5, 2025, 1500.0).await.unwrap();
        insert_payment(pool, market.id, 5, 2025, 650.0).await.unwrap();
        insert_payment(pool, bakery.id, 5, 2025, 90.0).await.unwrap();
        insert_payment(pool, market.id, 6, 2025, 600.0).await.unwrap();

        let food = sum_paid_in_category(pool, ana.id, "Alimentação", 5, 2025).await.unwrap();
        assert_eq!(food, 740.0);

        let by_category = totals_by_category(pool, ana.id, 5, 2025).await.unwrap();
        assert_eq!(by_category[0], ("Moradia".to_string(), 1500.0));
        assert_eq!(by_category[1], ("Alimentação".to_string(), 740.0));

        let monthly = monthly_paid_totals(pool, ana.id, 2025).await.unwrap();
        assert_eq!(monthly, vec![(5, 2240.0), (6, 600.0)]);

        let yearly = yearly_totals_by_category(pool, ana.id, 2025).await.unwrap();
        assert_eq!(yearly[0], ("Moradia".to_string(), 1500.0));
        assert_eq!(yearly[1], ("Alimentação".to_string(), 1340.0));
    }

    #[tokio::test]
    async fn test_toggle_and_delete() {
        let db = Database::in_memory().await.unwrap();
        let pool = db.pool();
        let ana = user::create_user(pool, "Ana", "ana@example.com", "h").await.unwrap();
        let gym = insert_expense(pool, &new_expense(ana.id, "Academia", 120.0, "Saúde"))
            .await
            .unwrap();
        assert!(gym.active);

        set_active(pool, gym.id, false).await.unwrap();
        assert!(list_active_expenses(pool, ana.id).await.unwrap().is_empty());
        assert_eq!(list_expenses(pool, ana.id).await.unwrap().len(), 1);

        delete_expense(pool, gym.id).await.unwrap();
        assert!(matches!(
            get_expense(pool, gym.id).await,
            Err(DatabaseError::NotFound { .. })
        ));
    }
}
