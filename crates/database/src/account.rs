//! Account CRUD operations.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{Account, AccountKind};

const ACCOUNT_COLUMNS: &str = "id, name, kind, owner_id, group_id, initial_balance, created_at";

/// Create an account.
pub async fn create_account(
    pool: &SqlitePool,
    name: &str,
    kind: AccountKind,
    owner_id: i64,
    group_id: Option<i64>,
    initial_balance: f64,
) -> Result<Account> {
    let query = format!(
        r#"
        INSERT INTO accounts (name, kind, owner_id, group_id, initial_balance)
        VALUES (?, ?, ?, ?, ?)
        RETURNING {ACCOUNT_COLUMNS}
        "#
    );

    let account = sqlx::query_as::<_, Account>(&query)
        .bind(name)
        .bind(kind)
        .bind(owner_id)
        .bind(group_id)
        .bind(initial_balance)
        .fetch_one(pool)
        .await?;

    Ok(account)
}

/// Get an account by ID.
pub async fn get_account(pool: &SqlitePool, id: i64) -> Result<Account> {
    let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?");
    sqlx::query_as::<_, Account>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Account", id))
}

/// Accounts a user can see: their own, plus joint accounts of their groups.
pub async fn list_accessible(pool: &SqlitePool, user_id: i64) -> Result<Vec<Account>> {
    let accounts = sqlx::query_as::<_, Account>(
        r#"
        SELECT a.id, a.name, a.kind, a.owner_id, a.group_id, a.initial_balance, a.created_at
        FROM accounts a
        WHERE a.owner_id = ?
           OR (a.kind = 'joint' AND a.group_id IN (
                SELECT group_id FROM group_members WHERE user_id = ?
           ))
        ORDER BY a.name
        "#,
    )
    .bind(user_id)
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(accounts)
}

/// Update name and initial balance.
pub async fn update_account(
    pool: &SqlitePool,
    id: i64,
    name: &str,
    initial_balance: f64,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE accounts
        SET name = ?, initial_balance = ?
        WHERE id = ?
        "#,
    )
    .bind(name)
    .bind(initial_balance)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Account", id));
    }

    Ok(())
}

/// Delete an account.
pub async fn delete_account(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM accounts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Account", id));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::{group, user, Database};

    #[tokio::test]
    async fn test_joint_accounts_visible_to_group() {
        let db = Database::in_memory().await.unwrap();
        let pool = db.pool();
        let ana = user::create_user(pool, "Ana", "ana@example.com", "h").await.unwrap();
        let bia = user::create_user(pool, "Bia", "bia@example.com", "h").await.unwrap();
        let carlos = user::create_user(pool, "Carlos", "c@example.com", "h").await.unwrap();

        let g = group::create_group(pool, "Casa", ana.id).await.unwrap();
        group::add_member(pool, g.id, ana.id, Role::Admin).await.unwrap();
        group::add_member(pool, g.id, bia.id, Role::Member).await.unwrap();

        create_account(pool, "Pessoal", AccountKind::Individual, ana.id, None, 100.0)
            .await
            .unwrap();
        create_account(pool, "Casa", AccountKind::Joint, ana.id, Some(g.id), 0.0)
            .await
            .unwrap();

        assert_eq!(list_accessible(pool, ana.id).await.unwrap().len(), 2);
        let bia_accounts = list_accessible(pool, bia.id).await.unwrap();
        assert_eq!(bia_accounts.len(), 1);
        assert_eq!(bia_accounts[0].kind, AccountKind::Joint);
        assert!(list_accessible(pool, carlos.id).await.unwrap().is_empty());
    }
}
