//! Group invite codes.

use chrono::NaiveDateTime;
use sqlx::{SqliteExecutor, SqlitePool};

use crate::error::{DatabaseError, Result};
use crate::models::GroupInvite;

const INVITE_COLUMNS: &str =
    "id, group_id, code, created_by, expires_at, max_uses, use_count, created_at";

/// Store a new invite code.
pub async fn create_invite(
    pool: &SqlitePool,
    group_id: i64,
    code: &str,
    created_by: i64,
    expires_at: NaiveDateTime,
    max_uses: i64,
) -> Result<GroupInvite> {
    let query = format!(
        r#"
        INSERT INTO group_invites (group_id, code, created_by, expires_at, max_uses)
        VALUES (?, ?, ?, ?, ?)
        RETURNING {INVITE_COLUMNS}
        "#
    );

    sqlx::query_as::<_, GroupInvite>(&query)
        .bind(group_id)
        .bind(code)
        .bind(created_by)
        .bind(expires_at)
        .bind(max_uses)
        .fetch_one(pool)
        .await
        .map_err(DatabaseError::unique_violation("GroupInvite", code))
}

/// Look up an invite by code.
pub async fn get_by_code<'e>(
    exec: impl SqliteExecutor<'e>,
    code: &str,
) -> Result<Option<GroupInvite>> {
    let query = format!("SELECT {INVITE_COLUMNS} FROM group_invites WHERE code = ?");
    let invite = sqlx::query_as::<_, GroupInvite>(&query)
        .bind(code)
        .fetch_optional(exec)
        .await?;

    Ok(invite)
}

/// Get an invite by ID.
pub async fn get_invite(pool: &SqlitePool, id: i64) -> Result<GroupInvite> {
    let query = format!("SELECT {INVITE_COLUMNS} FROM group_invites WHERE id = ?");
    sqlx::query_as::<_, GroupInvite>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("GroupInvite", id))
}

/// Invites of a group, newest first.
pub async fn list_invites(pool: &SqlitePool, group_id: i64) -> Result<Vec<GroupInvite>> {
    let query = format!(
        r#"
        SELECT {INVITE_COLUMNS} FROM group_invites
        WHERE group_id = ?
        ORDER BY created_at DESC, id DESC
        "#
    );
    let invites = sqlx::query_as::<_, GroupInvite>(&query)
        .bind(group_id)
        .fetch_all(pool)
        .await?;

    Ok(invites)
}

/// Consume one use of an invite.
///
/// The `use_count < max_uses` guard makes the update a no-op once the invite
/// is exhausted; returns whether a use was recorded.
pub async fn increment_use<'e>(exec: impl SqliteExecutor<'e>, id: i64) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE group_invites
        SET use_count = use_count + 1
        WHERE id = ? AND use_count < max_uses
        "#,
    )
    .bind(id)
    .execute(exec)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete (revoke) an invite.
pub async fn delete_invite(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM group_invites WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("GroupInvite", id));
    }

    Ok(())
}
