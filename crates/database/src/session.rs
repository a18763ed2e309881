//! Session token storage.

use chrono::NaiveDateTime;
use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::Session;

const SESSION_COLUMNS: &str =
    "id, user_id, access_token, refresh_token, access_expires_at, refresh_expires_at, created_at";

/// Store a new session.
pub async fn create_session(
    pool: &SqlitePool,
    user_id: i64,
    access_token: &str,
    refresh_token: &str,
    access_expires_at: NaiveDateTime,
    refresh_expires_at: NaiveDateTime,
) -> Result<Session> {
    let query = format!(
        r#"
        INSERT INTO sessions
            (user_id, access_token, refresh_token, access_expires_at, refresh_expires_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING {SESSION_COLUMNS}
        "#
    );

    let session = sqlx::query_as::<_, Session>(&query)
        .bind(user_id)
        .bind(access_token)
        .bind(refresh_token)
        .bind(access_expires_at)
        .bind(refresh_expires_at)
        .fetch_one(pool)
        .await?;

    Ok(session)
}

/// Look up a session by its access token.
pub async fn get_by_access_token(pool: &SqlitePool, token: &str) -> Result<Option<Session>> {
    let query = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE access_token = ?");
    let session = sqlx::query_as::<_, Session>(&query)
        .bind(token)
        .fetch_optional(pool)
        .await?;

    Ok(session)
}

/// Look up a session by its refresh token.
pub async fn get_by_refresh_token(pool: &SqlitePool, token: &str) -> Result<Option<Session>> {
    let query = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE refresh_token = ?");
    let session = sqlx::query_as::<_, Session>(&query)
        .bind(token)
        .fetch_optional(pool)
        .await?;

    Ok(session)
}

/// Replace the access token of a session.
pub async fn rotate_access_token(
    pool: &SqlitePool,
    session_id: i64,
    access_token: &str,
    access_expires_at: NaiveDateTime,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE sessions
        SET access_token = ?, access_expires_at = ?
        WHERE id = ?
        "#,
    )
    .bind(access_token)
    .bind(access_expires_at)
    .bind(session_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete a session (logout).
pub async fn delete_session(pool: &SqlitePool, session_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(session_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Remove sessions whose refresh token has expired.
pub async fn delete_expired(pool: &SqlitePool, now: NaiveDateTime) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE refresh_expires_at < ?")
        .bind(now)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
