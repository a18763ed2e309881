//! Flat key/value settings table.

use sqlx::SqlitePool;

use crate::models::Setting;
use crate::Result;

/// Every stored setting.
pub async fn list_settings(pool: &SqlitePool) -> Result<Vec<Setting>> {
    let settings = sqlx::query_as::<_, Setting>(
        r#"
        SELECT key, value, updated_at
        FROM settings
        ORDER BY key
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(settings)
}

/// Get one setting.
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<Setting>> {
    let record = sqlx::query_as::<_, Setting>(
        r#"
        SELECT key, value, updated_at
        FROM settings
        WHERE key = ?
        "#,
    )
    .bind(key)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Create or update a setting.
pub async fn upsert_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value)
        VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = datetime('now')
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Remove a setting so its default applies again.
pub async fn delete_setting(pool: &SqlitePool, key: &str) -> Result<()> {
    sqlx::query("DELETE FROM settings WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await?;

    Ok(())
}
