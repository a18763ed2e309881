//! In-app notification storage.

use chrono::NaiveDateTime;
use sqlx::{SqliteExecutor, SqlitePool};

use crate::error::Result;
use crate::models::{Notification, NotificationKind};

const NOTIFICATION_COLUMNS: &str = "id, user_id, kind, title, message, read, read_at, created_at";

/// Create a notification for one user.
pub async fn create_notification<'e>(
    exec: impl SqliteExecutor<'e>,
    user_id: i64,
    kind: NotificationKind,
    title: &str,
    message: &str,
) -> Result<Notification> {
    let query = format!(
        r#"
        INSERT INTO notifications (user_id, kind, title, message)
        VALUES (?, ?, ?, ?)
        RETURNING {NOTIFICATION_COLUMNS}
        "#
    );

    let notification = sqlx::query_as::<_, Notification>(&query)
        .bind(user_id)
        .bind(kind)
        .bind(title)
        .bind(message)
        .fetch_one(exec)
        .await?;

    Ok(notification)
}

/// A user's notifications, newest first.
pub async fn list_notifications(
    pool: &SqlitePool,
    user_id: i64,
    limit: i64,
) -> Result<Vec<Notification>> {
    let query = format!(
        r#"
        SELECT {NOTIFICATION_COLUMNS}
        FROM notifications
        WHERE user_id = ?
        ORDER BY created_at DESC, id DESC
        LIMIT ?
        "#
    );
    let notifications = sqlx::query_as::<_, Notification>(&query)
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(notifications)
}

/// Number of unread notifications.
pub async fn count_unread(pool: &SqlitePool, user_id: i64) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND read = 0",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Number of notifications of a kind for a user.
pub async fn count_by_kind(pool: &SqlitePool, user_id: i64, kind: NotificationKind) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND kind = ?",
    )
    .bind(user_id)
    .bind(kind)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Mark one notification as read. Only the owner's rows are touched.
pub async fn mark_read(
    pool: &SqlitePool,
    id: i64,
    user_id: i64,
    at: NaiveDateTime,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE notifications
        SET read = 1, read_at = COALESCE(read_at, ?)
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(at)
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Mark every unread notification of a user as read.
pub async fn mark_all_read(pool: &SqlitePool, user_id: i64, at: NaiveDateTime) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE notifications
        SET read = 1, read_at = ?
        WHERE user_id = ? AND read = 0
        "#,
    )
    .bind(at)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Delete a notification owned by `user_id`.
pub async fn delete_notification(pool: &SqlitePool, id: i64, user_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM notifications WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{user, Database};
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_read_tracking() {
        let db = Database::in_memory().await.unwrap();
        let pool = db.pool();
        let ana = user::create_user(pool, "Ana", "ana@example.com", "h").await.unwrap();
        let bia = user::create_user(pool, "Bia", "bia@example.com", "h").await.unwrap();

        let first = create_notification(pool, ana.id, NotificationKind::General, "Oi", "Olá")
            .await
            .unwrap();
        create_notification(pool, ana.id, NotificationKind::Budget80, "Orçamento", "80%")
            .await
            .unwrap();
        assert_eq!(count_unread(pool, ana.id).await.unwrap(), 2);
        assert_eq!(count_by_kind(pool, ana.id, NotificationKind::Budget80).await.unwrap(), 1);

        let at = NaiveDate::from_ymd_opt(2025, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();

        // Another user cannot mark it
        assert!(!mark_read(pool, first.id, bia.id, at).await.unwrap());
        assert!(mark_read(pool, first.id, ana.id, at).await.unwrap());
        assert_eq!(count_unread(pool, ana.id).await.unwrap(), 1);

        let listed = list_notifications(pool, ana.id, 10).await.unwrap();
        let read = listed.iter().find(|n| n.id == first.id).unwrap();
        assert!(read.read);
        assert_eq!(read.read_at, Some(at));

        assert_eq!(mark_all_read(pool, ana.id, at).await.unwrap(), 1);
        assert_eq!(count_unread(pool, ana.id).await.unwrap(), 0);

        assert!(!delete_notification(pool, first.id, bia.id).await.unwrap());
        assert!(delete_notification(pool, first.id, ana.id).await.unwrap());
    }
}
