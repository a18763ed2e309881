//! Notification creation, fan-out and read tracking.

use chrono::NaiveDateTime;
use database::notification as notification_store;
use database::{group, DatabaseError, Notification, NotificationKind};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::Result;

/// Default page size for notification listings.
pub const DEFAULT_LIMIT: i64 = 50;

/// Send one notification.
pub async fn notify(
    pool: &SqlitePool,
    user_id: i64,
    kind: NotificationKind,
    title: &str,
    message: &str,
) -> Result<Notification> {
    let notification =
        notification_store::create_notification(pool, user_id, kind, title, message).await?;
    debug!(user_id, kind = kind.as_str(), "Notification created");
    Ok(notification)
}

/// Send the same notification to every member of a group.
///
/// `exclude` skips one user, usually whoever triggered the event. Returns the
/// number of notifications created.
pub async fn fan_out(
    pool: &SqlitePool,
    group_id: i64,
    exclude: Option<i64>,
    kind: NotificationKind,
    title: &str,
    message: &str,
) -> Result<usize> {
    let recipients: Vec<i64> = group::member_user_ids(pool, group_id)
        .await?
        .into_iter()
        .filter(|id| Some(*id) != exclude)
        .collect();

    for user_id in &recipients {
        notification_store::create_notification(pool, *user_id, kind, title, message).await?;
    }

    debug!(group_id, count = recipients.len(), kind = kind.as_str(), "Notification fan-out");
    Ok(recipients.len())
}

/// Newest notifications of a user.
pub async fn list(pool: &SqlitePool, user_id: i64) -> Result<Vec<Notification>> {
    Ok(notification_store::list_notifications(pool, user_id, DEFAULT_LIMIT).await?)
}

pub async fn unread_count(pool: &SqlitePool, user_id: i64) -> Result<i64> {
    Ok(notification_store::count_unread(pool, user_id).await?)
}

/// Mark one of the user's notifications as read.
///
/// Another user's notification is reported as missing.
pub async fn mark_read(pool: &SqlitePool, user_id: i64, id: i64, now: NaiveDateTime) -> Result<()> {
    if !notification_store::mark_read(pool, id, user_id, now).await? {
        return Err(DatabaseError::not_found("Notification", id).into());
    }
    Ok(())
}

pub async fn mark_all_read(pool: &SqlitePool, user_id: i64, now: NaiveDateTime) -> Result<u64> {
    Ok(notification_store::mark_all_read(pool, user_id, now).await?)
}

pub async fn delete(pool: &SqlitePool, user_id: i64, id: i64) -> Result<()> {
    if !notification_store::delete_notification(pool, id, user_id).await? {
        return Err(DatabaseError::not_found("Notification", id).into());
    }
    Ok(())
}
