//! Family group and membership operations.

use sqlx::{SqliteExecutor, SqlitePool};

use crate::error::{DatabaseError, Result};
use crate::models::{FamilyGroup, GroupMember, MemberInfo, Role};

/// Create a group. The caller is responsible for adding the creator as admin.
pub async fn create_group<'e>(
    exec: impl SqliteExecutor<'e>,
    name: &str,
    created_by: i64,
) -> Result<FamilyGroup> {
    let group = sqlx::query_as::<_, FamilyGroup>(
        r#"
        INSERT INTO family_groups (name, created_by)
        VALUES (?, ?)
        RETURNING id, name, created_by, created_at
        "#,
    )
    .bind(name)
    .bind(created_by)
    .fetch_one(exec)
    .await?;

    Ok(group)
}

/// Get a group by ID.
pub async fn get_group(pool: &SqlitePool, id: i64) -> Result<FamilyGroup> {
    sqlx::query_as::<_, FamilyGroup>(
        r#"
        SELECT id, name, created_by, created_at
        FROM family_groups
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::not_found("Group", id))
}

/// Groups a user belongs to.
pub async fn list_groups_for_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<FamilyGroup>> {
    let groups = sqlx::query_as::<_, FamilyGroup>(
        r#"
        SELECT g.id, g.name, g.created_by, g.created_at
        FROM family_groups g
        INNER JOIN group_members m ON m.group_id = g.id
        WHERE m.user_id = ?
        ORDER BY g.name
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(groups)
}

/// Rename a group.
pub async fn rename_group(pool: &SqlitePool, id: i64, name: &str) -> Result<()> {
    let result = sqlx::query("UPDATE family_groups SET name = ? WHERE id = ?")
        .bind(name)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Group", id));
    }

    Ok(())
}

/// Add a member to a group.
pub async fn add_member<'e>(
    exec: impl SqliteExecutor<'e>,
    group_id: i64,
    user_id: i64,
    role: Role,
) -> Result<GroupMember> {
    sqlx::query_as::<_, GroupMember>(
        r#"
        INSERT INTO group_members (group_id, user_id, role)
        VALUES (?, ?, ?)
        RETURNING id, group_id, user_id, role, joined_at
        "#,
    )
    .bind(group_id)
    .bind(user_id)
    .bind(role)
    .fetch_one(exec)
    .await
    .map_err(DatabaseError::unique_violation(
        "GroupMember",
        format!("{}/{}", group_id, user_id),
    ))
}

/// Membership of a user in a group, if any.
pub async fn get_member<'e>(
    exec: impl SqliteExecutor<'e>,
    group_id: i64,
    user_id: i64,
) -> Result<Option<GroupMember>> {
    let member = sqlx::query_as::<_, GroupMember>(
        r#"
        SELECT id, group_id, user_id, role, joined_at
        FROM group_members
        WHERE group_id = ? AND user_id = ?
        "#,
    )
    .bind(group_id)
    .bind(user_id)
    .fetch_optional(exec)
    .await?;

    Ok(member)
}

/// Members of a group with their names.
pub async fn list_members(pool: &SqlitePool, group_id: i64) -> Result<Vec<MemberInfo>> {
    let members = sqlx::query_as::<_, MemberInfo>(
        r#"
        SELECT u.id AS user_id, u.name, u.email, m.role, m.joined_at
        FROM group_members m
        INNER JOIN users u ON u.id = m.user_id
        WHERE m.group_id = ?
        ORDER BY m.role, u.name
        "#,
    )
    .bind(group_id)
    .fetch_all(pool)
    .await?;

    Ok(members)
}

/// User IDs of every member of a group.
pub async fn member_user_ids<'e>(exec: impl SqliteExecutor<'e>, group_id: i64) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT user_id
        FROM group_members
        WHERE group_id = ?
        ORDER BY user_id
        "#,
    )
    .bind(group_id)
    .fetch_all(exec)
    .await?;

    Ok(ids)
}

/// Change a member's role.
pub async fn update_role(pool: &SqlitePool, group_id: i64, user_id: i64, role: Role) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE group_members
        SET role = ?
        WHERE group_id = ? AND user_id = ?
        "#,
    )
    .bind(role)
    .bind(group_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "GroupMember",
            id: format!("{}/{}", group_id, user_id),
        });
    }

    Ok(())
}

/// Remove a member from a group.
pub async fn remove_member(pool: &SqlitePool, group_id: i64, user_id: i64) -> Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM group_members
        WHERE group_id = ? AND user_id = ?
        "#,
    )
    .bind(group_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "GroupMember",
            id: format!("{}/{}", group_id, user_id),
        });
    }

    Ok(())
}

/// Number of admins in a group.
pub async fn count_admins(pool: &SqlitePool, group_id: i64) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM group_members
        WHERE group_id = ? AND role = 'admin'
        "#,
    )
    .bind(group_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
