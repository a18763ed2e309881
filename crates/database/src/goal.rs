//! Group savings goals and their contribution ledger.

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{SqliteExecutor, SqlitePool};

use crate::error::{DatabaseError, Result};
use crate::models::{GoalContribution, GroupGoal};

const GOAL_COLUMNS: &str = "id, group_id, name, target_amount, current_amount, deadline, \
    created_by, completed_at, created_at";

/// Create a goal.
pub async fn create_goal(
    pool: &SqlitePool,
    group_id: i64,
    name: &str,
    target_amount: f64,
    deadline: Option<NaiveDate>,
    created_by: i64,
) -> Result<GroupGoal> {
    let query = format!(
        r#"
        INSERT INTO group_goals (group_id, name, target_amount, deadline, created_by)
        VALUES (?, ?, ?, ?, ?)
        RETURNING {GOAL_COLUMNS}
        "#
    );

    let goal = sqlx::query_as::<_, GroupGoal>(&query)
        .bind(group_id)
        .bind(name)
        .bind(target_amount)
        .bind(deadline)
        .bind(created_by)
        .fetch_one(pool)
        .await?;

    Ok(goal)
}

/// Get a goal by ID.
pub async fn get_goal<'e>(exec: impl SqliteExecutor<'e>, id: i64) -> Result<GroupGoal> {
    let query = format!("SELECT {GOAL_COLUMNS} FROM group_goals WHERE id = ?");
    sqlx::query_as::<_, GroupGoal>(&query)
        .bind(id)
        .fetch_optional(exec)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Goal", id))
}

/// Goals of every group the user belongs to.
pub async fn list_goals_for_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<GroupGoal>> {
    let goals = sqlx::query_as::<_, GroupGoal>(
        r#"
        SELECT g.id, g.group_id, g.name, g.target_amount, g.current_amount, g.deadline,
               g.created_by, g.completed_at, g.created_at
        FROM group_goals g
        INNER JOIN group_members m ON m.group_id = g.group_id
        WHERE m.user_id = ?
        ORDER BY g.completed_at IS NOT NULL, g.deadline, g.name
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(goals)
}

/// Update name, target and deadline.
pub async fn update_goal(
    pool: &SqlitePool,
    id: i64,
    name: &str,
    target_amount: f64,
    deadline: Option<NaiveDate>,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE group_goals
        SET name = ?, target_amount = ?, deadline = ?
        WHERE id = ?
        "#,
    )
    .bind(name)
    .bind(target_amount)
    .bind(deadline)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Goal", id));
    }

    Ok(())
}

/// Delete a goal and its contributions.
pub async fn delete_goal(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM group_goals WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Goal", id));
    }

    Ok(())
}

/// Append to the contribution ledger.
pub async fn insert_contribution<'e>(
    exec: impl SqliteExecutor<'e>,
    goal_id: i64,
    user_id: i64,
    amount: f64,
) -> Result<GoalContribution> {
    let contribution = sqlx::query_as::<_, GoalContribution>(
        r#"
        INSERT INTO goal_contributions (goal_id, user_id, amount)
        VALUES (?, ?, ?)
        RETURNING id, goal_id, user_id, amount, contributed_at
        "#,
    )
    .bind(goal_id)
    .bind(user_id)
    .bind(amount)
    .fetch_one(exec)
    .await?;

    Ok(contribution)
}

/// Add to the running total and return the updated goal.
pub async fn increment_current<'e>(
    exec: impl SqliteExecutor<'e>,
    goal_id: i64,
    amount: f64,
) -> Result<GroupGoal> {
    let query = format!(
        r#"
        UPDATE group_goals
        SET current_amount = current_amount + ?
        WHERE id = ?
        RETURNING {GOAL_COLUMNS}
        "#
    );

    sqlx::query_as::<_, GroupGoal>(&query)
        .bind(amount)
        .bind(goal_id)
        .fetch_optional(exec)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Goal", goal_id))
}

/// Stamp the completion time once. Returns false if already completed.
pub async fn mark_completed<'e>(
    exec: impl SqliteExecutor<'e>,
    goal_id: i64,
    at: NaiveDateTime,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE group_goals SET completed_at = ? WHERE id = ? AND completed_at IS NULL",
    )
    .bind(at)
    .bind(goal_id)
    .execute(exec)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Contributions to a goal, newest first.
pub async fn list_contributions(pool: &SqlitePool, goal_id: i64) -> Result<Vec<GoalContribution>> {
    let contributions = sqlx::query_as::<_, GoalContribution>(
        r#"
        SELECT id, goal_id, user_id, amount, contributed_at
        FROM goal_contributions
        WHERE goal_id = ?
        ORDER BY contributed_at DESC, id DESC
        "#,
    )
    .bind(goal_id)
    .fetch_all(pool)
    .await?;

    Ok(contributions)
}

/// Total contributed per member, largest first.
pub async fn contributor_totals(
    pool: &SqlitePool,
    goal_id: i64,
) -> Result<Vec<(i64, String, f64)>> {
    let rows = sqlx::query_as::<_, (i64, String, f64)>(
        r#"
        SELECT u.id, u.name, SUM(c.amount) AS total
        FROM goal_contributions c
        INNER JOIN users u ON u.id = c.user_id
        WHERE c.goal_id = ?
        GROUP BY u.id, u.name
        ORDER BY total DESC
        "#,
    )
    .bind(goal_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{group, user, Database, Role};

    #[tokio::test]
    async fn test_contributions_and_completion() {
        let db = Database::in_memory().await.unwrap();
        let pool = db.pool();
        let ana = user::create_user(pool, "Ana", "ana@example.com", "h").await.unwrap();
        let bia = user::create_user(pool, "Bia", "bia@example.com", "h").await.unwrap();
        let family = group::create_group(pool, "Casa", ana.id).await.unwrap();
        group::add_member(pool, family.id, ana.id, Role::Admin).await.unwrap();
        group::add_member(pool, family.id, bia.id, Role::Member).await.unwrap();

        let goal = create_goal(pool, family.id, "Viagem", 1_000.0, None, ana.id)
            .await
            .unwrap();
        assert_eq!(goal.current_amount, 0.0);

        insert_contribution(pool, goal.id, ana.id, 300.0).await.unwrap();
        insert_contribution(pool, goal.id, bia.id, 200.0).await.unwrap();
        insert_contribution(pool, goal.id, bia.id, 250.0).await.unwrap();
        let updated = increment_current(pool, goal.id, 750.0).await.unwrap();
        assert_eq!(updated.current_amount, 750.0);

        let totals = contributor_totals(pool, goal.id).await.unwrap();
        assert_eq!(totals[0], (bia.id, "Bia".to_string(), 450.0));
        assert_eq!(totals[1].2, 300.0);

        let at = NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        assert!(mark_completed(pool, goal.id, at).await.unwrap());
        assert!(!mark_completed(pool, goal.id, at).await.unwrap());

        let for_bia = list_goals_for_user(pool, bia.id).await.unwrap();
        assert_eq!(for_bia.len(), 1);
        assert_eq!(for_bia[0].completed_at, Some(at));
        assert_eq!(list_contributions(pool, goal.id).await.unwrap().len(), 3);
    }
}
