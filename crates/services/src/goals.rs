//! Group savings goals.

use chrono::{NaiveDate, NaiveDateTime};
use database::goal as goal_store;
use database::{validation, Database, GoalContribution, GroupGoal, NotificationKind, Role};
use finance_core::money::{format_brl, round2};
use serde::Serialize;
use tracing::info;

use crate::error::{Result, ServiceError};
use crate::groups;
use crate::notifications;

/// A goal with derived progress numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProgress {
    pub goal: GroupGoal,
    /// Progress in percent, capped at 100.
    pub percent: f64,
    pub remaining: f64,
}

impl GoalProgress {
    pub fn new(goal: GroupGoal) -> Self {
        let percent = if goal.target_amount > 0.0 {
            (goal.current_amount / goal.target_amount * 100.0).min(100.0)
        } else {
            0.0
        };
        Self {
            percent: round2(percent),
            remaining: round2((goal.target_amount - goal.current_amount).max(0.0)),
            goal,
        }
    }
}

/// Result of a contribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributionOutcome {
    pub goal: GroupGoal,
    pub contribution: GoalContribution,
    /// True only for the contribution that first reached the target.
    pub reached: bool,
}

pub async fn create_goal(
    db: &Database,
    user_id: i64,
    group_id: i64,
    name: &str,
    target_amount: f64,
    deadline: Option<NaiveDate>,
) -> Result<GroupGoal> {
    let target_amount = round2(target_amount);
    validation::validate_name("Nome da meta", name)?;
    validation::validate_amount("Valor da meta", target_amount)?;
    groups::require_member(db.pool(), group_id, user_id).await?;

    let goal = goal_store::create_goal(
        db.pool(),
        group_id,
        name.trim(),
        target_amount,
        deadline,
        user_id,
    )
    .await?;
    info!(user_id, group_id, goal_id = goal.id, "Goal created");
    Ok(goal)
}

/// Goals of every group the user belongs to.
pub async fn list_for_user(db: &Database, user_id: i64) -> Result<Vec<GoalProgress>> {
    Ok(goal_store::list_goals_for_user(db.pool(), user_id)
        .await?
        .into_iter()
        .map(GoalProgress::new)
        .collect())
}

/// A goal with its per-member totals, newest contributions included.
pub async fn goal_detail(
    db: &Database,
    user_id: i64,
    goal_id: i64,
) -> Result<(GoalProgress, Vec<(i64, String, f64)>, Vec<GoalContribution>)> {
    let goal = goal_store::get_goal(db.pool(), goal_id).await?;
    groups::require_member(db.pool(), goal.group_id, user_id).await?;
    let totals = goal_store::contributor_totals(db.pool(), goal_id).await?;
    let contributions = goal_store::list_contributions(db.pool(), goal_id).await?;
    Ok((GoalProgress::new(goal), totals, contributions))
}

/// Creator or a group admin may edit or delete a goal.
async fn require_manager(db: &Database, user_id: i64, goal_id: i64) -> Result<GroupGoal> {
    let goal = goal_store::get_goal(db.pool(), goal_id).await?;
    let member = groups::require_member(db.pool(), goal.group_id, user_id).await?;
    if goal.created_by != user_id && member.role != Role::Admin {
        return Err(ServiceError::Forbidden);
    }
    Ok(goal)
}

pub async fn update_goal(
    db: &Database,
    user_id: i64,
    goal_id: i64,
    name: &str,
    target_amount: f64,
    deadline: Option<NaiveDate>,
) -> Result<GroupGoal> {
    let target_amount = round2(target_amount);
    validation::validate_name("Nome da meta", name)?;
    validation::validate_amount("Valor da meta", target_amount)?;
    require_manager(db, user_id, goal_id).await?;
    goal_store::update_goal(db.pool(), goal_id, name.trim(), target_amount, deadline).await?;
    Ok(goal_store::get_goal(db.pool(), goal_id).await?)
}

pub async fn delete_goal(db: &Database, user_id: i64, goal_id: i64) -> Result<()> {
    require_manager(db, user_id, goal_id).await?;
    goal_store::delete_goal(db.pool(), goal_id).await?;
    Ok(())
}

/// Add money to a goal.
///
/// The ledger entry and the running total change together. The first
/// contribution that brings the total to the target stamps `completed_at`
/// and notifies the whole group.
pub async fn contribute(
    db: &Database,
    user_id: i64,
    goal_id: i64,
    amount: f64,
    now: NaiveDateTime,
) -> Result<ContributionOutcome> {
    let amount = round2(amount);
    validation::validate_amount("Contribuição", amount)?;

    let mut tx = db.begin().await?;
    let goal = goal_store::get_goal(&mut *tx, goal_id).await?;
    if database::group::get_member(&mut *tx, goal.group_id, user_id).await?.is_none() {
        return Err(ServiceError::Forbidden);
    }

    let contribution = goal_store::insert_contribution(&mut *tx, goal_id, user_id, amount).await?;
    let mut goal = goal_store::increment_current(&mut *tx, goal_id, amount).await?;

    let reached = goal.current_amount >= goal.target_amount
        && goal.completed_at.is_none()
        && goal_store::mark_completed(&mut *tx, goal_id, now).await?;
    if reached {
        goal.completed_at = Some(now);
    }
    tx.commit().await?;

    if reached {
        let message = format!(
            "A meta \"{}\" chegou a {}.",
            goal.name,
            format_brl(goal.current_amount)
        );
        notifications::fan_out(
            db.pool(),
            goal.group_id,
            None,
            NotificationKind::GoalReached,
            "Meta atingida",
            &message,
        )
        .await?;
        info!(goal_id, group_id = goal.group_id, "Goal reached");
    }

    Ok(ContributionOutcome {
        goal,
        contribution,
        reached,
    })
}
