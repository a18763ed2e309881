//! Dashboard route.

use askama::Template;
use axum::extract::State;
use chrono::NaiveDate;
use database::Notification;
use finance_core::money::round2;
use finance_core::Period;
use services::budget::BudgetOverview;
use services::goals::GoalProgress;
use services::{cards, expenses, goals, income, notifications, recurring};
use tracing::{info, warn};

use crate::error::Result;
use crate::filters;
use crate::routes::{nav, Nav};
use crate::session::CurrentUser;
use crate::state::AppState;

/// Dashboard page template.
#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub nav: Nav,
    pub stats: Stats,
}

/// Figures for the current month.
pub struct Stats {
    pub period: Period,
    pub income_net: f64,
    pub tax: f64,
    pub expenses_total: f64,
    pub expenses_paid: f64,
    pub expenses_pending: f64,
    pub card_commitment: f64,
    pub balance: f64,
    pub recurring_processed: usize,
    pub budgets: Vec<BudgetOverview>,
    pub goals: Vec<GoalProgress>,
    pub recent: Vec<Notification>,
}

/// Render the dashboard page.
///
/// Due recurring transactions are materialized and finished installment
/// plans announced before the figures are read.
pub async fn dashboard_page(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<DashboardTemplate> {
    let today = state.today();
    let recurring_processed =
        recurring::process_due(&state.db, &state.settings, user.id(), today).await?;
    if recurring_processed > 0 {
        info!(
            user_id = user.id(),
            count = recurring_processed,
            "Recurring transactions materialized"
        );
    }
    if let Err(err) = cards::notify_finished(&state.db, user.id(), today).await {
        warn!(user_id = user.id(), error = %err, "Could not announce finished installments");
    }

    let stats = get_stats(&state, &user, today, recurring_processed).await?;
    Ok(DashboardTemplate {
        nav: nav(&state, &user).await?,
        stats,
    })
}

async fn get_stats(
    state: &AppState,
    user: &CurrentUser,
    today: NaiveDate,
    recurring_processed: usize,
) -> Result<Stats> {
    let period = Period::of(today);
    let overview = expenses::monthly_overview(&state.db, user.id(), period).await?;
    let incomes = income::monthly_totals(&state.db, user.id(), period.year).await?;
    let month = incomes.iter().find(|row| row.month == period.month as i64);
    let income_net = month.map(|row| row.net).unwrap_or(0.0);
    let tax = month.map(|row| row.tax).unwrap_or(0.0);
    let card_commitment = cards::monthly_commitment(&state.db, user.id(), today).await?;

    let budgets = services::budget::list_for_period(&state.db, user.id(), period).await?;
    let goals = goals::list_for_user(&state.db, user.id()).await?;
    let recent = notifications::list(state.db.pool(), user.id())
        .await?
        .into_iter()
        .take(5)
        .collect();

    Ok(Stats {
        period,
        income_net,
        tax,
        expenses_total: overview.total,
        expenses_paid: overview.paid,
        expenses_pending: overview.pending,
        card_commitment,
        balance: round2(income_net - overview.total - card_commitment),
        recurring_processed,
        budgets,
        goals,
        recent,
    })
}
