//! Route handlers for the web interface.
//!
//! Pages render a full askama template. Form posts redirect back to their
//! page, or render the page's list fragment when sent by HTMX
//! (`HX-Request: true`). User-correctable failures are shown inline on the
//! re-rendered form instead of an error status.

pub mod accounts;
pub mod auth;
pub mod budgets;
pub mod cards;
pub mod dashboard;
pub mod expenses;
pub mod export;
pub mod goals;
pub mod groups;
pub mod health;
pub mod income;
pub mod notifications;
pub mod recurring;
pub mod settings;
pub mod tax;

use axum::http::HeaderMap;
use axum::middleware;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::error::{is_form_error, user_message, Result};
use crate::session::{require_session, CurrentUser};
use crate::state::AppState;

/// Navigation bar data shared by every logged-in page.
pub struct Nav {
    pub user_name: String,
    pub unread: i64,
}

pub(crate) async fn nav(state: &AppState, user: &CurrentUser) -> Result<Nav> {
    let unread = services::notifications::unread_count(state.db.pool(), user.id()).await?;
    Ok(Nav {
        user_name: user.0.name.clone(),
        unread,
    })
}

/// Whether the request was issued by HTMX.
pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get("HX-Request")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Split a form submission outcome into an inline error message or a hard
/// failure. `Ok(None)` means the operation succeeded.
pub(crate) fn form_outcome<T>(result: services::Result<T>) -> Result<Option<String>> {
    match result {
        Ok(_) => Ok(None),
        Err(err) if is_form_error(&err) => Ok(Some(user_message(&err))),
        Err(err) => Err(err.into()),
    }
}

/// Redirect for a successful plain form post. HTMX requests and failed
/// submissions get `None` and re-render instead.
pub(crate) fn redirect_after(
    error: &Option<String>,
    headers: &HeaderMap,
    to: &str,
) -> Option<Response> {
    if error.is_none() && !is_htmx(headers) {
        Some(Redirect::to(to).into_response())
    } else {
        None
    }
}

/// Build the router with all routes.
pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        // Dashboard
        .route("/", get(dashboard::dashboard_page))
        .route("/logout", post(auth::logout))
        // Accounts
        .route("/accounts", get(accounts::accounts_page).post(accounts::create))
        .route("/accounts/:id/update", post(accounts::update))
        .route("/accounts/:id/delete", post(accounts::delete))
        // Expenses
        .route("/expenses", get(expenses::expenses_page).post(expenses::create))
        .route("/expenses/:id/update", post(expenses::update))
        .route("/expenses/:id/toggle", post(expenses::toggle))
        .route("/expenses/:id/delete", post(expenses::delete))
        .route("/expenses/:id/pay", post(expenses::pay))
        .route("/expenses/:id/unpay", post(expenses::unpay))
        .route("/expenses/:id/splits", get(expenses::splits))
        // Income
        .route("/income", get(income::income_page).post(income::create))
        .route("/income/preview", post(income::preview))
        .route("/income/:id/delete", post(income::delete))
        // Cards
        .route("/cards", get(cards::cards_page).post(cards::create))
        .route("/cards/:id/update", post(cards::update))
        .route("/cards/:id/delete", post(cards::delete))
        .route("/cards/:id/installments", post(cards::add_installment))
        .route("/installments/:id/delete", post(cards::delete_installment))
        // Budgets
        .route("/budgets", get(budgets::budgets_page).post(budgets::create))
        .route("/budgets/:id/delete", post(budgets::delete))
        .route("/budgets/:id/copy", post(budgets::copy_next))
        .route("/budgets/:id/categories", post(budgets::add_category))
        .route("/budget-categories/:id/update", post(budgets::update_category))
        .route("/budget-categories/:id/delete", post(budgets::delete_category))
        // Goals
        .route("/goals", get(goals::goals_page).post(goals::create))
        .route("/goals/:id", get(goals::goal_page))
        .route("/goals/:id/update", post(goals::update))
        .route("/goals/:id/delete", post(goals::delete))
        .route("/goals/:id/contribute", post(goals::contribute))
        // Recurring
        .route("/recurring", get(recurring::recurring_page).post(recurring::create))
        .route("/recurring/process", post(recurring::process))
        .route("/recurring/:id/update", post(recurring::update))
        .route("/recurring/:id/toggle", post(recurring::toggle))
        .route("/recurring/:id/delete", post(recurring::delete))
        // Groups
        .route("/groups", get(groups::groups_page).post(groups::create))
        .route("/groups/join", post(groups::join))
        .route("/groups/:id", get(groups::group_page))
        .route("/groups/:id/rename", post(groups::rename))
        .route("/groups/:id/leave", post(groups::leave))
        .route("/groups/:id/invites", post(groups::create_invite))
        .route("/groups/:id/members/:user_id/promote", post(groups::promote))
        .route("/groups/:id/members/:user_id/remove", post(groups::remove_member))
        .route("/invites/:id/revoke", post(groups::revoke_invite))
        // Notifications
        .route("/notifications", get(notifications::notifications_page))
        .route("/notifications/read-all", post(notifications::read_all))
        .route("/notifications/:id/read", post(notifications::read))
        .route("/notifications/:id/delete", post(notifications::delete))
        // Settings, tax, export
        .route("/settings", get(settings::settings_page).post(settings::update))
        .route("/settings/:key/reset", post(settings::reset))
        .route("/tax", get(tax::tax_page))
        .route("/export", get(export::export))
        .route_layer(middleware::from_fn_with_state(state, require_session));

    Router::new()
        .merge(protected)
        // Public pages
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        // Health check
        .route("/health", get(health::health))
}
