//! Budget routes.

use askama::Template;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Form;
use finance_core::Period;
use serde::Deserialize;
use services::budget::{self, BudgetOverview};

use crate::error::Result;
use crate::filters;
use crate::forms;
use crate::routes::expenses::PeriodQuery;
use crate::routes::{form_outcome, is_htmx, nav, redirect_after, Nav};
use crate::session::CurrentUser;
use crate::state::AppState;

pub struct BudgetsView {
    pub period: Period,
    pub budgets: Vec<BudgetOverview>,
}

impl BudgetsView {
    pub fn period_query(&self) -> String {
        format!("month={}&year={}", self.period.month, self.period.year)
    }

    pub fn prev_query(&self) -> String {
        let prev = self.period.prev();
        format!("month={}&year={}", prev.month, prev.year)
    }

    pub fn next_query(&self) -> String {
        let next = self.period.next();
        format!("month={}&year={}", next.month, next.year)
    }
}

#[derive(Template)]
#[template(path = "budgets.html")]
pub struct BudgetsPage {
    pub nav: Nav,
    pub view: BudgetsView,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "partials/budgets_list.html")]
pub struct BudgetsList {
    pub view: BudgetsView,
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct BudgetForm {
    pub name: String,
}

#[derive(Deserialize)]
pub struct CategoryForm {
    pub category: String,
    pub limit: String,
}

#[derive(Deserialize)]
pub struct LimitForm {
    pub limit: String,
}

async fn render(
    state: &AppState,
    user: &CurrentUser,
    headers: &HeaderMap,
    period: Period,
    error: Option<String>,
) -> Result<Response> {
    let view = BudgetsView {
        period,
        budgets: budget::list_for_period(&state.db, user.id(), period).await?,
    };

    if is_htmx(headers) {
        Ok(BudgetsList { view, error }.into_response())
    } else {
        Ok(BudgetsPage {
            nav: nav(state, user).await?,
            view,
            error,
        }
        .into_response())
    }
}

async fn finish(
    state: &AppState,
    user: &CurrentUser,
    headers: &HeaderMap,
    period: Period,
    error: Option<String>,
) -> Result<Response> {
    let target = format!("/budgets?month={}&year={}", period.month, period.year);
    if let Some(redirect) = redirect_after(&error, headers, &target) {
        return Ok(redirect);
    }
    render(state, user, headers, period, error).await
}

pub async fn budgets_page(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Query(query): Query<PeriodQuery>,
) -> Result<Response> {
    let period = forms::period(query.month, query.year, state.today())?;
    render(&state, &user, &headers, period, None).await
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Query(query): Query<PeriodQuery>,
    Form(form): Form<BudgetForm>,
) -> Result<Response> {
    let period = forms::period(query.month, query.year, state.today())?;
    let created = budget::create_budget(&state.db, user.id(), &form.name, period).await;
    let error = form_outcome(created)?;
    finish(&state, &user, &headers, period, error).await
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(query): Query<PeriodQuery>,
) -> Result<Response> {
    let period = forms::period(query.month, query.year, state.today())?;
    budget::delete_budget(&state.db, user.id(), id).await?;
    finish(&state, &user, &headers, period, None).await
}

/// Copy a budget into the following month and show that month.
pub async fn copy_next(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(query): Query<PeriodQuery>,
) -> Result<Response> {
    let period = forms::period(query.month, query.year, state.today())?;
    match budget::copy_to_next_period(&state.db, &state.settings, user.id(), id).await {
        Ok(copy) => {
            let next = Period::new(copy.year as i32, copy.month as u32)
                .map_err(services::ServiceError::from)?;
            finish(&state, &user, &headers, next, None).await
        }
        Err(err) => {
            let error = form_outcome::<()>(Err(err))?;
            finish(&state, &user, &headers, period, error).await
        }
    }
}

pub async fn add_category(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(budget_id): Path<i64>,
    Query(query): Query<PeriodQuery>,
    Form(form): Form<CategoryForm>,
) -> Result<Response> {
    let period = forms::period(query.month, query.year, state.today())?;
    let outcome = async {
        let limit = forms::amount("Limite", &form.limit)?;
        let category = &form.category;
        budget::add_category(&state.db, &state.settings, user.id(), budget_id, category, limit)
            .await
    }
    .await;
    let error = form_outcome(outcome)?;
    finish(&state, &user, &headers, period, error).await
}

pub async fn update_category(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(query): Query<PeriodQuery>,
    Form(form): Form<LimitForm>,
) -> Result<Response> {
    let period = forms::period(query.month, query.year, state.today())?;
    let outcome = async {
        let limit = forms::amount("Limite", &form.limit)?;
        budget::update_category_limit(&state.db, &state.settings, user.id(), id, limit).await
    }
    .await;
    let error = form_outcome(outcome)?;
    finish(&state, &user, &headers, period, error).await
}

pub async fn delete_category(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(query): Query<PeriodQuery>,
) -> Result<Response> {
    let period = forms::period(query.month, query.year, state.today())?;
    budget::remove_category(&state.db, user.id(), id).await?;
    finish(&state, &user, &headers, period, None).await
}
