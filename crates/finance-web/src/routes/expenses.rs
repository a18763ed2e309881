//! Expense routes: CRUD, monthly payments and split expenses.

use askama::Template;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Form;
use database::{Account, Expense, ExpenseKind, ExpenseSplit, FamilyGroup, NewExpense};
use finance_core::Period;
use serde::Deserialize;
use services::expenses::{self, MonthlyOverview};
use services::{accounts, groups};

use crate::error::Result;
use crate::filters;
use crate::forms;
use crate::routes::{form_outcome, is_htmx, nav, redirect_after, Nav};
use crate::session::CurrentUser;
use crate::state::AppState;

pub struct ExpensesView {
    pub overview: MonthlyOverview,
    pub expenses: Vec<Expense>,
    pub categories: Vec<(String, f64)>,
    pub share_total: f64,
    pub accounts: Vec<Account>,
    pub groups: Vec<FamilyGroup>,
}

impl ExpensesView {
    /// Query string selecting the displayed month.
    pub fn period_query(&self) -> String {
        format!("month={}&year={}", self.overview.period.month, self.overview.period.year)
    }
}

#[derive(Template)]
#[template(path = "expenses.html")]
pub struct ExpensesPage {
    pub nav: Nav,
    pub view: ExpensesView,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "partials/expenses_list.html")]
pub struct ExpensesList {
    pub view: ExpensesView,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "partials/expense_splits.html")]
pub struct SplitsFragment {
    pub expense_id: i64,
    pub splits: Vec<ExpenseSplit>,
}

/// `?month=&year=` selector.
#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    pub month: Option<u32>,
    pub year: Option<i32>,
}

#[derive(Deserialize)]
pub struct ExpenseForm {
    pub description: String,
    pub amount: String,
    pub category: String,
    pub kind: ExpenseKind,
    pub due_day: Option<String>,
    pub account_id: Option<String>,
    pub group_id: Option<String>,
    /// `user_id:percent` pairs; non-empty turns the expense into a split.
    pub shares: Option<String>,
}

#[derive(Deserialize)]
pub struct PayForm {
    pub month: u32,
    pub year: i32,
    pub amount: Option<String>,
}

fn parse_expense(user_id: i64, form: &ExpenseForm) -> services::Result<NewExpense> {
    Ok(NewExpense {
        owner_id: user_id,
        account_id: forms::optional_id("Conta", form.account_id.as_deref())?,
        group_id: forms::optional_id("Grupo", form.group_id.as_deref())?,
        description: form.description.clone(),
        amount: forms::amount("Valor", &form.amount)?,
        category: form.category.clone(),
        kind: form.kind,
        due_day: forms::optional_id("Dia de vencimento", form.due_day.as_deref())?,
    })
}

async fn render(
    state: &AppState,
    user: &CurrentUser,
    headers: &HeaderMap,
    period: Period,
    error: Option<String>,
) -> Result<Response> {
    let view = ExpensesView {
        overview: expenses::monthly_overview(&state.db, user.id(), period).await?,
        expenses: expenses::list(&state.db, user.id()).await?,
        categories: expenses::category_totals(&state.db, user.id(), period).await?,
        share_total: expenses::user_share_total(&state.db, user.id()).await?,
        accounts: accounts::list_accessible(&state.db, user.id()).await?,
        groups: groups::list_groups(&state.db, user.id()).await?,
    };

    if is_htmx(headers) {
        Ok(ExpensesList { view, error }.into_response())
    } else {
        Ok(ExpensesPage {
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
    let target = format!("/expenses?month={}&year={}", period.month, period.year);
    if let Some(redirect) = redirect_after(&error, headers, &target) {
        return Ok(redirect);
    }
    render(state, user, headers, period, error).await
}

pub async fn expenses_page(
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
    Form(form): Form<ExpenseForm>,
) -> Result<Response> {
    let period = forms::period(query.month, query.year, state.today())?;
    let outcome = async {
        let new = parse_expense(user.id(), &form)?;
        let shares = form.shares.as_deref().unwrap_or("").trim();
        if shares.is_empty() {
            expenses::create_expense(&state.db, user.id(), new).await
        } else {
            let participants = forms::shares(shares)?;
            let (expense, _) =
                expenses::create_split_expense(&state.db, user.id(), new, &participants).await?;
            Ok(expense)
        }
    }
    .await;

    let error = form_outcome(outcome)?;
    finish(&state, &user, &headers, period, error).await
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(query): Query<PeriodQuery>,
    Form(form): Form<ExpenseForm>,
) -> Result<Response> {
    let period = forms::period(query.month, query.year, state.today())?;
    let outcome = async {
        let new = parse_expense(user.id(), &form)?;
        expenses::update_expense(&state.db, &state.settings, user.id(), id, new).await
    }
    .await;

    let error = form_outcome(outcome)?;
    finish(&state, &user, &headers, period, error).await
}

pub async fn toggle(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(query): Query<PeriodQuery>,
) -> Result<Response> {
    let period = forms::period(query.month, query.year, state.today())?;
    expenses::toggle_active(&state.db, user.id(), id).await?;
    finish(&state, &user, &headers, period, None).await
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(query): Query<PeriodQuery>,
) -> Result<Response> {
    let period = forms::period(query.month, query.year, state.today())?;
    expenses::delete_expense(&state.db, &state.settings, user.id(), id).await?;
    finish(&state, &user, &headers, period, None).await
}

/// Record the payment of an expense for a month.
pub async fn pay(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Form(form): Form<PayForm>,
) -> Result<Response> {
    let period = Period::new(form.year, form.month).map_err(services::ServiceError::from)?;
    let outcome = async {
        let amount = forms::optional_amount("Valor pago", form.amount.as_deref())?;
        expenses::pay(&state.db, &state.settings, user.id(), id, period, amount).await
    }
    .await;

    let error = form_outcome(outcome)?;
    finish(&state, &user, &headers, period, error).await
}

pub async fn unpay(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Form(form): Form<PayForm>,
) -> Result<Response> {
    let period = Period::new(form.year, form.month).map_err(services::ServiceError::from)?;
    expenses::unpay(&state.db, &state.settings, user.id(), id, period).await?;
    finish(&state, &user, &headers, period, None).await
}

/// Split shares of an expense as a fragment.
pub async fn splits(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<SplitsFragment> {
    let splits = expenses::list_splits(&state.db, user.id(), id).await?;
    Ok(SplitsFragment { expense_id: id, splits })
}
