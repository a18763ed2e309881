//! Recurring transaction routes.

use askama::Template;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Form;
use database::{RecurringTransaction, TransactionKind};
use finance_core::recurrence::Frequency;
use serde::Deserialize;
use services::recurring::{self, RecurringInput};
use tracing::info;

use crate::error::Result;
use crate::filters;
use crate::forms;
use crate::routes::{form_outcome, is_htmx, nav, redirect_after, Nav};
use crate::session::CurrentUser;
use crate::state::AppState;

pub struct RecurringRow {
    pub item: RecurringTransaction,
    pub frequency_label: &'static str,
}

pub struct RecurringView {
    pub items: Vec<RecurringRow>,
    /// Occurrences created by the last "process" action.
    pub processed: Option<usize>,
}

#[derive(Template)]
#[template(path = "recurring.html")]
pub struct RecurringPage {
    pub nav: Nav,
    pub view: RecurringView,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "partials/recurring_list.html")]
pub struct RecurringList {
    pub view: RecurringView,
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct RecurringForm {
    pub kind: TransactionKind,
    pub description: String,
    pub amount: String,
    pub category: String,
    pub frequency: String,
    pub start_date: String,
}

impl RecurringForm {
    fn parse(&self) -> services::Result<RecurringInput> {
        Ok(RecurringInput {
            kind: self.kind,
            description: self.description.clone(),
            amount: forms::amount("Valor", &self.amount)?,
            category: self.category.clone(),
            frequency: self.frequency.parse::<Frequency>()?,
            start_date: forms::date("Início", &self.start_date)?,
        })
    }
}

async fn render(
    state: &AppState,
    user: &CurrentUser,
    headers: &HeaderMap,
    processed: Option<usize>,
    error: Option<String>,
) -> Result<Response> {
    let items = recurring::list(&state.db, user.id())
        .await?
        .into_iter()
        .map(|item| RecurringRow {
            frequency_label: item.frequency.parse::<Frequency>().map(|f| f.label()).unwrap_or("?"),
            item,
        })
        .collect();
    let view = RecurringView { items, processed };

    if is_htmx(headers) {
        Ok(RecurringList { view, error }.into_response())
    } else {
        Ok(RecurringPage {
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
    error: Option<String>,
) -> Result<Response> {
    if let Some(redirect) = redirect_after(&error, headers, "/recurring") {
        return Ok(redirect);
    }
    render(state, user, headers, None, error).await
}

pub async fn recurring_page(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
) -> Result<Response> {
    render(&state, &user, &headers, None, None).await
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Form(form): Form<RecurringForm>,
) -> Result<Response> {
    let outcome = async {
        let input = form.parse()?;
        recurring::create(&state.db, user.id(), &input).await
    }
    .await;
    let error = form_outcome(outcome)?;
    finish(&state, &user, &headers, error).await
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Form(form): Form<RecurringForm>,
) -> Result<Response> {
    let outcome = async {
        let input = form.parse()?;
        recurring::update(&state.db, user.id(), id, &input).await
    }
    .await;
    let error = form_outcome(outcome)?;
    finish(&state, &user, &headers, error).await
}

pub async fn toggle(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response> {
    recurring::toggle_active(&state.db, user.id(), id).await?;
    finish(&state, &user, &headers, None).await
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response> {
    recurring::delete(&state.db, user.id(), id).await?;
    finish(&state, &user, &headers, None).await
}

/// Materialize due occurrences now and show how many were created.
pub async fn process(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
) -> Result<Response> {
    let count = recurring::process_due(&state.db, &state.settings, user.id(), state.today()).await?;
    info!(user_id = user.id(), count, "Recurring transactions processed on request");
    render(&state, &user, &headers, Some(count), None).await
}
