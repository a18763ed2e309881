//! Credit card and installment routes.

use askama::Template;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Form;
use finance_core::money::round2;
use serde::Deserialize;
use services::cards::{self, CardSummary};

use crate::error::Result;
use crate::filters;
use crate::forms;
use crate::routes::{form_outcome, is_htmx, nav, redirect_after, Nav};
use crate::session::CurrentUser;
use crate::state::AppState;

pub struct CardsView {
    pub cards: Vec<CardSummary>,
    pub total_commitment: f64,
}

#[derive(Template)]
#[template(path = "cards.html")]
pub struct CardsPage {
    pub nav: Nav,
    pub view: CardsView,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "partials/cards_list.html")]
pub struct CardsList {
    pub view: CardsView,
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct CardForm {
    pub name: String,
    pub credit_limit: String,
    pub closing_day: String,
    pub due_day: String,
}

#[derive(Deserialize)]
pub struct InstallmentForm {
    pub description: String,
    pub total_amount: String,
    pub count: String,
    pub start_date: String,
}

impl CardForm {
    fn parse(&self) -> services::Result<(f64, i64, i64)> {
        Ok((
            forms::amount("Limite", &self.credit_limit)?,
            forms::integer("Dia de fechamento", &self.closing_day)?,
            forms::integer("Dia de vencimento", &self.due_day)?,
        ))
    }
}

async fn render(
    state: &AppState,
    user: &CurrentUser,
    headers: &HeaderMap,
    error: Option<String>,
) -> Result<Response> {
    let cards = cards::card_summaries(&state.db, user.id(), state.today()).await?;
    let total_commitment = round2(cards.iter().map(|c| c.monthly_commitment).sum());
    let view = CardsView {
        cards,
        total_commitment,
    };

    if is_htmx(headers) {
        Ok(CardsList { view, error }.into_response())
    } else {
        Ok(CardsPage {
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
    if let Some(redirect) = redirect_after(&error, headers, "/cards") {
        return Ok(redirect);
    }
    render(state, user, headers, error).await
}

pub async fn cards_page(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
) -> Result<Response> {
    render(&state, &user, &headers, None).await
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Form(form): Form<CardForm>,
) -> Result<Response> {
    let outcome = async {
        let (limit, closing, due) = form.parse()?;
        cards::create_card(&state.db, user.id(), &form.name, limit, closing, due).await
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
    Form(form): Form<CardForm>,
) -> Result<Response> {
    let outcome = async {
        let (limit, closing, due) = form.parse()?;
        cards::update_card(&state.db, user.id(), id, &form.name, limit, closing, due).await
    }
    .await;
    let error = form_outcome(outcome)?;
    finish(&state, &user, &headers, error).await
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response> {
    cards::delete_card(&state.db, user.id(), id).await?;
    finish(&state, &user, &headers, None).await
}

pub async fn add_installment(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(card_id): Path<i64>,
    Form(form): Form<InstallmentForm>,
) -> Result<Response> {
    let outcome = async {
        let total = forms::amount("Valor total", &form.total_amount)?;
        let count = forms::integer("Parcelas", &form.count)?;
        let count = u32::try_from(count).map_err(|_| {
            services::ServiceError::invalid("O número de parcelas deve ser pelo menos 1")
        })?;
        let start = forms::date("Primeira parcela", &form.start_date)?;
        let description = &form.description;
        cards::add_installment(&state.db, user.id(), card_id, description, total, count, start)
            .await
    }
    .await;
    let error = form_outcome(outcome)?;
    finish(&state, &user, &headers, error).await
}

pub async fn delete_installment(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response> {
    cards::delete_installment(&state.db, user.id(), id).await?;
    finish(&state, &user, &headers, None).await
}
