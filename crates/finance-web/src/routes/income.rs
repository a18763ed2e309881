//! Income routes: recording with tax projection and the HTMX preview.

use askama::Template;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Form;
use chrono::Datelike;
use database::income::MonthlyIncomeTotals;
use database::{Account, Income};
use finance_core::tax::TaxCalculation;
use serde::Deserialize;
use services::accounts;
use services::income::{self, IncomeInput, IncomePreview};

use crate::error::Result;
use crate::filters;
use crate::forms;
use crate::routes::{form_outcome, is_htmx, nav, redirect_after, Nav};
use crate::session::CurrentUser;
use crate::state::AppState;

pub struct IncomeView {
    pub year: i32,
    pub incomes: Vec<Income>,
    pub months: Vec<MonthlyIncomeTotals>,
    pub accounts: Vec<Account>,
    /// Projection of the income just recorded.
    pub last: Option<TaxCalculation>,
}

#[derive(Template)]
#[template(path = "income.html")]
pub struct IncomePage {
    pub nav: Nav,
    pub view: IncomeView,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "partials/income_list.html")]
pub struct IncomeList {
    pub view: IncomeView,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "partials/income_preview.html")]
pub struct PreviewFragment {
    pub preview: Option<IncomePreview>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct YearQuery {
    pub year: Option<i32>,
}

#[derive(Deserialize)]
pub struct IncomeForm {
    pub description: String,
    pub amount_usd: String,
    pub exchange_rate: String,
    pub received_on: String,
    pub account_id: Option<String>,
}

impl IncomeForm {
    fn parse(&self) -> services::Result<IncomeInput> {
        Ok(IncomeInput {
            description: self.description.clone(),
            amount_usd: forms::amount("Valor em USD", &self.amount_usd)?,
            exchange_rate: forms::amount("Cotação", &self.exchange_rate)?,
            received_on: forms::date("Data de recebimento", &self.received_on)?,
            account_id: forms::optional_id("Conta", self.account_id.as_deref())?,
        })
    }
}

async fn render(
    state: &AppState,
    user: &CurrentUser,
    headers: &HeaderMap,
    year: i32,
    last: Option<TaxCalculation>,
    error: Option<String>,
) -> Result<Response> {
    let view = IncomeView {
        year,
        incomes: income::list_year(&state.db, user.id(), year).await?,
        months: income::monthly_totals(&state.db, user.id(), year).await?,
        accounts: accounts::list_accessible(&state.db, user.id()).await?,
        last,
    };

    if is_htmx(headers) {
        Ok(IncomeList { view, error }.into_response())
    } else {
        Ok(IncomePage {
            nav: nav(state, user).await?,
            view,
            error,
        }
        .into_response())
    }
}

pub async fn income_page(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Query(query): Query<YearQuery>,
) -> Result<Response> {
    let year = forms::year(query.year, state.today())?;
    render(&state, &user, &headers, year, None, None).await
}

/// Record an income. The page is re-rendered with the tax projection so any
/// bracket warning is visible right away.
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Form(form): Form<IncomeForm>,
) -> Result<Response> {
    let outcome = async {
        let input = form.parse()?;
        income::record_income(&state.db, &state.settings, user.id(), &input).await
    }
    .await;

    let year = forms::date("Data de recebimento", &form.received_on)
        .ok()
        .and_then(|date| forms::year(Some(date.year()), state.today()).ok())
        .unwrap_or_else(|| state.today().year());

    match outcome {
        Ok((_, calculation)) => {
            render(&state, &user, &headers, year, Some(calculation), None).await
        }
        Err(err) => {
            let error = form_outcome::<()>(Err(err))?;
            render(&state, &user, &headers, year, None, error).await
        }
    }
}

/// Conversion and tax projection without saving.
pub async fn preview(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<IncomeForm>,
) -> Result<PreviewFragment> {
    let outcome = async {
        let input = form.parse()?;
        income::preview_income(&state.db, &state.settings, user.id(), &input).await
    }
    .await;

    match outcome {
        Ok(preview) => Ok(PreviewFragment {
            preview: Some(preview),
            error: None,
        }),
        Err(err) => Ok(PreviewFragment {
            preview: None,
            error: form_outcome::<()>(Err(err))?,
        }),
    }
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(query): Query<YearQuery>,
) -> Result<Response> {
    income::delete_income(&state.db, user.id(), id).await?;
    let year = forms::year(query.year, state.today())?;
    if let Some(redirect) = redirect_after(&None, &headers, &format!("/income?year={year}")) {
        return Ok(redirect);
    }
    render(&state, &user, &headers, year, None, None).await
}
