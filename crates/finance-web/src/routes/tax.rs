//! Tax report page.

use askama::Template;
use axum::extract::{Query, State};
use finance_core::tax::{Bracket, BRACKETS};
use services::reports::{self, TaxReportRow};

use crate::error::Result;
use crate::filters;
use crate::forms;
use crate::routes::income::YearQuery;
use crate::routes::{nav, Nav};
use crate::session::CurrentUser;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "tax.html")]
pub struct TaxPage {
    pub nav: Nav,
    pub year: i32,
    pub rows: Vec<TaxReportRow>,
    pub total_gross: f64,
    pub total_tax: f64,
    pub brackets: Vec<Bracket>,
}

pub async fn tax_page(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<YearQuery>,
) -> Result<TaxPage> {
    let year = forms::year(query.year, state.today())?;
    let rows = reports::tax_report(&state.db, &state.settings, user.id(), year).await?;
    let total_gross = finance_core::money::round2(rows.iter().map(|r| r.gross).sum());
    let total_tax = finance_core::money::round2(rows.iter().map(|r| r.tax).sum());

    Ok(TaxPage {
        nav: nav(&state, &user).await?,
        year,
        rows,
        total_gross,
        total_tax,
        brackets: BRACKETS.to_vec(),
    })
}
