//! Financial settings routes.

use askama::Template;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Form;
use serde::Deserialize;
use services::FinancialSettings;
use tracing::info;

use crate::error::Result;
use crate::filters;
use crate::routes::{form_outcome, nav, redirect_after, Nav};
use crate::session::CurrentUser;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "settings.html")]
pub struct SettingsPage {
    pub nav: Nav,
    pub settings: FinancialSettings,
    pub inss: f64,
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct SettingForm {
    pub key: String,
    pub value: String,
}

async fn render(state: &AppState, user: &CurrentUser, error: Option<String>) -> Result<Response> {
    let settings = state.settings.snapshot().await?;
    Ok(SettingsPage {
        nav: nav(state, user).await?,
        inss: finance_core::tax::inss(&settings.inss_config()),
        settings,
        error,
    }
    .into_response())
}

pub async fn settings_page(State(state): State<AppState>, user: CurrentUser) -> Result<Response> {
    render(&state, &user, None).await
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Form(form): Form<SettingForm>,
) -> Result<Response> {
    let outcome = state.settings.update(&form.key, &form.value).await;
    if outcome.is_ok() {
        info!(user_id = user.id(), key = %form.key, "Setting updated");
    }
    let error = form_outcome(outcome)?;
    if let Some(redirect) = redirect_after(&error, &headers, "/settings") {
        return Ok(redirect);
    }
    render(&state, &user, error).await
}

/// Restore a setting to its default.
pub async fn reset(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> Result<Response> {
    let error = form_outcome(state.settings.reset(&key).await)?;
    if let Some(redirect) = redirect_after(&error, &headers, "/settings") {
        return Ok(redirect);
    }
    render(&state, &user, error).await
}
