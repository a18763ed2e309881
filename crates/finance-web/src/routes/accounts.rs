//! Account routes.

use askama::Template;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Form;
use database::{Account, AccountKind, FamilyGroup};
use serde::Deserialize;
use services::{accounts, groups};

use crate::error::Result;
use crate::filters;
use crate::forms;
use crate::routes::{form_outcome, is_htmx, nav, redirect_after, Nav};
use crate::session::CurrentUser;
use crate::state::AppState;

pub struct AccountsView {
    pub user_id: i64,
    pub accounts: Vec<Account>,
    pub groups: Vec<FamilyGroup>,
}

#[derive(Template)]
#[template(path = "accounts.html")]
pub struct AccountsPage {
    pub nav: Nav,
    pub view: AccountsView,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "partials/accounts_list.html")]
pub struct AccountsList {
    pub view: AccountsView,
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct AccountForm {
    pub name: String,
    pub kind: AccountKind,
    pub group_id: Option<String>,
    pub initial_balance: String,
}

#[derive(Deserialize)]
pub struct AccountUpdateForm {
    pub name: String,
    pub initial_balance: String,
}

async fn render(
    state: &AppState,
    user: &CurrentUser,
    headers: &HeaderMap,
    error: Option<String>,
) -> Result<Response> {
    let view = AccountsView {
        user_id: user.id(),
        accounts: accounts::list_accessible(&state.db, user.id()).await?,
        groups: groups::list_groups(&state.db, user.id()).await?,
    };

    if is_htmx(headers) {
        Ok(AccountsList { view, error }.into_response())
    } else {
        Ok(AccountsPage {
            nav: nav(state, user).await?,
            view,
            error,
        }
        .into_response())
    }
}

pub async fn accounts_page(
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
    Form(form): Form<AccountForm>,
) -> Result<Response> {
    let outcome = async {
        let balance = forms::amount("Saldo inicial", &form.initial_balance)?;
        let group_id = forms::optional_id("Grupo", form.group_id.as_deref())?;
        let name = &form.name;
        accounts::create_account(&state.db, user.id(), name, form.kind, group_id, balance).await
    }
    .await;

    let error = form_outcome(outcome)?;
    if let Some(redirect) = redirect_after(&error, &headers, "/accounts") {
        return Ok(redirect);
    }
    render(&state, &user, &headers, error).await
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Form(form): Form<AccountUpdateForm>,
) -> Result<Response> {
    let outcome = async {
        let balance = forms::amount("Saldo inicial", &form.initial_balance)?;
        accounts::update_account(&state.db, user.id(), id, &form.name, balance).await
    }
    .await;

    let error = form_outcome(outcome)?;
    if let Some(redirect) = redirect_after(&error, &headers, "/accounts") {
        return Ok(redirect);
    }
    render(&state, &user, &headers, error).await
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response> {
    accounts::delete_account(&state.db, user.id(), id).await?;
    if let Some(redirect) = redirect_after(&None, &headers, "/accounts") {
        return Ok(redirect);
    }
    render(&state, &user, &headers, None).await
}
