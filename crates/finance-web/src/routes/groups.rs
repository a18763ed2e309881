//! Family group, membership and invite routes.

use askama::Template;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use database::{FamilyGroup, Role};
use serde::Deserialize;
use services::groups::{self, GroupDetail};
use services::ServiceError;

use crate::error::Result;
use crate::forms;
use crate::routes::{form_outcome, is_htmx, nav, redirect_after, Nav};
use crate::session::CurrentUser;
use crate::state::AppState;

pub struct GroupsView {
    pub groups: Vec<FamilyGroup>,
}

#[derive(Template)]
#[template(path = "groups.html")]
pub struct GroupsPage {
    pub nav: Nav,
    pub view: GroupsView,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "partials/groups_list.html")]
pub struct GroupsList {
    pub view: GroupsView,
    pub error: Option<String>,
}

pub struct GroupView {
    pub user_id: i64,
    pub detail: GroupDetail,
}

impl GroupView {
    pub fn is_admin(&self) -> bool {
        self.detail.role == Role::Admin
    }
}

#[derive(Template)]
#[template(path = "group_detail.html")]
pub struct GroupPage {
    pub nav: Nav,
    pub view: GroupView,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "partials/group_members.html")]
pub struct GroupFragment {
    pub view: GroupView,
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GroupsQuery {
    /// Why an invite used at registration could not be redeemed.
    pub convite: Option<String>,
}

#[derive(Deserialize)]
pub struct NameForm {
    pub name: String,
}

#[derive(Deserialize)]
pub struct JoinForm {
    pub code: String,
}

#[derive(Deserialize)]
pub struct InviteForm {
    pub max_uses: Option<String>,
}

/// Short query-string token for an invite failure.
pub fn invite_failure_slug(err: &ServiceError) -> &'static str {
    match err {
        ServiceError::InviteExpired => "expirado",
        ServiceError::InviteExhausted => "esgotado",
        ServiceError::AlreadyMember => "membro",
        _ => "invalido",
    }
}

fn invite_failure_message(slug: &str) -> String {
    let err = match slug {
        "expirado" => ServiceError::InviteExpired,
        "esgotado" => ServiceError::InviteExhausted,
        "membro" => ServiceError::AlreadyMember,
        _ => ServiceError::InviteNotFound,
    };
    format!("Sua conta foi criada, mas o convite não pôde ser usado: {err}")
}

async fn render_list(
    state: &AppState,
    user: &CurrentUser,
    headers: &HeaderMap,
    error: Option<String>,
) -> Result<Response> {
    let view = GroupsView {
        groups: groups::list_groups(&state.db, user.id()).await?,
    };

    if is_htmx(headers) {
        Ok(GroupsList { view, error }.into_response())
    } else {
        Ok(GroupsPage {
            nav: nav(state, user).await?,
            view,
            error,
        }
        .into_response())
    }
}

async fn render_group(
    state: &AppState,
    user: &CurrentUser,
    headers: &HeaderMap,
    group_id: i64,
    error: Option<String>,
) -> Result<Response> {
    let view = GroupView {
        user_id: user.id(),
        detail: groups::group_detail(&state.db, user.id(), group_id, state.now()).await?,
    };

    if is_htmx(headers) {
        Ok(GroupFragment { view, error }.into_response())
    } else {
        Ok(GroupPage {
            nav: nav(state, user).await?,
            view,
            error,
        }
        .into_response())
    }
}

async fn finish_group(
    state: &AppState,
    user: &CurrentUser,
    headers: &HeaderMap,
    group_id: i64,
    error: Option<String>,
) -> Result<Response> {
    if let Some(redirect) = redirect_after(&error, headers, &format!("/groups/{group_id}")) {
        return Ok(redirect);
    }
    render_group(state, user, headers, group_id, error).await
}

pub async fn groups_page(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Query(query): Query<GroupsQuery>,
) -> Result<Response> {
    let error = query.convite.as_deref().map(invite_failure_message);
    render_list(&state, &user, &headers, error).await
}

pub async fn group_page(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response> {
    render_group(&state, &user, &headers, id, None).await
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Form(form): Form<NameForm>,
) -> Result<Response> {
    match groups::create_group(&state.db, user.id(), &form.name).await {
        Ok(group) if !is_htmx(&headers) => {
            Ok(Redirect::to(&format!("/groups/{}", group.id)).into_response())
        }
        Ok(_) => render_list(&state, &user, &headers, None).await,
        Err(err) => {
            let error = form_outcome::<()>(Err(err))?;
            render_list(&state, &user, &headers, error).await
        }
    }
}

/// Redeem an invite code.
pub async fn join(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Form(form): Form<JoinForm>,
) -> Result<Response> {
    match groups::redeem(&state.db, &form.code, user.id(), state.now()).await {
        Ok(group) if !is_htmx(&headers) => {
            Ok(Redirect::to(&format!("/groups/{}", group.id)).into_response())
        }
        Ok(_) => render_list(&state, &user, &headers, None).await,
        Err(err) => {
            let error = form_outcome::<()>(Err(err))?;
            render_list(&state, &user, &headers, error).await
        }
    }
}

pub async fn rename(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Form(form): Form<NameForm>,
) -> Result<Response> {
    let error = form_outcome(groups::rename_group(&state.db, user.id(), id, &form.name).await)?;
    finish_group(&state, &user, &headers, id, error).await
}

pub async fn leave(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response> {
    match groups::leave_group(&state.db, user.id(), id).await {
        Ok(()) if !is_htmx(&headers) => Ok(Redirect::to("/groups").into_response()),
        Ok(()) => render_list(&state, &user, &headers, None).await,
        Err(err) => {
            let error = form_outcome::<()>(Err(err))?;
            render_group(&state, &user, &headers, id, error).await
        }
    }
}

pub async fn create_invite(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Form(form): Form<InviteForm>,
) -> Result<Response> {
    let outcome = async {
        let max_uses = forms::optional_id("Usos", form.max_uses.as_deref())?;
        groups::create_invite(&state.db, user.id(), id, state.now(), max_uses).await
    }
    .await;
    let error = form_outcome(outcome)?;
    finish_group(&state, &user, &headers, id, error).await
}

pub async fn revoke_invite(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(invite_id): Path<i64>,
) -> Result<Response> {
    let group_id = groups::revoke_invite(&state.db, user.id(), invite_id).await?;
    finish_group(&state, &user, &headers, group_id, None).await
}

pub async fn promote(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path((group_id, member_id)): Path<(i64, i64)>,
) -> Result<Response> {
    groups::promote(&state.db, user.id(), group_id, member_id).await?;
    finish_group(&state, &user, &headers, group_id, None).await
}

pub async fn remove_member(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path((group_id, member_id)): Path<(i64, i64)>,
) -> Result<Response> {
    let removed = groups::remove_member(&state.db, user.id(), group_id, member_id).await;
    let error = form_outcome(removed)?;
    finish_group(&state, &user, &headers, group_id, error).await
}
