//! Notification routes.

use askama::Template;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use database::Notification;
use services::notifications;

use crate::error::Result;
use crate::routes::{is_htmx, nav, redirect_after, Nav};
use crate::session::CurrentUser;
use crate::state::AppState;

pub struct NotificationsView {
    pub items: Vec<Notification>,
    pub unread: i64,
}

#[derive(Template)]
#[template(path = "notifications.html")]
pub struct NotificationsPage {
    pub nav: Nav,
    pub view: NotificationsView,
}

#[derive(Template)]
#[template(path = "partials/notifications_list.html")]
pub struct NotificationsList {
    pub view: NotificationsView,
}

async fn render(state: &AppState, user: &CurrentUser, headers: &HeaderMap) -> Result<Response> {
    let pool = state.db.pool();
    let view = NotificationsView {
        items: notifications::list(pool, user.id()).await?,
        unread: notifications::unread_count(pool, user.id()).await?,
    };

    if is_htmx(headers) {
        Ok(NotificationsList { view }.into_response())
    } else {
        Ok(NotificationsPage {
            nav: nav(state, user).await?,
            view,
        }
        .into_response())
    }
}

async fn finish(state: &AppState, user: &CurrentUser, headers: &HeaderMap) -> Result<Response> {
    if let Some(redirect) = redirect_after(&None, headers, "/notifications") {
        return Ok(redirect);
    }
    render(state, user, headers).await
}

pub async fn notifications_page(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
) -> Result<Response> {
    render(&state, &user, &headers).await
}

pub async fn read(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response> {
    notifications::mark_read(state.db.pool(), user.id(), id, state.now()).await?;
    finish(&state, &user, &headers).await
}

pub async fn read_all(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
) -> Result<Response> {
    notifications::mark_all_read(state.db.pool(), user.id(), state.now()).await?;
    finish(&state, &user, &headers).await
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response> {
    notifications::delete(state.db.pool(), user.id(), id).await?;
    finish(&state, &user, &headers).await
}
