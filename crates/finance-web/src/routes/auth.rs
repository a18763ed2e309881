//! Login, registration and logout.

use askama::Template;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;
use services::auth::{self as auth_service, ACCESS_COOKIE, REFRESH_COOKIE};
use services::groups;
use tracing::{info, warn};

use crate::error::{is_form_error, user_message, Result};
use crate::session::{append_cookie, clear_cookie, cookie, set_cookie};
use crate::routes::groups as groups_route;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub email: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub name: String,
    pub email: String,
    pub invite_code: String,
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub invite_code: String,
}

pub async fn login_page() -> LoginTemplate {
    LoginTemplate {
        email: String::new(),
        error: None,
    }
}

pub async fn register_page() -> RegisterTemplate {
    RegisterTemplate {
        name: String::new(),
        email: String::new(),
        invite_code: String::new(),
        error: None,
    }
}

/// Open a session and redirect to `to` with the session cookies set.
async fn start_session(
    state: &AppState,
    email: &str,
    password: &str,
    to: &str,
) -> services::Result<Response> {
    let ttl = state.session_ttl();
    let (_, session) = auth_service::login(&state.db, email, password, ttl, state.now()).await?;
    let secure = state.config.cookie_secure;

    let mut response = Redirect::to(to).into_response();
    append_cookie(
        &mut response,
        &set_cookie(ACCESS_COOKIE, &session.access_token, ttl.access.num_seconds(), secure),
    );
    append_cookie(
        &mut response,
        &set_cookie(REFRESH_COOKIE, &session.refresh_token, ttl.refresh.num_seconds(), secure),
    );
    Ok(response)
}

pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Result<Response> {
    match start_session(&state, &form.email, &form.password, "/").await {
        Ok(response) => Ok(response),
        Err(err) if is_form_error(&err) => Ok(LoginTemplate {
            email: form.email,
            error: Some(user_message(&err)),
        }
        .into_response()),
        Err(err) => Err(err.into()),
    }
}

/// Register, optionally joining a group with an invite code.
///
/// The user stays registered even when the invite cannot be redeemed; the
/// invite error is then shown on the groups page.
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let rerender = |error: String| {
        RegisterTemplate {
            name: form.name.clone(),
            email: form.email.clone(),
            invite_code: form.invite_code.clone(),
            error: Some(error),
        }
        .into_response()
    };

    let registered =
        auth_service::register(&state.db, &form.name, &form.email, &form.password).await;
    let user = match registered {
        Ok(user) => user,
        Err(err) if is_form_error(&err) => return Ok(rerender(user_message(&err))),
        Err(err) => return Err(err.into()),
    };

    let mut landing = "/".to_string();
    let code = form.invite_code.trim();
    if !code.is_empty() {
        match groups::redeem(&state.db, code, user.id, state.now()).await {
            Ok(group) => {
                info!(user_id = user.id, group_id = group.id, "Registered through invite");
                landing = format!("/groups/{}", group.id);
            }
            Err(err) if is_form_error(&err) => {
                warn!(
                    user_id = user.id,
                    error = %err,
                    "Invite redemption failed after registration"
                );
                landing = format!("/groups?convite={}", groups_route::invite_failure_slug(&err));
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(start_session(&state, &form.email, &form.password, &landing).await?)
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    if let Some(token) = cookie(&headers, ACCESS_COOKIE) {
        auth_service::logout(&state.db, token).await?;
    }

    let mut response = Redirect::to("/login").into_response();
    append_cookie(&mut response, &clear_cookie(ACCESS_COOKIE));
    append_cookie(&mut response, &clear_cookie(REFRESH_COOKIE));
    Ok(response)
}
