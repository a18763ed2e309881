//! Cookie sessions.
//!
//! [`require_session`] resolves the session cookies on every protected route
//! and stores the [`CurrentUser`] in the request extensions; handlers pull it
//! out with the extractor. A rotated access token is written back on the
//! response.

use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use database::User;
use services::auth::{self, ACCESS_COOKIE, REFRESH_COOKIE};
use tracing::warn;

use crate::error::AppError;
use crate::routes::is_htmx;
use crate::state::AppState;

/// The logged-in user.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> i64 {
        self.0.id
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// Value of the named cookie, if present.
pub fn cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value for a session token.
pub fn set_cookie(name: &str, value: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie =
        format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that deletes a cookie.
pub fn clear_cookie(name: &str) -> String {
    format!("{name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

pub(crate) fn append_cookie(response: &mut Response, cookie: &str) {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(err) => warn!(error = %err, "Invalid cookie value"),
    }
}

fn unauthenticated(headers: &HeaderMap) -> Response {
    if is_htmx(headers) {
        let mut response = AppError::Unauthorized.into_response();
        response
            .headers_mut()
            .insert("HX-Redirect", HeaderValue::from_static("/login"));
        response
    } else {
        Redirect::to("/login").into_response()
    }
}

/// Middleware guarding every page that needs a user.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let headers = req.headers();
    let access = cookie(headers, ACCESS_COOKIE).map(str::to_string);
    let refresh = cookie(headers, REFRESH_COOKIE).map(str::to_string);

    let authenticated = match auth::authenticate(
        &state.db,
        access.as_deref(),
        refresh.as_deref(),
        state.session_ttl(),
        state.now(),
    )
    .await
    {
        Ok(Some(authenticated)) => authenticated,
        Ok(None) => return unauthenticated(req.headers()),
        Err(err) => return AppError::from(err).into_response(),
    };

    req.extensions_mut().insert(CurrentUser(authenticated.user));
    let mut response = next.run(req).await;

    if let Some(token) = authenticated.new_access_token {
        let max_age = state.session_ttl().access.num_seconds();
        append_cookie(
            &mut response,
            &set_cookie(ACCESS_COOKIE, &token, max_age, state.config.cookie_secure),
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; access_token=abc123; refresh_token="),
        );
        assert_eq!(cookie(&headers, "access_token"), Some("abc123"));
        assert_eq!(cookie(&headers, "refresh_token"), None);
        assert_eq!(cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_set_cookie_flags() {
        let value = set_cookie("access_token", "t", 3600, true);
        assert_eq!(value, "access_token=t; Path=/; HttpOnly; SameSite=Lax; Max-Age=3600; Secure");
        assert!(clear_cookie("access_token").ends_with("Max-Age=0"));
    }
}
