//! End-to-end requests against the full router with an in-memory database.

use axum::body::{to_bytes, Body};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use database::Database;
use finance_web::{app, AppState, Config};
use tower::ServiceExt;

const PASSWORD: &str = "segredo-forte";

async fn test_app() -> (Router, AppState) {
    let db = Database::in_memory().await.unwrap();
    let config = Config::from_lookup(|_| None).unwrap();
    let state = AppState::new(db, config);
    (app(state.clone()), state)
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8_lossy(&bytes).into_owned()
}

fn form_post(uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
}

/// Register a user, log in through the form and return the cookie header.
async fn logged_in(app: &Router, state: &AppState) -> String {
    services::auth::register(&state.db, "Ana", "ana@example.com", PASSWORD)
        .await
        .unwrap();

    let body = format!("email=ana%40example.com&password={PASSWORD}");
    let response = app
        .clone()
        .oneshot(form_post("/login").body(Body::from(body.clone())).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .collect::<Vec<_>>()
        .join("; ")
}

#[tokio::test]
async fn test_health() {
    let (app, _) = test_app().await;

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let health: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["database"], true);
}

#[tokio::test]
async fn test_protected_page_redirects_to_login() {
    let (app, _) = test_app().await;

    let response = app
        .clone()
        .oneshot(Request::get("/expenses").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(LOCATION).unwrap(), "/login");

    let response = app
        .oneshot(
            Request::get("/expenses")
                .header("HX-Request", "true")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers().get("HX-Redirect").unwrap(), "/login");
}

#[tokio::test]
async fn test_login_sets_cookies_and_opens_pages() {
    let (app, state) = test_app().await;
    let cookies = logged_in(&app, &state).await;
    assert!(cookies.contains("access_token="));
    assert!(cookies.contains("refresh_token="));

    let pages = [
        "/",
        "/expenses",
        "/income",
        "/cards",
        "/budgets",
        "/goals",
        "/groups",
        "/tax",
        "/settings",
    ];
    for path in pages {
        let response = app
            .clone()
            .oneshot(Request::get(path).header(COOKIE, &cookies).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "GET {path}");
    }
}

#[tokio::test]
async fn test_wrong_password_rerenders_login() {
    let (app, state) = test_app().await;
    services::auth::register(&state.db, "Ana", "ana@example.com", PASSWORD)
        .await
        .unwrap();

    let body = "email=ana%40example.com&password=errada123";
    let response = app
        .oneshot(form_post("/login").body(Body::from(body)).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(SET_COOKIE).is_none());
    assert!(body_text(response).await.contains("class=\"error\""));
}

#[tokio::test]
async fn test_export_formats() {
    let (app, state) = test_app().await;
    let cookies = logged_in(&app, &state).await;

    let response = app
        .clone()
        .oneshot(
            Request::get("/export?year=2025&format=docx")
                .header(COOKIE, &cookies)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(
            Request::get("/export?year=2025&format=csv")
                .header(COOKIE, &cookies)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"relatorio-2025.csv\""
    );
    let body = body_text(response).await;
    assert!(body.lines().count() > 12);
}

#[tokio::test]
async fn test_htmx_post_returns_fragment_and_plain_post_redirects() {
    let (app, state) = test_app().await;
    let cookies = logged_in(&app, &state).await;

    let body = "name=Corrente&kind=individual&group_id=&initial_balance=1.500%2C00";
    let response = app
        .clone()
        .oneshot(
            form_post("/accounts")
                .header(COOKIE, &cookies)
                .header("HX-Request", "true")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("id=\"accounts-list\""));
    assert!(html.contains("Corrente"));
    assert!(!html.contains("<html"));

    let body = "name=Poupan%C3%A7a&kind=individual&group_id=&initial_balance=0";
    let response = app
        .clone()
        .oneshot(
            form_post("/accounts")
                .header(COOKIE, &cookies)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(LOCATION).unwrap(), "/accounts");
}

#[tokio::test]
async fn test_invalid_form_renders_inline_error() {
    let (app, state) = test_app().await;
    let cookies = logged_in(&app, &state).await;

    let body = "description=Aluguel&amount=abc&category=Moradia&kind=fixed&due_day=10\
                &account_id=&group_id=&shares=";
    let response = app
        .oneshot(
            form_post("/expenses")
                .header(COOKIE, &cookies)
                .header("HX-Request", "true")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("class=\"error\""));
    assert!(html.contains("id=\"expenses-list\""));
}
