//! Web interface for the family finance tracker.
//!
//! Server-rendered HTML via askama templates, with HTMX fragments for form
//! posts. [`app`] builds the full router; the binary only loads
//! configuration and serves it.

pub mod config;
pub mod error;
pub mod filters;
pub mod forms;
pub mod routes;
pub mod session;
pub mod state;

use axum::Router;
use tower_http::services::ServeDir;

pub use config::Config;
pub use state::AppState;

/// Build the application router with static assets mounted under `/static`.
pub fn app(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();
    routes::router(state.clone())
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
}
