//! Family finance tracker web server.

use database::Database;
use finance_web::{app, AppState, Config};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(addr = %config.addr, "Starting finance web server");

    // Connect to database
    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    // Drop sessions left over from earlier runs
    let purged = services::auth::purge_expired(&db, chrono::Local::now().naive_local()).await?;
    if purged > 0 {
        info!(purged, "Expired sessions removed");
    }

    let addr = config.addr;
    let state = AppState::new(db.clone(), config);
    let app = app(state);

    // Start server
    info!(addr = %addr, "Finance web server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    db.close().await;
    Ok(())
}
