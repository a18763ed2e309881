//! Application state shared across handlers.

use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime};
use database::Database;
use services::auth::SessionTtl;
use services::SettingsCache;

use crate::config::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection.
    pub db: Database,
    /// Financial settings cache.
    pub settings: Arc<SettingsCache>,
    /// Server configuration.
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state.
    pub fn new(db: Database, config: Config) -> Self {
        let settings = Arc::new(SettingsCache::new(db.clone()));
        Self {
            db,
            settings,
            config: Arc::new(config),
        }
    }

    pub fn session_ttl(&self) -> SessionTtl {
        self.config.session_ttl()
    }

    pub fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }
}
