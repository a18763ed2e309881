//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use services::auth::SessionTtl;

/// Web server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Directory served under `/static`.
    pub static_dir: PathBuf,
    /// Access token lifetime in hours.
    pub session_ttl_hours: i64,
    /// Refresh token lifetime in days.
    pub refresh_ttl_days: i64,
    /// Mark session cookies `Secure`.
    pub cookie_secure: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `FINANCE_ADDR` | Server bind address | `127.0.0.1:8790` |
    /// | `DATABASE_URL` | SQLite database URL | `sqlite:finance.db?mode=rwc` |
    /// | `FINANCE_STATIC_DIR` | Static assets directory | `static` |
    /// | `SESSION_TTL_HOURS` | Access token lifetime | `24` |
    /// | `REFRESH_TTL_DAYS` | Refresh token lifetime | `30` |
    /// | `COOKIE_SECURE` | Secure cookies | `false` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let addr = lookup("FINANCE_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8790".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url = lookup("DATABASE_URL")
            .unwrap_or_else(|| "sqlite:finance.db?mode=rwc".to_string());

        let static_dir = lookup("FINANCE_STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("static"));

        let session_ttl_hours = positive(&lookup, "SESSION_TTL_HOURS", 24)?;
        let refresh_ttl_days = positive(&lookup, "REFRESH_TTL_DAYS", 30)?;

        let cookie_secure = match lookup("COOKIE_SECURE").as_deref().map(str::trim) {
            None | Some("") => false,
            Some("1") | Some("true") | Some("yes") => true,
            Some("0") | Some("false") | Some("no") => false,
            Some(_) => return Err(ConfigError::InvalidBool("COOKIE_SECURE")),
        };

        Ok(Self {
            addr,
            database_url,
            static_dir,
            session_ttl_hours,
            refresh_ttl_days,
            cookie_secure,
        })
    }

    /// Session lifetimes derived from the TTL settings.
    pub fn session_ttl(&self) -> SessionTtl {
        SessionTtl {
            access: chrono::Duration::hours(self.session_ttl_hours),
            refresh: chrono::Duration::days(self.refresh_ttl_days),
        }
    }
}

fn positive(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: i64,
) -> Result<i64, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(value) if value > 0 => Ok(value),
            _ => Err(ConfigError::InvalidNumber(key)),
        },
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid FINANCE_ADDR format")]
    InvalidAddr,

    #[error("{0} must be a positive integer")]
    InvalidNumber(&'static str),

    #[error("{0} must be true or false")]
    InvalidBool(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.addr.to_string(), "127.0.0.1:8790");
        assert_eq!(config.database_url, "sqlite:finance.db?mode=rwc");
        assert_eq!(config.session_ttl_hours, 24);
        assert_eq!(config.refresh_ttl_days, 30);
        assert!(!config.cookie_secure);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(load(&[("FINANCE_ADDR", "nope")]), Err(ConfigError::InvalidAddr)));
        assert!(matches!(
            load(&[("SESSION_TTL_HOURS", "0")]),
            Err(ConfigError::InvalidNumber("SESSION_TTL_HOURS"))
        ));
        assert!(matches!(
            load(&[("COOKIE_SECURE", "maybe")]),
            Err(ConfigError::InvalidBool("COOKIE_SECURE"))
        ));
        assert!(load(&[("COOKIE_SECURE", "true")]).unwrap().cookie_secure);
    }
}
