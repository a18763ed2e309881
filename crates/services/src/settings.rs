//! Cached financial settings backed by the `settings` table.

use database::settings as settings_store;
use database::Database;
use finance_core::tax::InssConfig;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::{Result, ServiceError};

pub const PRO_LABORE: &str = "pro_labore";
pub const INSS_RATE: &str = "inss_rate";
pub const INSS_CEILING: &str = "inss_ceiling";
pub const BUDGET_ALERT_THRESHOLD: &str = "budget_alert_threshold";

/// Every key the cache understands.
pub const KNOWN_KEYS: [&str; 4] = [PRO_LABORE, INSS_RATE, INSS_CEILING, BUDGET_ALERT_THRESHOLD];

/// Typed view of the settings table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FinancialSettings {
    pub pro_labore: f64,
    pub inss_rate: f64,
    pub inss_ceiling: f64,
    /// Spend ratio that triggers the first budget alert.
    pub budget_alert_threshold: f64,
}

impl Default for FinancialSettings {
    fn default() -> Self {
        let inss = InssConfig::default();
        Self {
            pro_labore: inss.pro_labore,
            inss_rate: inss.rate,
            inss_ceiling: inss.ceiling,
            budget_alert_threshold: 0.80,
        }
    }
}

impl FinancialSettings {
    /// INSS parameters for the tax calculator.
    pub fn inss_config(&self) -> InssConfig {
        InssConfig {
            pro_labore: self.pro_labore,
            rate: self.inss_rate,
            ceiling: self.inss_ceiling,
        }
    }

    fn apply(&mut self, key: &str, value: f64) -> Result<()> {
        match key {
            PRO_LABORE => self.pro_labore = value,
            INSS_RATE => self.inss_rate = value,
            INSS_CEILING => self.inss_ceiling = value,
            BUDGET_ALERT_THRESHOLD => self.budget_alert_threshold = value,
            other => {
                return Err(ServiceError::invalid(format!(
                    "Configuração desconhecida: {}",
                    other
                )))
            }
        }
        Ok(())
    }
}

/// Parse and range-check a raw setting value.
///
/// Accepts a decimal comma (`1412,50`).
pub fn parse_value(key: &str, raw: &str) -> Result<f64> {
    if !KNOWN_KEYS.contains(&key) {
        return Err(ServiceError::invalid(format!(
            "Configuração desconhecida: {}",
            key
        )));
    }

    let value: f64 = raw
        .trim()
        .replace(',', ".")
        .parse()
        .map_err(|_| ServiceError::invalid(format!("Valor inválido para {}: {}", key, raw)))?;

    if !value.is_finite() || value < 0.0 {
        return Err(ServiceError::invalid(format!(
            "{} não pode ser negativo",
            key
        )));
    }

    let is_rate = key == INSS_RATE || key == BUDGET_ALERT_THRESHOLD;
    if is_rate && value > 1.0 {
        return Err(ServiceError::invalid(format!(
            "{} deve estar entre 0 e 1",
            key
        )));
    }

    Ok(value)
}

/// Read-through cache over the settings table.
///
/// The first `snapshot` loads every row; later calls are served from memory
/// until `update` or `reset` invalidates the copy.
pub struct SettingsCache {
    database: Database,
    cached: RwLock<Option<FinancialSettings>>,
}

impl SettingsCache {
    pub fn new(database: Database) -> Self {
        Self {
            database,
            cached: RwLock::new(None),
        }
    }

    /// Current settings, loading them on first use.
    pub async fn snapshot(&self) -> Result<FinancialSettings> {
        if let Some(settings) = *self.cached.read().await {
            return Ok(settings);
        }

        let mut guard = self.cached.write().await;
        if let Some(settings) = *guard {
            return Ok(settings);
        }

        let mut settings = FinancialSettings::default();
        for row in settings_store::list_settings(self.database.pool()).await? {
            match parse_value(&row.key, &row.value) {
                Ok(value) => settings.apply(&row.key, value)?,
                Err(err) => warn!(key = %row.key, "Ignoring stored setting: {}", err),
            }
        }

        *guard = Some(settings);
        Ok(settings)
    }

    /// Validate, persist and invalidate.
    pub async fn update(&self, key: &str, raw: &str) -> Result<FinancialSettings> {
        let value = parse_value(key, raw)?;
        settings_store::upsert_setting(self.database.pool(), key, &value.to_string()).await?;
        self.invalidate().await;
        info!(key = %key, value, "Setting updated");
        self.snapshot().await
    }

    /// Drop a stored value so the default applies again.
    pub async fn reset(&self, key: &str) -> Result<FinancialSettings> {
        if !KNOWN_KEYS.contains(&key) {
            return Err(ServiceError::invalid(format!(
                "Configuração desconhecida: {}",
                key
            )));
        }
        settings_store::delete_setting(self.database.pool(), key).await?;
        self.invalidate().await;
        self.snapshot().await
    }

    async fn invalidate(&self) {
        *self.cached.write().await = None;
    }
}
