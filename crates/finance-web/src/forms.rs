//! Parsing of raw form fields.
//!
//! Numeric fields arrive as strings so a malformed value becomes an inline
//! form error instead of an extractor rejection. Amounts accept either a
//! decimal point or a Brazilian decimal comma (`1.234,56`).

use chrono::{Datelike, NaiveDate};
use finance_core::period::check_year;
use finance_core::split::ShareRequest;
use finance_core::Period;
use services::{Result, ServiceError};

/// Parse a monetary amount.
pub fn amount(field: &str, raw: &str) -> Result<f64> {
    let trimmed = raw.trim().trim_start_matches("R$").trim();
    let normalized = if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".")
    } else {
        trimmed.to_string()
    };

    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| {
            ServiceError::invalid(format!("{field}: valor inválido \"{}\"", raw.trim()))
        })
}

/// Parse an optional amount; blank means absent.
pub fn optional_amount(field: &str, raw: Option<&str>) -> Result<Option<f64>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => amount(field, value).map(Some),
    }
}

/// Parse an integer field.
pub fn integer(field: &str, raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| {
            ServiceError::invalid(format!("{field}: número inválido \"{}\"", raw.trim()))
        })
}

/// Parse an optional ID (select boxes send an empty string for "none").
pub fn optional_id(field: &str, raw: Option<&str>) -> Result<Option<i64>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => integer(field, value).map(Some),
    }
}

/// Parse an ISO date (`YYYY-MM-DD`, as sent by date inputs).
pub fn date(field: &str, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ServiceError::invalid(format!("{field}: data inválida \"{}\"", raw.trim())))
}

pub fn optional_date(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => date(field, value).map(Some),
    }
}

/// Year from an optional query value, defaulting to the current one.
pub fn year(raw: Option<i32>, today: NaiveDate) -> Result<i32> {
    Ok(check_year(raw.unwrap_or_else(|| today.year()))?)
}

/// Period from optional `month`/`year` query values, defaulting to `today`.
pub fn period(month: Option<u32>, year: Option<i32>, today: NaiveDate) -> Result<Period> {
    let current = Period::of(today);
    Ok(Period::new(year.unwrap_or(current.year), month.unwrap_or(current.month))?)
}

/// Parse split participants written as `user_id:percent` pairs separated by
/// semicolons or line breaks.
pub fn shares(raw: &str) -> Result<Vec<ShareRequest>> {
    raw.split(|c| c == '\n' || c == ';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (user, percent) = entry.split_once(':').ok_or_else(|| {
                ServiceError::invalid(format!("Participante inválido: \"{entry}\""))
            })?;
            Ok(ShareRequest {
                user_id: integer("Participante", user)?,
                percentage: amount("Porcentagem", percent)?,
            })
        })
        .collect()
}

/// Checkbox fields are present only when ticked.
pub fn checked(raw: Option<&str>) -> bool {
    matches!(raw.map(str::trim), Some("on") | Some("true") | Some("1"))
}
