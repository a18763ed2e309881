//! Income recording with currency conversion and tax projection.

use chrono::{Datelike, Months, NaiveDate};
use database::income as income_store;
use database::income::MonthlyIncomeTotals;
use database::{validation, Database, Income, NewIncome};
use finance_core::money::round2;
use finance_core::tax::{self, InssConfig, TaxCalculation};
use finance_core::period::check_year;
use finance_core::Period;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::info;

use crate::accounts;
use crate::error::{Result, ServiceError};
use crate::settings::SettingsCache;

/// Income form input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeInput {
    pub description: String,
    pub amount_usd: f64,
    /// BRL per USD.
    pub exchange_rate: f64,
    pub received_on: NaiveDate,
    pub account_id: Option<i64>,
}

/// Converted amount and tax projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncomePreview {
    pub amount_brl: f64,
    pub calculation: TaxCalculation,
}

/// The twelve months before `date`, as a `[start, end)` range.
pub fn trailing_window(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = date.checked_sub_months(Months::new(12)).unwrap_or(NaiveDate::MIN);
    (start, date)
}

/// Amounts are checked after rounding to cents.
fn validate(input: &IncomeInput) -> Result<()> {
    validation::validate_name("Descrição", &input.description)?;
    validation::validate_amount("Valor em USD", round2(input.amount_usd))?;
    validation::validate_amount("Cotação", input.exchange_rate)?;
    validation::validate_amount("Valor em BRL", round2(input.amount_usd * input.exchange_rate))?;
    check_year(input.received_on.year())?;
    Ok(())
}

async fn project(
    conn: &mut SqliteConnection,
    inss: &InssConfig,
    owner_id: i64,
    amount_brl: f64,
    received_on: NaiveDate,
) -> Result<TaxCalculation> {
    let (start, end) = trailing_window(received_on);
    let trailing = income_store::sum_gross_between(&mut *conn, owner_id, start, end).await?;
    Ok(tax::calculate(round2(trailing), amount_brl, inss))
}

/// Compute and store an income on an open connection or transaction.
pub(crate) async fn record_on(
    conn: &mut SqliteConnection,
    inss: &InssConfig,
    owner_id: i64,
    input: &IncomeInput,
) -> Result<(Income, TaxCalculation)> {
    let amount_brl = round2(input.amount_usd * input.exchange_rate);
    let calculation = project(&mut *conn, inss, owner_id, amount_brl, input.received_on).await?;

    let new = NewIncome {
        owner_id,
        account_id: input.account_id,
        description: input.description.trim().to_string(),
        amount_usd: round2(input.amount_usd),
        exchange_rate: input.exchange_rate,
        amount_brl,
        gross_amount: amount_brl,
        tax_amount: calculation.tax_amount,
        net_amount: calculation.net_amount,
        effective_rate: calculation.effective_rate,
        received_on: input.received_on,
    };
    let income = income_store::insert_income(&mut *conn, &new).await?;
    Ok((income, calculation))
}

/// Convert, project tax and persist.
pub async fn record_income(
    db: &Database,
    settings: &SettingsCache,
    owner_id: i64,
    input: &IncomeInput,
) -> Result<(Income, TaxCalculation)> {
    validate(input)?;
    if let Some(account_id) = input.account_id {
        accounts::require_access(db.pool(), owner_id, account_id).await?;
    }
    let inss = settings.snapshot().await?.inss_config();

    let mut tx = db.begin().await?;
    let (income, calculation) = record_on(&mut tx, &inss, owner_id, input).await?;
    tx.commit().await?;

    info!(
        owner_id,
        income_id = income.id,
        bracket = calculation.bracket.number,
        tax = calculation.tax_amount,
        "Income recorded"
    );
    Ok((income, calculation))
}

/// Same projection as `record_income` without writing anything.
pub async fn preview_income(
    db: &Database,
    settings: &SettingsCache,
    owner_id: i64,
    input: &IncomeInput,
) -> Result<IncomePreview> {
    validate(input)?;
    let inss = settings.snapshot().await?.inss_config();
    let amount_brl = round2(input.amount_usd * input.exchange_rate);

    let mut conn = db.pool().acquire().await?;
    let calculation = project(&mut conn, &inss, owner_id, amount_brl, input.received_on).await?;
    Ok(IncomePreview {
        amount_brl,
        calculation,
    })
}

/// Incomes received in a year, newest first.
pub async fn list_year(db: &Database, owner_id: i64, year: i32) -> Result<Vec<Income>> {
    let start = Period::new(year, 1)?.first_day();
    let end = Period::new(year, 12)?.end_exclusive();
    Ok(income_store::list_between(db.pool(), owner_id, start, end).await?)
}

/// Totals for each of the twelve months of a year, zero-filled.
pub async fn monthly_totals(
    db: &Database,
    owner_id: i64,
    year: i32,
) -> Result<Vec<MonthlyIncomeTotals>> {
    check_year(year)?;
    let rows = income_store::monthly_totals(db.pool(), owner_id, year).await?;
    Ok((1..=12)
        .map(|month| {
            rows.iter()
                .find(|row| row.month == month)
                .cloned()
                .unwrap_or(MonthlyIncomeTotals {
                    month,
                    gross: 0.0,
                    tax: 0.0,
                    net: 0.0,
                })
        })
        .collect())
}

pub async fn delete_income(db: &Database, owner_id: i64, income_id: i64) -> Result<()> {
    let income = income_store::get_income(db.pool(), income_id).await?;
    if income.owner_id != owner_id {
        return Err(ServiceError::Forbidden);
    }
    income_store::delete_income(db.pool(), income_id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{date, seed_user};

    fn input(usd: f64, rate: f64, received_on: NaiveDate) -> IncomeInput {
        IncomeInput {
            description: "Contrato".to_string(),
            amount_usd: usd,
            exchange_rate: rate,
            received_on,
            account_id: None,
        }
    }

    #[tokio::test]
    async fn test_record_first_income_uses_first_bracket() {
        let db = Database::in_memory().await.unwrap();
        let settings = SettingsCache::new(db.clone());
        let ana = seed_user(&db, "Ana").await;

        let march = input(2_000.0, 5.0, date(2025, 3, 10));
        let (income, calc) = record_income(&db, &settings, ana.id, &march).await.unwrap();
        assert_eq!(income.amount_brl, 10_000.0);
        assert_eq!(calc.bracket.number, 1);
        assert_eq!(income.tax_amount, 600.0);
        assert_eq!(income.net_amount, 9_400.0);
        assert_eq!(calc.inss_amount, 155.32);
    }

    #[tokio::test]
    async fn test_amount_rounding_to_zero_is_rejected() {
        let db = Database::in_memory().await.unwrap();
        let settings = SettingsCache::new(db.clone());
        let ana = seed_user(&db, "Ana").await;

        assert!(matches!(
            record_income(&db, &settings, ana.id, &input(0.004, 5.0, date(2025, 3, 10))).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            preview_income(&db, &settings, ana.id, &input(0.01, 0.1, date(2025, 3, 10))).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(income_store::list_between(db.pool(), ana.id, date(2025, 1, 1), date(2026, 1, 1))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_trailing_window_and_bracket_boundary() {
        let db = Database::in_memory().await.unwrap();
        let settings = SettingsCache::new(db.clone());
        let ana = seed_user(&db, "Ana").await;

        // 350k inside the window, plus an old income that must be ignored
        record_income(&db, &settings, ana.id, &input(70_000.0, 5.0, date(2024, 6, 1)))
            .await
            .unwrap();
        record_income(&db, &settings, ana.id, &input(100_000.0, 5.0, date(2023, 1, 1)))
            .await
            .unwrap();

        let preview = preview_income(&db, &settings, ana.id, &input(2_000.0, 5.0, date(2025, 3, 1)))
            .await
            .unwrap();
        assert_eq!(preview.calculation.trailing_revenue, 350_000.0);
        assert_eq!(preview.calculation.bracket.number, 2);
        assert_eq!(preview.calculation.tax_amount, 860.0);

        // Preview does not persist
        assert_eq!(list_year(&db, ana.id, 2025).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_bracket_warning_on_crossing() {
        let db = Database::in_memory().await.unwrap();
        let settings = SettingsCache::new(db.clone());
        let ana = seed_user(&db, "Ana").await;

        record_income(&db, &settings, ana.id, &input(35_000.0, 5.0, date(2025, 1, 10)))
            .await
            .unwrap();
        let february = input(2_000.0, 5.0, date(2025, 2, 10));
        let (_, calc) = record_income(&db, &settings, ana.id, &february).await.unwrap();
        let warning = calc.bracket_warning.unwrap();
        assert_eq!((warning.from_bracket, warning.to_bracket), (1, 2));
    }

    #[tokio::test]
    async fn test_monthly_totals_zero_filled_and_validation() {
        let db = Database::in_memory().await.unwrap();
        let settings = SettingsCache::new(db.clone());
        let ana = seed_user(&db, "Ana").await;
        let bia = seed_user(&db, "Bia").await;

        let april = input(1_000.0, 5.0, date(2025, 4, 2));
        let (income, _) = record_income(&db, &settings, ana.id, &april).await.unwrap();
        let totals = monthly_totals(&db, ana.id, 2025).await.unwrap();
        assert_eq!(totals.len(), 12);
        assert_eq!(totals[3].gross, 5_000.0);
        assert_eq!(totals[0].gross, 0.0);

        assert!(matches!(
            record_income(&db, &settings, ana.id, &input(0.0, 5.0, date(2025, 4, 2))).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            delete_income(&db, bia.id, income.id).await,
            Err(ServiceError::Forbidden)
        ));
    }
}
