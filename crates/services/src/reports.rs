//! Yearly and tax report aggregation.

use database::{card as card_store, expense as expense_store, income as income_store, Database};
use finance_core::money::round2;
use finance_core::period::check_year;
use finance_core::tax;
use finance_core::Period;
use serde::Serialize;

use crate::cards;
use crate::error::Result;
use crate::settings::SettingsCache;

/// One month of the yearly report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlySummary {
    pub period: Period,
    pub income_gross: f64,
    pub tax: f64,
    pub income_net: f64,
    pub expenses_paid: f64,
    pub installments_due: f64,
    /// `income_net - expenses_paid - installments_due`.
    pub balance: f64,
}

/// Sums over the twelve months.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ReportTotals {
    pub income_gross: f64,
    pub tax: f64,
    pub income_net: f64,
    pub expenses_paid: f64,
    pub installments_due: f64,
    pub balance: f64,
}

/// Everything the export writers need.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyReport {
    pub year: i32,
    pub owner_name: String,
    /// Always exactly twelve rows, January first.
    pub months: Vec<MonthlySummary>,
    /// Paid expenses per category, largest first.
    pub categories: Vec<(String, f64)>,
    pub totals: ReportTotals,
}

/// One month of the tax report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TaxReportRow {
    pub period: Period,
    pub gross: f64,
    pub tax: f64,
    /// `tax / gross`, or the rate the trailing revenue implies when nothing
    /// was received.
    pub effective_rate: f64,
    /// Gross revenue of the twelve months before this one.
    pub trailing_revenue: f64,
    pub inss: f64,
    pub bracket: u8,
}

/// Build the yearly summary for a user.
pub async fn yearly_report(db: &Database, owner_id: i64, year: i32) -> Result<YearlyReport> {
    check_year(year)?;
    let owner = database::user::get_user(db.pool(), owner_id).await?;
    let incomes = income_store::monthly_totals(db.pool(), owner_id, year).await?;
    let expenses = expense_store::monthly_paid_totals(db.pool(), owner_id, year as i64).await?;
    let installments = card_store::list_installments_for_owner(db.pool(), owner_id).await?;

    let months: Vec<MonthlySummary> = Period::year_months(year)
        .map(|period| {
            let month = period.month as i64;
            let income = incomes.iter().find(|row| row.month == month);
            let income_gross = round2(income.map(|row| row.gross).unwrap_or(0.0));
            let tax = round2(income.map(|row| row.tax).unwrap_or(0.0));
            let income_net = round2(income.map(|row| row.net).unwrap_or(0.0));
            let expenses_paid = round2(
                expenses
                    .iter()
                    .find(|(m, _)| *m == month)
                    .map(|(_, total)| *total)
                    .unwrap_or(0.0),
            );
            let installments_due = cards::due_in_period(&installments, period);

            MonthlySummary {
                period,
                income_gross,
                tax,
                income_net,
                expenses_paid,
                installments_due,
                balance: round2(income_net - expenses_paid - installments_due),
            }
        })
        .collect();

    let totals = months.iter().fold(ReportTotals::default(), |acc, m| ReportTotals {
        income_gross: round2(acc.income_gross + m.income_gross),
        tax: round2(acc.tax + m.tax),
        income_net: round2(acc.income_net + m.income_net),
        expenses_paid: round2(acc.expenses_paid + m.expenses_paid),
        installments_due: round2(acc.installments_due + m.installments_due),
        balance: round2(acc.balance + m.balance),
    });

    let categories = expense_store::yearly_totals_by_category(db.pool(), owner_id, year as i64)
        .await?
        .into_iter()
        .map(|(category, total)| (category, round2(total)))
        .collect();

    Ok(YearlyReport {
        year,
        owner_name: owner.name,
        months,
        categories,
        totals,
    })
}

/// Month-by-month tax position for a year.
pub async fn tax_report(
    db: &Database,
    settings: &SettingsCache,
    owner_id: i64,
    year: i32,
) -> Result<Vec<TaxReportRow>> {
    check_year(year)?;
    let inss = tax::inss(&settings.snapshot().await?.inss_config());
    let incomes = income_store::monthly_totals(db.pool(), owner_id, year).await?;

    let mut rows = Vec::with_capacity(12);
    for period in Period::year_months(year) {
        let (start, end) = period.trailing_twelve();
        let trailing =
            round2(income_store::sum_gross_between(db.pool(), owner_id, start, end).await?);
        let month = incomes.iter().find(|row| row.month == period.month as i64);
        let gross = round2(month.map(|row| row.gross).unwrap_or(0.0));
        let tax_amount = round2(month.map(|row| row.tax).unwrap_or(0.0));

        let effective_rate = if gross > 0.0 {
            tax_amount / gross
        } else {
            tax::effective_rate(trailing)
        };

        rows.push(TaxReportRow {
            period,
            gross,
            tax: tax_amount,
            effective_rate,
            trailing_revenue: trailing,
            inss,
            bracket: tax::bracket_for(trailing).number,
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::expenses;
    use crate::income::{self, IncomeInput};
    use crate::test_support::{date, fixed_expense, seed_user};
    use finance_core::CoreError;

    #[tokio::test]
    async fn test_empty_year_has_twelve_rows() {
        let db = Database::in_memory().await.unwrap();
        let ana = seed_user(&db, "Ana").await;

        let report = yearly_report(&db, ana.id, 2025).await.unwrap();
        assert_eq!(report.months.len(), 12);
        assert_eq!(report.months[0].period, Period::new(2025, 1).unwrap());
        assert_eq!(report.months[11].period, Period::new(2025, 12).unwrap());
        assert_eq!(report.totals, ReportTotals::default());
        assert!(report.categories.is_empty());
    }

    #[tokio::test]
    async fn test_report_combines_sources() {
        let db = Database::in_memory().await.unwrap();
        let settings = SettingsCache::new(db.clone());
        let ana = seed_user(&db, "Ana").await;

        income::record_income(
            &db,
            &settings,
            ana.id,
            &IncomeInput {
                description: "Contrato".to_string(),
                amount_usd: 2_000.0,
                exchange_rate: 5.0,
                received_on: date(2025, 3, 5),
                account_id: None,
            },
        )
        .await
        .unwrap();

        let rent = fixed_expense(ana.id, "Aluguel", 1_500.0, 10);
        let rent = expenses::create_expense(&db, ana.id, rent).await.unwrap();
        expenses::pay(&db, &settings, ana.id, rent.id, Period::new(2025, 3).unwrap(), None)
            .await
            .unwrap();

        let card = crate::cards::create_card(&db, ana.id, "Nubank", 5_000.0, 3, 10).await.unwrap();
        crate::cards::add_installment(&db, ana.id, card.id, "TV", 600.0, 3, date(2025, 2, 1))
            .await
            .unwrap();

        let report = yearly_report(&db, ana.id, 2025).await.unwrap();
        let march = report.months[2];
        assert_eq!(march.income_gross, 10_000.0);
        assert_eq!(march.tax, 600.0);
        assert_eq!(march.expenses_paid, 1_500.0);
        assert_eq!(march.installments_due, 200.0);
        assert_eq!(march.balance, 9_400.0 - 1_500.0 - 200.0);
        assert_eq!(report.months[4].installments_due, 0.0);
        assert_eq!(report.totals.installments_due, 600.0);
        assert_eq!(report.categories, vec![("Moradia".to_string(), 1_500.0)]);

        let tax_rows = tax_report(&db, &settings, ana.id, 2025).await.unwrap();
        assert_eq!(tax_rows.len(), 12);
        assert_eq!(tax_rows[2].effective_rate, 0.06);
        assert_eq!(tax_rows[3].trailing_revenue, 10_000.0);
        assert_eq!(tax_rows[3].bracket, 1);
        assert_eq!(tax_rows[0].inss, 155.32);
    }

    #[tokio::test]
    async fn test_out_of_range_year_is_rejected() {
        let db = Database::in_memory().await.unwrap();
        let settings = SettingsCache::new(db.clone());
        let ana = seed_user(&db, "Ana").await;

        assert!(matches!(
            tax_report(&db, &settings, ana.id, 200_000_000).await,
            Err(ServiceError::Core(CoreError::InvalidYear(200_000_000)))
        ));
        assert!(matches!(
            yearly_report(&db, ana.id, -1).await,
            Err(ServiceError::Core(CoreError::InvalidYear(-1)))
        ));
    }
}
