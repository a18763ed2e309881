use finance_core::money::round2;

use super::SUMMARY_HEADERS;
use crate::error::{Result, ServiceError};
use crate::reports::YearlyReport;

fn export_error(err: impl std::fmt::Display) -> ServiceError {
    ServiceError::Export(err.to_string())
}

fn amount(value: f64) -> String {
    format!("{:.2}", round2(value))
}

/// Monthly rows, a totals row, then the category breakdown after a blank line.
pub(super) fn write(report: &YearlyReport) -> Result<Vec<u8>> {
    let mut writer = ::csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    writer.write_record(SUMMARY_HEADERS).map_err(export_error)?;
    for month in &report.months {
        writer
            .write_record([
                month.period.label(),
                amount(month.income_gross),
                amount(month.tax),
                amount(month.income_net),
                amount(month.expenses_paid),
                amount(month.installments_due),
                amount(month.balance),
            ])
            .map_err(export_error)?;
    }

    let totals = &report.totals;
    writer
        .write_record([
            "Total".to_string(),
            amount(totals.income_gross),
            amount(totals.tax),
            amount(totals.income_net),
            amount(totals.expenses_paid),
            amount(totals.installments_due),
            amount(totals.balance),
        ])
        .map_err(export_error)?;

    writer.write_record([""]).map_err(export_error)?;
    writer.write_record(["Categoria", "Total"]).map_err(export_error)?;
    for (category, total) in &report.categories {
        writer
            .write_record([category.clone(), amount(*total)])
            .map_err(export_error)?;
    }

    writer.into_inner().map_err(export_error)
}
