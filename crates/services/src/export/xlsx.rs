use rust_xlsxwriter::{Format, Workbook, XlsxError};

use super::SUMMARY_HEADERS;
use crate::error::{Result, ServiceError};
use crate::reports::YearlyReport;

impl From<XlsxError> for ServiceError {
    fn from(err: XlsxError) -> Self {
        ServiceError::Export(err.to_string())
    }
}

const MONEY_FORMAT: &str = "#,##0.00";

/// Workbook with a "Resumo" sheet of monthly rows and a "Categorias" sheet.
pub(super) fn write(report: &YearlyReport) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let money = Format::new().set_num_format(MONEY_FORMAT);
    let bold_money = Format::new().set_bold().set_num_format(MONEY_FORMAT);

    let summary = workbook.add_worksheet();
    summary.set_name("Resumo")?;
    for (col, header) in SUMMARY_HEADERS.iter().enumerate() {
        summary.write_string_with_format(0, col as u16, *header, &bold)?;
    }
    summary.set_column_width(0, 18)?;

    for (i, month) in report.months.iter().enumerate() {
        let row = i as u32 + 1;
        summary.write_string(row, 0, month.period.label())?;
        let values = [
            month.income_gross,
            month.tax,
            month.income_net,
            month.expenses_paid,
            month.installments_due,
            month.balance,
        ];
        for (col, value) in values.into_iter().enumerate() {
            summary.write_number_with_format(row, col as u16 + 1, value, &money)?;
        }
    }

    let total_row = report.months.len() as u32 + 1;
    let totals = &report.totals;
    summary.write_string_with_format(total_row, 0, "Total", &bold)?;
    let values = [
        totals.income_gross,
        totals.tax,
        totals.income_net,
        totals.expenses_paid,
        totals.installments_due,
        totals.balance,
    ];
    for (col, value) in values.into_iter().enumerate() {
        summary.write_number_with_format(total_row, col as u16 + 1, value, &bold_money)?;
    }

    let categories = workbook.add_worksheet();
    categories.set_name("Categorias")?;
    categories.write_string_with_format(0, 0, "Categoria", &bold)?;
    categories.write_string_with_format(0, 1, "Total", &bold)?;
    categories.set_column_width(0, 24)?;
    for (i, (category, total)) in report.categories.iter().enumerate() {
        let row = i as u32 + 1;
        categories.write_string(row, 0, category)?;
        categories.write_number_with_format(row, 1, *total, &money)?;
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::tests::sample_report;

    #[test]
    fn test_workbook_is_written() {
        let bytes = write(&sample_report()).unwrap();
        assert!(bytes.starts_with(b"PK"));
        assert!(bytes.len() > 1_000);
    }
}
