//! Yearly report export.
//!
//! Three writers share one entry point: [`export_report`] picks the writer for
//! the requested [`ExportFormat`] and names the file `relatorio-<year>.<ext>`.

mod csv;
mod pdf;
mod xlsx;

use std::fmt;
use std::str::FromStr;

use tracing::info;

use crate::error::{Result, ServiceError};
use crate::reports::YearlyReport;

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Header row shared by the tabular writers.
pub(crate) const SUMMARY_HEADERS: [&str; 7] = [
    "Mês",
    "Receita bruta",
    "Imposto",
    "Receita líquida",
    "Despesas pagas",
    "Parcelas",
    "Saldo",
];

/// Output formats supported by the export page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Xlsx,
    Csv,
    Pdf,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => XLSX_CONTENT_TYPE,
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xlsx" => Ok(ExportFormat::Xlsx),
            "csv" => Ok(ExportFormat::Csv),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(ServiceError::invalid(format!(
                "Formato de exportação desconhecido: {other}"
            ))),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A rendered report ready to be sent as an attachment.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Render `report` in the requested format.
pub fn export_report(report: &YearlyReport, format: ExportFormat) -> Result<ExportFile> {
    let bytes = match format {
        ExportFormat::Xlsx => xlsx::write(report)?,
        ExportFormat::Csv => csv::write(report)?,
        ExportFormat::Pdf => pdf::write(report)?,
    };

    info!(year = report.year, %format, size = bytes.len(), "Report exported");

    Ok(ExportFile {
        file_name: format!("relatorio-{}.{}", report.year, format.extension()),
        content_type: format.content_type(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::{MonthlySummary, ReportTotals};
    use finance_core::Period;

    pub(crate) fn sample_report() -> YearlyReport {
        let months = Period::year_months(2025)
            .map(|period| MonthlySummary {
                period,
                income_gross: 10_000.0,
                tax: 600.0,
                income_net: 9_400.0,
                expenses_paid: 3_000.0,
                installments_due: 200.0,
                balance: 6_200.0,
            })
            .collect();

        YearlyReport {
            year: 2025,
            owner_name: "Ana".to_string(),
            months,
            categories: vec![("Moradia".to_string(), 18_000.0), ("Lazer".to_string(), 1_200.0)],
            totals: ReportTotals {
                income_gross: 120_000.0,
                tax: 7_200.0,
                income_net: 112_800.0,
                expenses_paid: 36_000.0,
                installments_due: 2_400.0,
                balance: 74_400.0,
            },
        }
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("XLSX".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
        assert_eq!(" csv ".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("pdf".parse::<ExportFormat>().unwrap(), ExportFormat::Pdf);
        assert!(matches!(
            "docx".parse::<ExportFormat>(),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_file_naming() {
        let report = sample_report();
        let file = export_report(&report, ExportFormat::Csv).unwrap();
        assert_eq!(file.file_name, "relatorio-2025.csv");
        assert_eq!(file.content_type, "text/csv; charset=utf-8");

        let file = export_report(&report, ExportFormat::Pdf).unwrap();
        assert_eq!(file.file_name, "relatorio-2025.pdf");
        assert!(file.bytes.starts_with(b"%PDF"));

        let file = export_report(&report, ExportFormat::Xlsx).unwrap();
        assert_eq!(file.file_name, "relatorio-2025.xlsx");
        // XLSX is a zip archive
        assert!(file.bytes.starts_with(b"PK"));
    }
}
