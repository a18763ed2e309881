use printpdf::{BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point};

use crate::error::{Result, ServiceError};
use crate::reports::YearlyReport;
use finance_core::money::format_brl;

const LEFT: f32 = 15.0;
const RIGHT: f32 = 195.0;
const COLUMNS: [f32; 7] = [15.0, 50.0, 78.0, 104.0, 132.0, 158.0, 180.0];
const HEADERS: [&str; 7] = [
    "Mês", "Bruto", "Imposto", "Líquido", "Despesas", "Parcelas", "Saldo",
];

fn export_error(err: impl std::fmt::Display) -> ServiceError {
    ServiceError::Export(err.to_string())
}

fn text(layer: &PdfLayerReference, font: &IndirectFontRef, value: &str, size: f32, x: f32, y: f32) {
    layer.use_text(value, size, Mm(x), Mm(y), font);
}

fn rule(layer: &PdfLayerReference, y: f32) {
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(LEFT), Mm(y)), false),
            (Point::new(Mm(RIGHT), Mm(y)), false),
        ],
        is_closed: false,
    });
}

fn row(layer: &PdfLayerReference, font: &IndirectFontRef, cells: &[String], y: f32) {
    for (cell, x) in cells.iter().zip(COLUMNS) {
        text(layer, font, cell, 8.0, x, y);
    }
}

/// Single A4 page: monthly table, totals, category breakdown.
pub(super) fn write(report: &YearlyReport) -> Result<Vec<u8>> {
    let title = format!("Relatório financeiro {}", report.year);
    let (doc, page, layer) = PdfDocument::new(&title, Mm(210.0), Mm(297.0), "Layer 1");
    let layer = doc.get_page(page).get_layer(layer);

    let font = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(export_error)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(export_error)?;

    let mut y: f32 = 280.0;
    text(&layer, &bold, &title, 16.0, LEFT, y);
    y -= 7.0;
    text(&layer, &font, &report.owner_name, 10.0, LEFT, y);

    y -= 10.0;
    let headers: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
    row(&layer, &bold, &headers, y);
    y -= 2.0;
    rule(&layer, y);

    for month in &report.months {
        y -= 6.0;
        let cells = [
            month.period.month_name().to_string(),
            format_brl(month.income_gross),
            format_brl(month.tax),
            format_brl(month.income_net),
            format_brl(month.expenses_paid),
            format_brl(month.installments_due),
            format_brl(month.balance),
        ];
        row(&layer, &font, &cells, y);
    }

    y -= 3.0;
    rule(&layer, y);
    y -= 6.0;
    let totals = &report.totals;
    let cells = [
        "Total".to_string(),
        format_brl(totals.income_gross),
        format_brl(totals.tax),
        format_brl(totals.income_net),
        format_brl(totals.expenses_paid),
        format_brl(totals.installments_due),
        format_brl(totals.balance),
    ];
    row(&layer, &bold, &cells, y);

    y -= 14.0;
    text(&layer, &bold, "Despesas por categoria", 12.0, LEFT, y);
    for (category, total) in &report.categories {
        y -= 6.0;
        if y < 15.0 {
            break;
        }
        text(&layer, &font, category, 9.0, LEFT, y);
        text(&layer, &font, &format_brl(*total), 9.0, 104.0, y);
    }

    let mut writer = std::io::BufWriter::new(Vec::<u8>::new());
    doc.save(&mut writer).map_err(export_error)?;
    writer.into_inner().map_err(export_error)
}
