use std::path::Path;

use rescrawl_core::{RecordField, ReservationRecord};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, FormatPattern, Workbook};

use crate::error::ExportError;

const SHEET_NAME: &str = "Reservations";

/// Display width in cells, counting wide (non-ASCII) characters twice.
fn display_width(text: &str) -> usize {
    text.chars().map(|c| if c.is_ascii() { 1 } else { 2 }).sum()
}

pub(super) fn write(path: &Path, records: &[ReservationRecord]) -> Result<(), ExportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(0x4472C4))
        .set_pattern(FormatPattern::Solid)
        .set_align(FormatAlign::Center)
        .set_border(FormatBorder::Thin);
    let cell_format = Format::new().set_border(FormatBorder::Thin);

    let mut widths: Vec<usize> = RecordField::ALL
        .iter()
        .map(|f| display_width(f.key()))
        .collect();

    for (col, field) in (0u16..).zip(RecordField::ALL) {
        worksheet.write_with_format(0, col, field.key(), &header_format)?;
    }
    for (row, record) in (1u32..).zip(records) {
        for ((col, value), width) in (0u16..).zip(record.to_row()).zip(widths.iter_mut()) {
            *width = (*width).max(display_width(&value));
            worksheet.write_with_format(row, col, value, &cell_format)?;
        }
    }
    for (col, width) in (0u16..).zip(&widths) {
        #[allow(clippy::cast_precision_loss)]
        worksheet.set_column_width(col, (*width).min(60) as f64 + 2.0)?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    workbook.save(path)?;
    Ok(())
}
