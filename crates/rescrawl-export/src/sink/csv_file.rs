use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use rescrawl_core::{RecordField, ReservationRecord};

use crate::error::ExportError;
use crate::merge::rows_to_records;

/// Spreadsheet apps need the BOM to detect UTF-8 in CSV files.
const UTF8_BOM: &str = "\u{feff}";

pub(super) fn write_new(path: &Path, records: &[ReservationRecord]) -> Result<(), ExportError> {
    let mut file = File::create(path).map_err(|e| ExportError::io(path, e))?;
    file.write_all(UTF8_BOM.as_bytes())
        .map_err(|e| ExportError::io(path, e))?;

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(RecordField::ALL.iter().map(|f| f.key()))?;
    for record in records {
        writer.write_record(record.to_row())?;
    }
    writer.flush().map_err(|e| ExportError::io(path, e))?;
    Ok(())
}

pub(super) fn append(path: &Path, records: &[ReservationRecord]) -> Result<(), ExportError> {
    let file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| ExportError::io(path, e))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    for record in records {
        writer.write_record(record.to_row())?;
    }
    writer.flush().map_err(|e| ExportError::io(path, e))?;
    Ok(())
}

pub(super) fn read(path: &Path) -> Result<Vec<ReservationRecord>, ExportError> {
    let content = fs::read_to_string(path).map_err(|e| ExportError::io(path, e))?;
    let content = content.strip_prefix(UTF8_BOM).unwrap_or(&content);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());
    let mut rows = Vec::new();
    for row in reader.records() {
        rows.push(row?.iter().map(str::to_string).collect::<Vec<_>>());
    }
    rows_to_records(&rows)
}
