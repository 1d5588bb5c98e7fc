//! Reconciling a new batch with a previously persisted collection.
//!
//! Records are keyed by reservation number. When both sides carry the same
//! non-empty key the later occurrence wins, so the incoming batch overrides
//! what was stored. Records with an empty key are never treated as duplicates
//! of anything and are always kept.

use std::collections::HashMap;

use rescrawl_core::{parse_date, RecordField, ReservationRecord};

use crate::error::ExportError;

/// Merge `incoming` into `persisted`, returning the new collection sorted by
/// date. Ties keep keyed records first, then empty-keyed ones, each in
/// concatenation order.
#[must_use]
pub fn merge(
    persisted: Vec<ReservationRecord>,
    incoming: Vec<ReservationRecord>,
) -> Vec<ReservationRecord> {
    let combined: Vec<ReservationRecord> = persisted.into_iter().chain(incoming).collect();

    let mut last_seen: HashMap<String, usize> = HashMap::new();
    for (index, record) in combined.iter().enumerate() {
        if let Some(key) = record.dedup_key() {
            last_seen.insert(key.to_string(), index);
        }
    }

    let (keyed, unkeyed): (Vec<_>, Vec<_>) = combined
        .into_iter()
        .enumerate()
        .partition(|(_, record)| record.dedup_key().is_some());

    let mut merged: Vec<ReservationRecord> = keyed
        .into_iter()
        .filter(|(index, record)| {
            record
                .dedup_key()
                .is_some_and(|key| last_seen.get(key) == Some(index))
        })
        .chain(unkeyed)
        .map(|(_, record)| record)
        .collect();
    merged.sort_by_key(|record| record.date);
    merged
}

/// Turn a header row plus data rows into records.
///
/// Headers may use either the sheet's column names or the export field
/// names, in any order; unknown columns are ignored. Fully blank rows are
/// skipped.
///
/// # Errors
///
/// [`ExportError::InvalidRow`] when there is no date column or a row's date
/// cannot be parsed.
pub fn rows_to_records(rows: &[Vec<String>]) -> Result<Vec<ReservationRecord>, ExportError> {
    let Some((header, body)) = rows.split_first() else {
        return Ok(Vec::new());
    };
    let columns: Vec<Option<RecordField>> =
        header.iter().map(|h| RecordField::from_header(h)).collect();
    let Some(date_column) = columns.iter().position(|c| *c == Some(RecordField::Date)) else {
        return Err(ExportError::InvalidRow {
            row: 1,
            reason: "header has no date column".to_string(),
        });
    };

    let mut records = Vec::with_capacity(body.len());
    for (offset, row) in body.iter().enumerate() {
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let row_number = offset + 2;
        let raw_date = row.get(date_column).map_or("", String::as_str);
        let date = parse_date(raw_date).map_err(|e| ExportError::InvalidRow {
            row: row_number,
            reason: e.to_string(),
        })?;

        let mut record = ReservationRecord::new(date);
        for (cell, column) in row.iter().zip(&columns) {
            if let Some(field) = column {
                record.set(*field, cell.clone());
            }
        }
        records.push(record);
    }
    Ok(records)
}

/// Header row plus one row per record, using the sheet's column names.
#[must_use]
pub fn records_to_sheet_rows(records: &[ReservationRecord]) -> Vec<Vec<String>> {
    std::iter::once(sheet_header())
        .chain(records.iter().map(ReservationRecord::to_row))
        .collect()
}

#[must_use]
pub fn sheet_header() -> Vec<String> {
    RecordField::ALL
        .iter()
        .map(|f| f.sheet_header().to_string())
        .collect()
}

#[cfg(test)]
#[path = "merge_test.rs"]
mod tests;
