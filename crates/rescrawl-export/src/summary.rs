use std::collections::BTreeMap;

use chrono::NaiveDate;
use rescrawl_core::ReservationRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Counts over a record set. Maps are sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_count: usize,
    /// `None` for an empty record set.
    pub date_range: Option<DateRange>,
    pub by_date: BTreeMap<NaiveDate, usize>,
    pub by_team: BTreeMap<String, usize>,
    pub by_channel: BTreeMap<String, usize>,
    pub by_country: BTreeMap<String, usize>,
}

#[must_use]
pub fn summarize(records: &[ReservationRecord]) -> Summary {
    let mut summary = Summary {
        total_count: records.len(),
        ..Summary::default()
    };
    for record in records {
        *summary.by_date.entry(record.date).or_default() += 1;
        *summary.by_team.entry(record.team.clone()).or_default() += 1;
        *summary.by_channel.entry(record.channel.clone()).or_default() += 1;
        *summary.by_country.entry(record.country.clone()).or_default() += 1;
    }
    let first = summary.by_date.keys().next().copied();
    let last = summary.by_date.keys().next_back().copied();
    if let (Some(start), Some(end)) = (first, last) {
        summary.date_range = Some(DateRange { start, end });
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(day: u32, team: &str, channel: &str) -> ReservationRecord {
        let mut record =
            ReservationRecord::new(NaiveDate::from_ymd_opt(2025, 12, day).expect("valid date"));
        record.team = team.to_string();
        record.channel = channel.to_string();
        record.country = "KR".to_string();
        record
    }

    #[test]
    fn counts_by_each_dimension() {
        let records = vec![rec(5, "A", "K"), rec(4, "B", "K"), rec(5, "A", "G")];
        let summary = summarize(&records);

        assert_eq!(summary.total_count, 3);
        let range = summary.date_range.expect("range");
        assert_eq!(range.start.to_string(), "2025-12-04");
        assert_eq!(range.end.to_string(), "2025-12-05");
        assert_eq!(summary.by_team["A"], 2);
        assert_eq!(summary.by_channel["G"], 1);
        assert_eq!(summary.by_country["KR"], 3);
    }

    #[test]
    fn empty_set_has_no_range() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_count, 0);
        assert!(summary.date_range.is_none());
        assert!(summary.by_date.is_empty());
    }

    #[test]
    fn serializes_dates_as_map_keys() {
        let summary = summarize(&[rec(5, "A", "K")]);
        let json = serde_json::to_value(&summary).expect("json");
        assert_eq!(json["by_date"]["2025-12-05"], 1);
        assert_eq!(json["date_range"]["start"], "2025-12-05");
    }
}
