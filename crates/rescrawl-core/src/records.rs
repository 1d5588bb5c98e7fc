//! Reservation records as they come out of a crawl.
//!
//! A [`ReservationRecord`] is one booking read from one team detail view.
//! Every attribute except `date` is free text and may be empty when the
//! detail view did not show it. The identity key is `reservation_number`;
//! an empty number never identifies anything.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single extracted booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRecord {
    pub date: NaiveDate,
    #[serde(default)]
    pub team: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub reservation_number: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub people_count: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub time_request: String,
}

impl ReservationRecord {
    /// An all-empty record for `date`.
    #[must_use]
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            team: String::new(),
            customer_name: String::new(),
            reservation_number: String::new(),
            channel: String::new(),
            people_count: String::new(),
            country: String::new(),
            product: String::new(),
            time_request: String::new(),
        }
    }

    /// The dedup key, or `None` when the reservation number is empty.
    ///
    /// The number is compared exactly as stored, so whitespace is part of
    /// the key.
    #[must_use]
    pub fn dedup_key(&self) -> Option<&str> {
        let key = self.reservation_number.as_str();
        (!key.is_empty()).then_some(key)
    }

    /// Text value of a field. `Date` renders as `YYYY-MM-DD`.
    #[must_use]
    pub fn get(&self, field: RecordField) -> String {
        match field {
            RecordField::Date => self.date.format("%Y-%m-%d").to_string(),
            RecordField::Team => self.team.clone(),
            RecordField::CustomerName => self.customer_name.clone(),
            RecordField::ReservationNumber => self.reservation_number.clone(),
            RecordField::Channel => self.channel.clone(),
            RecordField::PeopleCount => self.people_count.clone(),
            RecordField::Country => self.country.clone(),
            RecordField::Product => self.product.clone(),
            RecordField::TimeRequest => self.time_request.clone(),
        }
    }

    /// Sets a text field. Setting `Date` is a no-op; the date is fixed at
    /// construction.
    pub fn set(&mut self, field: RecordField, value: String) {
        let slot = match field {
            RecordField::Date => return,
            RecordField::Team => &mut self.team,
            RecordField::CustomerName => &mut self.customer_name,
            RecordField::ReservationNumber => &mut self.reservation_number,
            RecordField::Channel => &mut self.channel,
            RecordField::PeopleCount => &mut self.people_count,
            RecordField::Country => &mut self.country,
            RecordField::Product => &mut self.product,
            RecordField::TimeRequest => &mut self.time_request,
        };
        *slot = value;
    }

    /// All fields in column order.
    #[must_use]
    pub fn to_row(&self) -> Vec<String> {
        RecordField::ALL.iter().map(|f| self.get(*f)).collect()
    }
}

/// The columns of a [`ReservationRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordField {
    Date,
    Team,
    CustomerName,
    ReservationNumber,
    Channel,
    PeopleCount,
    Country,
    Product,
    TimeRequest,
}

impl RecordField {
    /// Column order used by every export format.
    pub const ALL: [RecordField; 9] = [
        RecordField::Date,
        RecordField::Team,
        RecordField::CustomerName,
        RecordField::ReservationNumber,
        RecordField::Channel,
        RecordField::PeopleCount,
        RecordField::Country,
        RecordField::Product,
        RecordField::TimeRequest,
    ];

    /// Field name used in file exports.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            RecordField::Date => "date",
            RecordField::Team => "team",
            RecordField::CustomerName => "customer_name",
            RecordField::ReservationNumber => "reservation_number",
            RecordField::Channel => "channel",
            RecordField::PeopleCount => "people_count",
            RecordField::Country => "country",
            RecordField::Product => "product",
            RecordField::TimeRequest => "time_request",
        }
    }

    /// Column header used by the shared booking sheet.
    #[must_use]
    pub fn sheet_header(self) -> &'static str {
        match self {
            RecordField::Date => "날짜",
            RecordField::Team => "팀",
            RecordField::CustomerName => "고객명",
            RecordField::ReservationNumber => "예약번호",
            RecordField::Channel => "채널",
            RecordField::PeopleCount => "인원구분",
            RecordField::Country => "국가",
            RecordField::Product => "예약상품",
            RecordField::TimeRequest => "예약시간",
        }
    }

    /// Resolves either naming (export key or sheet header) to a field.
    #[must_use]
    pub fn from_header(header: &str) -> Option<Self> {
        let header = header.trim().trim_start_matches('\u{feff}');
        Self::ALL
            .into_iter()
            .find(|f| f.key() == header || f.sheet_header() == header)
    }
}

impl std::fmt::Display for RecordField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 5).expect("valid date")
    }

    #[test]
    fn only_an_empty_reservation_number_has_no_key() {
        let mut record = ReservationRecord::new(date());
        assert_eq!(record.dedup_key(), None);
        record.reservation_number = "   ".to_string();
        assert_eq!(record.dedup_key(), Some("   "));
        record.reservation_number = " R-1001".to_string();
        assert_eq!(record.dedup_key(), Some(" R-1001"));
        record.reservation_number = "R-1001".to_string();
        assert_eq!(record.dedup_key(), Some("R-1001"));
    }

    #[test]
    fn set_and_get_follow_the_same_field() {
        let mut record = ReservationRecord::new(date());
        for field in RecordField::ALL.into_iter().skip(1) {
            record.set(field, format!("value-{field}"));
        }
        assert_eq!(record.get(RecordField::Date), "2025-12-05");
        assert_eq!(record.get(RecordField::Country), "value-country");
        assert_eq!(record.time_request, "value-time_request");
    }

    #[test]
    fn from_header_accepts_both_namings() {
        assert_eq!(
            RecordField::from_header("예약번호"),
            Some(RecordField::ReservationNumber)
        );
        assert_eq!(
            RecordField::from_header("reservation_number"),
            Some(RecordField::ReservationNumber)
        );
        assert_eq!(RecordField::from_header("\u{feff}date"), Some(RecordField::Date));
        assert_eq!(RecordField::from_header("notes"), None);
    }

    #[test]
    fn record_serializes_date_as_iso_string() {
        let record = ReservationRecord::new(date());
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["date"], "2025-12-05");
        assert_eq!(json["reservation_number"], "");
    }

    #[test]
    fn to_row_follows_column_order() {
        let mut record = ReservationRecord::new(date());
        record.team = "A".to_string();
        record.time_request = "12:00".to_string();
        let row = record.to_row();
        assert_eq!(row.len(), 9);
        assert_eq!(row[0], "2025-12-05");
        assert_eq!(row[1], "A");
        assert_eq!(row[8], "12:00");
    }
}
