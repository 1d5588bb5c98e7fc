//! Reading the bookings of one selected date.
//!
//! Once a date is selected the page shows a store heading. Opening it lists
//! one group per team; each group opens a detail view with the booking
//! fields, and the browser's back action returns to the list. Group handles
//! go stale on every return, so the list is re-read before the next group.

use chrono::NaiveDate;
use rescrawl_core::ReservationRecord;

use crate::engine::{settle, NavigationEngine, Pacing};
use crate::error::ScraperError;
use crate::locator::{FieldLocator, SiteLocators};

/// Text after the first `:`, trimmed. Text without a colon is only trimmed.
#[must_use]
pub fn strip_label(text: &str) -> &str {
    text.split_once(':').map_or(text, |(_, value)| value).trim()
}

pub struct ExtractionEngine<'a, E> {
    engine: &'a E,
    locators: &'a SiteLocators,
    pacing: Pacing,
}

impl<'a, E: NavigationEngine> ExtractionEngine<'a, E> {
    pub fn new(engine: &'a E, locators: &'a SiteLocators, pacing: Pacing) -> Self {
        Self {
            engine,
            locators,
            pacing,
        }
    }

    /// Read every team booking for `date`, which must already be selected.
    ///
    /// A store heading that never appears means no bookings and yields an
    /// empty list. Losing the way back from a detail view ends the date
    /// early but keeps what was read so far.
    ///
    /// # Errors
    ///
    /// Engine failures while opening the store or listing its groups.
    pub async fn extract(
        &self,
        date: NaiveDate,
        store_name: &str,
    ) -> Result<Vec<ReservationRecord>, ScraperError> {
        let store_locator = self.locators.store(store_name);
        let store = match self
            .engine
            .wait_for(&store_locator, self.pacing.explicit_wait)
            .await
        {
            Ok(store) => store,
            Err(err) if err.is_absence() => {
                tracing::info!(%date, store = store_name, "no reservations for date");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };
        self.engine.click(&store).await?;
        settle(self.pacing.long).await;

        let mut groups = self.team_groups().await?;
        let total = groups.len();
        if total == 0 {
            tracing::info!(%date, store = store_name, "store has no team groups");
            return Ok(Vec::new());
        }
        tracing::debug!(%date, teams = total, "reading team groups");

        let mut records = Vec::with_capacity(total);
        for index in 0..total {
            let Some(group) = groups.get(index) else {
                tracing::warn!(%date, index, found = groups.len(), "team group list shrank; stopping");
                break;
            };
            if let Err(err) = self.engine.click(group).await {
                tracing::warn!(%date, index, error = %err, "could not open team group; skipping");
                continue;
            }
            settle(self.pacing.medium).await;

            records.push(self.read_record(date).await);

            if let Err(err) = self.return_to_store().await {
                tracing::warn!(
                    %date,
                    index,
                    remaining = total - index - 1,
                    error = %err,
                    "lost the team list; keeping partial results for date"
                );
                break;
            }
            if index + 1 < total {
                groups = match self.team_groups().await {
                    Ok(groups) => groups,
                    Err(err) => {
                        tracing::warn!(%date, error = %err, "could not re-read team groups");
                        break;
                    }
                };
            }
        }

        tracing::info!(%date, records = records.len(), "date extracted");
        Ok(records)
    }

    /// Group containers that carry a team chip.
    async fn team_groups(&self) -> Result<Vec<E::Element>, ScraperError> {
        let mut groups = Vec::new();
        for candidate in self.engine.find_all(&self.locators.team_group).await? {
            let chips = self
                .engine
                .find_within(&candidate, &self.locators.team_chip)
                .await?;
            if !chips.is_empty() {
                groups.push(candidate);
            }
        }
        Ok(groups)
    }

    async fn return_to_store(&self) -> Result<(), ScraperError> {
        self.engine.back().await?;
        settle(self.pacing.medium).await;
        self.engine
            .wait_for(&self.locators.team_group, self.pacing.explicit_wait)
            .await?;
        Ok(())
    }

    async fn read_record(&self, date: NaiveDate) -> ReservationRecord {
        let mut record = ReservationRecord::new(date);
        for row in &self.locators.fields {
            match self.read_field(row).await {
                Some(value) => record.set(row.field, value),
                None => tracing::debug!(%date, field = %row.field, "detail field missing"),
            }
        }
        record
    }

    async fn read_field(&self, row: &FieldLocator) -> Option<String> {
        let element = match self.engine.try_find(&row.locator).await {
            Ok(element) => element?,
            Err(err) => {
                tracing::debug!(field = %row.field, error = %err, "field lookup failed");
                return None;
            }
        };
        match self.engine.text(&element).await {
            Ok(text) if row.strip_label => Some(strip_label(&text).to_string()),
            Ok(text) => Some(text.trim().to_string()),
            Err(err) => {
                tracing::debug!(field = %row.field, error = %err, "field text unreadable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rescrawl_core::RecordField;

    use super::*;
    use crate::simulated::{SimulatedBooking, SimulatedSite};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).expect("valid date")
    }

    #[test]
    fn strip_label_splits_on_first_colon_only() {
        assert_eq!(strip_label("Time Request: 12:00"), "12:00");
        assert_eq!(strip_label("AB: foo: bar"), "foo: bar");
        assert_eq!(strip_label("  no label  "), "no label");
        assert_eq!(strip_label("Product:"), "");
    }

    #[tokio::test]
    async fn absent_store_means_no_records() {
        let site = SimulatedSite::builder()
            .signed_in()
            .selected(d(2025, 12, 4))
            .build();
        let locators = SiteLocators::default();
        let engine = ExtractionEngine::new(&site, &locators, Pacing::immediate());

        let records = engine
            .extract(d(2025, 12, 4), SimulatedSite::STORE)
            .await
            .expect("extract");
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn reads_each_team_and_cleans_fields() {
        let date = d(2025, 12, 5);
        let site = SimulatedSite::builder()
            .signed_in()
            .selected(date)
            .booking(date, SimulatedBooking::new("A", "R-1"))
            .booking(
                date,
                SimulatedBooking::new("B", "R-2")
                    .with(RecordField::PeopleCount, "  Adult 2  ")
                    .with(RecordField::TimeRequest, "Time Request: 14:30"),
            )
            .build();
        let locators = SiteLocators::default();
        let engine = ExtractionEngine::new(&site, &locators, Pacing::immediate());

        let records = engine
            .extract(date, SimulatedSite::STORE)
            .await
            .expect("extract");

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.date == date));
        assert_eq!(records[0].team, "A");
        assert_eq!(records[1].reservation_number, "R-2");
        assert_eq!(records[1].people_count, "Adult 2");
        assert_eq!(records[1].time_request, "14:30");
    }

    #[tokio::test]
    async fn missing_field_leaves_it_empty() {
        let date = d(2025, 12, 5);
        let site = SimulatedSite::builder()
            .signed_in()
            .selected(date)
            .booking(
                date,
                SimulatedBooking::new("A", "R-1").without(RecordField::Country),
            )
            .build();
        let locators = SiteLocators::default();
        let engine = ExtractionEngine::new(&site, &locators, Pacing::immediate());

        let records = engine
            .extract(date, SimulatedSite::STORE)
            .await
            .expect("extract");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].country, "");
        assert_eq!(records[0].reservation_number, "R-1");
    }

    #[tokio::test]
    async fn broken_back_keeps_partial_results() {
        let date = d(2025, 12, 5);
        let site = SimulatedSite::builder()
            .signed_in()
            .selected(date)
            .booking(date, SimulatedBooking::new("A", "R-1"))
            .booking(date, SimulatedBooking::new("B", "R-2"))
            .booking(date, SimulatedBooking::new("C", "R-3"))
            .back_fails_after(1)
            .build();
        let locators = SiteLocators::default();
        let engine = ExtractionEngine::new(&site, &locators, Pacing::immediate());

        let records = engine
            .extract(date, SimulatedSite::STORE)
            .await
            .expect("partial results are not an error");
        let numbers: Vec<_> = records.iter().map(|r| r.reservation_number.as_str()).collect();
        assert_eq!(numbers, vec!["R-1", "R-2"]);
    }
}
