//! Crawl scenarios for `SessionController` against the simulated site.
//!
//! Every test runs with zero pacing and zero explicit waits, so an absent
//! element is decided by a single lookup.

use std::sync::Mutex;
use std::time::Duration;

use chrono::NaiveDate;
use rescrawl_core::{CrawlJob, CrawlMode};
use rescrawl_scraper::simulated::{SimulatedBooking, SimulatedSite};
use rescrawl_scraper::{
    CrawlObserver, Pacing, RetryPolicy, ScraperError, SessionController, SessionSettings,
    SiteLocators,
};
use tokio_util::sync::CancellationToken;

const BASE_URL: &str = "https://booking.example.test/";

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).expect("valid date")
}

fn settings() -> SessionSettings {
    SessionSettings {
        base_url: BASE_URL.to_string(),
        login_id: "crawler@example.test".to_string(),
        login_password: "hunter2".to_string(),
        pacing: Pacing::immediate(),
        login_policy: RetryPolicy::transient(3, Duration::ZERO),
        navigation_policy: RetryPolicy::transient(3, Duration::ZERO),
        failure_dir: None,
    }
}

fn job(start: NaiveDate, end: NaiveDate) -> CrawlJob {
    CrawlJob::new(start, end, SimulatedSite::STORE, CrawlMode::Daily).expect("valid job")
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn date_without_store_yields_nothing_and_next_date_yields_its_teams() {
    let site = SimulatedSite::builder()
        .booking(d(2025, 12, 5), SimulatedBooking::new("A", "R-1001"))
        .booking(d(2025, 12, 5), SimulatedBooking::new("B", "R-1002"))
        .build();
    let locators = SiteLocators::default();

    let report = SessionController::new(&site, &locators, settings())
        .run(&job(d(2025, 12, 4), d(2025, 12, 5)))
        .await
        .expect("crawl");

    assert_eq!(report.records.len(), 2);
    assert!(report.records.iter().all(|r| r.date == d(2025, 12, 5)));
    assert!(report.failures.is_empty());
    assert_eq!(report.dates_attempted, 2);
    assert!(!report.cancelled);
}

#[tokio::test]
async fn login_types_credentials_and_later_dates_reset_home() {
    let site = SimulatedSite::builder()
        .booking(d(2025, 12, 6), SimulatedBooking::new("A", "R-1"))
        .build();
    let locators = SiteLocators::default();

    SessionController::new(&site, &locators, settings())
        .run(&job(d(2025, 12, 4), d(2025, 12, 6)))
        .await
        .expect("crawl");

    assert_eq!(
        site.typed_values(),
        vec!["crawler@example.test".to_string(), "hunter2".to_string()]
    );
    // One load for login, then one reset for each date after the first.
    assert_eq!(site.opened_urls().len(), 3);
    assert!(site.opened_urls().iter().all(|u| u == BASE_URL));
}

#[tokio::test]
async fn store_with_no_teams_is_an_empty_date() {
    let site = SimulatedSite::builder().empty_store(d(2025, 12, 4)).build();
    let locators = SiteLocators::default();

    let report = SessionController::new(&site, &locators, settings())
        .run(&job(d(2025, 12, 4), d(2025, 12, 4)))
        .await
        .expect("crawl");

    assert!(report.records.is_empty());
    assert!(report.failures.is_empty());
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_recovers_from_a_slow_form() {
    let site = SimulatedSite::builder()
        .hide_login_form(2)
        .booking(d(2025, 12, 4), SimulatedBooking::new("A", "R-1"))
        .build();
    let locators = SiteLocators::default();

    let report = SessionController::new(&site, &locators, settings())
        .run(&job(d(2025, 12, 4), d(2025, 12, 4)))
        .await
        .expect("third login attempt succeeds");

    assert_eq!(report.records.len(), 1);
}

#[tokio::test]
async fn login_failure_aborts_the_job() {
    let site = SimulatedSite::builder()
        .hide_login_form(u32::MAX)
        .booking(d(2025, 12, 4), SimulatedBooking::new("A", "R-1"))
        .build();
    let locators = SiteLocators::default();

    let err = SessionController::new(&site, &locators, settings())
        .run(&job(d(2025, 12, 4), d(2025, 12, 5)))
        .await
        .unwrap_err();

    match err {
        ScraperError::Login { source } => {
            assert!(matches!(*source, ScraperError::Exhausted { attempts: 3, .. }));
        }
        other => panic!("expected a login failure, got {other:?}"),
    }
    assert_eq!(site.selected_date(), None);
}

// ---------------------------------------------------------------------------
// Per-date failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unreachable_month_fails_only_that_date() {
    let site = SimulatedSite::builder()
        .calendar_starts_at(d(2025, 12, 1))
        .booking(d(2028, 3, 1), SimulatedBooking::new("A", "R-1"))
        .build();
    let locators = SiteLocators::default();
    let job = CrawlJob::new(d(2025, 12, 1), d(2028, 3, 1), SimulatedSite::STORE, CrawlMode::Monthly)
        .expect("job");

    let report = SessionController::new(&site, &locators, settings())
        .run(&job)
        .await
        .expect("per-date failures do not fail the run");

    // 2025-12 through 2027-12 are within 24 steps of the starting month;
    // 2028-01 onward are not.
    assert_eq!(report.dates_attempted, 28);
    let failed: Vec<_> = report.failures.iter().map(|f| f.date).collect();
    assert_eq!(failed, vec![d(2028, 1, 1), d(2028, 2, 1), d(2028, 3, 1)]);
    assert!(report.failures[0].message.contains("24 month steps"));
    assert!(report.records.is_empty());
}

#[tokio::test]
async fn disabled_day_is_reported_and_the_run_continues() {
    let site = SimulatedSite::builder()
        .disable_day(d(2025, 12, 4))
        .booking(d(2025, 12, 4), SimulatedBooking::new("A", "R-1"))
        .booking(d(2025, 12, 5), SimulatedBooking::new("B", "R-2"))
        .build();
    let locators = SiteLocators::default();
    let dir = tempfile::tempdir().expect("temp dir");
    let settings = SessionSettings {
        failure_dir: Some(dir.path().join("failures")),
        ..settings()
    };

    let report = SessionController::new(&site, &locators, settings)
        .run(&job(d(2025, 12, 4), d(2025, 12, 5)))
        .await
        .expect("crawl");

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].date, d(2025, 12, 4));
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].reservation_number, "R-2");
    assert_eq!(
        site.screenshots(),
        vec![dir.path().join("failures").join("2025-12-04.png")]
    );
}

#[tokio::test]
async fn broken_back_navigation_keeps_partial_results_and_later_dates() {
    let site = SimulatedSite::builder()
        .booking(d(2025, 12, 4), SimulatedBooking::new("A", "R-1"))
        .booking(d(2025, 12, 4), SimulatedBooking::new("B", "R-2"))
        .booking(d(2025, 12, 5), SimulatedBooking::new("C", "R-3"))
        .back_fails_after(0)
        .build();
    let locators = SiteLocators::default();

    let report = SessionController::new(&site, &locators, settings())
        .run(&job(d(2025, 12, 4), d(2025, 12, 5)))
        .await
        .expect("crawl");

    let numbers: Vec<_> = report
        .records
        .iter()
        .map(|r| r.reservation_number.as_str())
        .collect();
    assert_eq!(numbers, vec!["R-1", "R-3"]);
    assert!(report.failures.is_empty());
}

// ---------------------------------------------------------------------------
// Observation and cancellation
// ---------------------------------------------------------------------------

struct CancelAfterFirst {
    token: CancellationToken,
    events: Mutex<Vec<String>>,
}

impl CrawlObserver for CancelAfterFirst {
    fn date_started(&self, date: NaiveDate, index: usize, total: usize) {
        self.events
            .lock()
            .expect("lock")
            .push(format!("start {date} {}/{total}", index + 1));
    }

    fn date_finished(&self, date: NaiveDate, records: usize) {
        self.events
            .lock()
            .expect("lock")
            .push(format!("done {date} {records}"));
        self.token.cancel();
    }
}

#[tokio::test]
async fn cancellation_stops_at_the_next_date_boundary() {
    let site = SimulatedSite::builder()
        .booking(d(2025, 12, 4), SimulatedBooking::new("A", "R-1"))
        .booking(d(2025, 12, 5), SimulatedBooking::new("B", "R-2"))
        .build();
    let locators = SiteLocators::default();
    let token = CancellationToken::new();
    let observer = CancelAfterFirst {
        token: token.clone(),
        events: Mutex::new(Vec::new()),
    };

    let report = SessionController::new(&site, &locators, settings())
        .with_observer(&observer)
        .with_cancellation(token)
        .run(&job(d(2025, 12, 4), d(2025, 12, 6)))
        .await
        .expect("crawl");

    assert!(report.cancelled);
    assert_eq!(report.dates_attempted, 1);
    assert_eq!(report.dates_total, 3);
    assert_eq!(report.records.len(), 1);
    assert_eq!(
        *observer.events.lock().expect("lock"),
        vec![
            "start 2025-12-04 1/3".to_string(),
            "done 2025-12-04 1".to_string()
        ]
    );
}
