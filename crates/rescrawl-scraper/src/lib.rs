//! Crawling the booking calendar: navigation, extraction, and the session
//! loop that ties them together.
//!
//! Everything here is written against [`NavigationEngine`]. [`ChromeEngine`]
//! drives a real browser; with the `testing` feature, `simulated` provides an
//! in-memory site for scenario tests.

pub mod browser;
pub mod calendar;
pub mod engine;
pub mod error;
pub mod extract;
pub mod locator;
pub mod resilience;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod simulated;

pub use browser::{ChromeEngine, ChromeOptions};
pub use calendar::{CalendarState, DateNavigator, MAX_MONTH_STEPS};
pub use engine::{NavigationEngine, Pacing};
pub use error::{ErrorKind, ScraperError};
pub use extract::{strip_label, ExtractionEngine};
pub use locator::{load_site_locators, FieldLocator, Locator, SiteLocators};
pub use resilience::{with_retry, with_retry_observed, RetryPolicy};
pub use session::{
    CrawlObserver, CrawlReport, DateFailure, NoopObserver, SessionController, SessionSettings,
};
