//! The UI-automation capability the crawler drives.
//!
//! [`NavigationEngine`] is the seam between crawl logic and a concrete
//! browser. The crawl only ever holds one engine and issues one call at a
//! time; implementations may assume exclusive, sequential use.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use crate::error::ScraperError;
use crate::locator::Locator;

/// Poll interval used by the default [`NavigationEngine::wait_for`].
pub const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

pub trait NavigationEngine: Send + Sync {
    type Element: Send + Sync;

    /// Load `url` in the active view.
    fn open(&self, url: &str) -> impl Future<Output = Result<(), ScraperError>> + Send;

    /// First element matching `locator`, or [`ScraperError::ElementNotFound`].
    fn find(
        &self,
        locator: &Locator,
    ) -> impl Future<Output = Result<Self::Element, ScraperError>> + Send;

    /// All elements matching `locator`; empty when nothing matches.
    fn find_all(
        &self,
        locator: &Locator,
    ) -> impl Future<Output = Result<Vec<Self::Element>, ScraperError>> + Send;

    /// All descendants of `parent` matching `locator`.
    fn find_within(
        &self,
        parent: &Self::Element,
        locator: &Locator,
    ) -> impl Future<Output = Result<Vec<Self::Element>, ScraperError>> + Send;

    fn click(&self, element: &Self::Element)
        -> impl Future<Output = Result<(), ScraperError>> + Send;

    /// Replace the element's input value with `text`.
    fn type_text(
        &self,
        element: &Self::Element,
        text: &str,
    ) -> impl Future<Output = Result<(), ScraperError>> + Send;

    /// Rendered text of the element.
    fn text(&self, element: &Self::Element)
        -> impl Future<Output = Result<String, ScraperError>> + Send;

    fn attribute(
        &self,
        element: &Self::Element,
        name: &str,
    ) -> impl Future<Output = Result<Option<String>, ScraperError>> + Send;

    fn current_location(&self) -> impl Future<Output = Result<String, ScraperError>> + Send;

    /// Step back in the view history.
    fn back(&self) -> impl Future<Output = Result<(), ScraperError>> + Send;

    fn screenshot(&self, path: &Path) -> impl Future<Output = Result<(), ScraperError>> + Send;

    /// Like [`find`](Self::find), but absence is `Ok(None)` instead of an error.
    fn try_find(
        &self,
        locator: &Locator,
    ) -> impl Future<Output = Result<Option<Self::Element>, ScraperError>> + Send {
        async move {
            match self.find(locator).await {
                Ok(element) => Ok(Some(element)),
                Err(ScraperError::ElementNotFound { .. }) => Ok(None),
                Err(e) => Err(e),
            }
        }
    }

    /// Block until `locator` matches or `timeout` elapses.
    ///
    /// The default polls [`find`](Self::find) every [`WAIT_POLL_INTERVAL`];
    /// at least one lookup is always made, even with a zero timeout.
    fn wait_for(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> impl Future<Output = Result<Self::Element, ScraperError>> + Send {
        async move {
            let started = tokio::time::Instant::now();
            loop {
                if let Some(element) = self.try_find(locator).await? {
                    return Ok(element);
                }
                let elapsed = started.elapsed();
                if elapsed >= timeout {
                    return Err(ScraperError::Timeout {
                        locator: locator.to_string(),
                        waited_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    });
                }
                tokio::time::sleep(WAIT_POLL_INTERVAL.min(timeout - elapsed)).await;
            }
        }
    }
}

/// Settle delays inserted after UI-mutating actions, plus the explicit-wait
/// budget for elements that render asynchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub short: Duration,
    pub medium: Duration,
    pub long: Duration,
    /// After each calendar month step.
    pub step: Duration,
    pub explicit_wait: Duration,
}

impl Pacing {
    /// No delays and no waiting; for simulated engines.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            short: Duration::ZERO,
            medium: Duration::ZERO,
            long: Duration::ZERO,
            step: Duration::ZERO,
            explicit_wait: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn from_app_config(config: &rescrawl_core::AppConfig) -> Self {
        Self {
            short: Duration::from_millis(config.short_delay_ms),
            medium: Duration::from_millis(config.medium_delay_ms),
            long: Duration::from_millis(config.long_delay_ms),
            step: Duration::from_millis(config.step_delay_ms),
            explicit_wait: Duration::from_secs(config.explicit_wait_secs),
        }
    }
}

/// Sleep for `delay`, skipping the timer entirely for zero.
pub(crate) async fn settle(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
