//! One crawl job from login to the last date.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use rescrawl_core::{AppConfig, CrawlJob, ReservationRecord};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::calendar::DateNavigator;
use crate::engine::{settle, NavigationEngine, Pacing};
use crate::error::ScraperError;
use crate::extract::ExtractionEngine;
use crate::locator::SiteLocators;
use crate::resilience::{with_retry, RetryPolicy};

/// Everything a session needs besides the engine and the site table.
#[derive(Clone)]
pub struct SessionSettings {
    pub base_url: String,
    pub login_id: String,
    pub login_password: String,
    pub pacing: Pacing,
    pub login_policy: RetryPolicy,
    pub navigation_policy: RetryPolicy,
    /// Where per-date failure screenshots go; `None` disables them.
    pub failure_dir: Option<PathBuf>,
}

impl SessionSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            login_id: config.login_id.clone(),
            login_password: config.login_password.clone(),
            pacing: Pacing::from_app_config(config),
            login_policy: RetryPolicy::transient(
                config.login_max_attempts,
                Duration::from_millis(config.login_retry_delay_ms),
            ),
            navigation_policy: RetryPolicy::transient(
                config.nav_max_attempts,
                Duration::from_millis(config.nav_retry_delay_ms),
            ),
            failure_dir: Some(config.output_dir.join("failures")),
        }
    }
}

impl std::fmt::Debug for SessionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSettings")
            .field("base_url", &self.base_url)
            .field("login_id", &self.login_id)
            .field("login_password", &"[redacted]")
            .field("pacing", &self.pacing)
            .field("login_policy", &self.login_policy)
            .field("navigation_policy", &self.navigation_policy)
            .field("failure_dir", &self.failure_dir)
            .finish()
    }
}

/// A date that could not be crawled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateFailure {
    pub date: NaiveDate,
    pub message: String,
}

/// Outcome of [`SessionController::run`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlReport {
    pub records: Vec<ReservationRecord>,
    pub failures: Vec<DateFailure>,
    pub dates_attempted: usize,
    pub dates_total: usize,
    /// The run stopped at a date boundary because it was cancelled.
    pub cancelled: bool,
}

/// Progress callbacks, invoked from the crawl loop between dates.
pub trait CrawlObserver: Send + Sync {
    fn date_started(&self, _date: NaiveDate, _index: usize, _total: usize) {}
    fn date_finished(&self, _date: NaiveDate, _records: usize) {}
    fn date_failed(&self, _date: NaiveDate, _error: &ScraperError) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl CrawlObserver for NoopObserver {}

pub struct SessionController<'a, E> {
    engine: &'a E,
    locators: &'a SiteLocators,
    settings: SessionSettings,
    observer: &'a dyn CrawlObserver,
    cancel: CancellationToken,
}

impl<'a, E: NavigationEngine> SessionController<'a, E> {
    pub fn new(engine: &'a E, locators: &'a SiteLocators, settings: SessionSettings) -> Self {
        Self {
            engine,
            locators,
            settings,
            observer: &NoopObserver,
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: &'a dyn CrawlObserver) -> Self {
        self.observer = observer;
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Log in once, then crawl every date of `job` in order.
    ///
    /// A failing date is logged, reported to the observer, and recorded in
    /// [`CrawlReport::failures`]; the loop carries on with the next one.
    ///
    /// # Errors
    ///
    /// [`ScraperError::Login`] when the session cannot be established.
    pub async fn run(&self, job: &CrawlJob) -> Result<CrawlReport, ScraperError> {
        self.login()
            .await
            .map_err(|source| ScraperError::Login {
                source: Box::new(source),
            })?;

        let dates = job.dates();
        let mut report = CrawlReport {
            dates_total: dates.len(),
            ..CrawlReport::default()
        };

        for (index, &date) in dates.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::info!(%date, remaining = dates.len() - index, "crawl cancelled");
                report.cancelled = true;
                break;
            }

            self.observer.date_started(date, index, dates.len());
            report.dates_attempted += 1;

            match self.crawl_date(date, &job.store_name, index == 0).await {
                Ok(records) => {
                    self.observer.date_finished(date, records.len());
                    report.records.extend(records);
                }
                Err(err) => {
                    tracing::warn!(%date, error = %err, "date failed; continuing with next date");
                    self.capture_failure(date).await;
                    self.observer.date_failed(date, &err);
                    report.failures.push(DateFailure {
                        date,
                        message: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            records = report.records.len(),
            failed_dates = report.failures.len(),
            attempted = report.dates_attempted,
            total = report.dates_total,
            cancelled = report.cancelled,
            "crawl finished"
        );
        Ok(report)
    }

    async fn login(&self) -> Result<(), ScraperError> {
        with_retry(self.settings.login_policy, "login", || self.login_once()).await?;
        tracing::info!(login_id = %self.settings.login_id, "logged in");
        Ok(())
    }

    async fn login_once(&self) -> Result<(), ScraperError> {
        let pacing = self.settings.pacing;
        self.engine.open(&self.settings.base_url).await?;

        let email = self
            .engine
            .wait_for(&self.locators.login_email, pacing.explicit_wait)
            .await?;
        self.engine.type_text(&email, &self.settings.login_id).await?;

        let password = self.engine.find(&self.locators.login_password).await?;
        self.engine
            .type_text(&password, &self.settings.login_password)
            .await?;

        let submit = self.engine.find(&self.locators.login_submit).await?;
        self.engine.click(&submit).await?;
        settle(pacing.long).await;
        Ok(())
    }

    async fn crawl_date(
        &self,
        date: NaiveDate,
        store_name: &str,
        first: bool,
    ) -> Result<Vec<ReservationRecord>, ScraperError> {
        let pacing = self.settings.pacing;
        if !first {
            self.engine.open(&self.settings.base_url).await?;
            settle(pacing.medium).await;
        }

        DateNavigator::new(
            self.engine,
            self.locators,
            pacing,
            self.settings.navigation_policy,
        )
        .select_date(date)
        .await?;

        ExtractionEngine::new(self.engine, self.locators, pacing)
            .extract(date, store_name)
            .await
    }

    async fn capture_failure(&self, date: NaiveDate) {
        let Some(dir) = &self.settings.failure_dir else {
            return;
        };
        if let Err(err) = tokio::fs::create_dir_all(dir).await {
            tracing::debug!(dir = %dir.display(), error = %err, "cannot create screenshot dir");
            return;
        }
        let path = dir.join(format!("{date}.png"));
        match self.engine.screenshot(&path).await {
            Ok(()) => tracing::info!(%date, path = %path.display(), "saved failure screenshot"),
            Err(err) => tracing::debug!(%date, error = %err, "failure screenshot not saved"),
        }
    }
}
