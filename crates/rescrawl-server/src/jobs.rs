//! The single crawl job the server runs at a time.
//!
//! [`JobManager`] owns the job status behind a mutex and admits at most one
//! running job; a start request while one is running is rejected, never
//! queued. The work itself is done by a [`JobExecutor`], which reports
//! progress through [`JobProgress`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use futures::future::BoxFuture;
use rescrawl_core::{parse_date, CrawlJob, CrawlMode};
use rescrawl_export::OutputFormat;
use rescrawl_scraper::{CrawlObserver, DateFailure, ScraperError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Body of a start request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StartRequest {
    pub store_name: Option<String>,
    pub start_date: String,
    /// Defaults to `start_date`.
    pub end_date: Option<String>,
    pub mode: CrawlMode,
    pub output_format: OutputFormat,
    pub sync_to_sheet: bool,
    pub sheet_url: Option<String>,
}

/// Where to sync results; `url` falls back to the configured sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTarget {
    pub url: Option<String>,
}

/// A validated job, ready to run.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub job: CrawlJob,
    pub output_format: OutputFormat,
    pub sheet: Option<SheetTarget>,
}

impl JobRequest {
    /// # Errors
    ///
    /// [`StartError::InvalidDate`] for unparseable dates or a reversed range.
    pub fn from_start(request: StartRequest, default_store: &str) -> Result<Self, StartError> {
        let invalid = |e: rescrawl_core::CoreError| StartError::InvalidDate(e.to_string());
        let start = parse_date(&request.start_date).map_err(invalid)?;
        let end = match request.end_date.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(raw) => parse_date(raw).map_err(invalid)?,
            None => start,
        };
        let store_name = request
            .store_name
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| default_store.to_string());
        let job = CrawlJob::new(start, end, store_name, request.mode).map_err(invalid)?;
        Ok(Self {
            job,
            output_format: request.output_format,
            sheet: request.sync_to_sheet.then(|| SheetTarget {
                url: request.sheet_url.filter(|s| !s.trim().is_empty()),
            }),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    #[error("already running")]
    AlreadyRunning,

    #[error("invalid date: {0}")]
    InvalidDate(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobStatus {
    pub running: bool,
    /// Dates finished so far.
    pub progress: usize,
    pub total: usize,
    pub current_date: Option<NaiveDate>,
    pub message: String,
    pub result_file: Option<String>,
    pub records_collected: usize,
    pub failed_dates: Vec<DateFailure>,
}

/// What a finished job produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobOutcome {
    pub records: usize,
    pub result_file: Option<String>,
    pub message: String,
}

pub trait JobExecutor: Send + Sync + 'static {
    fn execute(
        &self,
        request: JobRequest,
        progress: JobProgress,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, anyhow::Result<JobOutcome>>;
}

type SharedStatus = Arc<Mutex<JobStatus>>;
type SharedToken = Arc<Mutex<Option<CancellationToken>>>;

fn lock(status: &SharedStatus) -> MutexGuard<'_, JobStatus> {
    status.lock().unwrap_or_else(PoisonError::into_inner)
}

fn lock_cancel(cancel: &SharedToken) -> MutexGuard<'_, Option<CancellationToken>> {
    cancel.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Record a job's result. The token is cleared before `running` flips, both
/// under the status lock.
fn finish(status: &SharedStatus, cancel: &SharedToken, result: anyhow::Result<JobOutcome>) {
    let mut status = lock(status);
    *lock_cancel(cancel) = None;
    status.running = false;
    status.current_date = None;
    match result {
        Ok(outcome) => {
            tracing::info!(records = outcome.records, message = %outcome.message, "job finished");
            status.records_collected = outcome.records;
            status.result_file = outcome.result_file;
            status.message = outcome.message;
        }
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "job failed");
            status.message = format!("failed: {err:#}");
        }
    }
}

/// Write access to the running job's status for the crawl loop.
#[derive(Clone)]
pub struct JobProgress {
    status: SharedStatus,
}

impl JobProgress {
    pub fn set_message(&self, message: impl Into<String>) {
        lock(&self.status).message = message.into();
    }
}

impl CrawlObserver for JobProgress {
    fn date_started(&self, date: NaiveDate, index: usize, total: usize) {
        let mut status = lock(&self.status);
        status.progress = index;
        status.total = total;
        status.current_date = Some(date);
        status.message = format!("crawling {date} ({}/{total})", index + 1);
    }

    fn date_finished(&self, date: NaiveDate, records: usize) {
        let mut status = lock(&self.status);
        status.progress += 1;
        status.records_collected += records;
        status.message = format!("{date}: {records} records");
    }

    fn date_failed(&self, date: NaiveDate, error: &ScraperError) {
        let mut status = lock(&self.status);
        status.progress += 1;
        status.message = format!("{date} failed: {error}");
        status.failed_dates.push(DateFailure {
            date,
            message: error.to_string(),
        });
    }
}

#[derive(Clone)]
pub struct JobManager {
    status: SharedStatus,
    cancel: SharedToken,
    executor: Arc<dyn JobExecutor>,
    default_store: String,
}

impl JobManager {
    pub fn new(executor: Arc<dyn JobExecutor>, default_store: impl Into<String>) -> Self {
        Self {
            status: Arc::new(Mutex::new(JobStatus {
                message: "idle".to_string(),
                ..JobStatus::default()
            })),
            cancel: Arc::new(Mutex::new(None)),
            executor,
            default_store: default_store.into(),
        }
    }

    #[must_use]
    pub fn status(&self) -> JobStatus {
        lock(&self.status).clone()
    }

    /// Validate and start a job from an API request.
    ///
    /// # Errors
    ///
    /// [`StartError::AlreadyRunning`] while another job runs, or
    /// [`StartError::InvalidDate`].
    pub fn start(&self, request: StartRequest) -> Result<JobStatus, StartError> {
        if lock(&self.status).running {
            return Err(StartError::AlreadyRunning);
        }
        self.submit(JobRequest::from_start(request, &self.default_store)?)
    }

    /// Start a validated job.
    ///
    /// # Errors
    ///
    /// [`StartError::AlreadyRunning`] while another job runs.
    pub fn submit(&self, request: JobRequest) -> Result<JobStatus, StartError> {
        let token = CancellationToken::new();
        let snapshot = {
            let mut status = lock(&self.status);
            if status.running {
                return Err(StartError::AlreadyRunning);
            }
            *status = JobStatus {
                running: true,
                total: request.job.dates().len(),
                message: format!(
                    "starting {} crawl {} to {}",
                    request.job.mode, request.job.start, request.job.end
                ),
                ..JobStatus::default()
            };
            // The token slot only changes under the status lock.
            *lock_cancel(&self.cancel) = Some(token.clone());
            status.clone()
        };

        tracing::info!(
            store = %request.job.store_name,
            start = %request.job.start,
            end = %request.job.end,
            mode = %request.job.mode,
            "job started"
        );

        let progress = JobProgress {
            status: Arc::clone(&self.status),
        };
        let work = tokio::spawn(self.executor.execute(request, progress, token));
        let status = Arc::clone(&self.status);
        let cancel = Arc::clone(&self.cancel);
        tokio::spawn(async move {
            let result = match work.await {
                Ok(result) => result,
                Err(join_err) => Err(anyhow::anyhow!("job task aborted: {join_err}")),
            };
            finish(&status, &cancel, result);
        });

        Ok(snapshot)
    }

    /// Ask the running job, if any, to stop at its next date boundary.
    pub fn cancel(&self) -> bool {
        match lock_cancel(&self.cancel).as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use tokio::sync::Semaphore;

    use super::*;

    /// Executor whose jobs block until [`GatedExecutor::release`].
    #[derive(Clone)]
    pub(crate) struct GatedExecutor {
        gate: Arc<Semaphore>,
    }

    impl Default for GatedExecutor {
        fn default() -> Self {
            Self {
                gate: Arc::new(Semaphore::new(0)),
            }
        }
    }

    impl GatedExecutor {
        pub(crate) fn release(&self) {
            self.gate.add_permits(1);
        }
    }

    impl JobExecutor for GatedExecutor {
        fn execute(
            &self,
            request: JobRequest,
            progress: JobProgress,
            cancel: CancellationToken,
        ) -> BoxFuture<'static, anyhow::Result<JobOutcome>> {
            let gate = Arc::clone(&self.gate);
            Box::pin(async move {
                let first = request.job.start;
                progress.date_started(first, 0, request.job.dates().len());
                tokio::select! {
                    permit = gate.acquire() => drop(permit?),
                    () = cancel.cancelled() => {
                        return Ok(JobOutcome {
                            message: "cancelled".to_string(),
                            ..JobOutcome::default()
                        });
                    }
                }
                progress.date_finished(first, 2);
                Ok(JobOutcome {
                    records: 2,
                    result_file: Some("reservations_test.csv".to_string()),
                    message: "completed: 2 records".to_string(),
                })
            })
        }
    }

    pub(crate) async fn wait_until_idle(manager: &JobManager) -> JobStatus {
        for _ in 0..200 {
            let status = manager.status();
            if !status.running {
                return status;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("job did not finish");
    }
}
