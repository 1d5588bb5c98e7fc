//! Recurring crawl of the upcoming days.
//!
//! When `RESCRAWL_SCHEDULE_CRON` is set, a job covering today through
//! `RESCRAWL_SCHEDULE_DAYS_AHEAD` days from now is submitted on every tick.
//! A tick that lands while a job is already running is skipped.

use chrono::{Days, Local, NaiveDate};
use rescrawl_core::{AppConfig, CoreError, CrawlJob, CrawlMode};
use rescrawl_export::OutputFormat;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::jobs::{JobManager, JobRequest, SheetTarget};

/// Builds and starts the scheduler, or returns `None` when no schedule is
/// configured. The returned handle must be kept alive.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] for an invalid cron expression or if the
/// scheduler fails to start.
pub async fn build_scheduler(
    jobs: JobManager,
    config: &AppConfig,
) -> Result<Option<JobScheduler>, JobSchedulerError> {
    let Some(cron) = config.schedule_cron.clone() else {
        tracing::info!("no crawl schedule configured");
        return Ok(None);
    };

    let scheduler = JobScheduler::new().await?;
    let store_name = config.store_name.clone();
    let days_ahead = config.schedule_days_ahead;
    let sync_sheet = config.sheets_url.is_some();

    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let jobs = jobs.clone();
        let store_name = store_name.clone();

        Box::pin(async move {
            let today = Local::now().date_naive();
            let request = match scheduled_request(today, days_ahead, &store_name, sync_sheet) {
                Ok(request) => request,
                Err(e) => {
                    tracing::error!(error = %e, "scheduler: could not build crawl window");
                    return;
                }
            };
            match jobs.submit(request) {
                Ok(status) => tracing::info!(dates = status.total, "scheduler: crawl submitted"),
                Err(e) => tracing::warn!(error = %e, "scheduler: tick skipped"),
            }
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;
    tracing::info!(cron = %cron, days_ahead, "crawl schedule registered");
    Ok(Some(scheduler))
}

/// The job one scheduler tick submits.
///
/// # Errors
///
/// [`CoreError::InvalidRange`] if the window overflows the calendar.
pub fn scheduled_request(
    today: NaiveDate,
    days_ahead: u32,
    store_name: &str,
    sync_sheet: bool,
) -> Result<JobRequest, CoreError> {
    let end = today
        .checked_add_days(Days::new(u64::from(days_ahead)))
        .ok_or(CoreError::InvalidRange { start: today, end: today })?;
    Ok(JobRequest {
        job: CrawlJob::new(today, end, store_name, CrawlMode::Daily)?,
        output_format: OutputFormat::Csv,
        sheet: sync_sheet.then_some(SheetTarget { url: None }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_covers_today_and_the_days_ahead() {
        let today = NaiveDate::from_ymd_opt(2025, 12, 30).expect("valid date");
        let request = scheduled_request(today, 3, "마리엠헤어", true).expect("request");
        assert_eq!(request.job.start, today);
        assert_eq!(
            request.job.end,
            NaiveDate::from_ymd_opt(2026, 1, 2).expect("valid date")
        );
        assert_eq!(request.job.dates().len(), 4);
        assert_eq!(request.sheet, Some(SheetTarget { url: None }));
    }

    #[test]
    fn zero_days_ahead_is_just_today() {
        let today = NaiveDate::from_ymd_opt(2025, 12, 5).expect("valid date");
        let request = scheduled_request(today, 0, "s", false).expect("request");
        assert_eq!(request.job.dates(), vec![today]);
        assert_eq!(request.sheet, None);
    }
}
