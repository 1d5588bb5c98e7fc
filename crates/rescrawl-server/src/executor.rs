use std::sync::Arc;

use anyhow::Context;
use futures::future::BoxFuture;
use rescrawl_core::AppConfig;
use rescrawl_export::{sync_to_sheet, FileSink, Sink, SheetsClient, SpreadsheetStore};
use rescrawl_scraper::{
    ChromeEngine, ChromeOptions, CrawlReport, SessionController, SessionSettings, SiteLocators,
};
use tokio_util::sync::CancellationToken;

use crate::jobs::{JobExecutor, JobOutcome, JobProgress, JobRequest};

const SHEETS_TIMEOUT_SECS: u64 = 30;

/// Runs jobs in a fresh headless Chrome per job.
pub struct BrowserExecutor {
    config: Arc<AppConfig>,
    locators: Arc<SiteLocators>,
    sink: FileSink,
}

impl BrowserExecutor {
    pub fn new(config: Arc<AppConfig>, locators: Arc<SiteLocators>, sink: FileSink) -> Self {
        Self {
            config,
            locators,
            sink,
        }
    }
}

impl JobExecutor for BrowserExecutor {
    fn execute(
        &self,
        request: JobRequest,
        progress: JobProgress,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, anyhow::Result<JobOutcome>> {
        let config = Arc::clone(&self.config);
        let locators = Arc::clone(&self.locators);
        let sink = self.sink.clone();

        Box::pin(async move {
            progress.set_message("launching browser");
            let engine = ChromeEngine::launch(ChromeOptions::from_app_config(&config))
                .await
                .context("failed to launch browser")?;
            let settings = SessionSettings::from_app_config(&config);
            let result = SessionController::new(&engine, &locators, settings)
                .with_observer(&progress)
                .with_cancellation(cancel)
                .run(&request.job)
                .await;
            engine.shutdown().await;
            let report = result.context("crawl aborted")?;

            let client = match (&request.sheet, config.sheets_access_token.as_deref()) {
                (Some(_), Some(token)) => Some(SheetsClient::new(
                    &config.sheets_api_base,
                    token,
                    SHEETS_TIMEOUT_SECS,
                )?),
                _ => None,
            };
            let sheet_url = request
                .sheet
                .as_ref()
                .and_then(|target| target.url.clone())
                .or_else(|| config.sheets_url.clone());

            complete_job(
                report,
                &request,
                &sink,
                client.as_ref(),
                sheet_url.as_deref(),
                &config.sheets_worksheet,
            )
            .await
        })
    }
}

/// `reservations_<store>_<start>_to_<end>_<timestamp>`, with path separators
/// in the store name replaced.
pub fn result_file_stem(request: &JobRequest) -> String {
    let store: String = request
        .job
        .store_name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    format!(
        "reservations_{store}_{}_to_{}_{}",
        request.job.start,
        request.job.end,
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    )
}

/// Export a finished crawl and optionally merge it into the shared sheet.
///
/// Sheet problems never fail the job; they are reported in the message.
///
/// # Errors
///
/// Only when the export file cannot be written.
pub async fn complete_job<S: SpreadsheetStore>(
    report: CrawlReport,
    request: &JobRequest,
    sink: &dyn Sink,
    sheets: Option<&S>,
    sheet_url: Option<&str>,
    worksheet: &str,
) -> anyhow::Result<JobOutcome> {
    let cancelled = report.cancelled.then(|| {
        format!(
            "cancelled after {} of {} dates; ",
            report.dates_attempted, report.dates_total
        )
    });
    let prefix = cancelled.unwrap_or_default();

    if report.records.is_empty() {
        return Ok(JobOutcome {
            records: 0,
            result_file: None,
            message: format!("{prefix}no records collected"),
        });
    }

    let count = report.records.len();
    let path = sink
        .write_batch(
            &report.records,
            request.output_format,
            Some(&result_file_stem(request)),
        )
        .context("failed to write results")?;
    let result_file = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string);

    let sheet_note = match &request.sheet {
        None => String::new(),
        Some(_) => match (sheets, sheet_url) {
            (_, None) => " (sheet sync failed: no sheet URL configured)".to_string(),
            (None, _) => " (sheet sync failed: no access token configured)".to_string(),
            (Some(store), Some(url)) => {
                match sync_to_sheet(store, url, worksheet, report.records).await {
                    Ok(sync) => {
                        tracing::info!(
                            spreadsheet = %sync.spreadsheet,
                            worksheet = %sync.worksheet,
                            rows_before = sync.rows_before,
                            rows_after = sync.rows_after,
                            "sheet synced"
                        );
                        " (sheet synced)".to_string()
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "sheet sync failed");
                        format!(" (sheet sync failed: {err})")
                    }
                }
            }
        },
    };

    Ok(JobOutcome {
        records: count,
        result_file,
        message: format!("{prefix}completed: {count} records{sheet_note}"),
    })
}
