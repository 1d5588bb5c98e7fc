//! The `crawl` command: one browser session over a date range, exported to
//! the output directory and optionally merged into the booking sheet.

use std::fmt::Write as _;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Args;
use rescrawl_core::{parse_date, AppConfig, CrawlJob, CrawlMode};
use rescrawl_export::{
    default_file_stem, sync_to_sheet, FileSink, OutputFormat, SheetsClient, Sink, Summary,
};
use rescrawl_scraper::{
    load_site_locators, ChromeEngine, ChromeOptions, CrawlObserver, ScraperError,
    SessionController, SessionSettings, SiteLocators,
};
use tokio_util::sync::CancellationToken;

const SHEETS_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Args)]
pub struct CrawlArgs {
    /// Crawl a single date (YYYY-MM-DD)
    #[arg(long, conflicts_with_all = ["start_date", "end_date"])]
    pub date: Option<String>,

    /// First date of the range (YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub start_date: Option<String>,

    /// Last date of the range; defaults to the start date
    #[arg(long, requires = "start_date")]
    pub end_date: Option<String>,

    /// `daily`, `weekly` or `monthly`
    #[arg(long, default_value = "daily")]
    pub mode: CrawlMode,

    /// Store to crawl; overrides RESCRAWL_STORE_NAME
    #[arg(long)]
    pub store: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// `csv`, `excel` or `json`
    #[arg(long, default_value = "csv")]
    pub output_format: OutputFormat,

    /// Export file name without extension
    #[arg(long)]
    pub output_file: Option<String>,

    /// Also write a JSON summary next to the export
    #[arg(long)]
    pub summary: bool,

    /// Merge the results into the booking sheet
    #[arg(long)]
    pub google_sheets: bool,

    /// Sheet URL or ID; overrides RESCRAWL_SHEETS_URL
    #[arg(long, requires = "google_sheets")]
    pub sheets_url: Option<String>,
}

impl CrawlArgs {
    /// Fold command-line overrides into the loaded configuration.
    pub fn apply_to(&self, config: &mut AppConfig) {
        if self.headed {
            config.headless = false;
        }
        if let Some(store) = &self.store {
            config.store_name.clone_from(store);
        }
        if let Some(url) = &self.sheets_url {
            config.sheets_url = Some(url.clone());
        }
    }

    /// # Errors
    ///
    /// Unparseable dates or an end before the start.
    pub fn job(&self, store_name: &str, today: NaiveDate) -> anyhow::Result<CrawlJob> {
        let (start, end) = match (&self.date, &self.start_date) {
            (Some(date), _) => {
                let date = parse_date(date)?;
                (date, date)
            }
            (None, Some(start)) => {
                let start = parse_date(start)?;
                let end = self.end_date.as_deref().map(parse_date).transpose()?;
                (start, end.unwrap_or(start))
            }
            (None, None) => (today, today),
        };
        Ok(CrawlJob::new(start, end, store_name, self.mode)?)
    }
}

/// Prints one line per date as the crawl advances.
struct ConsoleProgress;

impl CrawlObserver for ConsoleProgress {
    fn date_started(&self, date: NaiveDate, index: usize, total: usize) {
        println!("[{}/{total}] {date}", index + 1);
    }

    fn date_finished(&self, _date: NaiveDate, records: usize) {
        println!("        {records} records");
    }

    fn date_failed(&self, _date: NaiveDate, error: &ScraperError) {
        println!("        failed: {error}");
    }
}

/// # Errors
///
/// Fatal session errors (browser launch, login) and export write failures.
/// Per-date failures and sheet sync failures are reported, not returned.
pub async fn run_crawl(config: &AppConfig, args: &CrawlArgs) -> anyhow::Result<()> {
    let job = args.job(&config.store_name, chrono::Local::now().date_naive())?;
    let locators = match &config.locators_path {
        Some(path) => load_site_locators(path)
            .with_context(|| format!("failed to load locators from {}", path.display()))?,
        None => SiteLocators::default(),
    };

    println!(
        "crawling {} from {} to {} ({} mode)",
        job.store_name, job.start, job.end, job.mode
    );

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("interrupt received; stopping after the current date");
            on_ctrl_c.cancel();
        }
    });

    let engine = ChromeEngine::launch(ChromeOptions::from_app_config(config))
        .await
        .context("failed to launch browser")?;
    let result = SessionController::new(&engine, &locators, SessionSettings::from_app_config(config))
        .with_observer(&ConsoleProgress)
        .with_cancellation(cancel)
        .run(&job)
        .await;
    engine.shutdown().await;
    let report = result?;

    if report.cancelled {
        println!(
            "cancelled after {} of {} dates",
            report.dates_attempted, report.dates_total
        );
    }
    for failure in &report.failures {
        println!("failed {}: {}", failure.date, failure.message);
    }
    if report.records.is_empty() {
        println!("no records collected");
        return Ok(());
    }

    let sink = FileSink::new(config.output_dir.clone());
    let stem = args
        .output_file
        .clone()
        .unwrap_or_else(|| default_file_stem(job.start, job.end));
    let path = sink.write_batch(&report.records, args.output_format, Some(&stem))?;
    println!("saved {} records to {}", report.records.len(), path.display());

    if args.summary {
        let summary_path = sink.save_summary(&report.records, Some(&format!("summary_{stem}")))?;
        println!("summary saved to {}", summary_path.display());
    }
    print!("{}", render_summary(&sink.summarize(&report.records)));

    if args.google_sheets {
        sync_sheet(config, report.records).await;
    }
    Ok(())
}

async fn sync_sheet(config: &AppConfig, records: Vec<rescrawl_core::ReservationRecord>) {
    let (Some(url), Some(token)) = (&config.sheets_url, &config.sheets_access_token) else {
        println!("sheet sync skipped: RESCRAWL_SHEETS_URL and RESCRAWL_SHEETS_ACCESS_TOKEN are required");
        return;
    };
    let client = match SheetsClient::new(&config.sheets_api_base, token.as_str(), SHEETS_TIMEOUT_SECS) {
        Ok(client) => client,
        Err(e) => {
            println!("sheet sync failed: {e}");
            return;
        }
    };
    match sync_to_sheet(&client, url, &config.sheets_worksheet, records).await {
        Ok(report) => println!(
            "sheet '{}' / '{}': {} rows before, {} after",
            report.spreadsheet, report.worksheet, report.rows_before, report.rows_after
        ),
        Err(e) => {
            tracing::warn!(error = %e, "sheet sync failed");
            println!("sheet sync failed: {e}");
        }
    }
}

/// Human-readable summary block.
pub fn render_summary(summary: &Summary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "total: {}", summary.total_count);
    if let Some(range) = summary.date_range {
        let _ = writeln!(out, "range: {} to {}", range.start, range.end);
    }
    for (title, counts) in [
        ("by team", &summary.by_team),
        ("by channel", &summary.by_channel),
        ("by country", &summary.by_country),
    ] {
        if counts.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{title}:");
        for (key, count) in counts {
            let key = if key.is_empty() { "(blank)" } else { key.as_str() };
            let _ = writeln!(out, "  {key}: {count}");
        }
    }
    if !summary.by_date.is_empty() {
        let _ = writeln!(out, "by date:");
    }
    for (date, count) in &summary.by_date {
        let _ = writeln!(out, "  {date}: {count}");
    }
    out
}
