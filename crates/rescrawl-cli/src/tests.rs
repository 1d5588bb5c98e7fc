use chrono::NaiveDate;
use rescrawl_core::{CrawlMode, ReservationRecord};
use rescrawl_export::{read_records, summarize, FileSink, OutputFormat, Sink};

use super::*;
use crate::crawl::render_summary;
use crate::merge::run_merge;

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 12, day).expect("valid date")
}

fn crawl_args(args: &[&str]) -> CrawlArgs {
    let mut argv = vec!["rescrawl", "crawl"];
    argv.extend_from_slice(args);
    match Cli::try_parse_from(argv).expect("expected valid cli args").command {
        Commands::Crawl(args) => args,
        other => panic!("expected crawl, got {other:?}"),
    }
}

#[test]
fn crawl_defaults() {
    let args = crawl_args(&[]);
    assert_eq!(args.mode, CrawlMode::Daily);
    assert_eq!(args.output_format, OutputFormat::Csv);
    assert!(!args.headed);
    assert!(!args.google_sheets);

    let job = args.job("마리엠헤어", d(5)).expect("job");
    assert_eq!((job.start, job.end), (d(5), d(5)));
    assert_eq!(job.store_name, "마리엠헤어");
}

#[test]
fn crawl_single_date() {
    let args = crawl_args(&["--date", "2025-12-04", "--output-format", "excel"]);
    assert_eq!(args.output_format, OutputFormat::Excel);
    let job = args.job("s", d(1)).expect("job");
    assert_eq!(job.dates(), vec![d(4)]);
}

#[test]
fn crawl_range_and_mode() {
    let args = crawl_args(&[
        "--start-date",
        "2025-12-01",
        "--end-date",
        "2025-12-03",
        "--mode",
        "monthly",
        "--store",
        "다른지점",
    ]);
    assert_eq!(args.mode, CrawlMode::Monthly);
    assert_eq!(args.store.as_deref(), Some("다른지점"));
    let job = args.job("다른지점", d(1)).expect("job");
    assert_eq!(job.dates(), vec![d(1)]);
}

#[test]
fn crawl_rejects_date_with_range() {
    assert!(Cli::try_parse_from([
        "rescrawl",
        "crawl",
        "--date",
        "2025-12-04",
        "--start-date",
        "2025-12-01",
    ])
    .is_err());
}

#[test]
fn crawl_rejects_unknown_mode_and_format() {
    assert!(Cli::try_parse_from(["rescrawl", "crawl", "--mode", "hourly"]).is_err());
    assert!(Cli::try_parse_from(["rescrawl", "crawl", "--output-format", "pdf"]).is_err());
}

#[test]
fn sheets_url_requires_the_sheet_flag() {
    assert!(Cli::try_parse_from(["rescrawl", "crawl", "--sheets-url", "abc"]).is_err());
    let args = crawl_args(&["--google-sheets", "--sheets-url", "abc"]);
    assert!(args.google_sheets);
}

#[test]
fn reversed_range_is_an_error() {
    let args = crawl_args(&["--start-date", "2025-12-05", "--end-date", "2025-12-01"]);
    assert!(args.job("s", d(1)).is_err());
}

#[test]
fn summary_lists_counts() {
    let mut a = ReservationRecord::new(d(4));
    a.team = "A".to_string();
    let b = ReservationRecord::new(d(5));
    let text = render_summary(&summarize(&[a, b]));

    assert!(text.starts_with("total: 2\nrange: 2025-12-04 to 2025-12-05\n"));
    assert!(text.contains("  A: 1\n"));
    assert!(text.contains("  (blank): 1\n"));
    assert!(text.contains("  2025-12-05: 1\n"));
}

#[test]
fn merge_command_deduplicates_into_output() {
    let dir = tempfile::tempdir().expect("temp dir");
    let sink = FileSink::new(dir.path());
    let rec = |day, number: &str, name: &str| {
        let mut r = ReservationRecord::new(d(day));
        r.reservation_number = number.to_string();
        r.customer_name = name.to_string();
        r
    };
    let persisted = sink
        .write_batch(&[rec(5, "R-1", "old"), rec(4, "R-2", "kept")], OutputFormat::Csv, Some("stored"))
        .expect("write stored");
    let incoming = sink
        .write_batch(&[rec(5, "R-1", "new")], OutputFormat::Json, Some("incoming"))
        .expect("write incoming");
    let output = dir.path().join("merged.csv");

    let cli = Cli::try_parse_from([
        "rescrawl",
        "merge",
        "--persisted",
        persisted.to_str().expect("utf-8 path"),
        "--incoming",
        incoming.to_str().expect("utf-8 path"),
        "--output",
        output.to_str().expect("utf-8 path"),
    ])
    .expect("expected valid cli args");
    let Commands::Merge(args) = cli.command else {
        panic!("expected merge");
    };
    run_merge(&args).expect("merge");

    let merged = read_records(&output).expect("read merged");
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].reservation_number, "R-2");
    assert_eq!(merged[1].customer_name, "new");
}

#[test]
fn files_takes_a_directory() {
    let cli = Cli::try_parse_from(["rescrawl", "files", "--dir", "/tmp/out"])
        .expect("expected valid cli args");
    assert!(matches!(cli.command, Commands::Files { ref dir } if dir.ends_with("out")));
}
