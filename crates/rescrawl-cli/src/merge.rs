//! The `merge` command: fold a new export into a stored one.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use rescrawl_export::{merge, read_records, FileSink, OutputFormat, Sink};

#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Previously stored export (CSV or JSON)
    #[arg(long)]
    pub persisted: PathBuf,

    /// Newly crawled export (CSV or JSON)
    #[arg(long)]
    pub incoming: PathBuf,

    /// Destination; the extension picks the format
    #[arg(long)]
    pub output: PathBuf,
}

/// # Errors
///
/// Unreadable inputs or an output path without a usable name or extension.
pub fn run_merge(args: &MergeArgs) -> anyhow::Result<()> {
    let persisted = if args.persisted.exists() {
        read_records(&args.persisted)
            .with_context(|| format!("failed to read {}", args.persisted.display()))?
    } else {
        tracing::info!(path = %args.persisted.display(), "no stored export yet; starting empty");
        Vec::new()
    };
    let incoming = read_records(&args.incoming)
        .with_context(|| format!("failed to read {}", args.incoming.display()))?;

    let before = persisted.len();
    let merged = merge(persisted, incoming);
    let path = write_to(&args.output, &merged)?;
    println!(
        "merged: {before} stored + new -> {} records in {}",
        merged.len(),
        path.display()
    );
    Ok(())
}

fn write_to(output: &Path, records: &[rescrawl_core::ReservationRecord]) -> anyhow::Result<PathBuf> {
    let format: OutputFormat = output
        .extension()
        .and_then(|e| e.to_str())
        .context("output needs an extension (.csv, .xlsx or .json)")?
        .parse()?;
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .context("output needs a file name")?;
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok(FileSink::new(dir).write_batch(records, format, Some(stem))?)
}
