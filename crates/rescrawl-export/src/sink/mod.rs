//! Writing record sets to the output directory.

mod csv_file;
mod xlsx;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rescrawl_core::ReservationRecord;
use serde::{Deserialize, Serialize};

use crate::error::ExportError;
use crate::summary::{summarize, Summary};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Excel,
    Json,
}

impl OutputFormat {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Excel => "xlsx",
            OutputFormat::Json => "json",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "excel" | "xlsx" => Ok(OutputFormat::Excel),
            "json" => Ok(OutputFormat::Json),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Excel => write!(f, "excel"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Export destination for a finished record set.
pub trait Sink: Send + Sync {
    /// Write `records` as a new file, returning its path. `file_stem` is the
    /// name without extension; a timestamped default is used when absent.
    ///
    /// # Errors
    ///
    /// [`ExportError::EmptyBatch`] for an empty batch, or any write failure.
    fn write_batch(
        &self,
        records: &[ReservationRecord],
        format: OutputFormat,
        file_stem: Option<&str>,
    ) -> Result<PathBuf, ExportError>;

    /// Append `records` to an existing CSV file, creating it if missing.
    ///
    /// # Errors
    ///
    /// [`ExportError::EmptyBatch`] for an empty batch, or any write failure.
    fn append_batch(
        &self,
        existing: &Path,
        records: &[ReservationRecord],
    ) -> Result<PathBuf, ExportError>;

    fn summarize(&self, records: &[ReservationRecord]) -> Summary {
        summarize(records)
    }
}

/// A file in the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

/// `reservations_<start>` or `reservations_<start>_to_<end>`.
#[must_use]
pub fn default_file_stem(start: NaiveDate, end: NaiveDate) -> String {
    if start == end {
        format!("reservations_{start}")
    } else {
        format!("reservations_{start}_to_{end}")
    }
}

fn timestamp_stem(prefix: &str) -> String {
    format!("{prefix}_{}", chrono::Local::now().format("%Y%m%d_%H%M%S"))
}

/// Files under one output directory.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ensure_dir(&self) -> Result<(), ExportError> {
        fs::create_dir_all(&self.dir).map_err(|e| ExportError::io(&self.dir, e))
    }

    /// Write a JSON summary of `records` next to the exports.
    ///
    /// # Errors
    ///
    /// Any write failure.
    pub fn save_summary(
        &self,
        records: &[ReservationRecord],
        file_stem: Option<&str>,
    ) -> Result<PathBuf, ExportError> {
        self.ensure_dir()?;
        let stem = file_stem.map_or_else(|| timestamp_stem("summary"), str::to_string);
        let path = self.dir.join(format!("{stem}.json"));
        let body = serde_json::to_string_pretty(&summarize(records))?;
        fs::write(&path, body).map_err(|e| ExportError::io(&path, e))?;
        tracing::info!(path = %path.display(), "summary saved");
        Ok(path)
    }

    /// Files in the output directory, newest first.
    ///
    /// # Errors
    ///
    /// Failure to read the directory. A directory that does not exist yet
    /// lists as empty.
    pub fn list_files(&self) -> Result<Vec<FileEntry>, ExportError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ExportError::io(&self.dir, e)),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ExportError::io(&self.dir, e))?;
            let metadata = entry
                .metadata()
                .map_err(|e| ExportError::io(&entry.path(), e))?;
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata
                .modified()
                .map_err(|e| ExportError::io(&entry.path(), e))?;
            files.push(FileEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                size: metadata.len(),
                modified: DateTime::<Utc>::from(modified),
            });
        }
        files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
        Ok(files)
    }

    /// Path of `filename` inside the output directory.
    ///
    /// # Errors
    ///
    /// [`ExportError::InvalidFileName`] for anything that is not a plain file
    /// name, [`ExportError::NotFound`] when no such file exists.
    pub fn resolve(&self, filename: &str) -> Result<PathBuf, ExportError> {
        let plain = !filename.is_empty()
            && !filename.starts_with('.')
            && !filename.contains(['/', '\\', '\0']);
        if !plain {
            return Err(ExportError::InvalidFileName(filename.to_string()));
        }
        let path = self.dir.join(filename);
        if path.is_file() {
            Ok(path)
        } else {
            Err(ExportError::NotFound(filename.to_string()))
        }
    }
}

impl Sink for FileSink {
    fn write_batch(
        &self,
        records: &[ReservationRecord],
        format: OutputFormat,
        file_stem: Option<&str>,
    ) -> Result<PathBuf, ExportError> {
        if records.is_empty() {
            return Err(ExportError::EmptyBatch);
        }
        self.ensure_dir()?;
        let stem = file_stem.map_or_else(|| timestamp_stem("reservations"), str::to_string);
        let path = self.dir.join(format!("{stem}.{}", format.extension()));

        match format {
            OutputFormat::Csv => csv_file::write_new(&path, records)?,
            OutputFormat::Excel => xlsx::write(&path, records)?,
            OutputFormat::Json => {
                let file = fs::File::create(&path).map_err(|e| ExportError::io(&path, e))?;
                let mut writer = std::io::BufWriter::new(file);
                serde_json::to_writer_pretty(&mut writer, records)?;
                writer.flush().map_err(|e| ExportError::io(&path, e))?;
            }
        }
        tracing::info!(path = %path.display(), records = records.len(), %format, "batch written");
        Ok(path)
    }

    fn append_batch(
        &self,
        existing: &Path,
        records: &[ReservationRecord],
    ) -> Result<PathBuf, ExportError> {
        if records.is_empty() {
            return Err(ExportError::EmptyBatch);
        }
        let is_csv = existing
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if !is_csv {
            return Err(ExportError::InvalidFileName(existing.display().to_string()));
        }
        if existing.exists() {
            csv_file::append(existing, records)?;
        } else {
            csv_file::write_new(existing, records)?;
        }
        tracing::info!(path = %existing.display(), records = records.len(), "batch appended");
        Ok(existing.to_path_buf())
    }
}

/// Load records from a CSV or JSON export.
///
/// # Errors
///
/// [`ExportError::InvalidFileName`] for other extensions, plus read and
/// parse failures.
pub fn read_records(path: &Path) -> Result<Vec<ReservationRecord>, ExportError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("csv") => csv_file::read(path),
        Some("json") => {
            let content = fs::read_to_string(path).map_err(|e| ExportError::io(path, e))?;
            Ok(serde_json::from_str(&content)?)
        }
        _ => Err(ExportError::InvalidFileName(path.display().to_string())),
    }
}

#[cfg(test)]
#[path = "sink_test.rs"]
mod tests;
