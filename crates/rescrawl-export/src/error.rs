use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("refusing to write an empty batch")]
    EmptyBatch,

    #[error("unsupported output format \"{0}\": expected csv, excel or json")]
    UnknownFormat(String),

    #[error("invalid file name \"{0}\"")]
    InvalidFileName(String),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },

    #[error("invalid spreadsheet reference \"{0}\"")]
    SpreadsheetRef(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("spreadsheet API returned {status}: {message}")]
    SheetsApi { status: u16, message: String },
}

impl ExportError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
