//! Where crawled records go: merging with what was stored before, files in
//! the output directory, and the shared booking sheet.

pub mod error;
pub mod merge;
pub mod sheets;
pub mod sink;
pub mod summary;

pub use error::ExportError;
pub use merge::{merge, records_to_sheet_rows, rows_to_records, sheet_header};
pub use sheets::{
    spreadsheet_id, sync_to_sheet, SheetSyncReport, SheetsClient, Spreadsheet, SpreadsheetStore,
    Worksheet,
};
pub use sink::{default_file_stem, read_records, FileEntry, FileSink, OutputFormat, Sink};
pub use summary::{summarize, DateRange, Summary};
