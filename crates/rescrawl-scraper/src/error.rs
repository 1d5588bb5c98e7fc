use chrono::NaiveDate;
use thiserror::Error;

/// Coarse classification of a [`ScraperError`], used by retry policies to
/// decide which failures are worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ElementNotFound,
    Timeout,
    NavigationTimeout,
    DateNotFound,
    CalendarLabel,
    Engine,
    Login,
    Config,
    Cancelled,
}

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("element not found: {locator}")]
    ElementNotFound { locator: String },

    #[error("timed out after {waited_ms}ms waiting for {locator}")]
    Timeout { locator: String, waited_ms: u64 },

    #[error("calendar did not reach {target} within {steps} month steps")]
    NavigationTimeout { target: String, steps: u32 },

    #[error("no selectable day control for {date}")]
    DateNotFound { date: NaiveDate },

    #[error("unreadable calendar header \"{label}\"")]
    CalendarLabel { label: String },

    #[error("browser engine error: {0}")]
    Engine(String),

    #[error("{source} (gave up after {attempts} attempts)")]
    Exhausted {
        attempts: u32,
        #[source]
        source: Box<ScraperError>,
    },

    #[error("login failed: {source}")]
    Login {
        #[source]
        source: Box<ScraperError>,
    },

    #[error("invalid locator file {path}: {reason}")]
    LocatorFile { path: String, reason: String },

    #[error("crawl cancelled")]
    Cancelled,
}

impl ScraperError {
    /// Classification of this error. An exhausted retry keeps the kind of
    /// the failure it wraps.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScraperError::ElementNotFound { .. } => ErrorKind::ElementNotFound,
            ScraperError::Timeout { .. } => ErrorKind::Timeout,
            ScraperError::NavigationTimeout { .. } => ErrorKind::NavigationTimeout,
            ScraperError::DateNotFound { .. } => ErrorKind::DateNotFound,
            ScraperError::CalendarLabel { .. } => ErrorKind::CalendarLabel,
            ScraperError::Engine(_) => ErrorKind::Engine,
            ScraperError::Exhausted { source, .. } => source.kind(),
            ScraperError::Login { .. } => ErrorKind::Login,
            ScraperError::LocatorFile { .. } => ErrorKind::Config,
            ScraperError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// `true` for failures that mean "the element is not there (yet)".
    #[must_use]
    pub fn is_absence(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ElementNotFound | ErrorKind::Timeout
        )
    }
}

impl From<chromiumoxide::error::CdpError> for ScraperError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        ScraperError::Engine(err.to_string())
    }
}
