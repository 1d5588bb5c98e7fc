pub mod app_config;
pub mod config;
pub mod job;
pub mod records;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use job::{parse_date, CrawlJob, CrawlMode};
pub use records::{RecordField, ReservationRecord};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid date \"{0}\": expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("unknown crawl mode \"{0}\": expected daily, weekly or monthly")]
    UnknownMode(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
