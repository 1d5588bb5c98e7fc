use std::str::FromStr;

use chrono::{Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// How the requested range is sampled into crawl dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlMode {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl std::fmt::Display for CrawlMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CrawlMode::Daily => write!(f, "daily"),
            CrawlMode::Weekly => write!(f, "weekly"),
            CrawlMode::Monthly => write!(f, "monthly"),
        }
    }
}

impl FromStr for CrawlMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(CrawlMode::Daily),
            "weekly" => Ok(CrawlMode::Weekly),
            "monthly" => Ok(CrawlMode::Monthly),
            other => Err(CoreError::UnknownMode(other.to_string())),
        }
    }
}

/// Parse a `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns [`CoreError::InvalidDate`] when the text is not a calendar date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, CoreError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| CoreError::InvalidDate(raw.to_string()))
}

/// One crawl run: a date range, the store whose bookings are read, and the
/// sampling mode. Produces exactly one record set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlJob {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub store_name: String,
    pub mode: CrawlMode,
}

impl CrawlJob {
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRange`] when `start` is after `end`.
    pub fn new(
        start: NaiveDate,
        end: NaiveDate,
        store_name: impl Into<String>,
        mode: CrawlMode,
    ) -> Result<Self, CoreError> {
        if start > end {
            return Err(CoreError::InvalidRange { start, end });
        }
        Ok(Self {
            start,
            end,
            store_name: store_name.into(),
            mode,
        })
    }

    /// A single-day job.
    #[must_use]
    pub fn single(date: NaiveDate, store_name: impl Into<String>) -> Self {
        Self {
            start: date,
            end: date,
            store_name: store_name.into(),
            mode: CrawlMode::Daily,
        }
    }

    /// Crawl dates in ascending order, always starting at `start`.
    ///
    /// Monthly steps are counted from `start` and clamped to the end of
    /// shorter months, so a 31st keeps returning to the 31st where it exists.
    #[must_use]
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        match self.mode {
            CrawlMode::Daily | CrawlMode::Weekly => {
                let step = if self.mode == CrawlMode::Daily {
                    Duration::days(1)
                } else {
                    Duration::weeks(1)
                };
                let mut current = self.start;
                while current <= self.end {
                    dates.push(current);
                    match current.checked_add_signed(step) {
                        Some(next) => current = next,
                        None => break,
                    }
                }
            }
            CrawlMode::Monthly => {
                for offset in 0u32.. {
                    let Some(current) = self.start.checked_add_months(Months::new(offset)) else {
                        break;
                    };
                    if current > self.end {
                        break;
                    }
                    dates.push(current);
                }
            }
        }
        dates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).expect("valid date")
    }

    #[test]
    fn daily_is_inclusive_of_both_ends() {
        let job = CrawlJob::new(d(2025, 12, 4), d(2025, 12, 6), "store", CrawlMode::Daily)
            .expect("job");
        assert_eq!(
            job.dates(),
            vec![d(2025, 12, 4), d(2025, 12, 5), d(2025, 12, 6)]
        );
    }

    #[test]
    fn weekly_steps_seven_days() {
        let job = CrawlJob::new(d(2025, 12, 1), d(2025, 12, 20), "store", CrawlMode::Weekly)
            .expect("job");
        assert_eq!(
            job.dates(),
            vec![d(2025, 12, 1), d(2025, 12, 8), d(2025, 12, 15)]
        );
    }

    #[test]
    fn monthly_crosses_year_boundary() {
        let job = CrawlJob::new(d(2025, 11, 15), d(2026, 2, 1), "store", CrawlMode::Monthly)
            .expect("job");
        assert_eq!(
            job.dates(),
            vec![d(2025, 11, 15), d(2025, 12, 15), d(2026, 1, 15)]
        );
    }

    #[test]
    fn monthly_clamps_without_drifting() {
        let job = CrawlJob::new(d(2026, 1, 31), d(2026, 3, 31), "store", CrawlMode::Monthly)
            .expect("job");
        assert_eq!(
            job.dates(),
            vec![d(2026, 1, 31), d(2026, 2, 28), d(2026, 3, 31)]
        );
    }

    #[test]
    fn reversed_range_is_rejected() {
        let result = CrawlJob::new(d(2025, 12, 5), d(2025, 12, 4), "store", CrawlMode::Daily);
        assert!(matches!(result, Err(CoreError::InvalidRange { .. })));
    }

    #[test]
    fn single_day_job_has_one_date() {
        let job = CrawlJob::single(d(2025, 12, 5), "store");
        assert_eq!(job.dates(), vec![d(2025, 12, 5)]);
    }

    #[test]
    fn parse_date_rejects_other_formats() {
        assert_eq!(parse_date("2025-12-05").expect("date"), d(2025, 12, 5));
        assert!(matches!(
            parse_date("12/05/2025"),
            Err(CoreError::InvalidDate(_))
        ));
        assert!(matches!(
            parse_date("2025-02-30"),
            Err(CoreError::InvalidDate(_))
        ));
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Weekly".parse::<CrawlMode>().expect("mode"), CrawlMode::Weekly);
        assert!(matches!(
            "hourly".parse::<CrawlMode>(),
            Err(CoreError::UnknownMode(_))
        ));
    }
}
