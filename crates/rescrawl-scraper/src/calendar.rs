//! Driving the booking calendar to a specific day.

use chrono::{Datelike, NaiveDate};

use crate::engine::{settle, NavigationEngine, Pacing};
use crate::error::ScraperError;
use crate::locator::SiteLocators;
use crate::resilience::{with_retry, RetryPolicy};

/// Month steps allowed before giving up on reaching the target month.
pub const MAX_MONTH_STEPS: u32 = 24;

/// The (year, month) a calendar header is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CalendarState {
    pub year: i32,
    pub month: u32,
}

impl CalendarState {
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Parse a header label like `"December 2025"`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::CalendarLabel`] for anything else.
    pub fn parse_label(label: &str) -> Result<Self, ScraperError> {
        let trimmed = label.trim();
        NaiveDate::parse_from_str(&format!("1 {trimmed}"), "%d %B %Y")
            .map(Self::of)
            .map_err(|_| ScraperError::CalendarLabel {
                label: trimmed.to_string(),
            })
    }
}

impl std::fmt::Display for CalendarState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

pub struct DateNavigator<'a, E> {
    engine: &'a E,
    locators: &'a SiteLocators,
    pacing: Pacing,
    policy: RetryPolicy,
}

impl<'a, E: NavigationEngine> DateNavigator<'a, E> {
    pub fn new(
        engine: &'a E,
        locators: &'a SiteLocators,
        pacing: Pacing,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            engine,
            locators,
            pacing,
            policy,
        }
    }

    /// Select `target` in the date picker and confirm it.
    ///
    /// Render races (`Timeout`, `ElementNotFound`) are retried under the
    /// navigator's policy; a month that cannot be reached or a day that
    /// has no control fail straight away.
    ///
    /// # Errors
    ///
    /// [`ScraperError::NavigationTimeout`], [`ScraperError::DateNotFound`],
    /// [`ScraperError::CalendarLabel`], or [`ScraperError::Exhausted`] once
    /// the retry budget is spent.
    pub async fn select_date(&self, target: NaiveDate) -> Result<(), ScraperError> {
        with_retry(self.policy, "select_date", || self.select_once(target)).await
    }

    async fn select_once(&self, target: NaiveDate) -> Result<(), ScraperError> {
        self.open_picker().await?;
        let steps = self.navigate_to_month(CalendarState::of(target)).await?;
        tracing::debug!(%target, steps, "calendar month reached");
        self.click_day(target).await?;

        let confirm = self
            .engine
            .wait_for(&self.locators.confirm_button, self.pacing.explicit_wait)
            .await?;
        self.engine.click(&confirm).await?;
        settle(self.pacing.medium).await;
        Ok(())
    }

    async fn open_picker(&self) -> Result<(), ScraperError> {
        if self.engine.try_find(&self.locators.month_label).await?.is_some() {
            return Ok(());
        }
        let display = self
            .engine
            .wait_for(&self.locators.date_display, self.pacing.explicit_wait)
            .await?;
        self.engine.click(&display).await?;
        settle(self.pacing.short).await;
        self.engine
            .wait_for(&self.locators.month_label, self.pacing.explicit_wait)
            .await?;
        Ok(())
    }

    async fn current_month(&self) -> Result<CalendarState, ScraperError> {
        let label = self.engine.find(&self.locators.month_label).await?;
        CalendarState::parse_label(&self.engine.text(&label).await?)
    }

    /// Step the picker toward `target`, returning the steps taken.
    async fn navigate_to_month(&self, target: CalendarState) -> Result<u32, ScraperError> {
        let mut steps = 0u32;
        loop {
            let shown = self.current_month().await?;
            if shown == target {
                return Ok(steps);
            }
            if steps >= MAX_MONTH_STEPS {
                return Err(ScraperError::NavigationTimeout {
                    target: target.to_string(),
                    steps,
                });
            }
            let control = if shown < target {
                &self.locators.next_month
            } else {
                &self.locators.previous_month
            };
            let button = self.engine.find(control).await?;
            self.engine.click(&button).await?;
            steps += 1;
            settle(self.pacing.step).await;
        }
    }

    async fn click_day(&self, target: NaiveDate) -> Result<(), ScraperError> {
        let wanted = target.day().to_string();
        for day in self.engine.find_all(&self.locators.day_button).await? {
            let class = self.engine.attribute(&day, "class").await?.unwrap_or_default();
            if class
                .split_whitespace()
                .any(|c| c == self.locators.day_filler_class)
            {
                continue;
            }
            if self.engine.text(&day).await?.trim() == wanted {
                self.engine.click(&day).await?;
                settle(self.pacing.short).await;
                return Ok(());
            }
        }
        Err(ScraperError::DateNotFound { date: target })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::simulated::SimulatedSite;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).expect("valid date")
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::transient(3, Duration::ZERO)
    }

    #[test]
    fn parses_header_labels() {
        assert_eq!(
            CalendarState::parse_label(" December 2025 ").expect("label"),
            CalendarState {
                year: 2025,
                month: 12
            }
        );
        assert!(matches!(
            CalendarState::parse_label("2025년 12월"),
            Err(ScraperError::CalendarLabel { .. })
        ));
    }

    #[test]
    fn states_order_chronologically() {
        assert!(CalendarState::of(d(2025, 12, 1)) < CalendarState::of(d(2026, 1, 1)));
        assert!(CalendarState::of(d(2025, 3, 1)) > CalendarState::of(d(2024, 11, 1)));
    }

    #[tokio::test]
    async fn steps_forward_across_a_year() {
        let site = SimulatedSite::builder()
            .calendar_starts_at(d(2025, 11, 1))
            .signed_in()
            .build();
        let locators = SiteLocators::default();
        let nav = DateNavigator::new(&site, &locators, Pacing::immediate(), policy());

        nav.select_date(d(2026, 2, 14)).await.expect("select");
        assert_eq!(site.selected_date(), Some(d(2026, 2, 14)));
        assert_eq!(site.month_steps(), 3);
    }

    #[tokio::test]
    async fn steps_backward() {
        let site = SimulatedSite::builder()
            .calendar_starts_at(d(2025, 12, 1))
            .signed_in()
            .build();
        let locators = SiteLocators::default();
        let nav = DateNavigator::new(&site, &locators, Pacing::immediate(), policy());

        nav.select_date(d(2025, 10, 31)).await.expect("select");
        assert_eq!(site.selected_date(), Some(d(2025, 10, 31)));
        assert_eq!(site.month_steps(), 2);
    }

    #[tokio::test]
    async fn gives_up_after_the_step_bound_without_retrying() {
        let site = SimulatedSite::builder()
            .calendar_starts_at(d(2020, 1, 1))
            .signed_in()
            .build();
        let locators = SiteLocators::default();
        let nav = DateNavigator::new(&site, &locators, Pacing::immediate(), policy());

        let err = nav.select_date(d(2025, 12, 5)).await.unwrap_err();
        assert!(
            matches!(err, ScraperError::NavigationTimeout { steps: 24, .. }),
            "unexpected error: {err:?}"
        );
        assert_eq!(site.month_steps(), MAX_MONTH_STEPS);
        assert_eq!(site.selected_date(), None);
    }

    #[tokio::test]
    async fn missing_day_control_is_date_not_found() {
        let site = SimulatedSite::builder()
            .calendar_starts_at(d(2025, 12, 1))
            .disable_day(d(2025, 12, 5))
            .signed_in()
            .build();
        let locators = SiteLocators::default();
        let nav = DateNavigator::new(&site, &locators, Pacing::immediate(), policy());

        let err = nav.select_date(d(2025, 12, 5)).await.unwrap_err();
        assert!(matches!(err, ScraperError::DateNotFound { .. }));
    }

    #[tokio::test]
    async fn a_late_month_header_is_retried() {
        let site = SimulatedSite::builder()
            .calendar_starts_at(d(2025, 12, 1))
            .hide_month_label(1)
            .signed_in()
            .build();
        let locators = SiteLocators::default();
        let nav = DateNavigator::new(&site, &locators, Pacing::immediate(), policy());

        nav.select_date(d(2026, 1, 9)).await.expect("second attempt selects");
        assert_eq!(site.selected_date(), Some(d(2026, 1, 9)));
        assert_eq!(site.month_steps(), 1);
    }

    #[tokio::test]
    async fn a_header_that_never_renders_exhausts_the_budget() {
        let site = SimulatedSite::builder()
            .calendar_starts_at(d(2025, 12, 1))
            .hide_month_label(u32::MAX)
            .signed_in()
            .build();
        let locators = SiteLocators::default();
        let nav = DateNavigator::new(&site, &locators, Pacing::immediate(), policy());

        let err = nav.select_date(d(2025, 12, 5)).await.unwrap_err();
        assert!(
            matches!(err, ScraperError::Exhausted { attempts: 3, .. }),
            "unexpected error: {err:?}"
        );
        assert_eq!(err.kind(), crate::error::ErrorKind::Timeout);
        assert_eq!(site.selected_date(), None);
        assert_eq!(site.month_steps(), 0);
    }
}
