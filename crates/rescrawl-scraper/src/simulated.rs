//! An in-memory booking site that implements [`NavigationEngine`].
//!
//! It models the same views the real site has (login, home with date
//! picker, store list, team detail) and only answers to the locators in its
//! [`SiteLocators`] table, so crawl code runs against it unchanged. Handles
//! are checked against the current view on use; clicking a handle from a
//! previous view fails the way a stale DOM node does.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{Datelike, Months, NaiveDate};
use rescrawl_core::RecordField;

use crate::engine::NavigationEngine;
use crate::error::ScraperError;
use crate::locator::{Locator, SiteLocators};

/// The raw texts one team's detail view shows.
#[derive(Debug, Clone)]
pub struct SimulatedBooking {
    fields: HashMap<RecordField, String>,
}

impl SimulatedBooking {
    /// A booking with every detail field present, labels included where the
    /// real site shows them.
    #[must_use]
    pub fn new(team: &str, reservation_number: &str) -> Self {
        let fields = HashMap::from([
            (RecordField::Team, team.to_string()),
            (RecordField::CustomerName, format!("Guest {reservation_number}")),
            (RecordField::ReservationNumber, reservation_number.to_string()),
            (RecordField::Channel, "K".to_string()),
            (RecordField::PeopleCount, "Adult 1".to_string()),
            (RecordField::Country, "KR".to_string()),
            (RecordField::Product, "Product: Hair styling".to_string()),
            (RecordField::TimeRequest, "Time Request: 12:00".to_string()),
        ]);
        Self { fields }
    }

    #[must_use]
    pub fn with(mut self, field: RecordField, raw: &str) -> Self {
        self.fields.insert(field, raw.to_string());
        self
    }

    #[must_use]
    pub fn without(mut self, field: RecordField) -> Self {
        self.fields.remove(&field);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimElement {
    EmailInput,
    PasswordInput,
    SubmitButton,
    DateDisplay,
    MonthLabel,
    NextMonth,
    PreviousMonth,
    /// A calendar cell; padding cells have no date.
    Day {
        date: Option<NaiveDate>,
        filler: bool,
    },
    ConfirmButton,
    Store,
    /// A group container; `None` is a container without a team chip.
    TeamGroup(Option<usize>),
    TeamChip(usize),
    Field(RecordField),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Blank,
    Login,
    Home,
    Store,
    Team(usize),
}

#[derive(Debug, Clone, Copy)]
enum Role {
    Email,
    Password,
    Submit,
    DateDisplay,
    MonthLabel,
    NextMonth,
    PreviousMonth,
    DayButton,
    Confirm,
    Store,
    TeamGroup,
    TeamChip,
    Field(RecordField),
}

#[derive(Debug)]
struct SiteState {
    view: View,
    signed_in: bool,
    picker_open: bool,
    shown_month: NaiveDate,
    pending_day: Option<NaiveDate>,
    selected: Option<NaiveDate>,
    month_steps: u32,
    login_lookups_to_fail: u32,
    month_label_lookups_to_fail: u32,
    backs_before_failure: Option<u32>,
    opened: Vec<String>,
    typed: Vec<String>,
    screenshots: Vec<PathBuf>,
}

pub struct SimulatedSite {
    locators: SiteLocators,
    store_name: String,
    calendar_start: NaiveDate,
    bookings: BTreeMap<NaiveDate, Vec<SimulatedBooking>>,
    disabled_days: HashSet<NaiveDate>,
    state: Mutex<SiteState>,
}

#[derive(Debug)]
pub struct SimulatedSiteBuilder {
    locators: SiteLocators,
    store_name: String,
    calendar_start: NaiveDate,
    bookings: BTreeMap<NaiveDate, Vec<SimulatedBooking>>,
    disabled_days: HashSet<NaiveDate>,
    signed_in: bool,
    selected: Option<NaiveDate>,
    login_lookups_to_fail: u32,
    month_label_lookups_to_fail: u32,
    backs_before_failure: Option<u32>,
}

impl SimulatedSiteBuilder {
    /// Month the picker shows when opened with no date selected.
    #[must_use]
    pub fn calendar_starts_at(mut self, month: NaiveDate) -> Self {
        self.calendar_start = month;
        self
    }

    /// Add a team booking; the store heading exists for every date that has
    /// an entry.
    #[must_use]
    pub fn booking(mut self, date: NaiveDate, booking: SimulatedBooking) -> Self {
        self.bookings.entry(date).or_default().push(booking);
        self
    }

    /// Show the store heading on `date` with no team groups under it.
    #[must_use]
    pub fn empty_store(mut self, date: NaiveDate) -> Self {
        self.bookings.entry(date).or_default();
        self
    }

    /// Render `date` as a padding cell so it cannot be picked.
    #[must_use]
    pub fn disable_day(mut self, date: NaiveDate) -> Self {
        self.disabled_days.insert(date);
        self
    }

    /// Start on the home view as if login already happened.
    #[must_use]
    pub fn signed_in(mut self) -> Self {
        self.signed_in = true;
        self
    }

    /// Start on the home view with `date` already picked.
    #[must_use]
    pub fn selected(mut self, date: NaiveDate) -> Self {
        self.signed_in = true;
        self.selected = Some(date);
        self
    }

    /// Hide the login form from the next `lookups` lookups.
    #[must_use]
    pub fn hide_login_form(mut self, lookups: u32) -> Self {
        self.login_lookups_to_fail = lookups;
        self
    }

    /// Hide the month header from the next `lookups` lookups made while
    /// the picker is open, as if it were still rendering.
    #[must_use]
    pub fn hide_month_label(mut self, lookups: u32) -> Self {
        self.month_label_lookups_to_fail = lookups;
        self
    }

    /// Let `successes` back navigations from a detail view work, then fail.
    #[must_use]
    pub fn back_fails_after(mut self, successes: u32) -> Self {
        self.backs_before_failure = Some(successes);
        self
    }

    #[must_use]
    pub fn build(self) -> SimulatedSite {
        let view = if self.signed_in { View::Home } else { View::Blank };
        SimulatedSite {
            state: Mutex::new(SiteState {
                view,
                signed_in: self.signed_in,
                picker_open: false,
                shown_month: first_of_month(self.calendar_start),
                pending_day: None,
                selected: self.selected,
                month_steps: 0,
                login_lookups_to_fail: self.login_lookups_to_fail,
                month_label_lookups_to_fail: self.month_label_lookups_to_fail,
                backs_before_failure: self.backs_before_failure,
                opened: Vec::new(),
                typed: Vec::new(),
                screenshots: Vec::new(),
            }),
            locators: self.locators,
            store_name: self.store_name,
            calendar_start: self.calendar_start,
            bookings: self.bookings,
            disabled_days: self.disabled_days,
        }
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn stale(element: &SimElement) -> ScraperError {
    ScraperError::Engine(format!("stale element reference: {element:?}"))
}

impl SimulatedSite {
    pub const STORE: &'static str = "마리엠헤어";

    #[must_use]
    pub fn builder() -> SimulatedSiteBuilder {
        SimulatedSiteBuilder {
            locators: SiteLocators::default(),
            store_name: Self::STORE.to_string(),
            calendar_start: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap_or_default(),
            bookings: BTreeMap::new(),
            disabled_days: HashSet::new(),
            signed_in: false,
            selected: None,
            login_lookups_to_fail: 0,
            month_label_lookups_to_fail: 0,
            backs_before_failure: None,
        }
    }

    /// Date most recently confirmed in the picker since the last page load.
    #[must_use]
    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.state().selected
    }

    /// Month steps taken over the site's lifetime.
    #[must_use]
    pub fn month_steps(&self) -> u32 {
        self.state().month_steps
    }

    #[must_use]
    pub fn opened_urls(&self) -> Vec<String> {
        self.state().opened.clone()
    }

    #[must_use]
    pub fn typed_values(&self) -> Vec<String> {
        self.state().typed.clone()
    }

    #[must_use]
    pub fn screenshots(&self) -> Vec<PathBuf> {
        self.state().screenshots.clone()
    }

    fn state(&self) -> MutexGuard<'_, SiteState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn role(&self, locator: &Locator) -> Option<Role> {
        let l = &self.locators;
        let role = if *locator == l.login_email {
            Role::Email
        } else if *locator == l.login_password {
            Role::Password
        } else if *locator == l.login_submit {
            Role::Submit
        } else if *locator == l.date_display {
            Role::DateDisplay
        } else if *locator == l.month_label {
            Role::MonthLabel
        } else if *locator == l.next_month {
            Role::NextMonth
        } else if *locator == l.previous_month {
            Role::PreviousMonth
        } else if *locator == l.day_button {
            Role::DayButton
        } else if *locator == l.confirm_button {
            Role::Confirm
        } else if *locator == l.store(&self.store_name) {
            Role::Store
        } else if *locator == l.team_group {
            Role::TeamGroup
        } else if *locator == l.team_chip {
            Role::TeamChip
        } else {
            return l
                .fields
                .iter()
                .find(|row| row.locator == *locator)
                .map(|row| Role::Field(row.field));
        };
        Some(role)
    }

    fn teams_for(&self, date: Option<NaiveDate>) -> &[SimulatedBooking] {
        date.and_then(|d| self.bookings.get(&d))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn calendar_grid(&self, month: NaiveDate) -> Vec<SimElement> {
        let padding = month.weekday().num_days_from_sunday();
        let mut cells: Vec<SimElement> = (0..padding)
            .map(|_| SimElement::Day {
                date: None,
                filler: true,
            })
            .collect();
        let mut day = Some(month);
        while let Some(date) = day.filter(|d| d.month() == month.month()) {
            cells.push(SimElement::Day {
                date: Some(date),
                filler: self.disabled_days.contains(&date),
            });
            day = date.succ_opt();
        }
        cells
    }

    /// Elements of `role` present in the current view.
    fn visible(&self, state: &mut SiteState, role: Role) -> Vec<SimElement> {
        let home = state.view == View::Home;
        let picker = home && state.picker_open;
        match role {
            Role::Email if state.view == View::Login => {
                if state.login_lookups_to_fail > 0 {
                    state.login_lookups_to_fail -= 1;
                    Vec::new()
                } else {
                    vec![SimElement::EmailInput]
                }
            }
            Role::Password if state.view == View::Login => vec![SimElement::PasswordInput],
            Role::Submit if state.view == View::Login => vec![SimElement::SubmitButton],
            Role::DateDisplay if home && !state.picker_open => vec![SimElement::DateDisplay],
            Role::MonthLabel if picker => {
                if state.month_label_lookups_to_fail > 0 {
                    state.month_label_lookups_to_fail -= 1;
                    Vec::new()
                } else {
                    vec![SimElement::MonthLabel]
                }
            }
            Role::NextMonth if picker => vec![SimElement::NextMonth],
            Role::PreviousMonth if picker => vec![SimElement::PreviousMonth],
            Role::Confirm if picker => vec![SimElement::ConfirmButton],
            Role::DayButton if picker => self.calendar_grid(state.shown_month),
            Role::Store
                if home
                    && !state.picker_open
                    && state.selected.is_some_and(|d| self.bookings.contains_key(&d)) =>
            {
                vec![SimElement::Store]
            }
            Role::TeamGroup if state.view == View::Store => {
                let teams = self.teams_for(state.selected).len();
                let mut groups: Vec<_> = (0..teams).map(|i| SimElement::TeamGroup(Some(i))).collect();
                groups.push(SimElement::TeamGroup(None));
                groups
            }
            Role::TeamChip if state.view == View::Store => {
                let teams = self.teams_for(state.selected).len();
                (0..teams).map(SimElement::TeamChip).collect()
            }
            Role::Field(field) => match state.view {
                View::Team(i) => self
                    .teams_for(state.selected)
                    .get(i)
                    .filter(|booking| booking.fields.contains_key(&field))
                    .map(|_| vec![SimElement::Field(field)])
                    .unwrap_or_default(),
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    fn attached(&self, state: &SiteState, element: &SimElement) -> bool {
        let home = state.view == View::Home;
        let picker = home && state.picker_open;
        match element {
            SimElement::EmailInput | SimElement::PasswordInput | SimElement::SubmitButton => {
                state.view == View::Login
            }
            SimElement::DateDisplay => home && !state.picker_open,
            SimElement::MonthLabel
            | SimElement::NextMonth
            | SimElement::PreviousMonth
            | SimElement::ConfirmButton => picker,
            SimElement::Day { .. } => {
                picker && self.calendar_grid(state.shown_month).contains(element)
            }
            SimElement::Store => home && !state.picker_open,
            SimElement::TeamGroup(_) | SimElement::TeamChip(_) => state.view == View::Store,
            SimElement::Field(_) => matches!(state.view, View::Team(_)),
        }
    }

    fn lookup(&self, locator: &Locator) -> Vec<SimElement> {
        let Some(role) = self.role(locator) else {
            return Vec::new();
        };
        let mut state = self.state();
        self.visible(&mut state, role)
    }
}

impl NavigationEngine for SimulatedSite {
    type Element = SimElement;

    async fn open(&self, url: &str) -> Result<(), ScraperError> {
        let mut state = self.state();
        state.opened.push(url.to_string());
        state.view = if state.signed_in {
            View::Home
        } else {
            View::Login
        };
        state.picker_open = false;
        state.pending_day = None;
        state.selected = None;
        Ok(())
    }

    async fn find(&self, locator: &Locator) -> Result<SimElement, ScraperError> {
        self.lookup(locator)
            .into_iter()
            .next()
            .ok_or_else(|| ScraperError::ElementNotFound {
                locator: locator.to_string(),
            })
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<SimElement>, ScraperError> {
        Ok(self.lookup(locator))
    }

    async fn find_within(
        &self,
        parent: &SimElement,
        locator: &Locator,
    ) -> Result<Vec<SimElement>, ScraperError> {
        let state = self.state();
        if !self.attached(&state, parent) {
            return Err(stale(parent));
        }
        let found = match (parent, self.role(locator)) {
            (SimElement::TeamGroup(Some(i)), Some(Role::TeamChip)) => {
                vec![SimElement::TeamChip(*i)]
            }
            _ => Vec::new(),
        };
        Ok(found)
    }

    async fn click(&self, element: &SimElement) -> Result<(), ScraperError> {
        let mut state = self.state();
        if !self.attached(&state, element) {
            return Err(stale(element));
        }
        match element {
            SimElement::SubmitButton => {
                state.signed_in = true;
                state.view = View::Home;
            }
            SimElement::DateDisplay => {
                state.picker_open = true;
                state.shown_month = first_of_month(state.selected.unwrap_or(self.calendar_start));
            }
            SimElement::NextMonth | SimElement::PreviousMonth => {
                let one = Months::new(1);
                let shifted = if *element == SimElement::NextMonth {
                    state.shown_month.checked_add_months(one)
                } else {
                    state.shown_month.checked_sub_months(one)
                };
                state.shown_month = shifted.ok_or_else(|| {
                    ScraperError::Engine("calendar out of range".to_string())
                })?;
                state.month_steps += 1;
            }
            SimElement::Day {
                date: Some(date),
                filler: false,
            } => state.pending_day = Some(*date),
            SimElement::ConfirmButton => {
                state.picker_open = false;
                if let Some(date) = state.pending_day.take() {
                    state.selected = Some(date);
                }
            }
            SimElement::Store => state.view = View::Store,
            SimElement::TeamGroup(Some(i)) => state.view = View::Team(*i),
            _ => {}
        }
        Ok(())
    }

    async fn type_text(&self, element: &SimElement, text: &str) -> Result<(), ScraperError> {
        let mut state = self.state();
        if !self.attached(&state, element) {
            return Err(stale(element));
        }
        state.typed.push(text.to_string());
        Ok(())
    }

    async fn text(&self, element: &SimElement) -> Result<String, ScraperError> {
        let state = self.state();
        if !self.attached(&state, element) {
            return Err(stale(element));
        }
        let text = match element {
            SimElement::MonthLabel => state.shown_month.format("%B %Y").to_string(),
            SimElement::Day { date, .. } => date.map(|d| d.day().to_string()).unwrap_or_default(),
            SimElement::Store => self.store_name.clone(),
            SimElement::TeamChip(i) => self
                .teams_for(state.selected)
                .get(*i)
                .and_then(|b| b.fields.get(&RecordField::Team).cloned())
                .unwrap_or_default(),
            SimElement::Field(field) => match state.view {
                View::Team(i) => self
                    .teams_for(state.selected)
                    .get(i)
                    .and_then(|b| b.fields.get(field).cloned())
                    .unwrap_or_default(),
                _ => String::new(),
            },
            _ => String::new(),
        };
        Ok(text)
    }

    async fn attribute(
        &self,
        element: &SimElement,
        name: &str,
    ) -> Result<Option<String>, ScraperError> {
        match element {
            SimElement::Day { filler, .. } if name == "class" => {
                let mut class = "MuiButtonBase-root MuiPickersDay-root".to_string();
                if *filler {
                    class.push(' ');
                    class.push_str(&self.locators.day_filler_class);
                }
                Ok(Some(class))
            }
            _ => Ok(None),
        }
    }

    async fn current_location(&self) -> Result<String, ScraperError> {
        let location = match self.state().view {
            View::Blank => "about:blank".to_string(),
            View::Login => "sim://login".to_string(),
            View::Home => "sim://home".to_string(),
            View::Store => "sim://store".to_string(),
            View::Team(i) => format!("sim://store/team/{i}"),
        };
        Ok(location)
    }

    async fn back(&self) -> Result<(), ScraperError> {
        let mut state = self.state();
        match state.view {
            View::Team(_) => {
                if let Some(remaining) = state.backs_before_failure {
                    if remaining == 0 {
                        return Err(ScraperError::Engine("history navigation failed".to_string()));
                    }
                    state.backs_before_failure = Some(remaining - 1);
                }
                state.view = View::Store;
            }
            View::Store => state.view = View::Home,
            View::Blank | View::Login | View::Home => {}
        }
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> Result<(), ScraperError> {
        self.state().screenshots.push(path.to_path_buf());
        Ok(())
    }
}
