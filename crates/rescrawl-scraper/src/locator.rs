//! Element locators and the declarative site table.
//!
//! Every selector the crawler uses lives in [`SiteLocators`], so UI churn on
//! the vendor side is a data change, not a control-flow change. The built-in
//! table matches the current booking UI; a YAML file with the same shape can
//! replace it at startup.

use std::collections::HashSet;
use std::path::Path;

use rescrawl_core::RecordField;
use serde::{Deserialize, Serialize};

use crate::error::ScraperError;

/// How to find an element on the page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locator {
    Css(String),
    Xpath(String),
}

impl Locator {
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    #[must_use]
    pub fn xpath(path: impl Into<String>) -> Self {
        Locator::Xpath(path.into())
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css:{s}"),
            Locator::Xpath(s) => write!(f, "xpath:{s}"),
        }
    }
}

/// One row of the detail-view field table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLocator {
    pub field: RecordField,
    pub locator: Locator,
    /// Keep only the text after the first `:` ("Time Request: 12:00" -> "12:00").
    #[serde(default)]
    pub strip_label: bool,
}

/// Every selector the crawl touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteLocators {
    pub login_email: Locator,
    pub login_password: Locator,
    pub login_submit: Locator,
    /// The date shown on the home view; activating it opens the picker.
    pub date_display: Locator,
    /// Picker header, text like `"December 2025"`.
    pub month_label: Locator,
    pub next_month: Locator,
    pub previous_month: Locator,
    pub day_button: Locator,
    /// Class carried by the blank day cells that pad the calendar grid.
    pub day_filler_class: String,
    pub confirm_button: Locator,
    /// XPath with a `{store}` placeholder for the store heading.
    pub store_template: String,
    pub team_group: Locator,
    pub team_chip: Locator,
    pub fields: Vec<FieldLocator>,
}

impl SiteLocators {
    /// Locator for the store heading on the selected date.
    #[must_use]
    pub fn store(&self, store_name: &str) -> Locator {
        Locator::Xpath(self.store_template.replace("{store}", &xpath_literal(store_name)))
    }

    fn validate(&self) -> Result<(), String> {
        if !self.store_template.contains("{store}") {
            return Err("store_template must contain a {store} placeholder".to_string());
        }
        if self.fields.is_empty() {
            return Err("fields must list at least one detail field".to_string());
        }
        let mut seen = HashSet::new();
        for row in &self.fields {
            if row.field == RecordField::Date {
                return Err("the date field is set from the selected date, not read".to_string());
            }
            if !seen.insert(row.field) {
                return Err(format!("field {} is listed twice", row.field));
            }
        }
        Ok(())
    }
}

impl Default for SiteLocators {
    fn default() -> Self {
        let field = |field, css: &str, strip_label| FieldLocator {
            field,
            locator: Locator::css(css),
            strip_label,
        };

        Self {
            login_email: Locator::css(
                r#"input[type="email"], input[name="email"], input[id*="email"]"#,
            ),
            login_password: Locator::css(r#"input[type="password"]"#),
            login_submit: Locator::css(r#"button[type="submit"]"#),
            date_display: Locator::css("p.MuiTypography-root.MuiTypography-body1.css-1a5pbt3"),
            month_label: Locator::css("div.MuiPickersCalendarHeader-label.css-1v994a0"),
            next_month: Locator::css(r#"button[aria-label="Next month"]"#),
            previous_month: Locator::css(r#"button[aria-label="Previous month"]"#),
            day_button: Locator::css(
                "button.MuiButtonBase-root.MuiPickersDay-root.MuiPickersDay-dayWithMargin",
            ),
            day_filler_class: "MuiPickersDay-hiddenDaySpacingFiller".to_string(),
            confirm_button: Locator::xpath(r#"//button[text()="OK"]"#),
            store_template: "//h6[text()={store}]".to_string(),
            team_group: Locator::css("div.MuiBox-root.css-k008qs"),
            team_chip: Locator::css("div.MuiChip-root"),
            fields: vec![
                field(
                    RecordField::Team,
                    "span.MuiChip-label.MuiChip-labelSmall.css-19imqg1",
                    false,
                ),
                field(
                    RecordField::CustomerName,
                    "h6.MuiTypography-root.MuiTypography-subtitle1.css-qdk4z1",
                    false,
                ),
                field(
                    RecordField::ReservationNumber,
                    "h6.MuiTypography-root.MuiTypography-subtitle2.css-1r042ka",
                    false,
                ),
                field(
                    RecordField::Channel,
                    "div.MuiAvatar-root.MuiAvatar-circular.MuiAvatar-colorDefault.MuiChip-avatar.MuiChip-avatarSmall.MuiChip-avatarColorPrimary.css-1buxfho",
                    false,
                ),
                field(
                    RecordField::PeopleCount,
                    "p.MuiTypography-root.MuiTypography-subtitle2.css-mdkayp",
                    false,
                ),
                field(
                    RecordField::Country,
                    "span.MuiTypography-root.MuiTypography-subtitle2.css-xcju41",
                    false,
                ),
                field(
                    RecordField::Product,
                    "p.MuiTypography-root.MuiTypography-subtitle2.css-1q5lgor",
                    true,
                ),
                field(
                    RecordField::TimeRequest,
                    "p.MuiTypography-root.MuiTypography-subtitle2.css-17exa0r",
                    true,
                ),
            ],
        }
    }
}

/// Quote `value` as an XPath string literal.
fn xpath_literal(value: &str) -> String {
    if !value.contains('"') {
        format!("\"{value}\"")
    } else if !value.contains('\'') {
        format!("'{value}'")
    } else {
        let parts: Vec<String> = value.split('"').map(|p| format!("\"{p}\"")).collect();
        format!("concat({})", parts.join(", '\"', "))
    }
}

/// Load a site table from YAML.
///
/// # Errors
///
/// Returns [`ScraperError::LocatorFile`] if the file cannot be read or
/// parsed, or if the table is inconsistent (duplicate fields, no `{store}`
/// placeholder).
pub fn load_site_locators(path: &Path) -> Result<SiteLocators, ScraperError> {
    let file_error = |reason: String| ScraperError::LocatorFile {
        path: path.display().to_string(),
        reason,
    };

    let content = std::fs::read_to_string(path).map_err(|e| file_error(e.to_string()))?;
    let locators: SiteLocators =
        serde_yaml::from_str(&content).map_err(|e| file_error(e.to_string()))?;
    locators.validate().map_err(file_error)?;
    Ok(locators)
}
