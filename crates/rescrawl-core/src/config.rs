use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation are decoupled from the process environment so
/// tests can drive it with a plain `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_attempts = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let value = parse_u32(var, default)?;
        if value == 0 {
            return Err(invalid(var, "must be at least 1".to_string()));
        }
        Ok(value)
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        let raw = or_default(var, default);
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got \"{other}\""))),
        }
    };

    let login_id = require("RESCRAWL_LOGIN_ID")?;
    let login_password = require("RESCRAWL_LOGIN_PASSWORD")?;

    let env = parse_environment(&or_default("RESCRAWL_ENV", "development"));
    let base_url = or_default("RESCRAWL_BASE_URL", "https://guide.ktourstory.com/");
    let bind_addr = parse_addr("RESCRAWL_BIND_ADDR", "0.0.0.0:5000")?;
    let log_level = or_default("RESCRAWL_LOG_LEVEL", "info");
    let store_name = or_default("RESCRAWL_STORE_NAME", "마리엠헤어");
    let output_dir = PathBuf::from(or_default("RESCRAWL_OUTPUT_DIR", "output"));
    let locators_path = optional("RESCRAWL_LOCATORS_PATH").map(PathBuf::from);
    let headless = parse_bool("RESCRAWL_HEADLESS", "true")?;

    let explicit_wait_secs = parse_u64("RESCRAWL_EXPLICIT_WAIT_SECS", "15")?;
    let page_load_timeout_secs = parse_u64("RESCRAWL_PAGE_LOAD_TIMEOUT_SECS", "30")?;
    let short_delay_ms = parse_u64("RESCRAWL_SHORT_DELAY_MS", "1000")?;
    let medium_delay_ms = parse_u64("RESCRAWL_MEDIUM_DELAY_MS", "2000")?;
    let long_delay_ms = parse_u64("RESCRAWL_LONG_DELAY_MS", "3000")?;
    let step_delay_ms = parse_u64("RESCRAWL_STEP_DELAY_MS", "500")?;

    let login_max_attempts = parse_attempts("RESCRAWL_LOGIN_MAX_ATTEMPTS", "3")?;
    let login_retry_delay_ms = parse_u64("RESCRAWL_LOGIN_RETRY_DELAY_MS", "2000")?;
    let nav_max_attempts = parse_attempts("RESCRAWL_NAV_MAX_ATTEMPTS", "3")?;
    let nav_retry_delay_ms = parse_u64("RESCRAWL_NAV_RETRY_DELAY_MS", "1000")?;

    let sheets_url = optional("RESCRAWL_SHEETS_URL");
    let sheets_worksheet = or_default("RESCRAWL_SHEETS_WORKSHEET", "예약현황");
    let sheets_access_token = optional("RESCRAWL_SHEETS_ACCESS_TOKEN");
    let sheets_api_base = or_default(
        "RESCRAWL_SHEETS_API_BASE",
        "https://sheets.googleapis.com/",
    );

    let schedule_cron = optional("RESCRAWL_SCHEDULE_CRON");
    let schedule_days_ahead = parse_u32("RESCRAWL_SCHEDULE_DAYS_AHEAD", "7")?;

    Ok(AppConfig {
        env,
        base_url,
        login_id,
        login_password,
        bind_addr,
        log_level,
        store_name,
        output_dir,
        locators_path,
        headless,
        explicit_wait_secs,
        page_load_timeout_secs,
        short_delay_ms,
        medium_delay_ms,
        long_delay_ms,
        step_delay_ms,
        login_max_attempts,
        login_retry_delay_ms,
        nav_max_attempts,
        nav_retry_delay_ms,
        sheets_url,
        sheets_worksheet,
        sheets_access_token,
        sheets_api_base,
        schedule_cron,
        schedule_days_ahead,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
