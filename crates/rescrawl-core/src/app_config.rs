use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub base_url: String,
    pub login_id: String,
    pub login_password: String,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub store_name: String,
    pub output_dir: PathBuf,
    pub locators_path: Option<PathBuf>,
    pub headless: bool,
    pub explicit_wait_secs: u64,
    pub page_load_timeout_secs: u64,
    pub short_delay_ms: u64,
    pub medium_delay_ms: u64,
    pub long_delay_ms: u64,
    pub step_delay_ms: u64,
    pub login_max_attempts: u32,
    pub login_retry_delay_ms: u64,
    pub nav_max_attempts: u32,
    pub nav_retry_delay_ms: u64,
    pub sheets_url: Option<String>,
    pub sheets_worksheet: String,
    pub sheets_access_token: Option<String>,
    pub sheets_api_base: String,
    pub schedule_cron: Option<String>,
    pub schedule_days_ahead: u32,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("base_url", &self.base_url)
            .field("login_id", &self.login_id)
            .field("login_password", &"[redacted]")
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("store_name", &self.store_name)
            .field("output_dir", &self.output_dir)
            .field("locators_path", &self.locators_path)
            .field("headless", &self.headless)
            .field("explicit_wait_secs", &self.explicit_wait_secs)
            .field("page_load_timeout_secs", &self.page_load_timeout_secs)
            .field("short_delay_ms", &self.short_delay_ms)
            .field("medium_delay_ms", &self.medium_delay_ms)
            .field("long_delay_ms", &self.long_delay_ms)
            .field("step_delay_ms", &self.step_delay_ms)
            .field("login_max_attempts", &self.login_max_attempts)
            .field("login_retry_delay_ms", &self.login_retry_delay_ms)
            .field("nav_max_attempts", &self.nav_max_attempts)
            .field("nav_retry_delay_ms", &self.nav_retry_delay_ms)
            .field("sheets_url", &self.sheets_url)
            .field("sheets_worksheet", &self.sheets_worksheet)
            .field(
                "sheets_access_token",
                &self.sheets_access_token.as_ref().map(|_| "[redacted]"),
            )
            .field("sheets_api_base", &self.sheets_api_base)
            .field("schedule_cron", &self.schedule_cron)
            .field("schedule_days_ahead", &self.schedule_days_ahead)
            .finish()
    }
}
