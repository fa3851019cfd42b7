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
    pub database_url: String,
    pub gemini_api_key: String,
    pub google_service_account_email: String,
    pub google_private_key: String,
    pub google_sheet_id: String,
    pub env: Environment,
    pub log_level: String,
    pub webdriver_url: String,
    pub browser_headless: bool,
    pub browser_user_agent: String,
    pub screenshot_dir: PathBuf,
    pub debug_dir: PathBuf,
    pub inter_target_delay_ms: u64,
    pub ai_models: Vec<String>,
    pub ai_attempts_per_model: u32,
    pub ai_rate_limit_cooldown_secs: u64,
    pub ai_request_timeout_secs: u64,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("gemini_api_key", &"[redacted]")
            .field(
                "google_service_account_email",
                &self.google_service_account_email,
            )
            .field("google_private_key", &"[redacted]")
            .field("google_sheet_id", &self.google_sheet_id)
            .field("webdriver_url", &self.webdriver_url)
            .field("browser_headless", &self.browser_headless)
            .field("browser_user_agent", &self.browser_user_agent)
            .field("screenshot_dir", &self.screenshot_dir)
            .field("debug_dir", &self.debug_dir)
            .field("inter_target_delay_ms", &self.inter_target_delay_ms)
            .field("ai_models", &self.ai_models)
            .field("ai_attempts_per_model", &self.ai_attempts_per_model)
            .field(
                "ai_rate_limit_cooldown_secs",
                &self.ai_rate_limit_cooldown_secs,
            )
            .field("ai_request_timeout_secs", &self.ai_request_timeout_secs)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}
