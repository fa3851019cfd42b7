use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Variables that must be present for any crawl to start.
pub const REQUIRED_ENV_VARS: &[&str] = &[
    "DATABASE_URL",
    "GEMINI_API_KEY",
    "GOOGLE_SERVICE_ACCOUNT_EMAIL",
    "GOOGLE_PRIVATE_KEY",
    "GOOGLE_SHEET_ID",
];

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

const DEFAULT_AI_MODELS: &str =
    "gemini-2.5-flash-lite,gemini-2.5-flash,gemini-2.5-pro,gemini-2.0-flash,gemini-2.0-pro";

/// Load application configuration from environment variables.
///
/// Loads `.env.local` and then `.env` (both optional) before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::from_filename(".env.local").ok();
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

/// Core parsing/validation logic, decoupled from the process environment so it
/// can be driven by a plain `HashMap` in tests.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let present = |var: &str| lookup(var).ok().filter(|v| !v.trim().is_empty());

    let missing: Vec<String> = REQUIRED_ENV_VARS
        .iter()
        .filter(|var| present(var).is_none())
        .map(|var| (*var).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ConfigError::MissingEnvVars(missing));
    }

    let require = |var: &str| -> Result<String, ConfigError> {
        present(var).ok_or_else(|| ConfigError::MissingEnvVars(vec![var.to_string()]))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u32>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        let raw = or_default(var, default);
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            other => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("expected a boolean, got \"{other}\""),
            }),
        }
    };

    let database_url = require("DATABASE_URL")?;
    let gemini_api_key = require("GEMINI_API_KEY")?;
    let google_service_account_email = require("GOOGLE_SERVICE_ACCOUNT_EMAIL")?;
    let google_private_key = require("GOOGLE_PRIVATE_KEY")?.replace("\\n", "\n");
    let google_sheet_id = require("GOOGLE_SHEET_ID")?;

    let env = parse_environment(&or_default("CINEGOODS_ENV", "development"));
    let log_level = or_default("CINEGOODS_LOG_LEVEL", "info");

    let webdriver_url = or_default("CINEGOODS_WEBDRIVER_URL", "http://localhost:9515");
    let browser_headless = parse_bool("CINEGOODS_BROWSER_HEADLESS", "true")?;
    let browser_user_agent = or_default("CINEGOODS_BROWSER_USER_AGENT", DEFAULT_USER_AGENT);
    let screenshot_dir = PathBuf::from(or_default("CINEGOODS_SCREENSHOT_DIR", "./crawled_images"));
    let debug_dir = PathBuf::from(or_default("CINEGOODS_DEBUG_DIR", "./debug"));
    let inter_target_delay_ms = parse_u64("CINEGOODS_INTER_TARGET_DELAY_MS", "3000")?;

    let ai_models = parse_model_list(&or_default("CINEGOODS_AI_MODELS", DEFAULT_AI_MODELS));
    if ai_models.is_empty() {
        return Err(ConfigError::InvalidEnvVar {
            var: "CINEGOODS_AI_MODELS".to_string(),
            reason: "at least one model name is required".to_string(),
        });
    }
    let ai_attempts_per_model = parse_u32("CINEGOODS_AI_ATTEMPTS_PER_MODEL", "2")?.max(1);
    let ai_rate_limit_cooldown_secs = parse_u64("CINEGOODS_AI_RATE_LIMIT_COOLDOWN_SECS", "10")?;
    let ai_request_timeout_secs = parse_u64("CINEGOODS_AI_REQUEST_TIMEOUT_SECS", "60")?;

    let db_max_connections = parse_u32("CINEGOODS_DB_MAX_CONNECTIONS", "5")?;
    let db_min_connections = parse_u32("CINEGOODS_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("CINEGOODS_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    Ok(AppConfig {
        database_url,
        gemini_api_key,
        google_service_account_email,
        google_private_key,
        google_sheet_id,
        env,
        log_level,
        webdriver_url,
        browser_headless,
        browser_user_agent,
        screenshot_dir,
        debug_dir,
        inter_target_delay_ms,
        ai_models,
        ai_attempts_per_model,
        ai_rate_limit_cooldown_secs,
        ai_request_timeout_secs,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
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

/// Split a comma-separated model list, dropping blanks and keeping order.
fn parse_model_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
