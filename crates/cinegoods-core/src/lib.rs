//! Shared domain types, configuration, and pure pipeline logic for the
//! cinema goods-event crawler.

pub mod app_config;
pub mod config;
pub mod filter;
pub mod listing;
pub mod period;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use filter::{filter_targets, CGV_KEYWORDS, LOTTE_KEYWORDS, MEGABOX_KEYWORDS};
pub use listing::{
    strip_bracket_prefix, Cinema, EnrichedListing, Enrichment, EventRecord, LifecycleStatus,
    ScrapedListing, ALL_LOCATIONS, GENERAL_MOVIE, UNKNOWN_GOODS,
};
pub use period::{is_upcoming, parse_short_start_date};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingEnvVars(Vec<String>),

    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
