//! Goods-event extraction from detail-page screenshots.
//!
//! [`GeminiClient`] talks to the generation service, [`for_each_model`]
//! walks the configured model list with rate-limit retries, and
//! [`Analyzer`] ties both to response parsing so callers get an
//! [`Enrichment`](cinegoods_core::Enrichment) for every screenshot.

pub mod analyzer;
pub mod client;
pub mod error;
pub mod fallback;
pub mod parse;
pub mod prompt;

pub use analyzer::Analyzer;
pub use client::{GeminiClient, GenerativeModel};
pub use error::VisionError;
pub use fallback::{for_each_model, is_rate_limited, FallbackPolicy};
pub use parse::{normalize, parse_extraction};
pub use prompt::extraction_prompt;
