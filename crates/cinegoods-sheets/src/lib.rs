//! Append-only Google Sheets sink.
//!
//! [`SheetsClient`] writes to the first worksheet of one spreadsheet, using
//! row 1 as the header contract. Access tokens come from a
//! [`TokenProvider`]; production uses [`ServiceAccountTokenProvider`].

pub mod auth;
pub mod client;
pub mod error;

pub use auth::{ServiceAccountTokenProvider, StaticToken, TokenProvider};
pub use client::{order_by_header, SheetRow, SheetsClient};
pub use error::SheetsError;
