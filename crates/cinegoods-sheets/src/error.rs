use thiserror::Error;

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid service-account key: {0}")]
    Key(#[from] jsonwebtoken::errors::Error),

    #[error("token exchange failed (HTTP {status}): {message}")]
    Auth { status: u16, message: String },

    #[error("Sheets API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("spreadsheet has no worksheets")]
    NoWorksheet,

    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}
