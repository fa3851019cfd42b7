use cinegoods_browser::BrowserError;
use cinegoods_db::DbError;
use cinegoods_sheets::SheetsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error("sheets error: {0}")]
    Sheets(#[from] SheetsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected {source_name} payload: {reason}")]
    Payload { source_name: String, reason: String },
}

impl CrawlError {
    pub(crate) fn payload(source_name: &str, reason: impl std::fmt::Display) -> Self {
        CrawlError::Payload {
            source_name: source_name.to_string(),
            reason: reason.to_string(),
        }
    }
}
