use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("HTTP error talking to the WebDriver endpoint: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebDriver error \"{error}\": {message}")]
    WebDriver { error: String, message: String },

    #[error("element not found: {selector}")]
    NotFound { selector: String },

    #[error("timed out after {secs}s waiting for {what}")]
    Timeout { what: String, secs: u64 },

    #[error("unexpected WebDriver response for {context}: {reason}")]
    Protocol { context: String, reason: String },

    #[error("screenshot decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("page session is closed")]
    Closed,
}

impl BrowserError {
    /// `true` for errors that indicate a missing element or an expired wait,
    /// the recoverable cases callers typically fall back from.
    #[must_use]
    pub fn is_not_found_or_timeout(&self) -> bool {
        matches!(
            self,
            BrowserError::NotFound { .. } | BrowserError::Timeout { .. }
        )
    }
}
