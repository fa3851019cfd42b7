use std::future::Future;

use crate::error::BrowserError;

/// Awaits `fut`, logging and swallowing any error.
///
/// For steps such as dismissing a popup that may legitimately be absent.
pub async fn best_effort<T, F>(label: &str, fut: F) -> Option<T>
where
    F: Future<Output = Result<T, BrowserError>>,
{
    match fut.await {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::debug!(step = label, error = %e, "optional browser step skipped");
            None
        }
    }
}
