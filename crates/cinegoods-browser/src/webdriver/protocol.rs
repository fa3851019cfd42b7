//! Wire types for the W3C WebDriver protocol and chromedriver extensions.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::BrowserError;
use crate::page::Viewport;

/// Key under which W3C WebDriver serializes element references.
pub(crate) const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Every WebDriver response wraps its payload in `{"value": ...}`.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub value: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewSession {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorValue {
    error: String,
    #[serde(default)]
    message: String,
}

/// One entry of the chromedriver `performance` log.
#[derive(Debug, Deserialize)]
pub(crate) struct LogEntry {
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct PerfMessage {
    message: PerfEvent,
}

#[derive(Debug, Deserialize)]
struct PerfEvent {
    method: String,
    #[serde(default)]
    params: Value,
}

/// A `Network.responseReceived` event pulled out of the performance log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ObservedResponse {
    pub request_id: String,
    pub url: String,
    pub status: u16,
}

/// Session capabilities for a Chrome tab of the given size.
pub(crate) fn capabilities(viewport: Viewport, headless: bool, user_agent: &str) -> Value {
    let mut args = vec![
        format!("--window-size={},{}", viewport.width, viewport.height),
        format!("--user-agent={user_agent}"),
        "--lang=ko-KR".to_string(),
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
    ];
    if headless {
        args.push("--headless=new".to_string());
    }
    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "chrome",
                "goog:chromeOptions": { "args": args },
                "goog:loggingPrefs": { "performance": "ALL" }
            }
        }
    })
}

/// Maps a non-2xx WebDriver reply to a [`BrowserError`].
pub(crate) fn map_error(status: u16, body: &str, context: &str) -> BrowserError {
    match serde_json::from_str::<Envelope<ErrorValue>>(body) {
        Ok(env) if env.value.error == "no such element" => BrowserError::NotFound {
            selector: context.to_string(),
        },
        Ok(env) => BrowserError::WebDriver {
            error: env.value.error,
            message: env.value.message,
        },
        Err(_) => BrowserError::Protocol {
            context: context.to_string(),
            reason: format!("HTTP {status}: {body}"),
        },
    }
}

/// Element ids from a `find elements` reply.
pub(crate) fn element_ids(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .filter_map(|v| v.get(ELEMENT_KEY).and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

pub(crate) fn element_arg(id: &str) -> Value {
    json!({ ELEMENT_KEY: id })
}

/// Extracts response events from raw performance log entries.
///
/// Entries that are not `Network.responseReceived` or do not parse are
/// ignored.
pub(crate) fn parse_performance_log(entries: &[LogEntry]) -> Vec<ObservedResponse> {
    entries
        .iter()
        .filter_map(|entry| serde_json::from_str::<PerfMessage>(&entry.message).ok())
        .filter(|m| m.message.method == "Network.responseReceived")
        .filter_map(|m| {
            let params = &m.message.params;
            let request_id = params.get("requestId")?.as_str()?.to_string();
            let response = params.get("response")?;
            let url = response.get("url")?.as_str()?.to_string();
            let status = response
                .get("status")
                .and_then(Value::as_u64)
                .and_then(|s| u16::try_from(s).ok())
                .unwrap_or(0);
            Some(ObservedResponse {
                request_id,
                url,
                status,
            })
        })
        .collect()
}
