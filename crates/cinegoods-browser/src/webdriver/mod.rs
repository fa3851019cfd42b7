//! [`Browser`] and [`Page`] over a chromedriver endpoint.
//!
//! Each page is its own WebDriver session, so pages never share navigation
//! state. Full-page screenshots and network capture use chromedriver's
//! `goog/cdp/execute` bridge and `performance` log; when the bridge is not
//! available a viewport screenshot is taken instead.

mod protocol;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::BrowserError;
use crate::locator::Locator;
use crate::page::{Browser, CapturedResponse, Page, ScreenshotScope, Viewport};

use protocol::{Envelope, LogEntry, NewSession, ObservedResponse};

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Unmatched intercepted responses kept per page for later polls.
const MAX_PENDING_RESPONSES: usize = 256;

/// Opens one WebDriver session per page.
pub struct WebDriverBrowser {
    client: Client,
    base_url: String,
    headless: bool,
    user_agent: String,
}

impl WebDriverBrowser {
    /// Creates a browser handle for the chromedriver at `base_url`.
    ///
    /// No session is opened until [`Browser::new_page`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, headless: bool, user_agent: &str) -> Result<Self, BrowserError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            headless,
            user_agent: user_agent.to_string(),
        })
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn new_page(&self, viewport: Viewport) -> Result<Box<dyn Page>, BrowserError> {
        let caps = protocol::capabilities(viewport, self.headless, &self.user_agent);
        let resp = self
            .client
            .post(format!("{}/session", self.base_url))
            .json(&caps)
            .send()
            .await?;
        let session: NewSession = read_value(resp, "new session").await?;
        tracing::debug!(session_id = %session.session_id, "opened browser page");

        Ok(Box::new(WebDriverPage {
            client: self.client.clone(),
            session_url: format!("{}/session/{}", self.base_url, session.session_id),
            session_id: session.session_id,
            closed: AtomicBool::new(false),
            observed: Mutex::new(Vec::new()),
        }))
    }
}

/// A single WebDriver session.
pub struct WebDriverPage {
    client: Client,
    session_url: String,
    session_id: String,
    closed: AtomicBool,
    observed: Mutex<Vec<ObservedResponse>>,
}

impl WebDriverPage {
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn command<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        context: &str,
    ) -> Result<T, BrowserError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BrowserError::Closed);
        }
        let mut req = self
            .client
            .request(method, format!("{}{path}", self.session_url));
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await?;
        read_value(resp, context).await
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<String>, BrowserError> {
        let (using, value) = locator.strategy();
        let found: Vec<Value> = self
            .command(
                Method::POST,
                "/elements",
                Some(json!({ "using": using, "value": value })),
                &locator.to_string(),
            )
            .await?;
        Ok(protocol::element_ids(&found))
    }

    async fn find_first(&self, locator: &Locator) -> Result<String, BrowserError> {
        self.find_all(locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BrowserError::NotFound {
                selector: locator.to_string(),
            })
    }

    async fn cdp(&self, cmd: &str, params: Value) -> Result<Value, BrowserError> {
        self.command(
            Method::POST,
            "/goog/cdp/execute",
            Some(json!({ "cmd": cmd, "params": params })),
            cmd,
        )
        .await
    }

    async fn full_page_png(&self) -> Result<Vec<u8>, BrowserError> {
        match self.cdp_full_page_png().await {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                tracing::debug!(error = %e, "full-page capture unavailable, using viewport");
                self.viewport_png().await
            }
        }
    }

    async fn cdp_full_page_png(&self) -> Result<Vec<u8>, BrowserError> {
        let metrics = self.cdp("Page.getLayoutMetrics", json!({})).await?;
        let size = metrics
            .get("cssContentSize")
            .or_else(|| metrics.get("contentSize"))
            .ok_or_else(|| BrowserError::Protocol {
                context: "Page.getLayoutMetrics".to_string(),
                reason: "no content size in reply".to_string(),
            })?;
        let width = size.get("width").and_then(Value::as_f64).unwrap_or(0.0).ceil();
        let height = size.get("height").and_then(Value::as_f64).unwrap_or(0.0).ceil();

        let shot = self
            .cdp(
                "Page.captureScreenshot",
                json!({
                    "format": "png",
                    "captureBeyondViewport": true,
                    "clip": { "x": 0, "y": 0, "width": width, "height": height, "scale": 1 }
                }),
            )
            .await?;
        let data = shot
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::Protocol {
                context: "Page.captureScreenshot".to_string(),
                reason: "no image data in reply".to_string(),
            })?;
        Ok(STANDARD.decode(data)?)
    }

    async fn viewport_png(&self) -> Result<Vec<u8>, BrowserError> {
        let data: String = self
            .command(Method::GET, "/screenshot", None, "screenshot")
            .await?;
        Ok(STANDARD.decode(data)?)
    }

    async fn element_png(&self, locator: &Locator) -> Result<Vec<u8>, BrowserError> {
        let id = self.find_first(locator).await?;
        let data: String = self
            .command(
                Method::GET,
                &format!("/element/{id}/screenshot"),
                None,
                &locator.to_string(),
            )
            .await?;
        Ok(STANDARD.decode(data)?)
    }

    async fn response_body(&self, observed: &ObservedResponse) -> Result<String, BrowserError> {
        let reply = self
            .cdp(
                "Network.getResponseBody",
                json!({ "requestId": observed.request_id }),
            )
            .await?;
        let body = reply.get("body").and_then(Value::as_str).unwrap_or_default();
        let encoded = reply
            .get("base64Encoded")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if encoded {
            let bytes = STANDARD.decode(body)?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        } else {
            Ok(body.to_string())
        }
    }
}

#[async_trait]
impl Page for WebDriverPage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        let page_load_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let _: Value = self
            .command(
                Method::POST,
                "/timeouts",
                Some(json!({ "pageLoad": page_load_ms })),
                "set timeouts",
            )
            .await?;
        let result: Result<Value, BrowserError> = self
            .command(Method::POST, "/url", Some(json!({ "url": url })), url)
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(BrowserError::WebDriver { error, .. }) if error == "timeout" => {
                Err(BrowserError::Timeout {
                    what: format!("navigation to {url}"),
                    secs: timeout.as_secs(),
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn wait_for_idle(&self, timeout: Duration) -> Result<(), BrowserError> {
        let deadline = Instant::now() + timeout;
        let mut last_count: Option<u64> = None;
        loop {
            let state = self
                .evaluate(
                    "return [document.readyState, performance.getEntriesByType('resource').length];",
                    Vec::new(),
                )
                .await?;
            let ready = state.get(0).and_then(Value::as_str) == Some("complete");
            let count = state.get(1).and_then(Value::as_u64);
            if ready && count.is_some() && count == last_count {
                return Ok(());
            }
            last_count = count;
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout {
                    what: "network idle".to_string(),
                    secs: timeout.as_secs(),
                });
            }
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
        }
    }

    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<(), BrowserError> {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.find_all(locator).await?.is_empty() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout {
                    what: locator.to_string(),
                    secs: timeout.as_secs(),
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn count(&self, locator: &Locator) -> Result<usize, BrowserError> {
        Ok(self.find_all(locator).await?.len())
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool, BrowserError> {
        let Some(id) = self.find_all(locator).await?.into_iter().next() else {
            return Ok(false);
        };
        let visible = self
            .evaluate(
                "const r = arguments[0].getBoundingClientRect(); return r.width > 0 && r.height > 0;",
                vec![protocol::element_arg(&id)],
            )
            .await?;
        Ok(visible.as_bool().unwrap_or(false))
    }

    async fn click(&self, locator: &Locator) -> Result<(), BrowserError> {
        let id = self.find_first(locator).await?;
        let result: Result<Value, BrowserError> = self
            .command(
                Method::POST,
                &format!("/element/{id}/click"),
                Some(json!({})),
                &locator.to_string(),
            )
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(BrowserError::WebDriver { error, .. })
                if error == "element click intercepted" || error == "element not interactable" =>
            {
                tracing::debug!(locator = %locator, reason = %error, "falling back to script click");
                self.evaluate("arguments[0].click();", vec![protocol::element_arg(&id)])
                    .await
                    .map(|_| ())
            }
            Err(e) => Err(e),
        }
    }

    async fn evaluate(&self, script: &str, args: Vec<Value>) -> Result<Value, BrowserError> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script, "args": args })),
            "execute script",
        )
        .await
    }

    async fn evaluate_on(&self, locator: &Locator, script: &str) -> Result<Value, BrowserError> {
        let id = self.find_first(locator).await?;
        self.evaluate(script, vec![protocol::element_arg(&id)]).await
    }

    async fn content(&self) -> Result<String, BrowserError> {
        self.command(Method::GET, "/source", None, "page source")
            .await
    }

    async fn screenshot(&self, path: &Path, scope: &ScreenshotScope) -> Result<(), BrowserError> {
        let png = match scope {
            ScreenshotScope::FullPage => self.full_page_png().await?,
            ScreenshotScope::Window => self.viewport_png().await?,
            ScreenshotScope::Element(locator) => self.element_png(locator).await?,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, png).await?;
        Ok(())
    }

    async fn go_back(&self) -> Result<(), BrowserError> {
        let _: Value = self
            .command(Method::POST, "/back", Some(json!({})), "history back")
            .await?;
        Ok(())
    }

    async fn responses(&self, url_fragment: &str) -> Result<Vec<CapturedResponse>, BrowserError> {
        let entries: Vec<LogEntry> = self
            .command(
                Method::POST,
                "/se/log",
                Some(json!({ "type": "performance" })),
                "performance log",
            )
            .await?;

        // The log is drained on every read, so unmatched responses are kept
        // for later polls. Matches leave the buffer once their body is read.
        let matching: Vec<ObservedResponse> = {
            let mut observed = self.observed.lock().await;
            observed.extend(protocol::parse_performance_log(&entries));
            let (matching, rest): (Vec<_>, Vec<_>) = observed
                .drain(..)
                .partition(|r| r.url.contains(url_fragment));
            *observed = rest;
            let excess = observed.len().saturating_sub(MAX_PENDING_RESPONSES);
            observed.drain(..excess);
            matching
        };

        let mut captured = Vec::with_capacity(matching.len());
        let mut pending = Vec::new();
        for observed in matching {
            match self.response_body(&observed).await {
                Ok(body) => captured.push(CapturedResponse {
                    url: observed.url,
                    status: observed.status,
                    body,
                }),
                Err(e) => {
                    tracing::debug!(url = %observed.url, error = %e, "response body not available yet");
                    pending.push(observed);
                }
            }
        }
        if !pending.is_empty() {
            self.observed.lock().await.extend(pending);
        }
        Ok(captured)
    }

    async fn close(&self) -> Result<(), BrowserError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let resp = self.client.delete(&self.session_url).send().await?;
        let _: Value = read_value(resp, "delete session").await?;
        tracing::debug!(session_id = %self.session_id, "closed browser page");
        Ok(())
    }
}

async fn read_value<T: DeserializeOwned>(
    resp: reqwest::Response,
    context: &str,
) -> Result<T, BrowserError> {
    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        return Err(protocol::map_error(status.as_u16(), &text, context));
    }
    serde_json::from_str::<Envelope<T>>(&text)
        .map(|env| env.value)
        .map_err(|e| BrowserError::Protocol {
            context: context.to_string(),
            reason: e.to_string(),
        })
}
