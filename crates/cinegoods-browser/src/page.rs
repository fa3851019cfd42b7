//! The page and browser seams used by the crawler.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::BrowserError;
use crate::locator::Locator;

/// Browser window size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// What a screenshot covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenshotScope {
    /// The whole scrollable document, not just the viewport.
    FullPage,
    /// Only what is currently visible in the window.
    Window,
    /// The bounding box of the first element matching the locator.
    Element(Locator),
}

/// A network response observed by the page, with its decoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
}

/// A single browser tab.
///
/// Implementations must be usable through `&self` so a page can be shared
/// between list discovery and click-through capture.
#[async_trait]
pub trait Page: Send + Sync {
    /// Navigates and waits for the document to load, up to `timeout`.
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// Waits until the document is loaded and resource activity has settled.
    async fn wait_for_idle(&self, timeout: Duration) -> Result<(), BrowserError>;

    /// Waits until at least one element matches `locator`.
    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<(), BrowserError>;

    /// Number of elements currently matching `locator`.
    async fn count(&self, locator: &Locator) -> Result<usize, BrowserError>;

    /// `true` when the first match exists and has a non-empty bounding box.
    async fn is_visible(&self, locator: &Locator) -> Result<bool, BrowserError>;

    /// Clicks the first match, falling back to a script click when the
    /// element is covered or not interactable.
    async fn click(&self, locator: &Locator) -> Result<(), BrowserError>;

    /// Runs a synchronous script body and returns its `return` value.
    async fn evaluate(
        &self,
        script: &str,
        args: Vec<serde_json::Value>,
    ) -> Result<serde_json::Value, BrowserError>;

    /// Runs a script with the first match bound to `arguments[0]`.
    async fn evaluate_on(
        &self,
        locator: &Locator,
        script: &str,
    ) -> Result<serde_json::Value, BrowserError>;

    /// Serialized DOM of the current document.
    async fn content(&self) -> Result<String, BrowserError>;

    /// Writes a PNG of `scope` to `path`, creating parent directories.
    async fn screenshot(&self, path: &Path, scope: &ScreenshotScope) -> Result<(), BrowserError>;

    async fn go_back(&self) -> Result<(), BrowserError>;

    /// Responses seen since the page opened whose URL contains `url_fragment`.
    async fn responses(&self, url_fragment: &str) -> Result<Vec<CapturedResponse>, BrowserError>;

    /// Closes the tab. Safe to call more than once.
    async fn close(&self) -> Result<(), BrowserError>;
}

/// Opens pages.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn new_page(&self, viewport: Viewport) -> Result<Box<dyn Page>, BrowserError>;
}
