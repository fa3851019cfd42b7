//! Scripted in-memory [`Page`] and [`Browser`] for crawler tests.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cinegoods_browser::{
    Browser, BrowserError, CapturedResponse, Locator, Page, ScreenshotScope, Viewport,
};
use serde_json::Value;

#[derive(Default)]
struct Script {
    present: HashMap<String, usize>,
    hidden: HashSet<String>,
    evaluations: Vec<(String, Value)>,
    responses: Vec<CapturedResponse>,
    failing: HashSet<&'static str>,
}

/// A page whose DOM is a set of locator strings.
///
/// Every call is appended to a log shared by all clones, so a test can
/// assert on the exact interaction sequence.
#[derive(Clone, Default)]
pub(crate) struct FakePage {
    script: Arc<Mutex<Script>>,
    log: Arc<Mutex<Vec<String>>>,
}

impl FakePage {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_element(self, locator: &Locator) -> Self {
        self.script
            .lock()
            .unwrap()
            .present
            .insert(locator.to_string(), 1);
        self
    }

    /// Present in the DOM but with an empty bounding box.
    pub(crate) fn with_hidden_element(self, locator: &Locator) -> Self {
        {
            let mut s = self.script.lock().unwrap();
            s.present.insert(locator.to_string(), 1);
            s.hidden.insert(locator.to_string());
        }
        self
    }

    /// Scripts containing `fragment` evaluate to `value`.
    pub(crate) fn with_evaluation(self, fragment: &str, value: Value) -> Self {
        self.script
            .lock()
            .unwrap()
            .evaluations
            .push((fragment.to_string(), value));
        self
    }

    pub(crate) fn with_response(self, url: &str, body: &str) -> Self {
        self.script.lock().unwrap().responses.push(CapturedResponse {
            url: url.to_string(),
            status: 200,
            body: body.to_string(),
        });
        self
    }

    /// Makes the named operation (`goto`, `screenshot`, `go_back`, ...) fail.
    pub(crate) fn failing(self, op: &'static str) -> Self {
        self.script.lock().unwrap().failing.insert(op);
        self
    }

    pub(crate) fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub(crate) fn logged(&self, prefix: &str) -> usize {
        self.log().iter().filter(|l| l.starts_with(prefix)).count()
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }

    fn check(&self, op: &'static str) -> Result<(), BrowserError> {
        if self.script.lock().unwrap().failing.contains(op) {
            return Err(BrowserError::Protocol {
                context: op.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        Ok(())
    }

    fn is_present(&self, locator: &Locator) -> bool {
        self.script
            .lock()
            .unwrap()
            .present
            .contains_key(&locator.to_string())
    }

    fn evaluation_for(&self, script: &str) -> Value {
        self.script
            .lock()
            .unwrap()
            .evaluations
            .iter()
            .find(|(fragment, _)| script.contains(fragment.as_str()))
            .map_or(Value::Null, |(_, v)| v.clone())
    }
}

fn scope_label(scope: &ScreenshotScope) -> String {
    match scope {
        ScreenshotScope::FullPage => "full".to_string(),
        ScreenshotScope::Window => "window".to_string(),
        ScreenshotScope::Element(l) => format!("element {l}"),
    }
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&self, url: &str, _timeout: Duration) -> Result<(), BrowserError> {
        self.record(format!("goto {url}"));
        self.check("goto")
    }

    async fn wait_for_idle(&self, _timeout: Duration) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<(), BrowserError> {
        self.check("wait_for")?;
        if self.is_present(locator) {
            Ok(())
        } else {
            Err(BrowserError::Timeout {
                what: locator.to_string(),
                secs: timeout.as_secs(),
            })
        }
    }

    async fn count(&self, locator: &Locator) -> Result<usize, BrowserError> {
        Ok(self
            .script
            .lock()
            .unwrap()
            .present
            .get(&locator.to_string())
            .copied()
            .unwrap_or(0))
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool, BrowserError> {
        let hidden = self
            .script
            .lock()
            .unwrap()
            .hidden
            .contains(&locator.to_string());
        Ok(self.is_present(locator) && !hidden)
    }

    async fn click(&self, locator: &Locator) -> Result<(), BrowserError> {
        if !self.is_present(locator) {
            return Err(BrowserError::NotFound {
                selector: locator.to_string(),
            });
        }
        self.record(format!("click {locator}"));
        Ok(())
    }

    async fn evaluate(&self, script: &str, _args: Vec<Value>) -> Result<Value, BrowserError> {
        self.check("evaluate")?;
        Ok(self.evaluation_for(script))
    }

    async fn evaluate_on(&self, locator: &Locator, script: &str) -> Result<Value, BrowserError> {
        if !self.is_present(locator) {
            return Err(BrowserError::NotFound {
                selector: locator.to_string(),
            });
        }
        Ok(self.evaluation_for(script))
    }

    async fn content(&self) -> Result<String, BrowserError> {
        Ok("<html><body>list</body></html>".to_string())
    }

    async fn screenshot(&self, path: &Path, scope: &ScreenshotScope) -> Result<(), BrowserError> {
        self.check("screenshot")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, b"\x89PNG")?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.record(format!("screenshot {name} {}", scope_label(scope)));
        Ok(())
    }

    async fn go_back(&self) -> Result<(), BrowserError> {
        self.record("back".to_string());
        self.check("go_back")
    }

    async fn responses(&self, url_fragment: &str) -> Result<Vec<CapturedResponse>, BrowserError> {
        self.record(format!("responses {url_fragment}"));
        Ok(self
            .script
            .lock()
            .unwrap()
            .responses
            .iter()
            .filter(|r| r.url.contains(url_fragment))
            .cloned()
            .collect())
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.record("close".to_string());
        Ok(())
    }
}

/// Hands out clones of one scripted page.
pub(crate) struct FakeBrowser {
    pub(crate) page: FakePage,
    fail_new_page: bool,
}

impl FakeBrowser {
    pub(crate) fn new(page: FakePage) -> Self {
        Self {
            page,
            fail_new_page: false,
        }
    }

    pub(crate) fn unavailable() -> Self {
        Self {
            page: FakePage::new(),
            fail_new_page: true,
        }
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn new_page(&self, viewport: Viewport) -> Result<Box<dyn Page>, BrowserError> {
        if self.fail_new_page {
            return Err(BrowserError::Closed);
        }
        self.page
            .record(format!("new_page {}x{}", viewport.width, viewport.height));
        Ok(Box::new(self.page.clone()))
    }
}
