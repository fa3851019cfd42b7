use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use cinegoods_browser::{best_effort, BrowserError, Locator, Page, ScreenshotScope, Viewport};
use cinegoods_core::{Cinema, ScrapedListing};
use tokio::time::{sleep, Instant};

use super::{screenshot_file_name, CaptureContext, DetailCapture};

const PENDING_IMAGES_SCRIPT: &str =
    "return Array.from(document.images).filter(function (img) { return !img.complete; }).length;";
const IMAGE_WAIT_LIMIT: Duration = Duration::from_secs(2);
const IMAGE_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Opens each target's detail URL in a page of its own.
///
/// When content regions are configured, the first visible one is
/// screenshotted; otherwise, or when none is visible, the full page is.
pub struct NewPageCapture {
    cinema: Cinema,
    viewport: Viewport,
    regions: Vec<Locator>,
}

impl NewPageCapture {
    #[must_use]
    pub fn new(cinema: Cinema, viewport: Viewport, regions: Vec<Locator>) -> Self {
        Self {
            cinema,
            viewport,
            regions,
        }
    }

    /// A region that never appears is skipped; any other browser error
    /// fails the capture.
    async fn visible_region(&self, page: &dyn Page) -> Result<Option<Locator>, BrowserError> {
        for region in &self.regions {
            match page.wait_for(region, Duration::from_secs(5)).await {
                Ok(()) => {}
                Err(e) if e.is_not_found_or_timeout() => continue,
                Err(e) => return Err(e),
            }
            if best_effort("region visibility", page.is_visible(region)).await == Some(true) {
                tracing::debug!(region = %region, "using content region");
                return Ok(Some(region.clone()));
            }
        }
        Ok(None)
    }

    async fn shoot(
        &self,
        page: &dyn Page,
        ctx: &CaptureContext<'_>,
        target: &ScrapedListing,
    ) -> Result<PathBuf, BrowserError> {
        page.goto(&target.detail_reference, Duration::from_secs(30))
            .await?;
        best_effort("detail idle", page.wait_for_idle(Duration::from_secs(30))).await;
        sleep(Duration::from_secs(2)).await;

        let scope = match self.visible_region(page).await? {
            Some(region) => {
                sleep(Duration::from_secs(1)).await;
                wait_for_images(page).await;
                ScreenshotScope::Element(region)
            }
            None => ScreenshotScope::FullPage,
        };

        let path = ctx
            .screenshot_dir
            .join(screenshot_file_name(self.cinema, target));
        page.screenshot(&path, &scope).await?;
        tracing::info!(path = %path.display(), "captured detail page");
        Ok(path)
    }
}

/// Waits until no image is still loading, for at most two seconds.
async fn wait_for_images(page: &dyn Page) {
    let deadline = Instant::now() + IMAGE_WAIT_LIMIT;
    loop {
        let pending = best_effort(
            "pending images",
            page.evaluate(PENDING_IMAGES_SCRIPT, Vec::new()),
        )
        .await
        .as_ref()
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(0);
        if pending == 0 || Instant::now() >= deadline {
            return;
        }
        sleep(IMAGE_POLL_INTERVAL).await;
    }
}

#[async_trait]
impl DetailCapture for NewPageCapture {
    fn uses_list_page(&self) -> bool {
        false
    }

    async fn capture(&self, ctx: &CaptureContext<'_>, target: &ScrapedListing) -> Option<PathBuf> {
        let page = match ctx.browser.new_page(self.viewport).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(title = %target.title, error = %e, "could not open detail page");
                return None;
            }
        };

        let shot = self.shoot(page.as_ref(), ctx, target).await;
        if let Err(e) = page.close().await {
            tracing::debug!(error = %e, "closing detail page failed");
        }

        match shot {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(title = %target.title, error = %e, "detail capture failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{FakeBrowser, FakePage};

    fn megabox_regions() -> Vec<Locator> {
        [".event-view", ".event-detail", "body"]
            .iter()
            .map(|s| Locator::css(*s))
            .collect()
    }

    fn target() -> ScrapedListing {
        ScrapedListing::new("포스터 증정", "https://www.megabox.co.kr/event/detail?eventNo=42")
    }

    #[tokio::test(start_paused = true)]
    async fn first_visible_region_is_screenshotted() {
        let dir = tempfile::tempdir().unwrap();
        let page = FakePage::new()
            .with_hidden_element(&Locator::css(".event-view"))
            .with_element(&Locator::css(".event-detail"))
            .with_evaluation("img.complete", json!(0));
        let browser = FakeBrowser::new(page.clone());
        let capture = NewPageCapture::new(Cinema::Megabox, Viewport::new(1280, 2000), megabox_regions());
        let ctx = CaptureContext {
            browser: &browser,
            list_page: None,
            screenshot_dir: dir.path(),
        };

        let path = capture.capture(&ctx, &target()).await.unwrap();

        assert_eq!(path.file_name().unwrap(), "event_42.png");
        let log = page.log();
        assert_eq!(log[0], "new_page 1280x2000");
        assert!(log.contains(&"screenshot event_42.png element css=.event-detail".to_string()), "{log:?}");
        assert_eq!(log.last().unwrap(), "close");
    }

    #[tokio::test(start_paused = true)]
    async fn missing_regions_fall_back_to_full_page() {
        let dir = tempfile::tempdir().unwrap();
        let page = FakePage::new();
        let browser = FakeBrowser::new(page.clone());
        let capture = NewPageCapture::new(Cinema::Megabox, Viewport::new(1280, 2000), megabox_regions());
        let ctx = CaptureContext {
            browser: &browser,
            list_page: None,
            screenshot_dir: dir.path(),
        };

        let path = capture.capture(&ctx, &target()).await.unwrap();

        assert!(path.exists());
        assert!(page.log().contains(&"screenshot event_42.png full".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn no_regions_means_full_page() {
        let dir = tempfile::tempdir().unwrap();
        let page = FakePage::new().with_element(&Locator::css("body"));
        let browser = FakeBrowser::new(page.clone());
        let capture = NewPageCapture::new(Cinema::Lotte, Viewport::new(1280, 2000), Vec::new());
        let ctx = CaptureContext {
            browser: &browser,
            list_page: None,
            screenshot_dir: dir.path(),
        };

        let path = capture
            .capture(&ctx, &ScrapedListing::new("증정", "https://lotte/e?eventId=1"))
            .await
            .unwrap();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("lotte_"));
        assert_eq!(page.logged("screenshot"), 1);
        assert!(page.log().iter().any(|l| l.ends_with(" full")));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_navigation_returns_none_and_closes_page() {
        let dir = tempfile::tempdir().unwrap();
        let page = FakePage::new().failing("goto");
        let browser = FakeBrowser::new(page.clone());
        let capture = NewPageCapture::new(Cinema::Lotte, Viewport::new(1280, 2000), Vec::new());
        let ctx = CaptureContext {
            browser: &browser,
            list_page: None,
            screenshot_dir: dir.path(),
        };

        assert!(capture.capture(&ctx, &target()).await.is_none());
        assert_eq!(page.logged("close"), 1);
        assert_eq!(page.logged("screenshot"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn broken_session_during_region_wait_fails_capture() {
        let dir = tempfile::tempdir().unwrap();
        let page = FakePage::new()
            .with_element(&Locator::css(".event-view"))
            .failing("wait_for");
        let browser = FakeBrowser::new(page.clone());
        let capture = NewPageCapture::new(Cinema::Megabox, Viewport::new(1280, 2000), megabox_regions());
        let ctx = CaptureContext {
            browser: &browser,
            list_page: None,
            screenshot_dir: dir.path(),
        };

        assert!(capture.capture(&ctx, &target()).await.is_none());
        assert_eq!(page.logged("screenshot"), 0);
        assert_eq!(page.logged("close"), 1);
    }

    #[tokio::test]
    async fn unavailable_browser_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let browser = FakeBrowser::unavailable();
        let capture = NewPageCapture::new(Cinema::Lotte, Viewport::new(1280, 2000), Vec::new());
        let ctx = CaptureContext {
            browser: &browser,
            list_page: None,
            screenshot_dir: dir.path(),
        };
        assert!(capture.capture(&ctx, &target()).await.is_none());
    }
}
