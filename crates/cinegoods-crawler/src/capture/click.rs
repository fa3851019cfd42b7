use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use cinegoods_browser::{best_effort, BrowserError, Locator, Page, ScreenshotScope};
use cinegoods_core::{Cinema, ScrapedListing};
use tokio::time::sleep;

use super::{screenshot_file_name, CaptureContext, DetailCapture};

/// Site-specific UI state around a click-through.
#[async_trait]
pub trait ListView: Send + Sync {
    /// Runs after the detail view opened, before the screenshot.
    async fn prepare_detail(&self, page: &dyn Page);

    /// Runs after navigating back, so the next card can be found.
    async fn restore_list(&self, page: &dyn Page);
}

/// Opens each target by clicking its card image on the shared list page.
pub struct ClickThroughCapture {
    cinema: Cinema,
    view: Box<dyn ListView>,
}

impl ClickThroughCapture {
    #[must_use]
    pub fn new(cinema: Cinema, view: Box<dyn ListView>) -> Self {
        Self { cinema, view }
    }

    async fn click_through(
        &self,
        page: &dyn Page,
        ctx: &CaptureContext<'_>,
        target: &ScrapedListing,
    ) -> Result<PathBuf, BrowserError> {
        let card = Locator::image_with_alt(&target.title);
        page.wait_for(&card, Duration::from_secs(5)).await?;
        page.click(&card).await?;
        best_effort("detail idle", page.wait_for_idle(Duration::from_secs(30))).await;
        sleep(Duration::from_secs(2)).await;

        self.view.prepare_detail(page).await;
        sleep(Duration::from_secs(2)).await;

        let path = ctx
            .screenshot_dir
            .join(screenshot_file_name(self.cinema, target));
        page.screenshot(&path, &ScreenshotScope::FullPage).await?;
        tracing::info!(path = %path.display(), "captured detail page");

        page.go_back().await?;
        best_effort("list idle", page.wait_for_idle(Duration::from_secs(30))).await;
        sleep(Duration::from_secs(3)).await;
        self.view.restore_list(page).await;

        Ok(path)
    }
}

#[async_trait]
impl DetailCapture for ClickThroughCapture {
    fn uses_list_page(&self) -> bool {
        true
    }

    async fn capture(&self, ctx: &CaptureContext<'_>, target: &ScrapedListing) -> Option<PathBuf> {
        let Some(page) = ctx.list_page else {
            tracing::warn!(title = %target.title, "no list page to click through");
            return None;
        };
        match self.click_through(page, ctx, target).await {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(title = %target.title, error = %e, "detail capture failed");
                best_effort("back after failed capture", page.go_back()).await;
                None
            }
        }
    }
}
