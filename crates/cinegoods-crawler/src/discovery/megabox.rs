//! Megabox: a plain server-rendered event list.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use cinegoods_browser::{best_effort, Locator, Page, ScreenshotScope};
use cinegoods_core::ScrapedListing;
use serde::Deserialize;

use crate::discovery::ListDiscovery;
use crate::error::CrawlError;

const LIST_URL: &str = "https://www.megabox.co.kr/event/movie";
const DETAIL_URL_PREFIX: &str = "https://www.megabox.co.kr/event/detail?eventNo=";
const LIST_CONTAINER: &str = ".event-list";

/// Returns `null` when the list container is absent.
const EXTRACT_ITEMS_SCRIPT: &str = r"
if (!document.querySelector('.event-list')) { return null; }
return Array.from(document.querySelectorAll('.event-list li')).map(function (item) {
  var link = item.querySelector('a.eventBtn');
  var title = item.querySelector('.tit');
  var date = item.querySelector('.date');
  var img = item.querySelector('.img img');
  return {
    eventNo: link ? link.getAttribute('data-no') : null,
    title: title ? (title.textContent || '').trim() : null,
    date: date ? (date.textContent || '').trim() : null,
    image: img ? img.getAttribute('src') : null
  };
});
";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawItem {
    event_no: Option<String>,
    title: Option<String>,
    date: Option<String>,
    image: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Items without an event number or title element are skipped.
pub(crate) fn map_items(items: Vec<RawItem>) -> Vec<ScrapedListing> {
    items
        .into_iter()
        .filter_map(|item| {
            let event_no = non_empty(item.event_no)?;
            let title = item.title?;
            let title = if title.trim().is_empty() {
                "No Title".to_string()
            } else {
                title.trim().to_string()
            };
            let mut listing = ScrapedListing::new(title, format!("{DETAIL_URL_PREFIX}{event_no}"));
            if let Some(date) = non_empty(item.date) {
                listing = listing.with_period(date);
            }
            if let Some(image) = non_empty(item.image) {
                listing = listing.with_preview_image(image);
            }
            Some(listing)
        })
        .collect()
}

pub struct MegaboxDiscovery {
    debug_dir: PathBuf,
}

impl MegaboxDiscovery {
    #[must_use]
    pub fn new(debug_dir: PathBuf) -> Self {
        Self { debug_dir }
    }
}

#[async_trait]
impl ListDiscovery for MegaboxDiscovery {
    async fn discover(&self, page: &dyn Page) -> Result<Vec<ScrapedListing>, CrawlError> {
        page.goto(LIST_URL, Duration::from_secs(30)).await?;
        best_effort("list idle", page.wait_for_idle(Duration::from_secs(30))).await;

        let container = Locator::css(LIST_CONTAINER);
        if let Err(e) = page.wait_for(&container, Duration::from_secs(10)).await {
            tracing::warn!(error = %e, "event list did not appear, saving screenshot");
            let shot = self.debug_dir.join("debug_list_page.png");
            best_effort("list debug screenshot", page.screenshot(&shot, &ScreenshotScope::FullPage))
                .await;
        }

        let raw = page.evaluate(EXTRACT_ITEMS_SCRIPT, Vec::new()).await?;
        if raw.is_null() {
            tracing::warn!("no event list container on page");
            return Ok(Vec::new());
        }
        let items: Vec<RawItem> = serde_json::from_value(raw)
            .map_err(|e| CrawlError::payload("megabox item list", e))?;
        let listings = map_items(items);
        tracing::info!(count = listings.len(), "found events on list");
        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::FakePage;

    fn item(no: Option<&str>, title: Option<&str>) -> RawItem {
        RawItem {
            event_no: no.map(str::to_string),
            title: title.map(str::to_string),
            date: Some("2024.03.01 ~ 2024.03.31".to_string()),
            image: Some("https://img.megabox.co.kr/a.jpg".to_string()),
        }
    }

    #[test]
    fn items_map_to_detail_urls() {
        let out = map_items(vec![item(Some("16123"), Some("듄 오리지널티켓 증정"))]);
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].detail_reference,
            "https://www.megabox.co.kr/event/detail?eventNo=16123"
        );
        assert_eq!(out[0].date_range_text.as_deref(), Some("2024.03.01 ~ 2024.03.31"));
        assert_eq!(
            out[0].preview_image_reference.as_deref(),
            Some("https://img.megabox.co.kr/a.jpg")
        );
        assert_eq!(out[0].is_upcoming, None);
    }

    #[test]
    fn items_missing_number_or_title_are_skipped() {
        let out = map_items(vec![
            item(None, Some("a")),
            item(Some(""), Some("b")),
            item(Some("1"), None),
            item(Some("2"), Some("  ")),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "No Title");
    }

    #[tokio::test]
    async fn missing_container_saves_debug_screenshot_and_returns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let page = FakePage::new();
        let listings = MegaboxDiscovery::new(dir.path().to_path_buf())
            .discover(&page)
            .await
            .unwrap();
        assert!(listings.is_empty());
        assert!(dir.path().join("debug_list_page.png").exists());
    }

    #[tokio::test]
    async fn discover_reads_items() {
        let dir = tempfile::tempdir().unwrap();
        let page = FakePage::new()
            .with_element(&Locator::css(LIST_CONTAINER))
            .with_evaluation(
                "a.eventBtn",
                json!([{ "eventNo": "9", "title": "포스터 증정", "date": null, "image": null }]),
            );
        let listings = MegaboxDiscovery::new(dir.path().to_path_buf())
            .discover(&page)
            .await
            .unwrap();
        assert_eq!(listings.len(), 1);
        assert!(!dir.path().join("debug_list_page.png").exists());
    }
}
