//! Lotte Cinema: the list page fetches its events as JSON, which is read
//! straight from the browser's network log.

use std::time::Duration;

use async_trait::async_trait;
use cinegoods_browser::{best_effort, Page};
use cinegoods_core::ScrapedListing;
use serde::Deserialize;
use serde_json::Value;
use tokio::time::sleep;

use crate::discovery::ListDiscovery;
use crate::error::CrawlError;

const LIST_URL: &str = "https://www.lottecinema.co.kr/NLCHS/Event/DetailList?code=20";
const DATA_ENDPOINT: &str = "EventData.aspx";
const DETAIL_URL_PREFIX: &str =
    "https://www.lottecinema.co.kr/NLCHS/Event/EventTemplateInfo?eventId=";

const MAX_POLLS: u32 = 15;
const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
struct EventData {
    #[serde(rename = "Items", default)]
    items: Vec<EventItem>,
}

#[derive(Debug, Deserialize)]
struct EventItem {
    #[serde(rename = "EventName")]
    event_name: Option<String>,
    #[serde(rename = "ProgressStartDate")]
    progress_start_date: Option<String>,
    #[serde(rename = "ProgressEndDate")]
    progress_end_date: Option<String>,
    #[serde(rename = "EventID", default)]
    event_id: Value,
}

fn event_id_text(id: &Value) -> Option<String> {
    match id {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Maps an `EventData.aspx` response body to listings.
///
/// Items without a name or an id are skipped.
///
/// # Errors
///
/// Returns [`serde_json::Error`] if `body` is not an event-data object.
pub fn parse_event_payload(body: &str) -> Result<Vec<ScrapedListing>, serde_json::Error> {
    let data: EventData = serde_json::from_str(body)?;
    Ok(data
        .items
        .into_iter()
        .filter_map(|item| {
            let title = item.event_name.filter(|n| !n.trim().is_empty())?;
            let id = event_id_text(&item.event_id)?;
            let mut listing = ScrapedListing::new(title, format!("{DETAIL_URL_PREFIX}{id}"));
            if let (Some(start), Some(end)) = (item.progress_start_date, item.progress_end_date) {
                listing = listing.with_period(format!("{start} ~ {end}"));
            }
            Some(listing)
        })
        .collect())
}

pub struct LotteDiscovery;

impl LotteDiscovery {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for LotteDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ListDiscovery for LotteDiscovery {
    async fn discover(&self, page: &dyn Page) -> Result<Vec<ScrapedListing>, CrawlError> {
        page.goto(LIST_URL, Duration::from_secs(30)).await?;
        best_effort("list idle", page.wait_for_idle(Duration::from_secs(30))).await;

        for poll in 0..MAX_POLLS {
            for response in page.responses(DATA_ENDPOINT).await? {
                match parse_event_payload(&response.body) {
                    Ok(listings) if !listings.is_empty() => {
                        tracing::info!(count = listings.len(), poll, "captured event data");
                        return Ok(listings);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(url = %response.url, error = %e, "unreadable event data");
                    }
                }
            }
            sleep(POLL_INTERVAL).await;
        }

        tracing::warn!(polls = MAX_POLLS, "no event data response arrived");
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePage;

    const PAYLOAD: &str = r#"{
        "Items": [
            { "EventName": "[아트카드] 듄 증정", "ProgressStartDate": "2024.03.02", "ProgressEndDate": "2024.03.10", "EventID": 201010016924001 },
            { "EventName": "스페셜 포스터", "ProgressStartDate": "2024.03.05", "ProgressEndDate": null, "EventID": "77" },
            { "EventName": null, "EventID": 3 },
            { "EventName": "아이디 없음" }
        ]
    }"#;

    #[test]
    fn payload_maps_items_and_skips_incomplete_ones() {
        let listings = parse_event_payload(PAYLOAD).unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].title, "[아트카드] 듄 증정");
        assert_eq!(
            listings[0].detail_reference,
            "https://www.lottecinema.co.kr/NLCHS/Event/EventTemplateInfo?eventId=201010016924001"
        );
        assert_eq!(listings[0].date_range_text.as_deref(), Some("2024.03.02 ~ 2024.03.10"));
        assert_eq!(listings[0].is_upcoming, None);
        assert_eq!(listings[1].date_range_text, None);
        assert!(listings[1].detail_reference.ends_with("eventId=77"));
    }

    #[test]
    fn payload_without_items_is_empty() {
        assert!(parse_event_payload("{}").unwrap().is_empty());
    }

    #[test]
    fn non_object_payload_is_an_error() {
        assert!(parse_event_payload("<html>").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn discover_returns_intercepted_items() {
        let page = FakePage::new().with_response(
            "https://www.lottecinema.co.kr/LCWS/Event/EventData.aspx",
            PAYLOAD,
        );
        let listings = LotteDiscovery::new().discover(&page).await.unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(page.logged("responses"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn discover_gives_up_after_bounded_polls() {
        let page = FakePage::new();
        let listings = LotteDiscovery::new().discover(&page).await.unwrap();
        assert!(listings.is_empty());
        assert_eq!(page.logged("responses"), 15);
    }
}
