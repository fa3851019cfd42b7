//! CGV: the event list is only reachable by driving the site root's tabs.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use cinegoods_browser::{best_effort, BrowserError, Locator, Page, ScreenshotScope, TextMatch};
use cinegoods_core::{is_upcoming, ScrapedListing};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use tokio::time::sleep;

use crate::capture::ListView;
use crate::discovery::ListDiscovery;
use crate::error::CrawlError;

const ROOT_URL: &str = "https://www.cgv.co.kr/";
const BUTTON_DETAIL_BASE: &str = "https://www.cgv.co.kr/culture-event/event/default.aspx?title=";

const RENEWAL_TEXT: &str = "새로운 CGV로 이동";
const POPUP_CLOSE_TEXT: &str = "닫기";
const EVENTS_TAB_CLASS: &str = "maintab_tabTitle";
const EVENTS_TAB_TEXT: &str = "이벤트/혜택";
const MOVIE_TAB_CLASS: &str = "roundtab_tabTitle";
const MOVIE_TAB_TEXT: &str = "영화";

const PLACEHOLDER_ALTS: &[&str] = &["No Title", "-"];

/// Characters `encodeURIComponent` leaves alone.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const IS_SELECTED_SCRIPT: &str = "const el = arguments[0];\
 return el.classList.contains('active')\
 || (el.parentElement !== null && el.parentElement.classList.contains('active'))\
 || el.getAttribute('aria-selected') === 'true';";

const EXTRACT_CARDS_SCRIPT: &str = r#"
return Array.from(document.querySelectorAll('li, [class*="eventCard_card"]')).map(function (card) {
  var img = card.querySelector('img');
  var link = card.querySelector('a, button[class*="link"]');
  var period = card.querySelector('[class*="period"], [class*="subText"]');
  return {
    alt: img ? img.getAttribute('alt') : null,
    linkTag: link ? link.tagName.toLowerCase() : null,
    href: link && link.tagName === 'A' ? link.href : null,
    period: period ? period.innerText : null
  };
});
"#;

fn renewal_button() -> Locator {
    Locator::text(RENEWAL_TEXT)
}

fn events_tab() -> Locator {
    Locator::tag_with_class_and_text("button", EVENTS_TAB_CLASS, EVENTS_TAB_TEXT, TextMatch::Contains)
}

fn movie_tab() -> Locator {
    Locator::tag_with_class_and_text("button", MOVIE_TAB_CLASS, MOVIE_TAB_TEXT, TextMatch::Exact)
}

/// Gets past the renewal interstitial and the promotional popup, if shown.
pub async fn ensure_main_view(page: &dyn Page) {
    let renewal = renewal_button();
    if best_effort("renewal check", page.is_visible(&renewal)).await == Some(true) {
        tracing::info!("renewal landing page detected, moving on");
        best_effort("renewal click", async {
            page.click(&renewal).await?;
            page.wait_for_idle(Duration::from_secs(30)).await
        })
        .await;
    }

    sleep(Duration::from_secs(2)).await;
    let close = Locator::text(POPUP_CLOSE_TEXT);
    best_effort("close popup", async {
        if page.count(&close).await? > 0 {
            page.click(&close).await?;
            tracing::info!("closed popup");
        }
        Ok::<_, BrowserError>(())
    })
    .await;
}

/// Activates the movie sub-tab unless it is already selected.
///
/// The site resets the sub-tab on back-navigation, so this runs again after
/// every click-through capture.
pub async fn select_movie_tab(page: &dyn Page) {
    let tab = movie_tab();
    best_effort("select movie tab", async {
        page.wait_for(&tab, Duration::from_secs(5)).await?;
        let selected = page
            .evaluate_on(&tab, IS_SELECTED_SCRIPT)
            .await?
            .as_bool()
            .unwrap_or(false);
        if !selected {
            page.click(&tab).await?;
            tracing::info!("selected movie tab");
            sleep(Duration::from_secs(2)).await;
        }
        Ok::<_, BrowserError>(())
    })
    .await;
}

/// One card as read from the DOM, before any filtering.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawCard {
    alt: Option<String>,
    link_tag: Option<String>,
    href: Option<String>,
    period: Option<String>,
}

/// Turns raw cards into listings.
///
/// Cards without a usable `alt`, repeats of an `alt` already seen, and cards
/// without a period label are dropped.
pub(crate) fn map_cards(cards: Vec<RawCard>, today: NaiveDate) -> Vec<ScrapedListing> {
    let mut seen = HashSet::new();
    let mut listings = Vec::new();

    for card in cards {
        let Some(title) = card.alt.map(|a| a.trim().to_string()) else {
            continue;
        };
        if title.is_empty() || PLACEHOLDER_ALTS.contains(&title.as_str()) {
            continue;
        }
        if !seen.insert(title.clone()) {
            continue;
        }

        let period = match card.period.map(|p| p.trim().to_string()) {
            Some(p) if !p.is_empty() => p,
            _ => continue,
        };

        let detail_reference = match (card.link_tag.as_deref(), card.href) {
            (Some("a"), Some(href)) if !href.is_empty() => href,
            _ => format!(
                "{BUTTON_DETAIL_BASE}{}",
                utf8_percent_encode(&title, URI_COMPONENT)
            ),
        };

        let upcoming = is_upcoming(&period, today);
        tracing::info!(
            title = %title,
            period = %period,
            "{}",
            if upcoming { "UPCOMING" } else { "PAST" }
        );
        listings.push(
            ScrapedListing::new(title, detail_reference)
                .with_period(period)
                .with_upcoming(upcoming),
        );
    }

    listings
}

pub struct CgvDiscovery {
    today: NaiveDate,
    debug_dir: PathBuf,
}

impl CgvDiscovery {
    #[must_use]
    pub fn new(today: NaiveDate, debug_dir: PathBuf) -> Self {
        Self { today, debug_dir }
    }

    async fn save_debug_artifacts(&self, page: &dyn Page) {
        if let Some(html) = best_effort("list html", page.content()).await {
            let path = self.debug_dir.join("debug_cgv.html");
            let written = async {
                tokio::fs::create_dir_all(&self.debug_dir).await?;
                tokio::fs::write(&path, html).await
            }
            .await;
            if let Err(e) = written {
                tracing::debug!(path = %path.display(), error = %e, "could not save list html");
            }
        }
        let shot = self.debug_dir.join("debug_cgv_at_scrape.png");
        best_effort("list screenshot", page.screenshot(&shot, &ScreenshotScope::Window)).await;
    }
}

#[async_trait]
impl ListDiscovery for CgvDiscovery {
    async fn discover(&self, page: &dyn Page) -> Result<Vec<ScrapedListing>, CrawlError> {
        page.goto(ROOT_URL, Duration::from_secs(60)).await?;
        best_effort("root idle", page.wait_for_idle(Duration::from_secs(30))).await;
        ensure_main_view(page).await;

        let tab = events_tab();
        page.wait_for(&tab, Duration::from_secs(15)).await?;
        page.click(&tab).await?;
        tracing::info!("opened events tab");
        sleep(Duration::from_secs(2)).await;

        select_movie_tab(page).await;
        sleep(Duration::from_secs(8)).await;

        self.save_debug_artifacts(page).await;

        let raw = page.evaluate(EXTRACT_CARDS_SCRIPT, Vec::new()).await?;
        let cards: Vec<RawCard> =
            serde_json::from_value(raw).map_err(|e| CrawlError::payload("cgv card list", e))?;
        let listings = map_cards(cards, self.today);
        tracing::info!(count = listings.len(), "found events on list");
        Ok(listings)
    }
}

/// Keeps the shared CGV list page usable across click-through captures.
pub struct CgvListView;

#[async_trait]
impl ListView for CgvListView {
    async fn prepare_detail(&self, page: &dyn Page) {
        ensure_main_view(page).await;
    }

    async fn restore_list(&self, page: &dyn Page) {
        select_movie_tab(page).await;
    }
}
