//! Per-cinema policy constants.
//!
//! Everything that differs between the three cinemas, other than the
//! discovery and capture mechanics themselves, lives in [`SourceProfile`].
//! The defaults for status and visibility intentionally differ: CGV and
//! Lotte rows wait for manual approval, Megabox rows go live immediately.

use cinegoods_browser::Viewport;
use cinegoods_core::{Cinema, LifecycleStatus, CGV_KEYWORDS, LOTTE_KEYWORDS, MEGABOX_KEYWORDS};

/// How a source's event list is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryKind {
    /// Navigate tabs on the site root and scrape the rendered cards.
    DomScrape,
    /// Load the list page and read the JSON the page fetches for itself.
    NetworkIntercept,
    /// Load a fixed list page and read items by class name.
    DomList,
}

/// How a target's detail page is reached and photographed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureKind {
    /// Click the card on the shared list page, then navigate back.
    ClickThrough,
    /// Open the detail URL in a fresh page.
    NewPage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenshotRetention {
    Delete,
    Keep,
}

const BASE_SHEET_COLUMNS: &[&str] = &[
    "event_title",
    "movie_title",
    "goods_type",
    "locations",
    "period",
    "detail_url",
    "crawled_at",
];

const MEGABOX_SHEET_COLUMNS: &[&str] = &[
    "event_title",
    "movie_title",
    "goods_type",
    "locations",
    "period",
    "poster_url",
    "detail_url",
    "crawled_at",
];

const MEGABOX_CONTENT_REGIONS: &[&str] =
    &[".event-view", ".event-detail", ".event-content", "main", "body"];

const LIST_VIEWPORT: Viewport = Viewport::new(1280, 720);
const CGV_LIST_VIEWPORT: Viewport = Viewport::new(1440, 900);
const DETAIL_VIEWPORT: Viewport = Viewport::new(1280, 2000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceProfile {
    pub cinema: Cinema,
    pub discovery: DiscoveryKind,
    pub capture: CaptureKind,
    pub keywords: &'static [&'static str],
    pub default_status: LifecycleStatus,
    pub default_visible: bool,
    pub is_new: Option<bool>,
    /// Use the display title, minus any `[...]` tag, when the model found
    /// no movie title.
    pub movie_title_fallback: bool,
    pub screenshot_retention: ScreenshotRetention,
    pub sheet_columns: &'static [&'static str],
    /// Candidate content regions for the detail screenshot, tried in order.
    /// Empty means always full page.
    pub content_regions: &'static [&'static str],
    pub list_viewport: Viewport,
    pub detail_viewport: Viewport,
}

impl SourceProfile {
    #[must_use]
    pub fn for_cinema(cinema: Cinema) -> Self {
        match cinema {
            Cinema::Cgv => Self {
                cinema,
                discovery: DiscoveryKind::DomScrape,
                capture: CaptureKind::ClickThrough,
                keywords: CGV_KEYWORDS,
                default_status: LifecycleStatus::Scheduled,
                default_visible: false,
                is_new: Some(true),
                movie_title_fallback: true,
                screenshot_retention: ScreenshotRetention::Delete,
                sheet_columns: BASE_SHEET_COLUMNS,
                content_regions: &[],
                list_viewport: CGV_LIST_VIEWPORT,
                detail_viewport: CGV_LIST_VIEWPORT,
            },
            Cinema::Lotte => Self {
                cinema,
                discovery: DiscoveryKind::NetworkIntercept,
                capture: CaptureKind::NewPage,
                keywords: LOTTE_KEYWORDS,
                default_status: LifecycleStatus::Scheduled,
                default_visible: false,
                is_new: Some(true),
                movie_title_fallback: false,
                screenshot_retention: ScreenshotRetention::Delete,
                sheet_columns: BASE_SHEET_COLUMNS,
                content_regions: &[],
                list_viewport: LIST_VIEWPORT,
                detail_viewport: DETAIL_VIEWPORT,
            },
            Cinema::Megabox => Self {
                cinema,
                discovery: DiscoveryKind::DomList,
                capture: CaptureKind::NewPage,
                keywords: MEGABOX_KEYWORDS,
                default_status: LifecycleStatus::Active,
                default_visible: true,
                is_new: None,
                movie_title_fallback: false,
                screenshot_retention: ScreenshotRetention::Keep,
                sheet_columns: MEGABOX_SHEET_COLUMNS,
                content_regions: MEGABOX_CONTENT_REGIONS,
                list_viewport: LIST_VIEWPORT,
                detail_viewport: DETAIL_VIEWPORT,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn megabox_is_the_only_auto_visible_source() {
        for cinema in Cinema::ALL {
            let p = SourceProfile::for_cinema(cinema);
            assert_eq!(p.default_visible, cinema == Cinema::Megabox, "{cinema}");
        }
    }

    #[test]
    fn default_statuses() {
        assert_eq!(
            SourceProfile::for_cinema(Cinema::Cgv).default_status,
            LifecycleStatus::Scheduled
        );
        assert_eq!(
            SourceProfile::for_cinema(Cinema::Lotte).default_status,
            LifecycleStatus::Scheduled
        );
        assert_eq!(
            SourceProfile::for_cinema(Cinema::Megabox).default_status,
            LifecycleStatus::Active
        );
    }

    #[test]
    fn only_megabox_keeps_screenshots_and_has_poster_column() {
        let mega = SourceProfile::for_cinema(Cinema::Megabox);
        assert_eq!(mega.screenshot_retention, ScreenshotRetention::Keep);
        assert!(mega.sheet_columns.contains(&"poster_url"));
        assert!(mega.is_new.is_none());

        let lotte = SourceProfile::for_cinema(Cinema::Lotte);
        assert_eq!(lotte.screenshot_retention, ScreenshotRetention::Delete);
        assert!(!lotte.sheet_columns.contains(&"poster_url"));
        assert_eq!(lotte.is_new, Some(true));
    }

    #[test]
    fn strategies_per_cinema() {
        let cgv = SourceProfile::for_cinema(Cinema::Cgv);
        assert_eq!(cgv.discovery, DiscoveryKind::DomScrape);
        assert_eq!(cgv.capture, CaptureKind::ClickThrough);
        assert!(cgv.movie_title_fallback);
        assert_eq!(
            SourceProfile::for_cinema(Cinema::Lotte).discovery,
            DiscoveryKind::NetworkIntercept
        );
        assert_eq!(
            SourceProfile::for_cinema(Cinema::Megabox).discovery,
            DiscoveryKind::DomList
        );
    }
}
