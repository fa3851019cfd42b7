//! Listing and event types shared by discovery, enrichment, and persistence.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Goods kind used when the model could not determine one.
pub const UNKNOWN_GOODS: &str = "unknown";

/// Movie title the model reports for events not tied to a single movie.
pub const GENERAL_MOVIE: &str = "General";

/// Single-element location marker for nationwide events.
pub const ALL_LOCATIONS: &str = "All";

/// A cinema chain whose goods events are crawled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cinema {
    Cgv,
    Megabox,
    Lotte,
}

impl Cinema {
    pub const ALL: [Cinema; 3] = [Cinema::Cgv, Cinema::Lotte, Cinema::Megabox];

    /// Value of the `cinema_id` column in the events store.
    #[must_use]
    pub fn id(self) -> i16 {
        match self {
            Cinema::Cgv => 1,
            Cinema::Megabox => 2,
            Cinema::Lotte => 3,
        }
    }

    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Cinema::Cgv => "cgv",
            Cinema::Megabox => "megabox",
            Cinema::Lotte => "lotte",
        }
    }

    /// Korean display name, as used in the extraction prompt.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Cinema::Cgv => "CGV",
            Cinema::Megabox => "메가박스",
            Cinema::Lotte => "롯데시네마",
        }
    }
}

impl std::fmt::Display for Cinema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// A raw candidate found on a cinema's event list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedListing {
    pub title: String,
    /// Detail URL or synthesized locator; the dedup key against the store.
    pub detail_reference: String,
    pub date_range_text: Option<String>,
    /// Only set by sources that can tell at discovery time.
    pub is_upcoming: Option<bool>,
    pub preview_image_reference: Option<String>,
}

impl ScrapedListing {
    #[must_use]
    pub fn new(title: impl Into<String>, detail_reference: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            detail_reference: detail_reference.into(),
            date_range_text: None,
            is_upcoming: None,
            preview_image_reference: None,
        }
    }

    #[must_use]
    pub fn with_period(mut self, period: impl Into<String>) -> Self {
        self.date_range_text = Some(period.into());
        self
    }

    #[must_use]
    pub fn with_upcoming(mut self, upcoming: bool) -> Self {
        self.is_upcoming = Some(upcoming);
        self
    }

    #[must_use]
    pub fn with_preview_image(mut self, image: impl Into<String>) -> Self {
        self.preview_image_reference = Some(image.into());
        self
    }
}

/// Structured fields extracted from a detail-page screenshot.
///
/// `locations` is empty when nothing could be determined, never absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    pub movie_title: String,
    pub goods_kind: String,
    pub locations: Vec<String>,
}

impl Enrichment {
    /// The result returned when every extraction attempt failed.
    #[must_use]
    pub fn sentinel() -> Self {
        Self {
            movie_title: String::new(),
            goods_kind: UNKNOWN_GOODS.to_string(),
            locations: Vec::new(),
        }
    }
}

/// A scraped listing merged with its AI enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedListing {
    pub listing: ScrapedListing,
    pub enrichment: Enrichment,
}

impl EnrichedListing {
    #[must_use]
    pub fn new(listing: ScrapedListing, enrichment: Enrichment) -> Self {
        Self {
            listing,
            enrichment,
        }
    }

    /// Locations joined for single-cell outputs such as the spreadsheet.
    #[must_use]
    pub fn joined_locations(&self) -> String {
        self.enrichment.locations.join(", ")
    }
}

/// Event lifecycle state as stored in the `status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleStatus {
    Scheduled,
    Active,
    ClosingSoon,
    Ended,
}

impl LifecycleStatus {
    /// Stored label; the web front end reads these exact strings.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleStatus::Scheduled => "예정",
            LifecycleStatus::Active => "진행중",
            LifecycleStatus::ClosingSoon => "마감임박",
            LifecycleStatus::Ended => "종료",
        }
    }
}

impl std::fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row destined for the `events` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub event_title: String,
    pub movie_title: String,
    pub cinema: Cinema,
    pub goods_type: String,
    pub period: Option<String>,
    pub image_url: Option<String>,
    pub locations: Vec<String>,
    pub official_url: String,
    pub status: LifecycleStatus,
    pub is_visible: bool,
    pub is_new: Option<bool>,
}

static BRACKET_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.*\]\s*").expect("valid bracket regex"));

/// Removes a bracketed tag such as `[CGV 단독]` from a display title.
#[must_use]
pub fn strip_bracket_prefix(title: &str) -> String {
    BRACKET_PREFIX.replace(title, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cinema_ids_match_store_values() {
        assert_eq!(Cinema::Cgv.id(), 1);
        assert_eq!(Cinema::Megabox.id(), 2);
        assert_eq!(Cinema::Lotte.id(), 3);
    }

    #[test]
    fn sentinel_enrichment_is_exact() {
        let s = Enrichment::sentinel();
        assert_eq!(s.movie_title, "");
        assert_eq!(s.goods_kind, "unknown");
        assert!(s.locations.is_empty());
    }

    #[test]
    fn strip_bracket_prefix_removes_tag() {
        assert_eq!(strip_bracket_prefix("[CGV 단독] 위키드 포스터 증정"), "위키드 포스터 증정");
    }

    #[test]
    fn strip_bracket_prefix_leaves_plain_title() {
        assert_eq!(strip_bracket_prefix("  듄 TTT 증정 "), "듄 TTT 증정");
    }

    #[test]
    fn lifecycle_labels_are_stable() {
        assert_eq!(LifecycleStatus::Scheduled.as_str(), "예정");
        assert_eq!(LifecycleStatus::Active.as_str(), "진행중");
        assert_eq!(LifecycleStatus::ClosingSoon.as_str(), "마감임박");
        assert_eq!(LifecycleStatus::Ended.as_str(), "종료");
    }

    #[test]
    fn joined_locations_uses_comma_space() {
        let enriched = EnrichedListing::new(
            ScrapedListing::new("t", "u"),
            Enrichment {
                movie_title: "X".into(),
                goods_kind: "포스터".into(),
                locations: vec!["용산".into(), "코엑스".into()],
            },
        );
        assert_eq!(enriched.joined_locations(), "용산, 코엑스");
    }

    #[test]
    fn scraped_listing_serializes_to_json() {
        let listing = ScrapedListing::new("a", "b").with_upcoming(true);
        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["is_upcoming"], true);
    }
}
