//! Candidate filter: narrows discovered listings to the targets worth
//! capturing and enriching.

use std::collections::HashSet;

use crate::listing::ScrapedListing;

/// Title keywords that mark a CGV listing as a goods giveaway.
pub const CGV_KEYWORDS: &[&str] = &[
    "증정",
    "스페셜",
    "TTT",
    "오리지널티켓",
    "아트카드",
    "시그니처",
    "굿즈",
    "뱃지",
    "포스터",
    "현장",
    "짱구",
];

pub const LOTTE_KEYWORDS: &[&str] = &["증정", "스페셜", "아트카드", "시그니처"];

/// Megabox titles are screened with the union of the other two lists.
pub const MEGABOX_KEYWORDS: &[&str] = CGV_KEYWORDS;

/// Keeps candidates that are not yet stored, carry an allow-listed keyword,
/// and, where the source computed it, start in the future.
///
/// Input order is preserved.
#[must_use]
pub fn filter_targets(
    candidates: Vec<ScrapedListing>,
    known_references: &HashSet<String>,
    keywords: &[&str],
) -> Vec<ScrapedListing> {
    candidates
        .into_iter()
        .filter(|c| !known_references.contains(&c.detail_reference))
        .filter(|c| keywords.iter().any(|k| c.title.contains(k)))
        .filter(|c| c.is_upcoming.unwrap_or(true))
        .collect()
}
