//! List discovery: one strategy per cinema site.

mod cgv;
mod lotte;
mod megabox;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;
use cinegoods_browser::Page;
use cinegoods_core::ScrapedListing;

use crate::error::CrawlError;
use crate::profile::{DiscoveryKind, SourceProfile};

pub use cgv::{ensure_main_view, select_movie_tab, CgvDiscovery, CgvListView};
pub use lotte::{parse_event_payload, LotteDiscovery};
pub use megabox::MegaboxDiscovery;

/// Reads the candidate listings from a source's event list.
///
/// Listings with missing fields are skipped, never fatal. An `Err` means the
/// list itself could not be read; the driver treats it as zero candidates.
#[async_trait]
pub trait ListDiscovery: Send + Sync {
    async fn discover(&self, page: &dyn Page) -> Result<Vec<ScrapedListing>, CrawlError>;
}

/// Builds the discovery strategy a profile asks for.
///
/// `today` is the local date the run started on; `debug_dir` receives
/// best-effort debug artifacts.
#[must_use]
pub fn discovery_for(
    profile: &SourceProfile,
    today: NaiveDate,
    debug_dir: PathBuf,
) -> Box<dyn ListDiscovery> {
    match profile.discovery {
        DiscoveryKind::DomScrape => Box::new(CgvDiscovery::new(today, debug_dir)),
        DiscoveryKind::NetworkIntercept => Box::new(LotteDiscovery::new()),
        DiscoveryKind::DomList => Box::new(MegaboxDiscovery::new(debug_dir)),
    }
}
