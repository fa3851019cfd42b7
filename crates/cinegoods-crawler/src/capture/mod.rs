//! Detail capture: reach a target's detail view and screenshot it.

mod click;
mod new_page;

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::Utc;
use cinegoods_browser::{Browser, Locator, Page};
use cinegoods_core::{Cinema, ScrapedListing};
use regex::Regex;

use crate::discovery::CgvListView;
use crate::profile::{CaptureKind, SourceProfile};

pub use click::{ClickThroughCapture, ListView};
pub use new_page::NewPageCapture;

/// What a capture strategy may use for one target.
pub struct CaptureContext<'a> {
    pub browser: &'a dyn Browser,
    /// The page discovery ran on, kept open for click-through capture.
    pub list_page: Option<&'a dyn Page>,
    pub screenshot_dir: &'a Path,
}

#[async_trait]
pub trait DetailCapture: Send + Sync {
    /// Whether the list page must stay open for [`DetailCapture::capture`].
    fn uses_list_page(&self) -> bool;

    /// Screenshots the target's detail view.
    ///
    /// Returns `None`, after logging, when the detail view could not be
    /// captured; the caller skips the target.
    async fn capture(&self, ctx: &CaptureContext<'_>, target: &ScrapedListing) -> Option<PathBuf>;
}

/// Builds the capture strategy a profile asks for.
#[must_use]
pub fn capture_for(profile: &SourceProfile) -> Box<dyn DetailCapture> {
    match profile.capture {
        CaptureKind::ClickThrough => {
            Box::new(ClickThroughCapture::new(profile.cinema, Box::new(CgvListView)))
        }
        CaptureKind::NewPage => Box::new(NewPageCapture::new(
            profile.cinema,
            profile.detail_viewport,
            profile.content_regions.iter().map(|s| Locator::css(*s)).collect(),
        )),
    }
}

static EVENT_NO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"eventNo=(\d+)").expect("valid event number regex"));

/// File name for a target's screenshot.
///
/// Megabox files are keyed by event number so retained screenshots can be
/// matched to their event; the others only need to be unique.
pub(crate) fn screenshot_file_name(cinema: Cinema, target: &ScrapedListing) -> String {
    let millis = Utc::now().timestamp_millis();
    match cinema {
        Cinema::Cgv => format!("cgv_{millis}.png"),
        Cinema::Lotte => format!("lotte_{millis}.png"),
        Cinema::Megabox => match EVENT_NO.captures(&target.detail_reference) {
            Some(caps) => format!("event_{}.png", &caps[1]),
            None => format!("event_unknown_{millis}.png"),
        },
    }
}
