//! Where enriched targets are written.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use cinegoods_core::{strip_bracket_prefix, EnrichedListing, EventRecord};
use cinegoods_sheets::{SheetRow, SheetsClient};
use sqlx::PgPool;

use crate::error::CrawlError;
use crate::profile::SourceProfile;

/// One persistence target. Sinks are independent; a failing sink never
/// prevents the others from being written.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Short label used in logs and the run summary.
    fn name(&self) -> &'static str;

    async fn persist(
        &self,
        profile: &SourceProfile,
        event: &EnrichedListing,
    ) -> Result<(), CrawlError>;
}

/// Maps an enriched listing to its `events` row under `profile`'s policy.
#[must_use]
pub fn event_record(profile: &SourceProfile, event: &EnrichedListing) -> EventRecord {
    let listing = &event.listing;
    let enrichment = &event.enrichment;

    let movie_title = if enrichment.movie_title.is_empty() && profile.movie_title_fallback {
        strip_bracket_prefix(&listing.title)
    } else {
        enrichment.movie_title.clone()
    };

    EventRecord {
        event_title: listing.title.clone(),
        movie_title,
        cinema: profile.cinema,
        goods_type: enrichment.goods_kind.clone(),
        period: listing.date_range_text.clone(),
        image_url: listing.preview_image_reference.clone(),
        locations: enrichment.locations.clone(),
        official_url: listing.detail_reference.clone(),
        status: profile.default_status,
        is_visible: profile.default_visible,
        is_new: profile.is_new,
    }
}

/// Builds the spreadsheet row; columns the sheet lacks are ignored on append.
#[must_use]
pub fn sheet_row(event: &EnrichedListing, crawled_at: DateTime<Utc>) -> SheetRow {
    let listing = &event.listing;
    SheetRow::new()
        .with("event_title", listing.title.clone())
        .with("movie_title", event.enrichment.movie_title.clone())
        .with("goods_type", event.enrichment.goods_kind.clone())
        .with("locations", event.joined_locations())
        .with("period", listing.date_range_text.clone().unwrap_or_default())
        .with(
            "poster_url",
            listing.preview_image_reference.clone().unwrap_or_default(),
        )
        .with("detail_url", listing.detail_reference.clone())
        .with(
            "crawled_at",
            crawled_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        )
}

/// Inserts into the `events` table. A row already stored under the same
/// `official_url` counts as persisted.
pub struct DatabaseSink {
    pool: PgPool,
}

impl DatabaseSink {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventSink for DatabaseSink {
    fn name(&self) -> &'static str {
        "database"
    }

    async fn persist(
        &self,
        profile: &SourceProfile,
        event: &EnrichedListing,
    ) -> Result<(), CrawlError> {
        let record = event_record(profile, event);
        match cinegoods_db::insert_event(&self.pool, &record).await {
            Ok(id) => {
                tracing::info!(id, title = %record.event_title, "saved event");
                Ok(())
            }
            // Another run stored the same URL after this run loaded its known set.
            Err(e) if e.is_unique_violation() => {
                let existing =
                    cinegoods_db::get_event_by_official_url(&self.pool, &record.official_url)
                        .await
                        .ok()
                        .flatten()
                        .map(|row| row.id);
                tracing::warn!(
                    existing_id = ?existing,
                    url = %record.official_url,
                    "event already stored, skipping insert"
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Appends to the first worksheet of the configured spreadsheet.
pub struct SheetSink {
    client: SheetsClient,
}

impl SheetSink {
    #[must_use]
    pub fn new(client: SheetsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventSink for SheetSink {
    fn name(&self) -> &'static str {
        "sheet"
    }

    async fn persist(
        &self,
        profile: &SourceProfile,
        event: &EnrichedListing,
    ) -> Result<(), CrawlError> {
        let row = sheet_row(event, Utc::now());
        self.client.append_row(profile.sheet_columns, &row).await?;
        tracing::debug!(title = %event.listing.title, "appended sheet row");
        Ok(())
    }
}
