//! Database operations for the `events` table.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use cinegoods_core::EventRecord;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `events` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    pub id: i64,
    pub event_title: String,
    pub movie_title: String,
    pub cinema_id: i16,
    pub goods_type: String,
    pub period: Option<String>,
    pub image_url: Option<String>,
    pub locations: Vec<String>,
    pub official_url: String,
    pub status: String,
    pub is_visible: bool,
    pub is_new: Option<bool>,
    pub created_at: DateTime<Utc>,
}

/// Column values for one insert, derived from an [`EventRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEventRow {
    pub event_title: String,
    pub movie_title: String,
    pub cinema_id: i16,
    pub goods_type: String,
    pub period: Option<String>,
    pub image_url: Option<String>,
    pub locations: Vec<String>,
    pub official_url: String,
    pub status: String,
    pub is_visible: bool,
    pub is_new: Option<bool>,
}

impl From<&EventRecord> for NewEventRow {
    fn from(record: &EventRecord) -> Self {
        Self {
            event_title: record.event_title.clone(),
            movie_title: record.movie_title.clone(),
            cinema_id: record.cinema.id(),
            goods_type: record.goods_type.clone(),
            period: record.period.clone(),
            image_url: record.image_url.clone(),
            locations: record.locations.clone(),
            official_url: record.official_url.clone(),
            status: record.status.as_str().to_string(),
            is_visible: record.is_visible,
            is_new: record.is_new,
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns every stored `official_url`, across all cinemas.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_known_official_urls(pool: &PgPool) -> Result<HashSet<String>, DbError> {
    let urls = sqlx::query_scalar::<_, String>("SELECT official_url FROM events")
        .fetch_all(pool)
        .await?;

    Ok(urls.into_iter().collect())
}

/// Inserts one event and returns its generated `id`.
///
/// This is a plain insert: an `official_url` that already exists fails with
/// a unique violation (see [`DbError::is_unique_violation`]).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_event(pool: &PgPool, record: &EventRecord) -> Result<i64, DbError> {
    let row = NewEventRow::from(record);
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO events \
             (event_title, movie_title, cinema_id, goods_type, period, image_url, \
              locations, official_url, status, is_visible, is_new) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING id",
    )
    .bind(&row.event_title)
    .bind(&row.movie_title)
    .bind(row.cinema_id)
    .bind(&row.goods_type)
    .bind(&row.period)
    .bind(&row.image_url)
    .bind(&row.locations)
    .bind(&row.official_url)
    .bind(&row.status)
    .bind(row.is_visible)
    .bind(row.is_new)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Returns the event stored under `official_url`, or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_event_by_official_url(
    pool: &PgPool,
    official_url: &str,
) -> Result<Option<EventRow>, DbError> {
    let row = sqlx::query_as::<_, EventRow>(
        "SELECT id, event_title, movie_title, cinema_id, goods_type, period, image_url, \
                locations, official_url, status, is_visible, is_new, created_at \
         FROM events \
         WHERE official_url = $1",
    )
    .bind(official_url)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
