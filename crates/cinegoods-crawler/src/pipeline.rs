//! The single crawl driver shared by every cinema.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use cinegoods_browser::{Browser, Page};
use cinegoods_core::{filter_targets, Cinema, EnrichedListing, Enrichment, ScrapedListing};
use cinegoods_vision::Analyzer;
use sqlx::PgPool;
use tracing::Instrument;
use uuid::Uuid;

use crate::capture::{CaptureContext, DetailCapture};
use crate::discovery::ListDiscovery;
use crate::error::CrawlError;
use crate::profile::{ScreenshotRetention, SourceProfile};
use crate::sink::EventSink;

/// Detail references that were already persisted by earlier runs.
#[async_trait]
pub trait KnownReferenceStore: Send + Sync {
    async fn known_references(&self) -> Result<HashSet<String>, CrawlError>;
}

/// Every `official_url` in the `events` table, across all cinemas.
pub struct DatabaseReferences {
    pool: PgPool,
}

impl DatabaseReferences {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KnownReferenceStore for DatabaseReferences {
    async fn known_references(&self) -> Result<HashSet<String>, CrawlError> {
        Ok(cinegoods_db::list_known_official_urls(&self.pool).await?)
    }
}

/// Turns a screenshot into structured fields. Never fails.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, screenshot: &Path, cinema: Cinema) -> Enrichment;
}

#[async_trait]
impl Enricher for Analyzer {
    async fn enrich(&self, screenshot: &Path, cinema: Cinema) -> Enrichment {
        self.analyze(screenshot, cinema).await
    }
}

/// Shared collaborators, constructed once by the caller.
pub struct PipelineDeps<'a> {
    pub browser: &'a dyn Browser,
    pub known: &'a dyn KnownReferenceStore,
    pub enricher: &'a dyn Enricher,
    pub sinks: Vec<&'a dyn EventSink>,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub screenshot_dir: PathBuf,
    /// Pause between targets.
    pub inter_target_delay: Duration,
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub candidates: usize,
    pub targets: usize,
    pub captured: usize,
    /// Targets whose extraction fell back to the sentinel.
    pub unenriched: usize,
    pub persisted: BTreeMap<&'static str, usize>,
    pub skipped: usize,
}

pub struct Pipeline<'a> {
    profile: SourceProfile,
    discovery: Box<dyn ListDiscovery>,
    capture: Box<dyn DetailCapture>,
    deps: PipelineDeps<'a>,
    settings: PipelineSettings,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub fn new(
        profile: SourceProfile,
        discovery: Box<dyn ListDiscovery>,
        capture: Box<dyn DetailCapture>,
        deps: PipelineDeps<'a>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            profile,
            discovery,
            capture,
            deps,
            settings,
        }
    }

    #[must_use]
    pub fn profile(&self) -> &SourceProfile {
        &self.profile
    }

    /// Runs discovery and filtering only, without capture or writes.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Browser`] if the list page cannot be opened.
    pub async fn discover_targets(&self) -> Result<Vec<ScrapedListing>, CrawlError> {
        let known = self.fetch_known().await;
        let page = self.deps.browser.new_page(self.profile.list_viewport).await?;
        let candidates = self.discover(page.as_ref()).await;
        close_page(page.as_ref()).await;
        Ok(filter_targets(candidates, &known, self.profile.keywords))
    }

    /// Crawls one source end to end.
    ///
    /// Per-target failures are logged and skipped; only failing to open the
    /// list page aborts the run.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Browser`] if the list page cannot be opened.
    pub async fn run(&self) -> Result<RunSummary, CrawlError> {
        let span = tracing::info_span!(
            "crawl",
            source = %self.profile.cinema,
            run_id = %Uuid::new_v4()
        );
        self.run_inner().instrument(span).await
    }

    async fn run_inner(&self) -> Result<RunSummary, CrawlError> {
        let mut summary = RunSummary::default();
        let known = self.fetch_known().await;

        let page = self.deps.browser.new_page(self.profile.list_viewport).await?;
        let candidates = self.discover(page.as_ref()).await;
        summary.candidates = candidates.len();

        let targets = filter_targets(candidates, &known, self.profile.keywords);
        summary.targets = targets.len();
        tracing::info!(
            candidates = summary.candidates,
            targets = summary.targets,
            "filtered candidates"
        );

        let list_page = if self.capture.uses_list_page() {
            Some(page.as_ref())
        } else {
            close_page(page.as_ref()).await;
            None
        };
        let ctx = CaptureContext {
            browser: self.deps.browser,
            list_page,
            screenshot_dir: &self.settings.screenshot_dir,
        };

        for (index, target) in targets.iter().enumerate() {
            tracing::info!(
                index = index + 1,
                total = targets.len(),
                title = %target.title,
                "processing target"
            );
            if !self.process_target(&ctx, target, &mut summary).await {
                continue;
            }
            if index + 1 < targets.len() {
                tokio::time::sleep(self.settings.inter_target_delay).await;
            }
        }

        if list_page.is_some() {
            close_page(page.as_ref()).await;
        }

        tracing::info!(
            candidates = summary.candidates,
            targets = summary.targets,
            captured = summary.captured,
            unenriched = summary.unenriched,
            persisted = ?summary.persisted,
            skipped = summary.skipped,
            "crawl run finished"
        );
        Ok(summary)
    }

    async fn fetch_known(&self) -> HashSet<String> {
        match self.deps.known.known_references().await {
            Ok(known) => {
                tracing::info!(count = known.len(), "loaded known detail references");
                known
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "could not load known references, continuing without dedup; duplicates may be inserted"
                );
                HashSet::new()
            }
        }
    }

    async fn discover(&self, page: &dyn Page) -> Vec<ScrapedListing> {
        match self.discovery.discover(page).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::error!(error = %e, "list discovery failed, no candidates this run");
                Vec::new()
            }
        }
    }

    /// Returns `false` when the target was skipped at capture.
    async fn process_target(
        &self,
        ctx: &CaptureContext<'_>,
        target: &ScrapedListing,
        summary: &mut RunSummary,
    ) -> bool {
        let Some(screenshot) = self.capture.capture(ctx, target).await else {
            summary.skipped += 1;
            return false;
        };
        summary.captured += 1;

        let enrichment = self
            .deps
            .enricher
            .enrich(&screenshot, self.profile.cinema)
            .await;
        if enrichment == Enrichment::sentinel() {
            summary.unenriched += 1;
        }
        tracing::info!(
            movie = %enrichment.movie_title,
            goods = %enrichment.goods_kind,
            "enriched target"
        );
        let event = EnrichedListing::new(target.clone(), enrichment);

        for sink in &self.deps.sinks {
            match sink.persist(&self.profile, &event).await {
                Ok(()) => *summary.persisted.entry(sink.name()).or_default() += 1,
                Err(e) => tracing::error!(
                    sink = sink.name(),
                    title = %target.title,
                    error = %e,
                    "persisting target failed"
                ),
            }
        }

        if self.profile.screenshot_retention == ScreenshotRetention::Delete {
            if let Err(e) = tokio::fs::remove_file(&screenshot).await {
                tracing::debug!(path = %screenshot.display(), error = %e, "could not delete screenshot");
            }
        }
        true
    }
}

async fn close_page(page: &dyn Page) {
    if let Err(e) = page.close().await {
        tracing::debug!(error = %e, "closing list page failed");
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
