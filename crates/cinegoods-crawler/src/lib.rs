//! The crawl pipeline: one driver, parametrized per cinema by a
//! [`SourceProfile`], a [`ListDiscovery`] strategy, and a [`DetailCapture`]
//! strategy.

pub mod capture;
pub mod discovery;
pub mod error;
pub mod pipeline;
pub mod profile;
pub mod sink;

#[cfg(test)]
pub(crate) mod testing;

pub use capture::{capture_for, CaptureContext, DetailCapture};
pub use discovery::{discovery_for, ListDiscovery};
pub use error::CrawlError;
pub use pipeline::{
    DatabaseReferences, Enricher, KnownReferenceStore, Pipeline, PipelineDeps, PipelineSettings,
    RunSummary,
};
pub use profile::{CaptureKind, DiscoveryKind, ScreenshotRetention, SourceProfile};
pub use sink::{event_record, sheet_row, DatabaseSink, EventSink, SheetSink};
