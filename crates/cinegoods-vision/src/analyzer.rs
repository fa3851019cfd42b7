//! The never-failing screenshot analyzer used by the crawl pipeline.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use cinegoods_core::{Cinema, Enrichment};

use crate::client::GenerativeModel;
use crate::error::VisionError;
use crate::fallback::{for_each_model, is_rate_limited, FallbackPolicy};
use crate::parse::parse_extraction;
use crate::prompt::extraction_prompt;

/// Turns a detail-page screenshot into an [`Enrichment`].
pub struct Analyzer {
    model: Box<dyn GenerativeModel>,
    models: Vec<String>,
    policy: FallbackPolicy,
    debug_dir: PathBuf,
}

impl Analyzer {
    #[must_use]
    pub fn new(
        model: Box<dyn GenerativeModel>,
        models: Vec<String>,
        policy: FallbackPolicy,
        debug_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            model,
            models,
            policy,
            debug_dir: debug_dir.into(),
        }
    }

    /// Extracts the three goods-event fields from `screenshot`.
    ///
    /// Never fails: when the image cannot be read, every model fails, or the
    /// reply cannot be parsed, the screenshot is copied into the debug
    /// directory and [`Enrichment::sentinel`] is returned.
    pub async fn analyze(&self, screenshot: &Path, cinema: Cinema) -> Enrichment {
        match self.try_analyze(screenshot, cinema).await {
            Ok(enrichment) => enrichment,
            Err(e) => {
                tracing::error!(
                    path = %screenshot.display(),
                    error = %e,
                    "extraction failed on every model, using sentinel"
                );
                self.save_failed_screenshot(screenshot).await;
                Enrichment::sentinel()
            }
        }
    }

    async fn try_analyze(&self, screenshot: &Path, cinema: Cinema) -> Result<Enrichment, VisionError> {
        let bytes = tokio::fs::read(screenshot).await?;
        let image = STANDARD.encode(bytes);
        let prompt = extraction_prompt(cinema);
        let (prompt, image) = (prompt.as_str(), image.as_str());

        let raw = for_each_model(
            &self.models,
            &self.policy,
            |model| async move { self.model.generate(&model, prompt, image).await },
            is_rate_limited,
        )
        .await?;

        parse_extraction(&raw)
    }

    async fn save_failed_screenshot(&self, screenshot: &Path) {
        let target = self.debug_dir.join(format!(
            "debug_failed_{}.png",
            chrono::Utc::now().timestamp_millis()
        ));
        if let Err(e) = tokio::fs::create_dir_all(&self.debug_dir).await {
            tracing::debug!(error = %e, "could not create debug directory");
            return;
        }
        match tokio::fs::copy(screenshot, &target).await {
            Ok(_) => tracing::info!(path = %target.display(), "saved failed screenshot for inspection"),
            Err(e) => tracing::debug!(error = %e, "could not save failed screenshot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;

    /// Replies from a script keyed by call order; records model names.
    struct ScriptedModel {
        replies: Mutex<Vec<Result<String, VisionError>>>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Result<String, VisionError>>) -> (Self, Arc<Mutex<Vec<String>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            let mut replies = replies;
            replies.reverse();
            (
                Self {
                    replies: Mutex::new(replies),
                    calls: Arc::clone(&calls),
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        async fn generate(&self, model: &str, _prompt: &str, image: &str) -> Result<String, VisionError> {
            assert!(!image.is_empty());
            self.calls.lock().unwrap().push(model.to_string());
            self.replies.lock().unwrap().pop().unwrap_or(Err(VisionError::Api {
                status: 500,
                message: "script exhausted".into(),
            }))
        }
    }

    fn analyzer(model: ScriptedModel, debug_dir: &Path) -> Analyzer {
        Analyzer::new(
            Box::new(model),
            vec!["fast".into(), "slow".into()],
            FallbackPolicy {
                attempts_per_model: 2,
                rate_limit_cooldown: Duration::ZERO,
            },
            debug_dir,
        )
    }

    fn write_png(dir: &Path) -> PathBuf {
        let path = dir.join("shot.png");
        std::fs::write(&path, b"\x89PNG fake").unwrap();
        path
    }

    #[tokio::test]
    async fn fenced_reply_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let (model, calls) = ScriptedModel::new(vec![Ok(
            "```json\n{\"movieTitle\":\"X\",\"goodsKind\":\"Y\",\"locations\":[\"Z\"]}\n```".into(),
        )]);
        let got = analyzer(model, dir.path())
            .analyze(&write_png(dir.path()), Cinema::Cgv)
            .await;
        assert_eq!(got.movie_title, "X");
        assert_eq!(got.goods_kind, "Y");
        assert_eq!(got.locations, vec!["Z"]);
        assert_eq!(*calls.lock().unwrap(), vec!["fast"]);
    }

    #[tokio::test]
    async fn rate_limit_then_success_on_same_model() {
        let dir = tempfile::tempdir().unwrap();
        let (model, calls) = ScriptedModel::new(vec![
            Err(VisionError::RateLimited { model: "fast".into() }),
            Ok(r#"{"movieTitle":"웡카","goodsKind":"TTT","locations":["All"]}"#.into()),
        ]);
        let got = analyzer(model, dir.path())
            .analyze(&write_png(dir.path()), Cinema::Lotte)
            .await;
        assert_eq!(got.movie_title, "웡카");
        assert_eq!(*calls.lock().unwrap(), vec!["fast", "fast"]);
    }

    #[tokio::test]
    async fn persistent_errors_yield_exact_sentinel_and_debug_copy() {
        let dir = tempfile::tempdir().unwrap();
        let debug = dir.path().join("debug");
        let (model, calls) = ScriptedModel::new(Vec::new());
        let got = analyzer(model, &debug)
            .analyze(&write_png(dir.path()), Cinema::Megabox)
            .await;

        assert_eq!(got, Enrichment::sentinel());
        assert_eq!(*calls.lock().unwrap(), vec!["fast", "slow"]);
        let saved: Vec<_> = std::fs::read_dir(&debug)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].starts_with("debug_failed_") && saved[0].ends_with(".png"));
    }

    #[tokio::test]
    async fn unparseable_reply_yields_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let (model, _) = ScriptedModel::new(vec![Ok("sorry, no JSON here".into())]);
        let got = analyzer(model, dir.path())
            .analyze(&write_png(dir.path()), Cinema::Cgv)
            .await;
        assert_eq!(got, Enrichment::sentinel());
    }

    #[tokio::test]
    async fn missing_screenshot_yields_sentinel_without_calls() {
        let dir = tempfile::tempdir().unwrap();
        let (model, calls) = ScriptedModel::new(Vec::new());
        let got = analyzer(model, dir.path())
            .analyze(&dir.path().join("absent.png"), Cinema::Cgv)
            .await;
        assert_eq!(got, Enrichment::sentinel());
        assert!(calls.lock().unwrap().is_empty());
    }
}
