//! `crawl` subcommand: wires the shared clients into one pipeline per cinema.
//!
//! Clients are built once and borrowed by every pipeline. A source that
//! fails fatally is logged and the next source still runs.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use cinegoods_browser::WebDriverBrowser;
use cinegoods_core::{AppConfig, Cinema};
use cinegoods_crawler::{
    capture_for, discovery_for, DatabaseReferences, DatabaseSink, EventSink, Pipeline,
    PipelineDeps, PipelineSettings, SheetSink, SourceProfile,
};
use cinegoods_sheets::{ServiceAccountTokenProvider, SheetsClient};
use cinegoods_vision::{Analyzer, FallbackPolicy, GeminiClient};

struct Clients {
    browser: WebDriverBrowser,
    references: DatabaseReferences,
    analyzer: Analyzer,
    database: DatabaseSink,
    sheet: SheetSink,
}

async fn build_clients(config: &AppConfig) -> anyhow::Result<Clients> {
    let pool_config = cinegoods_db::PoolConfig::from_app_config(config);
    let pool = cinegoods_db::connect_pool(&config.database_url, pool_config)
        .await
        .context("failed to connect to the events database")?;

    let browser = WebDriverBrowser::new(
        &config.webdriver_url,
        config.browser_headless,
        &config.browser_user_agent,
    )
    .context("failed to build WebDriver client")?;

    let gemini = GeminiClient::new(&config.gemini_api_key, config.ai_request_timeout_secs)
        .context("failed to build Gemini client")?;
    let analyzer = Analyzer::new(
        Box::new(gemini),
        config.ai_models.clone(),
        FallbackPolicy {
            attempts_per_model: config.ai_attempts_per_model,
            rate_limit_cooldown: Duration::from_secs(config.ai_rate_limit_cooldown_secs),
        },
        config.debug_dir.clone(),
    );

    let tokens = ServiceAccountTokenProvider::new(
        &config.google_service_account_email,
        &config.google_private_key,
    )
    .context("failed to load Google service account key")?;
    let sheets = SheetsClient::new(&config.google_sheet_id, Arc::new(tokens))
        .context("failed to build Sheets client")?;

    Ok(Clients {
        browser,
        references: DatabaseReferences::new(pool.clone()),
        analyzer,
        database: DatabaseSink::new(pool),
        sheet: SheetSink::new(sheets),
    })
}

fn build_pipeline<'a>(
    config: &AppConfig,
    clients: &'a Clients,
    cinema: Cinema,
) -> Pipeline<'a> {
    let profile = SourceProfile::for_cinema(cinema);
    let today = chrono::Local::now().date_naive();
    let discovery = discovery_for(&profile, today, config.debug_dir.clone());
    let capture = capture_for(&profile);
    Pipeline::new(
        profile,
        discovery,
        capture,
        PipelineDeps {
            browser: &clients.browser,
            known: &clients.references,
            enricher: &clients.analyzer,
            sinks: vec![&clients.database as &dyn EventSink, &clients.sheet],
        },
        PipelineSettings {
            screenshot_dir: config.screenshot_dir.clone(),
            inter_target_delay: Duration::from_millis(config.inter_target_delay_ms),
        },
    )
}

/// Crawls `cinemas` in order.
///
/// # Errors
///
/// Returns an error if the shared clients cannot be built, or after all
/// sources have run if any of them failed.
pub(crate) async fn run_crawl(
    config: &AppConfig,
    cinemas: &[Cinema],
    dry_run: bool,
) -> anyhow::Result<()> {
    let clients = build_clients(config).await?;
    let mut failed = Vec::new();

    for &cinema in cinemas {
        let pipeline = build_pipeline(config, &clients, cinema);

        if dry_run {
            match pipeline.discover_targets().await {
                Ok(targets) => {
                    println!("dry-run: {cinema}: {} targets", targets.len());
                    for t in &targets {
                        println!(
                            "  {} | {} | {}",
                            t.title,
                            t.date_range_text.as_deref().unwrap_or("-"),
                            t.detail_reference
                        );
                    }
                }
                Err(e) => {
                    tracing::error!(source = %cinema, error = %e, "dry run failed");
                    failed.push(cinema);
                }
            }
            continue;
        }

        match pipeline.run().await {
            Ok(summary) => println!(
                "{cinema}: {} candidates, {} targets, {} captured, {} skipped",
                summary.candidates, summary.targets, summary.captured, summary.skipped
            ),
            Err(e) => {
                tracing::error!(source = %cinema, error = %e, "crawl failed");
                failed.push(cinema);
            }
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        let names: Vec<&str> = failed.iter().map(|c| c.slug()).collect();
        anyhow::bail!("crawl failed for: {}", names.join(", "))
    }
}
