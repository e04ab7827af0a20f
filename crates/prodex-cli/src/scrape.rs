//! Handlers for the commands that fetch pages: `scrape`, `order`, `bulk`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use prodex_core::{AppConfig, OrderRecord, ProductRecord, ScrapeSettings};
use prodex_scraper::{
    process_order_page, BulkLink, BulkOptions, BulkScraper, HttpFetcher, ItemStatus,
    PageFetcher, SanitizerSet, Site,
};
use prodex_store::DedupStore;
use tokio_util::sync::CancellationToken;

use crate::print_json;

pub(crate) struct ScrapeRequest {
    pub url: String,
    pub id: Option<String>,
    pub site: Option<Site>,
    pub html: Option<PathBuf>,
}

impl ScrapeRequest {
    fn link(&self) -> BulkLink {
        BulkLink {
            site: self.site,
            ..BulkLink::new(self.id.clone().unwrap_or_default(), self.url.clone())
        }
    }
}

async fn read_html(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read HTML file {}", path.display()))
}

pub(crate) async fn scrape_product(
    config: &AppConfig,
    store: &DedupStore<ProductRecord>,
    sanitizers: &SanitizerSet,
    request: &ScrapeRequest,
    settings: &ScrapeSettings,
) -> anyhow::Result<()> {
    let fetcher = HttpFetcher::from_config(config)?;
    let scraper = BulkScraper::new(&fetcher, store, sanitizers, BulkOptions::from_config(config));
    let link = request.link();

    let outcome = match &request.html {
        Some(path) => {
            let html = read_html(path).await?;
            scraper.scrape_html(&link, html, settings).await
        }
        None => scraper.scrape_one(&link, settings).await,
    };

    print_json(&outcome)?;
    if outcome.status == ItemStatus::Failed {
        anyhow::bail!("scrape of {} failed: {}", link.url, outcome.reasons.join("; "));
    }
    Ok(())
}

pub(crate) async fn scrape_order(
    config: &AppConfig,
    store: &DedupStore<OrderRecord>,
    url: &str,
    html: Option<&Path>,
) -> anyhow::Result<()> {
    let html = match html {
        Some(path) => read_html(path).await?,
        None => {
            let page = HttpFetcher::from_config(config)?.fetch(url).await?;
            if !page.is_success() {
                anyhow::bail!("unexpected HTTP status {} from {url}", page.status);
            }
            page.body
        }
    };

    let processed = process_order_page(&html, url, Utc::now());
    if processed.validation.accepted {
        let tier = store.upsert(&processed.record).await?;
        tracing::info!(order_id = %processed.record.order_id, ?tier, "stored order");
    } else {
        tracing::warn!(
            order_id = %processed.record.order_id,
            reasons = ?processed.validation.reasons,
            "order rejected by validation; not stored"
        );
    }

    print_json(&serde_json::json!({
        "record": processed.record,
        "validation": processed.validation,
    }))
}

pub(crate) async fn scrape_bulk(
    config: &AppConfig,
    store: &DedupStore<ProductRecord>,
    sanitizers: &SanitizerSet,
    links: &[BulkLink],
    settings: &ScrapeSettings,
) -> anyhow::Result<()> {
    let fetcher = HttpFetcher::from_config(config)?;
    let scraper = BulkScraper::new(&fetcher, store, sanitizers, BulkOptions::from_config(config));

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; stopping after the current batch");
            signal_token.cancel();
        }
    });

    let summary = scraper
        .run(links, settings, &cancel, |p| {
            tracing::info!(
                item = p.index + 1,
                total = p.total,
                succeeded = p.succeeded,
                skipped = p.skipped,
                failed = p.failed,
                "progress"
            );
        })
        .await;
    signal_task.abort();

    print_json(&summary)?;
    if summary.failed > 0 && summary.failed == summary.processed() {
        anyhow::bail!("all {} processed links failed", summary.failed);
    }
    Ok(())
}
