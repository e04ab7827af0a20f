//! Batched bulk scraping with cancellation and progress reporting.

use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use prodex_core::{AppConfig, ProductRecord, ScrapeSettings, ValidationRules};
use prodex_store::{DedupStore, StoredIn};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::ScraperError;
use crate::fetch::PageFetcher;
use crate::pipeline::{process_product_page, BulkLink};
use crate::sanitize::SanitizerSet;

const DEFAULT_BATCH_SIZE: usize = 3;
const DEFAULT_INTER_BATCH_DELAY_MS: u64 = 1500;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkOptions {
    pub batch_size: usize,
    pub inter_batch_delay: Duration,
    /// Upper bound on one page fetch, including retries.
    pub fetch_timeout: Duration,
}

impl Default for BulkOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            inter_batch_delay: Duration::from_millis(DEFAULT_INTER_BATCH_DELAY_MS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

impl BulkOptions {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            batch_size: config.bulk_batch_size.max(1),
            inter_batch_delay: Duration::from_millis(config.bulk_inter_batch_delay_ms),
            fetch_timeout: Duration::from_secs(config.scraper_request_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Succeeded,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemOutcome {
    /// Position of the link in the (possibly truncated) input list.
    pub index: usize,
    pub id: String,
    pub url: String,
    pub status: ItemStatus,
    pub reasons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ProductRecord>,
    #[serde(skip)]
    pub stored_in: Option<StoredIn>,
}

impl ItemOutcome {
    fn new(index: usize, link: &BulkLink, status: ItemStatus, reasons: Vec<String>) -> Self {
        Self {
            index,
            id: link.id.clone(),
            url: link.url.clone(),
            status,
            reasons,
            record: None,
            stored_in: None,
        }
    }

    fn failed(index: usize, link: &BulkLink, err: &ScraperError) -> Self {
        Self::new(index, link, ItemStatus::Failed, vec![err.to_string()])
    }
}

/// Running counts reported after every item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BulkProgress {
    /// Index of the item that just finished.
    pub index: usize,
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkSummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Set when the run stopped early because the token was cancelled.
    pub cancelled: bool,
    pub outcomes: Vec<ItemOutcome>,
}

impl BulkSummary {
    fn record(&mut self, outcome: ItemOutcome) {
        match outcome.status {
            ItemStatus::Succeeded => self.succeeded += 1,
            ItemStatus::Skipped => self.skipped += 1,
            ItemStatus::Failed => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }

    #[must_use]
    pub fn processed(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }

    fn progress(&self, index: usize, total: usize) -> BulkProgress {
        BulkProgress {
            index,
            total,
            succeeded: self.succeeded,
            skipped: self.skipped,
            failed: self.failed,
        }
    }
}

enum Fetched {
    Page(String),
    AlreadyStored,
    Error(ScraperError),
}

/// Scrapes product links through a [`PageFetcher`] into a [`DedupStore`].
pub struct BulkScraper<'a, F: ?Sized> {
    fetcher: &'a F,
    store: &'a DedupStore<ProductRecord>,
    sanitizers: &'a SanitizerSet,
    options: BulkOptions,
}

impl<'a, F> BulkScraper<'a, F>
where
    F: PageFetcher + ?Sized,
{
    #[must_use]
    pub fn new(
        fetcher: &'a F,
        store: &'a DedupStore<ProductRecord>,
        sanitizers: &'a SanitizerSet,
        options: BulkOptions,
    ) -> Self {
        Self {
            fetcher,
            store,
            sanitizers,
            options,
        }
    }

    /// Scrapes `links` in batches of `batch_size`.
    ///
    /// Pages within a batch are fetched concurrently; results are then
    /// processed in link order, so when two links resolve to the same
    /// external id the later link's record is the one kept. The token is
    /// checked before each batch and interrupts the pause between batches;
    /// a batch already in flight always finishes. Per-item failures are
    /// counted, never propagated.
    pub async fn run(
        &self,
        links: &[BulkLink],
        settings: &ScrapeSettings,
        cancel: &CancellationToken,
        mut on_progress: impl FnMut(&BulkProgress),
    ) -> BulkSummary {
        let links = match settings.max_count {
            Some(max) if max < links.len() => &links[..max],
            _ => links,
        };
        let total = links.len();
        let rules = settings.rules();
        let batch_size = self.options.batch_size.max(1);
        let mut summary = BulkSummary::default();

        tracing::info!(total, batch_size, "starting bulk scrape");

        for (batch_index, batch) in links.chunks(batch_size).enumerate() {
            if batch_index > 0 && !self.options.inter_batch_delay.is_zero() {
                tokio::select! {
                    () = cancel.cancelled() => {}
                    () = tokio::time::sleep(self.options.inter_batch_delay) => {}
                }
            }
            if cancel.is_cancelled() {
                tracing::info!(
                    processed = summary.processed(),
                    total,
                    "bulk scrape cancelled"
                );
                summary.cancelled = true;
                break;
            }

            let fetched = join_all(
                batch
                    .iter()
                    .map(|link| self.fetch_link(link, settings.skip_duplicates)),
            )
            .await;

            let offset = batch_index * batch_size;
            for (position, (link, fetched)) in batch.iter().zip(fetched).enumerate() {
                let index = offset + position;
                let outcome = self.finish_link(index, link, fetched, settings, &rules).await;
                summary.record(outcome);
                on_progress(&summary.progress(index, total));
            }
        }

        tracing::info!(
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "bulk scrape finished"
        );
        summary
    }

    /// Scrapes and stores a single link with the same pipeline as [`Self::run`].
    pub async fn scrape_one(&self, link: &BulkLink, settings: &ScrapeSettings) -> ItemOutcome {
        let fetched = self.fetch_link(link, settings.skip_duplicates).await;
        self.finish_link(0, link, fetched, settings, &settings.rules())
            .await
    }

    /// Runs the pipeline on HTML that was obtained elsewhere (a saved page).
    pub async fn scrape_html(
        &self,
        link: &BulkLink,
        html: String,
        settings: &ScrapeSettings,
    ) -> ItemOutcome {
        self.finish_link(0, link, Fetched::Page(html), settings, &settings.rules())
            .await
    }

    async fn fetch_link(&self, link: &BulkLink, skip_duplicates: bool) -> Fetched {
        if skip_duplicates && self.already_stored(&link.id).await {
            return Fetched::AlreadyStored;
        }

        let timeout = self.options.fetch_timeout;
        let page = match tokio::time::timeout(timeout, self.fetcher.fetch(&link.url)).await {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => return Fetched::Error(e),
            Err(_) => {
                return Fetched::Error(ScraperError::Timeout {
                    url: link.url.clone(),
                    timeout_secs: timeout.as_secs(),
                })
            }
        };

        if page.is_success() {
            Fetched::Page(page.body)
        } else {
            Fetched::Error(ScraperError::UnexpectedStatus {
                status: page.status,
                url: link.url.clone(),
            })
        }
    }

    async fn finish_link(
        &self,
        index: usize,
        link: &BulkLink,
        fetched: Fetched,
        settings: &ScrapeSettings,
        rules: &ValidationRules,
    ) -> ItemOutcome {
        let html = match fetched {
            Fetched::Page(html) => html,
            Fetched::AlreadyStored => {
                tracing::debug!(id = %link.id, "skipping already stored link");
                return ItemOutcome::new(
                    index,
                    link,
                    ItemStatus::Skipped,
                    vec!["already stored".to_owned()],
                );
            }
            Fetched::Error(e) => {
                tracing::warn!(id = %link.id, url = %link.url, error = %e, "fetch failed");
                return ItemOutcome::failed(index, link, &e);
            }
        };

        let processed =
            match process_product_page(&html, link, rules, self.sanitizers, Utc::now()) {
                Ok(processed) => processed,
                Err(e) => {
                    tracing::warn!(
                        id = %link.id,
                        url = %link.url,
                        error = %e,
                        "page processing failed"
                    );
                    return ItemOutcome::failed(index, link, &e);
                }
            };
        let record = processed.record;

        if !processed.validation.accepted {
            tracing::info!(
                id = %record.external_id,
                reasons = ?processed.validation.reasons,
                "record rejected by validation"
            );
            let mut outcome =
                ItemOutcome::new(index, link, ItemStatus::Skipped, processed.validation.reasons);
            outcome.record = Some(record);
            return outcome;
        }

        // Checked again after the fetch: an earlier link in the same batch
        // may have stored this id, or the id only became known from the page.
        if settings.skip_duplicates && self.already_stored(&record.external_id).await {
            let mut outcome = ItemOutcome::new(
                index,
                link,
                ItemStatus::Skipped,
                vec!["already stored".to_owned()],
            );
            outcome.record = Some(record);
            return outcome;
        }

        match self.store.upsert(&record).await {
            Ok(tier) => {
                tracing::debug!(id = %record.external_id, ?tier, "stored record");
                let mut outcome = ItemOutcome::new(index, link, ItemStatus::Succeeded, Vec::new());
                outcome.stored_in = Some(tier);
                outcome.record = Some(record);
                outcome
            }
            Err(e) => {
                tracing::error!(id = %record.external_id, error = %e, "failed to store record");
                let mut outcome = ItemOutcome::failed(index, link, &ScraperError::Store(e));
                outcome.record = Some(record);
                outcome
            }
        }
    }

    async fn already_stored(&self, id: &str) -> bool {
        if id.trim().is_empty() {
            return false;
        }
        match self.store.contains(id).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(id, error = %e, "duplicate check failed; scraping anyway");
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "bulk_test.rs"]
mod tests;
