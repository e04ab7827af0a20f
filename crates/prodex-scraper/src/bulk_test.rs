use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use prodex_store::MemoryBackend;

use super::*;
use crate::fetch::FetchedPage;

fn product_page(title: &str, price: Option<&str>) -> String {
    let price = price
        .map(|p| format!(r#"<span class="priceToPay"><span class="a-offscreen">{p}</span></span>"#))
        .unwrap_or_default();
    format!(r#"<html><body><span id="productTitle">{title}</span>{price}</body></html>"#)
}

fn url(n: usize) -> String {
    format!("https://www.amazon.com/dp/B0TEST{n:04}")
}

#[derive(Default)]
struct StubFetcher {
    pages: HashMap<String, FetchedPage>,
    fetched: Mutex<Vec<String>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl StubFetcher {
    fn with_page(mut self, url: &str, page: FetchedPage) -> Self {
        self.pages.insert(url.to_owned(), page);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ScraperError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.fetched.lock().unwrap().push(url.to_owned());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| ScraperError::InvalidUrl {
                url: url.to_owned(),
                reason: "connection refused".to_owned(),
            })
    }
}

fn store() -> DedupStore<ProductRecord> {
    DedupStore::new(Arc::new(MemoryBackend::new()), Arc::new(MemoryBackend::new()))
}

fn options() -> BulkOptions {
    BulkOptions {
        inter_batch_delay: Duration::ZERO,
        ..BulkOptions::default()
    }
}

fn numbered_fetcher(count: usize) -> StubFetcher {
    (0..count).fold(StubFetcher::default(), |f, n| {
        f.with_page(&url(n), FetchedPage::ok(product_page("Mug", Some("$5.00"))))
    })
}

fn numbered_links(count: usize) -> Vec<BulkLink> {
    (0..count).map(|n| BulkLink::new("", url(n))).collect()
}

#[test]
fn default_options() {
    let options = BulkOptions::default();
    assert_eq!(options.batch_size, 3);
    assert_eq!(options.inter_batch_delay, Duration::from_millis(1500));
    assert_eq!(options.fetch_timeout, Duration::from_secs(30));
}

#[tokio::test]
async fn counts_cover_every_link_when_one_fails() {
    let links = numbered_links(7);
    // Link 4 has no page, so the stub refuses it.
    let fetcher = (0..7)
        .filter(|n| *n != 4)
        .fold(StubFetcher::default(), |f, n| {
            f.with_page(&url(n), FetchedPage::ok(product_page("Mug", Some("$5.00"))))
        });
    let store = store();
    let sanitizers = SanitizerSet::builtin();
    let scraper = BulkScraper::new(&fetcher, &store, &sanitizers, options());

    let mut progress = Vec::new();
    let summary = scraper
        .run(
            &links,
            &ScrapeSettings::default(),
            &CancellationToken::new(),
            |p| progress.push(*p),
        )
        .await;

    assert_eq!(summary.succeeded, 6);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.processed(), 7);
    assert!(!summary.cancelled);
    assert_eq!(summary.outcomes[4].status, ItemStatus::Failed);
    assert!(summary.outcomes[4].reasons[0].contains("connection refused"));

    let indexes: Vec<usize> = progress.iter().map(|p| p.index).collect();
    assert_eq!(indexes, (0..7).collect::<Vec<_>>());
    assert_eq!(progress.last().map(|p| p.total), Some(7));
    assert_eq!(store.get_all().await.unwrap().len(), 6);
}

#[tokio::test]
async fn later_link_wins_for_duplicate_ids_in_one_batch() {
    let fetcher = StubFetcher::default()
        .with_page(
            "https://www.amazon.com/first",
            FetchedPage::ok(product_page("Mug", Some("$10.00"))),
        )
        .with_page(
            "https://www.amazon.com/second",
            FetchedPage::ok(product_page("Mug", Some("$20.00"))),
        );
    let links = vec![
        BulkLink::new("ABC123", "https://www.amazon.com/first"),
        BulkLink::new("ABC123", "https://www.amazon.com/second"),
    ];
    let store = store();
    let sanitizers = SanitizerSet::builtin();
    let scraper = BulkScraper::new(&fetcher, &store, &sanitizers, options());

    let summary = scraper
        .run(&links, &ScrapeSettings::default(), &CancellationToken::new(), |_| {})
        .await;

    assert_eq!(summary.succeeded, 2);
    let all = store.get_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].price.as_deref(), Some("$20.00"));
}

#[tokio::test]
async fn cancelling_stops_before_the_next_batch() {
    let fetcher = numbered_fetcher(9);
    let links = numbered_links(9);
    let store = store();
    let sanitizers = SanitizerSet::builtin();
    let scraper = BulkScraper::new(&fetcher, &store, &sanitizers, options());
    let cancel = CancellationToken::new();

    let summary = scraper
        .run(&links, &ScrapeSettings::default(), &cancel, |p| {
            if p.index == 2 {
                cancel.cancel();
            }
        })
        .await;

    assert!(summary.cancelled);
    assert_eq!(summary.processed(), 3);
    assert_eq!(fetcher.calls(), 3);
    assert_eq!(store.get_all().await.unwrap().len(), 3);
}

#[tokio::test]
async fn cancellation_interrupts_the_inter_batch_pause() {
    let fetcher = numbered_fetcher(6);
    let links = numbered_links(6);
    let store = store();
    let sanitizers = SanitizerSet::builtin();
    let scraper = BulkScraper::new(
        &fetcher,
        &store,
        &sanitizers,
        BulkOptions {
            inter_batch_delay: Duration::from_secs(3600),
            ..BulkOptions::default()
        },
    );
    let cancel = CancellationToken::new();

    let summary = tokio::time::timeout(
        Duration::from_secs(5),
        scraper.run(&links, &ScrapeSettings::default(), &cancel, |p| {
            if p.index == 2 {
                cancel.cancel();
            }
        }),
    )
    .await
    .expect("pause should end on cancellation");

    assert!(summary.cancelled);
    assert_eq!(fetcher.calls(), 3);
}

#[tokio::test]
async fn already_cancelled_token_processes_nothing() {
    let fetcher = numbered_fetcher(3);
    let store = store();
    let sanitizers = SanitizerSet::builtin();
    let scraper = BulkScraper::new(&fetcher, &store, &sanitizers, options());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = scraper
        .run(&numbered_links(3), &ScrapeSettings::default(), &cancel, |_| {})
        .await;

    assert!(summary.cancelled);
    assert_eq!(summary.processed(), 0);
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn validation_rejections_are_skipped_not_stored() {
    let fetcher = StubFetcher::default()
        .with_page(&url(0), FetchedPage::ok(product_page("Mug", None)))
        .with_page(&url(1), FetchedPage::ok(product_page("Mug", Some("$7.50"))));
    let store = store();
    let sanitizers = SanitizerSet::builtin();
    let scraper = BulkScraper::new(&fetcher, &store, &sanitizers, options());
    let settings = ScrapeSettings {
        require_price: true,
        ..ScrapeSettings::default()
    };

    let summary = scraper
        .run(&numbered_links(2), &settings, &CancellationToken::new(), |_| {})
        .await;

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.outcomes[0].reasons, vec!["missing price"]);
    let stored = store.get_all().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].external_id, "B0TEST0001");
}

#[tokio::test]
async fn skip_duplicates_avoids_refetching_stored_ids() {
    let fetcher = numbered_fetcher(2);
    let store = store();
    let sanitizers = SanitizerSet::builtin();
    let scraper = BulkScraper::new(&fetcher, &store, &sanitizers, options());
    let links = vec![BulkLink::new("KNOWN", url(0)), BulkLink::new("FRESH", url(1))];

    let mut existing = ProductRecord::empty("KNOWN", url(0), "amazon", Utc::now());
    existing.price = Some("$1.00".to_owned());
    store.upsert(&existing).await.unwrap();

    let settings = ScrapeSettings {
        skip_duplicates: true,
        ..ScrapeSettings::default()
    };
    let summary = scraper
        .run(&links, &settings, &CancellationToken::new(), |_| {})
        .await;

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(*fetcher.fetched.lock().unwrap(), vec![url(1)]);
    let known = store.get_by_id("KNOWN").await.unwrap().unwrap();
    assert_eq!(known.price.as_deref(), Some("$1.00"));
}

#[tokio::test]
async fn skip_duplicates_applies_within_one_batch() {
    let fetcher = StubFetcher::default()
        .with_page(
            "https://www.amazon.com/first",
            FetchedPage::ok(product_page("Mug", Some("$10.00"))),
        )
        .with_page(
            "https://www.amazon.com/second",
            FetchedPage::ok(product_page("Mug", Some("$20.00"))),
        );
    let links = vec![
        BulkLink::new("DUP1", "https://www.amazon.com/first"),
        BulkLink::new("DUP1", "https://www.amazon.com/second"),
    ];
    let store = store();
    let sanitizers = SanitizerSet::builtin();
    let scraper = BulkScraper::new(&fetcher, &store, &sanitizers, options());
    let settings = ScrapeSettings {
        skip_duplicates: true,
        ..ScrapeSettings::default()
    };

    let summary = scraper
        .run(&links, &settings, &CancellationToken::new(), |_| {})
        .await;

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.outcomes[1].reasons, vec!["already stored"]);
    let all = store.get_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].price.as_deref(), Some("$10.00"));
}

#[tokio::test]
async fn max_count_truncates_the_input() {
    let fetcher = numbered_fetcher(5);
    let store = store();
    let sanitizers = SanitizerSet::builtin();
    let scraper = BulkScraper::new(&fetcher, &store, &sanitizers, options());
    let settings = ScrapeSettings {
        max_count: Some(2),
        ..ScrapeSettings::default()
    };

    let mut totals = Vec::new();
    let summary = scraper
        .run(&numbered_links(5), &settings, &CancellationToken::new(), |p| {
            totals.push(p.total);
        })
        .await;

    assert_eq!(summary.processed(), 2);
    assert_eq!(fetcher.calls(), 2);
    assert_eq!(totals, vec![2, 2]);
}

#[tokio::test]
async fn slow_fetch_times_out() {
    let fetcher = StubFetcher {
        delay: Some(Duration::from_secs(10)),
        ..numbered_fetcher(1)
    };
    let store = store();
    let sanitizers = SanitizerSet::builtin();
    let scraper = BulkScraper::new(
        &fetcher,
        &store,
        &sanitizers,
        BulkOptions {
            fetch_timeout: Duration::from_millis(50),
            ..options()
        },
    );

    let outcome = scraper
        .scrape_one(&BulkLink::new("", url(0)), &ScrapeSettings::default())
        .await;

    assert_eq!(outcome.status, ItemStatus::Failed);
    assert!(outcome.reasons[0].contains("timed out"), "{:?}", outcome.reasons);
}

#[tokio::test]
async fn non_success_status_fails_the_item() {
    let fetcher = StubFetcher::default().with_page(
        &url(0),
        FetchedPage {
            status: 503,
            body: product_page("Mug", Some("$5.00")),
        },
    );
    let store = store();
    let sanitizers = SanitizerSet::builtin();
    let scraper = BulkScraper::new(&fetcher, &store, &sanitizers, options());

    let outcome = scraper
        .scrape_one(&BulkLink::new("", url(0)), &ScrapeSettings::default())
        .await;

    assert_eq!(outcome.status, ItemStatus::Failed);
    assert!(outcome.reasons[0].contains("503"));
    assert!(store.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn unsupported_site_fails_without_stopping_the_run() {
    let fetcher = numbered_fetcher(1).with_page(
        "https://shop.example.org/p/1",
        FetchedPage::ok(product_page("Mug", Some("$5.00"))),
    );
    let links = vec![
        BulkLink::new("X1", "https://shop.example.org/p/1"),
        BulkLink::new("", url(0)),
    ];
    let store = store();
    let sanitizers = SanitizerSet::builtin();
    let scraper = BulkScraper::new(&fetcher, &store, &sanitizers, options());

    let summary = scraper
        .run(&links, &ScrapeSettings::default(), &CancellationToken::new(), |_| {})
        .await;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.succeeded, 1);
}

#[tokio::test]
async fn scrape_html_runs_the_pipeline_without_fetching() {
    let fetcher = StubFetcher::default();
    let store = store();
    let sanitizers = SanitizerSet::builtin();
    let scraper = BulkScraper::new(&fetcher, &store, &sanitizers, options());

    let outcome = scraper
        .scrape_html(
            &BulkLink::new("", url(3)),
            product_page("Amazon Basics Mug", Some("$3.25")),
            &ScrapeSettings::default(),
        )
        .await;

    assert_eq!(outcome.status, ItemStatus::Succeeded);
    assert_eq!(outcome.stored_in, Some(StoredIn::Primary));
    assert_eq!(fetcher.calls(), 0);
    let record = outcome.record.unwrap();
    assert_eq!(record.external_id, "B0TEST0003");
    assert_eq!(record.title.as_deref(), Some("Mug"));
}
