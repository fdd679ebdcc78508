//! Integration tests for the crawler
//!
//! Most tests crawl a scripted in-memory web, where each page's body is
//! its outbound links, one per line. The last tests use wiremock to run
//! the HTTP downloader and HTML extractor end-to-end.

use async_trait::async_trait;
use fanout_crawler::config::Config;
use fanout_crawler::crawler::{Document, Downloader, LinkExtractor};
use fanout_crawler::{CrawlError, Crawler};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A web of pages keyed by URL, with per-host concurrency bookkeeping
#[derive(Default)]
struct ScriptedWeb {
    pages: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    delay: Duration,
    fetches: Mutex<HashMap<String, usize>>,
    in_flight: Mutex<HashMap<String, usize>>,
    peak: Mutex<HashMap<String, usize>>,
    active: AtomicUsize,
}

impl ScriptedWeb {
    fn new() -> Self {
        Self::default()
    }

    fn page(mut self, url: &str, links: &[&str]) -> Self {
        self.pages
            .insert(url.to_string(), links.iter().map(|l| l.to_string()).collect());
        self
    }

    fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn fetch_count(&self, url: &str) -> usize {
        self.fetches.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    fn total_fetches(&self) -> usize {
        self.fetches.lock().unwrap().values().sum()
    }

    fn max_fetches_per_url(&self) -> usize {
        self.fetches.lock().unwrap().values().copied().max().unwrap_or(0)
    }

    fn peak_for(&self, host: &str) -> usize {
        self.peak.lock().unwrap().get(host).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Downloader for ScriptedWeb {
    async fn download(&self, url: &str) -> Result<Document, CrawlError> {
        let host = fanout_crawler::extract_host(url)?;
        *self.fetches.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;

        {
            let mut in_flight = self.in_flight.lock().unwrap();
            let now = in_flight.entry(host.clone()).or_insert(0);
            *now += 1;
            let mut peak = self.peak.lock().unwrap();
            let max = peak.entry(host.clone()).or_insert(0);
            *max = (*max).max(*now);
        }
        self.active.fetch_add(1, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        *self.in_flight.lock().unwrap().get_mut(&host).unwrap() -= 1;
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(url) {
            return Err(CrawlError::Fetch {
                url: url.to_string(),
                message: "connection reset".to_string(),
            });
        }

        let links = self.pages.get(url).cloned().unwrap_or_default();
        Ok(Document::new(url, links.join("\n")))
    }
}

/// Reads one link per body line and counts its invocations
#[derive(Default)]
struct LineExtractor {
    calls: AtomicUsize,
}

impl LinkExtractor for LineExtractor {
    fn extract_links(&self, document: &Document) -> Result<Vec<String>, CrawlError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(document
            .body
            .lines()
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }
}

fn test_config(downloads: usize, extractors: usize, per_host: usize) -> Config {
    let mut config = Config::default();
    config.crawler.downloads = downloads;
    config.crawler.extractors = extractors;
    config.crawler.per_host = per_host;
    config.crawler.requeue_backoff_ms = 1;
    config
}

fn crawler_for(
    web: &Arc<ScriptedWeb>,
    extractor: &Arc<LineExtractor>,
    config: &Config,
) -> Crawler {
    Crawler::new(config, web.clone(), extractor.clone()).expect("valid config")
}

fn sorted(urls: &[&str]) -> Vec<String> {
    let mut urls: Vec<String> = urls.iter().map(|u| u.to_string()).collect();
    urls.sort();
    urls
}

const A: &str = "http://site.test/a";
const B: &str = "http://site.test/b";
const C: &str = "http://site.test/c";
const D: &str = "http://site.test/d";
const E: &str = "http://site.test/e";

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_depth_two_scenario() {
    let web = Arc::new(
        ScriptedWeb::new()
            .page(A, &[B, C])
            .page(B, &[D])
            .page(C, &[])
            .page(D, &[]),
    );
    let extractor = Arc::new(LineExtractor::default());
    let crawler = crawler_for(&web, &extractor, &test_config(4, 2, 10));

    let result = crawler.crawl(A, 2).await;

    assert_eq!(result.downloaded, sorted(&[A, B, C]));
    assert!(result.errors.is_empty());
    assert!(result.is_complete());
    assert_eq!(web.fetch_count(D), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failing_fetch_is_reported() {
    let web = Arc::new(
        ScriptedWeb::new()
            .page(A, &[B, C])
            .page(B, &[D])
            .page(C, &[])
            .failing(B),
    );
    let extractor = Arc::new(LineExtractor::default());
    let crawler = crawler_for(&web, &extractor, &test_config(4, 2, 10));

    let result = crawler.crawl(A, 3).await;

    assert_eq!(result.downloaded, sorted(&[A, C]));
    assert_eq!(result.errors.len(), 1);
    assert!(matches!(
        result.error_for(B),
        Some(CrawlError::Fetch { .. })
    ));
    // The failed page is never expanded or retried
    assert_eq!(web.fetch_count(B), 1);
    assert_eq!(web.fetch_count(D), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cycle_terminates() {
    let web = Arc::new(ScriptedWeb::new().page(A, &[B]).page(B, &[A]));
    let extractor = Arc::new(LineExtractor::default());
    let crawler = crawler_for(&web, &extractor, &test_config(2, 2, 2));

    let result = tokio::time::timeout(Duration::from_secs(5), crawler.crawl(A, 50))
        .await
        .expect("cyclic crawl should terminate");

    assert_eq!(result.downloaded, sorted(&[A, B]));
    assert_eq!(web.fetch_count(A), 1);
    assert_eq!(web.fetch_count(B), 1);
}

#[tokio::test]
async fn test_max_depth_one_fetches_only_root() {
    let web = Arc::new(ScriptedWeb::new().page(A, &[B, C]));
    let extractor = Arc::new(LineExtractor::default());
    let crawler = crawler_for(&web, &extractor, &test_config(2, 2, 2));

    let result = crawler.crawl(A, 1).await;

    assert_eq!(result.downloaded, vec![A.to_string()]);
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
    assert_eq!(web.total_fetches(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_chain_stops_at_max_depth() {
    let web = Arc::new(
        ScriptedWeb::new()
            .page(A, &[B])
            .page(B, &[C])
            .page(C, &[D])
            .page(D, &[E]),
    );
    let extractor = Arc::new(LineExtractor::default());
    let crawler = crawler_for(&web, &extractor, &test_config(3, 3, 3));

    let result = crawler.crawl(A, 3).await;

    assert_eq!(result.downloaded, sorted(&[A, B, C]));
    assert_eq!(web.fetch_count(D), 0);
    assert_eq!(web.fetch_count(E), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_crawl_from_custom_start_depth() {
    let web = Arc::new(ScriptedWeb::new().page(A, &[B]).page(B, &[C]));
    let extractor = Arc::new(LineExtractor::default());
    let crawler = crawler_for(&web, &extractor, &test_config(2, 2, 2));

    // Starting at depth 2 leaves one level of expansion below max depth 3
    let result = crawler.crawl_from(A, 2, 3, None).await;

    assert_eq!(result.downloaded, sorted(&[A, B]));
}

/// Every page on three hosts links to every other page
fn dense_web(pages_per_host: usize) -> (ScriptedWeb, Vec<String>) {
    let urls: Vec<String> = ["one.test", "two.test", "three.test"]
        .iter()
        .flat_map(|host| (0..pages_per_host).map(move |i| format!("http://{}/p{}", host, i)))
        .collect();

    let mut web = ScriptedWeb::new().delay(Duration::from_millis(2));
    for url in &urls {
        let links: Vec<&str> = urls.iter().map(String::as_str).collect();
        web = web.page(url, &links);
    }
    (web, urls)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_no_url_fetched_twice() {
    let (web, urls) = dense_web(10);
    let web = Arc::new(web);
    let extractor = Arc::new(LineExtractor::default());
    let crawler = crawler_for(&web, &extractor, &test_config(16, 4, 4));

    let result = crawler.crawl(&urls[0], 3).await;

    assert_eq!(result.downloaded.len(), urls.len());
    assert_eq!(web.max_fetches_per_url(), 1);
    assert_eq!(web.total_fetches(), urls.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_per_host_limit_is_respected() {
    let (web, urls) = dense_web(12);
    let web = Arc::new(web.delay(Duration::from_millis(10)));
    let extractor = Arc::new(LineExtractor::default());
    let crawler = crawler_for(&web, &extractor, &test_config(16, 4, 2));

    let result = crawler.crawl(&urls[0], 2).await;

    assert_eq!(result.downloaded.len(), urls.len());
    for host in ["one.test", "two.test", "three.test"] {
        let peak = web.peak_for(host);
        assert!(peak >= 1, "{} was never fetched", host);
        assert!(peak <= 2, "{} had {} concurrent fetches", host, peak);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_worker_single_slot_does_not_deadlock() {
    let (web, urls) = dense_web(5);
    let web = Arc::new(web);
    let extractor = Arc::new(LineExtractor::default());
    let crawler = crawler_for(&web, &extractor, &test_config(1, 1, 1));

    let result = tokio::time::timeout(Duration::from_secs(10), crawler.crawl(&urls[0], 2))
        .await
        .expect("crawl should not deadlock");

    assert_eq!(result.downloaded.len(), urls.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_nothing_runs_after_completion() {
    let (web, urls) = dense_web(6);
    let web = Arc::new(web.delay(Duration::from_millis(5)));
    let extractor = Arc::new(LineExtractor::default());
    let crawler = crawler_for(&web, &extractor, &test_config(4, 2, 2));

    let result = crawler.crawl(&urls[0], 3).await;

    let fetched = web.total_fetches();
    assert_eq!(web.active.load(Ordering::SeqCst), 0);
    assert_eq!(fetched, result.downloaded.len() + result.errors.len());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(web.total_fetches(), fetched);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_downloaded_and_errors_are_disjoint() {
    let (web, urls) = dense_web(8);
    let web = Arc::new(web.failing("http://two.test/p3").failing("http://one.test/p5"));
    let extractor = Arc::new(LineExtractor::default());
    let crawler = crawler_for(&web, &extractor, &test_config(8, 2, 3));

    let result = crawler.crawl(&urls[0], 3).await;

    assert_eq!(result.errors.len(), 2);
    for url in result.errors.keys() {
        assert!(!result.downloaded.contains(url));
    }
    let attempted: HashSet<&String> = result
        .downloaded
        .iter()
        .chain(result.errors.keys())
        .collect();
    assert_eq!(attempted.len(), urls.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancellation_returns_partial_result() {
    let (web, urls) = dense_web(10);
    let web = Arc::new(web.delay(Duration::from_millis(100)));
    let extractor = Arc::new(LineExtractor::default());
    let crawler = crawler_for(&web, &extractor, &test_config(2, 1, 1));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        trigger.cancel();
    });

    let result = crawler
        .crawl_with_cancellation(&urls[0], 3, cancel)
        .await;

    assert!(result.interrupted);
    assert!(!result.is_complete());
    assert!(result.downloaded.len() < urls.len());
    for url in &result.downloaded {
        assert!(web.fetch_count(url) >= 1, "{} reported but never fetched", url);
    }
    crawler.close();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancelled_crawl_omits_urls_waiting_on_host() {
    // One slot on a single host keeps every sibling requeueing behind the root
    let web = Arc::new(
        ScriptedWeb::new()
            .page(A, &[B, C, D, E])
            .delay(Duration::from_millis(100)),
    );
    let extractor = Arc::new(LineExtractor::default());
    let crawler = crawler_for(&web, &extractor, &test_config(4, 1, 1));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        trigger.cancel();
    });

    let result = crawler.crawl_with_cancellation(A, 2, cancel).await;

    assert!(result.interrupted);
    assert!(result.downloaded.contains(&A.to_string()));
    assert!(result.downloaded.len() < 5);
    for url in &result.downloaded {
        assert!(web.fetch_count(url) >= 1, "{} reported but never fetched", url);
    }
    crawler.close();
}

struct PanickingDownloader;

#[async_trait]
impl Downloader for PanickingDownloader {
    async fn download(&self, url: &str) -> Result<Document, CrawlError> {
        panic!("downloader crashed on {}", url);
    }
}

#[tokio::test]
async fn test_panicking_downloader_fails_the_url() {
    let extractor = Arc::new(LineExtractor::default());
    let crawler = Crawler::new(&test_config(1, 1, 1), Arc::new(PanickingDownloader), extractor)
        .expect("valid config");

    let result = tokio::time::timeout(Duration::from_secs(5), crawler.crawl(A, 2))
        .await
        .expect("a panicking fetch still settles");

    assert!(result.downloaded.is_empty());
    assert!(matches!(
        result.error_for(A),
        Some(CrawlError::Fetch { message, .. }) if message == "panicked"
    ));
}

#[tokio::test]
async fn test_out_of_range_depths_are_rejected() {
    let web = Arc::new(ScriptedWeb::new().page(A, &[B]));
    let extractor = Arc::new(LineExtractor::default());
    let crawler = crawler_for(&web, &extractor, &test_config(2, 1, 1));

    let zero = crawler.crawl(A, 0).await;
    assert!(zero.downloaded.is_empty());
    assert!(matches!(zero.error_for(A), Some(CrawlError::Config(_))));

    let inverted = crawler.crawl_from(A, 3, 2, None).await;
    assert!(inverted.downloaded.is_empty());
    assert!(matches!(inverted.error_for(A), Some(CrawlError::Config(_))));

    assert_eq!(web.total_fetches(), 0);
}

#[tokio::test]
async fn test_close_is_idempotent_and_refuses_new_crawls() {
    let web = Arc::new(ScriptedWeb::new().page(A, &[B]));
    let extractor = Arc::new(LineExtractor::default());
    let crawler = crawler_for(&web, &extractor, &test_config(2, 2, 2));

    crawler.close();
    crawler.close();
    assert!(crawler.pipeline().is_shut_down());

    let result = crawler.crawl(A, 2).await;

    assert!(result.downloaded.is_empty());
    assert!(matches!(
        result.error_for(A),
        Some(CrawlError::PoolClosed { .. })
    ));
    assert_eq!(web.total_fetches(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_close_during_crawl_drains() {
    let (web, urls) = dense_web(6);
    let web = Arc::new(web.delay(Duration::from_millis(20)));
    let extractor = Arc::new(LineExtractor::default());
    let crawler = Arc::new(crawler_for(&web, &extractor, &test_config(2, 1, 1)));

    let closer = Arc::clone(&crawler);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        closer.close();
    });

    let result = tokio::time::timeout(Duration::from_secs(10), crawler.crawl(&urls[0], 3))
        .await
        .expect("a closed pipeline still settles");

    assert!(result.is_complete());
    assert!(result.downloaded.contains(&urls[0]));
    assert!(result.downloaded.len() < urls.len());
    for url in result.errors.keys() {
        assert!(!result.downloaded.contains(url));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_crawls_are_isolated() {
    let web = Arc::new(
        ScriptedWeb::new()
            .page(A, &[B, C])
            .page(B, &[])
            .page(C, &[])
            .page(D, &[E])
            .page(E, &[A]),
    );
    let extractor = Arc::new(LineExtractor::default());
    let crawler = crawler_for(&web, &extractor, &test_config(4, 2, 4));

    let (first, second) = tokio::join!(crawler.crawl(A, 2), crawler.crawl(D, 3));

    assert_eq!(first.downloaded, sorted(&[A, B, C]));
    assert_eq!(second.downloaded, sorted(&[A, D, E]));
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let web = Arc::new(ScriptedWeb::new());
    let extractor = Arc::new(LineExtractor::default());

    let result = Crawler::new(&test_config(0, 1, 1), web, extractor);
    assert!(matches!(result, Err(CrawlError::Config(_))));
}

fn html_page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_raw(format!("<html><body>{}</body></html>", body), "text/html")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_http_crawl_end_to_end() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            r#"<a href="/page1">Page 1</a>
               <a href="/page2">Page 2</a>
               <a href="mailto:someone@example.com">Mail</a>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(html_page(r#"<a href="/">Home</a><a href="/deep">Deep</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/deep"))
        .respond_with(html_page("Deep"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let crawler = Crawler::with_http(&test_config(4, 2, 2)).expect("crawler");
    let root = format!("{}/", base_url);
    let page1 = format!("{}/page1", base_url);
    let page2 = format!("{}/page2", base_url);

    let result = crawler.crawl(&root, 2).await;

    let mut expected = vec![root.clone(), page1];
    expected.sort();
    assert_eq!(result.downloaded, expected);
    assert!(matches!(
        result.error_for(&page2),
        Some(CrawlError::Status { status: 404, .. })
    ));
}

#[tokio::test]
async fn test_http_unreachable_root() {
    let crawler = Crawler::with_http(&test_config(1, 1, 1)).expect("crawler");

    let result = crawler.crawl("http://127.0.0.1:9/", 2).await;

    assert!(result.downloaded.is_empty());
    assert_eq!(result.errors.len(), 1);
}
