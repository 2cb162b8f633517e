//! The crawl state machine: work dispatch, SEARCH/PROFILE handlers, and the
//! shared result sink.
//!
//! A small fixed pool of workers drains a shared queue of [`WorkItem`]s; each
//! worker owns one browser page for the whole run. SEARCH items discover
//! profile links (or fall back to click-through), enqueue follow-up work, and
//! keep pagination moving; PROFILE items parse one agent page each. Any
//! per-item failure is caught at the item boundary and never stops the run.

use crate::browser::{self, BrowserHandle};
use crate::config::CONFIG;
use crate::discovery;
use crate::error::{AppError, Result};
use crate::extract;
use crate::fallback;
use crate::models::{ContactRecord, PageLabel, WorkItem};
use chromiumoxide::page::Page;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, Notify};
use tokio::time::{sleep, timeout};
use tracing::{info, warn};
use url::Url;

/// Shared state between crawl workers: the pending work queue and the
/// append-only record sink. Enqueuing and appending are the only cross-worker
/// interactions, both behind their own lock.
struct CrawlState {
    queue: Mutex<VecDeque<WorkItem>>,
    in_flight: AtomicUsize,
    work_available: Notify,
    records: Mutex<Vec<ContactRecord>>,
    progress: ProgressBar,
}

impl CrawlState {
    fn new(progress: ProgressBar) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            in_flight: AtomicUsize::new(0),
            work_available: Notify::new(),
            records: Mutex::new(Vec::new()),
            progress,
        }
    }

    async fn enqueue(&self, item: WorkItem) {
        self.queue.lock().await.push_back(item);
        self.progress.inc_length(1);
        self.work_available.notify_waiters();
    }

    /// Pops the next item, marking it in-flight under the same lock so an
    /// idle worker can never observe "queue empty, nothing in flight" while a
    /// sibling is between pop and increment.
    async fn next_item(&self) -> Option<WorkItem> {
        let mut queue = self.queue.lock().await;
        let item = queue.pop_front();
        if item.is_some() {
            self.in_flight.fetch_add(1, Ordering::SeqCst);
        }
        item
    }

    fn finish_item(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.progress.inc(1);
        self.work_available.notify_waiters();
    }

    fn is_drained(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) == 0
    }

    async fn append_record(&self, record: ContactRecord) {
        self.records.lock().await.push(record);
    }

    async fn append_records(&self, records: Vec<ContactRecord>) {
        self.records.lock().await.extend(records);
    }

    async fn record_count(&self) -> usize {
        self.records.lock().await.len()
    }
}

/// Reads the page number a results URL declares in its `page` query
/// parameter, defaulting to 1 when absent or unparsable.
pub(crate) fn page_number_from_url(url: &Url) -> u32 {
    url.query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
        .unwrap_or(1)
}

/// Pagination strictly increases and stays within the configured budget:
/// page n+1 is enqueued from page n only while n < start + max − 1.
pub(crate) fn next_page_in_budget(current: u32, last_allowed: u32) -> Option<u32> {
    (current < last_allowed).then_some(current + 1)
}

/// Drives one crawl run against a launched browser.
pub(crate) struct Crawler {
    browser: BrowserHandle,
}

impl Crawler {
    pub(crate) fn new(browser: BrowserHandle) -> Self {
        Self { browser }
    }

    /// Tears down the underlying browser once the run is over.
    pub(crate) async fn shutdown(self) {
        self.browser.shutdown().await;
    }

    /// Runs the crawl to natural completion (queue drained) and returns the
    /// raw accumulated records, in arrival order and not yet deduplicated.
    pub(crate) async fn run(&self) -> Result<Vec<ContactRecord>> {
        let progress = ProgressBar::new(0);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("##-"),
        );

        let state = Arc::new(CrawlState::new(progress));
        let seed_url = CONFIG.search_url(CONFIG.start_page)?;
        state.enqueue(WorkItem::search(seed_url)).await;

        let mut workers = Vec::with_capacity(CONFIG.max_concurrency);
        for worker_id in 0..CONFIG.max_concurrency {
            let page = self.browser.new_page().await?;
            let state = Arc::clone(&state);
            workers.push(tokio::spawn(worker_loop(worker_id, page, state)));
        }

        for worker in workers {
            worker
                .await
                .map_err(|e| AppError::Task(format!("Crawl worker panicked: {}", e)))?;
        }

        state.progress.finish_with_message("Crawl complete");

        let records = std::mem::take(&mut *state.records.lock().await);
        Ok(records)
    }
}

/// One worker's life: pull items until the queue is empty and no sibling has
/// anything in flight that could still enqueue more.
async fn worker_loop(worker_id: usize, page: Page, state: Arc<CrawlState>) {
    loop {
        match state.next_item().await {
            Some(item) => {
                let outcome = timeout(CONFIG.handler_timeout, handle_item(&page, &state, &item)).await;
                match outcome {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        warn!(target: "crawl",
                            "[worker {}] {} item {} failed: {}",
                            worker_id, item.label, item.url, e
                        );
                    }
                    Err(_) => {
                        warn!(target: "crawl",
                            "[worker {}] {} item {} timed out after {:?}",
                            worker_id, item.label, item.url, CONFIG.handler_timeout
                        );
                    }
                }
                state.finish_item();
            }
            None => {
                if state.is_drained() {
                    break;
                }
                // A sibling is mid-item and may still enqueue follow-ups.
                tokio::select! {
                    _ = state.work_available.notified() => {}
                    _ = sleep(std::time::Duration::from_millis(100)) => {}
                }
            }
        }
    }
}

async fn handle_item(page: &Page, state: &Arc<CrawlState>, item: &WorkItem) -> Result<()> {
    match item.label {
        PageLabel::Search => handle_search(page, state, &item.url).await,
        PageLabel::Profile => handle_profile(page, state, &item.url).await,
    }
}

/// SEARCH handler: discover profile links, enqueue follow-up work, and keep
/// pagination moving.
async fn handle_search(page: &Page, state: &Arc<CrawlState>, url: &Url) -> Result<()> {
    info!(target: "crawl", "Results page: {}", url);

    page.goto(url.as_str()).await?;
    let _ = page.wait_for_navigation().await;
    sleep(CONFIG.search_settle).await;
    browser::auto_scroll(page, CONFIG.scroll_steps).await;

    let html = browser::page_html(page).await;
    let profile_links = discovery::discover_profile_links(&html, url);
    info!(target: "crawl", "Found {} candidate profile links", profile_links.len());

    let mut used_fallback = false;

    if CONFIG.follow_profile_links && !profile_links.is_empty() {
        let to_queue = CONFIG.sample_cap(profile_links.len());
        for link in profile_links.into_iter().take(to_queue) {
            state.enqueue(WorkItem::profile(link)).await;
        }
    } else if CONFIG.follow_profile_links {
        used_fallback = true;
        warn!(target: "crawl", "No profile hrefs found; entering fallback click-through mode");
        let records = fallback::click_through_cards(page).await;
        info!(target: "crawl", "Fallback click-through yielded {} contacts", records.len());
        state.append_records(records).await;
    }

    let current_page = page_number_from_url(url);
    if let Some(next_page) = next_page_in_budget(current_page, CONFIG.last_results_page()) {
        state.enqueue(WorkItem::search(CONFIG.search_url(next_page)?)).await;
    }

    if used_fallback && state.record_count().await == 0 {
        warn!(target: "crawl", "Fallback mode collected 0 contacts; card selectors may need updating");
    }

    Ok(())
}

/// PROFILE handler: parse one agent page and append the record.
async fn handle_profile(page: &Page, state: &Arc<CrawlState>, url: &Url) -> Result<()> {
    info!(target: "crawl", "Profile: {}", url);

    page.goto(url.as_str()).await?;
    let _ = page.wait_for_navigation().await;
    sleep(CONFIG.profile_settle).await;

    let record = extract::parse_profile(page).await;
    state.append_record(record).await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_number_from_url() {
        let url = Url::parse("https://x.com/agents-search?page=4&country=US").unwrap();
        assert_eq!(page_number_from_url(&url), 4);

        let no_page = Url::parse("https://x.com/agents-search?country=US").unwrap();
        assert_eq!(page_number_from_url(&no_page), 1);

        let junk = Url::parse("https://x.com/agents-search?page=abc").unwrap();
        assert_eq!(page_number_from_url(&junk), 1);
    }

    #[test]
    fn test_pagination_budget_two_pages() {
        // start_page=1, max_results_pages=2: page 1 enqueues page 2,
        // page 2 enqueues nothing. Page 3 is never reached.
        let last_allowed = 2;
        assert_eq!(next_page_in_budget(1, last_allowed), Some(2));
        assert_eq!(next_page_in_budget(2, last_allowed), None);
        assert_eq!(next_page_in_budget(3, last_allowed), None);
    }

    #[test]
    fn test_pagination_strictly_increases() {
        for current in 1..10 {
            if let Some(next) = next_page_in_budget(current, 10) {
                assert_eq!(next, current + 1);
            }
        }
    }
}
