//! Browser runtime management: launching headless Chrome and page helpers.
//!
//! The crawl logic treats the browser as an external collaborator; this module
//! is the only place that knows how chromiumoxide is launched and torn down.

use crate::config::CONFIG;
use crate::error::{AppError, Result};
use chromiumoxide::browser::{Browser, BrowserConfigBuilder};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Wrapper for the Browser and its CDP event handler task.
///
/// The handler task MUST be aborted once the browser is gone, otherwise it
/// keeps polling a dead connection; `Drop` takes care of that.
pub(crate) struct BrowserHandle {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserHandle {
    /// Launches a headless browser instance configured for crawling.
    pub(crate) async fn launch() -> Result<Self> {
        info!(target: "browser", "Launching browser (headless: {})", CONFIG.headless);

        let mut builder = BrowserConfigBuilder::default()
            .request_timeout(CONFIG.navigation_timeout)
            .window_size(1366, 900)
            .arg(format!("--user-agent={}", CONFIG.user_agent))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-extensions")
            .arg("--disable-notifications")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--hide-scrollbars")
            .arg("--mute-audio");
        if !CONFIG.headless {
            builder = builder.with_head();
        }
        let browser_config = builder.build().map_err(AppError::Config)?;

        let (browser, mut handler) = Browser::launch(browser_config).await?;

        let handler_task = tokio::task::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(target: "browser", "Browser handler event error: {:?}", e);
                }
            }
            debug!(target: "browser", "Browser event handler task completed");
        });

        Ok(Self {
            browser,
            handler: handler_task,
        })
    }

    /// Opens a blank page. Each crawl worker owns exactly one.
    pub(crate) async fn new_page(&self) -> Result<Page> {
        Ok(self.browser.new_page("about:blank").await?)
    }

    /// Closes the browser process and waits for it to exit.
    pub(crate) async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(target: "browser", "Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!(target: "browser", "Failed waiting for browser exit: {}", e);
        }
    }
}

impl Drop for BrowserHandle {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Reads the full rendered HTML of a page, degrading to an empty string on
/// failure so extraction can proceed best-effort.
pub(crate) async fn page_html(page: &Page) -> String {
    match page.content().await {
        Ok(html) => html,
        Err(e) => {
            debug!(target: "browser", "Failed to read page content: {}", e);
            String::new()
        }
    }
}

/// Returns the page's current URL, or "about:blank" when it has none yet or
/// the browser cannot be reached.
pub(crate) async fn page_url(page: &Page) -> String {
    match page.url().await {
        Ok(Some(url)) => url,
        _ => "about:blank".to_string(),
    }
}

/// Scrolls the viewport down step by step so lazily-rendered result cards get
/// a chance to mount. Scroll failures end the pass early but are not fatal.
pub(crate) async fn auto_scroll(page: &Page, max_steps: u32) {
    for step in 0..max_steps {
        if let Err(e) = page.evaluate("window.scrollBy(0, window.innerHeight)").await {
            debug!(target: "browser", "Auto-scroll stopped at step {}: {}", step, e);
            break;
        }
        tokio::time::sleep(CONFIG.scroll_pause).await;
    }
}
