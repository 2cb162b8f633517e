//! Click-through fallback for results pages without discoverable links.
//!
//! Some listings render result cards whose navigation happens entirely in
//! client-side handlers, leaving no anchors to harvest. This module drives
//! the page like a user instead: click a card, parse the profile in place,
//! then return to the results page before the next card.

use crate::browser;
use crate::config::CONFIG;
use crate::extract;
use crate::models::ContactRecord;
use chromiumoxide::page::Page;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Structural selectors for clickable result cards, in priority order. The
/// first selector yielding at least one match wins; results are never merged
/// across selectors.
const CARD_SELECTORS: &[&str] = &[
    "a:has(img)",
    r#"[role="link"]:has(img)"#,
    ".card:has(img)",
    "article:has(img)",
    r#"[data-testid*="agent"] a, [data-testid*="card"] a"#,
];

/// Visits result cards by clicking them one at a time and extracting a
/// contact from each opened profile.
///
/// Every per-card failure (stale handle, click timeout, navigation miss) is
/// logged and skipped; the remaining cards are still processed. Returning to
/// the results page is best-effort: browser-back raced against a bounded
/// timeout, after which the next card is attempted regardless.
pub(crate) async fn click_through_cards(page: &Page) -> Vec<ContactRecord> {
    let mut cards = Vec::new();
    for selector in CARD_SELECTORS {
        match page.find_elements(*selector).await {
            Ok(found) if !found.is_empty() => {
                debug!(target: "fallback", "Selector '{}' matched {} cards", selector, found.len());
                cards = found;
                break;
            }
            Ok(_) => {}
            Err(e) => {
                debug!(target: "fallback", "Selector '{}' failed: {}", selector, e);
            }
        }
    }

    if cards.is_empty() {
        warn!(target: "fallback", "No clickable result cards matched any selector");
        return Vec::new();
    }

    let limit = CONFIG.sample_cap(cards.len());
    info!(target: "fallback", "Click-through over {} of {} cards", limit, cards.len());

    let mut records = Vec::new();
    for (index, card) in cards.into_iter().take(limit).enumerate() {
        match timeout(CONFIG.click_timeout, card.click()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                debug!(target: "fallback", "Card {} click failed: {}", index, e);
            }
            Err(_) => {
                debug!(target: "fallback", "Card {} click timed out", index);
            }
        }

        // Navigation may legitimately not happen (overlay instead of a page
        // change); the parse below runs against whatever is current.
        if timeout(CONFIG.nav_wait_timeout, page.wait_for_navigation())
            .await
            .is_err()
        {
            debug!(target: "fallback", "Card {}: no navigation within {:?}", index, CONFIG.nav_wait_timeout);
        }

        let record = extract::parse_profile(page).await;
        if record.has_contact() {
            records.push(record);
        }

        go_back(page).await;
    }

    records
}

/// Returns to the prior results page with browser-back semantics, bounded by
/// the configured timeout. A back navigation that does not resolve in time is
/// tolerated; the crawl proceeds from wherever the page ended up.
async fn go_back(page: &Page) {
    let back = async {
        if let Err(e) = page.evaluate("window.history.back()").await {
            debug!(target: "fallback", "history.back() failed: {}", e);
            return;
        }
        let _ = page.wait_for_navigation().await;
    };

    if timeout(CONFIG.back_timeout, back).await.is_err() {
        debug!(
            target: "fallback",
            "Back navigation unresolved after {:?}; continuing on {}",
            CONFIG.back_timeout,
            browser::page_url(page).await
        );
    }
}
