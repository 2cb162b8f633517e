//! Contact extraction and profile parsing.
//!
//! Extraction is layered: structured `tel:`/`mailto:` links are preferred,
//! with a regex scan over the rendered document as the fallback tier. Sites
//! that hide contact data behind "Show phone"-style controls get a reveal
//! pass over the live page before the snapshot is taken.

use crate::browser;
use crate::config::CONFIG;
use crate::models::ContactRecord;
use crate::names;
use chromiumoxide::page::Page;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tokio::time::sleep;
use tracing::{debug, warn};

static TEL_LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href^="tel:"]"#).expect("tel selector is valid"));

static MAILTO_LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href^="mailto:"]"#).expect("mailto selector is valid"));

static HEADING_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"h1, h2, .agent-name, [data-testid="agent-name"]"#)
        .expect("heading selector is valid")
});

/// North-American phone formats: optional +1, optional parens, mixed separators.
static PHONE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}")
        .expect("phone regex pattern is valid")
});

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")
        .expect("email regex pattern is valid")
});

/// Finds a phone number in rendered HTML.
///
/// A structured `tel:` link wins; otherwise the first regex match anywhere in
/// the document is taken. Returns an empty string when nothing matches.
pub(crate) fn find_phone(html: &str) -> String {
    let document = Html::parse_document(html);
    for link in document.select(&TEL_LINK_SELECTOR) {
        if let Some(number) = link
            .value()
            .attr("href")
            .and_then(|href| href.strip_prefix("tel:"))
        {
            let number = number.trim();
            if !number.is_empty() {
                return number.to_string();
            }
        }
    }

    PHONE_REGEX
        .find(html)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Finds an email address in rendered HTML.
///
/// A structured `mailto:` link wins (with any `?subject=...` query stripped);
/// otherwise the first regex match in the document is taken. Returns an empty
/// string when nothing matches.
pub(crate) fn find_email(html: &str) -> String {
    let document = Html::parse_document(html);
    for link in document.select(&MAILTO_LINK_SELECTOR) {
        if let Some(address) = link
            .value()
            .attr("href")
            .and_then(|href| href.strip_prefix("mailto:"))
        {
            let address = address.split('?').next().unwrap_or("").trim();
            if !address.is_empty() {
                return address.to_string();
            }
        }
    }

    EMAIL_REGEX
        .find(html)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Reads the agent's display name from a rendered profile page: the first
/// heading-like element, falling back to the document title.
pub(crate) fn display_name(html: &str) -> String {
    let document = Html::parse_document(html);

    if let Some(heading) = document.select(&HEADING_SELECTOR).next() {
        let text = heading.text().collect::<String>().trim().to_string();
        if !text.is_empty() {
            return text;
        }
    }

    static TITLE_SELECTOR: Lazy<Selector> =
        Lazy::new(|| Selector::parse("title").expect("title selector is valid"));
    document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Clicks every control that looks like a hidden-contact reveal ("Show
/// phone", "View email", ...). Individual click failures are tolerated; a
/// short pause after each click lets the revealed content render.
async fn reveal_hidden_contacts(page: &Page) {
    let controls = match page.find_elements(r#"button, a[role="button"]"#).await {
        Ok(controls) => controls,
        Err(e) => {
            debug!(target: "extract", "No clickable controls found: {}", e);
            return;
        }
    };

    for control in controls {
        let text = control
            .inner_text()
            .await
            .ok()
            .flatten()
            .unwrap_or_default()
            .to_lowercase();

        let is_reveal = (text.contains("show") || text.contains("view"))
            && (text.contains("phone") || text.contains("email") || text.contains("contact"));
        if !is_reveal {
            continue;
        }

        if let Err(e) = control.click().await {
            debug!(target: "extract", "Reveal control click failed: {}", e);
        }
        sleep(CONFIG.reveal_settle).await;
    }
}

/// Extracts `(phone, email)` from the profile page currently loaded in
/// `page`, running the reveal pass first. Both values may be empty; this
/// never fails.
pub(crate) async fn extract_contact(page: &Page) -> (String, String) {
    reveal_hidden_contacts(page).await;

    let html = browser::page_html(page).await;
    (find_phone(&html), find_email(&html))
}

/// Parses the profile page currently loaded in `page` into one
/// [`ContactRecord`].
///
/// Waits briefly for dynamic content, reads and cleans the display name, then
/// runs contact extraction. A record with neither email nor phone is still
/// returned — the caller decides whether to keep it.
pub(crate) async fn parse_profile(page: &Page) -> ContactRecord {
    sleep(CONFIG.parse_settle).await;

    let (phone, email) = extract_contact(page).await;

    let html = browser::page_html(page).await;
    let full_name = names::strip_brand_suffix(&display_name(&html), &CONFIG.brand_suffix);
    let (first_name, last_name) = names::split_full_name(&full_name);

    if email.is_empty() && phone.is_empty() {
        warn!(target: "extract", "No contact found on {}", browser::page_url(page).await);
    }

    ContactRecord {
        email,
        first_name,
        last_name,
        phone,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_phone_prefers_tel_link() {
        let html = r#"
            <body>
                <p>Call us at 555-111-2222</p>
                <a href="tel:+19045550123">Call</a>
            </body>
        "#;
        assert_eq!(find_phone(html), "+19045550123");
    }

    #[test]
    fn test_find_phone_regex_fallback_formats() {
        assert_eq!(find_phone("<p>(904) 555-0123</p>"), "(904) 555-0123");
        assert_eq!(find_phone("<p>+1 904.555.0123</p>"), "+1 904.555.0123");
        assert_eq!(find_phone("<p>9045550123</p>"), "9045550123");
    }

    #[test]
    fn test_find_email_prefers_mailto_link() {
        // The mailto address wins even though another plausible address
        // appears earlier in the text.
        let html = r#"
            <body>
                <p>decoy@elsewhere.com</p>
                <a href="mailto:jane.doe@exprealty.com?subject=Hi">Email me</a>
            </body>
        "#;
        assert_eq!(find_email(html), "jane.doe@exprealty.com");
    }

    #[test]
    fn test_find_email_regex_fallback() {
        assert_eq!(
            find_email("<p>Reach me at jane.doe@exprealty.com today</p>"),
            "jane.doe@exprealty.com"
        );
    }

    #[test]
    fn test_empty_document_yields_empty_contact() {
        let html = "<html><body><p>Nothing to see here</p></body></html>";
        assert_eq!(find_phone(html), "");
        assert_eq!(find_email(html), "");
    }

    #[test]
    fn test_display_name_from_heading() {
        let html = "<html><head><title>Jane | Site</title></head><body><h1>Jane Doe</h1></body></html>";
        assert_eq!(display_name(html), "Jane Doe");
    }

    #[test]
    fn test_display_name_falls_back_to_title() {
        let html = "<html><head><title>Jane Doe | eXp Realty</title></head><body></body></html>";
        assert_eq!(display_name(html), "Jane Doe | eXp Realty");
    }

    #[test]
    fn test_display_name_agent_name_class() {
        let html = r#"<body><div class="agent-name">John Roe</div></body>"#;
        assert_eq!(display_name(html), "John Roe");
    }
}
