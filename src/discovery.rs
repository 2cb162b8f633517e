//! Profile link discovery on results pages.
//!
//! Two strategies are tried in order against the rendered HTML: a direct
//! selector match on profile-looking paths, then a heuristic scan over all
//! anchors. Each strategy is a pure function returning "no result" instead of
//! erroring, so the caller simply advances to the next tier on emptiness.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

static PROFILE_PATH_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        r#"a[href*="/agent/"], a[href*="/agents/"], a[href*="/realtor"], a[href*="/real-estate-agent"]"#,
    )
    .expect("profile path selector is valid")
});

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a").expect("anchor selector is valid"));

static IMG_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img").expect("img selector is valid"));

/// Discovers profile URLs on a rendered results page.
///
/// Hrefs are resolved against `page_url` so every returned URL is absolute,
/// and duplicates are collapsed by exact string equality while preserving
/// first-occurrence order. An empty result is not an error; the caller decides
/// whether to fall back to click-through navigation.
pub(crate) fn discover_profile_links(html: &str, page_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);

    let mut hrefs = direct_profile_hrefs(&document);
    if hrefs.is_empty() {
        hrefs = heuristic_profile_hrefs(&document, page_url);
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut links = Vec::new();
    for href in hrefs {
        match page_url.join(&href) {
            Ok(absolute) => {
                if seen.insert(absolute.to_string()) {
                    links.push(absolute);
                }
            }
            Err(e) => {
                tracing::debug!(target: "discovery", "Skipping unresolvable href '{}': {}", href, e);
            }
        }
    }

    links
}

/// Strategy 1: anchors whose href carries a profile-looking path segment.
fn direct_profile_hrefs(document: &Html) -> Vec<String> {
    document
        .select(&PROFILE_PATH_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| !href.is_empty())
        .map(str::to_string)
        .collect()
}

/// Strategy 2: any anchor that looks like it leads to a profile — link text
/// mentioning "profile" or "view", or a card-style anchor wrapping an image —
/// excluding links pointing back at the results listing itself.
fn heuristic_profile_hrefs(document: &Html, page_url: &Url) -> Vec<String> {
    let listing_segment = page_url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
        .unwrap_or("")
        .to_string();

    document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            if href.is_empty() {
                return None;
            }
            if !listing_segment.is_empty() && href.contains(&listing_segment) {
                return None;
            }

            let text = a.text().collect::<String>().to_lowercase();
            let has_img = a.select(&IMG_SELECTOR).next().is_some();
            let looks_like_profile =
                text.contains("profile") || text.contains("view") || has_img;

            looks_like_profile.then(|| href.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("https://www.exprealty.com/agents-search?page=1&country=US").unwrap()
    }

    #[test]
    fn test_direct_selector_deduplicates_and_resolves() {
        let html = r#"
            <html><body>
                <a href="/agents/123">Jane Doe</a>
                <a href="/agents/123">Jane Doe (photo)</a>
                <a href="/agents/456">John Roe</a>
            </body></html>
        "#;
        let links = discover_profile_links(html, &page_url());
        let as_strings: Vec<String> = links.iter().map(Url::to_string).collect();
        assert_eq!(
            as_strings,
            vec![
                "https://www.exprealty.com/agents/123",
                "https://www.exprealty.com/agents/456",
            ]
        );
    }

    #[test]
    fn test_all_links_are_absolute() {
        let html = r#"<a href="/agent/abc">A</a><a href="realtor-jane">B</a>"#;
        let links = discover_profile_links(html, &page_url());
        assert!(!links.is_empty());
        for link in links {
            assert!(link.has_host(), "expected absolute URL, got {}", link);
        }
    }

    #[test]
    fn test_heuristic_tier_used_when_direct_matches_nothing() {
        let html = r#"
            <html><body>
                <a href="/people/jane">View profile</a>
                <a href="/people/john"><img src="j.jpg"></a>
                <a href="/agents-search?page=2">Next page</a>
                <a href="/about">About us</a>
            </body></html>
        "#;
        let links = discover_profile_links(html, &page_url());
        let as_strings: Vec<String> = links.iter().map(Url::to_string).collect();
        assert_eq!(
            as_strings,
            vec![
                "https://www.exprealty.com/people/jane",
                "https://www.exprealty.com/people/john",
            ]
        );
    }

    #[test]
    fn test_direct_tier_wins_over_heuristic() {
        // When the direct selector matches, heuristic candidates are ignored.
        let html = r#"
            <a href="/agents/1">Jane</a>
            <a href="/people/extra"><img src="x.jpg"></a>
        "#;
        let links = discover_profile_links(html, &page_url());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].path(), "/agents/1");
    }

    #[test]
    fn test_empty_document_yields_empty_set() {
        assert!(discover_profile_links("<html></html>", &page_url()).is_empty());
    }
}
