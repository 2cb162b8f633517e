//! Defines the configuration settings for the agent-sleuth application.

use anyhow::Context;
use clap::Parser;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Command line arguments for agent-sleuth
#[derive(Parser, Debug)]
#[command(author, version, about = "A crawler that discovers and extracts agent contact details from real-estate directory listings", long_about = None)]
pub(crate) struct AppArgs {
    /// Results page number to start from
    #[arg(long, env = "AGENT_SLEUTH_START_PAGE")]
    pub start_page: Option<u32>,

    /// Maximum number of results pages to visit
    #[arg(short, long, env = "AGENT_SLEUTH_PAGES")]
    pub pages: Option<u32>,

    /// Location filter for the directory search (e.g. "Jacksonville, FL")
    #[arg(short, long, env = "AGENT_SLEUTH_LOCATION")]
    pub location: Option<String>,

    /// Country filter for the directory search
    #[arg(long, env = "AGENT_SLEUTH_COUNTRY")]
    pub country: Option<String>,

    /// Whether to visit each discovered profile page (true/false)
    #[arg(long, env = "AGENT_SLEUTH_FOLLOW_PROFILE_LINKS")]
    pub follow_profile_links: Option<bool>,

    /// Cap on profiles/cards processed per results page (0 = unlimited)
    #[arg(long, env = "AGENT_SLEUTH_SAMPLE_LIMIT")]
    pub sample_limit: Option<usize>,

    /// Path of the CSV output file
    #[arg(short = 'o', long, env = "AGENT_SLEUTH_CSV")]
    pub csv: Option<String>,

    /// Path of the JSON mirror output file
    #[arg(long, env = "AGENT_SLEUTH_JSON")]
    pub json: Option<String>,

    /// Base URL of the directory's paginated search endpoint
    #[arg(long, env = "AGENT_SLEUTH_BASE_SEARCH_URL")]
    pub base_search_url: Option<String>,

    /// Brand fragment stripped from profile display names (e.g. "eXp")
    #[arg(long, env = "AGENT_SLEUTH_BRAND_SUFFIX")]
    pub brand_suffix: Option<String>,

    /// Maximum number of concurrent crawl workers
    #[arg(short = 'c', long, env = "AGENT_SLEUTH_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Run the browser with a visible window instead of headless
    #[arg(long, default_value = "false", env = "AGENT_SLEUTH_HEADED")]
    pub headed: bool,

    /// Navigation timeout in seconds
    #[arg(long, env = "AGENT_SLEUTH_NAVIGATION_TIMEOUT")]
    pub navigation_timeout: Option<u64>,

    /// Per-work-item handler timeout in seconds
    #[arg(long, env = "AGENT_SLEUTH_HANDLER_TIMEOUT")]
    pub handler_timeout: Option<u64>,

    /// User agent string for the browser
    #[arg(long, env = "AGENT_SLEUTH_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Path to configuration file (TOML format)
    #[arg(long, env = "AGENT_SLEUTH_CONFIG")]
    pub config_file: Option<String>,
}

/// TOML Configuration file structure
#[derive(Deserialize, Debug, Default)]
struct ConfigFile {
    crawl: Option<CrawlSection>,
    site: Option<SiteSection>,
    browser: Option<BrowserSection>,
    timing: Option<TimingSection>,
    output: Option<OutputSection>,
}

#[derive(Deserialize, Debug, Default)]
struct CrawlSection {
    start_page: Option<u32>,
    max_results_pages: Option<u32>,
    location: Option<String>,
    country: Option<String>,
    follow_profile_links: Option<bool>,
    sample_limit: Option<usize>,
    max_concurrency: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
struct SiteSection {
    base_search_url: Option<String>,
    brand_suffix: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct BrowserSection {
    headless: Option<bool>,
    user_agent: Option<String>,
    navigation_timeout: Option<u64>,
    scroll_steps: Option<u32>,
}

#[derive(Deserialize, Debug, Default)]
struct TimingSection {
    handler_timeout: Option<u64>,
    nav_wait_timeout: Option<u64>,
    click_timeout: Option<u64>,
    back_timeout_ms: Option<u64>,
    search_settle_ms: Option<u64>,
    profile_settle_ms: Option<u64>,
    parse_settle_ms: Option<u64>,
    reveal_settle_ms: Option<u64>,
    scroll_pause_ms: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
struct OutputSection {
    csv_file: Option<String>,
    json_file: Option<String>,
}

/// Application configuration settings.
#[derive(Debug, Clone)]
pub(crate) struct Config {
    /// Results page number the crawl starts from.
    pub start_page: u32,
    /// Maximum number of results pages to visit, counted from `start_page`.
    pub max_results_pages: u32,
    /// Location filter passed to the directory search.
    pub location: String,
    /// Country filter passed to the directory search.
    pub country: String,
    /// Whether discovered profile pages are visited (the deep pass).
    pub follow_profile_links: bool,
    /// Cap on profiles/fallback cards processed per results page. 0 = unlimited.
    pub sample_limit: usize,
    /// Base URL of the paginated search endpoint.
    pub base_search_url: String,
    /// Brand fragment stripped from the tail of display names.
    pub brand_suffix: String,
    /// Maximum number of concurrent crawl workers, each owning one page.
    pub max_concurrency: usize,
    /// Whether the browser runs headless.
    pub headless: bool,
    /// User agent string the browser announces.
    pub user_agent: String,
    /// Timeout for individual navigations and CDP requests.
    pub navigation_timeout: Duration,
    /// Hard timeout for handling one work item end to end.
    pub handler_timeout: Duration,
    /// Bound on waiting for a click-triggered navigation in fallback mode.
    pub nav_wait_timeout: Duration,
    /// Bound on a single card click in fallback mode.
    pub click_timeout: Duration,
    /// Bound on returning to the results page after a fallback visit.
    pub back_timeout: Duration,
    /// Pause after loading a results page, before scanning it.
    pub search_settle: Duration,
    /// Pause after loading a profile page, before parsing it.
    pub profile_settle: Duration,
    /// Pause inside the profile parser for late-rendering content.
    pub parse_settle: Duration,
    /// Pause after clicking a contact-reveal control.
    pub reveal_settle: Duration,
    /// Number of viewport scrolls applied to a results page.
    pub scroll_steps: u32,
    /// Pause between viewport scrolls.
    pub scroll_pause: Duration,
    /// Path of the CSV output file.
    pub csv_file: String,
    /// Path of the JSON mirror output file.
    pub json_file: String,
}

impl Config {
    fn default() -> Self {
        Config {
            start_page: 1,
            max_results_pages: 5,
            location: "Jacksonville, FL".to_string(),
            country: "US".to_string(),
            follow_profile_links: true,
            sample_limit: 0,
            base_search_url: "https://www.exprealty.com/agents-search".to_string(),
            brand_suffix: "eXp".to_string(),
            max_concurrency: 2,
            headless: true,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36".to_string(),
            navigation_timeout: Duration::from_secs(60),
            handler_timeout: Duration::from_secs(120),
            nav_wait_timeout: Duration::from_secs(15),
            click_timeout: Duration::from_secs(8),
            back_timeout: Duration::from_millis(1500),
            search_settle: Duration::from_millis(1500),
            profile_settle: Duration::from_millis(1200),
            parse_settle: Duration::from_millis(1800),
            reveal_settle: Duration::from_millis(400),
            scroll_steps: 6,
            scroll_pause: Duration::from_millis(400),
            csv_file: "agent_contacts.csv".to_string(),
            json_file: "agent_contacts.json".to_string(),
        }
    }

    /// Builds the absolute URL of one results page, percent-encoding the
    /// location and country filters.
    pub(crate) fn search_url(&self, page: u32) -> crate::error::Result<Url> {
        let mut url = Url::parse(&self.base_search_url)?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("country", &self.country)
            .append_pair("m", "f")
            .append_pair("location", &self.location);
        Ok(url)
    }

    /// The highest results page number this run is allowed to enqueue.
    pub(crate) fn last_results_page(&self) -> u32 {
        self.start_page + self.max_results_pages - 1
    }

    /// Applies the per-page sample limit to a number of available items.
    pub(crate) fn sample_cap(&self, available: usize) -> usize {
        if self.sample_limit == 0 {
            available
        } else {
            self.sample_limit.min(available)
        }
    }
}

/// Load configuration from a TOML file
fn load_config_file(file_path: &str) -> anyhow::Result<ConfigFile> {
    let path = Path::new(file_path);
    if !path.exists() {
        tracing::warn!("Configuration file {} not found, using defaults", file_path);
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", file_path))?;

    let config: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML configuration from {}", file_path))?;

    tracing::info!("Loaded configuration from {}", file_path);
    Ok(config)
}

fn apply_file_config(config: &mut Config, file_config: &ConfigFile) {
    if let Some(crawl) = &file_config.crawl {
        if let Some(start_page) = crawl.start_page {
            config.start_page = start_page;
        }
        if let Some(pages) = crawl.max_results_pages {
            config.max_results_pages = pages;
        }
        if let Some(location) = &crawl.location {
            config.location = location.clone();
        }
        if let Some(country) = &crawl.country {
            config.country = country.clone();
        }
        if let Some(follow) = crawl.follow_profile_links {
            config.follow_profile_links = follow;
        }
        if let Some(limit) = crawl.sample_limit {
            config.sample_limit = limit;
        }
        if let Some(concurrency) = crawl.max_concurrency {
            config.max_concurrency = concurrency;
        }
    }

    if let Some(site) = &file_config.site {
        if let Some(base) = &site.base_search_url {
            config.base_search_url = base.clone();
        }
        if let Some(brand) = &site.brand_suffix {
            config.brand_suffix = brand.clone();
        }
    }

    if let Some(browser) = &file_config.browser {
        if let Some(headless) = browser.headless {
            config.headless = headless;
        }
        if let Some(agent) = &browser.user_agent {
            config.user_agent = agent.clone();
        }
        if let Some(timeout) = browser.navigation_timeout {
            config.navigation_timeout = Duration::from_secs(timeout);
        }
        if let Some(steps) = browser.scroll_steps {
            config.scroll_steps = steps;
        }
    }

    if let Some(timing) = &file_config.timing {
        if let Some(timeout) = timing.handler_timeout {
            config.handler_timeout = Duration::from_secs(timeout);
        }
        if let Some(timeout) = timing.nav_wait_timeout {
            config.nav_wait_timeout = Duration::from_secs(timeout);
        }
        if let Some(timeout) = timing.click_timeout {
            config.click_timeout = Duration::from_secs(timeout);
        }
        if let Some(ms) = timing.back_timeout_ms {
            config.back_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = timing.search_settle_ms {
            config.search_settle = Duration::from_millis(ms);
        }
        if let Some(ms) = timing.profile_settle_ms {
            config.profile_settle = Duration::from_millis(ms);
        }
        if let Some(ms) = timing.parse_settle_ms {
            config.parse_settle = Duration::from_millis(ms);
        }
        if let Some(ms) = timing.reveal_settle_ms {
            config.reveal_settle = Duration::from_millis(ms);
        }
        if let Some(ms) = timing.scroll_pause_ms {
            config.scroll_pause = Duration::from_millis(ms);
        }
    }

    if let Some(output) = &file_config.output {
        if let Some(csv) = &output.csv_file {
            config.csv_file = csv.clone();
        }
        if let Some(json) = &output.json_file {
            config.json_file = json.clone();
        }
    }
}

/// Apply command line arguments to the Config instance
fn apply_cli_args(config: &mut Config, args: &AppArgs) {
    if let Some(start_page) = args.start_page {
        config.start_page = start_page;
    }

    if let Some(pages) = args.pages {
        config.max_results_pages = pages;
    }

    if let Some(ref location) = args.location {
        config.location = location.clone();
    }

    if let Some(ref country) = args.country {
        config.country = country.clone();
    }

    if let Some(follow) = args.follow_profile_links {
        config.follow_profile_links = follow;
    }

    if let Some(limit) = args.sample_limit {
        config.sample_limit = limit;
    }

    if let Some(ref csv) = args.csv {
        config.csv_file = csv.clone();
    }

    if let Some(ref json) = args.json {
        config.json_file = json.clone();
    }

    if let Some(ref base) = args.base_search_url {
        config.base_search_url = base.clone();
    }

    if let Some(ref brand) = args.brand_suffix {
        config.brand_suffix = brand.clone();
    }

    if let Some(concurrency) = args.concurrency {
        config.max_concurrency = concurrency;
    }

    if args.headed {
        config.headless = false;
    }

    if let Some(timeout) = args.navigation_timeout {
        config.navigation_timeout = Duration::from_secs(timeout);
    }

    if let Some(timeout) = args.handler_timeout {
        config.handler_timeout = Duration::from_secs(timeout);
    }

    if let Some(ref agent) = args.user_agent {
        config.user_agent = agent.clone();
    }
}

fn validate_config(config: &mut Config) -> anyhow::Result<()> {
    Url::parse(&config.base_search_url)
        .with_context(|| format!("Invalid base search URL: {}", config.base_search_url))?;

    if config.start_page == 0 {
        config.start_page = 1;
        tracing::warn!("Start page was 0. Results pages are 1-based; setting to 1.");
    }

    if config.max_results_pages == 0 {
        config.max_results_pages = 1;
        tracing::warn!("Max results pages was 0. Setting to 1.");
    }

    if config.max_concurrency == 0 {
        config.max_concurrency = 1;
        tracing::warn!("Concurrency was set to 0. Setting to 1.");
    }

    if config.handler_timeout < config.navigation_timeout {
        config.handler_timeout = config.navigation_timeout;
        tracing::warn!(
            "Handler timeout was shorter than the navigation timeout. Setting both to {:?}",
            config.navigation_timeout
        );
    }

    Ok(())
}

pub(crate) fn build_config() -> anyhow::Result<Config> {
    let args = AppArgs::parse();

    let mut config = Config::default();

    if let Some(ref file_path) = args.config_file {
        match load_config_file(file_path) {
            Ok(file_config) => apply_file_config(&mut config, &file_config),
            Err(e) => {
                tracing::error!("Failed to load configuration file: {}", e);
            }
        }
    } else {
        for path in ["./agent-sleuth.toml", "./config.toml"].iter() {
            if Path::new(path).exists() {
                match load_config_file(path) {
                    Ok(file_config) => {
                        apply_file_config(&mut config, &file_config);
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load configuration from {}: {}", path, e);
                    }
                }
            }
        }
    }

    apply_cli_args(&mut config, &args);
    validate_config(&mut config)?;

    Ok(config)
}

pub(crate) static CONFIG: Lazy<Config> = Lazy::new(|| match build_config() {
    Ok(config) => config,
    Err(e) => {
        eprintln!("Failed to build configuration: {}", e);
        std::process::exit(1);
    }
});

/// Forces configuration loading so errors surface at startup, not mid-crawl.
pub(crate) fn load_config() -> anyhow::Result<()> {
    Lazy::force(&CONFIG);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_encodes_filters() {
        let config = Config::default();
        let url = config.search_url(3).unwrap();
        assert_eq!(url.host_str(), Some("www.exprealty.com"));
        assert_eq!(url.path(), "/agents-search");

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("page".to_string(), "3".to_string())));
        assert!(pairs.contains(&("m".to_string(), "f".to_string())));
        assert!(pairs.contains(&("location".to_string(), "Jacksonville, FL".to_string())));
        // The comma and space must be percent-encoded in the raw query.
        assert!(url.query().unwrap().contains("location=Jacksonville%2C+FL"));
    }

    #[test]
    fn test_last_results_page_budget() {
        let mut config = Config::default();
        config.start_page = 1;
        config.max_results_pages = 2;
        // Pages 1 and 2 are in budget, page 3 is not.
        assert_eq!(config.last_results_page(), 2);
    }

    #[test]
    fn test_sample_cap() {
        let mut config = Config::default();
        config.sample_limit = 0;
        assert_eq!(config.sample_cap(17), 17);
        config.sample_limit = 5;
        assert_eq!(config.sample_cap(17), 5);
        assert_eq!(config.sample_cap(3), 3);
    }
}
