use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod browser;
mod config;
mod crawler;
mod discovery;
mod error;
mod export;
mod extract;
mod fallback;
mod models;
mod names;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    config::load_config()?;
    let config = &*config::CONFIG;

    info!(
        "Crawling {} for \"{}\" ({}), pages {}-{}, {} worker(s)",
        config.base_search_url,
        config.location,
        config.country,
        config.start_page,
        config.last_results_page(),
        config.max_concurrency
    );
    if !config.follow_profile_links {
        info!("Deep profile visits disabled; only link discovery will run");
    }

    let browser = browser::BrowserHandle::launch().await?;
    let crawler = crawler::Crawler::new(browser);
    let records = crawler.run().await?;
    crawler.shutdown().await;

    let deduped = models::dedupe_records(records);
    if deduped.is_empty() {
        warn!("Run completed with no contacts collected");
    }

    export::write_csv(&deduped, &config.csv_file)?;
    export::write_json(&deduped, &config.json_file)?;
    info!("Saved {} contacts to {}", deduped.len(), config.csv_file);

    Ok(())
}
