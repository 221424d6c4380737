//! # Town News Slides
//!
//! Scrapes the news listings of a single town and renders them as a
//! self-rotating, self-refreshing full-screen HTML slideshow, e.g. for a
//! lobby or shop-window display.
//!
//! ## Usage
//!
//! ```sh
//! town_news_slides -o /var/www/news/index.html
//! ```
//!
//! Run it from cron; the page reloads itself and picks up the new file.
//!
//! ## Architecture
//!
//! One run is a single pass:
//! 1. **Fetching**: one GET per configured source, with a fixed timeout
//! 2. **Extraction**: selector-driven field pulls from each listing
//! 3. **Normalization**: absolute image URLs, parsed timestamps, time labels
//! 4. **Aggregation**: freshest first, deduplicated, capped, never empty
//! 5. **Output**: slideshow HTML, optionally the feed as JSON

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregate;
mod cli;
mod config;
mod error;
mod fetch;
mod models;
mod normalize;
mod outputs;
mod scrapers;
mod utils;

use aggregate::aggregate;
use cli::Cli;
use fetch::HttpFetcher;
use outputs::{html, json};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("town_news_slides starting up");

    let args = Cli::parse();
    debug!(?args.config, ?args.output, ?args.json_output, "Parsed CLI arguments");

    // ---- Configuration ----
    let config = match &args.config {
        Some(path) => config::load_config(path).await,
        None => config::default_config(),
    }
    .inspect_err(|e| error!(error = %e, "Configuration rejected"))?;
    info!(
        town = %config.town,
        sources = config.sources.len(),
        max_items = config.max_items,
        "Loaded configuration"
    );

    // ---- Scrape ----
    let fetcher = HttpFetcher::from_config(&config.http)?;
    let now = Utc::now();
    let feed = aggregate(&fetcher, &config, now).await;

    let failed = feed.sources.iter().filter(|r| r.error.is_some()).count();
    info!(
        items = feed.len(),
        sources_ok = feed.sources.len() - failed,
        sources_failed = failed,
        "Feed built"
    );

    // ---- Output ----
    let page = html::render_slideshow(&feed, &config);
    if let Err(e) = html::write_slideshow(&page, &args.output).await {
        error!(path = %args.output.display(), error = %e, "Failed writing slideshow");
        return Err(e);
    }

    if let Some(path) = &args.json_output {
        if let Err(e) = json::write_feed(&feed, path).await {
            error!(path = %path.display(), error = %e, "Failed writing feed JSON");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
