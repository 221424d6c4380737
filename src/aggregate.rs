//! Multi-source aggregation into a single feed.
//!
//! Sources are processed one after another in configuration order. A
//! source that cannot be fetched or read contributes nothing and is noted in
//! the feed's [`SourceReport`]s; it never stops the run. The merged items
//! are ordered freshest first, with undated items treated as published
//! `now`, deduplicated by title, and cut to the feed length. An empty result
//! is replaced by a single placeholder item so there is always something to
//! show.

use crate::config::{FeedConfig, SourceConfig};
use crate::error::SourceError;
use crate::fetch::FetchMarkup;
use crate::models::{Feed, NewsItem, SourceReport};
use crate::normalize::{NormalizeContext, normalize};
use crate::scrapers::extract;
use crate::utils::{title_key, truncate_for_log};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use tracing::{debug, info, instrument, warn};

/// Display label of the placeholder slide.
pub const PLACEHOLDER_DISPLAY_TIME: &str = "--.--. --:--";

/// Run the whole pipeline for every configured source.
///
/// # Arguments
///
/// * `fetcher` - Where listing markup comes from
/// * `config` - The feed configuration; sources are scraped in order
/// * `now` - Reference instant for sorting undated items and for labels
///
/// # Returns
///
/// A non-empty `Feed`. Failed sources contribute no items and are recorded
/// in `Feed::sources`; if nothing was scraped the feed holds one placeholder.
#[instrument(level = "info", skip_all, fields(town = %config.town, sources = config.sources.len()))]
pub async fn aggregate<F: FetchMarkup>(fetcher: &F, config: &FeedConfig, now: DateTime<Utc>) -> Feed {
    let mut batches = Vec::with_capacity(config.sources.len());
    let mut reports = Vec::with_capacity(config.sources.len());

    for source in &config.sources {
        let ctx = NormalizeContext::for_source(config, source);
        match scrape_source(fetcher, source, &ctx, now).await {
            Ok(items) => {
                info!(source = %source.id, count = items.len(), "Source scraped");
                reports.push(SourceReport {
                    id: source.id.clone(),
                    items: items.len(),
                    error: None,
                });
                batches.push(items);
            }
            Err(e) => {
                warn!(source = %source.id, error = %e, "Source failed; contributing no items");
                reports.push(SourceReport {
                    id: source.id.clone(),
                    items: 0,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    let mut feed = build_feed(batches, config, now);
    feed.sources = reports;
    feed
}

/// Fetch, extract and normalize a single source.
#[instrument(level = "info", skip_all, fields(source = %source.id, url = %source.listing_url))]
pub async fn scrape_source<F: FetchMarkup>(
    fetcher: &F,
    source: &SourceConfig,
    ctx: &NormalizeContext,
    now: DateTime<Utc>,
) -> Result<Vec<NewsItem>, SourceError> {
    let markup = fetcher.fetch(&source.listing_url).await?;
    debug!(preview = %truncate_for_log(&markup, 200), "Listing markup");

    let raw_items = extract(&markup, source)?;
    Ok(raw_items
        .iter()
        .map(|raw| normalize(raw, source, ctx, now))
        .collect())
}

/// Merge per-source items into the final feed.
///
/// Pure: the order of the result depends only on the items' timestamps and,
/// for ties, on the order of `batches`.
pub fn build_feed(batches: Vec<Vec<NewsItem>>, config: &FeedConfig, now: DateTime<Utc>) -> Feed {
    let mut items: Vec<NewsItem> = batches.into_iter().flatten().collect();
    let total = items.len();

    // Stable, so ties keep source order.
    items.sort_by(|a, b| b.sort_key(now).cmp(&a.sort_key(now)));

    let mut items: Vec<NewsItem> = items
        .into_iter()
        .unique_by(|item| title_key(&item.title))
        .take(config.max_items)
        .collect();

    if items.is_empty() {
        info!("No items from any source; showing placeholder");
        items.push(placeholder_item(config));
    } else {
        debug!(total, kept = items.len(), "Feed assembled");
    }

    Feed {
        generated_at: now,
        items,
        sources: Vec::new(),
    }
}

/// The single item shown when nothing could be scraped.
pub fn placeholder_item(config: &FeedConfig) -> NewsItem {
    let label = config.label();
    NewsItem {
        title: config.loading_title(),
        description: config.loading_message(),
        image_url: config.placeholder_image(),
        published_at: None,
        display_time: PLACEHOLDER_DISPLAY_TIME.to_string(),
        source: label.clone(),
        category: label,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{self, FieldSelector, FieldSelectors, Locale};
    use chrono::TimeZone;
    use chrono_tz::Europe::Zagreb;
    use std::collections::HashMap;

    /// Serves canned markup per URL; anything else times out.
    struct FakeFetcher {
        pages: HashMap<String, String>,
    }

    impl FakeFetcher {
        fn new(pages: &[(&str, String)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.clone()))
                    .collect(),
            }
        }
    }

    impl FetchMarkup for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<String, SourceError> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| SourceError::Timeout {
                    url: url.to_string(),
                })
        }
    }

    fn zagreb(d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Zagreb
            .with_ymd_and_hms(2025, 12, d, h, min, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn source(id: &str) -> SourceConfig {
        SourceConfig {
            id: id.to_string(),
            label: None,
            listing_url: format!("https://{id}.test/news"),
            base_url: format!("https://{id}.test"),
            item_selector: "article".to_string(),
            fields: FieldSelectors {
                title: FieldSelector::Text("h2".to_string()),
                description: Some(FieldSelector::Text("p".to_string())),
                image: Some(FieldSelector::Text("img".to_string())),
                date: Some(FieldSelector::Text(".date".to_string())),
                time: Some(FieldSelector::Text(".time".to_string())),
                category: None,
            },
            max_items: 10,
            display: Default::default(),
            image_rewrites: vec![],
            timezone: None,
        }
    }

    fn feed_config(sources: Vec<SourceConfig>, max_items: usize) -> FeedConfig {
        let mut config = config::default_config().unwrap();
        config.locale = Locale::En;
        config.max_items = max_items;
        config.sources = sources;
        config
    }

    fn article(title: &str, date: &str, time: &str) -> String {
        format!(
            r#"<article><img src="/img/{n}.jpg"><h2>{title}</h2><p>About {title}</p><span class="date">{date}</span><span class="time">{time}</span></article>"#,
            n = title.len()
        )
    }

    fn page(articles: &[String]) -> String {
        format!("<html><body>{}</body></html>", articles.concat())
    }

    fn item(title: &str, published_at: Option<DateTime<Utc>>) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            description: String::new(),
            image_url: "https://example.test/a.jpg".to_string(),
            published_at: published_at.map(|dt| dt.with_timezone(&Zagreb).fixed_offset()),
            display_time: "x".to_string(),
            source: "A".to_string(),
            category: "A".to_string(),
        }
    }

    fn assert_non_increasing(feed: &Feed, now: DateTime<Utc>) {
        for pair in feed.items.windows(2) {
            assert!(pair[0].sort_key(now) >= pair[1].sort_key(now));
        }
    }

    #[tokio::test]
    async fn test_all_sources_failing_yields_placeholder() {
        let config = feed_config(vec![source("a"), source("b")], 10);
        let fetcher = FakeFetcher::new(&[]);
        let now = zagreb(22, 12, 0);

        let feed = aggregate(&fetcher, &config, now).await;

        assert_eq!(feed.len(), 1);
        assert_eq!(feed.items[0], placeholder_item(&config));
        assert_eq!(feed.items[0].display_time, PLACEHOLDER_DISPLAY_TIME);
        assert!(feed.sources.iter().all(|r| r.error.is_some() && r.items == 0));
    }

    #[tokio::test]
    async fn test_one_source_times_out() {
        let config = feed_config(vec![source("a"), source("b")], 10);
        let fetcher = FakeFetcher::new(&[(
            "https://a.test/news",
            page(&[
                article("Older", "22.12.2025", "08:00"),
                article("Newest", "22.12.2025", "11:30"),
                article("Middle", "22.12.2025", "10:15"),
            ]),
        )]);
        let now = zagreb(22, 12, 0);

        let feed = aggregate(&fetcher, &config, now).await;

        let titles: Vec<&str> = feed.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["Newest", "Middle", "Older"]);
        assert!(feed.items.iter().all(|i| i.source == "A"));
        assert_eq!(feed.items[0].display_time, "30 minutes ago");
        assert_eq!(feed.items[0].image_url, "https://a.test/img/6.jpg");
        assert_eq!(feed.sources[0].items, 3);
        assert!(feed.sources[1].error.as_deref().is_some_and(|e| e.contains("timed out")));
        assert_non_increasing(&feed, now);
    }

    #[tokio::test]
    async fn test_titleless_items_never_reach_feed() {
        let config = feed_config(vec![source("a")], 10);
        let fetcher = FakeFetcher::new(&[(
            "https://a.test/news",
            page(&[
                article("", "22.12.2025", "11:00"),
                article("Kept", "22.12.2025", "10:00"),
            ]),
        )]);

        let feed = aggregate(&fetcher, &config, zagreb(22, 12, 0)).await;
        assert_eq!(feed.len(), 1);
        assert_eq!(feed.items[0].title, "Kept");
    }

    #[tokio::test]
    async fn test_broken_item_selector_isolated_to_source() {
        let mut broken = source("b");
        broken.item_selector = "article[".to_string();
        let config = feed_config(vec![source("a"), broken], 10);
        let body = page(&[article("Works", "22.12.2025", "10:00")]);
        let fetcher = FakeFetcher::new(&[
            ("https://a.test/news", body.clone()),
            ("https://b.test/news", body),
        ]);

        let feed = aggregate(&fetcher, &config, zagreb(22, 12, 0)).await;
        assert_eq!(feed.len(), 1);
        assert_eq!(feed.items[0].title, "Works");
        assert!(feed.sources[1].error.is_some());
    }

    #[test]
    fn test_undated_items_sort_as_now() {
        let config = feed_config(vec![source("a")], 10);
        let now = zagreb(22, 12, 0);
        let feed = build_feed(
            vec![
                vec![item("Past", Some(zagreb(22, 11, 0)))],
                vec![item("Undated", None), item("Future", Some(zagreb(22, 13, 0)))],
            ],
            &config,
            now,
        );

        let titles: Vec<&str> = feed.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["Future", "Undated", "Past"]);
    }

    #[test]
    fn test_cutoff_applies_after_merge() {
        let config = feed_config(vec![source("a"), source("b")], 3);
        let now = zagreb(22, 12, 0);
        let a = (0..5)
            .map(|i| item(&format!("A{i}"), Some(zagreb(20, 8 + i, 0))))
            .collect();
        let b = (0..5)
            .map(|i| item(&format!("B{i}"), Some(zagreb(21, 8 + i, 0))))
            .collect();

        let feed = build_feed(vec![a, b], &config, now);
        let titles: Vec<&str> = feed.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["B4", "B3", "B2"]);
        assert_non_increasing(&feed, now);
    }

    #[test]
    fn test_duplicate_titles_keep_freshest() {
        let config = feed_config(vec![source("a")], 10);
        let now = zagreb(22, 12, 0);
        let mut older = item("Nova  cesta otvorena", Some(zagreb(22, 8, 0)));
        older.source = "B".to_string();
        let newer = item("nova cesta otvorena", Some(zagreb(22, 9, 0)));

        let feed = build_feed(vec![vec![older], vec![newer]], &config, now);
        assert_eq!(feed.len(), 1);
        assert_eq!(feed.items[0].source, "A");
    }

    #[test]
    fn test_empty_batches_yield_placeholder() {
        let config = feed_config(vec![source("a")], 10);
        let feed = build_feed(vec![vec![], vec![]], &config, zagreb(22, 12, 0));
        assert_eq!(feed.len(), 1);
        assert_eq!(feed.items[0].title, "Loading news...");
        assert_eq!(feed.items[0].source, "UMAG");
        assert!(feed.items[0].image_url.starts_with("https://placehold.co/"));
    }
}
