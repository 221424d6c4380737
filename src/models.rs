//! Data models flowing through the pipeline.
//!
//! - [`RawItem`]: fields exactly as pulled out of a source's markup
//! - [`NewsItem`]: a normalized, display-ready record
//! - [`Feed`]: the ordered, capped, never-empty result of one run
//! - [`SourceReport`]: what happened to each source during the run

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// One article as extracted from a listing, before normalization.
///
/// Every `RawItem` handed out by the extractor has a non-empty `title`;
/// all other fields are absent when the markup did not provide them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_src: Option<String>,
    pub date_text: Option<String>,
    pub time_text: Option<String>,
    pub category_text: Option<String>,
}

/// A display-ready news item.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NewsItem {
    pub title: String,
    /// May be empty.
    pub description: String,
    /// Absolute URL, or the feed's placeholder image.
    pub image_url: String,
    /// Publication instant in the source region's local time.
    pub published_at: Option<DateTime<FixedOffset>>,
    /// Never empty, even when `published_at` is absent.
    pub display_time: String,
    pub source: String,
    pub category: String,
}

impl NewsItem {
    /// Ordering key: the publication instant, or `now` when unknown.
    pub fn sort_key(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.published_at
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(now)
    }
}

/// Outcome of scraping one source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceReport {
    pub id: String,
    /// Items the source contributed before the global sort and cutoff.
    pub items: usize,
    /// Set when the source failed and contributed nothing.
    pub error: Option<String>,
}

/// The ordered feed produced by one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Feed {
    pub generated_at: DateTime<Utc>,
    pub items: Vec<NewsItem>,
    pub sources: Vec<SourceReport>,
}

impl Feed {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(published_at: Option<DateTime<FixedOffset>>) -> NewsItem {
        NewsItem {
            title: "Test".to_string(),
            description: String::new(),
            image_url: "https://example.test/a.jpg".to_string(),
            published_at,
            display_time: "now".to_string(),
            source: "TEST".to_string(),
            category: "TEST".to_string(),
        }
    }

    #[test]
    fn test_sort_key_uses_instant() {
        let offset = FixedOffset::east_opt(3600).unwrap();
        let published = offset.with_ymd_and_hms(2025, 12, 22, 9, 2, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 12, 22, 12, 0, 0).unwrap();
        assert_eq!(
            item(Some(published)).sort_key(now),
            Utc.with_ymd_and_hms(2025, 12, 22, 8, 2, 0).unwrap()
        );
    }

    #[test]
    fn test_sort_key_defaults_to_now() {
        let now = Utc.with_ymd_and_hms(2025, 12, 22, 12, 0, 0).unwrap();
        assert_eq!(item(None).sort_key(now), now);
    }

    #[test]
    fn test_feed_serialization() {
        let now = Utc.with_ymd_and_hms(2025, 12, 22, 12, 0, 0).unwrap();
        let feed = Feed {
            generated_at: now,
            items: vec![item(None)],
            sources: vec![SourceReport {
                id: "istrain".to_string(),
                items: 1,
                error: None,
            }],
        };

        let json = serde_json::to_string(&feed).unwrap();
        assert!(json.contains("\"display_time\":\"now\""));
        assert!(json.contains("istrain"));

        let back: Feed = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 1);
        assert!(!back.is_empty());
    }
}
