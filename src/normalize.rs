//! Field normalization: raw extracted strings to display-ready items.
//!
//! Everything here is a pure function of its inputs, including the
//! caller-supplied `now`, so normalizing the same [`RawItem`] twice yields
//! the same [`NewsItem`].
//!
//! # Timestamps
//!
//! Listing pages publish dates as `22.12.2025` plus `09:02`, sometimes in
//! one field, sometimes with a trailing dot or filler (`22.12.2025. u 09:02h`),
//! sometimes as a relative day word (`danas 09:02`, `gestern, 18:15`), and
//! sometimes as an RFC 3339 `datetime` attribute. All of these are
//! interpreted in the source region's timezone. Anything else leaves the
//! item undated; it is never an error.

use crate::config::{DisplayPolicy, FeedConfig, ImageRewrite, Locale, SourceConfig};
use crate::models::{NewsItem, RawItem};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{debug, warn};

static ABSOLUTE_DATE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,2})\.\s*(\d{1,2})\.\s*(\d{4})\.?(?:\s*,)?\s*(?:(?:u|um|at)\s+)?(\d{1,2}):(\d{2})h?\b",
    )
    .unwrap()
});

static RELATIVE_DAY_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(today|danas|heute|oggi|yesterday|jučer|jucer|gestern|ieri)\b(?:\s*,)?\s*(?:(?:u|um|at|alle)\s+)?(\d{1,2}):(\d{2})h?\b",
    )
    .unwrap()
});

/// An [`ImageRewrite`] with its pattern compiled.
#[derive(Debug, Clone)]
pub enum CompiledRewrite {
    Replace {
        matches: String,
        regex: Regex,
        replacement: String,
    },
    Query {
        matches: String,
        params: String,
    },
}

/// Compile a source's rewrites once. Invalid patterns are skipped, which
/// leaves matching URLs unchanged.
pub fn compile_rewrites(rewrites: &[ImageRewrite]) -> Vec<CompiledRewrite> {
    rewrites
        .iter()
        .filter_map(|rewrite| match rewrite {
            ImageRewrite::Replace {
                matches,
                pattern,
                replacement,
            } => match Regex::new(pattern) {
                Ok(regex) => Some(CompiledRewrite::Replace {
                    matches: matches.clone(),
                    regex,
                    replacement: replacement.clone(),
                }),
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "Skipping invalid image rewrite");
                    None
                }
            },
            ImageRewrite::Query { matches, params } => Some(CompiledRewrite::Query {
                matches: matches.clone(),
                params: params.clone(),
            }),
        })
        .collect()
}

/// Feed-level settings the normalizer needs for one source.
#[derive(Debug, Clone)]
pub struct NormalizeContext {
    pub timezone: Tz,
    pub locale: Locale,
    pub placeholder_image: String,
    pub fallback_label: String,
    pub rewrites: Vec<CompiledRewrite>,
}

impl NormalizeContext {
    pub fn for_source(feed: &FeedConfig, source: &SourceConfig) -> Self {
        Self {
            timezone: feed.timezone_for(source),
            locale: feed.locale,
            placeholder_image: feed.placeholder_image(),
            fallback_label: feed.fallback_label(),
            rewrites: compile_rewrites(&source.image_rewrites),
        }
    }
}

/// Turn one extracted item into a display-ready [`NewsItem`].
///
/// # Arguments
///
/// * `raw` - An item as pulled from the listing markup
/// * `config` - The source it came from (label and display policy)
/// * `ctx` - Feed settings for this source, built with [`NormalizeContext::for_source`]
/// * `now` - Reference instant for relative labels and day words
///
/// # Returns
///
/// A `NewsItem` with trimmed text, a rewritten or placeholder image URL,
/// the parsed local instant if any, and a non-empty display label.
pub fn normalize(
    raw: &RawItem,
    config: &SourceConfig,
    ctx: &NormalizeContext,
    now: DateTime<Utc>,
) -> NewsItem {
    let label = config.label();

    let image_url = raw
        .image_src
        .as_deref()
        .map(str::trim)
        .filter(|src| !src.is_empty())
        .map(|src| rewrite_image_url(src, &ctx.rewrites))
        .unwrap_or_else(|| ctx.placeholder_image.clone());

    let published_at = parse_published(
        raw.date_text.as_deref(),
        raw.time_text.as_deref(),
        ctx.timezone,
        now,
    );
    if published_at.is_none() && (raw.date_text.is_some() || raw.time_text.is_some()) {
        debug!(
            source = %config.id,
            date = ?raw.date_text,
            time = ?raw.time_text,
            "Unparseable timestamp; item left undated"
        );
    }

    let display_time = display_label(
        published_at,
        now,
        config.display,
        ctx.locale,
        &ctx.fallback_label,
    );

    let category = raw
        .category_text
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| label.clone());

    NewsItem {
        title: trimmed(raw.title.as_deref()),
        description: trimmed(raw.description.as_deref()),
        image_url,
        published_at,
        display_time,
        source: label,
        category,
    }
}

fn trimmed(s: Option<&str>) -> String {
    s.map(str::trim).unwrap_or_default().to_string()
}

/// Apply every matching known-CDN rewrite, in configuration order.
pub fn rewrite_image_url(url: &str, rewrites: &[CompiledRewrite]) -> String {
    rewrites
        .iter()
        .fold(url.to_string(), |url, rewrite| match rewrite {
            CompiledRewrite::Replace {
                matches,
                regex,
                replacement,
            } if url.contains(matches.as_str()) => {
                regex.replace(&url, replacement.as_str()).into_owned()
            }
            CompiledRewrite::Query { matches, params } if url.contains(matches.as_str()) => {
                let base = url.split(['?', '#']).next().unwrap_or_default();
                format!("{base}?{}", params.trim_start_matches('?'))
            }
            _ => url,
        })
}

/// Parse a source's date and time text into a local instant.
///
/// `date` and `time` are joined with a space, so either may carry both
/// parts. Returns `None` for anything that does not name a real local
/// time in `tz`.
pub fn parse_published(
    date: Option<&str>,
    time: Option<&str>,
    tz: Tz,
    now: DateTime<Utc>,
) -> Option<DateTime<FixedOffset>> {
    let parts: Vec<&str> = [date, time]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if parts.is_empty() {
        return None;
    }

    if let Some(dt) = parts
        .iter()
        .find_map(|p| DateTime::parse_from_rfc3339(p).ok())
    {
        return Some(dt.with_timezone(&tz).fixed_offset());
    }

    let text = parts.join(" ");
    let (day, time) = if let Some(caps) = ABSOLUTE_DATE_TIME.captures(&text) {
        let day = NaiveDate::from_ymd_opt(
            capture(&caps, 3)?,
            capture(&caps, 2)?,
            capture(&caps, 1)?,
        )?;
        (day, hour_minute(&caps, 4)?)
    } else if let Some(caps) = RELATIVE_DAY_TIME.captures(&text) {
        let today = now.with_timezone(&tz).date_naive();
        let word = caps.get(1)?.as_str().to_lowercase();
        let day = match word.as_str() {
            "today" | "danas" | "heute" | "oggi" => today,
            _ => today - Duration::days(1),
        };
        (day, hour_minute(&caps, 2)?)
    } else {
        return None;
    };

    tz.from_local_datetime(&day.and_time(time))
        .earliest()
        .map(|dt| dt.fixed_offset())
}

fn capture<T: std::str::FromStr>(caps: &Captures<'_>, i: usize) -> Option<T> {
    caps.get(i)?.as_str().parse().ok()
}

fn hour_minute(caps: &Captures<'_>, first: usize) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(capture(caps, first)?, capture(caps, first + 1)?, 0)
}

/// Derive the display-time label for an item.
pub fn display_label(
    published_at: Option<DateTime<FixedOffset>>,
    now: DateTime<Utc>,
    policy: DisplayPolicy,
    locale: Locale,
    fallback: &str,
) -> String {
    let Some(published) = published_at else {
        return fallback.to_string();
    };
    if policy == DisplayPolicy::Absolute {
        return absolute_label(&published);
    }

    let elapsed = now
        .signed_duration_since(published.with_timezone(&Utc))
        .num_seconds();
    if elapsed <= 0 {
        just_now(locale).to_string()
    } else if elapsed < 3600 {
        minutes_ago(locale, (elapsed / 60).max(1))
    } else if elapsed < 24 * 3600 {
        hours_ago(locale, elapsed / 3600)
    } else {
        absolute_label(&published)
    }
}

/// `dd.mm. HH:MM` in the item's own local time.
pub fn absolute_label(published: &DateTime<FixedOffset>) -> String {
    published.format("%d.%m. %H:%M").to_string()
}

fn just_now(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "just now",
        Locale::De => "gerade eben",
    }
}

fn minutes_ago(locale: Locale, n: i64) -> String {
    match (locale, n) {
        (Locale::En, 1) => "1 minute ago".to_string(),
        (Locale::En, n) => format!("{n} minutes ago"),
        (Locale::De, 1) => "vor 1 Minute".to_string(),
        (Locale::De, n) => format!("vor {n} Minuten"),
    }
}

fn hours_ago(locale: Locale, n: i64) -> String {
    match (locale, n) {
        (Locale::En, 1) => "1 hour ago".to_string(),
        (Locale::En, n) => format!("{n} hours ago"),
        (Locale::De, 1) => "vor 1 Stunde".to_string(),
        (Locale::De, n) => format!("vor {n} Stunden"),
    }
}
