//! Feed and source configuration.
//!
//! The whole pipeline is driven by data: each news source is a
//! [`SourceConfig`] naming its listing URL, the CSS selector that locates
//! article containers, and per-field sub-selectors. Adding a source means
//! adding a YAML entry, never a new code path.
//!
//! Configuration is read once per run, either from a YAML file given on the
//! command line or from the built-in Umag configuration
//! (`config/umag.yaml`).

use crate::error::ConfigError;
use chrono_tz::Tz;
use itertools::Itertools;
use regex::Regex;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

/// Built-in configuration used when no `--config` is given.
const DEFAULT_CONFIG_YAML: &str = include_str!("../config/umag.yaml");

/// Browser-identifying user agent sent with every listing request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

/// Longest accepted slide rotation interval (one hour).
pub const MAX_SLIDE_INTERVAL_SECS: u64 = 3_600;
/// Longest accepted page reload interval (one day).
pub const MAX_RELOAD_INTERVAL_SECS: u64 = 86_400;

/// How the display-time label of a source's items is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayPolicy {
    /// "N minutes ago" / "N hours ago", absolute after one day.
    #[default]
    Relative,
    /// Always `dd.mm. HH:MM`.
    Absolute,
}

/// Language of the generated labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    De,
}

/// Where a single logical field lives inside an item container.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FieldSelector {
    /// Read the text of the first element matching this CSS selector.
    Text(String),
    /// Read attribute `attr` of the first element matching `css`.
    Attr { css: String, attr: String },
}

impl FieldSelector {
    pub fn css(&self) -> &str {
        match self {
            FieldSelector::Text(css) => css,
            FieldSelector::Attr { css, .. } => css,
        }
    }
}

/// Sub-selectors for each logical field of an item.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FieldSelectors {
    pub title: FieldSelector,
    #[serde(default)]
    pub description: Option<FieldSelector>,
    #[serde(default)]
    pub image: Option<FieldSelector>,
    #[serde(default)]
    pub date: Option<FieldSelector>,
    #[serde(default)]
    pub time: Option<FieldSelector>,
    #[serde(default)]
    pub category: Option<FieldSelector>,
}

impl FieldSelectors {
    fn all(&self) -> impl Iterator<Item = (&'static str, &FieldSelector)> {
        std::iter::once(("title", &self.title)).chain(
            [
                ("description", &self.description),
                ("image", &self.image),
                ("date", &self.date),
                ("time", &self.time),
                ("category", &self.category),
            ]
            .into_iter()
            .filter_map(|(name, sel)| sel.as_ref().map(|s| (name, s))),
        )
    }
}

/// A known-CDN rewrite from a low-resolution image URL to a larger variant.
///
/// A rewrite only applies when `matches` occurs somewhere in the URL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ImageRewrite {
    /// Regex substitution, e.g. a thumbnail path segment to a large one.
    Replace {
        matches: String,
        pattern: String,
        replacement: String,
    },
    /// Drop the query string and append explicit sizing parameters.
    Query { matches: String, params: String },
}

/// One scrapeable news listing.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SourceConfig {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    pub listing_url: String,
    pub base_url: String,
    pub item_selector: String,
    pub fields: FieldSelectors,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    #[serde(default)]
    pub display: DisplayPolicy,
    #[serde(default)]
    pub image_rewrites: Vec<ImageRewrite>,
    #[serde(default)]
    pub timezone: Option<Tz>,
}

impl SourceConfig {
    /// Badge label for this source; the upper-cased id when none is set.
    pub fn label(&self) -> String {
        self.label
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| self.id.to_uppercase())
    }
}

/// HTTP request settings shared by all sources.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Settings for the generated slideshow page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RenderConfig {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default = "default_slide_interval_secs")]
    pub slide_interval_secs: u64,
    #[serde(default = "default_reload_interval_secs")]
    pub reload_interval_secs: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            title: None,
            lang: default_lang(),
            slide_interval_secs: default_slide_interval_secs(),
            reload_interval_secs: default_reload_interval_secs(),
        }
    }
}

/// Top-level configuration: one town, its sources, and output settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FeedConfig {
    pub town: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub locale: Locale,
    #[serde(default = "default_timezone")]
    pub timezone: Tz,
    /// Maximum length of the final feed, applied after merging all sources.
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    #[serde(default)]
    pub placeholder_image: Option<String>,
    #[serde(default)]
    pub fallback_label: Option<String>,
    #[serde(default)]
    pub loading_title: Option<String>,
    #[serde(default)]
    pub loading_message: Option<String>,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub render: RenderConfig,
    pub sources: Vec<SourceConfig>,
}

impl FeedConfig {
    /// Label shown on the placeholder slide; the upper-cased town otherwise.
    pub fn label(&self) -> String {
        self.label
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| self.town.to_uppercase())
    }

    pub fn placeholder_image(&self) -> String {
        self.placeholder_image.clone().unwrap_or_else(|| {
            format!(
                "https://placehold.co/1200x630/003366/FFFFFF?text={}",
                urlencoding::encode(&self.label())
            )
        })
    }

    /// Display-time label for items without a parseable timestamp.
    pub fn fallback_label(&self) -> String {
        self.fallback_label
            .clone()
            .unwrap_or_else(|| match self.locale {
                Locale::En => "now".to_string(),
                Locale::De => "AKTUELL".to_string(),
            })
    }

    pub fn loading_title(&self) -> String {
        self.loading_title
            .clone()
            .unwrap_or_else(|| match self.locale {
                Locale::En => "Loading news...".to_string(),
                Locale::De => "Lade Nachrichten...".to_string(),
            })
    }

    pub fn loading_message(&self) -> String {
        self.loading_message
            .clone()
            .unwrap_or_else(|| match self.locale {
                Locale::En => format!("Looking for current reports for {}.", self.town),
                Locale::De => format!("Suche nach aktuellen Meldungen für {}.", self.town),
            })
    }

    pub fn page_title(&self) -> String {
        self.render
            .title
            .clone()
            .unwrap_or_else(|| format!("{} News", self.town))
    }

    /// Timezone used to interpret a source's local date/time text.
    pub fn timezone_for(&self, source: &SourceConfig) -> Tz {
        source.timezone.unwrap_or(self.timezone)
    }

    /// Check everything that would otherwise only fail at scrape time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.town.trim().is_empty() {
            return invalid("town must not be empty".to_string());
        }
        if self.max_items == 0 {
            return invalid("max_items must be positive".to_string());
        }
        if self.sources.is_empty() {
            return invalid("at least one source is required".to_string());
        }
        if self.http.timeout_secs == 0 {
            return invalid("http.timeout_secs must be positive".to_string());
        }
        if self.render.slide_interval_secs == 0 || self.render.reload_interval_secs == 0 {
            return invalid("render intervals must be positive".to_string());
        }
        if self.render.slide_interval_secs > MAX_SLIDE_INTERVAL_SECS {
            return invalid(format!(
                "render.slide_interval_secs must be at most {MAX_SLIDE_INTERVAL_SECS}"
            ));
        }
        if self.render.reload_interval_secs > MAX_RELOAD_INTERVAL_SECS {
            return invalid(format!(
                "render.reload_interval_secs must be at most {MAX_RELOAD_INTERVAL_SECS}"
            ));
        }
        if let Some(dup) = self.sources.iter().map(|s| &s.id).duplicates().next() {
            return invalid(format!("duplicate source id {dup:?}"));
        }

        for source in &self.sources {
            validate_source(source)?;
        }
        Ok(())
    }
}

fn validate_source(source: &SourceConfig) -> Result<(), ConfigError> {
    let invalid = |msg: String| Err(ConfigError::Invalid(format!("source {}: {msg}", source.id)));

    if source.id.trim().is_empty() {
        return Err(ConfigError::Invalid("source id must not be empty".to_string()));
    }
    if source.max_items == 0 {
        return invalid("max_items must be positive".to_string());
    }
    for (name, value) in [("listing_url", &source.listing_url), ("base_url", &source.base_url)] {
        if let Err(e) = Url::parse(value) {
            return invalid(format!("{name} {value:?} is not a valid URL: {e}"));
        }
    }
    if let Err(e) = Selector::parse(&source.item_selector) {
        return invalid(format!("item_selector {:?}: {e}", source.item_selector));
    }
    for (name, sel) in source.fields.all() {
        if let Err(e) = Selector::parse(sel.css()) {
            return invalid(format!("{name} selector {:?}: {e}", sel.css()));
        }
    }
    for rewrite in &source.image_rewrites {
        if let ImageRewrite::Replace { pattern, .. } = rewrite {
            if let Err(e) = Regex::new(pattern) {
                return invalid(format!("image rewrite pattern {pattern:?}: {e}"));
            }
        }
    }
    Ok(())
}

/// Parse and validate a YAML configuration document.
pub fn from_yaml_str(yaml: &str) -> Result<FeedConfig, ConfigError> {
    let config: FeedConfig = serde_yaml::from_str(yaml)?;
    config.validate()?;
    Ok(config)
}

/// Load the configuration from `path`.
#[instrument(level = "info")]
pub async fn load_config(path: &str) -> Result<FeedConfig, ConfigError> {
    let yaml = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
    let config = from_yaml_str(&yaml)?;
    debug!(sources = config.sources.len(), town = %config.town, "Loaded configuration");
    Ok(config)
}

/// The built-in Umag configuration.
pub fn default_config() -> Result<FeedConfig, ConfigError> {
    from_yaml_str(DEFAULT_CONFIG_YAML)
}

fn default_max_items() -> usize {
    10
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_lang() -> String {
    "en".to_string()
}

fn default_slide_interval_secs() -> u64 {
    15
}

fn default_reload_interval_secs() -> u64 {
    3600
}

fn default_timezone() -> Tz {
    chrono_tz::Europe::Zagreb
}
