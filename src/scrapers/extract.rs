//! Generic, selector-driven field extraction.

use crate::config::{FieldSelector, SourceConfig};
use crate::error::SourceError;
use crate::models::RawItem;
use itertools::Itertools;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, warn};

/// Attributes tried, in order, when an image field names only a selector.
const IMAGE_ATTRS: [&str; 2] = ["src", "data-src"];

/// Extract raw items from one source's listing markup.
///
/// # Arguments
///
/// * `markup` - The listing page body
/// * `config` - Selectors, cutoff and base URL of the source
///
/// # Returns
///
/// At most `config.max_items` items, each with a non-empty title, in page
/// order. `Ok(vec![])` when no container matches.
///
/// # Errors
///
/// `SourceError::Selector` when the item selector itself is unusable.
#[instrument(level = "debug", skip_all, fields(source = %config.id))]
pub fn extract(markup: &str, config: &SourceConfig) -> Result<Vec<RawItem>, SourceError> {
    let item_selector =
        Selector::parse(&config.item_selector).map_err(|e| SourceError::Selector {
            selector: config.item_selector.clone(),
            msg: e.to_string(),
        })?;

    let document = Html::parse_document(markup);
    let fields = CompiledFields::new(config);

    let mut candidates = 0usize;
    let items: Vec<RawItem> = document
        .select(&item_selector)
        .take(config.max_items)
        .inspect(|_| candidates += 1)
        .filter_map(|element| {
            let item = fields.pull(element, &config.base_url);
            if item.is_none() {
                debug!("Dropping candidate without title");
            }
            item
        })
        .collect();

    debug!(candidates, count = items.len(), "Extracted items");
    Ok(items)
}

/// A field selector parsed once per source.
struct CompiledField {
    selector: Selector,
    attr: Option<String>,
}

struct CompiledFields {
    title: Option<CompiledField>,
    description: Option<CompiledField>,
    image: Option<CompiledField>,
    date: Option<CompiledField>,
    time: Option<CompiledField>,
    category: Option<CompiledField>,
}

impl CompiledFields {
    fn new(config: &SourceConfig) -> Self {
        let f = &config.fields;
        Self {
            title: compile(&config.id, "title", Some(&f.title)),
            description: compile(&config.id, "description", f.description.as_ref()),
            image: compile(&config.id, "image", f.image.as_ref()),
            date: compile(&config.id, "date", f.date.as_ref()),
            time: compile(&config.id, "time", f.time.as_ref()),
            category: compile(&config.id, "category", f.category.as_ref()),
        }
    }

    /// Pull every field from one container; `None` when it has no title.
    fn pull(&self, element: ElementRef<'_>, base_url: &str) -> Option<RawItem> {
        let title = read_field(element, self.title.as_ref())?;
        let image_src = read_image(element, self.image.as_ref())
            .map(|src| resolve_image_src(&src, base_url));

        Some(RawItem {
            title: Some(title),
            description: read_field(element, self.description.as_ref()),
            image_src,
            date_text: read_field(element, self.date.as_ref()),
            time_text: read_field(element, self.time.as_ref()),
            category_text: read_field(element, self.category.as_ref()),
        })
    }
}

fn compile(source: &str, name: &str, field: Option<&FieldSelector>) -> Option<CompiledField> {
    let field = field?;
    match Selector::parse(field.css()) {
        Ok(selector) => Some(CompiledField {
            selector,
            attr: match field {
                FieldSelector::Text(_) => None,
                FieldSelector::Attr { attr, .. } => Some(attr.clone()),
            },
        }),
        Err(e) => {
            warn!(%source, field = name, error = %e, "Unusable field selector; field will be empty");
            None
        }
    }
}

fn read_field(element: ElementRef<'_>, field: Option<&CompiledField>) -> Option<String> {
    let field = field?;
    let found = element.select(&field.selector).next()?;
    match &field.attr {
        Some(attr) => non_empty(found.value().attr(attr)?),
        None => non_empty(&element_text(found)),
    }
}

/// Images default to `src`, then `data-src` for lazily loaded markup.
fn read_image(element: ElementRef<'_>, field: Option<&CompiledField>) -> Option<String> {
    let field = field?;
    if field.attr.is_some() {
        return read_field(element, Some(field));
    }
    let found = element.select(&field.selector).next()?;
    IMAGE_ATTRS
        .iter()
        .find_map(|attr| found.value().attr(attr).and_then(non_empty))
}

/// Text content with runs of whitespace collapsed.
fn element_text(element: ElementRef<'_>) -> String {
    element.text().flat_map(str::split_whitespace).join(" ")
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Make an image `src` absolute.
///
/// Root-relative paths get `base_url` prepended; protocol-relative ones get
/// `https:`. Anything else is returned unchanged.
pub fn resolve_image_src(src: &str, base_url: &str) -> String {
    if let Some(rest) = src.strip_prefix("//") {
        // Names another host, so `base_url` is not prepended here.
        format!("https://{rest}")
    } else if src.starts_with('/') {
        format!("{}{}", base_url.trim_end_matches('/'), src)
    } else {
        src.to_string()
    }
}
