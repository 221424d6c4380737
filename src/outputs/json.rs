//! JSON output of the feed.
//!
//! Writes the same [`Feed`] the slideshow is rendered from, including the
//! per-source reports, so other consumers (or a human checking why a
//! source went quiet) can read it without parsing HTML.

use crate::models::Feed;
use crate::utils::ensure_parent_dir;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Serialize `feed` as pretty-printed JSON and overwrite `path` with it.
///
/// # Arguments
///
/// * `feed` - The aggregated feed
/// * `path` - Target file; missing parent directories are created
///
/// # Returns
///
/// `Ok(())` once the file is written, or the serialization or I/O error.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_feed(feed: &Feed, path: &Path) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(feed)?;
    ensure_parent_dir(path).await?;
    fs::write(path, json).await?;
    info!(items = feed.items.len(), "Wrote feed JSON");
    Ok(())
}
