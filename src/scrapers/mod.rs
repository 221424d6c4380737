//! Listing-page scraping.
//!
//! Every source is scraped by the same routine, [`extract::extract`],
//! parameterized by its [`SourceConfig`](crate::config::SourceConfig):
//!
//! 1. **Locate**: select item containers with `item_selector`
//! 2. **Cut off**: keep at most `max_items` containers
//! 3. **Pull fields**: run each field sub-selector inside the container
//!
//! Field-level misses degrade to absent values; only an item without a
//! title is dropped. An unusable item selector fails the whole source,
//! which the aggregator turns into an empty contribution.

pub mod extract;

pub use extract::extract;
