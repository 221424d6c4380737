//! Output writers.
//!
//! # Submodules
//!
//! - [`html`]: renders the [`Feed`](crate::models::Feed) as the rotating
//!   full-screen slideshow page
//! - [`json`]: writes the same feed as JSON
//!
//! Both overwrite their target on every run; nothing from earlier runs is
//! kept.

pub mod html;
pub mod json;
