//! Data models
//!
//! This module contains the data structures shared across the admin service:
//! - Content records owned by the remote API (NewsArticle, Venue)
//! - Typed wizard drafts and mutation inputs
//! - Image field values and status workflow types
//! - Cursor pagination types

mod image;
pub mod news;
mod page;
mod status;
pub mod venue;

pub use image::{ImageValue, REMOVE_IMAGE_SENTINEL, TEMP_IMAGE_PREFIX};
pub use news::{NewsArticle, NewsDraft, NewsInput};
pub use page::{Page, PageInfo};
pub use status::{ContentStatus, HasStatus, StatusCategory};
pub use venue::{Venue, VenueDraft, VenueInput, VENUE_TYPES};

/// Markets content can be published to
pub const MARKETS: &[&str] = &["miami", "new-york", "los-angeles", "chicago", "austin"];
