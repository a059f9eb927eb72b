//! List view state
//!
//! Filter, sort and cursor state for the news and venue list views:
//! - `FilterState`, the canonical state and its setters
//! - query-string parsing and canonical serialization (`query`)
//! - `ListView`, a controller with debounced search and a deferred URL projection
//!
//! The two list views differ only in their category-like filter and their sort
//! fields, which [`ListingKind`] captures.

mod debounce;
mod filter;
mod query;
mod view;

use serde::Serialize;
use std::fmt::Debug;

use crate::models::{ContentStatus, VENUE_TYPES};

pub use debounce::Debouncer;
pub use filter::FilterState;
pub use view::{ListView, Navigator};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    pub fn reversed(&self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// A value that can live in a URL query parameter
pub trait QueryValue: Sized + Clone + PartialEq + Debug + Send + Sync + 'static {
    /// Parse a decoded parameter; `None` means "treat as unset"
    fn parse_param(raw: &str) -> Option<Self>;

    fn to_param(&self) -> String;
}

impl QueryValue for String {
    fn parse_param(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        (!raw.is_empty()).then(|| raw.to_string())
    }

    fn to_param(&self) -> String {
        self.clone()
    }
}

impl QueryValue for ContentStatus {
    fn parse_param(raw: &str) -> Option<Self> {
        ContentStatus::from_str(raw)
    }

    fn to_param(&self) -> String {
        self.as_str().to_string()
    }
}

/// A sortable column
pub trait SortKey: QueryValue + Copy + Default {
    /// Direction used when the column is first selected
    fn default_direction(&self) -> SortDirection;

    /// Field name understood by the content API
    fn api_field(&self) -> &'static str;
}

/// What distinguishes one list view from another
pub trait ListingKind: Clone + PartialEq + Debug + Default + Send + Sync + 'static {
    /// Query parameter carrying the category-like filter
    const KIND_PARAM: &'static str;
    type Kind: QueryValue;
    type Sort: SortKey;
}

/// News list sort columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NewsSort {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
}

impl QueryValue for NewsSort {
    fn parse_param(raw: &str) -> Option<Self> {
        match raw {
            "createdAt" => Some(NewsSort::CreatedAt),
            "updatedAt" => Some(NewsSort::UpdatedAt),
            "title" => Some(NewsSort::Title),
            _ => None,
        }
    }

    fn to_param(&self) -> String {
        self.api_field().to_string()
    }
}

impl SortKey for NewsSort {
    fn default_direction(&self) -> SortDirection {
        match self {
            NewsSort::Title => SortDirection::Asc,
            _ => SortDirection::Desc,
        }
    }

    fn api_field(&self) -> &'static str {
        match self {
            NewsSort::CreatedAt => "createdAt",
            NewsSort::UpdatedAt => "updatedAt",
            NewsSort::Title => "title",
        }
    }
}

/// Venue list sort columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VenueSort {
    #[default]
    Name,
    City,
    CreatedAt,
    UpdatedAt,
}

impl QueryValue for VenueSort {
    fn parse_param(raw: &str) -> Option<Self> {
        match raw {
            "name" => Some(VenueSort::Name),
            "city" => Some(VenueSort::City),
            "createdAt" => Some(VenueSort::CreatedAt),
            "updatedAt" => Some(VenueSort::UpdatedAt),
            _ => None,
        }
    }

    fn to_param(&self) -> String {
        self.api_field().to_string()
    }
}

impl SortKey for VenueSort {
    fn default_direction(&self) -> SortDirection {
        match self {
            VenueSort::Name | VenueSort::City => SortDirection::Asc,
            _ => SortDirection::Desc,
        }
    }

    fn api_field(&self) -> &'static str {
        match self {
            VenueSort::Name => "name",
            VenueSort::City => "city",
            VenueSort::CreatedAt => "createdAt",
            VenueSort::UpdatedAt => "updatedAt",
        }
    }
}

/// Venue type filter, restricted to known venue types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VenueTypeFilter(&'static str);

impl VenueTypeFilter {
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl QueryValue for VenueTypeFilter {
    fn parse_param(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_ascii_lowercase();
        VENUE_TYPES
            .iter()
            .find(|t| **t == raw)
            .map(|t| VenueTypeFilter(*t))
    }

    fn to_param(&self) -> String {
        self.0.to_string()
    }
}

/// News list: filtered by category id
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewsListing;

impl ListingKind for NewsListing {
    const KIND_PARAM: &'static str = "category";
    type Kind = String;
    type Sort = NewsSort;
}

/// Venue list: filtered by venue type
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VenueListing;

impl ListingKind for VenueListing {
    const KIND_PARAM: &'static str = "type";
    type Kind = VenueTypeFilter;
    type Sort = VenueSort;
}

/// Parameters of one list request to the content API
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub search: Option<String>,
    pub status: Option<ContentStatus>,
    /// Category id (news) or venue type (venues)
    pub kind: Option<String>,
    pub tag: Option<String>,
    pub include_archived: bool,
    pub sort_field: &'static str,
    pub sort_direction: SortDirection,
    pub first: u32,
    pub after: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            search: None,
            status: None,
            kind: None,
            tag: None,
            include_archived: false,
            sort_field: "createdAt",
            sort_direction: SortDirection::Desc,
            first: 20,
            after: None,
        }
    }
}
