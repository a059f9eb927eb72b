//! Content status workflow
//!
//! Backend status strings are mapped once, here, into a closed enum. Display
//! categories for badges and filters are derived from it with a total mapping
//! that has a named fallback for values this build does not know about.

use serde::{Deserialize, Serialize};

/// Workflow status shared by news articles and venues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentStatus {
    /// Being written, not submitted
    #[default]
    Draft,
    /// Submitted for review
    Pending,
    /// Approved and live
    Approved,
    /// Sent back by a reviewer
    Rejected,
    /// Hidden from lists unless archived items are requested
    Archived,
}

impl ContentStatus {
    pub const ALL: [ContentStatus; 5] = [
        ContentStatus::Draft,
        ContentStatus::Pending,
        ContentStatus::Approved,
        ContentStatus::Rejected,
        ContentStatus::Archived,
    ];

    /// Wire representation used by the content API
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Draft => "DRAFT",
            ContentStatus::Pending => "PENDING",
            ContentStatus::Approved => "APPROVED",
            ContentStatus::Rejected => "REJECTED",
            ContentStatus::Archived => "ARCHIVED",
        }
    }

    /// Parse a backend or query-string value, ignoring case
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DRAFT" => Some(ContentStatus::Draft),
            "PENDING" => Some(ContentStatus::Pending),
            "APPROVED" => Some(ContentStatus::Approved),
            "REJECTED" => Some(ContentStatus::Rejected),
            "ARCHIVED" => Some(ContentStatus::Archived),
            _ => None,
        }
    }

    pub fn category(&self) -> StatusCategory {
        match self {
            ContentStatus::Draft => StatusCategory::Draft,
            ContentStatus::Pending => StatusCategory::InReview,
            ContentStatus::Approved => StatusCategory::Live,
            ContentStatus::Rejected => StatusCategory::NeedsChanges,
            ContentStatus::Archived => StatusCategory::Inactive,
        }
    }
}

impl std::fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// UI category a status is displayed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    Draft,
    InReview,
    Live,
    NeedsChanges,
    Inactive,
    /// Backend sent a status this build does not recognise
    Unknown,
}

impl StatusCategory {
    /// Total mapping from any backend status string
    pub fn from_backend(raw: &str) -> Self {
        ContentStatus::from_str(raw)
            .map(|status| status.category())
            .unwrap_or(StatusCategory::Unknown)
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusCategory::Draft => "Draft",
            StatusCategory::InReview => "In review",
            StatusCategory::Live => "Live",
            StatusCategory::NeedsChanges => "Needs changes",
            StatusCategory::Inactive => "Archived",
            StatusCategory::Unknown => "Unknown",
        }
    }
}

/// Records that carry a raw backend status
pub trait HasStatus {
    fn raw_status(&self) -> &str;

    fn status_category(&self) -> StatusCategory {
        StatusCategory::from_backend(self.raw_status())
    }
}
