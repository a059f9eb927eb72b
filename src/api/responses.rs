//! Shared API request and response types

use serde::{Deserialize, Serialize};

use crate::api::middleware::ApiError;
use crate::models::{ContentStatus, HasStatus, Page, PageInfo, StatusCategory};

/// List row: the record plus the category its status badge is shown under
#[derive(Debug, Serialize)]
pub struct ListItem<T> {
    #[serde(flatten)]
    pub item: T,
    pub status_category: StatusCategory,
}

impl<T: HasStatus> ListItem<T> {
    pub fn new(item: T) -> Self {
        Self {
            status_category: item.status_category(),
            item,
        }
    }
}

/// One page of a list view
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<ListItem<T>>,
    pub page_info: PageInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
    /// Canonical query string of the filters that produced this page
    pub query: String,
}

impl<T: HasStatus> ListResponse<T> {
    pub fn new(page: Page<T>, query: String) -> Self {
        Self {
            items: page.items.into_iter().map(ListItem::new).collect(),
            page_info: page.page_info,
            total_count: page.total_count,
            query,
        }
    }
}

/// Body of a status change
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

impl StatusRequest {
    pub fn parse(&self) -> Result<ContentStatus, ApiError> {
        ContentStatus::from_str(&self.status).ok_or_else(|| {
            ApiError::validation_error(format!("Invalid status: {}", self.status))
        })
    }
}
