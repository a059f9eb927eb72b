//! In-process content backend
//!
//! Implements every gateway trait against in-memory maps. It serves as the
//! `memory` backend driver for demos and as the collaborator in tests, with
//! a call log and one-shot failure injection per operation.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    GatewayError, NewsApi, ObjectStorage, PresignRequest, PresignedUpload, UploadApi, VenueApi,
};
use crate::listing::{ListQuery, SortDirection};
use crate::models::{
    ContentStatus, NewsArticle, NewsInput, Page, PageInfo, Venue, VenueInput,
};
use crate::staging::StagedImage;

const UPLOAD_URL_PREFIX: &str = "memory://uploads/";

/// Backend operations, for the call log and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListNews,
    GetNews,
    CreateNews,
    UpdateNews,
    DeleteNews,
    RemoveNewsImage,
    ListVenues,
    GetVenue,
    CreateVenue,
    UpdateVenue,
    DeleteVenue,
    RemoveVenueImage,
    Presign,
    PutObject,
}

/// One recorded backend call
#[derive(Debug, Clone)]
pub struct Call {
    pub operation: Operation,
    /// Entity id, upload key or filename the call was about
    pub target: Option<String>,
    /// Serialized input, when the call carried one
    pub payload: Value,
}

/// Object stored through a presigned upload
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub content_type: String,
    pub data: Bytes,
}

#[derive(Default)]
pub struct MemoryBackend {
    news: RwLock<BTreeMap<String, NewsArticle>>,
    venues: RwLock<BTreeMap<String, Venue>>,
    objects: RwLock<HashMap<String, StoredObject>>,
    /// Issued upload URLs and the keys they store to
    presigned: RwLock<HashMap<String, String>>,
    calls: RwLock<Vec<Call>>,
    failures: RwLock<HashSet<Operation>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-filled with a handful of entities
    pub async fn with_demo_data() -> Self {
        let backend = Self::new();
        let articles = [
            ("Summer gala announced", "c1", "miami", ContentStatus::Approved),
            ("Gallery night returns", "c2", "new-york", ContentStatus::Pending),
            ("New chef at the harbor", "c1", "chicago", ContentStatus::Draft),
        ];
        for (title, category, market, status) in articles {
            let input = NewsInput {
                title: Some(title.to_string()),
                category_ids: Some(vec![category.to_string()]),
                published_markets: Some(vec![market.to_string()]),
                status: Some(status),
                ..NewsInput::default()
            };
            backend.insert_news(&input).await;
        }

        let venues = [
            ("Blue Room", "bar", "miami", "Miami"),
            ("The Lantern", "restaurant", "austin", "Austin"),
            ("Northside Gallery", "gallery", "chicago", "Chicago"),
        ];
        for (name, venue_type, market, city) in venues {
            let input = VenueInput {
                name: Some(name.to_string()),
                venue_type: Some(venue_type.to_string()),
                market: Some(market.to_string()),
                city: Some(city.to_string()),
                status: Some(ContentStatus::Approved),
                ..VenueInput::default()
            };
            backend.insert_venue(&input).await;
        }

        backend.calls.write().await.clear();
        backend
    }

    /// Make the next call of `operation` fail
    pub async fn fail_next(&self, operation: Operation) {
        self.failures.write().await.insert(operation);
    }

    /// Every call so far, oldest first
    pub async fn calls(&self) -> Vec<Call> {
        self.calls.read().await.clone()
    }

    /// Calls of one operation, oldest first
    pub async fn calls_of(&self, operation: Operation) -> Vec<Call> {
        self.calls
            .read()
            .await
            .iter()
            .filter(|call| call.operation == operation)
            .cloned()
            .collect()
    }

    pub async fn news(&self, id: &str) -> Option<NewsArticle> {
        self.news.read().await.get(id).cloned()
    }

    pub async fn venue(&self, id: &str) -> Option<Venue> {
        self.venues.read().await.get(id).cloned()
    }

    pub async fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }

    async fn record<T: Serialize>(
        &self,
        operation: Operation,
        target: Option<&str>,
        payload: Option<&T>,
    ) -> Result<(), GatewayError> {
        let payload = payload
            .and_then(|p| serde_json::to_value(p).ok())
            .unwrap_or(Value::Null);
        self.calls.write().await.push(Call {
            operation,
            target: target.map(str::to_string),
            payload,
        });

        if self.failures.write().await.remove(&operation) {
            tracing::debug!(?operation, "Injected backend failure");
            return Err(GatewayError::Graphql(vec![format!(
                "{:?} failed",
                operation
            )]));
        }
        Ok(())
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", prefix, n)
    }

    async fn insert_news(&self, input: &NewsInput) -> NewsArticle {
        let now = Utc::now();
        let mut article = NewsArticle {
            id: self.next_id("news"),
            title: String::new(),
            summary: None,
            body: None,
            author: None,
            category_ids: Vec::new(),
            tag_ids: Vec::new(),
            published_markets: Vec::new(),
            image: None,
            source_url: None,
            status: ContentStatus::Draft.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };
        apply_news(&mut article, input);
        self.news
            .write()
            .await
            .insert(article.id.clone(), article.clone());
        article
    }

    async fn insert_venue(&self, input: &VenueInput) -> Venue {
        let now = Utc::now();
        let mut venue = Venue {
            id: self.next_id("venue"),
            name: String::new(),
            venue_type: String::new(),
            market: String::new(),
            address: None,
            city: None,
            tag_ids: Vec::new(),
            description: None,
            website_url: None,
            phone: None,
            image: None,
            status: ContentStatus::Draft.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };
        apply_venue(&mut venue, input);
        self.venues
            .write()
            .await
            .insert(venue.id.clone(), venue.clone());
        venue
    }
}

fn set<T>(slot: &mut T, value: &Option<T>)
where
    T: Clone,
{
    if let Some(value) = value {
        *slot = value.clone();
    }
}

fn set_opt(slot: &mut Option<String>, value: &Option<String>) {
    if let Some(value) = value {
        *slot = (!value.is_empty()).then(|| value.clone());
    }
}

fn apply_news(article: &mut NewsArticle, input: &NewsInput) {
    set(&mut article.title, &input.title);
    set_opt(&mut article.summary, &input.summary);
    set_opt(&mut article.body, &input.body);
    set_opt(&mut article.author, &input.author);
    set(&mut article.category_ids, &input.category_ids);
    set(&mut article.tag_ids, &input.tag_ids);
    set(&mut article.published_markets, &input.published_markets);
    set_opt(&mut article.source_url, &input.source_url);
    set_opt(&mut article.image, &input.image);
    if let Some(status) = input.status {
        article.status = status.as_str().to_string();
    }
}

fn apply_venue(venue: &mut Venue, input: &VenueInput) {
    set(&mut venue.name, &input.name);
    set(&mut venue.venue_type, &input.venue_type);
    set(&mut venue.market, &input.market);
    set_opt(&mut venue.address, &input.address);
    set_opt(&mut venue.city, &input.city);
    set(&mut venue.tag_ids, &input.tag_ids);
    set_opt(&mut venue.description, &input.description);
    set_opt(&mut venue.website_url, &input.website_url);
    set_opt(&mut venue.phone, &input.phone);
    set_opt(&mut venue.image, &input.image);
    if let Some(status) = input.status {
        venue.status = status.as_str().to_string();
    }
}

/// What list filtering and sorting needs from an entity
trait Listable: Clone {
    fn id(&self) -> &str;
    fn status(&self) -> &str;
    fn matches_search(&self, needle: &str) -> bool;
    fn matches_kind(&self, kind: &str) -> bool;
    fn has_tag(&self, tag: &str) -> bool;
    fn sort_key(&self, field: &str) -> String;
}

impl Listable for NewsArticle {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> &str {
        &self.status
    }

    fn matches_search(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self
                .summary
                .as_deref()
                .is_some_and(|s| s.to_lowercase().contains(needle))
    }

    fn matches_kind(&self, kind: &str) -> bool {
        self.category_ids.iter().any(|c| c == kind)
    }

    fn has_tag(&self, tag: &str) -> bool {
        self.tag_ids.iter().any(|t| t == tag)
    }

    fn sort_key(&self, field: &str) -> String {
        match field {
            "title" => self.title.to_lowercase(),
            "updatedAt" => self.updated_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            _ => self.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

impl Listable for Venue {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> &str {
        &self.status
    }

    fn matches_search(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self
                .city
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains(needle))
    }

    fn matches_kind(&self, kind: &str) -> bool {
        self.venue_type == kind
    }

    fn has_tag(&self, tag: &str) -> bool {
        self.tag_ids.iter().any(|t| t == tag)
    }

    fn sort_key(&self, field: &str) -> String {
        match field {
            "name" => self.name.to_lowercase(),
            "city" => self.city.clone().unwrap_or_default().to_lowercase(),
            "updatedAt" => self.updated_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            _ => self.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

/// Filter, sort and slice; cursors are stringified offsets
fn list<T: Listable>(items: impl Iterator<Item = T>, query: &ListQuery) -> Result<Page<T>, GatewayError> {
    let needle = query.search.as_deref().map(str::to_lowercase);
    let archived = ContentStatus::Archived.as_str();

    let mut matched: Vec<T> = items
        .filter(|item| needle.as_deref().map_or(true, |n| item.matches_search(n)))
        .filter(|item| {
            query
                .status
                .map_or(true, |s| item.status().eq_ignore_ascii_case(s.as_str()))
        })
        .filter(|item| {
            query.include_archived
                || query.status == Some(ContentStatus::Archived)
                || !item.status().eq_ignore_ascii_case(archived)
        })
        .filter(|item| query.kind.as_deref().map_or(true, |k| item.matches_kind(k)))
        .filter(|item| query.tag.as_deref().map_or(true, |t| item.has_tag(t)))
        .collect();

    matched.sort_by(|a, b| {
        let ordering = a
            .sort_key(query.sort_field)
            .cmp(&b.sort_key(query.sort_field))
            .then_with(|| a.id().cmp(b.id()));
        match query.sort_direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });

    let offset = match query.after.as_deref() {
        Some(cursor) => cursor
            .parse::<usize>()
            .map_err(|_| GatewayError::Graphql(vec![format!("Invalid cursor: {}", cursor)]))?,
        None => 0,
    };
    let total = matched.len();
    let end = offset.saturating_add(query.first as usize).min(total);
    let items: Vec<T> = matched.into_iter().skip(offset).take(end.saturating_sub(offset)).collect();

    let page_info = PageInfo {
        has_next_page: end < total,
        end_cursor: (end > offset).then(|| end.to_string()),
    };
    Ok(Page::new(items, page_info).with_total(total as u64))
}

#[async_trait]
impl NewsApi for MemoryBackend {
    async fn list_news(&self, query: &ListQuery) -> Result<Page<NewsArticle>, GatewayError> {
        self.record::<()>(Operation::ListNews, None, None).await?;
        let news = self.news.read().await;
        list(news.values().cloned(), query)
    }

    async fn get_news(&self, id: &str) -> Result<Option<NewsArticle>, GatewayError> {
        self.record::<()>(Operation::GetNews, Some(id), None).await?;
        Ok(self.news.read().await.get(id).cloned())
    }

    async fn create_news(&self, input: &NewsInput) -> Result<NewsArticle, GatewayError> {
        self.record(Operation::CreateNews, None, Some(input)).await?;
        if input.title.as_deref().map_or(true, |t| t.trim().is_empty()) {
            return Err(GatewayError::Graphql(vec!["Title is required".to_string()]));
        }
        let article = self.insert_news(input).await;
        tracing::info!(id = %article.id, "Created news article");
        Ok(article)
    }

    async fn update_news(&self, id: &str, input: &NewsInput) -> Result<NewsArticle, GatewayError> {
        self.record(Operation::UpdateNews, Some(id), Some(input)).await?;
        let mut news = self.news.write().await;
        let article = news
            .get_mut(id)
            .ok_or_else(|| GatewayError::NotFound(format!("News article {}", id)))?;
        apply_news(article, input);
        article.updated_at = Utc::now();
        tracing::info!(id = %id, "Updated news article");
        Ok(article.clone())
    }

    async fn delete_news(&self, id: &str) -> Result<(), GatewayError> {
        self.record::<()>(Operation::DeleteNews, Some(id), None).await?;
        if self.news.write().await.remove(id).is_none() {
            return Err(GatewayError::NotFound(format!("News article {}", id)));
        }
        tracing::info!(id = %id, "Deleted news article");
        Ok(())
    }

    async fn remove_news_image(&self, id: &str) -> Result<(), GatewayError> {
        self.record::<()>(Operation::RemoveNewsImage, Some(id), None).await?;
        let mut news = self.news.write().await;
        let article = news
            .get_mut(id)
            .ok_or_else(|| GatewayError::NotFound(format!("News article {}", id)))?;
        if let Some(key) = article.image.take() {
            self.objects.write().await.remove(&key);
        }
        Ok(())
    }
}

#[async_trait]
impl VenueApi for MemoryBackend {
    async fn list_venues(&self, query: &ListQuery) -> Result<Page<Venue>, GatewayError> {
        self.record::<()>(Operation::ListVenues, None, None).await?;
        let venues = self.venues.read().await;
        list(venues.values().cloned(), query)
    }

    async fn get_venue(&self, id: &str) -> Result<Option<Venue>, GatewayError> {
        self.record::<()>(Operation::GetVenue, Some(id), None).await?;
        Ok(self.venues.read().await.get(id).cloned())
    }

    async fn create_venue(&self, input: &VenueInput) -> Result<Venue, GatewayError> {
        self.record(Operation::CreateVenue, None, Some(input)).await?;
        if input.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
            return Err(GatewayError::Graphql(vec!["Name is required".to_string()]));
        }
        let venue = self.insert_venue(input).await;
        tracing::info!(id = %venue.id, "Created venue");
        Ok(venue)
    }

    async fn update_venue(&self, id: &str, input: &VenueInput) -> Result<Venue, GatewayError> {
        self.record(Operation::UpdateVenue, Some(id), Some(input)).await?;
        let mut venues = self.venues.write().await;
        let venue = venues
            .get_mut(id)
            .ok_or_else(|| GatewayError::NotFound(format!("Venue {}", id)))?;
        apply_venue(venue, input);
        venue.updated_at = Utc::now();
        tracing::info!(id = %id, "Updated venue");
        Ok(venue.clone())
    }

    async fn delete_venue(&self, id: &str) -> Result<(), GatewayError> {
        self.record::<()>(Operation::DeleteVenue, Some(id), None).await?;
        if self.venues.write().await.remove(id).is_none() {
            return Err(GatewayError::NotFound(format!("Venue {}", id)));
        }
        tracing::info!(id = %id, "Deleted venue");
        Ok(())
    }

    async fn remove_venue_image(&self, id: &str) -> Result<(), GatewayError> {
        self.record::<()>(Operation::RemoveVenueImage, Some(id), None).await?;
        let mut venues = self.venues.write().await;
        let venue = venues
            .get_mut(id)
            .ok_or_else(|| GatewayError::NotFound(format!("Venue {}", id)))?;
        if let Some(key) = venue.image.take() {
            self.objects.write().await.remove(&key);
        }
        Ok(())
    }
}

#[async_trait]
impl UploadApi for MemoryBackend {
    async fn presign_upload(&self, request: &PresignRequest) -> Result<PresignedUpload, GatewayError> {
        self.record(Operation::Presign, Some(&request.filename), Some(request))
            .await?;
        let key = format!("uploads/{}-{}", Uuid::new_v4().simple(), request.filename);
        let upload_url = format!("{}{}", UPLOAD_URL_PREFIX, key);
        self.presigned
            .write()
            .await
            .insert(upload_url.clone(), key.clone());
        Ok(PresignedUpload { upload_url, key })
    }
}

#[async_trait]
impl ObjectStorage for MemoryBackend {
    async fn put_object(
        &self,
        destination: &PresignedUpload,
        image: &StagedImage,
    ) -> Result<(), GatewayError> {
        self.record::<()>(Operation::PutObject, Some(&destination.key), None)
            .await?;
        let key = self
            .presigned
            .write()
            .await
            .remove(&destination.upload_url)
            .ok_or_else(|| GatewayError::Status {
                status: 403,
                body: "Unknown or used upload URL".to_string(),
            })?;
        self.objects.write().await.insert(
            key,
            StoredObject {
                content_type: image.content_type.clone(),
                data: image.data.clone(),
            },
        );
        Ok(())
    }
}
