//! Entity-specific halves of the wizard

use async_trait::async_trait;
use serde::Serialize;
use std::fmt::Debug;
use std::sync::Arc;

use super::draft::Draft;
use super::resolver::{ImageRemover, ResolvedImage};
use crate::gateway::{GatewayError, NewsApi, VenueApi};
use crate::models::{
    HasStatus, NewsArticle, NewsDraft, NewsInput, Venue, VenueDraft, VenueInput,
};

/// What the orchestrator needs to know about one kind of entity
#[async_trait]
pub trait WizardFlow: ImageRemover + 'static {
    type Entity: Clone + Debug + Serialize + HasStatus + Send + Sync + 'static;
    type Draft: Draft;

    /// Path segment and log label, e.g. `news`
    const KIND: &'static str;

    fn entity_id(entity: &Self::Entity) -> &str;

    /// Stored image key of an entity
    fn entity_image(entity: &Self::Entity) -> Option<&str>;

    fn draft_from_entity(entity: &Self::Entity) -> Self::Draft;

    /// Where a completed create flow sends the user
    fn redirect_path(entity: &Self::Entity) -> String {
        format!("/{}/{}", Self::KIND, Self::entity_id(entity))
    }

    async fn fetch(&self, id: &str) -> Result<Option<Self::Entity>, GatewayError>;

    async fn create(
        &self,
        draft: &Self::Draft,
        image: Option<&ResolvedImage>,
    ) -> Result<Self::Entity, GatewayError>;

    async fn update(
        &self,
        id: &str,
        draft: &Self::Draft,
        image: Option<&ResolvedImage>,
    ) -> Result<Self::Entity, GatewayError>;
}

/// News article wizard
#[derive(Clone)]
pub struct NewsFlow {
    api: Arc<dyn NewsApi>,
}

impl NewsFlow {
    pub fn new(api: Arc<dyn NewsApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ImageRemover for NewsFlow {
    async fn remove_image(&self, entity_id: &str) -> Result<(), GatewayError> {
        self.api.remove_news_image(entity_id).await
    }
}

#[async_trait]
impl WizardFlow for NewsFlow {
    type Entity = NewsArticle;
    type Draft = NewsDraft;

    const KIND: &'static str = "news";

    fn entity_id(entity: &NewsArticle) -> &str {
        &entity.id
    }

    fn entity_image(entity: &NewsArticle) -> Option<&str> {
        entity.image.as_deref()
    }

    fn draft_from_entity(entity: &NewsArticle) -> NewsDraft {
        NewsDraft::from_article(entity)
    }

    async fn fetch(&self, id: &str) -> Result<Option<NewsArticle>, GatewayError> {
        self.api.get_news(id).await
    }

    async fn create(
        &self,
        draft: &NewsDraft,
        image: Option<&ResolvedImage>,
    ) -> Result<NewsArticle, GatewayError> {
        self.api.create_news(&NewsInput::from_draft(draft, image)).await
    }

    async fn update(
        &self,
        id: &str,
        draft: &NewsDraft,
        image: Option<&ResolvedImage>,
    ) -> Result<NewsArticle, GatewayError> {
        self.api
            .update_news(id, &NewsInput::from_draft(draft, image))
            .await
    }
}

/// Venue wizard
#[derive(Clone)]
pub struct VenueFlow {
    api: Arc<dyn VenueApi>,
}

impl VenueFlow {
    pub fn new(api: Arc<dyn VenueApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ImageRemover for VenueFlow {
    async fn remove_image(&self, entity_id: &str) -> Result<(), GatewayError> {
        self.api.remove_venue_image(entity_id).await
    }
}

#[async_trait]
impl WizardFlow for VenueFlow {
    type Entity = Venue;
    type Draft = VenueDraft;

    const KIND: &'static str = "venues";

    fn entity_id(entity: &Venue) -> &str {
        &entity.id
    }

    fn entity_image(entity: &Venue) -> Option<&str> {
        entity.image.as_deref()
    }

    fn draft_from_entity(entity: &Venue) -> VenueDraft {
        VenueDraft::from_venue(entity)
    }

    async fn fetch(&self, id: &str) -> Result<Option<Venue>, GatewayError> {
        self.api.get_venue(id).await
    }

    async fn create(
        &self,
        draft: &VenueDraft,
        image: Option<&ResolvedImage>,
    ) -> Result<Venue, GatewayError> {
        self.api.create_venue(&VenueInput::from_draft(draft, image)).await
    }

    async fn update(
        &self,
        id: &str,
        draft: &VenueDraft,
        image: Option<&ResolvedImage>,
    ) -> Result<Venue, GatewayError> {
        self.api
            .update_venue(id, &VenueInput::from_draft(draft, image))
            .await
    }
}
