//! News article model
//!
//! This module provides:
//! - `NewsArticle`, the API-owned record as the admin sees it
//! - `NewsDraft`, the typed cross-step draft edited by the wizard
//! - `NewsInput`, the payload of the create/update mutations
//! - Step validation schemas

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::{ContentStatus, HasStatus, ImageValue, MARKETS};
use crate::validation::{FieldValue, Fields, Rule, Schema};
use crate::wizard::draft::{overlay, Draft, Step};
use crate::wizard::ResolvedImage;

/// News article as returned by the content API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub category_ids: Vec<String>,
    #[serde(default)]
    pub tag_ids: Vec<String>,
    #[serde(default)]
    pub published_markets: Vec<String>,
    /// Permanent storage key of the cover image
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    /// Raw backend status
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HasStatus for NewsArticle {
    fn raw_status(&self) -> &str {
        &self.status
    }
}

/// Cross-step draft of a news article
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewsDraft {
    // Step 1
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_markets: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_ids: Option<Vec<String>>,
    // Step 2
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageValue>,
    // Set outside the steps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ContentStatus>,
}

impl NewsDraft {
    /// Draft holding every editable field of an existing article
    pub fn from_article(article: &NewsArticle) -> Self {
        Self {
            title: Some(article.title.clone()),
            summary: article.summary.clone(),
            category_ids: Some(article.category_ids.clone()),
            published_markets: Some(article.published_markets.clone()),
            tag_ids: Some(article.tag_ids.clone()),
            body: article.body.clone(),
            author: article.author.clone(),
            source_url: article.source_url.clone(),
            image: article.image.as_deref().map(ImageValue::parse),
            status: ContentStatus::from_str(&article.status),
        }
    }
}

static STEP_ONE_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new()
        .field("title", [Rule::Required, Rule::Length { min: 3, max: 120 }])
        .field("summary", [Rule::Length { min: 0, max: 280 }])
        .field("categoryIds", [Rule::Count { min: 1, max: 3 }])
        .field(
            "publishedMarkets",
            [Rule::Count { min: 1, max: MARKETS.len() }, Rule::EachOneOf(MARKETS)],
        )
        .field("tagIds", [Rule::Count { min: 0, max: 10 }])
});

static STEP_TWO_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new()
        .field("body", [Rule::Length { min: 0, max: 20_000 }])
        .field("author", [Rule::Length { min: 0, max: 80 }])
        .field("sourceUrl", [Rule::Url])
});

impl Fields for NewsDraft {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "title" => text_value(&self.title),
            "summary" => text_value(&self.summary),
            "body" => text_value(&self.body),
            "author" => text_value(&self.author),
            "sourceUrl" => text_value(&self.source_url),
            "categoryIds" => list_value(&self.category_ids),
            "publishedMarkets" => list_value(&self.published_markets),
            "tagIds" => list_value(&self.tag_ids),
            "image" => self
                .image
                .as_ref()
                .map(|i| FieldValue::Text(i.as_str()))
                .unwrap_or(FieldValue::Missing),
            _ => FieldValue::Missing,
        }
    }
}

pub(crate) fn text_value(v: &Option<String>) -> FieldValue<'_> {
    v.as_deref().map(FieldValue::Text).unwrap_or(FieldValue::Missing)
}

pub(crate) fn list_value(v: &Option<Vec<String>>) -> FieldValue<'_> {
    v.as_deref().map(FieldValue::List).unwrap_or(FieldValue::Missing)
}

impl Draft for NewsDraft {
    fn merge(&mut self, later: Self) {
        overlay(&mut self.title, later.title);
        overlay(&mut self.summary, later.summary);
        overlay(&mut self.category_ids, later.category_ids);
        overlay(&mut self.published_markets, later.published_markets);
        overlay(&mut self.tag_ids, later.tag_ids);
        overlay(&mut self.body, later.body);
        overlay(&mut self.author, later.author);
        overlay(&mut self.source_url, later.source_url);
        overlay(&mut self.image, later.image);
        overlay(&mut self.status, later.status);
    }

    fn for_step(&self, step: Step) -> Self {
        match step {
            Step::One => Self {
                title: self.title.clone(),
                summary: self.summary.clone(),
                category_ids: self.category_ids.clone(),
                published_markets: self.published_markets.clone(),
                tag_ids: self.tag_ids.clone(),
                ..Self::default()
            },
            Step::Two => Self {
                body: self.body.clone(),
                author: self.author.clone(),
                source_url: self.source_url.clone(),
                image: self.image.clone(),
                ..Self::default()
            },
        }
    }

    fn schema(step: Step) -> &'static Schema {
        match step {
            Step::One => &STEP_ONE_SCHEMA,
            Step::Two => &STEP_TWO_SCHEMA,
        }
    }

    fn image(&self) -> Option<&ImageValue> {
        self.image.as_ref()
    }

    fn set_image(&mut self, image: Option<ImageValue>) {
        self.image = image;
    }

    fn status(&self) -> Option<ContentStatus> {
        self.status
    }

    fn set_status(&mut self, status: ContentStatus) {
        self.status = Some(status);
    }
}

/// Create/update mutation payload
///
/// The image can only come from a [`ResolvedImage`], so a staged token or the
/// removal sentinel cannot end up in this payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_markets: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ContentStatus>,
}

impl NewsInput {
    pub fn from_draft(draft: &NewsDraft, image: Option<&ResolvedImage>) -> Self {
        Self {
            title: draft.title.clone(),
            summary: draft.summary.clone(),
            body: draft.body.clone(),
            author: draft.author.clone(),
            category_ids: draft.category_ids.clone(),
            tag_ids: draft.tag_ids.clone(),
            published_markets: draft.published_markets.clone(),
            source_url: draft.source_url.clone(),
            image: image.map(|resolved| resolved.key().to_string()),
            status: draft.status,
        }
    }

    pub fn status_only(status: ContentStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_one() -> NewsDraft {
        NewsDraft {
            title: Some("Test Article".to_string()),
            category_ids: Some(vec!["c1".to_string()]),
            published_markets: Some(vec!["miami".to_string()]),
            ..NewsDraft::default()
        }
    }

    #[test]
    fn test_step_one_schema_accepts_minimal_article() {
        assert!(NewsDraft::schema(Step::One).validate(&step_one()).is_ok());
    }

    #[test]
    fn test_step_one_schema_rejects_unknown_market_and_empty_categories() {
        let draft = NewsDraft {
            category_ids: Some(vec![]),
            published_markets: Some(vec!["atlantis".to_string()]),
            ..step_one()
        };
        let errors = NewsDraft::schema(Step::One).validate(&draft).unwrap_err();
        assert!(errors.get("categoryIds").is_some());
        assert_eq!(errors.get("publishedMarkets").unwrap()[0], "Unknown value 'atlantis'");
    }

    #[test]
    fn test_step_two_schema_checks_url_shape() {
        let draft = NewsDraft {
            source_url: Some("not a url".to_string()),
            ..NewsDraft::default()
        };
        let errors = NewsDraft::schema(Step::Two).validate(&draft).unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["sourceUrl"]);
    }

    #[test]
    fn test_merge_later_step_wins_on_overlap() {
        let mut draft = step_one();
        draft.merge(NewsDraft {
            title: Some("Renamed".to_string()),
            body: Some("Body".to_string()),
            ..NewsDraft::default()
        });
        assert_eq!(draft.title.as_deref(), Some("Renamed"));
        assert_eq!(draft.body.as_deref(), Some("Body"));
        assert_eq!(draft.category_ids, Some(vec!["c1".to_string()]));
    }

    #[test]
    fn test_for_step_partitions_fields() {
        let mut full = step_one();
        full.body = Some("Body".to_string());
        full.image = Some(ImageValue::Stored("k".to_string()));
        full.status = Some(ContentStatus::Approved);

        let one = full.for_step(Step::One);
        let two = full.for_step(Step::Two);
        assert!(one.body.is_none() && one.image.is_none() && one.status.is_none());
        assert!(two.title.is_none() && two.body.is_some() && two.image.is_some());
        assert_eq!(one.merged(two).merged(NewsDraft { status: full.status, ..Default::default() }), full);
    }

    #[test]
    fn test_draft_deserializes_partial_camel_case_patch() {
        let patch: NewsDraft =
            serde_json::from_str(r#"{"title":"T","publishedMarkets":["austin"],"image":"temp_1"}"#)
                .unwrap();
        assert_eq!(patch.title.as_deref(), Some("T"));
        assert!(patch.image.unwrap().is_staged());
        assert!(patch.body.is_none());
    }
}
