//! Venue model

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::news::{list_value, text_value};
use super::{ContentStatus, HasStatus, ImageValue, MARKETS};
use crate::validation::{FieldValue, Fields, Rule, Schema};
use crate::wizard::draft::{overlay, Draft, Step};
use crate::wizard::ResolvedImage;

/// Venue kinds accepted by the content API
pub const VENUE_TYPES: &[&str] = &[
    "restaurant",
    "bar",
    "nightclub",
    "gallery",
    "theater",
    "hotel",
    "other",
];

/// Venue as returned by the content API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Venue {
    pub id: String,
    pub name: String,
    pub venue_type: String,
    pub market: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub tag_ids: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HasStatus for Venue {
    fn raw_status(&self) -> &str {
        &self.status
    }
}

/// Cross-step draft of a venue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VenueDraft {
    // Step 1
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_ids: Option<Vec<String>>,
    // Step 2
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ContentStatus>,
}

impl VenueDraft {
    pub fn from_venue(venue: &Venue) -> Self {
        Self {
            name: Some(venue.name.clone()),
            venue_type: Some(venue.venue_type.clone()),
            market: Some(venue.market.clone()),
            address: venue.address.clone(),
            city: venue.city.clone(),
            tag_ids: Some(venue.tag_ids.clone()),
            description: venue.description.clone(),
            website_url: venue.website_url.clone(),
            phone: venue.phone.clone(),
            image: venue.image.as_deref().map(ImageValue::parse),
            status: ContentStatus::from_str(&venue.status),
        }
    }
}

static STEP_ONE_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new()
        .field("name", [Rule::Required, Rule::Length { min: 2, max: 100 }])
        .field("venueType", [Rule::Required, Rule::OneOf(VENUE_TYPES)])
        .field("market", [Rule::Required, Rule::OneOf(MARKETS)])
        .field("address", [Rule::Length { min: 0, max: 200 }])
        .field("city", [Rule::Length { min: 0, max: 80 }])
        .field("tagIds", [Rule::Count { min: 0, max: 10 }])
});

static STEP_TWO_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new()
        .field("description", [Rule::Length { min: 0, max: 2_000 }])
        .field("websiteUrl", [Rule::Url])
        .field("phone", [Rule::Length { min: 7, max: 32 }])
});

impl Fields for VenueDraft {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "name" => text_value(&self.name),
            "venueType" => text_value(&self.venue_type),
            "market" => text_value(&self.market),
            "address" => text_value(&self.address),
            "city" => text_value(&self.city),
            "tagIds" => list_value(&self.tag_ids),
            "description" => text_value(&self.description),
            "websiteUrl" => text_value(&self.website_url),
            "phone" => text_value(&self.phone),
            "image" => self
                .image
                .as_ref()
                .map(|i| FieldValue::Text(i.as_str()))
                .unwrap_or(FieldValue::Missing),
            _ => FieldValue::Missing,
        }
    }
}

impl Draft for VenueDraft {
    fn merge(&mut self, later: Self) {
        overlay(&mut self.name, later.name);
        overlay(&mut self.venue_type, later.venue_type);
        overlay(&mut self.market, later.market);
        overlay(&mut self.address, later.address);
        overlay(&mut self.city, later.city);
        overlay(&mut self.tag_ids, later.tag_ids);
        overlay(&mut self.description, later.description);
        overlay(&mut self.website_url, later.website_url);
        overlay(&mut self.phone, later.phone);
        overlay(&mut self.image, later.image);
        overlay(&mut self.status, later.status);
    }

    fn for_step(&self, step: Step) -> Self {
        match step {
            Step::One => Self {
                name: self.name.clone(),
                venue_type: self.venue_type.clone(),
                market: self.market.clone(),
                address: self.address.clone(),
                city: self.city.clone(),
                tag_ids: self.tag_ids.clone(),
                ..Self::default()
            },
            Step::Two => Self {
                description: self.description.clone(),
                website_url: self.website_url.clone(),
                phone: self.phone.clone(),
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

/// Create/update mutation payload for venues
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ContentStatus>,
}

impl VenueInput {
    pub fn from_draft(draft: &VenueDraft, image: Option<&ResolvedImage>) -> Self {
        Self {
            name: draft.name.clone(),
            venue_type: draft.venue_type.clone(),
            market: draft.market.clone(),
            address: draft.address.clone(),
            city: draft.city.clone(),
            tag_ids: draft.tag_ids.clone(),
            description: draft.description.clone(),
            website_url: draft.website_url.clone(),
            phone: draft.phone.clone(),
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

    fn step_one() -> VenueDraft {
        VenueDraft {
            name: Some("The Gala Room".to_string()),
            venue_type: Some("bar".to_string()),
            market: Some("miami".to_string()),
            ..VenueDraft::default()
        }
    }

    #[test]
    fn test_step_one_requires_enum_members() {
        assert!(VenueDraft::schema(Step::One).validate(&step_one()).is_ok());

        let draft = VenueDraft {
            venue_type: Some("spaceport".to_string()),
            market: None,
            ..step_one()
        };
        let errors = VenueDraft::schema(Step::One).validate(&draft).unwrap_err();
        assert!(errors.get("venueType").unwrap()[0].starts_with("Must be one of"));
        assert_eq!(errors.get("market").unwrap()[0], "This field is required");
    }

    #[test]
    fn test_step_two_optional_fields() {
        assert!(VenueDraft::schema(Step::Two)
            .validate(&VenueDraft::default())
            .is_ok());

        let draft = VenueDraft {
            website_url: Some("https://gala.example.com".to_string()),
            phone: Some("123".to_string()),
            ..VenueDraft::default()
        };
        let errors = VenueDraft::schema(Step::Two).validate(&draft).unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["phone"]);
    }

    #[test]
    fn test_input_serializes_only_set_fields() {
        let input = VenueInput::status_only(ContentStatus::Archived);
        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            serde_json::json!({"status": "ARCHIVED"})
        );
    }
}
