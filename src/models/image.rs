//! Image field values
//!
//! An entity's image field holds one of four things. On the wire all of them
//! are plain strings; the reserved prefix and sentinel tell them apart.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Prefix of client-only staged image tokens
pub const TEMP_IMAGE_PREFIX: &str = "temp_";

/// Sentinel for "remove the stored image on the next save"
pub const REMOVE_IMAGE_SENTINEL: &str = "REMOVE";

/// Value of an image field in a draft
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ImageValue {
    /// No image
    #[default]
    Empty,
    /// Permanent storage key
    Stored(String),
    /// Staged upload, resolved at final submission
    Staged(String),
    /// Stored image to be deleted at final submission
    MarkedForRemoval,
}

impl ImageValue {
    /// Classify a raw field value
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            ImageValue::Empty
        } else if raw == REMOVE_IMAGE_SENTINEL {
            ImageValue::MarkedForRemoval
        } else if raw.starts_with(TEMP_IMAGE_PREFIX) {
            ImageValue::Staged(raw.to_string())
        } else {
            ImageValue::Stored(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ImageValue::Empty => "",
            ImageValue::Stored(key) | ImageValue::Staged(key) => key,
            ImageValue::MarkedForRemoval => REMOVE_IMAGE_SENTINEL,
        }
    }

    pub fn is_staged(&self) -> bool {
        matches!(self, ImageValue::Staged(_))
    }

    pub fn staged_token(&self) -> Option<&str> {
        match self {
            ImageValue::Staged(token) => Some(token),
            _ => None,
        }
    }
}

impl From<&str> for ImageValue {
    fn from(raw: &str) -> Self {
        ImageValue::parse(raw)
    }
}

impl Serialize for ImageValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ImageValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ImageValue::parse(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_classifies_reserved_values() {
        assert_eq!(ImageValue::parse(""), ImageValue::Empty);
        assert_eq!(ImageValue::parse("REMOVE"), ImageValue::MarkedForRemoval);
        assert_eq!(
            ImageValue::parse("temp_abc123"),
            ImageValue::Staged("temp_abc123".to_string())
        );
        assert_eq!(
            ImageValue::parse("news/2024/cover.jpg"),
            ImageValue::Stored("news/2024/cover.jpg".to_string())
        );
    }

    #[test]
    fn test_serde_uses_raw_strings() {
        let value: ImageValue = serde_json::from_str("\"temp_x\"").unwrap();
        assert!(value.is_staged());
        assert_eq!(serde_json::to_string(&ImageValue::MarkedForRemoval).unwrap(), "\"REMOVE\"");
    }

    proptest! {
        /// Parsing and printing are inverse for any trimmed value.
        #[test]
        fn parse_preserves_raw_value(raw in "[a-zA-Z0-9_/.]{0,24}") {
            let parsed = ImageValue::parse(&raw);
            prop_assert_eq!(parsed.as_str(), raw.as_str());
        }
    }
}
