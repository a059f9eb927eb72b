//! Declarative field validation
//!
//! Each wizard step declares a [`Schema`]: an ordered list of fields, each with
//! a list of [`Rule`]s. Drafts expose their fields through [`Fields`], so the
//! same schema machinery serves news articles and venues.
//!
//! Validation errors are field-scoped and non-fatal. They are collected into
//! [`FieldErrors`] and never propagate past the form controller.

use serde::Serialize;
use std::collections::BTreeMap;

/// A single field value as seen by the validator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    /// Field not set
    Missing,
    /// Scalar text value
    Text(&'a str),
    /// Multi-select value
    List(&'a [String]),
}

impl FieldValue<'_> {
    fn is_blank(&self) -> bool {
        match self {
            FieldValue::Missing => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::List(items) => items.is_empty(),
        }
    }
}

/// Anything whose fields can be looked up by name
pub trait Fields {
    fn field(&self, name: &str) -> FieldValue<'_>;
}

/// A single constraint on a field
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// Must be present and non-blank
    Required,
    /// Character count bounds for text
    Length { min: usize, max: usize },
    /// Text must be one of the given values
    OneOf(&'static [&'static str]),
    /// Every list item must be one of the given values
    EachOneOf(&'static [&'static str]),
    /// Text must be an absolute http(s) URL
    Url,
    /// Item count bounds for lists
    Count { min: usize, max: usize },
}

impl Rule {
    /// Check the rule, returning a message on failure.
    ///
    /// Rules other than `Required` and `Count` pass on blank values, so
    /// optional fields only need to satisfy constraints once they are filled.
    fn check(&self, value: FieldValue<'_>) -> Option<String> {
        match (self, value) {
            (Rule::Required, v) => v.is_blank().then(|| "This field is required".to_string()),
            (Rule::Count { min, max }, FieldValue::List(_) | FieldValue::Missing) => {
                let count = match value {
                    FieldValue::List(items) => items.len(),
                    _ => 0,
                };
                if count < *min {
                    Some(format!("Select at least {}", min))
                } else if count > *max {
                    Some(format!("Select at most {}", max))
                } else {
                    None
                }
            }
            (_, v) if v.is_blank() => None,
            (Rule::Length { min, max }, FieldValue::Text(s)) => {
                let len = s.trim().chars().count();
                if len < *min {
                    Some(format!("Must be at least {} characters", min))
                } else if len > *max {
                    Some(format!("Must be at most {} characters", max))
                } else {
                    None
                }
            }
            (Rule::OneOf(allowed), FieldValue::Text(s)) => (!allowed.contains(&s))
                .then(|| format!("Must be one of: {}", allowed.join(", "))),
            (Rule::EachOneOf(allowed), FieldValue::List(items)) => items
                .iter()
                .find(|item| !allowed.contains(&item.as_str()))
                .map(|bad| format!("Unknown value '{}'", bad)),
            (Rule::Url, FieldValue::Text(s)) => {
                (!is_http_url(s)).then(|| "Must be a valid URL".to_string())
            }
            (rule, value) => Some(format!("Rule {:?} does not apply to {:?}", rule, value)),
        }
    }
}

fn is_http_url(s: &str) -> bool {
    match reqwest::Url::parse(s.trim()) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

/// Field-scoped validation errors, keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join("; ")))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

impl std::error::Error for FieldErrors {}

/// Declarative per-step validation schema
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<(&'static str, Vec<Rule>)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &'static str, rules: impl Into<Vec<Rule>>) -> Self {
        self.fields.push((name, rules.into()));
        self
    }

    /// Names of the fields this schema covers
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(name, _)| *name)
    }

    /// Validate every field, collecting all failures
    pub fn validate<T: Fields + ?Sized>(&self, target: &T) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        for (name, rules) in &self.fields {
            let value = target.field(name);
            if let Some(message) = rules.iter().find_map(|rule| rule.check(value)) {
                errors.add(*name, message);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Form {
        text: HashMap<&'static str, String>,
        lists: HashMap<&'static str, Vec<String>>,
    }

    impl Fields for Form {
        fn field(&self, name: &str) -> FieldValue<'_> {
            if let Some(v) = self.text.get(name) {
                return FieldValue::Text(v);
            }
            if let Some(v) = self.lists.get(name) {
                return FieldValue::List(v);
            }
            FieldValue::Missing
        }
    }

    fn form(text: &[(&'static str, &str)], lists: &[(&'static str, &[&str])]) -> Form {
        Form {
            text: text.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            lists: lists
                .iter()
                .map(|(k, v)| (*k, v.iter().map(|s| s.to_string()).collect()))
                .collect(),
        }
    }

    const COLORS: &[&str] = &["red", "green"];

    fn schema() -> Schema {
        Schema::new()
            .field("title", [Rule::Required, Rule::Length { min: 3, max: 10 }])
            .field("color", [Rule::OneOf(COLORS)])
            .field("link", [Rule::Url])
            .field("tags", [Rule::Count { min: 1, max: 2 }, Rule::EachOneOf(COLORS)])
    }

    #[test]
    fn test_valid_form_passes() {
        let f = form(
            &[("title", "Hello"), ("color", "red"), ("link", "https://example.com/a")],
            &[("tags", &["green"])],
        );
        assert!(schema().validate(&f).is_ok());
    }

    #[test]
    fn test_required_reports_missing_and_blank() {
        let errors = schema().validate(&form(&[("title", "   ")], &[])).unwrap_err();
        assert_eq!(errors.get("title").unwrap()[0], "This field is required");
    }

    #[test]
    fn test_optional_fields_skip_when_blank() {
        assert!(schema()
            .validate(&form(&[("title", "Hello"), ("link", "")], &[("tags", &["red"])]))
            .is_ok());
    }

    #[test]
    fn test_length_counts_characters() {
        let errors = schema()
            .validate(&form(&[("title", "ééééééééééé")], &[("tags", &["red"])]))
            .unwrap_err();
        assert_eq!(errors.get("title").unwrap()[0], "Must be at most 10 characters");
        assert!(schema()
            .validate(&form(&[("title", "ééé")], &[("tags", &["red"])]))
            .is_ok());
    }

    #[test]
    fn test_enum_membership_and_url_shape() {
        let errors = schema()
            .validate(&form(
                &[("title", "Hello"), ("color", "blue"), ("link", "ftp://example.com")],
                &[("tags", &["red", "purple"])],
            ))
            .unwrap_err();
        let fields: Vec<&str> = errors.fields().collect();
        assert_eq!(fields, vec!["color", "link", "tags"]);
        assert_eq!(errors.get("tags").unwrap()[0], "Unknown value 'purple'");
    }

    #[test]
    fn test_cardinality_limits() {
        let errors = schema()
            .validate(&form(&[("title", "Hello")], &[("tags", &["red", "green", "red"])]))
            .unwrap_err();
        assert_eq!(errors.get("tags").unwrap()[0], "Select at most 2");
    }

    #[test]
    fn test_missing_list_fails_minimum_count() {
        let errors = schema().validate(&form(&[("title", "Hello")], &[])).unwrap_err();
        assert_eq!(errors.get("tags").unwrap()[0], "Select at least 1");
    }

    #[test]
    fn test_only_first_failing_rule_reported() {
        let errors = schema().validate(&form(&[], &[])).unwrap_err();
        assert_eq!(errors.get("title").unwrap().len(), 1);
    }
}
