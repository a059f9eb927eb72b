//! URL projection of [`FilterState`]
//!
//! Parsing is forgiving: unknown parameters are ignored and invalid values
//! leave their field unset. Serialization is canonical: a fixed parameter
//! order, and defaults are omitted.

use super::{FilterState, ListingKind, QueryValue, SortDirection, SortKey};
use crate::models::ContentStatus;

const SEARCH: &str = "search";
const STATUS: &str = "status";
const TAG: &str = "tag";
const ARCHIVED: &str = "archived";
const SORT: &str = "sort";
const DIRECTION: &str = "dir";
const CURSOR: &str = "cursor";

fn decode(raw: &str) -> Option<String> {
    let raw = raw.replace('+', " ");
    urlencoding::decode(&raw).ok().map(|s| s.into_owned())
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

impl<L: ListingKind> FilterState<L> {
    /// Build state from a query string, with or without the leading `?`
    pub fn from_query(query: &str) -> Self {
        let mut state = Self::default();
        let mut sort = None;
        let mut direction = None;

        for pair in query.trim_start_matches('?').split('&') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let Some(value) = decode(value) else {
                tracing::debug!(param = key, "Ignoring undecodable query parameter");
                continue;
            };

            match key {
                SEARCH => state.search = value.trim().to_string(),
                STATUS => state.status = ContentStatus::parse_param(&value),
                TAG => state.tag = String::parse_param(&value),
                ARCHIVED => state.include_archived = parse_flag(&value),
                SORT => sort = L::Sort::parse_param(&value),
                DIRECTION => direction = SortDirection::from_str(&value),
                CURSOR => state.cursor = String::parse_param(&value),
                k if k == L::KIND_PARAM => state.kind = L::Kind::parse_param(&value),
                _ => {}
            }
        }

        if let Some(sort) = sort {
            state.sort = sort;
            state.direction = sort.default_direction();
        }
        if let Some(direction) = direction {
            state.direction = direction;
        }
        state
    }

    /// Canonical query string without the leading `?`; empty for defaults
    pub fn to_query(&self) -> String {
        let mut params: Vec<(&str, String)> = Vec::new();

        if !self.search.is_empty() {
            params.push((SEARCH, self.search.clone()));
        }
        if let Some(status) = self.status {
            params.push((STATUS, status.to_param()));
        }
        if let Some(kind) = &self.kind {
            params.push((L::KIND_PARAM, kind.to_param()));
        }
        if let Some(tag) = &self.tag {
            params.push((TAG, tag.clone()));
        }
        if self.include_archived {
            params.push((ARCHIVED, "true".to_string()));
        }
        let default_sort = L::Sort::default();
        if self.sort != default_sort {
            params.push((SORT, self.sort.to_param()));
        }
        if self.direction != self.sort.default_direction() {
            params.push((DIRECTION, self.direction.as_str().to_string()));
        }
        if let Some(cursor) = &self.cursor {
            params.push((CURSOR, cursor.clone()));
        }

        params
            .into_iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(&value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::{NewsListing, NewsSort, VenueListing, VenueSort};
    use proptest::prelude::*;

    #[test]
    fn test_status_and_search_from_url() {
        let state = FilterState::<NewsListing>::from_query("status=APPROVED&search=gala");
        assert_eq!(state.status(), Some(ContentStatus::Approved));
        assert_eq!(state.search(), "gala");
        assert!(state.is_first_page());

        // Canonical order puts search first
        assert_eq!(state.to_query(), "search=gala&status=APPROVED");
    }

    #[test]
    fn test_defaults_serialize_to_empty() {
        assert_eq!(FilterState::<NewsListing>::default().to_query(), "");
        assert_eq!(FilterState::<VenueListing>::from_query("?").to_query(), "");
    }

    #[test]
    fn test_invalid_values_are_unset() {
        let state =
            FilterState::<VenueListing>::from_query("status=BOGUS&type=spaceship&sort=rating&dir=up&archived=maybe");
        assert_eq!(state, FilterState::<VenueListing>::default());
    }

    #[test]
    fn test_decoding() {
        let state = FilterState::<NewsListing>::from_query("search=summer+gala%20night&category=c%2F1");
        assert_eq!(state.search(), "summer gala night");
        assert_eq!(state.kind().map(String::as_str), Some("c/1"));
        assert_eq!(state.to_query(), "search=summer%20gala%20night&category=c%2F1");
    }

    #[test]
    fn test_sort_and_direction() {
        let state = FilterState::<VenueListing>::from_query("sort=createdAt");
        assert_eq!(state.sort(), (VenueSort::CreatedAt, SortDirection::Desc));
        assert_eq!(state.to_query(), "sort=createdAt");

        let state = FilterState::<NewsListing>::from_query("dir=asc");
        assert_eq!(state.sort(), (NewsSort::CreatedAt, SortDirection::Asc));
        assert_eq!(state.to_query(), "dir=asc");
    }

    #[test]
    fn test_cursor_and_unknown_params() {
        let state = FilterState::<NewsListing>::from_query("utm_source=mail&cursor=YXJ0OjQ%3D&archived=true");
        assert_eq!(state.cursor(), Some("YXJ0OjQ="));
        assert!(state.include_archived());
        assert_eq!(state.to_query(), "archived=true&cursor=YXJ0OjQ%3D");
    }

    proptest! {
        #[test]
        fn canonical_query_is_stable(
            search in "[a-zA-Z0-9 &=%+]{0,12}",
            status in proptest::option::of(proptest::sample::select(ContentStatus::ALL.to_vec())),
            tag in proptest::option::of("[a-z0-9-]{1,6}"),
            archived in any::<bool>(),
            cursor in proptest::option::of("[A-Za-z0-9=/+]{1,10}"),
        ) {
            let mut state = FilterState::<NewsListing>::default();
            state.set_search(&search);
            state.set_status(status);
            state.set_tag(tag);
            state.set_include_archived(archived);
            state.set_cursor(cursor);

            let query = state.to_query();
            let parsed = FilterState::<NewsListing>::from_query(&query);
            prop_assert_eq!(&parsed, &state);
            prop_assert_eq!(parsed.to_query(), query);
        }
    }
}
