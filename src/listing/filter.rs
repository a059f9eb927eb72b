//! Canonical filter/sort/cursor state

use super::{ListQuery, ListingKind, QueryValue, SortDirection, SortKey};
use crate::models::ContentStatus;

/// Filter, sort and pagination state of one list view.
///
/// Every filter and sort setter reports whether it changed anything, and any
/// change sends pagination back to the first page.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState<L: ListingKind> {
    pub(super) search: String,
    pub(super) status: Option<ContentStatus>,
    pub(super) kind: Option<L::Kind>,
    pub(super) tag: Option<String>,
    pub(super) include_archived: bool,
    pub(super) sort: L::Sort,
    pub(super) direction: SortDirection,
    pub(super) cursor: Option<String>,
}

impl<L: ListingKind> Default for FilterState<L> {
    fn default() -> Self {
        let sort = L::Sort::default();
        Self {
            search: String::new(),
            status: None,
            kind: None,
            tag: None,
            include_archived: false,
            sort,
            direction: sort.default_direction(),
            cursor: None,
        }
    }
}

impl<L: ListingKind> FilterState<L> {
    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn status(&self) -> Option<ContentStatus> {
        self.status
    }

    pub fn kind(&self) -> Option<&L::Kind> {
        self.kind.as_ref()
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn include_archived(&self) -> bool {
        self.include_archived
    }

    pub fn sort(&self) -> (L::Sort, SortDirection) {
        (self.sort, self.direction)
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// True when on the first page
    pub fn is_first_page(&self) -> bool {
        self.cursor.is_none()
    }

    fn changed(&mut self, changed: bool) -> bool {
        if changed {
            self.cursor = None;
        }
        changed
    }

    /// Commit search text. Surrounding whitespace is ignored.
    pub fn set_search(&mut self, search: &str) -> bool {
        let search = search.trim();
        let changed = self.search != search;
        if changed {
            self.search = search.to_string();
        }
        self.changed(changed)
    }

    pub fn set_status(&mut self, status: Option<ContentStatus>) -> bool {
        let changed = self.status != status;
        self.status = status;
        self.changed(changed)
    }

    pub fn set_kind(&mut self, kind: Option<L::Kind>) -> bool {
        let changed = self.kind != kind;
        self.kind = kind;
        self.changed(changed)
    }

    pub fn set_tag(&mut self, tag: Option<String>) -> bool {
        let tag = tag.and_then(|t| String::parse_param(&t));
        let changed = self.tag != tag;
        self.tag = tag;
        self.changed(changed)
    }

    pub fn set_include_archived(&mut self, include: bool) -> bool {
        let changed = self.include_archived != include;
        self.include_archived = include;
        self.changed(changed)
    }

    pub fn set_sort(&mut self, sort: L::Sort, direction: SortDirection) -> bool {
        let changed = self.sort != sort || self.direction != direction;
        self.sort = sort;
        self.direction = direction;
        self.changed(changed)
    }

    /// Column-header click: flip the active column, or select a new one
    pub fn toggle_sort(&mut self, sort: L::Sort) -> bool {
        let direction = if self.sort == sort {
            self.direction.reversed()
        } else {
            sort.default_direction()
        };
        self.set_sort(sort, direction)
    }

    /// Move to the page starting at `cursor`. Filters are untouched.
    pub fn set_cursor(&mut self, cursor: Option<String>) -> bool {
        let cursor = cursor.and_then(|c| String::parse_param(&c));
        let changed = self.cursor != cursor;
        self.cursor = cursor;
        changed
    }

    /// Back to all defaults
    pub fn clear(&mut self) -> bool {
        let cleared = Self::default();
        let changed = *self != cleared;
        *self = cleared;
        changed
    }

    /// Parameters for the content API list query
    pub fn to_list_query(&self, page_size: u32) -> ListQuery {
        ListQuery {
            search: String::parse_param(&self.search),
            status: self.status,
            kind: self.kind.as_ref().map(QueryValue::to_param),
            tag: self.tag.clone(),
            include_archived: self.include_archived,
            sort_field: self.sort.api_field(),
            sort_direction: self.direction,
            first: page_size.clamp(1, 100),
            after: self.cursor.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::{NewsListing, NewsSort, VenueListing, VenueSort, VenueTypeFilter};
    use proptest::prelude::*;

    fn on_page_two() -> FilterState<NewsListing> {
        let mut state = FilterState::<NewsListing>::default();
        state.set_cursor(Some("c2".to_string()));
        state
    }

    #[test]
    fn test_defaults() {
        let state = FilterState::<VenueListing>::default();
        assert_eq!(state.sort(), (VenueSort::Name, SortDirection::Asc));
        assert!(state.is_first_page());
        assert!(!state.include_archived());
    }

    #[test]
    fn test_filter_change_resets_cursor() {
        let mut state = on_page_two();
        assert!(state.set_status(Some(ContentStatus::Approved)));
        assert!(state.is_first_page());
    }

    #[test]
    fn test_unchanged_value_keeps_cursor() {
        let mut state = on_page_two();
        assert!(!state.set_search("  "));
        assert!(!state.set_status(None));
        assert_eq!(state.cursor(), Some("c2"));
    }

    #[test]
    fn test_toggle_sort() {
        let mut state = FilterState::<NewsListing>::default();
        assert!(state.toggle_sort(NewsSort::CreatedAt));
        assert_eq!(state.sort(), (NewsSort::CreatedAt, SortDirection::Asc));

        state.set_cursor(Some("c9".to_string()));
        assert!(state.toggle_sort(NewsSort::Title));
        assert_eq!(state.sort(), (NewsSort::Title, SortDirection::Asc));
        assert!(state.is_first_page());
    }

    #[test]
    fn test_list_query_mapping() {
        let mut state = FilterState::<VenueListing>::default();
        state.set_search(" gala ");
        state.set_kind(VenueTypeFilter::parse_param("bar"));
        state.set_cursor(Some("abc".to_string()));

        let query = state.to_list_query(500);
        assert_eq!(query.search.as_deref(), Some("gala"));
        assert_eq!(query.kind.as_deref(), Some("bar"));
        assert_eq!(query.sort_field, "name");
        assert_eq!(query.first, 100);
        assert_eq!(query.after.as_deref(), Some("abc"));
    }

    #[derive(Debug, Clone)]
    enum Change {
        Search(String),
        Status(Option<ContentStatus>),
        Kind(Option<String>),
        Tag(Option<String>),
        Archived(bool),
        Sort(NewsSort, SortDirection),
        Toggle(NewsSort),
    }

    fn change_strategy() -> impl Strategy<Value = Change> {
        let status = proptest::option::of(proptest::sample::select(ContentStatus::ALL.to_vec()));
        let sort = prop_oneof![Just(NewsSort::CreatedAt), Just(NewsSort::UpdatedAt), Just(NewsSort::Title)];
        let direction = prop_oneof![Just(SortDirection::Asc), Just(SortDirection::Desc)];
        prop_oneof![
            "[a-z ]{0,6}".prop_map(Change::Search),
            status.prop_map(Change::Status),
            proptest::option::of("c[0-9]").prop_map(Change::Kind),
            proptest::option::of("t[0-9]").prop_map(Change::Tag),
            any::<bool>().prop_map(Change::Archived),
            (sort.clone(), direction).prop_map(|(s, d)| Change::Sort(s, d)),
            sort.prop_map(Change::Toggle),
        ]
    }

    fn filters_of(state: &FilterState<NewsListing>) -> FilterState<NewsListing> {
        FilterState {
            cursor: None,
            ..state.clone()
        }
    }

    proptest! {
        /// Whenever filters or sort change, the cursor is back at the first page.
        #[test]
        fn any_filter_change_resets_cursor(
            changes in proptest::collection::vec(change_strategy(), 1..12),
            cursor in "[a-z0-9]{1,8}",
        ) {
            let mut state = FilterState::<NewsListing>::default();
            for change in changes {
                state.set_cursor(Some(cursor.clone()));
                let before = filters_of(&state);
                let reported = match change {
                    Change::Search(s) => state.set_search(&s),
                    Change::Status(s) => state.set_status(s),
                    Change::Kind(k) => state.set_kind(k),
                    Change::Tag(t) => state.set_tag(t),
                    Change::Archived(a) => state.set_include_archived(a),
                    Change::Sort(s, d) => state.set_sort(s, d),
                    Change::Toggle(s) => state.toggle_sort(s),
                };
                let after = filters_of(&state);
                prop_assert_eq!(reported, before != after);
                if before != after {
                    prop_assert!(state.is_first_page());
                } else {
                    prop_assert_eq!(state.cursor(), Some(cursor.as_str()));
                }
            }
        }
    }
}
