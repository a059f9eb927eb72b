//! List view controller
//!
//! [`ListView`] owns the canonical [`FilterState`] of one list view. The URL is
//! a derived projection: a background task rewrites it with history-replace
//! some time after the state changes, so a burst of setter calls results in a
//! single write. Search input goes through a [`Debouncer`] before it reaches
//! the canonical state.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{Debouncer, FilterState, ListQuery, ListingKind, SortDirection};
use crate::config::ListingConfig;
use crate::models::{ContentStatus, PageInfo};

/// Route/navigation layer as seen by a list view
pub trait Navigator: Send + Sync {
    /// Current query string, without the leading `?`
    fn current_query(&self) -> String;

    /// Replace the current history entry's query string
    fn replace_query(&self, query: &str);
}

struct Shared<L: ListingKind> {
    state: watch::Sender<FilterState<L>>,
    /// Cursors of the pages before the current one
    history: Mutex<Vec<Option<String>>>,
}

impl<L: ListingKind> Shared<L> {
    /// Apply a filter change; a real change also forgets page history
    fn update(&self, change: impl FnOnce(&mut FilterState<L>) -> bool) -> bool {
        let changed = self.state.send_if_modified(change);
        if changed {
            self.history.lock().unwrap_or_else(|e| e.into_inner()).clear();
        }
        changed
    }
}

pub struct ListView<L: ListingKind> {
    shared: Arc<Shared<L>>,
    search: Debouncer<String>,
    search_input: String,
    page_size: u32,
    url_sync: JoinHandle<()>,
}

impl<L: ListingKind> ListView<L> {
    /// Seed state from the navigator's current URL and start URL sync
    pub fn mount(navigator: Arc<dyn Navigator>, config: &ListingConfig) -> Self {
        let initial = FilterState::<L>::from_query(&navigator.current_query());
        let search_input = initial.search().to_string();
        let (state, _) = watch::channel(initial);
        let shared = Arc::new(Shared {
            state,
            history: Mutex::new(Vec::new()),
        });

        let url_sync = tokio::spawn(sync_url(
            shared.state.subscribe(),
            navigator,
            config.url_sync_delay(),
        ));

        let committer = shared.clone();
        let search = Debouncer::spawn(config.search_debounce(), move |text: String| {
            if committer.update(|state| state.set_search(&text)) {
                tracing::debug!(search = %text, "Committed search");
            }
        });

        Self {
            shared,
            search,
            search_input,
            page_size: config.page_size,
            url_sync,
        }
    }

    /// Snapshot of the canonical state
    pub fn filters(&self) -> FilterState<L> {
        self.shared.state.borrow().clone()
    }

    /// Watch the canonical state, e.g. to refetch on change
    pub fn subscribe(&self) -> watch::Receiver<FilterState<L>> {
        self.shared.state.subscribe()
    }

    /// List request for the current state
    pub fn list_query(&self) -> ListQuery {
        self.shared.state.borrow().to_list_query(self.page_size)
    }

    /// Text shown in the search box, ahead of the committed search
    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    /// Keystroke in the search box
    pub fn type_search(&mut self, text: impl Into<String>) {
        self.search_input = text.into();
        self.search.push(self.search_input.clone());
    }

    pub fn set_status(&self, status: Option<ContentStatus>) -> bool {
        self.shared.update(|state| state.set_status(status))
    }

    pub fn set_kind(&self, kind: Option<L::Kind>) -> bool {
        self.shared.update(|state| state.set_kind(kind))
    }

    pub fn set_tag(&self, tag: Option<String>) -> bool {
        self.shared.update(|state| state.set_tag(tag))
    }

    pub fn set_include_archived(&self, include: bool) -> bool {
        self.shared.update(|state| state.set_include_archived(include))
    }

    pub fn set_sort(&self, sort: L::Sort, direction: SortDirection) -> bool {
        self.shared.update(|state| state.set_sort(sort, direction))
    }

    pub fn toggle_sort(&self, sort: L::Sort) -> bool {
        self.shared.update(|state| state.toggle_sort(sort))
    }

    /// Reset every filter, including the search box
    pub fn clear(&mut self) -> bool {
        self.search_input.clear();
        // Supersede a keystroke still waiting in the debouncer
        self.search.push(String::new());
        self.shared.update(|state| state.clear())
    }

    /// Advance past the page described by `page_info`
    pub fn next_page(&self, page_info: &PageInfo) -> bool {
        if !page_info.has_next_page {
            return false;
        }
        let Some(next) = page_info.end_cursor.clone() else {
            return false;
        };
        let current = self.shared.state.borrow().cursor().map(str::to_string);
        let moved = self.shared.state.send_if_modified(|state| state.set_cursor(Some(next)));
        if moved {
            self.shared
                .history
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(current);
        }
        moved
    }

    pub fn has_previous_page(&self) -> bool {
        !self.shared.state.borrow().is_first_page()
    }

    /// Go back one page; without history this is the first page
    pub fn previous_page(&self) -> bool {
        let previous = self
            .shared
            .history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop()
            .flatten();
        self.shared
            .state
            .send_if_modified(|state| state.set_cursor(previous))
    }
}

impl<L: ListingKind> Drop for ListView<L> {
    fn drop(&mut self) {
        self.url_sync.abort();
    }
}

/// Project state changes onto the URL, one write per settled batch
async fn sync_url<L: ListingKind>(
    mut rx: watch::Receiver<FilterState<L>>,
    navigator: Arc<dyn Navigator>,
    delay: Duration,
) {
    while rx.changed().await.is_ok() {
        tokio::time::sleep(delay).await;
        let query = rx.borrow_and_update().to_query();
        if navigator.current_query() != query {
            tracing::debug!(query = %query, "Replacing URL query");
            navigator.replace_query(&query);
        }
    }
}
