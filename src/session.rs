use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::catalog::{CatalogApi, CatalogError, SearchPage};
use crate::models::{MovieSummary, TypeFilter};
use crate::pagination::{self, PageItem, PAGE_SIZE};

pub const DEFAULT_QUERY: &str = "movie";
pub const PROMPT_FOR_TERM: &str = "Please enter a search term";
pub const NO_RESULTS_FOR_TERM: &str = "No movies found. Please try a different search term.";
pub const NO_RESULTS_FOR_FILTER: &str = "No results found for the selected filter.";
pub const DEFAULT_LOAD_FAILED: &str =
    "Failed to load default movies. Please try searching manually.";
pub const INVALID_PAGE: &str = "Page numbers start at 1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchSessionState {
    pub query_term: String,
    pub type_filter: TypeFilter,
    pub current_page: u32,
    pub page_size: u32,
    pub results: Vec<MovieSummary>,
    pub total_results: u64,
    pub is_loading: bool,
    pub error_message: String,
}

impl Default for SearchSessionState {
    fn default() -> Self {
        Self {
            query_term: String::new(),
            type_filter: TypeFilter::All,
            current_page: 1,
            page_size: PAGE_SIZE,
            results: Vec::new(),
            total_results: 0,
            is_loading: false,
            error_message: String::new(),
        }
    }
}

impl SearchSessionState {
    pub fn total_pages(&self) -> u32 {
        pagination::total_pages(self.total_results, self.page_size)
    }

    fn begin_request(&mut self) {
        self.is_loading = true;
        self.error_message.clear();
    }

    fn fail(&mut self, message: String) {
        self.error_message = message;
        self.results.clear();
        self.total_results = 0;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    #[serde(flatten)]
    pub state: SearchSessionState,
    pub total_pages: u32,
    pub pages: Vec<PageItem>,
    pub has_previous: bool,
    pub has_next: bool,
}

impl From<SearchSessionState> for SessionSnapshot {
    fn from(state: SearchSessionState) -> Self {
        let total_pages = state.total_pages();
        let current = state.current_page;
        Self {
            pages: pagination::page_window(current, total_pages),
            has_previous: pagination::has_previous(current),
            has_next: pagination::has_next(current, total_pages),
            total_pages,
            state,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentOutcome {
    Applied,
    // Failed a local guard, no catalog call.
    Rejected,
    Skipped,
    // A newer intent was issued while this one was in flight.
    Superseded,
}

// Every catalog-bound intent takes the next sequence number. Only the
// response to the latest one is applied.
#[derive(Default)]
struct Inner {
    state: SearchSessionState,
    latest_request: u64,
}

impl Inner {
    fn issue(&mut self) -> u64 {
        self.latest_request += 1;
        self.latest_request
    }
}

#[derive(Debug, Clone, Copy)]
enum Branch {
    Initial,
    Term,
    Filter,
    Page(u32),
}

pub struct SearchSession {
    catalog: Arc<dyn CatalogApi>,
    inner: Mutex<Inner>,
}

impl SearchSession {
    pub fn new(catalog: Arc<dyn CatalogApi>) -> Self {
        Self {
            catalog,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn state(&self) -> SearchSessionState {
        self.lock().state.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state().into()
    }

    pub async fn initialize(&self) -> IntentOutcome {
        let seq = {
            let mut inner = self.lock();
            let state = &mut inner.state;
            state.query_term = DEFAULT_QUERY.to_string();
            state.type_filter = TypeFilter::All;
            state.current_page = 1;
            state.begin_request();
            inner.issue()
        };
        info!("Loading default listing for '{}'", DEFAULT_QUERY);
        let response = self.catalog.search(DEFAULT_QUERY, TypeFilter::All, 1).await;
        self.complete(seq, Branch::Initial, response)
    }

    pub async fn search(&self, term: &str) -> IntentOutcome {
        let (seq, filter) = {
            let mut inner = self.lock();
            let state = &mut inner.state;
            if term.trim().is_empty() {
                state.error_message = PROMPT_FOR_TERM.to_string();
                return IntentOutcome::Rejected;
            }
            state.query_term = term.to_string();
            state.current_page = 1;
            state.begin_request();
            state.results.clear();
            let filter = state.type_filter;
            (inner.issue(), filter)
        };
        info!(filter = ?filter, "Searching for '{}'", term);
        let response = self.catalog.search(term, filter, 1).await;
        self.complete(seq, Branch::Term, response)
    }

    pub async fn change_filter(&self, filter: TypeFilter) -> IntentOutcome {
        let (seq, term) = {
            let mut inner = self.lock();
            let state = &mut inner.state;
            state.type_filter = filter;
            state.current_page = 1;
            state.begin_request();
            if state.query_term.is_empty() {
                state.is_loading = false;
                return IntentOutcome::Skipped;
            }
            let term = state.query_term.clone();
            (inner.issue(), term)
        };
        info!(filter = ?filter, "Filter changed, re-running '{}'", term);
        let response = self.catalog.search(&term, filter, 1).await;
        self.complete(seq, Branch::Filter, response)
    }

    // The page is not checked against the last known total.
    pub async fn change_page(&self, page: u32) -> IntentOutcome {
        let (seq, term, filter) = {
            let mut inner = self.lock();
            let state = &mut inner.state;
            if state.query_term.is_empty() {
                return IntentOutcome::Skipped;
            }
            if page == 0 {
                state.error_message = INVALID_PAGE.to_string();
                return IntentOutcome::Rejected;
            }
            state.begin_request();
            let term = state.query_term.clone();
            let filter = state.type_filter;
            (inner.issue(), term, filter)
        };
        debug!(page, "Loading page {} of '{}'", page, term);
        let response = self.catalog.search(&term, filter, page).await;
        self.complete(seq, Branch::Page(page), response)
    }

    fn complete(
        &self,
        seq: u64,
        branch: Branch,
        response: Result<SearchPage, CatalogError>,
    ) -> IntentOutcome {
        let mut inner = self.lock();
        if seq != inner.latest_request {
            debug!(
                seq,
                latest = inner.latest_request,
                "Discarding response to a superseded request"
            );
            return IntentOutcome::Superseded;
        }
        let state = &mut inner.state;
        match (branch, response) {
            (Branch::Page(page), Ok(found)) => {
                state.results = found.results;
                state.current_page = page;
            }
            (Branch::Page(page), Err(e)) => {
                warn!(page, "Page load failed: {}", e);
                state.error_message = e.to_string();
            }
            (Branch::Initial, Ok(found)) => {
                state.results = found.results;
                state.total_results = found.total_results;
            }
            (Branch::Initial, Err(e)) => {
                warn!("Default listing failed: {}", e);
                state.fail(DEFAULT_LOAD_FAILED.to_string());
            }
            (Branch::Term | Branch::Filter, Ok(found)) => {
                if found.results.is_empty() {
                    let message = match branch {
                        Branch::Filter => NO_RESULTS_FOR_FILTER,
                        _ => NO_RESULTS_FOR_TERM,
                    };
                    state.results.clear();
                    state.total_results = 0;
                    state.error_message = message.to_string();
                } else {
                    state.results = found.results;
                    state.total_results = found.total_results;
                }
            }
            (Branch::Term | Branch::Filter, Err(e)) => {
                warn!("Search for '{}' failed: {}", state.query_term, e);
                state.fail(e.to_string());
            }
        }
        state.is_loading = false;
        debug!(
            results = state.results.len(),
            total = state.total_results,
            page = state.current_page,
            "Search state updated"
        );
        IntentOutcome::Applied
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
