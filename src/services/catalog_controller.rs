//! Catalog Controller
//!
//! Glue between the presentation layer and the data layer. Callbacks mutate
//! the [`BrowseState`], the resulting [`QueryParams`] are looked up in the
//! [`QueryCache`] and missing pages are fetched through a [`ProductSource`].
//! Every change is published as a [`CatalogView`] on a watch channel.
//!
//! The published view always belongs to the *current* params. A fetch that
//! completes after the user moved on still fills its own cache entry, but its
//! result is not shown.

use chrono::Utc;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::CatalogConfig;
use crate::error::CatalogError;
use crate::models::product::{Category, ListingResult};
use crate::models::query::{QueryParams, SortField, SortOrder};
use crate::models::view::{CatalogView, PageIndicator};
use crate::services::browse_state::BrowseState;
use crate::services::catalog_client::{CatalogClient, ProductSource};
use crate::services::debounce::Debouncer;
use crate::services::pagination;
use crate::services::query_cache::{CacheLookup, CacheOptions, PendingFetch, QueryCache};

/// Presentation-facing handle, cheap to clone
#[derive(Clone)]
pub struct CatalogController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    source: Arc<dyn ProductSource>,
    cache: QueryCache,
    state: Mutex<BrowseState>,
    view_tx: watch::Sender<CatalogView>,
    search_debouncer: Debouncer<String>,
}

impl CatalogController {
    pub fn new(
        source: Arc<dyn ProductSource>,
        cache: QueryCache,
        page_size: u32,
        search_debounce: Duration,
    ) -> Result<Self, CatalogError> {
        let state = BrowseState::new(page_size)?;
        let (view_tx, _) = watch::channel(CatalogView::loading(state.params()));

        let inner = Arc::new_cyclic(|weak: &Weak<ControllerInner>| {
            let weak = weak.clone();
            let search_debouncer = Debouncer::new(search_debounce, move |term: String| {
                if let Some(inner) = weak.upgrade() {
                    inner.apply_search(&term);
                }
            });

            ControllerInner {
                source,
                cache,
                state: Mutex::new(state),
                view_tx,
                search_debouncer,
            }
        });

        Ok(Self { inner })
    }

    /// Controller backed by the HTTP client and a fresh cache
    pub fn from_config(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let client = CatalogClient::from_config(config)?;
        let cache = QueryCache::new(CacheOptions {
            stale_after: config.stale_after,
            max_entries: config.cache_max_entries,
        });
        Self::new(
            Arc::new(client),
            cache,
            config.page_size,
            config.search_debounce,
        )
    }

    /// Load the first page
    pub fn start(&self) {
        let params = self.inner.state.lock().params();
        info!(limit = params.limit(), "Starting catalog controller");
        self.inner.load(params);
    }

    pub fn subscribe(&self) -> watch::Receiver<CatalogView> {
        self.inner.view_tx.subscribe()
    }

    /// Latest published view
    pub fn view(&self) -> CatalogView {
        self.inner.view_tx.borrow().clone()
    }

    pub fn cache(&self) -> &QueryCache {
        &self.inner.cache
    }

    pub fn params(&self) -> QueryParams {
        self.inner.state.lock().params()
    }

    pub fn current_page(&self) -> u32 {
        self.inner.state.lock().current_page()
    }

    pub fn total_pages(&self) -> Option<u32> {
        self.inner.state.lock().total_pages()
    }

    pub fn pagination_window(&self) -> Vec<PageIndicator> {
        self.inner.view_tx.borrow().pagination_window.clone()
    }

    /// Search box input; propagated once typing pauses
    pub fn on_search_change(&self, text: &str) {
        self.inner.search_debouncer.input(text.to_string());
    }

    pub fn on_sort_change(&self, field: SortField) {
        let params = self.inner.state.lock().set_sort_field(field);
        self.inner.load(params);
    }

    pub fn on_order_change(&self, order: SortOrder) {
        let params = self.inner.state.lock().set_sort_order(order);
        self.inner.load(params);
    }

    /// Selecting a category clears the search term and drops search input
    /// still waiting out the debounce
    pub fn on_category_change(&self, category: Option<String>) {
        if category.is_some() {
            self.inner.search_debouncer.cancel();
        }
        let params = self.inner.state.lock().set_category(category);
        self.inner.load(params);
    }

    /// Returns false when `page` is out of range and was ignored
    pub fn on_page_change(&self, page: u32) -> bool {
        let moved = self.inner.state.lock().set_page(page);
        self.follow(moved, "page")
    }

    pub fn on_prev_page(&self) -> bool {
        let moved = self.inner.state.lock().prev_page();
        self.follow(moved, "prev")
    }

    pub fn on_next_page(&self) -> bool {
        let moved = self.inner.state.lock().next_page();
        self.follow(moved, "next")
    }

    fn follow(&self, moved: Option<QueryParams>, action: &str) -> bool {
        match moved {
            Some(params) => {
                self.inner.load(params);
                true
            }
            None => {
                debug!(action, "Page change rejected");
                false
            }
        }
    }

    /// Re-issue the fetch for the current params (the "Try Again" action)
    pub fn retry(&self) {
        let params = self.params();
        info!(skip = params.skip(), search = params.search_term(), "Retrying current query");
        self.inner.load(params);
    }

    /// Drop the cached current page and fetch it again
    ///
    /// Other pages past the staleness window are evicted as well.
    pub fn refresh(&self) {
        let params = self.params();
        self.inner.cache.invalidate(&params);
        let purged = self.inner.cache.purge_stale();
        if purged > 0 {
            debug!(purged, "Purged stale cache entries");
        }
        self.inner.load(params);
    }

    pub async fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        self.inner.source.fetch_categories().await
    }

    /// Cancel pending debounced input before the presentation layer goes away
    pub fn shutdown(&self) {
        if self.inner.search_debouncer.is_pending() {
            debug!("Dropping pending search input");
        }
        self.inner.search_debouncer.cancel();
    }
}

impl ControllerInner {
    fn apply_search(self: &Arc<Self>, term: &str) {
        let params = self.state.lock().set_search_term(term);
        debug!(search = params.search_term(), "Search term settled");
        self.load(params);
    }

    fn load(self: &Arc<Self>, params: QueryParams) {
        match self.cache.get(&params) {
            CacheLookup::Fresh(result) => {
                self.publish_result(&params, &result, false);
            }
            CacheLookup::Stale(result) => {
                if self.publish_result(&params, &result, true) {
                    let pending = self.begin_fetch(&params);
                    self.watch_fetch(pending);
                }
            }
            CacheLookup::Pending { fetch, placeholder } => {
                self.publish_loading(&params, placeholder.as_deref());
                self.watch_fetch(fetch);
            }
            CacheLookup::Miss => {
                self.publish_loading(&params, None);
                let pending = self.begin_fetch(&params);
                self.watch_fetch(pending);
            }
        }
    }

    fn begin_fetch(&self, params: &QueryParams) -> PendingFetch {
        let source = Arc::clone(&self.source);
        self.cache
            .begin_fetch(params, move |params| async move { source.fetch(&params).await })
    }

    fn watch_fetch(self: &Arc<Self>, pending: PendingFetch) {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let params = pending.params().clone();
            let outcome = pending.wait().await;

            let Some(inner) = weak.upgrade() else {
                return;
            };

            match outcome {
                Ok(result) => {
                    inner.publish_result(&params, &result, false);
                }
                Err(e) => inner.publish_error(&params, &e),
            }
        });
    }

    /// Publish `result` if `params` is still current
    ///
    /// Returns false when the response was discarded, or when the reported
    /// total pushed the current page out of range and a clamped page load
    /// took over.
    fn publish_result(
        self: &Arc<Self>,
        params: &QueryParams,
        result: &ListingResult,
        is_loading: bool,
    ) -> bool {
        let mut state = self.state.lock();
        if state.params() != *params {
            debug!(
                skip = params.skip(),
                search = params.search_term(),
                "Discarding response for superseded query"
            );
            return false;
        }

        if let Some(clamped) = state.apply_total(result.total_count) {
            drop(state);
            info!(page = clamped.page(), "Current page out of range, clamping");
            self.load(clamped);
            return false;
        }

        let view = render(&state, Some(result), is_loading, None);
        drop(state);
        self.view_tx.send_replace(view);
        true
    }

    fn publish_loading(&self, params: &QueryParams, placeholder: Option<&ListingResult>) {
        let state = self.state.lock();
        if state.params() != *params {
            return;
        }
        let view = render(&state, placeholder, true, None);
        drop(state);
        self.view_tx.send_replace(view);
    }

    fn publish_error(&self, params: &QueryParams, error: &CatalogError) {
        let state = self.state.lock();
        if state.params() != *params {
            debug!(error = %error, "Ignoring error for superseded query");
            return;
        }
        warn!(skip = params.skip(), search = params.search_term(), error = %error, "Catalog query failed");
        let view = render(&state, None, false, Some(error));
        drop(state);
        self.view_tx.send_replace(view);
    }
}

fn render(
    state: &BrowseState,
    listing: Option<&ListingResult>,
    is_loading: bool,
    error: Option<&CatalogError>,
) -> CatalogView {
    let current_page = state.current_page();
    let total_pages = state.total_pages();
    // Until the total is known the window only reaches the current page
    let window_total = total_pages.unwrap_or(current_page);

    CatalogView {
        items: listing.map(|l| l.items.clone()).unwrap_or_default(),
        total_count: listing.map(|l| l.total_count).unwrap_or(0),
        is_loading,
        error: error.map(CatalogError::kind),
        error_message: error.map(|e| e.to_string()),
        current_page,
        total_pages,
        pagination_window: pagination::compute_window(
            pagination::clamp_page(current_page, window_total),
            window_total,
        ),
        has_prev: state.has_prev(),
        has_next: state.has_next(),
        params: state.params(),
        updated_at: listing.map(|_| Utc::now()),
    }
}
