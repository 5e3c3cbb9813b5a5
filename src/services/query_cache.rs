//! Query cache
//!
//! Listing results keyed by the full [`QueryParams`] value. Each key holds
//! either a resolved result or a single in-flight fetch; callers asking for a
//! key that is already being fetched attach to the same shared handle instead
//! of issuing another request.
//!
//! Fetches run as spawned tasks, so a result still lands in its own entry
//! when nobody is waiting for it any more.

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::CatalogError;
use crate::models::product::ListingResult;
use crate::models::query::QueryParams;

/// Results older than this are refetched on next read (5 minutes)
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(300);

pub type FetchOutcome = Result<Arc<ListingResult>, CatalogError>;

#[derive(Debug, Clone)]
pub struct CacheOptions {
    pub stale_after: Duration,
    /// LRU bound on resolved entries; in-flight fetches are never evicted
    pub max_entries: Option<usize>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            stale_after: DEFAULT_STALE_AFTER,
            max_entries: None,
        }
    }
}

/// Shared handle to an in-flight fetch
///
/// Clones refer to the same underlying request and all resolve to the same
/// outcome.
#[derive(Clone)]
pub struct PendingFetch {
    id: u64,
    params: QueryParams,
    future: Shared<BoxFuture<'static, FetchOutcome>>,
}

impl PendingFetch {
    pub async fn wait(self) -> FetchOutcome {
        self.future.await
    }

    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    /// True when both handles belong to the same request
    #[cfg(test)]
    pub fn same_fetch(&self, other: &PendingFetch) -> bool {
        self.id == other.id
    }
}

impl std::fmt::Debug for PendingFetch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingFetch")
            .field("id", &self.id)
            .field("params", &self.params)
            .finish()
    }
}

/// Result of a cache read
#[derive(Debug, Clone)]
pub enum CacheLookup {
    Fresh(Arc<ListingResult>),
    /// Past the staleness window: usable as a placeholder, should be refetched
    Stale(Arc<ListingResult>),
    Pending {
        fetch: PendingFetch,
        /// Previous value when this fetch is a refresh
        placeholder: Option<Arc<ListingResult>>,
    },
    Miss,
}

enum Slot {
    Resolved {
        result: Arc<ListingResult>,
        fetched_at: Instant,
        last_used: u64,
    },
    Pending {
        fetch: PendingFetch,
        placeholder: Option<Arc<ListingResult>>,
    },
}

#[derive(Default)]
struct CacheInner {
    slots: HashMap<QueryParams, Slot>,
    /// Logical clock for LRU ordering
    tick: u64,
    next_fetch_id: u64,
}

impl CacheInner {
    fn touch(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn resolved_count(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| matches!(slot, Slot::Resolved { .. }))
            .count()
    }

    fn evict_lru(&mut self, max_entries: usize) {
        while self.resolved_count() > max_entries {
            let oldest = self
                .slots
                .iter()
                .filter_map(|(key, slot)| match slot {
                    Slot::Resolved { last_used, .. } => Some((key, *last_used)),
                    Slot::Pending { .. } => None,
                })
                .min_by_key(|(_, last_used)| *last_used)
                .map(|(key, _)| key.clone());

            match oldest {
                Some(key) => {
                    debug!(skip = key.skip(), search = key.search_term(), "Evicting least recently used entry");
                    self.slots.remove(&key);
                }
                None => break,
            }
        }
    }
}

/// Owned listing cache, cheap to clone as a handle
#[derive(Clone, Default)]
pub struct QueryCache {
    inner: Arc<Mutex<CacheInner>>,
    options: CacheOptions,
}

impl QueryCache {
    pub fn new(options: CacheOptions) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheInner::default())),
            options,
        }
    }

    pub fn get(&self, params: &QueryParams) -> CacheLookup {
        let mut inner = self.inner.lock();
        let now = inner.touch();

        match inner.slots.get_mut(params) {
            Some(Slot::Resolved {
                result,
                fetched_at,
                last_used,
            }) => {
                *last_used = now;
                if fetched_at.elapsed() >= self.options.stale_after {
                    debug!(skip = params.skip(), search = params.search_term(), "Cache entry stale");
                    CacheLookup::Stale(Arc::clone(result))
                } else {
                    debug!(skip = params.skip(), search = params.search_term(), "Cache hit");
                    CacheLookup::Fresh(Arc::clone(result))
                }
            }
            Some(Slot::Pending { fetch, placeholder }) => CacheLookup::Pending {
                fetch: fetch.clone(),
                placeholder: placeholder.clone(),
            },
            None => CacheLookup::Miss,
        }
    }

    /// Start fetching `params`, or join the fetch already in flight
    ///
    /// `fetch` is only invoked when no fetch for an equal key is outstanding.
    /// It runs on a spawned task, so this must be called inside a tokio
    /// runtime. A resolved entry being refreshed stays visible as the
    /// placeholder of the pending slot.
    pub fn begin_fetch<F, Fut>(&self, params: &QueryParams, fetch: F) -> PendingFetch
    where
        F: FnOnce(QueryParams) -> Fut + Send + 'static,
        Fut: Future<Output = Result<ListingResult, CatalogError>> + Send + 'static,
    {
        let mut inner = self.inner.lock();

        let placeholder = match inner.slots.get(params) {
            Some(Slot::Pending {
                fetch: in_flight, ..
            }) => {
                debug!(skip = params.skip(), search = params.search_term(), "Joining in-flight fetch");
                return in_flight.clone();
            }
            Some(Slot::Resolved { result, .. }) => Some(Arc::clone(result)),
            None => None,
        };

        inner.next_fetch_id += 1;
        let id = inner.next_fetch_id;

        let key = params.clone();
        let cache = Arc::clone(&self.inner);
        let max_entries = self.options.max_entries;
        let task = tokio::spawn(async move {
            let outcome = fetch(key.clone()).await.map(Arc::new);
            complete(&cache, &key, id, &outcome, max_entries);
            outcome
        });

        let key = params.clone();
        let cache = Arc::clone(&self.inner);
        let future = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    let outcome = Err(CatalogError::network(format!(
                        "fetch task failed: {}",
                        join_error
                    )));
                    complete(&cache, &key, id, &outcome, max_entries);
                    outcome
                }
            }
        }
        .boxed()
        .shared();

        let pending = PendingFetch {
            id,
            params: params.clone(),
            future,
        };
        inner.slots.insert(
            params.clone(),
            Slot::Pending {
                fetch: pending.clone(),
                placeholder,
            },
        );
        pending
    }

    /// Fresh result for `params`, fetching (or joining a fetch) otherwise
    pub async fn get_or_fetch<F, Fut>(&self, params: &QueryParams, fetch: F) -> FetchOutcome
    where
        F: FnOnce(QueryParams) -> Fut + Send + 'static,
        Fut: Future<Output = Result<ListingResult, CatalogError>> + Send + 'static,
    {
        match self.get(params) {
            CacheLookup::Fresh(result) => Ok(result),
            CacheLookup::Pending { fetch: pending, .. } => pending.wait().await,
            CacheLookup::Stale(_) | CacheLookup::Miss => self.begin_fetch(params, fetch).wait().await,
        }
    }

    /// Drop the resolved entry for `params` so the next read is a miss
    ///
    /// An in-flight fetch for the key is left alone.
    pub fn invalidate(&self, params: &QueryParams) -> bool {
        let mut inner = self.inner.lock();
        if matches!(inner.slots.get(params), Some(Slot::Resolved { .. })) {
            inner.slots.remove(params);
            return true;
        }
        false
    }

    /// Remove every entry; outstanding fetches finish without storing
    pub fn clear(&self) {
        self.inner.lock().slots.clear();
    }

    /// Remove resolved entries past the staleness window
    pub fn purge_stale(&self) -> usize {
        let stale_after = self.options.stale_after;
        let mut inner = self.inner.lock();
        let before = inner.slots.len();
        inner.slots.retain(|_, slot| match slot {
            Slot::Resolved { fetched_at, .. } => fetched_at.elapsed() < stale_after,
            Slot::Pending { .. } => true,
        });
        before - inner.slots.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Settle the slot owned by fetch `id`
///
/// A slot that was cleared or replaced since the fetch started is left as is.
fn complete(
    cache: &Mutex<CacheInner>,
    key: &QueryParams,
    id: u64,
    outcome: &FetchOutcome,
    max_entries: Option<usize>,
) {
    let mut inner = cache.lock();

    let owned = matches!(
        inner.slots.get(key),
        Some(Slot::Pending { fetch, .. }) if fetch.id == id
    );
    if !owned {
        debug!(skip = key.skip(), search = key.search_term(), "Fetch finished for a released slot");
        return;
    }

    match outcome {
        Ok(result) => {
            let last_used = inner.touch();
            inner.slots.insert(
                key.clone(),
                Slot::Resolved {
                    result: Arc::clone(result),
                    fetched_at: Instant::now(),
                    last_used,
                },
            );
            if let Some(max) = max_entries {
                inner.evict_lru(max);
            }
        }
        Err(e) => {
            // Nothing partial is kept, the next read is a clean miss
            warn!(skip = key.skip(), search = key.search_term(), error = %e, "Fetch failed");
            inner.slots.remove(key);
        }
    }
}
