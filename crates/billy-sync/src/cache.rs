//! TTL snapshot cache with in-flight fetch coalescing.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tracing::{debug, warn};

use crate::api::DeviceApi;
use crate::errors::ApiError;
use crate::locks::lock_or_recover;
use crate::snapshot::{ConfigSnapshot, Snapshot, StatusSnapshot};

type FetchFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;
type SharedFetch<T> = Shared<BoxFuture<'static, Result<Arc<Snapshot<T>>, ApiError>>>;

/// Result of [`SnapshotCache::get`]. Always carries a snapshot.
#[derive(Debug, Clone)]
pub enum CacheRead<T> {
    /// Served from cache without a fetch.
    Cached(Arc<Snapshot<T>>),
    /// A fetch ran (or was joined) and succeeded.
    Fetched(Arc<Snapshot<T>>),
    /// The fetch failed; the previous snapshot is returned unchanged.
    Stale {
        snapshot: Arc<Snapshot<T>>,
        error: ApiError,
    },
    /// The fetch failed and nothing was cached yet; carries a default value.
    Empty {
        snapshot: Arc<Snapshot<T>>,
        error: ApiError,
    },
}

impl<T> CacheRead<T> {
    pub fn snapshot(&self) -> &Arc<Snapshot<T>> {
        match self {
            CacheRead::Cached(snapshot)
            | CacheRead::Fetched(snapshot)
            | CacheRead::Stale { snapshot, .. }
            | CacheRead::Empty { snapshot, .. } => snapshot,
        }
    }

    pub fn into_snapshot(self) -> Arc<Snapshot<T>> {
        match self {
            CacheRead::Cached(snapshot)
            | CacheRead::Fetched(snapshot)
            | CacheRead::Stale { snapshot, .. }
            | CacheRead::Empty { snapshot, .. } => snapshot,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            CacheRead::Stale { error, .. } | CacheRead::Empty { error, .. } => Some(error),
            CacheRead::Cached(_) | CacheRead::Fetched(_) => None,
        }
    }

    /// Whether the snapshot reflects a successful read.
    pub fn is_ok(&self) -> bool {
        self.error().is_none()
    }
}

struct InFlight<T> {
    id: u64,
    generation: u64,
    fetch: SharedFetch<T>,
}

struct CacheState<T> {
    current: Option<Arc<Snapshot<T>>>,
    invalidated: bool,
    /// Bumped by `invalidate`. Fetches started under an older generation are
    /// never joined and their results are never stored.
    generation: u64,
    in_flight: Option<InFlight<T>>,
    next_fetch_id: u64,
}

/// Keeps the last good snapshot of one device resource.
///
/// Reads younger than `ttl` are served locally. Otherwise exactly one fetch
/// runs and every concurrent caller, forced or not, joins it, unless the
/// cache was invalidated after that fetch started.
pub struct SnapshotCache<T> {
    name: &'static str,
    ttl: Duration,
    fetch: FetchFn<T>,
    state: Mutex<CacheState<T>>,
}

impl<T> SnapshotCache<T>
where
    T: Default + Send + Sync + 'static,
{
    pub fn new<F>(name: &'static str, ttl: Duration, fetch: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync + 'static,
    {
        Self {
            name,
            ttl,
            fetch: Arc::new(fetch),
            state: Mutex::new(CacheState {
                current: None,
                invalidated: false,
                generation: 0,
                in_flight: None,
                next_fetch_id: 0,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get(&self, force_refresh: bool) -> CacheRead<T> {
        let (fetch_id, fetch) = {
            let mut state = lock_or_recover(&self.state, "snapshot_cache");
            if !force_refresh
                && !state.invalidated
                && let Some(ref snapshot) = state.current
                && snapshot.age() < self.ttl
            {
                return CacheRead::Cached(Arc::clone(snapshot));
            }

            let generation = state.generation;
            let joined = state
                .in_flight
                .as_ref()
                .filter(|in_flight| in_flight.generation == generation)
                .map(|in_flight| (in_flight.id, in_flight.fetch.clone()));
            match joined {
                Some(joined) => {
                    debug!(event = "sync.cache.fetch_joined", cache = self.name);
                    joined
                }
                None => {
                    if state.in_flight.is_some() {
                        debug!(event = "sync.cache.fetch_superseded", cache = self.name);
                    }
                    state.next_fetch_id += 1;
                    let id = state.next_fetch_id;
                    let fetch = self.start_fetch();
                    state.in_flight = Some(InFlight {
                        id,
                        generation,
                        fetch: fetch.clone(),
                    });
                    (id, fetch)
                }
            }
        };

        let result = fetch.await;

        let mut state = lock_or_recover(&self.state, "snapshot_cache");
        let owns_fetch = state
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.id == fetch_id);
        let current_generation = owns_fetch
            && state
                .in_flight
                .as_ref()
                .is_some_and(|in_flight| in_flight.generation == state.generation);
        if owns_fetch {
            state.in_flight = None;
        }

        match result {
            Ok(snapshot) => {
                if current_generation {
                    state.current = Some(Arc::clone(&snapshot));
                    state.invalidated = false;
                    debug!(event = "sync.cache.fetch_completed", cache = self.name);
                }
                CacheRead::Fetched(snapshot)
            }
            Err(error) => {
                if owns_fetch {
                    warn!(
                        event = "sync.cache.fetch_failed",
                        cache = self.name,
                        error = %error,
                        transient = error.is_transient()
                    );
                }
                match state.current {
                    Some(ref previous) => CacheRead::Stale {
                        snapshot: Arc::clone(previous),
                        error,
                    },
                    None => CacheRead::Empty {
                        snapshot: Arc::new(Snapshot::new(T::default())),
                        error,
                    },
                }
            }
        }
    }

    /// Force the next [`get`](Self::get) to fetch regardless of age.
    ///
    /// A fetch already in flight is not joined by later callers, and its
    /// result is not stored.
    pub fn invalidate(&self) {
        let mut state = lock_or_recover(&self.state, "snapshot_cache");
        state.invalidated = true;
        state.generation += 1;
    }

    /// The cached snapshot, without fetching.
    pub fn peek(&self) -> Option<Arc<Snapshot<T>>> {
        lock_or_recover(&self.state, "snapshot_cache")
            .current
            .as_ref()
            .map(Arc::clone)
    }

    fn start_fetch(&self) -> SharedFetch<T> {
        debug!(event = "sync.cache.fetch_started", cache = self.name);
        let fetch = (self.fetch)();
        async move { fetch.await.map(|value| Arc::new(Snapshot::new(value))) }
            .boxed()
            .shared()
    }
}

impl SnapshotCache<ConfigSnapshot> {
    pub fn for_config(api: Arc<dyn DeviceApi>, ttl: Duration) -> Self {
        Self::new("config", ttl, move || {
            let api = Arc::clone(&api);
            async move { api.fetch_config().await }.boxed()
        })
    }
}

impl SnapshotCache<StatusSnapshot> {
    pub fn for_status(api: Arc<dyn DeviceApi>, ttl: Duration) -> Self {
        Self::new("status", ttl, move || {
            let api = Arc::clone(&api);
            async move { api.fetch_status().await }.boxed()
        })
    }
}
