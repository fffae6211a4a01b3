//! Fetch-through cache for Cardcast decks.
//!
//! Lookups are keyed by the normalized play code (trimmed, lower-cased).
//! A cached deck is served while it is younger than the TTL; otherwise the
//! lookup goes through the `DeckSource` and the result replaces the entry.
//!
//! Flow for `get_deck`:
//! 1. Fresh entry -> return it, no network access
//! 2. Fetch already in flight for the key -> wait on that fetch
//! 3. Otherwise start a fetch; on success it stores a new entry
//!
//! A fetch nobody is waiting on any more is cancelled and unregistered, so
//! the next lookup starts over instead of joining it.
//!
//! Failed fetches store nothing. A stale entry whose refresh failed stays in
//! place (but is never served) until a later refresh succeeds or it is
//! invalidated.

use crate::domain::{Deck, DeckError, DeckSource};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

type FetchResult = Result<Arc<Deck>, DeckError>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

struct CacheEntry {
    deck: Arc<Deck>,
    fetched_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl_seconds: f64) -> bool {
        self.fetched_at.elapsed().as_secs_f64() < ttl_seconds
    }
}

/// Everything behind the lock. Entries are swapped as whole values, so a
/// reader never sees a deck paired with another fetch's timestamp.
struct CacheState {
    ttl_seconds: f64,
    entries: HashMap<String, CacheEntry>,
    in_flight: HashMap<String, SharedFetch>,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    fetches: AtomicU64,
    fetch_failures: AtomicU64,
    cancelled: AtomicU64,
}

/// Point-in-time cache statistics
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CacheStats {
    /// Stored decks, fresh or stale
    pub entries: usize,
    /// Stored decks still inside the TTL
    pub fresh_entries: usize,
    /// Fetches currently running
    pub in_flight: usize,
    pub ttl_seconds: f64,
    /// Lookups served from a fresh entry
    pub hits: u64,
    /// Lookups that needed a fetch (including coalesced ones)
    pub misses: u64,
    /// Misses that joined a fetch already in flight
    pub coalesced: u64,
    /// Fetches started against the source
    pub fetches: u64,
    pub fetch_failures: u64,
    /// Fetches dropped because every waiter went away
    pub cancelled: u64,
}

/// In-memory fetch-through deck cache.
///
/// Cheap to share behind an `Arc`; independent instances never share state.
pub struct DeckCache {
    source: Arc<dyn DeckSource>,
    state: Arc<Mutex<CacheState>>,
    counters: Arc<Counters>,
}

impl DeckCache {
    /// Create a cache over `source` with the given TTL in seconds.
    pub fn new(source: Arc<dyn DeckSource>, ttl_seconds: f64) -> Self {
        info!("Initialized DeckCache with TTL {}s", ttl_seconds);
        Self {
            source,
            state: Arc::new(Mutex::new(CacheState {
                ttl_seconds,
                entries: HashMap::new(),
                in_flight: HashMap::new(),
            })),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Normalize a play code into a cache key.
    ///
    /// Play codes are case- and whitespace-insensitive.
    pub fn normalize_code(code: &str) -> String {
        code.trim().to_lowercase()
    }

    pub fn ttl_seconds(&self) -> f64 {
        lock_state(&self.state).ttl_seconds
    }

    /// Change the TTL. Applies to existing entries on their next lookup.
    pub fn set_ttl_seconds(&self, ttl_seconds: f64) {
        let mut state = lock_state(&self.state);
        info!("Deck cache TTL changed: {}s -> {}s", state.ttl_seconds, ttl_seconds);
        state.ttl_seconds = ttl_seconds;
    }

    /// Get a deck, fetching it if it is missing or stale.
    pub async fn get_deck(&self, code: &str) -> Result<Arc<Deck>, DeckError> {
        let key = Self::normalize_code(code);

        let fetch = {
            let mut state = lock_state(&self.state);

            if let Some(entry) = state.entries.get(&key) {
                if entry.is_fresh(state.ttl_seconds) {
                    debug!("Deck cache hit: {}", key);
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    metrics::counter!("deck_cache_operations_total", "operation" => "hit")
                        .increment(1);
                    return Ok(Arc::clone(&entry.deck));
                }
                debug!("Deck cache entry stale: {}", key);
            }

            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("deck_cache_operations_total", "operation" => "miss").increment(1);

            match state.in_flight.get(&key) {
                Some(fetch) => {
                    debug!("Joining in-flight fetch: {}", key);
                    self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                    metrics::counter!("deck_cache_operations_total", "operation" => "coalesced")
                        .increment(1);
                    fetch.clone()
                }
                None => self.start_fetch(&mut state, &key),
            }
        };

        FetchWaiter {
            state: &self.state,
            counters: &self.counters,
            key,
            fetch: Some(fetch),
        }
        .await
    }

    /// Register a new in-flight fetch for `key`. The fetch stores its own
    /// result, so it completes correctly no matter which waiter drives it.
    fn start_fetch(&self, state: &mut CacheState, key: &str) -> SharedFetch {
        info!("Deck cache miss, fetching from source: {}", key);
        self.counters.fetches.fetch_add(1, Ordering::Relaxed);

        let source = Arc::clone(&self.source);
        let shared_state = Arc::downgrade(&self.state);
        let counters = Arc::clone(&self.counters);
        let fetch_key = key.to_string();

        let fetch = async move {
            let result = source.fetch_deck(&fetch_key).await.map(Arc::new);
            complete_fetch(&shared_state, &counters, &fetch_key, &result);
            result
        }
        .boxed()
        .shared();

        state.in_flight.insert(key.to_string(), fetch.clone());
        fetch
    }

    /// Drop the cached deck for `code`. Returns whether an entry existed.
    pub fn invalidate(&self, code: &str) -> bool {
        let key = Self::normalize_code(code);
        let removed = lock_state(&self.state).entries.remove(&key).is_some();
        if removed {
            info!("Invalidated cached deck: {}", key);
        }
        removed
    }

    /// Drop every cached deck, returning how many were removed.
    pub fn clear(&self) -> usize {
        let mut state = lock_state(&self.state);
        let count = state.entries.len();
        state.entries.clear();
        info!("Cleared {} cached decks", count);
        count
    }

    /// Number of stored decks, fresh or stale.
    pub fn len(&self) -> usize {
        lock_state(&self.state).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = lock_state(&self.state);
        let fresh_entries = state
            .entries
            .values()
            .filter(|e| e.is_fresh(state.ttl_seconds))
            .count();

        CacheStats {
            entries: state.entries.len(),
            fresh_entries,
            in_flight: state.in_flight.len(),
            ttl_seconds: state.ttl_seconds,
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
            fetches: self.counters.fetches.load(Ordering::Relaxed),
            fetch_failures: self.counters.fetch_failures.load(Ordering::Relaxed),
            cancelled: self.counters.cancelled.load(Ordering::Relaxed),
        }
    }
}

/// Runs once per fetch, inside the shared future.
fn complete_fetch(
    state: &Weak<Mutex<CacheState>>,
    counters: &Counters,
    key: &str,
    result: &FetchResult,
) {
    if result.is_ok() {
        metrics::counter!("deck_fetches_total", "outcome" => "success").increment(1);
    } else {
        counters.fetch_failures.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("deck_fetches_total", "outcome" => "failure").increment(1);
    }

    // Cache already dropped
    let Some(state) = state.upgrade() else {
        return;
    };
    let mut state = lock_state(&state);
    state.in_flight.remove(key);

    match result {
        Ok(deck) => {
            debug!("Stored deck {} ({} cards)", key, deck.card_count());
            state.entries.insert(
                key.to_string(),
                CacheEntry {
                    deck: Arc::clone(deck),
                    fetched_at: Instant::now(),
                },
            );
        }
        Err(e) => warn!("Failed to fetch deck {}: {}", key, e),
    }
}

/// One caller's handle on an in-flight fetch.
///
/// Dropping the last waiter before the fetch resolves cancels it: the fetch
/// is removed from `in_flight`, which drops the underlying future.
struct FetchWaiter<'a> {
    state: &'a Mutex<CacheState>,
    counters: &'a Counters,
    key: String,
    /// `None` once the fetch has resolved for this waiter
    fetch: Option<SharedFetch>,
}

impl Future for FetchWaiter<'_> {
    type Output = FetchResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<FetchResult> {
        // Already resolved for this waiter
        let Some(fetch) = self.fetch.as_mut() else {
            return Poll::Pending;
        };
        let result = futures::ready!(fetch.poll_unpin(cx));
        self.fetch = None;
        Poll::Ready(result)
    }
}

impl Drop for FetchWaiter<'_> {
    fn drop(&mut self) {
        let Some(fetch) = self.fetch.take() else {
            return;
        };

        // Release our handle under the lock so concurrent waiters dropping
        // at the same time agree on who was last.
        let mut state = lock_state(self.state);
        let registered = state
            .in_flight
            .get(&self.key)
            .is_some_and(|current| current.ptr_eq(&fetch));
        drop(fetch);

        let abandoned = registered
            && state
                .in_flight
                .get(&self.key)
                .is_some_and(|current| current.strong_count() == Some(1));
        if abandoned {
            // Dropping the map's handle drops the fetch itself
            let cancelled = state.in_flight.remove(&self.key);
            drop(state);
            drop(cancelled);

            self.counters.cancelled.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("deck_fetches_total", "outcome" => "cancelled").increment(1);
            warn!("Cancelled abandoned deck fetch: {}", self.key);
        }
    }
}

fn lock_state(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
