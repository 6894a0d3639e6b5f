//! Memoization of evaluation outcomes.

use flagforge_model::{FlagSet, Outcome, SearchError, SearchResult};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Outcome returned by [`CandidateCache::get_or_compute`].
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub outcome: Outcome,
    /// `true` if the evaluator was not invoked for this call.
    pub cached: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub capacity: usize,
}

/// Bounded `FlagSet -> Outcome` memo with LRU eviction and single-flight
/// computation per key.
///
/// Keys being computed are tracked outside the LRU, so they can never be
/// evicted mid-computation; concurrent callers for such a key block until the
/// computing caller publishes its result.
pub struct CandidateCache {
    entries: Mutex<LruCache<FlagSet, Outcome>>,
    in_flight: Mutex<HashMap<FlagSet, Arc<Flight>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Default)]
struct Flight {
    result: Mutex<Option<SearchResult<Outcome>>>,
    done: Condvar,
}

enum Role {
    Leader(Arc<Flight>),
    Follower(Arc<Flight>),
}

impl CandidateCache {
    pub fn new(capacity: usize) -> SearchResult<Self> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| SearchError::invalid("cache capacity must be > 0"))?;
        Ok(Self {
            entries: Mutex::new(LruCache::new(capacity)),
            in_flight: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    /// Memoized outcome for `set`, running `compute` only on a miss.
    ///
    /// Errors from `compute` reach every caller waiting on the same key and
    /// are not cached.
    pub fn get_or_compute<F>(&self, set: &FlagSet, compute: F) -> SearchResult<Lookup>
    where
        F: FnOnce() -> SearchResult<Outcome>,
    {
        let role = {
            let mut in_flight = lock(&self.in_flight);
            if let Some(outcome) = lock(&self.entries).get(set).cloned() {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Lookup {
                    outcome,
                    cached: true,
                });
            }
            match in_flight.get(set) {
                Some(flight) => Role::Follower(Arc::clone(flight)),
                None => {
                    let flight = Arc::new(Flight::default());
                    in_flight.insert(set.clone(), Arc::clone(&flight));
                    Role::Leader(flight)
                }
            }
        };

        match role {
            Role::Follower(flight) => {
                let mut slot = lock(&flight.result);
                while slot.is_none() {
                    slot = flight
                        .done
                        .wait(slot)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                self.hits.fetch_add(1, Ordering::Relaxed);
                let result = slot.clone().unwrap_or(Err(SearchError::Interrupted));
                result.map(|outcome| Lookup {
                    outcome,
                    cached: true,
                })
            }
            Role::Leader(flight) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                let mut publish = Publish {
                    cache: self,
                    key: set,
                    flight,
                    result: None,
                };
                let result = compute();
                publish.result = Some(result.clone());
                drop(publish);
                result.map(|outcome| Lookup {
                    outcome,
                    cached: false,
                })
            }
        }
    }

    /// Memoized outcome without computing or touching recency.
    pub fn peek(&self, set: &FlagSet) -> Option<Outcome> {
        lock(&self.entries).peek(set).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        lock(&self.entries).cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        let entries = lock(&self.entries);
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: entries.len(),
            capacity: entries.cap().get(),
        }
    }
}

/// Publishes the leader's result on drop, so waiters are released even if
/// `compute` unwinds. An unwound evaluation is recorded as a runtime error,
/// the same outcome the scheduler gives a panicking evaluator.
struct Publish<'a> {
    cache: &'a CandidateCache,
    key: &'a FlagSet,
    flight: Arc<Flight>,
    result: Option<SearchResult<Outcome>>,
}

impl Drop for Publish<'_> {
    fn drop(&mut self) {
        let result = self
            .result
            .take()
            .unwrap_or(Ok(Outcome::RuntimeError));
        {
            let mut in_flight = lock(&self.cache.in_flight);
            if let Ok(outcome) = &result {
                lock(&self.cache.entries).put(self.key.clone(), outcome.clone());
            }
            in_flight.remove(self.key);
        }
        *lock(&self.flight.result) = Some(result);
        self.flight.done.notify_all();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
