use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::assignment::AssignmentRow;
use crate::cache::Cache;
use crate::types::UserId;

/// In-memory cache for per-user assignment views.
///
/// LRU with optional TTL. Each user carries a generation counter that
/// [`Cache::invalidate_user`] advances; a store read started before an
/// invalidation is rejected by [`Cache::set_assignments`]. The TTL bounds
/// staleness from changes written behind the engine's back.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    inner: Arc<Mutex<CacheState>>,
    capacity: usize,
    ttl: Option<Duration>,
}

#[derive(Debug, Default)]
struct CacheState {
    views: HashMap<UserId, CachedView>,
    recency: VecDeque<UserId>,
    generations: HashMap<UserId, u64>,
}

#[derive(Debug, Clone)]
struct CachedView {
    rows: Vec<AssignmentRow>,
    loaded_at: Instant,
}

impl CachedView {
    fn expired(&self, ttl: Option<Duration>, now: Instant) -> bool {
        ttl.is_some_and(|ttl| now.saturating_duration_since(self.loaded_at) > ttl)
    }
}

impl CacheState {
    fn generation(&self, user: &UserId) -> u64 {
        self.generations.get(user).copied().unwrap_or(0)
    }

    fn drop_view(&mut self, user: &UserId) {
        if self.views.remove(user).is_some() {
            self.recency.retain(|existing| existing != user);
        }
    }

    fn mark_used(&mut self, user: &UserId) {
        self.recency.retain(|existing| existing != user);
        self.recency.push_back(*user);
    }

    fn drop_expired(&mut self, ttl: Option<Duration>, now: Instant) {
        if ttl.is_none() {
            return;
        }
        self.views.retain(|_, view| !view.expired(ttl, now));
        let views = &self.views;
        self.recency.retain(|user| views.contains_key(user));
    }

    fn shrink_to(&mut self, capacity: usize) {
        while self.views.len() > capacity {
            let Some(oldest) = self.recency.pop_front() else {
                break;
            };
            self.views.remove(&oldest);
        }
    }
}

impl MemoryCache {
    /// Creates a new cache with the given capacity.
    ///
    /// A capacity of zero disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheState::default())),
            capacity,
            ttl: None,
        }
    }

    /// Configures a time-to-live for cache entries.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("poisoned lock").views.len()
    }

    /// Returns whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get_assignments(&self, user: &UserId) -> Option<Vec<AssignmentRow>> {
        if self.capacity == 0 {
            return None;
        }

        let now = Instant::now();
        let mut state = self.inner.lock().expect("poisoned lock");
        let rows = match state.views.get(user) {
            Some(view) if view.expired(self.ttl, now) => None,
            Some(view) => Some(view.rows.clone()),
            None => return None,
        };
        match rows {
            Some(rows) => {
                state.mark_used(user);
                Some(rows)
            }
            None => {
                state.drop_view(user);
                None
            }
        }
    }

    async fn generation(&self, user: &UserId) -> u64 {
        self.inner.lock().expect("poisoned lock").generation(user)
    }

    async fn set_assignments(
        &self,
        user: &UserId,
        generation: u64,
        rows: Vec<AssignmentRow>,
    ) -> bool {
        if self.capacity == 0 {
            return false;
        }

        let now = Instant::now();
        let mut state = self.inner.lock().expect("poisoned lock");
        if state.generation(user) != generation {
            return false;
        }

        state.drop_expired(self.ttl, now);
        state.views.insert(
            *user,
            CachedView {
                rows,
                loaded_at: now,
            },
        );
        state.mark_used(user);
        state.shrink_to(self.capacity);
        true
    }

    async fn invalidate_user(&self, user: &UserId) {
        let mut state = self.inner.lock().expect("poisoned lock");
        state.drop_view(user);
        *state.generations.entry(*user).or_default() += 1;
    }
}
