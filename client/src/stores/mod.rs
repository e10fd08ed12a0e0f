//! # Domain Stores
//!
//! One store per feature area, each caching backend collections behind a
//! TTL and exposing a snapshot + subscribe contract for UI bindings.
//!
//! | Store | Resources | TTL |
//! |-------|-----------|-----|
//! | [`FriendsStore`] | friends, friend requests | 5 min |
//! | [`HomeStore`] | current user, calendar link, events | 3 min |
//! | [`A2aStore`] | sessions, pending requests | 3 min |
//! | [`BadgeStore`] | notifications, unread count | 3 min |
//!
//! ## Fetch Rules
//!
//! - `fetch_x(false)` returns the cached collection while its resource was
//!   fetched within the TTL; `fetch_x(true)` always hits the network.
//! - No token: nothing is requested and the current collection is returned.
//! - Failures are logged and leave previous data in place.
//! - `invalidate()` forgets fetch times and `last_fetched_at` but keeps data.
//!
//! ## Snapshots
//!
//! State is swapped whole. [`StoreCore::snapshot`] returns the same `Arc`
//! until something changes, so `Arc::ptr_eq` tells a binding whether to
//! re-render.

pub mod a2a;
pub mod badge;
pub mod friends;
pub mod home;
pub mod realtime;

pub use a2a::{A2aState, A2aStore};
pub use badge::{BadgeState, BadgeStore};
pub use friends::{FriendsState, FriendsStore};
pub use home::{HomeState, HomeStore};
pub use realtime::RealtimeBridge;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::core::{ListenerSet, Result, Unsubscribe};
use crate::services::session::AuthSession;

/// Bookkeeping every store state carries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStatus {
    /// A `fetch_all` is running
    pub loading: bool,
    /// The first `fetch_all` has finished
    pub initial_load_done: bool,
    /// Wall-clock time of the last successful fetch of any resource
    pub last_fetched_at: Option<DateTime<Utc>>,
}

/// Implemented by each store's state record
pub trait StoreState: Clone + Default + PartialEq + Send + Sync + 'static {
    fn status(&self) -> &LoadStatus;
    fn status_mut(&mut self) -> &mut LoadStatus;
}

/// Accessors for one fetchable collection inside a state record
pub(crate) struct Field<S, T> {
    pub name: &'static str,
    pub get: fn(&S) -> &T,
    pub get_mut: fn(&mut S) -> &mut T,
    pub loading: fn(&mut S) -> &mut bool,
}

#[derive(Default)]
struct FetchClock {
    fetched_at: HashMap<&'static str, Instant>,
    loaded_once: HashSet<&'static str>,
}

/// State cell, listeners and per-resource fetch times shared by every store
pub(crate) struct StoreCore<S> {
    name: &'static str,
    ttl: Duration,
    state: RwLock<Arc<S>>,
    listeners: ListenerSet,
    clock: Mutex<FetchClock>,
}

impl<S: StoreState> StoreCore<S> {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            state: RwLock::new(Arc::new(S::default())),
            listeners: ListenerSet::new(),
            clock: Mutex::new(FetchClock::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn snapshot(&self) -> Arc<S> {
        Arc::clone(&self.state.read())
    }

    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) -> Unsubscribe {
        self.listeners.subscribe(listener)
    }

    /// Apply `f` to a copy of the state; swap it in and notify only if it
    /// differs. Returns whether anything changed.
    pub fn modify(&self, f: impl FnOnce(&mut S)) -> bool {
        let changed = {
            let mut state = self.state.write();
            let mut next = S::clone(&state);
            f(&mut next);
            if next == **state {
                false
            } else {
                *state = Arc::new(next);
                true
            }
        };
        if changed {
            self.listeners.emit();
        }
        changed
    }

    pub fn is_fresh(&self, resource: &'static str) -> bool {
        self.clock
            .lock()
            .fetched_at
            .get(resource)
            .is_some_and(|at| at.elapsed() < self.ttl)
    }

    pub fn all_fresh(&self, resources: &[&'static str]) -> bool {
        resources.iter().all(|r| self.is_fresh(r))
    }

    fn mark_fetched(&self, resource: &'static str) {
        let mut clock = self.clock.lock();
        clock.fetched_at.insert(resource, Instant::now());
        clock.loaded_once.insert(resource);
    }

    /// Forget every fetch time so the next fetch goes to the network.
    /// Data stays; `last_fetched_at` in the snapshot is cleared.
    pub fn invalidate(&self) {
        self.clock.lock().fetched_at.clear();
        self.modify(|s| s.status_mut().last_fetched_at = None);
        debug!(store = self.name, "Store invalidated");
    }

    /// Fetch one collection following the store rules.
    ///
    /// Returns the collection as it stands afterwards: the fresh value on
    /// success, the cached one on a cache hit, a missing token or a failure.
    pub async fn load<T, F, Fut>(&self, field: &Field<S, T>, force: bool, session: &AuthSession, request: F) -> T
    where
        T: Clone,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if !force && self.is_fresh(field.name) {
            trace!(store = self.name, resource = field.name, "Cache hit, skipping fetch");
            return (field.get)(&self.snapshot()).clone();
        }

        let Some(token) = session.token().await else {
            debug!(store = self.name, resource = field.name, "No auth token, keeping current data");
            return (field.get)(&self.snapshot()).clone();
        };

        let first_load = !self.clock.lock().loaded_once.contains(field.name);
        if first_load {
            self.modify(|s| *(field.loading)(s) = true);
        }

        match request(token).await {
            Ok(value) => {
                self.store(field, value.clone());
                debug!(store = self.name, resource = field.name, "Fetched");
                value
            }
            Err(e) => {
                warn!(store = self.name, resource = field.name, error = %e, "Fetch failed, keeping previous data");
                self.modify(|s| *(field.loading)(s) = false);
                (field.get)(&self.snapshot()).clone()
            }
        }
    }

    /// Install a value obtained outside [`load`](Self::load) as a fresh fetch
    pub fn store<T>(&self, field: &Field<S, T>, value: T) {
        self.mark_fetched(field.name);
        let now = Utc::now();
        self.modify(|s| {
            *(field.get_mut)(s) = value;
            *(field.loading)(s) = false;
            s.status_mut().last_fetched_at = Some(now);
        });
    }

    /// Run `fetches` (all resources of the store) unless everything is
    /// fresh after a completed initial load.
    pub async fn load_all<Fut>(&self, force: bool, resources: &[&'static str], fetches: Fut)
    where
        Fut: Future<Output = ()>,
    {
        if !force && self.snapshot().status().initial_load_done && self.all_fresh(resources) {
            trace!(store = self.name, "All resources fresh, skipping fetch_all");
            return;
        }

        self.modify(|s| s.status_mut().loading = true);
        fetches.await;
        self.modify(|s| {
            let status = s.status_mut();
            status.loading = false;
            status.initial_load_done = true;
        });
    }
}

/// Every store, built once per app context
#[derive(Clone)]
pub struct Stores {
    pub friends: Arc<FriendsStore>,
    pub home: Arc<HomeStore>,
    pub a2a: Arc<A2aStore>,
    pub badge: Arc<BadgeStore>,
}

impl Stores {
    pub fn new(
        api: Arc<dyn crate::core::ApiService>,
        session: AuthSession,
        storage: Arc<dyn crate::services::storage::KeyValueStorage>,
    ) -> Self {
        Self {
            friends: Arc::new(FriendsStore::new(Arc::clone(&api), session.clone())),
            home: Arc::new(HomeStore::new(Arc::clone(&api), session.clone())),
            a2a: Arc::new(A2aStore::new(Arc::clone(&api), session.clone())),
            badge: Arc::new(BadgeStore::new(api, session, storage)),
        }
    }

    /// Load every store concurrently
    pub async fn fetch_all(&self, force: bool) {
        tokio::join!(
            self.friends.fetch_all(force),
            self.home.fetch_all(force),
            self.a2a.fetch_all(force),
            self.badge.fetch_all(force),
        );
    }

    pub fn invalidate_all(&self) {
        self.friends.invalidate();
        self.home.invalidate();
        self.a2a.invalidate();
        self.badge.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Numbers {
        values: Vec<u32>,
        values_loading: bool,
        status: LoadStatus,
    }

    impl StoreState for Numbers {
        fn status(&self) -> &LoadStatus {
            &self.status
        }
        fn status_mut(&mut self) -> &mut LoadStatus {
            &mut self.status
        }
    }

    const VALUES: Field<Numbers, Vec<u32>> = Field {
        name: "values",
        get: |s| &s.values,
        get_mut: |s| &mut s.values,
        loading: |s| &mut s.values_loading,
    };

    #[test]
    fn test_snapshot_is_stable_until_change() {
        let core: StoreCore<Numbers> = StoreCore::new("numbers", Duration::from_secs(60));
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let _sub = core.subscribe(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });

        let a = core.snapshot();
        assert!(Arc::ptr_eq(&a, &core.snapshot()));

        assert!(!core.modify(|_| {}));
        assert!(Arc::ptr_eq(&a, &core.snapshot()));
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        assert!(core.modify(|s| s.values.push(1)));
        assert!(!Arc::ptr_eq(&a, &core.snapshot()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_respects_ttl_and_force() {
        let (session, _) = crate::test_support::session(true).await;
        let core: StoreCore<Numbers> = StoreCore::new("numbers", Duration::from_secs(60));
        let calls = AtomicUsize::new(0);
        let fetch = |_token: String| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(vec![1, 2]) }
        };

        assert_eq!(core.load(&VALUES, false, &session, fetch).await, vec![1, 2]);
        assert_eq!(core.load(&VALUES, false, &session, fetch).await, vec![1, 2]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        core.load(&VALUES, true, &session, fetch).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        tokio::time::advance(Duration::from_secs(61)).await;
        core.load(&VALUES, false, &session, fetch).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failed_load_keeps_data_and_clears_loading() {
        let (session, _) = crate::test_support::session(true).await;
        let core: StoreCore<Numbers> = StoreCore::new("numbers", Duration::from_secs(60));
        core.modify(|s| s.values = vec![9]);

        let value = core
            .load(&VALUES, true, &session, |_| async {
                Err::<Vec<u32>, _>(crate::core::AppError::Api("offline".to_string()))
            })
            .await;
        assert_eq!(value, vec![9]);

        let snapshot = core.snapshot();
        assert_eq!(snapshot.values, vec![9]);
        assert!(!snapshot.values_loading);
        assert!(snapshot.status.last_fetched_at.is_none());
    }
}
