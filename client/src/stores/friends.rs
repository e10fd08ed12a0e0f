//! Friends list and incoming friend requests

use shared::dto::{Friend, FriendRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::{Field, LoadStatus, StoreCore, StoreState};
use crate::core::{ApiService, Result, Unsubscribe};
use crate::services::session::AuthSession;

pub const FRIENDS_TTL: Duration = Duration::from_secs(5 * 60);

const FRIENDS: &str = "friends";
const REQUESTS: &str = "requests";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FriendsState {
    pub friends: Vec<Friend>,
    pub friend_requests: Vec<FriendRequest>,
    pub friends_loading: bool,
    pub requests_loading: bool,
    pub status: LoadStatus,
}

impl StoreState for FriendsState {
    fn status(&self) -> &LoadStatus {
        &self.status
    }

    fn status_mut(&mut self) -> &mut LoadStatus {
        &mut self.status
    }
}

const FRIENDS_FIELD: Field<FriendsState, Vec<Friend>> = Field {
    name: FRIENDS,
    get: |s| &s.friends,
    get_mut: |s| &mut s.friends,
    loading: |s| &mut s.friends_loading,
};

const REQUESTS_FIELD: Field<FriendsState, Vec<FriendRequest>> = Field {
    name: REQUESTS,
    get: |s| &s.friend_requests,
    get_mut: |s| &mut s.friend_requests,
    loading: |s| &mut s.requests_loading,
};

pub struct FriendsStore {
    core: StoreCore<FriendsState>,
    api: Arc<dyn ApiService>,
    session: AuthSession,
}

impl FriendsStore {
    pub fn new(api: Arc<dyn ApiService>, session: AuthSession) -> Self {
        Self {
            core: StoreCore::new("friends", FRIENDS_TTL),
            api,
            session,
        }
    }

    pub fn get_snapshot(&self) -> Arc<FriendsState> {
        self.core.snapshot()
    }

    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) -> Unsubscribe {
        self.core.subscribe(listener)
    }

    pub async fn fetch_friends(&self, force: bool) -> Vec<Friend> {
        let api = &self.api;
        self.core
            .load(&FRIENDS_FIELD, force, &self.session, |token| async move {
                api.list_friends(&token).await
            })
            .await
    }

    pub async fn fetch_requests(&self, force: bool) -> Vec<FriendRequest> {
        let api = &self.api;
        self.core
            .load(&REQUESTS_FIELD, force, &self.session, |token| async move {
                api.list_friend_requests(&token).await
            })
            .await
    }

    pub async fn fetch_all(&self, force: bool) {
        self.core
            .load_all(force, &[FRIENDS, REQUESTS], async {
                tokio::join!(self.fetch_friends(force), self.fetch_requests(force));
            })
            .await;
    }

    pub fn invalidate(&self) {
        self.core.invalidate();
    }

    pub async fn refresh(&self) {
        self.fetch_all(true).await;
    }

    // ---- optimistic mutators ----

    pub fn remove_request(&self, request_id: &str) {
        self.core.modify(|s| s.friend_requests.retain(|r| r.id != request_id));
    }

    /// Insert or replace by id
    pub fn add_friend(&self, friend: Friend) {
        self.core.modify(|s| match s.friends.iter_mut().find(|f| f.id == friend.id) {
            Some(existing) => *existing = friend,
            None => s.friends.push(friend),
        });
    }

    pub fn remove_friend(&self, friend_id: &str) {
        self.core.modify(|s| s.friends.retain(|f| f.id != friend_id));
    }

    // ---- server actions ----
    //
    // Each applies its optimistic change first and does not roll it back on
    // failure; `refresh()` reconciles.

    pub async fn accept_request(&self, request_id: &str) -> Result<Option<Friend>> {
        let token = self.session.require_token().await?;
        self.remove_request(request_id);
        let friend = self.api.accept_friend_request(&token, request_id).await?;
        if let Some(friend) = &friend {
            self.add_friend(friend.clone());
        }
        info!(request_id, "Friend request accepted");
        Ok(friend)
    }

    pub async fn reject_request(&self, request_id: &str) -> Result<()> {
        let token = self.session.require_token().await?;
        self.remove_request(request_id);
        self.api.reject_friend_request(&token, request_id).await
    }

    pub async fn delete_friend(&self, friend_id: &str) -> Result<()> {
        let token = self.session.require_token().await?;
        self.remove_friend(friend_id);
        self.api.delete_friend(&token, friend_id).await
    }

    /// Send a request by email; the friend appears once the other side accepts.
    pub async fn send_request(&self, email: &str) -> Result<()> {
        let token = self.session.require_token().await?;
        self.api.add_friend(&token, email).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{friend, friend_request, session, MockApi};

    async fn store(with_token: bool) -> (FriendsStore, Arc<MockApi>) {
        let api = MockApi::new();
        *api.friends.lock() = vec![friend("u1"), friend("u2")];
        *api.requests.lock() = vec![friend_request("r1", "u3")];
        let (session, _) = session(with_token).await;
        (FriendsStore::new(api.clone(), session), api)
    }

    #[tokio::test]
    async fn test_no_token_returns_empty_without_error() {
        let (store, api) = store(false).await;
        assert!(store.fetch_friends(false).await.is_empty());
        assert_eq!(api.total_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_fetch_within_ttl_is_a_cache_hit() {
        let (store, api) = store(true).await;
        assert_eq!(store.fetch_friends(false).await.len(), 2);
        assert_eq!(store.fetch_friends(false).await.len(), 2);
        assert_eq!(api.calls("/friends/list"), 1);

        store.fetch_friends(true).await;
        assert_eq!(api.calls("/friends/list"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_after_ttl_goes_to_network() {
        let (store, api) = store(true).await;
        store.fetch_friends(false).await;

        tokio::time::advance(Duration::from_secs(10 * 60)).await;
        store.fetch_friends(false).await;
        assert_eq!(api.calls("/friends/list"), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch_and_keeps_data() {
        let (store, api) = store(true).await;
        store.fetch_all(false).await;
        assert_eq!(api.calls("/friends/list"), 1);
        assert_eq!(api.calls("/friends/requests"), 1);

        store.invalidate();
        assert_eq!(store.get_snapshot().friends.len(), 2);

        store.fetch_friends(false).await;
        assert_eq!(api.calls("/friends/list"), 2);
    }

    #[tokio::test]
    async fn test_invalidate_clears_last_fetched_at_and_notifies() {
        let (store, _api) = store(true).await;
        store.fetch_all(false).await;
        let before = store.get_snapshot();
        assert!(before.status.last_fetched_at.is_some());

        let hits = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let _sub = store.subscribe(move || {
            h.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });

        store.invalidate();
        let after = store.get_snapshot();
        assert!(after.status.last_fetched_at.is_none());
        assert_eq!(after.friends.len(), 2);
        assert_eq!(after.friend_requests.len(), 1);
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_all_refetches_only_stale_resources() {
        let (store, api) = store(true).await;
        store.fetch_all(false).await;

        tokio::time::advance(Duration::from_secs(3 * 60)).await;
        store.fetch_friends(true).await;
        tokio::time::advance(Duration::from_secs(2 * 60 + 1)).await;

        store.fetch_all(false).await;
        assert_eq!(api.calls("/friends/requests"), 2);
        assert_eq!(api.calls("/friends/list"), 2);
    }

    #[tokio::test]
    async fn test_fetch_all_skips_after_initial_load() {
        let (store, api) = store(true).await;
        store.fetch_all(false).await;
        let snapshot = store.get_snapshot();
        assert!(snapshot.status.initial_load_done);
        assert!(!snapshot.status.loading);
        assert!(snapshot.status.last_fetched_at.is_some());

        store.fetch_all(false).await;
        assert_eq!(api.calls("/friends/list"), 1);

        store.refresh().await;
        assert_eq!(api.calls("/friends/list"), 2);
        assert_eq!(api.calls("/friends/requests"), 2);
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_friends() {
        let (store, api) = store(true).await;
        store.fetch_friends(false).await;

        api.set_failing(true);
        assert_eq!(store.fetch_friends(true).await.len(), 2);
        assert!(!store.get_snapshot().friends_loading);
    }

    #[tokio::test]
    async fn test_remove_friend_is_idempotent() {
        let (store, _) = store(true).await;
        store.fetch_friends(false).await;

        store.remove_friend("u1");
        let after_first = store.get_snapshot();
        store.remove_friend("u1");
        let after_second = store.get_snapshot();

        assert!(after_first.friends.iter().all(|f| f.id != "u1"));
        assert!(Arc::ptr_eq(&after_first, &after_second));
    }

    #[tokio::test]
    async fn test_add_friend_replaces_by_id() {
        let (store, _) = store(true).await;
        store.add_friend(friend("u9"));
        let mut renamed = friend("u9");
        renamed.name = Some("Nine".to_string());
        store.add_friend(renamed);

        let snapshot = store.get_snapshot();
        assert_eq!(snapshot.friends.len(), 1);
        assert_eq!(snapshot.friends[0].name.as_deref(), Some("Nine"));
    }

    #[tokio::test]
    async fn test_accept_request_moves_it_to_friends() {
        let (store, _) = store(true).await;
        store.fetch_all(false).await;

        let accepted = store.accept_request("r1").await.unwrap();
        assert_eq!(accepted.map(|f| f.id), Some("u3".to_string()));

        let snapshot = store.get_snapshot();
        assert!(snapshot.friend_requests.is_empty());
        assert!(snapshot.friends.iter().any(|f| f.id == "u3"));
    }

    #[tokio::test]
    async fn test_failed_reject_is_not_rolled_back() {
        let (store, api) = store(true).await;
        store.fetch_requests(false).await;

        api.set_failing(true);
        assert!(store.reject_request("r1").await.is_err());
        assert!(store.get_snapshot().friend_requests.is_empty());

        api.set_failing(false);
        store.refresh().await;
        assert_eq!(store.get_snapshot().friend_requests.len(), 1);
    }

    #[tokio::test]
    async fn test_listeners_fire_on_change() {
        let (store, _) = store(true).await;
        let hits = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let sub = store.subscribe(move || {
            h.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });

        store.add_friend(friend("u5"));
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 1);

        sub.unsubscribe();
        store.remove_friend("u5");
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
