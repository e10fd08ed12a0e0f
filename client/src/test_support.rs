//! Hand-written test doubles shared by the store, bridge and app tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use shared::dto::{
    A2aSession, CalendarEvent, CalendarLinkStatus, ChatRequest, ChatResponse, Friend, FriendRequest,
    NegotiationMessage, NewCalendarEvent, Notification, PendingRequest, SessionStatus, UserProfile,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::core::{ApiService, AppError, Result};
use crate::services::session::AuthSession;
use crate::services::storage::{keys, KeyValueStorage, MemoryStorage};

/// Canned backend that counts calls per endpoint.
#[derive(Default)]
pub(crate) struct MockApi {
    pub user: Mutex<Option<UserProfile>>,
    pub friends: Mutex<Vec<Friend>>,
    pub requests: Mutex<Vec<FriendRequest>>,
    pub link_status: Mutex<CalendarLinkStatus>,
    pub events: Mutex<Vec<CalendarEvent>>,
    pub sessions: Mutex<Vec<A2aSession>>,
    pub pending: Mutex<Vec<PendingRequest>>,
    pub notifications: Mutex<Vec<Notification>>,
    pub unread: Mutex<u32>,
    pub negotiation: Mutex<Vec<NegotiationMessage>>,
    /// Last `last_read_at` passed to `unread_count`
    pub last_read_at_seen: Mutex<Option<DateTime<Utc>>>,
    /// Every call fails with a 500 while set
    pub fail: AtomicBool,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl MockApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self, endpoint: &str) -> usize {
        self.calls.lock().get(endpoint).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn hit(&self, endpoint: &'static str) -> Result<()> {
        *self.calls.lock().entry(endpoint).or_insert(0) += 1;
        if self.fail.load(Ordering::SeqCst) {
            Err(AppError::Http {
                status: 500,
                detail: "mock failure".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ApiService for MockApi {
    async fn get_me(&self, _token: &str) -> Result<UserProfile> {
        self.hit("/auth/me")?;
        self.user.lock().clone().ok_or(AppError::Unauthorized)
    }

    async fn list_friends(&self, _token: &str) -> Result<Vec<Friend>> {
        self.hit("/friends/list")?;
        Ok(self.friends.lock().clone())
    }

    async fn list_friend_requests(&self, _token: &str) -> Result<Vec<FriendRequest>> {
        self.hit("/friends/requests")?;
        Ok(self.requests.lock().clone())
    }

    async fn accept_friend_request(&self, _token: &str, request_id: &str) -> Result<Option<Friend>> {
        self.hit("/friends/accept")?;
        let mut requests = self.requests.lock();
        let index = requests.iter().position(|r| r.id == request_id);
        Ok(index.map(|i| friend(&requests.remove(i).from_user_id)))
    }

    async fn reject_friend_request(&self, _token: &str, request_id: &str) -> Result<()> {
        self.hit("/friends/reject")?;
        self.requests.lock().retain(|r| r.id != request_id);
        Ok(())
    }

    async fn add_friend(&self, _token: &str, _email: &str) -> Result<()> {
        self.hit("/friends/add")
    }

    async fn delete_friend(&self, _token: &str, friend_id: &str) -> Result<()> {
        self.hit("/friends/delete")?;
        self.friends.lock().retain(|f| f.id != friend_id);
        Ok(())
    }

    async fn calendar_link_status(&self, _token: &str) -> Result<CalendarLinkStatus> {
        self.hit("/calendar/link-status")?;
        Ok(self.link_status.lock().clone())
    }

    async fn calendar_link_url(&self, _token: &str) -> Result<String> {
        self.hit("/calendar/link-url")?;
        Ok("https://accounts.example.com/o/oauth2".to_string())
    }

    async fn list_events(&self, _token: &str) -> Result<Vec<CalendarEvent>> {
        self.hit("/calendar/events")?;
        Ok(self.events.lock().clone())
    }

    async fn create_event(&self, _token: &str, event: &NewCalendarEvent) -> Result<CalendarEvent> {
        self.hit("/calendar/events:create")?;
        let created = CalendarEvent {
            id: format!("evt-{}", self.events.lock().len() + 1),
            summary: event.summary.clone(),
            start: event.start.clone(),
            end: event.end.clone(),
            location: event.location.clone(),
            html_link: None,
        };
        self.events.lock().push(created.clone());
        Ok(created)
    }

    async fn delete_event(&self, _token: &str, event_id: &str) -> Result<()> {
        self.hit("/calendar/events:delete")?;
        self.events.lock().retain(|e| e.id != event_id);
        Ok(())
    }

    async fn send_chat(&self, _token: &str, request: &ChatRequest) -> Result<ChatResponse> {
        self.hit("/chat/chat")?;
        Ok(ChatResponse {
            response: format!("echo: {}", request.message),
            session_id: request.session_id.clone(),
        })
    }

    async fn list_sessions(&self, _token: &str) -> Result<Vec<A2aSession>> {
        self.hit("/a2a/sessions")?;
        Ok(self.sessions.lock().clone())
    }

    async fn list_pending_requests(&self, _token: &str) -> Result<Vec<PendingRequest>> {
        self.hit("/a2a/pending-requests")?;
        Ok(self.pending.lock().clone())
    }

    async fn open_negotiation_stream(
        &self,
        _token: &str,
        _session_id: &str,
    ) -> Result<mpsc::Receiver<NegotiationMessage>> {
        self.hit("/a2a/negotiate/stream")?;
        let messages = self.negotiation.lock().clone();
        let (tx, rx) = mpsc::channel(messages.len().max(1));
        for message in messages {
            let _ = tx.try_send(message);
        }
        Ok(rx)
    }

    async fn list_notifications(&self, _token: &str) -> Result<Vec<Notification>> {
        self.hit("/chat/notifications")?;
        Ok(self.notifications.lock().clone())
    }

    async fn unread_count(&self, _token: &str, last_read_at: Option<DateTime<Utc>>) -> Result<u32> {
        self.hit("/chat/unread-count")?;
        *self.last_read_at_seen.lock() = last_read_at;
        Ok(*self.unread.lock())
    }
}

/// Memory-backed session, optionally logged in
pub(crate) async fn session(with_token: bool) -> (AuthSession, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    if with_token {
        storage
            .set(keys::AUTH_TOKEN, "test-token")
            .await
            .expect("memory storage never fails");
    }
    let dyn_storage: Arc<dyn KeyValueStorage> = storage.clone();
    (AuthSession::new(dyn_storage), storage)
}

pub(crate) fn friend(id: &str) -> Friend {
    Friend {
        id: id.to_string(),
        email: format!("{}@joyner.test", id),
        name: Some(id.to_uppercase()),
        profile_image: None,
        created_at: None,
    }
}

pub(crate) fn friend_request(id: &str, from: &str) -> FriendRequest {
    FriendRequest {
        id: id.to_string(),
        from_user_id: from.to_string(),
        from_email: format!("{}@joyner.test", from),
        from_name: None,
        from_profile_image: None,
        created_at: None,
    }
}

pub(crate) fn user(id: &str) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        email: format!("{}@joyner.test", id),
        name: Some("Test User".to_string()),
        profile_image: None,
        created_at: None,
    }
}

pub(crate) fn event(id: &str) -> CalendarEvent {
    CalendarEvent {
        id: id.to_string(),
        summary: format!("Event {}", id),
        start: "2026-03-02T10:00:00Z".to_string(),
        end: "2026-03-02T11:00:00Z".to_string(),
        location: None,
        html_link: None,
    }
}

pub(crate) fn a2a_session(id: &str, status: SessionStatus) -> A2aSession {
    A2aSession {
        id: id.to_string(),
        status,
        title: Some("Lunch".to_string()),
        participant_names: vec!["Mina".to_string()],
        proposed_start: None,
        proposed_end: None,
        created_at: None,
        updated_at: None,
    }
}

pub(crate) fn pending_request(id: &str, session_id: &str) -> PendingRequest {
    PendingRequest {
        id: id.to_string(),
        session_id: session_id.to_string(),
        from_user_id: "u2".to_string(),
        from_name: Some("Mina".to_string()),
        title: None,
        proposed_start: None,
        created_at: None,
    }
}

pub(crate) fn notification(id: &str, read: bool) -> Notification {
    Notification {
        id: id.to_string(),
        kind: "a2a_request".to_string(),
        title: "Meeting request".to_string(),
        message: "Mina wants to meet".to_string(),
        read,
        session_id: None,
        created_at: None,
    }
}
