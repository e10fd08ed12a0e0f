//! # Service Traits
//!
//! Seams for dependency injection: stores and the app context talk to the
//! backend only through [`ApiService`], so tests swap in a mock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::dto::{
    A2aSession, CalendarEvent, CalendarLinkStatus, ChatRequest, ChatResponse, Friend,
    FriendRequest, NegotiationMessage, NewCalendarEvent, Notification, PendingRequest,
    UserProfile,
};
use tokio::sync::mpsc;

use super::error::Result;

/// Backend REST/SSE operations.
///
/// Every call takes the bearer token explicitly; reading it from durable
/// storage is the caller's job (see `services::session::AuthSession`).
#[async_trait]
pub trait ApiService: Send + Sync {
    // ---- auth ----

    /// `GET /auth/me`
    async fn get_me(&self, token: &str) -> Result<UserProfile>;

    // ---- friends ----

    /// `GET /friends/list`
    async fn list_friends(&self, token: &str) -> Result<Vec<Friend>>;

    /// `GET /friends/requests`
    async fn list_friend_requests(&self, token: &str) -> Result<Vec<FriendRequest>>;

    /// `POST /friends/accept/{id}`
    async fn accept_friend_request(&self, token: &str, request_id: &str) -> Result<Option<Friend>>;

    /// `POST /friends/reject/{id}`
    async fn reject_friend_request(&self, token: &str, request_id: &str) -> Result<()>;

    /// `POST /friends/add`
    async fn add_friend(&self, token: &str, email: &str) -> Result<()>;

    /// `DELETE /friends/{id}`
    async fn delete_friend(&self, token: &str, friend_id: &str) -> Result<()>;

    // ---- calendar ----

    /// `GET /calendar/link-status`
    async fn calendar_link_status(&self, token: &str) -> Result<CalendarLinkStatus>;

    /// `GET /calendar/link-url`
    async fn calendar_link_url(&self, token: &str) -> Result<String>;

    /// `GET /calendar/events`
    async fn list_events(&self, token: &str) -> Result<Vec<CalendarEvent>>;

    /// `POST /calendar/events`
    async fn create_event(&self, token: &str, event: &NewCalendarEvent) -> Result<CalendarEvent>;

    /// `DELETE /calendar/events/{id}`
    async fn delete_event(&self, token: &str, event_id: &str) -> Result<()>;

    // ---- chat / a2a ----

    /// `POST /chat/chat`
    async fn send_chat(&self, token: &str, request: &ChatRequest) -> Result<ChatResponse>;

    /// `GET /a2a/sessions`
    async fn list_sessions(&self, token: &str) -> Result<Vec<A2aSession>>;

    /// `GET /a2a/pending-requests`
    async fn list_pending_requests(&self, token: &str) -> Result<Vec<PendingRequest>>;

    /// `GET /a2a/session/{id}/negotiate/stream`, parsed into messages.
    ///
    /// The receiver closes after a terminal message or when the stream ends.
    async fn open_negotiation_stream(
        &self,
        token: &str,
        session_id: &str,
    ) -> Result<mpsc::Receiver<NegotiationMessage>>;

    // ---- notifications ----

    /// `GET /chat/notifications`
    async fn list_notifications(&self, token: &str) -> Result<Vec<Notification>>;

    /// `GET /chat/unread-count?last_read_at=...`
    async fn unread_count(&self, token: &str, last_read_at: Option<DateTime<Utc>>) -> Result<u32>;
}
