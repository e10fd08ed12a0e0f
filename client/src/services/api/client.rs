//! # API Client
//!
//! Main HTTP client for backend API communication.

use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::dto::{
    A2aSession, CalendarEvent, CalendarLinkStatus, ChatRequest, ChatResponse, ErrorResponse, Friend,
    FriendRequest, NegotiationMessage, NewCalendarEvent, Notification, PendingRequest, UserProfile,
};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::core::{ApiService, AppError, ClientConfig, Result};

/// HTTP client for communicating with the backend API server.
///
/// Holds two `reqwest` clients sharing the same settings except the timeout:
/// the SSE client has none because negotiation streams stay open for minutes.
pub struct ApiClient {
    pub(crate) client: Client,
    pub(crate) stream_client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client from configuration.
    pub fn new(config: &ClientConfig) -> Self {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            stream_client: Client::new(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Get the base URL for API requests.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and map failures into [`AppError`].
    pub(crate) async fn send(&self, endpoint: &'static str, request: RequestBuilder) -> Result<Response> {
        let started = Instant::now();
        let response = request.send().await.map_err(|e| {
            warn!(endpoint, error = %e, "Network error");
            AppError::Api(format!("Network error: {}", e))
        })?;

        let status = response.status();
        debug!(
            endpoint,
            status = status.as_u16(),
            duration_ms = started.elapsed().as_millis(),
            "API call completed"
        );

        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.detail)
                .unwrap_or_else(|_| if body.is_empty() { status.to_string() } else { body });
            warn!(endpoint, status = status.as_u16(), detail = %detail, "API error");
            Err(AppError::Http {
                status: status.as_u16(),
                detail,
            })
        }
    }

    /// Authenticated GET returning JSON.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, endpoint: &'static str, token: &str) -> Result<T> {
        let request = self.client.get(self.url(endpoint)).bearer_auth(token);
        let response = self.send(endpoint, request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| AppError::Parse(format!("Failed to parse {} response: {}", endpoint, e)))
    }
}

// Implement ApiService trait for ApiClient
#[async_trait::async_trait]
impl ApiService for ApiClient {
    async fn get_me(&self, token: &str) -> Result<UserProfile> {
        ApiClient::get_me(self, token).await
    }

    async fn list_friends(&self, token: &str) -> Result<Vec<Friend>> {
        ApiClient::list_friends(self, token).await
    }

    async fn list_friend_requests(&self, token: &str) -> Result<Vec<FriendRequest>> {
        ApiClient::list_friend_requests(self, token).await
    }

    async fn accept_friend_request(&self, token: &str, request_id: &str) -> Result<Option<Friend>> {
        ApiClient::accept_friend_request(self, token, request_id).await
    }

    async fn reject_friend_request(&self, token: &str, request_id: &str) -> Result<()> {
        ApiClient::reject_friend_request(self, token, request_id).await
    }

    async fn add_friend(&self, token: &str, email: &str) -> Result<()> {
        ApiClient::add_friend(self, token, email).await
    }

    async fn delete_friend(&self, token: &str, friend_id: &str) -> Result<()> {
        ApiClient::delete_friend(self, token, friend_id).await
    }

    async fn calendar_link_status(&self, token: &str) -> Result<CalendarLinkStatus> {
        ApiClient::calendar_link_status(self, token).await
    }

    async fn calendar_link_url(&self, token: &str) -> Result<String> {
        ApiClient::calendar_link_url(self, token).await
    }

    async fn list_events(&self, token: &str) -> Result<Vec<CalendarEvent>> {
        ApiClient::list_events(self, token).await
    }

    async fn create_event(&self, token: &str, event: &NewCalendarEvent) -> Result<CalendarEvent> {
        ApiClient::create_event(self, token, event).await
    }

    async fn delete_event(&self, token: &str, event_id: &str) -> Result<()> {
        ApiClient::delete_event(self, token, event_id).await
    }

    async fn send_chat(&self, token: &str, request: &ChatRequest) -> Result<ChatResponse> {
        ApiClient::send_chat(self, token, request).await
    }

    async fn list_sessions(&self, token: &str) -> Result<Vec<A2aSession>> {
        ApiClient::list_sessions(self, token).await
    }

    async fn list_pending_requests(&self, token: &str) -> Result<Vec<PendingRequest>> {
        ApiClient::list_pending_requests(self, token).await
    }

    async fn open_negotiation_stream(
        &self,
        token: &str,
        session_id: &str,
    ) -> Result<mpsc::Receiver<NegotiationMessage>> {
        ApiClient::open_negotiation_stream(self, token, session_id).await
    }

    async fn list_notifications(&self, token: &str) -> Result<Vec<Notification>> {
        ApiClient::list_notifications(self, token).await
    }

    async fn unread_count(&self, token: &str, last_read_at: Option<DateTime<Utc>>) -> Result<u32> {
        ApiClient::unread_count(self, token, last_read_at).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let config = ClientConfig {
            api_base_url: "https://api.joyner.app/".to_string(),
            ..ClientConfig::default()
        };
        let client = ApiClient::new(&config);
        assert_eq!(client.base_url(), "https://api.joyner.app");
        assert_eq!(client.url("/friends/list"), "https://api.joyner.app/friends/list");
    }
}
