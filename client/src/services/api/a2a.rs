//! # Chat and A2A API Client
//!
//! Chat entry point, session listings, and the negotiation SSE stream.

use shared::dto::{
    A2aSession, ChatRequest, ChatResponse, NegotiationMessage, PendingRequest,
    PendingRequestsResponse, SessionsResponse,
};
use tokio::sync::mpsc;
use tracing::info;

use super::client::ApiClient;
use crate::core::{AppError, Result};
use crate::debug::spawn_tracked;
use crate::services::sse::forward_events;

/// Buffered negotiation messages before the reader applies backpressure
const NEGOTIATION_CHANNEL_CAPACITY: usize = 100;

impl ApiClient {
    /// Send a chat message to the scheduling assistant
    pub async fn send_chat(&self, token: &str, request: &ChatRequest) -> Result<ChatResponse> {
        let builder = self
            .client
            .post(self.url("/chat/chat"))
            .bearer_auth(token)
            .json(request);
        self.send("/chat/chat", builder)
            .await?
            .json::<ChatResponse>()
            .await
            .map_err(|e| AppError::Parse(format!("Failed to parse chat response: {}", e)))
    }

    pub async fn list_sessions(&self, token: &str) -> Result<Vec<A2aSession>> {
        let response: SessionsResponse = self.get_json("/a2a/sessions", token).await?;
        Ok(response.sessions)
    }

    pub async fn list_pending_requests(&self, token: &str) -> Result<Vec<PendingRequest>> {
        let response: PendingRequestsResponse = self.get_json("/a2a/pending-requests", token).await?;
        Ok(response.requests)
    }

    /// Start the negotiation stream for a session.
    ///
    /// The HTTP request is made here so connection and status errors surface
    /// to the caller; the body is then consumed by a background task that
    /// forwards parsed messages until `END`/`ERROR` or the end of the body.
    pub async fn open_negotiation_stream(
        &self,
        token: &str,
        session_id: &str,
    ) -> Result<mpsc::Receiver<NegotiationMessage>> {
        let request = self
            .stream_client
            .get(self.url(&format!("/a2a/session/{}/negotiate/stream", session_id)))
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "text/event-stream");
        let response = self.send("/a2a/session/negotiate/stream", request).await?;

        let (tx, rx) = mpsc::channel(NEGOTIATION_CHANNEL_CAPACITY);
        let session_id = session_id.to_string();
        spawn_tracked("negotiation_stream", async move {
            let forwarded = forward_events(
                Box::pin(response.bytes_stream()),
                tx,
                NegotiationMessage::is_terminal,
            )
            .await;
            info!(session_id = %session_id, forwarded, "Negotiation stream closed");
        });

        Ok(rx)
    }
}
