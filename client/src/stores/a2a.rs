//! Agent-to-agent negotiation sessions and meeting requests awaiting an answer

use shared::dto::{A2aSession, ChatRequest, ChatResponse, PendingRequest, SessionStatus};
use std::sync::Arc;
use std::time::Duration;

use super::{Field, LoadStatus, StoreCore, StoreState};
use crate::core::{ApiService, Result, Unsubscribe};
use crate::services::session::AuthSession;

pub const A2A_TTL: Duration = Duration::from_secs(3 * 60);

const SESSIONS: &str = "sessions";
const PENDING: &str = "pending_requests";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct A2aState {
    pub sessions: Vec<A2aSession>,
    pub pending_requests: Vec<PendingRequest>,
    pub sessions_loading: bool,
    pub pending_loading: bool,
    pub status: LoadStatus,
}

impl A2aState {
    /// Sessions still negotiating or waiting on a human
    pub fn open_sessions(&self) -> impl Iterator<Item = &A2aSession> {
        self.sessions.iter().filter(|s| s.status.is_open())
    }
}

impl StoreState for A2aState {
    fn status(&self) -> &LoadStatus {
        &self.status
    }

    fn status_mut(&mut self) -> &mut LoadStatus {
        &mut self.status
    }
}

const SESSIONS_FIELD: Field<A2aState, Vec<A2aSession>> = Field {
    name: SESSIONS,
    get: |s| &s.sessions,
    get_mut: |s| &mut s.sessions,
    loading: |s| &mut s.sessions_loading,
};

const PENDING_FIELD: Field<A2aState, Vec<PendingRequest>> = Field {
    name: PENDING,
    get: |s| &s.pending_requests,
    get_mut: |s| &mut s.pending_requests,
    loading: |s| &mut s.pending_loading,
};

pub struct A2aStore {
    core: StoreCore<A2aState>,
    api: Arc<dyn ApiService>,
    session: AuthSession,
}

impl A2aStore {
    pub fn new(api: Arc<dyn ApiService>, session: AuthSession) -> Self {
        Self {
            core: StoreCore::new("a2a", A2A_TTL),
            api,
            session,
        }
    }

    pub fn get_snapshot(&self) -> Arc<A2aState> {
        self.core.snapshot()
    }

    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) -> Unsubscribe {
        self.core.subscribe(listener)
    }

    pub async fn fetch_sessions(&self, force: bool) -> Vec<A2aSession> {
        let api = &self.api;
        self.core
            .load(&SESSIONS_FIELD, force, &self.session, |token| async move {
                api.list_sessions(&token).await
            })
            .await
    }

    pub async fn fetch_pending_requests(&self, force: bool) -> Vec<PendingRequest> {
        let api = &self.api;
        self.core
            .load(&PENDING_FIELD, force, &self.session, |token| async move {
                api.list_pending_requests(&token).await
            })
            .await
    }

    pub async fn fetch_all(&self, force: bool) {
        self.core
            .load_all(force, &[SESSIONS, PENDING], async {
                tokio::join!(self.fetch_sessions(force), self.fetch_pending_requests(force));
            })
            .await;
    }

    pub fn invalidate(&self) {
        self.core.invalidate();
    }

    pub async fn refresh(&self) {
        self.fetch_all(true).await;
    }

    pub fn remove_pending_request(&self, request_id: &str) {
        self.core.modify(|s| s.pending_requests.retain(|r| r.id != request_id));
    }

    pub fn update_session_status(&self, session_id: &str, status: SessionStatus) {
        self.core.modify(|s| {
            if let Some(session) = s.sessions.iter_mut().find(|x| x.id == session_id) {
                session.status = status;
            }
        });
    }

    /// Drops the session and any pending request that points at it
    pub fn remove_session(&self, session_id: &str) {
        self.core.modify(|s| {
            s.sessions.retain(|x| x.id != session_id);
            s.pending_requests.retain(|r| r.session_id != session_id);
        });
    }

    /// Ask the assistant to arrange a meeting; the new session shows up on
    /// the next sessions fetch, which this triggers.
    pub async fn start_chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let token = self.session.require_token().await?;
        let response = self.api.send_chat(&token, request).await?;
        self.fetch_sessions(true).await;
        Ok(response)
    }
}
