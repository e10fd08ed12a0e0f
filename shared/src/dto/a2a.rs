//! # Agent-to-Agent (A2A) Data Transfer Objects
//!
//! Sessions, pending meeting requests, the chat entry point, and the messages
//! streamed by `GET /a2a/session/{id}/negotiate/stream`.

use serde::{Deserialize, Serialize};

/// Lifecycle of an A2A negotiation session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    InProgress,
    NeedHuman,
    Completed,
    Rejected,
    Failed,
    #[serde(other)]
    Unknown,
}

impl SessionStatus {
    /// Whether the session can still change state
    pub fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::InProgress | Self::NeedHuman)
    }
}

/// A2A session summary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct A2aSession {
    pub id: String,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub participant_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Meeting request waiting for this user's answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingRequest {
    pub id: String,
    pub session_id: String,
    pub from_user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// `GET /a2a/sessions`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionsResponse {
    #[serde(default)]
    pub sessions: Vec<A2aSession>,
}

/// `GET /a2a/pending-requests`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PendingRequestsResponse {
    #[serde(default)]
    pub requests: Vec<PendingRequest>,
}

/// `POST /chat/chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selected_friend_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Reply from `POST /chat/chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Proposed time window
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeSlot {
    pub start: String,
    pub end: String,
}

/// Payload shared by every negotiation message
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NegotiationTurn {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposal: Option<TimeSlot>,
}

/// Message streamed over SSE while agents negotiate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NegotiationMessage {
    Start(NegotiationTurn),
    Propose(NegotiationTurn),
    Accept(NegotiationTurn),
    Reject(NegotiationTurn),
    Counter(NegotiationTurn),
    NeedHuman(NegotiationTurn),
    End(NegotiationTurn),
    Error(NegotiationTurn),
}

impl NegotiationMessage {
    pub fn turn(&self) -> &NegotiationTurn {
        match self {
            Self::Start(t)
            | Self::Propose(t)
            | Self::Accept(t)
            | Self::Reject(t)
            | Self::Counter(t)
            | Self::NeedHuman(t)
            | Self::End(t)
            | Self::Error(t) => t,
        }
    }

    /// Wire name of the message type
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Start(_) => "START",
            Self::Propose(_) => "PROPOSE",
            Self::Accept(_) => "ACCEPT",
            Self::Reject(_) => "REJECT",
            Self::Counter(_) => "COUNTER",
            Self::NeedHuman(_) => "NEED_HUMAN",
            Self::End(_) => "END",
            Self::Error(_) => "ERROR",
        }
    }

    /// `END` and `ERROR` close the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::End(_) | Self::Error(_))
    }
}
