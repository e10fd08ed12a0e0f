//! # Negotiation View Model
//!
//! Folds the SSE messages of one A2A negotiation into a transcript and a
//! status a screen can render directly.
//!
//! ```text
//! START/PROPOSE/COUNTER/REJECT ──► Running
//! NEED_HUMAN ────────────────────► NeedsHuman
//! ACCEPT ────────────────────────► Agreed
//! END ───────────────────────────► Ended (Agreed stays Agreed)
//! ERROR ─────────────────────────► Failed
//! ```

use shared::dto::{NegotiationMessage, TimeSlot};
use tracing::{debug, info, warn};

use crate::core::{ApiService, Result};
use crate::services::session::AuthSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationStatus {
    Running,
    NeedsHuman,
    Agreed,
    Ended,
    Failed,
}

#[derive(Debug, Clone)]
pub struct NegotiationLog {
    session_id: String,
    messages: Vec<NegotiationMessage>,
    status: NegotiationStatus,
    latest_proposal: Option<TimeSlot>,
    error: Option<String>,
    finished: bool,
}

impl NegotiationLog {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            messages: Vec::new(),
            status: NegotiationStatus::Running,
            latest_proposal: None,
            error: None,
            finished: false,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn messages(&self) -> &[NegotiationMessage] {
        &self.messages
    }

    pub fn status(&self) -> NegotiationStatus {
        self.status
    }

    pub fn latest_proposal(&self) -> Option<&TimeSlot> {
        self.latest_proposal.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// A terminal message (END or ERROR) was received
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Highest round number seen
    pub fn rounds(&self) -> u32 {
        self.messages.iter().filter_map(|m| m.turn().round).max().unwrap_or(0)
    }

    /// Fold one message in. Messages after a terminal one are ignored.
    pub fn apply(&mut self, message: NegotiationMessage) -> NegotiationStatus {
        if self.finished {
            debug!(kind = message.kind(), "Ignoring message after negotiation finished");
            return self.status;
        }

        if let Some(proposal) = &message.turn().proposal {
            self.latest_proposal = Some(proposal.clone());
        }

        self.status = match &message {
            NegotiationMessage::Start(_)
            | NegotiationMessage::Propose(_)
            | NegotiationMessage::Counter(_)
            | NegotiationMessage::Reject(_) => NegotiationStatus::Running,
            NegotiationMessage::NeedHuman(_) => NegotiationStatus::NeedsHuman,
            NegotiationMessage::Accept(_) => NegotiationStatus::Agreed,
            NegotiationMessage::End(_) if self.status == NegotiationStatus::Agreed => NegotiationStatus::Agreed,
            NegotiationMessage::End(_) => NegotiationStatus::Ended,
            NegotiationMessage::Error(turn) => {
                self.error = Some(turn.message.clone().unwrap_or_else(|| "Negotiation failed".to_string()));
                NegotiationStatus::Failed
            }
        };
        self.finished = message.is_terminal();
        self.messages.push(message);
        self.status
    }

    /// One display line per message
    pub fn transcript(&self) -> Vec<String> {
        self.messages
            .iter()
            .map(|m| {
                let turn = m.turn();
                let round = turn.round.map(|r| format!("[{}] ", r)).unwrap_or_default();
                let agent = turn.agent.as_deref().unwrap_or("system");
                let text = turn.message.as_deref().unwrap_or("");
                format!("{}{} {}: {}", round, m.kind(), agent, text)
            })
            .collect()
    }

    /// Open the negotiation stream and fold messages until it ends.
    ///
    /// `on_message` sees every message after it is applied.
    pub async fn follow(
        api: &dyn ApiService,
        session: &AuthSession,
        session_id: &str,
        mut on_message: impl FnMut(&NegotiationMessage, &NegotiationLog),
    ) -> Result<NegotiationLog> {
        let token = session.require_token().await?;
        let mut rx = api.open_negotiation_stream(&token, session_id).await?;
        let mut log = NegotiationLog::new(session_id);
        info!(session_id, "Following negotiation");

        while let Some(message) = rx.recv().await {
            let shown = message.clone();
            log.apply(message);
            on_message(&shown, &log);
            if log.is_finished() {
                break;
            }
        }

        if !log.is_finished() {
            warn!(session_id, messages = log.messages.len(), "Negotiation stream closed early");
        }
        info!(session_id, status = ?log.status, rounds = log.rounds(), "Negotiation stream done");
        Ok(log)
    }
}
