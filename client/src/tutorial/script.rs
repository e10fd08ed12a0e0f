//! Static onboarding script: ordered steps, each an ordered list of sub-steps.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::core::{AppError, Result};

/// Named tutorial steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TutorialStep {
    Welcome,
    Friends,
    Chat,
    Schedule,
    Finish,
}

/// What the user is expected to do on a sub-step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubStepAction {
    /// Read and continue
    None,
    /// Tap the highlighted target
    Tap,
    /// Type into the highlighted target
    Input,
    /// Wait while the app does something (auto-advances)
    Wait,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubStep {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    /// UI element to highlight; also keys the action registry
    pub target_id: Option<&'static str>,
    pub action: SubStepAction,
    pub auto_advance: bool,
    /// Pause before an auto-advance
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepData {
    pub step: TutorialStep,
    pub title: &'static str,
    pub sub_steps: Vec<SubStep>,
}

/// Validated script: at least one step, no step repeated, no empty step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorialScript {
    steps: Vec<StepData>,
}

impl TutorialScript {
    pub fn new(steps: Vec<StepData>) -> Result<Self> {
        if steps.is_empty() {
            return Err(AppError::Tutorial("Script has no steps".to_string()));
        }
        let mut seen = HashSet::new();
        for step in &steps {
            if !seen.insert(step.step) {
                return Err(AppError::Tutorial(format!("Step {:?} appears twice", step.step)));
            }
            if step.sub_steps.is_empty() {
                return Err(AppError::Tutorial(format!("Step {:?} has no sub-steps", step.step)));
            }
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[StepData] {
        &self.steps
    }

    pub fn first_step(&self) -> TutorialStep {
        self.steps[0].step
    }

    pub fn index_of(&self, step: TutorialStep) -> Option<usize> {
        self.steps.iter().position(|s| s.step == step)
    }

    pub fn step(&self, step: TutorialStep) -> Option<&StepData> {
        self.steps.iter().find(|s| s.step == step)
    }

    pub fn sub_step(&self, step: TutorialStep, index: usize) -> Option<&SubStep> {
        self.step(step).and_then(|s| s.sub_steps.get(index))
    }

    pub fn total_sub_steps(&self) -> usize {
        self.steps.iter().map(|s| s.sub_steps.len()).sum()
    }

    /// Position after `(step, index)`, or `None` at the very end
    pub fn next_position(&self, step: TutorialStep, index: usize) -> Option<(TutorialStep, usize)> {
        let i = self.index_of(step)?;
        if index + 1 < self.steps[i].sub_steps.len() {
            Some((step, index + 1))
        } else {
            self.steps.get(i + 1).map(|next| (next.step, 0))
        }
    }

    /// Position before `(step, index)`, or `None` at the very start
    pub fn prev_position(&self, step: TutorialStep, index: usize) -> Option<(TutorialStep, usize)> {
        let i = self.index_of(step)?;
        if index > 0 {
            Some((step, index.min(self.steps[i].sub_steps.len()) - 1))
        } else if i > 0 {
            let prev = &self.steps[i - 1];
            Some((prev.step, prev.sub_steps.len() - 1))
        } else {
            None
        }
    }
}

const fn sub(
    id: &'static str,
    title: &'static str,
    description: &'static str,
    target_id: Option<&'static str>,
    action: SubStepAction,
) -> SubStep {
    SubStep {
        id,
        title,
        description,
        target_id,
        action,
        auto_advance: false,
        delay: Duration::ZERO,
    }
}

const fn auto(id: &'static str, title: &'static str, description: &'static str, delay_ms: u64) -> SubStep {
    SubStep {
        id,
        title,
        description,
        target_id: None,
        action: SubStepAction::Wait,
        auto_advance: true,
        delay: Duration::from_millis(delay_ms),
    }
}

/// JOYNER onboarding: meet the app, add a friend, ask the assistant for a
/// meeting, review the proposed schedule.
pub static DEFAULT_SCRIPT: Lazy<TutorialScript> = Lazy::new(|| TutorialScript {
    steps: vec![
        StepData {
            step: TutorialStep::Welcome,
            title: "Welcome to JOYNER",
            sub_steps: vec![
                sub("welcome_intro", "Welcome", "Your assistant schedules meetings with friends for you.", None, SubStepAction::None),
                sub("welcome_home", "Home", "Your linked calendar and upcoming events live here.", Some("home_calendar_card"), SubStepAction::None),
            ],
        },
        StepData {
            step: TutorialStep::Friends,
            title: "Add a friend",
            sub_steps: vec![
                sub("friends_tab", "Friends", "Open the friends tab.", Some("friends_tab"), SubStepAction::Tap),
                sub("friends_add", "Add friend", "Tap the button to add a friend by email.", Some("add_friend_button"), SubStepAction::Tap),
                sub("friends_email", "Email", "Enter your friend's email address.", Some("add_friend_input"), SubStepAction::Input),
                auto("friends_sent", "Request sent", "Your friend will see the request right away.", 1500),
            ],
        },
        StepData {
            step: TutorialStep::Chat,
            title: "Ask for a meeting",
            sub_steps: vec![
                sub("chat_tab", "Chat", "Open the chat with your assistant.", Some("chat_tab"), SubStepAction::Tap),
                sub("chat_select_friend", "Pick a friend", "Choose who you want to meet.", Some("friend_select_demo"), SubStepAction::Tap),
                sub("chat_message", "Message", "Say when you'd like to meet, in your own words.", Some("chat_input"), SubStepAction::Input),
                sub("chat_send", "Send", "Send the request. Your agents start negotiating.", Some("chat_send_button"), SubStepAction::Tap),
                auto("chat_negotiating", "Negotiating", "The agents compare calendars and propose a time.", 2000),
            ],
        },
        StepData {
            step: TutorialStep::Schedule,
            title: "Review the proposal",
            sub_steps: vec![
                sub("schedule_card", "Proposal", "Here is the time the agents agreed on.", Some("a2a_proposal_card"), SubStepAction::None),
                sub("schedule_approve", "Approve", "Approve to add it to both calendars.", Some("a2a_approve_button"), SubStepAction::Tap),
            ],
        },
        StepData {
            step: TutorialStep::Finish,
            title: "All set",
            sub_steps: vec![sub(
                "finish_done",
                "Done",
                "You can replay this tutorial from settings.",
                None,
                SubStepAction::None,
            )],
        },
    ],
});
