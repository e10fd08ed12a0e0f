//! # Guided Tutorial
//!
//! Scripted onboarding driven as a sequence of steps and sub-steps.
//!
//! - **[`script`]**: the static step/sub-step data and the default JOYNER script
//! - **[`machine`]**: navigation, persistence and the progress watch channel
//! - **[`registry`]**: target (highlight) and action (callback) side tables
//!
//! ```rust,no_run
//! # async fn demo() -> joyner::core::Result<()> {
//! use std::sync::Arc;
//! use joyner::services::storage::MemoryStorage;
//! use joyner::tutorial::TutorialMachine;
//!
//! let machine = TutorialMachine::with_default_script(Arc::new(MemoryStorage::new()));
//! machine.restore().await?;
//! if machine.should_auto_start().await? {
//!     machine.start_tutorial().await?;
//! }
//! machine.next_sub_step().await?;
//! # Ok(())
//! # }
//! ```

pub mod machine;
pub mod registry;
pub mod script;

pub use machine::{Transition, TutorialMachine, TutorialProgress};
pub use registry::{ActionCallback, ActionRegistry, TargetLayout, TargetRegistry, TutorialTarget};
pub use script::{StepData, SubStep, SubStepAction, TutorialScript, TutorialStep, DEFAULT_SCRIPT};
