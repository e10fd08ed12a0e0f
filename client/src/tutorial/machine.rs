//! Tutorial progress state machine.
//!
//! ```text
//!   start_tutorial()          next_sub_step()           last sub-step
//! ────────────────► (step, i) ───────────────► (step, i+1) ... ─────────► Completed
//!                       │   ◄───────────────                                  ▲
//!                       │     prev_sub_step()                                 │
//!                       └── skip_tutorial() ──► Skipped      complete_tutorial()
//! ```
//!
//! Every transition is written to durable storage before it is published,
//! so a restart resumes where the user left off.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use super::registry::{ActionRegistry, TargetLayout, TargetRegistry, TutorialTarget};
use super::script::{SubStep, TutorialScript, TutorialStep, DEFAULT_SCRIPT};
use crate::core::{AppError, Result};
use crate::services::storage::{get_json, keys, set_json, KeyValueStorage};

const FLAG_SET: &str = "true";

/// Runtime position, persisted after every transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TutorialProgress {
    pub current_step: TutorialStep,
    pub current_sub_step_index: usize,
    pub is_tutorial_active: bool,
    pub is_completed: bool,
}

impl TutorialProgress {
    fn at_start(script: &TutorialScript, active: bool) -> Self {
        Self {
            current_step: script.first_step(),
            current_sub_step_index: 0,
            is_tutorial_active: active,
            is_completed: false,
        }
    }
}

/// Outcome of a navigation call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Moved to `(step, sub_step_index)`
    Moved(TutorialStep, usize),
    /// Already at the boundary; nothing changed
    Unchanged,
    /// The last sub-step was passed and the tutorial completed
    Completed,
    /// The tutorial is not running
    Inactive,
}

pub struct TutorialMachine {
    script: Arc<TutorialScript>,
    storage: Arc<dyn KeyValueStorage>,
    progress: watch::Sender<TutorialProgress>,
    /// Serializes transitions so persisted order matches published order
    transition_lock: Mutex<()>,
    targets: TargetRegistry,
    actions: ActionRegistry,
}

impl TutorialMachine {
    pub fn new(script: Arc<TutorialScript>, storage: Arc<dyn KeyValueStorage>) -> Self {
        let (progress, _) = watch::channel(TutorialProgress::at_start(&script, false));
        Self {
            script,
            storage,
            progress,
            transition_lock: Mutex::new(()),
            targets: TargetRegistry::new(),
            actions: ActionRegistry::new(),
        }
    }

    pub fn with_default_script(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self::new(Arc::new(DEFAULT_SCRIPT.clone()), storage)
    }

    pub fn script(&self) -> &TutorialScript {
        &self.script
    }

    pub fn progress(&self) -> TutorialProgress {
        self.progress.borrow().clone()
    }

    /// Follow transitions (UI binding)
    pub fn watch(&self) -> watch::Receiver<TutorialProgress> {
        self.progress.subscribe()
    }

    /// Sub-step being shown, if the tutorial is running
    pub fn current_sub_step(&self) -> Option<SubStep> {
        let progress = self.progress.borrow();
        if !progress.is_tutorial_active {
            return None;
        }
        self.script
            .sub_step(progress.current_step, progress.current_sub_step_index)
            .cloned()
    }

    /// Load persisted progress. A position the script no longer has resets
    /// to the start, inactive.
    pub async fn restore(&self) -> Result<TutorialProgress> {
        let _guard = self.transition_lock.lock().await;
        let stored: Option<TutorialProgress> = get_json(self.storage.as_ref(), keys::TUTORIAL_PROGRESS).await?;
        let completed = self.flag(keys::TUTORIAL_COMPLETED).await?;

        let mut progress = match stored {
            Some(p) if self.script.sub_step(p.current_step, p.current_sub_step_index).is_some() => p,
            Some(p) => {
                warn!(step = ?p.current_step, index = p.current_sub_step_index, "Stored tutorial position not in script");
                TutorialProgress::at_start(&self.script, false)
            }
            None => TutorialProgress::at_start(&self.script, false),
        };
        if completed {
            progress.is_completed = true;
            progress.is_tutorial_active = false;
        }

        debug!(progress = ?progress, "Tutorial progress restored");
        self.progress.send_replace(progress.clone());
        Ok(progress)
    }

    /// True unless the tutorial was completed or skipped before
    pub async fn should_auto_start(&self) -> Result<bool> {
        Ok(!self.flag(keys::TUTORIAL_COMPLETED).await? && !self.flag(keys::TUTORIAL_SKIPPED).await?)
    }

    pub async fn start_tutorial(&self) -> Result<()> {
        let _guard = self.transition_lock.lock().await;
        info!("Tutorial started");
        self.commit(TutorialProgress::at_start(&self.script, true)).await
    }

    pub async fn next_sub_step(&self) -> Result<Transition> {
        self.next_sub_step_if(None).await
    }

    /// Advance, but only from `expected` when given. The position check and
    /// the move happen under the same transition lock.
    async fn next_sub_step_if(&self, expected: Option<&TutorialProgress>) -> Result<Transition> {
        let _guard = self.transition_lock.lock().await;
        let current = self.progress();
        if expected.is_some_and(|expected| *expected != current) {
            return Ok(Transition::Unchanged);
        }
        if !current.is_tutorial_active {
            return Ok(Transition::Inactive);
        }

        match self
            .script
            .next_position(current.current_step, current.current_sub_step_index)
        {
            Some((step, index)) => {
                self.commit(TutorialProgress {
                    current_step: step,
                    current_sub_step_index: index,
                    ..current
                })
                .await?;
                Ok(Transition::Moved(step, index))
            }
            None => {
                self.finish(keys::TUTORIAL_COMPLETED).await?;
                Ok(Transition::Completed)
            }
        }
    }

    /// Step back one sub-step; a no-op at the very first one
    pub async fn prev_sub_step(&self) -> Result<Transition> {
        let _guard = self.transition_lock.lock().await;
        let current = self.progress();
        if !current.is_tutorial_active {
            return Ok(Transition::Inactive);
        }

        match self
            .script
            .prev_position(current.current_step, current.current_sub_step_index)
        {
            Some((step, index)) => {
                self.commit(TutorialProgress {
                    current_step: step,
                    current_sub_step_index: index,
                    ..current
                })
                .await?;
                Ok(Transition::Moved(step, index))
            }
            None => Ok(Transition::Unchanged),
        }
    }

    /// Jump to the first sub-step of `step`
    pub async fn go_to_step(&self, step: TutorialStep) -> Result<Transition> {
        let _guard = self.transition_lock.lock().await;
        if self.script.index_of(step).is_none() {
            return Err(AppError::Tutorial(format!("Step {:?} is not in the script", step)));
        }
        let current = self.progress();
        if !current.is_tutorial_active {
            return Ok(Transition::Inactive);
        }
        self.commit(TutorialProgress {
            current_step: step,
            current_sub_step_index: 0,
            ..current
        })
        .await?;
        Ok(Transition::Moved(step, 0))
    }

    pub async fn skip_tutorial(&self) -> Result<()> {
        let _guard = self.transition_lock.lock().await;
        info!(progress = ?self.progress(), "Tutorial skipped");
        self.finish(keys::TUTORIAL_SKIPPED).await
    }

    pub async fn complete_tutorial(&self) -> Result<()> {
        let _guard = self.transition_lock.lock().await;
        self.finish(keys::TUTORIAL_COMPLETED).await
    }

    /// Forget completion/skip flags and start over ("replay tutorial")
    pub async fn reset_tutorial(&self) -> Result<()> {
        let _guard = self.transition_lock.lock().await;
        for key in [keys::TUTORIAL_COMPLETED, keys::TUTORIAL_SKIPPED, keys::TUTORIAL_PROGRESS] {
            self.storage.remove(key).await?;
        }
        info!("Tutorial reset");
        self.commit(TutorialProgress::at_start(&self.script, true)).await
    }

    /// Wait out the current sub-step's delay and advance if it auto-advances
    /// and nobody moved in the meantime.
    pub async fn auto_advance(&self) -> Result<Transition> {
        let before = self.progress();
        let Some(sub_step) = self.current_sub_step() else {
            return Ok(Transition::Inactive);
        };
        if !sub_step.auto_advance {
            return Ok(Transition::Unchanged);
        }

        tokio::time::sleep(sub_step.delay).await;
        self.next_sub_step_if(Some(&before)).await
    }

    // ---- registries ----

    pub fn register_target<T: TutorialTarget + 'static>(&self, id: &str, target: &Arc<T>) {
        self.targets.register(id, target);
    }

    pub fn unregister_target(&self, id: &str) {
        self.targets.unregister(id);
    }

    pub fn measure_target(&self, id: &str) -> Option<TargetLayout> {
        self.targets.measure(id)
    }

    /// Layout of the element the current sub-step highlights
    pub fn current_target_layout(&self) -> Option<TargetLayout> {
        let target_id = self.current_sub_step()?.target_id?;
        self.targets.measure(target_id)
    }

    pub fn register_action(&self, target_id: &str, action: impl Fn() + Send + Sync + 'static) {
        self.actions.register(target_id, action);
    }

    pub fn unregister_action(&self, target_id: &str) {
        self.actions.unregister(target_id);
    }

    /// Fire the callback registered for the current sub-step's target.
    /// Returns false when there is no target or no callback.
    pub fn trigger_current_action(&self) -> bool {
        match self.current_sub_step().and_then(|s| s.target_id) {
            Some(target_id) => {
                let fired = self.actions.trigger(target_id);
                if !fired {
                    debug!(target_id, "No tutorial action registered");
                }
                fired
            }
            None => false,
        }
    }

    // ---- internals (callers hold transition_lock) ----

    async fn commit(&self, progress: TutorialProgress) -> Result<()> {
        set_json(self.storage.as_ref(), keys::TUTORIAL_PROGRESS, &progress).await?;
        debug!(step = ?progress.current_step, index = progress.current_sub_step_index, "Tutorial progress saved");
        self.progress.send_replace(progress);
        Ok(())
    }

    async fn finish(&self, flag_key: &str) -> Result<()> {
        self.storage.set(flag_key, FLAG_SET).await?;
        let mut progress = self.progress();
        progress.is_tutorial_active = false;
        progress.is_completed = flag_key == keys::TUTORIAL_COMPLETED;
        if progress.is_completed {
            info!("Tutorial completed");
        }
        self.commit(progress).await
    }

    async fn flag(&self, key: &str) -> Result<bool> {
        Ok(self.storage.get(key).await?.as_deref() == Some(FLAG_SET))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::storage::MemoryStorage;
    use crate::tutorial::registry::TutorialTarget;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn machine_with(storage: Arc<MemoryStorage>) -> TutorialMachine {
        TutorialMachine::with_default_script(storage)
    }

    fn machine() -> TutorialMachine {
        machine_with(Arc::new(MemoryStorage::new()))
    }

    #[tokio::test]
    async fn test_walks_every_sub_step_then_completes_once() {
        let machine = machine();
        machine.start_tutorial().await.unwrap();
        let total = machine.script().total_sub_steps();

        let mut visited = vec![(TutorialStep::Welcome, 0)];
        let mut completions = 0;
        for _ in 0..total {
            match machine.next_sub_step().await.unwrap() {
                Transition::Moved(step, index) => visited.push((step, index)),
                Transition::Completed => completions += 1,
                other => panic!("unexpected transition {:?}", other),
            }
        }

        assert_eq!(completions, 1);
        assert_eq!(visited.len(), total);
        assert_eq!(visited.iter().collect::<HashSet<_>>().len(), total);

        let expected: Vec<_> = machine
            .script()
            .steps()
            .iter()
            .flat_map(|s| (0..s.sub_steps.len()).map(move |i| (s.step, i)))
            .collect();
        assert_eq!(visited, expected);

        let progress = machine.progress();
        assert!(progress.is_completed);
        assert!(!progress.is_tutorial_active);
        assert_eq!(machine.next_sub_step().await.unwrap(), Transition::Inactive);
        assert!(!machine.should_auto_start().await.unwrap());
    }

    #[tokio::test]
    async fn test_restore_resumes_position() {
        let storage = Arc::new(MemoryStorage::new());
        let machine = machine_with(storage.clone());
        machine.start_tutorial().await.unwrap();
        machine.next_sub_step().await.unwrap();
        machine.next_sub_step().await.unwrap();
        let saved = machine.progress();
        assert_eq!((saved.current_step, saved.current_sub_step_index), (TutorialStep::Friends, 0));

        let restarted = machine_with(storage);
        assert_eq!(restarted.restore().await.unwrap(), saved);
        assert_eq!(restarted.current_sub_step().map(|s| s.id), Some("friends_tab"));
    }

    #[tokio::test]
    async fn test_prev_mirrors_next_and_stops_at_start() {
        let machine = machine();
        machine.start_tutorial().await.unwrap();
        assert_eq!(machine.prev_sub_step().await.unwrap(), Transition::Unchanged);

        machine.go_to_step(TutorialStep::Chat).await.unwrap();
        assert_eq!(
            machine.prev_sub_step().await.unwrap(),
            Transition::Moved(TutorialStep::Friends, 3)
        );
        assert_eq!(
            machine.next_sub_step().await.unwrap(),
            Transition::Moved(TutorialStep::Chat, 0)
        );
    }

    #[tokio::test]
    async fn test_skip_and_reset() {
        let storage = Arc::new(MemoryStorage::new());
        let machine = machine_with(storage.clone());
        assert!(machine.should_auto_start().await.unwrap());

        machine.start_tutorial().await.unwrap();
        machine.go_to_step(TutorialStep::Schedule).await.unwrap();
        machine.skip_tutorial().await.unwrap();
        assert!(!machine.progress().is_tutorial_active);
        assert!(!machine.progress().is_completed);
        assert!(!machine.should_auto_start().await.unwrap());
        assert_eq!(machine.go_to_step(TutorialStep::Chat).await.unwrap(), Transition::Inactive);

        machine.reset_tutorial().await.unwrap();
        assert!(machine.should_auto_start().await.unwrap());
        let progress = machine.progress();
        assert!(progress.is_tutorial_active);
        assert_eq!((progress.current_step, progress.current_sub_step_index), (TutorialStep::Welcome, 0));
    }

    #[tokio::test]
    async fn test_completed_flag_wins_on_restore() {
        let storage = Arc::new(MemoryStorage::new());
        let machine = machine_with(storage.clone());
        machine.start_tutorial().await.unwrap();
        machine.complete_tutorial().await.unwrap();

        let restarted = machine_with(storage);
        let progress = restarted.restore().await.unwrap();
        assert!(progress.is_completed);
        assert!(restarted.current_sub_step().is_none());
    }

    #[tokio::test]
    async fn test_restore_ignores_unknown_position() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set(
                keys::TUTORIAL_PROGRESS,
                r#"{"current_step":"welcome","current_sub_step_index":99,"is_tutorial_active":true,"is_completed":false}"#,
            )
            .await
            .unwrap();
        let machine = machine_with(storage);
        let progress = machine.restore().await.unwrap();
        assert_eq!(progress.current_sub_step_index, 0);
        assert!(!progress.is_tutorial_active);
    }

    #[tokio::test]
    async fn test_go_to_unknown_step_is_an_error() {
        let script = TutorialScript::new(DEFAULT_SCRIPT.steps()[..2].to_vec()).unwrap();
        let machine = TutorialMachine::new(Arc::new(script), Arc::new(MemoryStorage::new()));
        machine.start_tutorial().await.unwrap();
        assert!(matches!(
            machine.go_to_step(TutorialStep::Finish).await,
            Err(AppError::Tutorial(_))
        ));
    }

    #[tokio::test]
    async fn test_watch_sees_transitions() {
        let machine = machine();
        let mut rx = machine.watch();
        machine.start_tutorial().await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_tutorial_active);

        machine.next_sub_step().await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().current_sub_step_index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_advance_after_delay() {
        let machine = machine();
        machine.start_tutorial().await.unwrap();
        assert_eq!(machine.auto_advance().await.unwrap(), Transition::Unchanged);

        // friends_sent is the auto-advancing last sub-step of Friends
        machine.go_to_step(TutorialStep::Friends).await.unwrap();
        for _ in 0..3 {
            machine.next_sub_step().await.unwrap();
        }
        let started = tokio::time::Instant::now();
        assert_eq!(
            machine.auto_advance().await.unwrap(),
            Transition::Moved(TutorialStep::Chat, 0)
        );
        assert!(started.elapsed() >= Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_advance_yields_to_a_move_made_while_waiting() {
        let machine = machine();
        machine.start_tutorial().await.unwrap();
        machine.go_to_step(TutorialStep::Friends).await.unwrap();
        for _ in 0..3 {
            machine.next_sub_step().await.unwrap();
        }
        let before = machine.progress();

        // Hold the lock past the delay so the move lands while auto_advance
        // is queued behind it.
        let guard = machine.transition_lock.lock().await;
        let machine_ref = &machine;
        let user_move = async move {
            tokio::time::sleep(Duration::from_millis(2000)).await;
            machine_ref
                .commit(TutorialProgress {
                    current_sub_step_index: 1,
                    ..before
                })
                .await
                .unwrap();
            drop(guard);
        };
        let (result, ()) = tokio::join!(machine.auto_advance(), user_move);

        assert_eq!(result.unwrap(), Transition::Unchanged);
        let progress = machine.progress();
        assert_eq!(progress.current_step, TutorialStep::Friends);
        assert_eq!(progress.current_sub_step_index, 1);
    }

    struct Card;

    impl TutorialTarget for Card {
        fn measure(&self) -> Option<TargetLayout> {
            Some(TargetLayout {
                x: 0.0,
                y: 100.0,
                width: 320.0,
                height: 80.0,
            })
        }
    }

    #[tokio::test]
    async fn test_current_target_and_action() {
        let machine = machine();
        let card = Arc::new(Card);
        machine.register_target("home_calendar_card", &card);
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        machine.register_action("home_calendar_card", move || {
            h.fetch_add(1, Ordering::SeqCst);
        });

        machine.start_tutorial().await.unwrap();
        assert!(machine.current_target_layout().is_none());
        assert!(!machine.trigger_current_action());

        machine.next_sub_step().await.unwrap();
        assert_eq!(machine.current_target_layout().map(|l| l.width), Some(320.0));
        assert!(machine.trigger_current_action());
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        machine.unregister_action("home_calendar_card");
        machine.unregister_target("home_calendar_card");
        assert!(!machine.trigger_current_action());
        assert!(machine.measure_target("home_calendar_card").is_none());
    }
}
