//! Side tables that let UI elements take part in the tutorial without the
//! script knowing about screens.
//!
//! - [`TargetRegistry`]: id -> element that can report where it is on screen.
//!   Holds weak references only; an element that goes away simply stops
//!   measuring.
//! - [`ActionRegistry`]: sub-step `target_id` -> callback fired by
//!   "trigger current action" (open a modal, select a demo friend, ...).

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::trace;

/// On-screen rectangle in layout units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetLayout {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl TargetLayout {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

/// A UI element the overlay can highlight
pub trait TutorialTarget: Send + Sync {
    /// Current layout, or `None` while not laid out
    fn measure(&self) -> Option<TargetLayout>;
}

#[derive(Default)]
pub struct TargetRegistry {
    targets: RwLock<HashMap<String, Weak<dyn TutorialTarget>>>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) `target` under `id` without taking ownership
    pub fn register<T: TutorialTarget + 'static>(&self, id: &str, target: &Arc<T>) {
        let weak: Weak<dyn TutorialTarget> = Arc::downgrade(target) as Weak<dyn TutorialTarget>;
        self.targets.write().insert(id.to_string(), weak);
        trace!(id, "Tutorial target registered");
    }

    pub fn unregister(&self, id: &str) {
        self.targets.write().remove(id);
    }

    /// Measure a live target. Entries whose element was dropped are pruned.
    pub fn measure(&self, id: &str) -> Option<TargetLayout> {
        let target = self.targets.read().get(id).map(Weak::upgrade);
        match target {
            Some(Some(target)) => target.measure(),
            Some(None) => {
                self.targets.write().remove(id);
                trace!(id, "Pruned dropped tutorial target");
                None
            }
            None => None,
        }
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.targets.read().get(id).is_some_and(|w| w.strong_count() > 0)
    }
}

/// Zero-argument screen callback
pub type ActionCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
pub struct ActionRegistry {
    actions: RwLock<HashMap<String, ActionCallback>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, target_id: &str, action: impl Fn() + Send + Sync + 'static) {
        self.actions.write().insert(target_id.to_string(), Arc::new(action));
    }

    pub fn unregister(&self, target_id: &str) {
        self.actions.write().remove(target_id);
    }

    /// Run the callback for `target_id`; false when none is registered
    pub fn trigger(&self, target_id: &str) -> bool {
        // Callbacks may re-register, so call outside the lock
        let action = self.actions.read().get(target_id).cloned();
        match action {
            Some(action) => {
                action();
                true
            }
            None => false,
        }
    }
}
