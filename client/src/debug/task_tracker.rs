//! Async task lifecycle tracking

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::task::JoinHandle;

/// Tasks currently alive (spawned and not yet finished or aborted)
static ACTIVE_TASKS: AtomicU64 = AtomicU64::new(0);
/// Monotonic id source for log correlation
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(0);

/// Get current number of active tracked tasks
pub fn active_task_count() -> u64 {
    ACTIVE_TASKS.load(Ordering::Relaxed)
}

/// Decrements the active counter however the task ends, including abort.
struct ActiveGuard {
    name: &'static str,
    task_id: u64,
    start: Instant,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        ACTIVE_TASKS.fetch_sub(1, Ordering::Relaxed);
        let duration = self.start.elapsed();
        tracing::debug!(
            task = %self.name,
            task_id = self.task_id,
            duration_ms = duration.as_millis(),
            "Task finished"
        );
        if duration.as_secs() > 30 {
            tracing::warn!(
                task = %self.name,
                task_id = self.task_id,
                duration_ms = duration.as_millis(),
                "Task ran for a long time"
            );
        }
    }
}

/// Spawn an instrumented async task with lifecycle tracking
///
/// # Example
///
/// ```rust,no_run
/// # async fn demo() {
/// use joyner::debug::spawn_tracked;
///
/// let handle = spawn_tracked("friends_refetch", async move { 42 });
/// assert_eq!(handle.await.unwrap(), 42);
/// # }
/// ```
pub fn spawn_tracked<F>(name: &'static str, future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let task_id = NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed);
    ACTIVE_TASKS.fetch_add(1, Ordering::Relaxed);

    tracing::debug!(task = %name, task_id = task_id, "Task spawned");

    let guard = ActiveGuard {
        name,
        task_id,
        start: Instant::now(),
    };

    tokio::spawn(async move {
        let _guard = guard;
        future.await
    })
}
