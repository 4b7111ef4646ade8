//! Bounded-concurrency task queue.
//!
//! [`TaskQueue::enqueue`] spawns a task immediately and returns without
//! suspending; the task itself waits for a permit from a fair semaphore, so
//! at most `max_concurrency` tasks run at once and overflow is admitted in
//! submission order (FIFO). The returned [`TaskHandle`] is cloneable and can
//! be awaited any number of times, which lets a not-yet-resolved result be
//! stored in a cache entry and unwrapped by a later consumer.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use thiserror::Error;
use tokio::sync::{Semaphore, oneshot};
use tracing::debug;

/// Errors produced when awaiting a [`TaskHandle`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    /// The task was torn down before it produced a result. This only happens
    /// when the runtime shuts down underneath an in-flight task; there is no
    /// cancellation API.
    #[error("task was dropped before completing")]
    Canceled,
}

/// A FIFO task queue with a fixed concurrency cap.
///
/// # Examples
///
/// ```
/// use preflight::TaskQueue;
///
/// #[tokio::main]
/// async fn main() {
///     let queue = TaskQueue::new(2);
///     let handle = queue.enqueue(async { 40 + 2 });
///     assert_eq!(handle.resolved().await, Ok(42));
/// }
/// ```
pub struct TaskQueue {
    semaphore: Arc<Semaphore>,
    max_concurrency: usize,
}

impl TaskQueue {
    /// Creates a queue that runs at most `max_concurrency` tasks at once.
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
        }
    }

    /// Returns the configured concurrency cap.
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Submits a task for execution and returns a handle to its result.
    ///
    /// Never blocks or suspends the caller: the task is spawned onto the
    /// runtime and its first suspension point is the permit acquisition.
    /// Tokio's semaphore is fair, so tasks beyond the cap start in the order
    /// they were enqueued.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn enqueue<F, T>(&self, task: F) -> TaskHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Clone + Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                // The semaphore is never closed; this arm is unreachable in
                // practice but keeps the task total.
                Err(_) => return,
            };
            let output = task.await;
            if tx.send(output).is_err() {
                debug!("task result dropped, all handles gone");
            }
        });

        let inner = async move { rx.await.map_err(|_| QueueError::Canceled) }
            .boxed()
            .shared();
        TaskHandle { inner }
    }
}

/// A cloneable, multi-await handle to an enqueued task's result.
///
/// Every clone resolves to the same value. Whether the task has finished yet
/// is a property of the handle, opaque to whoever stores it.
pub struct TaskHandle<T: Clone> {
    inner: Shared<BoxFuture<'static, Result<T, QueueError>>>,
}

impl<T: Clone> TaskHandle<T> {
    /// Creates a handle that is already resolved with `value`.
    ///
    /// Useful for recording cache entries whose payload is known up front,
    /// without going through the queue.
    pub fn ready(value: T) -> Self
    where
        T: Send + 'static,
    {
        Self {
            inner: async move { Ok(value) }.boxed().shared(),
        }
    }

    /// Waits for the task to complete and returns its output.
    pub async fn resolved(&self) -> Result<T, QueueError> {
        self.inner.clone().await
    }
}

impl<T: Clone> Clone for TaskHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio::time::timeout;

    #[tokio::test]
    async fn resolves_to_task_output() {
        let queue = TaskQueue::new(1);
        let handle = queue.enqueue(async { "done" });
        assert_eq!(handle.resolved().await, Ok("done"));
    }

    #[tokio::test]
    async fn clones_resolve_to_the_same_value() {
        let queue = TaskQueue::new(1);
        let handle = queue.enqueue(async { 7 });
        let clone = handle.clone();
        assert_eq!(handle.resolved().await, Ok(7));
        assert_eq!(clone.resolved().await, Ok(7));
        // Awaiting again after resolution is fine too.
        assert_eq!(handle.resolved().await, Ok(7));
    }

    #[tokio::test]
    async fn admission_is_fifo_beyond_the_cap() {
        let queue = TaskQueue::new(1);
        let order: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let order = Arc::clone(&order);
                queue.enqueue(async move {
                    order.lock().push(i);
                })
            })
            .collect();

        for handle in &handles {
            handle.resolved().await.unwrap();
        }
        assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn enqueue_does_not_block_when_the_queue_is_full() {
        let queue = TaskQueue::new(1);
        let gate = Arc::new(Notify::new());

        let blocker = {
            let gate = Arc::clone(&gate);
            queue.enqueue(async move {
                gate.notified().await;
            })
        };

        // The cap is exhausted; enqueueing must still return immediately,
        // and the new task must not have run yet.
        let waiting = queue.enqueue(async { 1 });
        assert!(
            timeout(Duration::from_millis(20), waiting.resolved())
                .await
                .is_err()
        );

        gate.notify_one();
        blocker.resolved().await.unwrap();
        assert_eq!(waiting.resolved().await, Ok(1));
    }

    #[tokio::test]
    async fn ready_handle_needs_no_queue() {
        let handle = TaskHandle::ready("eager");
        assert_eq!(handle.resolved().await, Ok("eager"));
    }
}
