//! Bounded-concurrency FIFO admission queue.
//!
//! Tasks are admitted in strict submission order and executed on a shared
//! pool of at most `limit` concurrent slots. Completion order is not
//! guaranteed once the limit exceeds 1.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures::future::{BoxFuture, FutureExt};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::debug;

use crate::metrics;

/// Minimum configurable concurrency.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum configurable concurrency.
pub const MAX_CONCURRENCY: usize = 10;

/// Error type for queue operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// The task was removed from the queue before it started.
    #[error("queue cleared before the task started")]
    Cleared,
}

/// Snapshot of the queue's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct QueueStatus {
    /// Tasks waiting for a slot.
    pub queued: usize,
    /// Tasks currently executing.
    pub running: usize,
    /// Configured concurrency limit.
    pub limit: usize,
}

/// Handle returned by [`AdmissionQueue::enqueue`].
///
/// Resolves with the task's output once it has run, or with
/// [`QueueError::Cleared`] if the task was discarded while still waiting.
pub struct QueueHandle<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Future for QueueHandle<T> {
    type Output = Result<T, QueueError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|r| r.map_err(|_| QueueError::Cleared))
    }
}

struct WaitingTask {
    id: String,
    task: BoxFuture<'static, ()>,
}

struct QueueState {
    waiting: VecDeque<WaitingTask>,
    running: usize,
    limit: usize,
}

struct Inner {
    state: Mutex<QueueState>,
}

/// FIFO task queue with a configurable bounded number of concurrent slots.
///
/// Cheaply cloneable; clones share the same queue.
#[derive(Clone)]
pub struct AdmissionQueue {
    inner: Arc<Inner>,
}

impl AdmissionQueue {
    /// Create a queue with the given concurrency limit (clamped to
    /// `[MIN_CONCURRENCY, MAX_CONCURRENCY]`).
    pub fn new(limit: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState {
                    waiting: VecDeque::new(),
                    running: 0,
                    limit: limit.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY),
                }),
            }),
        }
    }

    /// Enqueue a task. Never blocks; the task runs when a slot frees up, in
    /// strict submission order. The task's output (or error) reaches only the
    /// returned handle, never sibling tasks.
    pub fn enqueue<F, T>(&self, id: impl Into<String>, task: F) -> QueueHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let wrapped = async move {
            // The receiver may be gone (caller dropped the handle); the task
            // still runs to completion either way.
            let _ = tx.send(task.await);
        }
        .boxed();

        {
            let mut state = self.inner.state.lock().unwrap();
            state.waiting.push_back(WaitingTask {
                id: id.into(),
                task: wrapped,
            });
            metrics::QUEUE_WAITING.set(state.waiting.len() as i64);
        }

        Self::drain(&self.inner);
        QueueHandle { rx }
    }

    /// Change the concurrency limit, clamped to `[1, 10]`. Newly freed
    /// capacity is filled immediately; running tasks are never preempted.
    pub fn set_max_concurrency(&self, limit: usize) {
        {
            let mut state = self.inner.state.lock().unwrap();
            state.limit = limit.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY);
        }
        Self::drain(&self.inner);
    }

    /// Fail every waiting task with [`QueueError::Cleared`]. Running tasks
    /// are unaffected and run to completion.
    pub fn clear(&self) {
        let discarded = {
            let mut state = self.inner.state.lock().unwrap();
            let discarded: Vec<WaitingTask> = state.waiting.drain(..).collect();
            metrics::QUEUE_WAITING.set(0);
            discarded
        };
        // Dropping the tasks outside the lock drops their result senders,
        // which resolves the corresponding handles with `Cleared`.
        for task in &discarded {
            debug!(task_id = %task.id, "discarding waiting task");
        }
        drop(discarded);
    }

    /// Current queue status.
    pub fn status(&self) -> QueueStatus {
        let state = self.inner.state.lock().unwrap();
        QueueStatus {
            queued: state.waiting.len(),
            running: state.running,
            limit: state.limit,
        }
    }

    /// Launch waiting tasks while slots are free.
    ///
    /// The state mutex serializes drain passes, so only one pass makes
    /// dispatch decisions at a time; a completing task re-invokes drain so a
    /// freed slot is reused without delay.
    fn drain(inner: &Arc<Inner>) {
        loop {
            let waiting = {
                let mut state = inner.state.lock().unwrap();
                if state.running >= state.limit {
                    return;
                }
                let Some(waiting) = state.waiting.pop_front() else {
                    return;
                };
                state.running += 1;
                metrics::QUEUE_WAITING.set(state.waiting.len() as i64);
                metrics::QUEUE_RUNNING.set(state.running as i64);
                waiting
            };

            debug!(task_id = %waiting.id, "starting queued task");

            let inner = Arc::clone(inner);
            tokio::spawn(async move {
                waiting.task.await;
                {
                    let mut state = inner.state.lock().unwrap();
                    state.running -= 1;
                    metrics::QUEUE_RUNNING.set(state.running as i64);
                }
                Self::drain(&inner);
            });
        }
    }
}
