//! Task queue that records instead of delivering.

use conference_core::error::TaskError;
use conference_core::task::{Task, TaskQueue};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// [`TaskQueue`] capturing every enqueued task in order.
#[derive(Clone, Debug, Default)]
pub struct RecordingTaskQueue {
    tasks: Arc<Mutex<Vec<Task>>>,
    closed: Arc<AtomicBool>,
}

impl RecordingTaskQueue {
    /// Create a new empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks enqueued so far.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.lock().unwrap().clone()
    }

    /// Remove and return every recorded task.
    pub fn drain(&self) -> Vec<Task> {
        std::mem::take(&mut *self.tasks.lock().unwrap())
    }

    /// Reject further tasks with [`TaskError::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl TaskQueue for RecordingTaskQueue {
    fn enqueue(&self, task: Task) -> BoxFuture<'_, Result<(), TaskError>> {
        let result = if self.closed.load(Ordering::SeqCst) {
            Err(TaskError::Closed)
        } else {
            self.tasks.lock().unwrap().push(task);
            Ok(())
        };
        Box::pin(async move { result })
    }
}
