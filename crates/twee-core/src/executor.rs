//! Hand-off of UI-observed mutations to the host's UI-affinity context.

use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};

/// A unit of work scheduled onto the UI context.
pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

/// Fire-and-forget executor for UI-affine work. Tasks run in submission order.
pub trait UiExecutor: Send + Sync {
    /// Schedule `task` without waiting for it.
    fn exec_async(&self, task: UiTask);
}

/// Runs every task immediately on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl UiExecutor for InlineExecutor {
    fn exec_async(&self, task: UiTask) {
        task();
    }
}

/// A FIFO queue drained by the owner of the UI thread.
pub struct QueuedExecutor {
    sender: Mutex<Sender<UiTask>>,
    receiver: Mutex<Receiver<UiTask>>,
}

impl Default for QueuedExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl QueuedExecutor {
    /// Create an empty queue.
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender: Mutex::new(sender),
            receiver: Mutex::new(receiver),
        }
    }

    /// Run every task queued so far. Returns the number of tasks run.
    pub fn run_pending(&self) -> usize {
        let tasks: Vec<UiTask> = match self.receiver.lock() {
            Ok(receiver) => receiver.try_iter().collect(),
            Err(_) => return 0,
        };
        let count = tasks.len();
        for task in tasks {
            task();
        }
        count
    }
}

impl UiExecutor for QueuedExecutor {
    fn exec_async(&self, task: UiTask) {
        if let Ok(sender) = self.sender.lock()
            && sender.send(task).is_err()
        {
            tracing::warn!("UI executor queue closed; dropping task");
        }
    }
}
