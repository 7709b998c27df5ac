//! Deferred task execution on the owner's sequence.
//!
//! Components never run result callbacks inline. They post them through a
//! [`SequenceHandle`], and whoever owns the [`TaskSequence`] drains it from
//! its own event loop, outside of any queue call.

use tokio::sync::mpsc;
use tracing::{trace, warn};

pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Cheap, cloneable handle for posting tasks to a [`TaskSequence`].
#[derive(Clone)]
pub struct SequenceHandle {
    sender: mpsc::UnboundedSender<Task>,
}

impl SequenceHandle {
    /// Posts `task` to run later. Returns false if the sequence is gone, in
    /// which case the task is dropped without running.
    pub fn post_task<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        match self.sender.send(Box::new(task)) {
            Ok(()) => true,
            Err(_) => {
                warn!("task posted after its sequence was dropped");
                false
            }
        }
    }
}

pub struct TaskSequence {
    sender: mpsc::UnboundedSender<Task>,
    receiver: mpsc::UnboundedReceiver<Task>,
}

impl TaskSequence {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self { sender, receiver }
    }

    pub fn handle(&self) -> SequenceHandle {
        SequenceHandle {
            sender: self.sender.clone(),
        }
    }

    /// Runs pending tasks, including ones posted while draining, until none
    /// remain. Returns how many ran.
    pub fn run_until_idle(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.receiver.try_recv() {
            task();
            ran += 1;
        }
        if ran > 0 {
            trace!(ran, "sequence drained");
        }
        ran
    }

    /// Waits for the next task and runs it.
    pub async fn run_next(&mut self) {
        // The sequence keeps its own sender alive, so the channel never closes.
        if let Some(task) = self.receiver.recv().await {
            task();
        }
    }

    pub fn is_idle(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl Default for TaskSequence {
    fn default() -> Self {
        Self::new()
    }
}
