//! One-shot tasks deferred to the next tick of the host loop

use std::collections::VecDeque;

/// Work a session postpones to its next tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredTask {
    /// Validate rehydrated entries and drop the dead ones
    RevalidateAfterReload,
}

/// FIFO of one-shot tasks for a single-threaded loop
///
/// Scheduling a task that is already pending is a no-op, so repeated
/// requests before the next tick collapse into one run.
#[derive(Debug)]
pub struct DeferredQueue<T> {
    pending: VecDeque<T>,
}

impl<T> Default for DeferredQueue<T> {
    fn default() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }
}

impl<T: PartialEq> DeferredQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the task was already pending
    pub fn schedule_once(&mut self, task: T) -> bool {
        if self.pending.contains(&task) {
            return false;
        }
        self.pending.push_back(task);
        true
    }

    /// Take every task scheduled so far. Tasks scheduled while these run
    /// wait for the following tick.
    pub fn take_ready(&mut self) -> Vec<T> {
        self.pending.drain(..).collect()
    }

    pub fn is_pending(&self, task: &T) -> bool {
        self.pending.contains(task)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
