// Tue Jan 13 2026 - Alex

use crate::engine::task::{BoxedTask, QueuedTask, Task};
use std::collections::VecDeque;

/// Append-only list of pending tasks. Frozen by `freeze`, which hands every
/// task over in submission order together with its queue position.
pub struct TaskQueue<T> {
    tasks: VecDeque<BoxedTask<T>>,
    frozen: bool,
}

impl<T: Send + 'static> TaskQueue<T> {
    pub fn new() -> Self {
        Self {
            tasks: VecDeque::new(),
            frozen: false,
        }
    }

    pub fn enqueue<K: Task<T>>(&mut self, task: K) {
        self.push_boxed(Box::new(task));
    }

    pub fn push_boxed(&mut self, task: BoxedTask<T>) {
        debug_assert!(!self.frozen, "enqueue after the queue was frozen");
        self.tasks.push_back(task);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn freeze(&mut self) -> VecDeque<QueuedTask<T>> {
        self.frozen = true;
        self.tasks
            .drain(..)
            .enumerate()
            .map(|(index, task)| QueuedTask::new(index, task))
            .collect()
    }
}

impl<T: Send + 'static> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
