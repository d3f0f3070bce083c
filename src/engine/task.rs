// Tue Jan 13 2026 - Alex

use crate::error::TaskFailure;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// One opaque unit of work. Everything a task needs must be moved into it,
/// since it runs on a worker that shares nothing with the enqueuing caller.
pub trait Task<T>: Send + 'static {
    fn execute(self: Box<Self>) -> anyhow::Result<T>;

    fn name(&self) -> Option<String> {
        None
    }
}

impl<T, F> Task<T> for F
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    fn execute(self: Box<Self>) -> anyhow::Result<T> {
        (*self)()
    }
}

pub type BoxedTask<T> = Box<dyn Task<T>>;

pub struct QueuedTask<T> {
    pub index: usize,
    pub label: Option<String>,
    pub task: BoxedTask<T>,
}

impl<T: 'static> QueuedTask<T> {
    pub fn new(index: usize, task: BoxedTask<T>) -> Self {
        let label = task.name();
        Self { index, label, task }
    }

    /// Runs the task behind a panic boundary so that a panicking task is
    /// reported as a failure instead of taking the worker down with it.
    pub fn run_isolated(self) -> Result<T, TaskFailure> {
        let task = self.task;
        match panic::catch_unwind(AssertUnwindSafe(move || task.execute())) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(TaskFailure::Error(e)),
            Err(payload) => Err(TaskFailure::Panicked(panic_message(payload))),
        }
    }

    pub fn run_inline(self) -> Result<T, TaskFailure> {
        self.task.execute().map_err(TaskFailure::Error)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
