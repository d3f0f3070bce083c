// Tue Jan 13 2026 - Alex

use crate::engine::runner::RunState;
use crate::engine::worker::WorkerPool;
use crate::error::{RunError, RunResult, TaskFailure};
use parking_lot::Mutex;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

/// The single reported outcome of one task.
#[derive(Debug)]
pub struct Completion<T> {
    /// Position of the task in the submission queue.
    pub index: usize,
    pub label: Option<String>,
    pub worker_id: usize,
    pub duration: Duration,
    pub outcome: Result<T, TaskFailure>,
}

impl<T> Completion<T> {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn is_failure(&self) -> bool {
        self.outcome.is_err()
    }

    pub fn value(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    pub fn failure(&self) -> Option<&TaskFailure> {
        self.outcome.as_ref().err()
    }

    pub fn display_name(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("task #{}", self.index))
    }
}

/// Live handle over the completions of a running pool, in completion order.
///
/// Owns the pool. [`release`](Self::release) drops every undispatched task
/// and joins the workers; dropping the stream drops undispatched tasks and
/// leaves busy workers to exit on their own once their task returns.
pub struct CompletionStream<T> {
    receiver: Receiver<Completion<T>>,
    pool: WorkerPool<T>,
    reported: Vec<bool>,
    completed: usize,
    poll_interval: Duration,
    state: Arc<Mutex<RunState>>,
}

impl<T> CompletionStream<T> {
    pub(crate) fn new(
        pool: WorkerPool<T>,
        receiver: Receiver<Completion<T>>,
        total: usize,
        poll_interval: Duration,
    ) -> Self {
        Self {
            receiver,
            pool,
            reported: vec![false; total],
            completed: 0,
            poll_interval,
            state: Arc::new(Mutex::new(RunState::Draining)),
        }
    }

    /// Run state shared with whoever launched the pool, moved to `Done` by
    /// the stream.
    pub(crate) fn shared_state(&self) -> Arc<Mutex<RunState>> {
        self.state.clone()
    }

    pub fn total(&self) -> usize {
        self.reported.len()
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn remaining(&self) -> usize {
        self.total() - self.completed
    }

    pub fn is_done(&self) -> bool {
        self.state() == RunState::Done
    }

    pub fn state(&self) -> RunState {
        *self.state.lock()
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn worker_count(&self) -> usize {
        self.pool.size()
    }

    pub fn active_workers(&self) -> usize {
        self.pool.active_count()
    }

    pub fn poll(&mut self) -> RunResult<Option<Completion<T>>> {
        self.poll_timeout(self.poll_interval)
    }

    /// Waits at most `wait` for the next completion. `Ok(None)` is a quiescent
    /// poll, not an error.
    pub fn poll_timeout(&mut self, wait: Duration) -> RunResult<Option<Completion<T>>> {
        if self.is_done() {
            return Ok(None);
        }

        match self.receiver.recv_timeout(wait) {
            Ok(completion) => {
                if self.record(completion.index) {
                    Ok(Some(completion))
                } else {
                    Ok(None)
                }
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                // every worker is gone but some tasks never reported
                let lost: Vec<usize> = self
                    .reported
                    .iter()
                    .enumerate()
                    .filter(|(_, done)| !**done)
                    .map(|(i, _)| i)
                    .collect();
                let total = self.total();
                log::error!(
                    "{} of {} tasks were lost: all workers exited before reporting",
                    lost.len(),
                    total
                );
                self.finish();
                Err(RunError::LostTasks { lost, total })
            }
        }
    }

    fn record(&mut self, index: usize) -> bool {
        match self.reported.get_mut(index) {
            Some(slot) if !*slot => {
                *slot = true;
                self.completed += 1;
            }
            _ => {
                log::warn!("ignoring duplicate or unknown completion for task {}", index);
                return false;
            }
        }

        if self.completed == self.total() {
            self.finish();
        }
        true
    }

    fn finish(&mut self) {
        if !self.is_done() {
            *self.state.lock() = RunState::Done;
            self.pool.shutdown();
        }
    }

    pub fn release(mut self) {
        if !self.is_done() {
            log::debug!(
                "releasing completion stream with {} of {} tasks outstanding",
                self.remaining(),
                self.total()
            );
        }
        self.finish();
    }
}

impl<T> Drop for CompletionStream<T> {
    fn drop(&mut self) {
        if !self.is_done() {
            log::debug!(
                "completion stream dropped with {} of {} tasks outstanding",
                self.remaining(),
                self.total()
            );
            *self.state.lock() = RunState::Done;
        }
    }
}

impl<T> Iterator for CompletionStream<T> {
    type Item = RunResult<Completion<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.is_done() {
                return None;
            }
            match self.poll() {
                Ok(Some(completion)) => return Some(Ok(completion)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
