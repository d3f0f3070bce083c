// Tue Jan 13 2026 - Alex

use crate::engine::collector::{ResultCollector, ResultList};
use crate::engine::completion::CompletionStream;
use crate::error::RunError;
use crate::ui::progress::ProgressSink;

/// Completed-versus-total counter owned by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressState {
    total: usize,
    completed: usize,
    reported: usize,
}

impl ProgressState {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            reported: 0,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }

    pub fn record_completion(&mut self) {
        self.completed += 1;
    }

    /// Completions since the previous call.
    pub fn take_delta(&mut self) -> u64 {
        let delta = self.completed - self.reported;
        self.reported = self.completed;
        delta as u64
    }
}

/// Drains a completion stream with bounded waits, advancing the progress
/// display after every poll whether or not a completion arrived.
pub struct ProgressMonitor<'a> {
    sink: &'a mut dyn ProgressSink,
    state: ProgressState,
}

impl<'a> ProgressMonitor<'a> {
    pub fn new(sink: &'a mut dyn ProgressSink, total: usize) -> Self {
        Self {
            sink,
            state: ProgressState::new(total),
        }
    }

    pub fn state(&self) -> ProgressState {
        self.state
    }

    /// Returns everything collected, plus the error that cut the drain short
    /// if the stream failed before every task reported.
    pub fn drive<T>(mut self, stream: &mut CompletionStream<T>) -> (ResultList<T>, Option<RunError>) {
        let mut collector = ResultCollector::with_capacity(self.state.total());
        self.sink.start(self.state.total() as u64);

        let error = loop {
            if self.state.is_complete() {
                break None;
            }

            match stream.poll() {
                Ok(Some(completion)) => {
                    log::debug!(
                        "completed {} ({}/{})",
                        completion.display_name(),
                        self.state.completed() + 1,
                        self.state.total()
                    );
                    collector.collect(completion);
                    self.state.record_completion();
                }
                Ok(None) => {}
                Err(e) => break Some(e),
            }

            self.sink.advance(self.state.take_delta());
        };

        self.sink.finish();
        (collector.finish(), error)
    }
}
