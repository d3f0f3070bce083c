// Tue Jan 13 2026 - Alex

use crate::config::RunConfig;
use crate::engine::collector::{ResultCollector, ResultList};
use crate::engine::completion::{Completion, CompletionStream};
use crate::engine::monitor::ProgressMonitor;
use crate::engine::queue::TaskQueue;
use crate::engine::task::{QueuedTask, Task};
use crate::engine::worker::{PoolStats, WorkerPool};
use crate::error::{RunError, RunResult};
use crate::ui::progress::{ProgressSink, TaskProgressBar};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Queued,
    Dispatching,
    Draining,
    Done,
}

pub enum RunOutput<T> {
    Collected(ResultList<T>),
    Streaming(CompletionStream<T>),
}

impl<T> RunOutput<T> {
    pub fn is_streaming(&self) -> bool {
        matches!(self, RunOutput::Streaming(_))
    }

    /// Collected results as-is, or a streaming handle drained to the end.
    pub fn into_results(self) -> RunResult<ResultList<T>> {
        match self {
            RunOutput::Collected(list) => Ok(list),
            RunOutput::Streaming(stream) => {
                let mut collector = ResultCollector::with_capacity(stream.total());
                for completion in stream {
                    collector.collect(completion?);
                }
                Ok(collector.finish())
            }
        }
    }

    pub fn into_stream(self) -> Option<CompletionStream<T>> {
        match self {
            RunOutput::Streaming(stream) => Some(stream),
            RunOutput::Collected(_) => None,
        }
    }
}

/// Runs a batch of independent tasks across a bounded set of workers.
///
/// ```no_run
/// use bench_runner::{ParallelRun, RunConfig};
///
/// let mut run = ParallelRun::new(RunConfig::new().with_parallelism(4))?;
/// for i in 0..16u64 {
///     run.enqueue_fn(move || Ok(i * i));
/// }
/// let results = run.run()?.into_results()?;
/// assert_eq!(results.len(), 16);
/// # Ok::<(), bench_runner::RunError>(())
/// ```
pub struct ParallelRun<T> {
    config: RunConfig,
    queue: TaskQueue<T>,
    // shared with the completion stream once a non-blocking run hands it out
    state: Arc<Mutex<RunState>>,
    progress: Box<dyn ProgressSink>,
    stats: Arc<PoolStats>,
    started_at: Option<Instant>,
    partial: Option<ResultList<T>>,
}

impl<T: Send + 'static> ParallelRun<T> {
    pub fn new(config: RunConfig) -> RunResult<Self> {
        config.validate()?;

        let progress = TaskProgressBar::new(&config.description).with_enabled(config.show_progress);

        Ok(Self {
            config,
            queue: TaskQueue::new(),
            state: Arc::new(Mutex::new(RunState::Idle)),
            progress: Box::new(progress),
            stats: Arc::new(PoolStats::new()),
            started_at: None,
            partial: None,
        })
    }

    pub fn with_progress(mut self, sink: Box<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    pub fn enqueue<K: Task<T>>(&mut self, task: K) {
        match self.state() {
            RunState::Idle | RunState::Queued => {
                self.queue.enqueue(task);
                self.set_state(RunState::Queued);
            }
            _ => log::warn!("ignoring task enqueued after run() started"),
        }
    }

    pub fn enqueue_fn<F>(&mut self, f: F)
    where
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    {
        self.enqueue(f);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// For a non-blocking run this follows the handed-out stream, reaching
    /// `Done` once the stream is drained, released or dropped.
    pub fn state(&self) -> RunState {
        *self.state.lock()
    }

    fn set_state(&self, state: RunState) {
        *self.state.lock() = state;
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn pool_stats(&self) -> Arc<PoolStats> {
        self.stats.clone()
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Completions collected by a blocking run before it failed with
    /// [`RunError::LostTasks`]. Taken once.
    pub fn take_partial_results(&mut self) -> Option<ResultList<T>> {
        self.partial.take()
    }

    /// Starts execution. Blocking runs return the collected results once every
    /// task has reported; non-blocking runs return the live completion stream.
    pub fn run(&mut self) -> RunResult<RunOutput<T>> {
        match self.state() {
            RunState::Idle => return Err(RunError::EmptyQueue),
            RunState::Queued => {}
            _ => return Err(RunError::AlreadyStarted),
        }
        if self.queue.is_empty() {
            return Err(RunError::EmptyQueue);
        }

        let tasks = self.queue.freeze();
        let total = tasks.len();
        self.set_state(RunState::Dispatching);
        self.started_at = Some(Instant::now());

        log::info!(
            "running {} {} ({} mode, parallelism {})",
            total,
            self.config.description,
            if self.config.is_sequential() { "sequential" } else { "pool" },
            self.config.parallelism
        );

        let output = if self.config.is_sequential() {
            if !self.config.blocking {
                log::warn!("sequential runs always block; returning collected results");
            }
            self.run_sequential(tasks).map(RunOutput::Collected)
        } else {
            self.run_parallel(tasks)
        };

        match output {
            Ok(RunOutput::Streaming(stream)) => Ok(RunOutput::Streaming(stream)),
            Ok(RunOutput::Collected(list)) => {
                self.set_state(RunState::Done);
                let elapsed = self.started_at.map(|t| t.elapsed()).unwrap_or_default();
                log::info!(
                    "{} {} finished in {:.2}s ({} failed)",
                    list.len(),
                    self.config.description,
                    elapsed.as_secs_f64(),
                    list.failure_count()
                );
                Ok(RunOutput::Collected(list))
            }
            Err(e) => {
                self.set_state(RunState::Done);
                Err(e)
            }
        }
    }

    fn run_parallel(&mut self, tasks: VecDeque<QueuedTask<T>>) -> RunResult<RunOutput<T>> {
        let total = tasks.len();
        let (pool, receiver) = WorkerPool::start(
            self.config.parallelism,
            &self.config.description,
            tasks,
            self.stats.clone(),
        )?;
        let mut stream = CompletionStream::new(pool, receiver, total, self.config.poll_interval());
        self.state = stream.shared_state();

        if !self.config.blocking {
            return Ok(RunOutput::Streaming(stream));
        }

        let (results, error) = ProgressMonitor::new(self.progress.as_mut(), total).drive(&mut stream);
        stream.release();

        match error {
            None => Ok(RunOutput::Collected(results)),
            Some(e) => {
                log::warn!(
                    "keeping {} completions collected before the run failed",
                    results.len()
                );
                self.partial = Some(results);
                Err(e)
            }
        }
    }

    /// Inline, in submission order, without isolation: the first failure
    /// aborts the rest of the queue and a panic unwinds through the caller.
    fn run_sequential(&mut self, tasks: VecDeque<QueuedTask<T>>) -> RunResult<ResultList<T>> {
        let total = tasks.len();
        let mut collector = ResultCollector::with_capacity(total);
        self.set_state(RunState::Draining);
        self.progress.start(total as u64);

        for queued in tasks {
            let index = queued.index;
            let label = queued.label.clone();

            let start_time = Instant::now();
            let outcome = queued.run_inline();
            let duration = start_time.elapsed();

            match outcome {
                Ok(value) => collector.collect(Completion {
                    index,
                    label,
                    worker_id: 0,
                    duration,
                    outcome: Ok(value),
                }),
                Err(source) => {
                    log::warn!("task {} failed, aborting the remaining queue: {}", index, source);
                    self.progress.finish();
                    return Err(RunError::TaskFailed { index, source });
                }
            }

            self.progress.advance(1);
        }

        self.progress.finish();
        Ok(collector.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutionMode;
    use crate::error::TaskFailure;
    use std::collections::HashSet;
    use std::thread;
    use std::time::Duration;

    fn config(parallelism: usize) -> RunConfig {
        RunConfig::new()
            .with_parallelism(parallelism)
            .with_mode(ExecutionMode::Pool)
            .with_poll_interval(Duration::from_millis(10))
            .with_progress(false)
    }

    fn wait_for_workers(stats: &PoolStats) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while stats.alive() > 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
    }

    fn sleep_then(i: usize, ms: u64) -> impl FnOnce() -> anyhow::Result<usize> + Send + 'static {
        move || {
            thread::sleep(Duration::from_millis(ms));
            Ok(i)
        }
    }

    #[test]
    fn test_empty_queue_fails_fast_without_workers() {
        let mut run: ParallelRun<usize> = ParallelRun::new(config(4)).unwrap();
        assert!(matches!(run.run(), Err(RunError::EmptyQueue)));
        assert_eq!(run.state(), RunState::Idle);
        assert_eq!(run.pool_stats().spawned(), 0);
        assert_eq!(run.pool_stats().alive(), 0);
    }

    #[test]
    fn test_zero_parallelism_rejected_at_construction() {
        let result: RunResult<ParallelRun<usize>> = ParallelRun::new(config(0));
        assert!(matches!(result, Err(RunError::InvalidConfig(_))));
    }

    #[test]
    fn test_completions_are_a_bijection_with_tasks() {
        for workers in 1..=4 {
            for tasks in [1usize, 3, 9] {
                let mut run = ParallelRun::new(config(workers)).unwrap();
                for i in 0..tasks {
                    run.enqueue_fn(sleep_then(i, (i % 3) as u64 * 3));
                }
                assert_eq!(run.state(), RunState::Queued);

                let results = run.run().unwrap().into_results().unwrap();
                assert_eq!(run.state(), RunState::Done);
                assert_eq!(results.len(), tasks);

                let indices: HashSet<usize> = results.indices().into_iter().collect();
                assert_eq!(indices, (0..tasks).collect());
                for c in &results {
                    assert_eq!(c.value(), Some(&c.index));
                }
                assert_eq!(run.pool_stats().alive(), 0);
            }
        }
    }

    #[test]
    fn test_failure_is_isolated_in_pool_mode() {
        for workers in 1..=5 {
            let mut run = ParallelRun::new(config(workers)).unwrap();
            for i in 0..5usize {
                run.enqueue_fn(move || {
                    if i == 2 {
                        anyhow::bail!("task #3 always fails");
                    }
                    Ok(i)
                });
            }

            let results = run.run().unwrap().into_results().unwrap();
            assert_eq!(results.len(), 5);
            assert_eq!(results.success_count(), 4);

            let failures = results.failures();
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].index, 2);
            assert!(matches!(failures[0].failure(), Some(TaskFailure::Error(_))));
        }
    }

    #[test]
    fn test_panicking_task_reported_as_failure() {
        let mut run = ParallelRun::new(config(2)).unwrap();
        run.enqueue_fn(sleep_then(0, 0));
        run.enqueue_fn(|| -> anyhow::Result<usize> { panic!("segfault in runtime") });
        run.enqueue_fn(sleep_then(2, 0));

        let results = run.run().unwrap().into_results().unwrap();
        assert_eq!(results.len(), 3);
        let failure = results.failures()[0];
        assert_eq!(failure.index, 1);
        assert!(failure.failure().map_or(false, |f| f.is_panic()));
    }

    #[test]
    fn test_sequential_preserves_submission_order() {
        let cfg = config(4).with_mode(ExecutionMode::Sequential);
        let mut run = ParallelRun::new(cfg).unwrap();
        for i in 0..6 {
            run.enqueue_fn(sleep_then(i, (6 - i as u64) * 2));
        }

        let results = run.run().unwrap().into_results().unwrap();
        assert_eq!(results.indices(), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(run.pool_stats().spawned(), 0);
    }

    #[test]
    fn test_auto_mode_with_one_worker_is_sequential() {
        let cfg = config(1).with_mode(ExecutionMode::Auto);
        let mut run = ParallelRun::new(cfg).unwrap();
        run.enqueue_fn(sleep_then(0, 0));
        let output = run.run().unwrap();
        assert!(!output.is_streaming());
        assert_eq!(run.pool_stats().spawned(), 0);
    }

    #[test]
    fn test_sequential_failure_aborts_queue() {
        let cfg = config(1).with_mode(ExecutionMode::Sequential);
        let mut run = ParallelRun::new(cfg).unwrap();
        let ran = Arc::new(parking_lot::Mutex::new(Vec::new()));

        for i in 0..5usize {
            let ran = ran.clone();
            run.enqueue_fn(move || {
                ran.lock().push(i);
                if i == 2 {
                    anyhow::bail!("bad calibration data");
                }
                Ok(i)
            });
        }

        match run.run() {
            Err(RunError::TaskFailed { index, source }) => {
                assert_eq!(index, 2);
                assert!(source.to_string().contains("bad calibration data"));
            }
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("sequential run should have failed"),
        }
        assert_eq!(*ran.lock(), vec![0, 1, 2]);
        assert_eq!(run.state(), RunState::Done);
    }

    #[test]
    fn test_run_is_single_shot() {
        let mut run = ParallelRun::new(config(2)).unwrap();
        run.enqueue_fn(sleep_then(0, 0));
        run.run().unwrap().into_results().unwrap();

        run.enqueue_fn(sleep_then(1, 0));
        assert_eq!(run.len(), 0);
        assert!(matches!(run.run(), Err(RunError::AlreadyStarted)));
    }

    #[test]
    fn test_non_blocking_returns_before_tasks_finish() {
        let cfg = config(2).with_blocking(false);
        let mut run = ParallelRun::new(cfg).unwrap();
        for i in 0..4 {
            run.enqueue_fn(sleep_then(i, 200));
        }

        let started = Instant::now();
        let output = run.run().unwrap();
        assert!(started.elapsed() < Duration::from_millis(150));
        assert!(output.is_streaming());
        assert_eq!(run.state(), RunState::Draining);

        let mut stream = output.into_stream().unwrap();
        assert_eq!(stream.total(), 4);
        assert!(!stream.is_done());

        let mut seen = HashSet::new();
        for completion in stream.by_ref() {
            seen.insert(completion.unwrap().index);
        }
        assert_eq!(seen, (0..4).collect());
        assert!(stream.is_done());
        assert_eq!(run.state(), RunState::Done);
        drop(stream);
        assert_eq!(run.pool_stats().alive(), 0);
    }

    #[test]
    fn test_abandoned_stream_reclaims_workers() {
        let cfg = config(2).with_blocking(false);
        let mut run = ParallelRun::new(cfg).unwrap();
        for i in 0..20 {
            run.enqueue_fn(sleep_then(i, 20));
        }

        let stats = run.pool_stats();
        let output = run.run().unwrap();
        assert_eq!(stats.spawned(), 2);
        drop(output);
        assert_eq!(run.state(), RunState::Done);
        wait_for_workers(&stats);
        assert_eq!(stats.alive(), 0);
    }

    #[test]
    fn test_dropping_stream_does_not_wait_for_slow_task() {
        let cfg = config(2).with_blocking(false);
        let mut run = ParallelRun::new(cfg).unwrap();
        run.enqueue_fn(sleep_then(0, 1500));
        run.enqueue_fn(sleep_then(1, 0));

        let stats = run.pool_stats();
        let output = run.run().unwrap();
        thread::sleep(Duration::from_millis(50));

        let started = Instant::now();
        drop(output);
        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(run.state(), RunState::Done);

        wait_for_workers(&stats);
        assert_eq!(stats.alive(), 0);
    }

    #[test]
    fn test_crashed_worker_keeps_partial_results_in_blocking_mode() {
        struct Bomb;

        impl Drop for Bomb {
            fn drop(&mut self) {
                panic!("worker crashed while reporting");
            }
        }

        let mut run = ParallelRun::new(config(2)).unwrap();
        for i in 0..5 {
            run.enqueue_fn(sleep_then(i, 5));
        }
        run.enqueue_fn(|| -> anyhow::Result<usize> { std::panic::panic_any(Bomb) });

        match run.run() {
            Err(RunError::LostTasks { lost, total }) => {
                assert_eq!(lost, vec![5]);
                assert_eq!(total, 6);
            }
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("a crashed worker must fail the run"),
        }
        assert_eq!(run.state(), RunState::Done);

        let partial = run.take_partial_results().unwrap();
        assert_eq!(partial.len(), 5);
        assert_eq!(partial.success_count(), 5);
        let indices: HashSet<usize> = partial.indices().into_iter().collect();
        assert_eq!(indices, (0..5).collect());
        assert!(run.take_partial_results().is_none());
        assert_eq!(run.pool_stats().alive(), 0);
    }
}
