// Tue Jan 13 2026 - Alex

use crate::engine::completion::Completion;
use crate::engine::task::QueuedTask;
use crate::error::RunError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

type SharedQueue<T> = Arc<Mutex<VecDeque<QueuedTask<T>>>>;

#[derive(Debug, Default)]
pub struct PoolStats {
    spawned: AtomicUsize,
    alive: AtomicUsize,
}

impl PoolStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawned(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }

    pub fn alive(&self) -> usize {
        self.alive.load(Ordering::SeqCst)
    }
}

struct AliveGuard(Arc<PoolStats>);

impl Drop for AliveGuard {
    fn drop(&mut self) {
        self.0.alive.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct Worker {
    id: usize,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    fn spawn<T: Send + 'static>(
        id: usize,
        label: &str,
        queue: SharedQueue<T>,
        sender: Sender<Completion<T>>,
        stats: Arc<PoolStats>,
    ) -> std::io::Result<Self> {
        stats.alive.fetch_add(1, Ordering::SeqCst);
        let guard = AliveGuard(stats.clone());

        // a failed spawn drops the closure, and the guard with it
        let handle = thread::Builder::new()
            .name(format!("{}-worker-{}", label, id))
            .spawn(move || {
                let _guard = guard;
                Worker::worker_loop(id, queue, sender);
            })?;

        stats.spawned.fetch_add(1, Ordering::SeqCst);
        Ok(Self {
            id,
            handle: Some(handle),
        })
    }

    fn worker_loop<T: Send + 'static>(id: usize, queue: SharedQueue<T>, sender: Sender<Completion<T>>) {
        loop {
            let next = queue.lock().pop_front();

            let Some(queued) = next else {
                log::debug!("worker {} found the queue empty, exiting", id);
                break;
            };

            let index = queued.index;
            let label = queued.label.clone();
            log::debug!("worker {} picked up task {}", id, index);

            let start_time = Instant::now();
            let outcome = queued.run_isolated();
            let duration = start_time.elapsed();

            if let Err(ref failure) = outcome {
                log::warn!("task {} failed on worker {}: {}", index, id, failure);
            }

            let completion = Completion {
                index,
                label,
                worker_id: id,
                duration,
                outcome,
            };

            if sender.send(completion).is_err() {
                log::debug!("worker {}: completion stream released, exiting", id);
                break;
            }
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Returns false when the worker thread died abnormally.
    fn join(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => handle.join().is_ok(),
            None => true,
        }
    }
}

/// Fixed set of worker threads pulling from one shared FIFO queue. Idle
/// workers take the next undispatched task, so slow tasks never hold up
/// a pre-assigned share of the queue.
pub struct WorkerPool<T> {
    workers: Vec<Worker>,
    queue: SharedQueue<T>,
    stats: Arc<PoolStats>,
}

impl<T: Send + 'static> WorkerPool<T> {
    pub fn start(
        size: usize,
        label: &str,
        tasks: VecDeque<QueuedTask<T>>,
        stats: Arc<PoolStats>,
    ) -> Result<(Self, Receiver<Completion<T>>), RunError> {
        if size == 0 {
            return Err(RunError::InvalidConfig(
                "worker pool size must be greater than 0".to_string(),
            ));
        }

        let size = size.min(tasks.len()).max(1);
        let (sender, receiver) = channel();

        let mut pool = Self {
            workers: Vec::with_capacity(size),
            queue: Arc::new(Mutex::new(tasks)),
            stats,
        };

        for id in 0..size {
            // an early return drops `pool`, which tears down what was started
            let worker = Worker::spawn(
                id,
                label,
                pool.queue.clone(),
                sender.clone(),
                pool.stats.clone(),
            )?;
            pool.workers.push(worker);
        }

        log::debug!("started {} workers for '{}'", size, label);
        Ok((pool, receiver))
    }
}

impl<T> WorkerPool<T> {
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn active_count(&self) -> usize {
        self.workers.iter().filter(|w| !w.is_finished()).count()
    }

    pub fn stats(&self) -> Arc<PoolStats> {
        self.stats.clone()
    }

    fn clear_pending(&self) {
        let dropped = {
            let mut queue = self.queue.lock();
            let n = queue.len();
            queue.clear();
            n
        };
        if dropped > 0 {
            log::debug!("dropping {} undispatched tasks", dropped);
        }
    }

    /// Drops undispatched tasks and joins every worker. In-flight tasks run
    /// to completion first.
    pub fn shutdown(&mut self) {
        self.clear_pending();

        for worker in &mut self.workers {
            if !worker.join() {
                log::warn!("worker {} terminated abnormally", worker.id());
            }
        }
        self.workers.clear();
    }

    /// Drops undispatched tasks and lets busy workers finish in the
    /// background. Returns without waiting on in-flight tasks.
    pub fn detach(&mut self) {
        self.clear_pending();

        let busy = self.active_count();
        if busy > 0 {
            log::debug!("detaching {} workers still running a task", busy);
        }
        for worker in &mut self.workers {
            if worker.is_finished() && !worker.join() {
                log::warn!("worker {} terminated abnormally", worker.id());
            }
        }
        self.workers.clear();
    }
}

impl<T> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        self.detach();
    }
}
