// Tue Jan 13 2026 - Alex

use crate::engine::completion::Completion;
use std::collections::HashMap;
use std::time::Duration;

/// Completions of one run in the order they were reported.
#[derive(Debug)]
pub struct ResultList<T> {
    completions: Vec<Completion<T>>,
}

impl<T> ResultList<T> {
    pub fn new() -> Self {
        Self {
            completions: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.completions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.completions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Completion<T>> {
        self.completions.iter()
    }

    pub fn get(&self, position: usize) -> Option<&Completion<T>> {
        self.completions.get(position)
    }

    pub fn indices(&self) -> Vec<usize> {
        self.completions.iter().map(|c| c.index).collect()
    }

    pub fn successes(&self) -> impl Iterator<Item = &T> {
        self.completions.iter().filter_map(|c| c.value())
    }

    pub fn failures(&self) -> Vec<&Completion<T>> {
        self.completions.iter().filter(|c| c.is_failure()).collect()
    }

    pub fn success_count(&self) -> usize {
        self.completions.iter().filter(|c| c.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.completions.len() - self.success_count()
    }

    pub fn statistics(&self) -> RunStatistics {
        RunStatistics::from_completions(&self.completions)
    }

    /// Reorders by queue position. Completion order is lost.
    pub fn into_submission_order(mut self) -> Vec<Completion<T>> {
        self.completions.sort_by_key(|c| c.index);
        self.completions
    }

    pub fn into_vec(self) -> Vec<Completion<T>> {
        self.completions
    }
}

impl<T> Default for ResultList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IntoIterator for ResultList<T> {
    type Item = Completion<T>;
    type IntoIter = std::vec::IntoIter<Completion<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.completions.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a ResultList<T> {
    type Item = &'a Completion<T>;
    type IntoIter = std::slice::Iter<'a, Completion<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.completions.iter()
    }
}

pub struct ResultCollector<T> {
    results: ResultList<T>,
}

impl<T> ResultCollector<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            results: ResultList {
                completions: Vec::with_capacity(capacity),
            },
        }
    }

    pub fn collect(&mut self, completion: Completion<T>) {
        self.results.completions.push(completion);
    }

    pub fn count(&self) -> usize {
        self.results.len()
    }

    pub fn finish(self) -> ResultList<T> {
        self.results
    }
}

#[derive(Debug, Clone)]
pub struct RunStatistics {
    pub tasks_succeeded: usize,
    pub tasks_failed: usize,
    pub total_task_time: Duration,
    pub average_task_time: Duration,
    pub slowest_task: Option<(usize, Duration)>,
    pub tasks_per_worker: HashMap<usize, usize>,
}

impl RunStatistics {
    pub fn from_completions<T>(completions: &[Completion<T>]) -> Self {
        let mut tasks_succeeded = 0;
        let mut tasks_failed = 0;
        let mut total_task_time = Duration::ZERO;
        let mut slowest_task: Option<(usize, Duration)> = None;
        let mut tasks_per_worker: HashMap<usize, usize> = HashMap::new();

        for completion in completions {
            if completion.is_success() {
                tasks_succeeded += 1;
            } else {
                tasks_failed += 1;
            }

            total_task_time += completion.duration;
            *tasks_per_worker.entry(completion.worker_id).or_insert(0) += 1;

            if slowest_task.map_or(true, |(_, d)| completion.duration > d) {
                slowest_task = Some((completion.index, completion.duration));
            }
        }

        let average_task_time = if completions.is_empty() {
            Duration::ZERO
        } else {
            total_task_time / completions.len() as u32
        };

        Self {
            tasks_succeeded,
            tasks_failed,
            total_task_time,
            average_task_time,
            slowest_task,
            tasks_per_worker,
        }
    }

    pub fn total(&self) -> usize {
        self.tasks_succeeded + self.tasks_failed
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.tasks_succeeded as f64 / total as f64
        }
    }
}
