// Tue Jan 13 2026 - Alex

pub mod task;
pub mod queue;
pub mod worker;
pub mod completion;
pub mod monitor;
pub mod collector;
pub mod runner;

pub use task::{Task, BoxedTask, QueuedTask};
pub use queue::TaskQueue;
pub use worker::{WorkerPool, PoolStats};
pub use completion::{Completion, CompletionStream};
pub use monitor::{ProgressMonitor, ProgressState};
pub use collector::{ResultCollector, ResultList, RunStatistics};
pub use runner::{ParallelRun, RunOutput, RunState};
