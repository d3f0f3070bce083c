// Tue Jan 13 2026 - Alex

pub mod config;
pub mod error;
pub mod engine;
pub mod pipeline;
pub mod output;
pub mod ui;

pub use config::{ExecutionMode, RunConfig};
pub use error::{RunError, RunResult, TaskFailure};
pub use engine::{Completion, CompletionStream, ParallelRun, ResultList, RunOutput, RunState, Task};
pub use pipeline::{BenchmarkManifest, PipelineJob, PipelineOutput};
pub use output::RunReport;
