// Wed Jan 15 2026 - Alex

pub mod manifest;
pub mod job;

pub use manifest::{BenchmarkManifest, PipelineSpec, RunSettings};
pub use job::{PipelineJob, PipelineOutput};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("cannot read manifest '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid manifest: {0}")]
    Invalid(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
