// Wed Jan 15 2026 - Alex

use crate::config::{ExecutionMode, RunConfig};
use crate::pipeline::job::PipelineJob;
use crate::pipeline::{PipelineError, PipelineResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// One benchmark pipeline (import, inference, evaluation) run as a command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineSpec {
    pub name: String,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: IndexMap<String, String>,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

impl PipelineSpec {
    pub fn new(name: &str, program: &str) -> Self {
        Self {
            name: name.to_string(),
            program: program.to_string(),
            args: Vec::new(),
            env: IndexMap::new(),
            cwd: None,
        }
    }

    pub fn with_args(mut self, args: &[&str]) -> Self {
        self.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunSettings {
    #[serde(default)]
    pub parallelism: Option<usize>,
    #[serde(default)]
    pub mode: Option<ExecutionMode>,
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkManifest {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub run: RunSettings,
    /// Accelerator ids handed out round-robin, one per pipeline.
    #[serde(default)]
    pub devices: Vec<u32>,
    pub pipelines: Vec<PipelineSpec>,
}

impl BenchmarkManifest {
    pub fn from_json(json: &str) -> PipelineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> PipelineResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.pipelines.is_empty() {
            return Err(PipelineError::Invalid(
                "at least one pipeline must be listed".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for spec in &self.pipelines {
            if spec.name.trim().is_empty() {
                return Err(PipelineError::Invalid("pipeline name is empty".to_string()));
            }
            if spec.program.trim().is_empty() {
                return Err(PipelineError::Invalid(format!(
                    "pipeline '{}' has no program",
                    spec.name
                )));
            }
            if !names.insert(spec.name.as_str()) {
                return Err(PipelineError::Invalid(format!(
                    "duplicate pipeline name '{}'",
                    spec.name
                )));
            }
        }
        Ok(())
    }

    /// Layers the manifest's run settings over `config`.
    pub fn apply_to(&self, mut config: RunConfig) -> RunConfig {
        if let Some(ref description) = self.description {
            config.description = description.clone();
        }
        if let Some(parallelism) = self.run.parallelism {
            config.parallelism = parallelism;
        }
        if let Some(mode) = self.run.mode {
            config.mode = mode;
        }
        if let Some(ms) = self.run.poll_interval_ms {
            config.poll_interval_ms = ms;
        }
        config
    }

    pub fn device_for(&self, index: usize) -> Option<u32> {
        if self.devices.is_empty() {
            None
        } else {
            Some(self.devices[index % self.devices.len()])
        }
    }

    pub fn jobs(&self) -> Vec<PipelineJob> {
        self.pipelines
            .iter()
            .enumerate()
            .map(|(i, spec)| PipelineJob::new(spec.clone(), self.device_for(i)))
            .collect()
    }
}
