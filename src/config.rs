// Tue Jan 13 2026 - Alex

use crate::error::RunError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Sequential when `parallelism <= 1`, worker pool otherwise.
    #[default]
    Auto,
    Pool,
    Sequential,
}

impl ExecutionMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Some(ExecutionMode::Auto),
            "pool" | "parallel" => Some(ExecutionMode::Pool),
            "sequential" | "serial" => Some(ExecutionMode::Sequential),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExecutionMode::Auto => "auto",
            ExecutionMode::Pool => "pool",
            ExecutionMode::Sequential => "sequential",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub parallelism: usize,
    pub description: String,
    pub blocking: bool,
    pub poll_interval_ms: u64,
    pub mode: ExecutionMode,
    pub show_progress: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            parallelism: num_cpus::get(),
            description: "tasks".to_string(),
            blocking: true,
            poll_interval_ms: 10_000,
            mode: ExecutionMode::Auto,
            show_progress: true,
        }
    }
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn is_sequential(&self) -> bool {
        match self.mode {
            ExecutionMode::Auto => self.parallelism <= 1,
            ExecutionMode::Pool => false,
            ExecutionMode::Sequential => true,
        }
    }

    pub fn validate(&self) -> Result<(), RunError> {
        if self.parallelism == 0 {
            return Err(RunError::InvalidConfig(
                "parallelism must be greater than 0".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(RunError::InvalidConfig(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, RunError> {
        serde_json::from_str(json)
            .map_err(|e| RunError::InvalidConfig(format!("JSON parse error: {}", e)))
    }

    pub fn from_file(path: &Path) -> Result<Self, RunError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RunError::InvalidConfig(format!("cannot read config '{}': {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = RunConfig::default();
        assert_eq!(c.description, "tasks");
        assert!(c.blocking);
        assert_eq!(c.poll_interval(), Duration::from_secs(10));
        assert_eq!(c.mode, ExecutionMode::Auto);
        assert!(c.parallelism >= 1);
    }

    #[test]
    fn test_zero_parallelism_rejected() {
        let c = RunConfig::new().with_parallelism(0);
        assert!(matches!(c.validate(), Err(RunError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let c = RunConfig::new().with_poll_interval(Duration::ZERO);
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_mode_selection() {
        assert!(RunConfig::new().with_parallelism(1).is_sequential());
        assert!(!RunConfig::new().with_parallelism(4).is_sequential());
        assert!(!RunConfig::new()
            .with_parallelism(1)
            .with_mode(ExecutionMode::Pool)
            .is_sequential());
        assert!(RunConfig::new()
            .with_parallelism(8)
            .with_mode(ExecutionMode::Sequential)
            .is_sequential());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let c = RunConfig::from_json(r#"{"parallelism": 3, "mode": "pool"}"#).unwrap();
        assert_eq!(c.parallelism, 3);
        assert_eq!(c.mode, ExecutionMode::Pool);
        assert_eq!(c.description, "tasks");
        assert!(c.blocking);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!(ExecutionMode::from_str("POOL"), Some(ExecutionMode::Pool));
        assert_eq!(ExecutionMode::from_str("serial"), Some(ExecutionMode::Sequential));
        assert_eq!(ExecutionMode::from_str("bogus"), None);
    }
}
