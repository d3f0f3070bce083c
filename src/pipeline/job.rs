// Wed Jan 15 2026 - Alex

use crate::engine::task::Task;
use crate::pipeline::manifest::PipelineSpec;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::process::{Command, Stdio};
use std::time::Instant;

const DEVICE_ENV: &str = "CUDA_VISIBLE_DEVICES";
const TAIL_LINES: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineOutput {
    pub name: String,
    pub device: Option<u32>,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    /// Last stdout line, when it is a JSON object.
    pub metrics: Option<Value>,
    pub stdout_tail: Vec<String>,
}

/// Runs one pipeline in its own child process, so a crashing benchmark
/// cannot take its worker down.
#[derive(Debug, Clone)]
pub struct PipelineJob {
    spec: PipelineSpec,
    device: Option<u32>,
}

impl PipelineJob {
    pub fn new(spec: PipelineSpec, device: Option<u32>) -> Self {
        Self { spec, device }
    }

    pub fn spec(&self) -> &PipelineSpec {
        &self.spec
    }

    pub fn device(&self) -> Option<u32> {
        self.device
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.spec.program);
        cmd.args(&self.spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        for (key, value) in &self.spec.env {
            cmd.env(key, value);
        }
        if let Some(device) = self.device {
            cmd.env(DEVICE_ENV, device.to_string());
        }
        if let Some(ref dir) = self.spec.cwd {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl Task<PipelineOutput> for PipelineJob {
    fn execute(self: Box<Self>) -> anyhow::Result<PipelineOutput> {
        let name = self.spec.name.clone();
        log::debug!(
            "launching pipeline '{}': {} {}",
            name,
            self.spec.program,
            self.spec.args.join(" ")
        );

        let start_time = Instant::now();
        let output = self
            .command()
            .output()
            .with_context(|| format!("failed to launch pipeline '{}' ({})", name, self.spec.program))?;
        let duration_ms = start_time.elapsed().as_millis() as u64;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "pipeline '{}' exited with {}: {}",
                name,
                output.status,
                tail(&stderr, TAIL_LINES).join(" | ")
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(PipelineOutput {
            name,
            device: self.device,
            exit_code: output.status.code(),
            duration_ms,
            metrics: parse_metrics(&stdout),
            stdout_tail: tail(&stdout, TAIL_LINES),
        })
    }

    fn name(&self) -> Option<String> {
        Some(self.spec.name.clone())
    }
}

fn tail(text: &str, n: usize) -> Vec<String> {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let skip = lines.len().saturating_sub(n);
    lines[skip..].iter().map(|l| l.to_string()).collect()
}

fn parse_metrics(stdout: &str) -> Option<Value> {
    let last = stdout.lines().rev().find(|l| !l.trim().is_empty())?;
    match serde_json::from_str::<Value>(last.trim()) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metrics_takes_last_json_line() {
        let out = "loading model\n{\"accuracy_top1%\": 71.2}\n\n";
        let metrics = parse_metrics(out).unwrap();
        assert_eq!(metrics["accuracy_top1%"], 71.2);

        assert!(parse_metrics("done\n").is_none());
        assert!(parse_metrics("[1, 2]\n").is_none());
        assert!(parse_metrics("").is_none());
    }

    #[test]
    fn test_tail() {
        let text = "a\n\nb\nc\nd\ne\nf\n";
        assert_eq!(tail(text, 3), vec!["d", "e", "f"]);
        assert_eq!(tail("x", 5), vec!["x"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_pipeline_reports_metrics() {
        let spec = PipelineSpec::new("ok", "sh").with_args(&[
            "-c",
            "echo running; echo \"{\\\"ap\\\": 23.0, \\\"device\\\": \\\"$CUDA_VISIBLE_DEVICES\\\"}\"",
        ]);
        let job = Box::new(PipelineJob::new(spec, Some(3)));
        assert_eq!(job.name().as_deref(), Some("ok"));

        let out = job.execute().unwrap();
        assert_eq!(out.name, "ok");
        assert_eq!(out.exit_code, Some(0));
        assert_eq!(out.device, Some(3));
        let metrics = out.metrics.unwrap();
        assert_eq!(metrics["ap"], 23.0);
        assert_eq!(metrics["device"], "3");
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_pipeline_carries_stderr() {
        let spec = PipelineSpec::new("broken", "sh")
            .with_args(&["-c", "echo \"model file missing: $MODEL\" >&2; exit 3"])
            .with_env("MODEL", "resnet50.onnx");
        let err = Box::new(PipelineJob::new(spec, None)).execute().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("broken"));
        assert!(msg.contains("model file missing: resnet50.onnx"));
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let spec = PipelineSpec::new("ghost", "/definitely/not/a/real/binary");
        let err = Box::new(PipelineJob::new(spec, None)).execute().unwrap_err();
        assert!(err.to_string().contains("failed to launch pipeline 'ghost'"));
    }
}
