// Tue Jan 13 2026 - Alex

use crate::engine::collector::ResultList;
use crate::pipeline::{BenchmarkManifest, PipelineOutput};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Passed,
    Failed,
    /// Never reported: its worker died while running it.
    Lost,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    pub index: usize,
    pub name: String,
    pub status: EntryStatus,
    pub error: Option<String>,
    pub duration_ms: u64,
    pub worker_id: Option<usize>,
    pub device: Option<u32>,
    pub exit_code: Option<i32>,
    pub metrics: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub description: String,
    pub generated_at: u64,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    #[serde(default)]
    pub lost: usize,
    pub wall_time_ms: u64,
    pub entries: Vec<ReportEntry>,
}

impl RunReport {
    /// Builds one entry per completion, filling names and devices of failed
    /// pipelines from the manifest that scheduled them.
    pub fn from_results(
        description: &str,
        manifest: &BenchmarkManifest,
        results: &ResultList<PipelineOutput>,
        wall_time: Duration,
    ) -> Self {
        let entries: Vec<ReportEntry> = results
            .iter()
            .map(|c| match &c.outcome {
                Ok(out) => ReportEntry {
                    index: c.index,
                    name: out.name.clone(),
                    status: EntryStatus::Passed,
                    error: None,
                    duration_ms: c.duration.as_millis() as u64,
                    worker_id: Some(c.worker_id),
                    device: out.device,
                    exit_code: out.exit_code,
                    metrics: out.metrics.clone(),
                },
                Err(failure) => ReportEntry {
                    index: c.index,
                    name: c.display_name(),
                    status: EntryStatus::Failed,
                    error: Some(failure.to_string()),
                    duration_ms: c.duration.as_millis() as u64,
                    worker_id: Some(c.worker_id),
                    device: manifest.device_for(c.index),
                    exit_code: None,
                    metrics: None,
                },
            })
            .collect();

        let generated_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let mut report = Self {
            description: description.to_string(),
            generated_at,
            total: 0,
            succeeded: 0,
            failed: 0,
            lost: 0,
            wall_time_ms: wall_time.as_millis() as u64,
            entries,
        };
        report.recount();
        report
    }

    /// Adds entries for pipelines that never reported a completion.
    pub fn mark_lost(&mut self, manifest: &BenchmarkManifest, lost: &[usize]) {
        for &index in lost {
            if self.entries.iter().any(|e| e.index == index) {
                continue;
            }
            let name = manifest
                .pipelines
                .get(index)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| format!("task #{}", index));
            self.entries.push(ReportEntry {
                index,
                name,
                status: EntryStatus::Lost,
                error: Some("worker exited before reporting a result".to_string()),
                duration_ms: 0,
                worker_id: None,
                device: manifest.device_for(index),
                exit_code: None,
                metrics: None,
            });
        }
        self.recount();
    }

    fn recount(&mut self) {
        self.entries.sort_by_key(|e| e.index);
        let count = |status| self.entries.iter().filter(|e| e.status == status).count();
        let (succeeded, failed, lost) = (
            count(EntryStatus::Passed),
            count(EntryStatus::Failed),
            count(EntryStatus::Lost),
        );
        self.total = self.entries.len();
        self.succeeded = succeeded;
        self.failed = failed;
        self.lost = lost;
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.lost > 0
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(json.as_bytes())?;
        writer.flush()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        md.push_str(&format!("# {} results\n\n", self.description));
        md.push_str("| # | Pipeline | Status | Time (s) | Device | Metrics |\n");
        md.push_str("|---|----------|--------|----------|--------|---------|\n");
        for e in &self.entries {
            let status = match e.status {
                EntryStatus::Passed => "passed".to_string(),
                EntryStatus::Failed => format!("failed: {}", e.error.as_deref().unwrap_or("-")),
                EntryStatus::Lost => "lost".to_string(),
            };
            md.push_str(&format!(
                "| {} | {} | {} | {:.2} | {} | {} |\n",
                e.index,
                e.name,
                status,
                e.duration_ms as f64 / 1000.0,
                e.device.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
                e.metrics.as_ref().map(|m| m.to_string()).unwrap_or_else(|| "-".to_string()),
            ));
        }
        md
    }

    pub fn print_summary(&self) {
        println!();
        println!("{}", format!("{} summary", self.description).cyan().bold());
        println!("{}", "-".repeat(50).cyan());

        for e in &self.entries {
            let secs = format!("{:>8.2}s", e.duration_ms as f64 / 1000.0);
            match e.status {
                EntryStatus::Passed => {
                    let metrics = e.metrics.as_ref().map(|m| m.to_string()).unwrap_or_default();
                    println!("  {} {:<32} {} {}", "[+]".green(), e.name, secs.dimmed(), metrics);
                }
                EntryStatus::Failed | EntryStatus::Lost => {
                    println!("  {} {:<32} {}", "[!]".red(), e.name, secs.dimmed());
                    if let Some(ref err) = e.error {
                        println!("      {}", err.red());
                    }
                }
            }
        }

        println!("{}", "-".repeat(50).cyan());
        let failed = if self.failed > 0 {
            self.failed.to_string().red()
        } else {
            self.failed.to_string().green()
        };
        println!(
            "  {} passed, {} failed, {} total in {:.2}s",
            self.succeeded.to_string().green(),
            failed,
            self.total,
            self.wall_time_ms as f64 / 1000.0
        );
        if self.lost > 0 {
            println!("  {} {} never reported", "[!]".red(), self.lost.to_string().red());
        }
    }
}
