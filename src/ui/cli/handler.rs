// Wed Jan 15 2026 - Alex

use super::args::{Args, Command, RunArgs, SummaryArgs};
use crate::config::RunConfig;
use crate::engine::ParallelRun;
use crate::error::RunError;
use crate::output::RunReport;
use crate::pipeline::{BenchmarkManifest, PipelineOutput};
use anyhow::Context;
use colored::Colorize;
use std::time::{Duration, Instant};

pub struct CommandHandler;

impl CommandHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(&self, args: Args) -> anyhow::Result<()> {
        if args.no_color {
            colored::control::set_override(false);
        }

        self.setup_logging(&args)?;

        match args.command {
            Command::Run(run_args) => self.handle_run(run_args, args.quiet),
            Command::Summary(summary_args) => self.handle_summary(summary_args),
        }
    }

    fn setup_logging(&self, args: &Args) -> anyhow::Result<()> {
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => log::LevelFilter::Trace,
            "debug" => log::LevelFilter::Debug,
            "info" => log::LevelFilter::Info,
            "warn" => log::LevelFilter::Warn,
            "error" => log::LevelFilter::Error,
            _ => log::LevelFilter::Info,
        };
        let level = if args.quiet { log::LevelFilter::Warn.min(level) } else { level };

        // A second init (tests, embedding) keeps the first logger.
        let _ = env_logger::Builder::new()
            .filter_level(level)
            .format_timestamp(None)
            .try_init();

        Ok(())
    }

    fn build_config(&self, args: &RunArgs, manifest: &BenchmarkManifest) -> RunConfig {
        let mut config = manifest.apply_to(RunConfig::default());

        if let Some(jobs) = args.jobs {
            config.parallelism = jobs;
        }
        if let Some(mode) = args.execution_mode() {
            config.mode = mode;
        }
        if let Some(ms) = args.poll_interval_ms {
            config.poll_interval_ms = ms;
        }
        if let Some(ref desc) = args.desc {
            config.description = desc.clone();
        }
        if args.no_progress {
            config.show_progress = false;
        }

        config.with_blocking(true)
    }

    fn handle_run(&self, args: RunArgs, quiet: bool) -> anyhow::Result<()> {
        args.validate().map_err(|e| anyhow::anyhow!(e))?;

        let manifest = BenchmarkManifest::load(&args.manifest)?;
        manifest.validate()?;

        let mut config = self.build_config(&args, &manifest);
        if quiet {
            config.show_progress = false;
        }

        if !quiet {
            println!(
                "{} {} pipelines from {}",
                "Running".cyan(),
                manifest.pipelines.len(),
                args.manifest.display()
            );
        }

        let description = config.description.clone();
        let mut run: ParallelRun<PipelineOutput> = ParallelRun::new(config)?;
        for job in manifest.jobs() {
            run.enqueue(job);
        }

        let start_time = Instant::now();
        let (results, lost) = match run.run() {
            Ok(output) => (output.into_results()?, Vec::new()),
            Err(RunError::LostTasks { lost, total }) => {
                log::error!("{} of {} pipelines were lost with their worker", lost.len(), total);
                (run.take_partial_results().unwrap_or_default(), lost)
            }
            Err(e) => return Err(e.into()),
        };
        let wall_time: Duration = start_time.elapsed();

        let stats = results.statistics();
        log::info!(
            "{} succeeded, {} failed, average pipeline time {:.2}s across {} workers",
            stats.tasks_succeeded,
            stats.tasks_failed,
            stats.average_task_time.as_secs_f64(),
            stats.tasks_per_worker.len()
        );

        let mut report = RunReport::from_results(&description, &manifest, &results, wall_time);
        if !lost.is_empty() {
            report.mark_lost(&manifest, &lost);
        }
        report
            .save(&args.output)
            .with_context(|| format!("failed to write results to {}", args.output.display()))?;
        log::info!("results written to {}", args.output.display());

        if let Some(ref path) = args.markdown {
            std::fs::write(path, report.to_markdown())
                .with_context(|| format!("failed to write markdown to {}", path.display()))?;
        }

        if !quiet {
            report.print_summary();
            println!("\n{} {}", "Results:".green(), args.output.display());
        }

        if report.lost > 0 {
            anyhow::bail!("{} of {} pipelines never reported", report.lost, report.total);
        }
        if report.has_failures() {
            anyhow::bail!("{} of {} pipelines failed", report.failed, report.total);
        }

        Ok(())
    }

    fn handle_summary(&self, args: SummaryArgs) -> anyhow::Result<()> {
        let report = RunReport::load(&args.input)
            .with_context(|| format!("failed to read results from {}", args.input.display()))?;

        if args.markdown {
            print!("{}", report.to_markdown());
        } else {
            report.print_summary();
        }

        Ok(())
    }
}

impl Default for CommandHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutionMode;
    use clap::Parser;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("bench-runner-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_cli_overrides_manifest_settings() {
        let manifest = BenchmarkManifest::from_json(
            r#"{"description": "classification", "run": {"parallelism": 8, "mode": "sequential"},
                "pipelines": [{"name": "a", "program": "true"}]}"#,
        )
        .unwrap();
        let args = Args::try_parse_from([
            "bench-runner", "run", "m.json", "-j", "3", "--mode", "pool", "--no-progress",
        ])
        .unwrap();
        let Command::Run(run_args) = args.command else {
            panic!("expected run command");
        };

        let config = CommandHandler::new().build_config(&run_args, &manifest);
        assert_eq!(config.parallelism, 3);
        assert_eq!(config.mode, ExecutionMode::Pool);
        assert_eq!(config.description, "classification");
        assert!(!config.show_progress);
        assert!(config.blocking);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_writes_report_and_fails_on_pipeline_error() {
        let manifest = temp_path("manifest.json");
        let output = temp_path("results.json");
        std::fs::write(
            &manifest,
            r#"{"description": "smoke", "devices": [0, 1],
                "pipelines": [
                    {"name": "good", "program": "sh", "args": ["-c", "echo '{\"top1\": 70.1}'"]},
                    {"name": "bad", "program": "sh", "args": ["-c", "exit 2"]}
                ]}"#,
        )
        .unwrap();

        let args = Args::try_parse_from([
            "bench-runner",
            "--quiet",
            "run",
            manifest.to_str().unwrap(),
            "-j",
            "2",
            "-o",
            output.to_str().unwrap(),
        ])
        .unwrap();

        let err = CommandHandler::new().execute(args).unwrap_err();
        assert!(err.to_string().contains("1 of 2 pipelines failed"));

        let report = RunReport::load(&output).unwrap();
        let _ = std::fs::remove_file(&manifest);
        let _ = std::fs::remove_file(&output);

        assert_eq!(report.total, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.entries[0].name, "good");
        assert_eq!(report.entries[0].device, Some(0));
        assert_eq!(report.entries[1].name, "bad");
        assert_eq!(report.entries[1].device, Some(1));
    }
}
