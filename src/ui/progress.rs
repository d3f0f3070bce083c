// Tue Jan 13 2026 - Alex

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const DEFAULT_TEMPLATE: &str =
    "{spinner:.cyan} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}";

/// Receives progress from the run monitor. `finish` is called exactly once
/// per run, after the last `advance`.
pub trait ProgressSink: Send {
    fn start(&mut self, total: u64);

    fn advance(&mut self, delta: u64);

    fn finish(&mut self);
}

pub struct TaskProgressBar {
    bar: Option<ProgressBar>,
    description: String,
    enabled: bool,
    style_template: String,
}

impl TaskProgressBar {
    pub fn new(description: &str) -> Self {
        Self {
            bar: None,
            description: description.to_string(),
            enabled: true,
            style_template: DEFAULT_TEMPLATE.to_string(),
        }
    }

    pub fn hidden(description: &str) -> Self {
        Self::new(description).with_enabled(false)
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_style(mut self, template: &str) -> Self {
        self.style_template = template.to_string();
        self
    }

    pub fn position(&self) -> u64 {
        self.bar.as_ref().map_or(0, |b| b.position())
    }

    pub fn is_finished(&self) -> bool {
        self.bar.as_ref().map_or(false, |b| b.is_finished())
    }

    fn style(&self) -> ProgressStyle {
        ProgressStyle::default_bar()
            .template(&self.style_template)
            .unwrap_or_else(|e| {
                log::warn!("invalid progress template '{}': {}", self.style_template, e);
                ProgressStyle::default_bar()
            })
            .progress_chars("█▓▒░ ")
    }
}

impl ProgressSink for TaskProgressBar {
    fn start(&mut self, total: u64) {
        let bar = ProgressBar::new(total);
        if self.enabled {
            bar.set_style(self.style());
            bar.set_message(self.description.clone());
            bar.enable_steady_tick(Duration::from_millis(100));
        } else {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        self.bar = Some(bar);
    }

    fn advance(&mut self, delta: u64) {
        if delta == 0 {
            return;
        }
        if let Some(ref bar) = self.bar {
            bar.inc(delta);
        }
    }

    fn finish(&mut self) {
        if let Some(ref bar) = self.bar {
            if !bar.is_finished() {
                bar.finish_with_message(format!("{} done", self.description));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_bar_tracks_position() {
        let mut bar = TaskProgressBar::hidden("tasks");
        bar.start(5);
        bar.advance(2);
        bar.advance(0);
        bar.advance(3);
        assert_eq!(bar.position(), 5);
        assert!(!bar.is_finished());

        bar.finish();
        assert!(bar.is_finished());
        assert_eq!(bar.position(), 5);
    }
}
