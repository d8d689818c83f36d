//! Terminal adapters for the engine's progress and confirmation callbacks.

use anyhow::{Context, Result};
use colored::Colorize;
use declarative::{ApplyResult, ConfirmCallback, ProgressCallback};
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar over a batch of tasks
#[derive(Default)]
pub struct BarProgress {
    bar: Option<ProgressBar>,
}

impl BarProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Status glyph for a finished task
pub fn result_symbol(result: &ApplyResult) -> String {
    match result {
        ApplyResult::NoChange => "○".dimmed().to_string(),
        ApplyResult::Created { .. } | ApplyResult::Updated { .. } | ApplyResult::Deleted => {
            "✓".green().to_string()
        }
        ApplyResult::Failed { .. } => "✗".red().to_string(),
        ApplyResult::Skipped { .. } => "⊘".yellow().to_string(),
    }
}

impl ProgressCallback for BarProgress {
    fn on_batch_start(&mut self, count: usize) {
        let bar = ProgressBar::new(count as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
        );
        self.bar = Some(bar);
    }

    fn on_task_start(&mut self, address: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(address.to_string());
        }
    }

    fn on_task_complete(&mut self, address: &str, result: &ApplyResult) {
        if let Some(bar) = &self.bar {
            bar.println(format!("  {} {address}", result_symbol(result)));
            bar.inc(1);
        }
    }

    fn on_batch_complete(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

/// Interactive yes/no prompt, defaulting to no
pub struct PromptConfirm;

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .context("Failed to read confirmation")
    }
}
