//! Terminal progress and confirmation for plan execution

use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use reconcile::{ApplyResult, ConfirmCallback, ProgressCallback};

const TEMPLATE: &str = "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}";

/// Create a progress bar for `len` steps
pub fn bar(len: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template(TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-");
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}

/// Result symbol, as printed next to each instance
pub fn symbol(result: &ApplyResult) -> String {
    match result {
        ApplyResult::NoChange => "○".dimmed().to_string(),
        ApplyResult::Created | ApplyResult::Modified | ApplyResult::Replaced | ApplyResult::Removed => {
            "✓".green().to_string()
        }
        ApplyResult::Failed { .. } => "✗".red().to_string(),
        ApplyResult::Skipped { .. } => "⊘".yellow().to_string(),
    }
}

/// Progress bar over the instances of one batch
///
/// Failures are printed above the bar as they arrive.
pub struct BarProgress {
    bar: Option<ProgressBar>,
    quiet: bool,
}

impl BarProgress {
    pub fn new(quiet: bool) -> Self {
        Self { bar: None, quiet }
    }
}

impl ProgressCallback for BarProgress {
    fn on_batch_start(&mut self, count: usize) {
        self.bar = Some(if self.quiet {
            ProgressBar::hidden()
        } else {
            bar(count as u64, "Applying")
        });
    }

    fn on_resource_start(&mut self, address: &str, _description: &str) {
        if let Some(pb) = &self.bar {
            pb.set_message(address.to_string());
        }
    }

    fn on_resource_complete(&mut self, address: &str, result: &ApplyResult) {
        let Some(pb) = &self.bar else {
            return;
        };
        if let ApplyResult::Failed { error } = result {
            pb.println(format!("  {} {address}: {error}", symbol(result)));
        }
        pb.set_message(format!("{} {address}", symbol(result)));
        pb.inc(1);
    }

    fn on_batch_complete(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }
}

/// Interactive confirmation; `--yes` skips the prompt
pub struct PromptConfirm {
    pub assume_yes: bool,
}

impl ConfirmCallback for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }
        let confirmed = Confirm::new().with_prompt(prompt).default(false).interact()?;
        Ok(confirmed)
    }
}
