//! Console progress for a batch run.

use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};

use crate::batch::BatchSummary;

const RULE: &str = "==================================================";

/// Events emitted while the runner walks the image list.
#[derive(Debug, Clone, Copy)]
pub enum BatchEvent<'a> {
    Started { total: usize, output_dir: &'a Path },
    Processing { name: &'a str },
    Saved { name: &'a str },
    Skipped { name: &'a str },
    Failed { name: &'a str, message: &'a str },
    Finished { summary: &'a BatchSummary },
}

impl BatchEvent<'_> {
    /// Human-readable lines for the event.
    pub fn lines(&self) -> Vec<String> {
        match self {
            BatchEvent::Started { .. } => vec![
                RULE.to_string(),
                "Removing backgrounds from mascot images...".to_string(),
                RULE.to_string(),
                String::new(),
            ],
            BatchEvent::Processing { name } => vec![format!("Processing: {name}...")],
            BatchEvent::Saved { name } => vec![format!("  ✓ Saved: {name}")],
            BatchEvent::Skipped { name } => vec![format!("⚠ Skipping (not found): {name}")],
            BatchEvent::Failed { message, .. } => vec![format!("  ✗ Error: {message}")],
            BatchEvent::Finished { summary } => vec![
                String::new(),
                RULE.to_string(),
                format!(
                    "Done! Processed: {}, Failed: {}, Skipped: {}",
                    summary.processed, summary.failed, summary.skipped
                ),
                format!(
                    "Transparent images saved to: {}",
                    summary.output_dir.display()
                ),
                RULE.to_string(),
            ],
        }
    }
}

pub trait Reporter {
    fn on_event(&self, event: BatchEvent<'_>);
}

/// Discards every event.
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn on_event(&self, _event: BatchEvent<'_>) {}
}

/// Prints per-file lines and the summary to stdout, with a progress bar on
/// stderr while the batch runs.
pub struct ConsoleReporter {
    progress_bar: ProgressBar,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        let progress_bar = ProgressBar::new(0);
        progress_bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        Self { progress_bar }
    }

    fn print(&self, lines: &[String]) {
        self.progress_bar.suspend(|| {
            for line in lines {
                println!("{line}");
            }
        });
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for ConsoleReporter {
    fn on_event(&self, event: BatchEvent<'_>) {
        match event {
            BatchEvent::Started { total, .. } => {
                self.print(&event.lines());
                self.progress_bar.set_length(total as u64);
            }
            BatchEvent::Processing { .. } => self.print(&event.lines()),
            BatchEvent::Saved { .. } | BatchEvent::Skipped { .. } | BatchEvent::Failed { .. } => {
                self.print(&event.lines());
                self.progress_bar.inc(1);
            }
            BatchEvent::Finished { .. } => {
                self.progress_bar.finish_and_clear();
                self.print(&event.lines());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::Outcome;

    #[test]
    fn test_file_lines() {
        assert_eq!(
            BatchEvent::Processing { name: "a.png" }.lines(),
            vec!["Processing: a.png..."]
        );
        assert_eq!(
            BatchEvent::Skipped { name: "a.png" }.lines(),
            vec!["⚠ Skipping (not found): a.png"]
        );
        assert_eq!(
            BatchEvent::Failed {
                name: "a.png",
                message: "decode failed"
            }
            .lines(),
            vec!["  ✗ Error: decode failed"]
        );
    }

    #[test]
    fn test_summary_block() {
        let mut summary = BatchSummary::new("out/dir".into());
        summary.processed = 7;
        summary.failed = 1;
        summary.skipped = 1;
        summary
            .outcomes
            .push(("a.png".to_string(), Outcome::Processed));

        let lines = BatchEvent::Finished { summary: &summary }.lines();

        assert!(lines.contains(&"Done! Processed: 7, Failed: 1, Skipped: 1".to_string()));
        assert!(lines.contains(&"Transparent images saved to: out/dir".to_string()));
    }
}
