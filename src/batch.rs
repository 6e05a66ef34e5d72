use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageFormat, ImageReader};
use tracing::{debug, info};

use crate::config::Config;
use crate::errors::{CutoutError, Result};
use crate::reporter::{BatchEvent, Reporter, SilentReporter};
use crate::traits::BackgroundRemover;

/// The mascot images processed by every run, in processing order.
pub const MASCOT_IMAGES: [&str; 9] = [
    "robot_mascot_waving_hello.png",
    "robot_mascot_thinking_pose.png",
    "robot_mascot_holding_brake_pads.png",
    "robot_mascot_holding_oil_filter.png",
    "robot_mascot_holding_spark_plugs.png",
    "robot_mascot_holding_car_battery.png",
    "robot_mascot_holding_tire.png",
    "robot_mascot_holding_brake_rotor.png",
    "gauge-eyed_junkyard_robot_mascot.png",
];

/// Result of one entry of the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Processed,
    Failed(String),
    Skipped,
}

#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub output_dir: PathBuf,
    /// Per-file outcomes in processing order.
    pub outcomes: Vec<(String, Outcome)>,
}

impl BatchSummary {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            ..Self::default()
        }
    }

    fn record(&mut self, name: &str, outcome: Outcome) {
        match outcome {
            Outcome::Processed => self.processed += 1,
            Outcome::Failed(_) => self.failed += 1,
            Outcome::Skipped => self.skipped += 1,
        }
        self.outcomes.push((name.to_string(), outcome));
    }

    pub const fn total(&self) -> usize {
        self.processed + self.failed + self.skipped
    }

    pub fn outcome(&self, name: &str) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, outcome)| outcome)
    }
}

/// Runs the fixed mascot list through a background remover, one image at a
/// time.
pub struct BatchRunner<R: BackgroundRemover> {
    remover: R,
    input_dir: PathBuf,
    output_dir: PathBuf,
}

impl<R: BackgroundRemover> BatchRunner<R> {
    pub fn new(remover: R, input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            remover,
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn from_config(remover: R, config: &Config) -> Self {
        Self::new(remover, &config.input_dir, &config.output_dir)
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn run(&self) -> Result<BatchSummary> {
        self.run_with(&SilentReporter)
    }

    /// Processes every listed image. Only failing to create the output
    /// directory is an error; per-image problems end up in the summary.
    pub fn run_with(&self, reporter: &dyn Reporter) -> Result<BatchSummary> {
        fs::create_dir_all(&self.output_dir).map_err(|e| CutoutError::FileSystem {
            path: self.output_dir.clone(),
            operation: "create output directory".to_string(),
            source: e,
        })?;

        info!(
            input_dir = %self.input_dir.display(),
            output_dir = %self.output_dir.display(),
            backend = self.remover.name(),
            "starting batch"
        );
        reporter.on_event(BatchEvent::Started {
            total: MASCOT_IMAGES.len(),
            output_dir: &self.output_dir,
        });

        let mut summary = BatchSummary::new(self.output_dir.clone());

        for name in MASCOT_IMAGES {
            let input_path = self.input_dir.join(name);
            let output_path = self.output_dir.join(name);

            let outcome = if !input_path.exists() {
                debug!(path = %input_path.display(), "input not found, skipping");
                reporter.on_event(BatchEvent::Skipped { name });
                Outcome::Skipped
            } else {
                reporter.on_event(BatchEvent::Processing { name });
                match self.process_image(&input_path, &output_path) {
                    Ok(()) => {
                        debug!(path = %output_path.display(), "saved cutout");
                        reporter.on_event(BatchEvent::Saved { name });
                        Outcome::Processed
                    }
                    Err(e) => {
                        let message = e.detailed();
                        debug!(path = %input_path.display(), error = %message, "processing failed");
                        reporter.on_event(BatchEvent::Failed {
                            name,
                            message: &message,
                        });
                        Outcome::Failed(message)
                    }
                }
            };
            summary.record(name, outcome);
        }

        info!(
            processed = summary.processed,
            failed = summary.failed,
            skipped = summary.skipped,
            "batch finished"
        );
        reporter.on_event(BatchEvent::Finished { summary: &summary });

        Ok(summary)
    }

    /// Load, remove the background and save as PNG with alpha.
    pub fn process_image(&self, input_path: &Path, output_path: &Path) -> Result<()> {
        let load_error = |e: image::ImageError| CutoutError::ImageProcessing {
            path: input_path.display().to_string(),
            operation: "load image".to_string(),
            source: Box::new(e),
        };
        // sniff the content, the extension is not trusted
        let img = ImageReader::open(input_path)
            .map_err(|e| load_error(e.into()))?
            .with_guessed_format()
            .map_err(|e| load_error(e.into()))?
            .decode()
            .map_err(load_error)?;

        let cutout = self
            .remover
            .remove_background(&img)
            .map_err(|e| CutoutError::ImageProcessing {
                path: input_path.display().to_string(),
                operation: format!("remove background ({})", self.remover.name()),
                source: Box::new(e),
            })?;

        cutout
            .to_rgba8()
            .save_with_format(output_path, ImageFormat::Png)
            .map_err(|e| CutoutError::ImageProcessing {
                path: output_path.display().to_string(),
                operation: "save image".to_string(),
                source: Box::new(e),
            })?;

        Ok(())
    }
}
