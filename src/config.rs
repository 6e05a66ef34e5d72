use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crate::errors::{CutoutError, Result};

pub const DEFAULT_INPUT_DIR: &str = "attached_assets/generated_images";
pub const DEFAULT_OUTPUT_DIR: &str = "attached_assets/mascot_transparent";
pub const DEFAULT_REMOVE_BG_ENDPOINT: &str = "https://api.remove.bg/v1.0/removebg";

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// Flood fill from the image border, no model required
    Border,
    /// ONNX salient object model (U2-Net and friends)
    Onnx,
    /// remove.bg HTTP API
    RemoveBg,
}

#[derive(Parser, Clone, Debug)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[arg(short, long, default_value = DEFAULT_INPUT_DIR)]
    pub input_dir: PathBuf,

    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    #[arg(short, long, value_enum, default_value_t = Backend::Border)]
    pub backend: Backend,

    /// Maximum per-channel distance from the background colour (border backend)
    #[arg(short, long, default_value_t = 24)]
    pub tolerance: u8,

    #[arg(short, long)]
    pub model_path: Option<PathBuf>,

    #[arg(short, long, default_value_t = 0)]
    pub device_id: i32,

    #[arg(
        short, long, default_value_t = thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    )]
    pub num_threads: usize,

    #[arg(long, env = "REMOVE_BG_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, default_value = DEFAULT_REMOVE_BG_ENDPOINT)]
    pub endpoint: String,

    #[arg(long, default_value_t = 500)]
    pub request_delay_ms: u64,

    #[arg(short, long)]
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: DEFAULT_INPUT_DIR.into(),
            output_dir: DEFAULT_OUTPUT_DIR.into(),
            backend: Backend::Border,
            tolerance: 24,
            model_path: None,
            device_id: 0,
            num_threads: 1,
            api_key: None,
            endpoint: DEFAULT_REMOVE_BG_ENDPOINT.to_string(),
            request_delay_ms: 500,
            verbose: false,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::parse()
    }

    /// Checks the settings the selected backend depends on.
    pub fn validate(&self) -> Result<()> {
        match self.backend {
            Backend::Border => Ok(()),
            Backend::Onnx => match &self.model_path {
                None => Err(CutoutError::configuration(
                    "the onnx backend requires --model-path",
                )),
                Some(path) if !path.exists() => Err(CutoutError::configuration(format!(
                    "model path does not exist: {}",
                    path.display()
                ))),
                Some(_) => Ok(()),
            },
            Backend::RemoveBg => match self.api_key.as_deref().map(str::trim) {
                Some(key) if !key.is_empty() => Ok(()),
                _ => Err(CutoutError::configuration(
                    "the remove-bg backend requires --api-key or REMOVE_BG_API_KEY",
                )),
            },
        }
    }

    pub const fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}
