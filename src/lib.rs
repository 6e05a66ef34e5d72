pub mod batch;
pub mod border;
pub mod config;
pub mod errors;
pub mod imageops_ai;
pub mod logger;
pub mod model;
pub mod remote;
pub mod reporter;
pub mod traits;

pub mod mocks;

pub use batch::{BatchRunner, BatchSummary, Outcome, MASCOT_IMAGES};
pub use border::BorderFloodRemover;
pub use config::{Backend, Config};
pub use errors::{CutoutError, Result};
pub use model::Model;
pub use remote::RemoveBgClient;
pub use reporter::{BatchEvent, ConsoleReporter, Reporter, SilentReporter};
pub use traits::*;

/// Builds the remover selected by `config.backend`.
///
/// Everything that can fail before the first image (loading the ONNX model,
/// a missing API key) fails here, so the batch only starts with a usable
/// remover.
pub fn remover_from_config(config: &Config) -> Result<Box<dyn BackgroundRemover>> {
    config.validate()?;

    let remover: Box<dyn BackgroundRemover> = match config.backend {
        Backend::Border => Box::new(BorderFloodRemover::new(config.tolerance)),
        Backend::Onnx => {
            let model_path = config
                .model_path
                .as_deref()
                .ok_or_else(|| CutoutError::configuration("the onnx backend requires --model-path"))?;
            Box::new(Model::new(model_path, config.num_threads, config.device_id)?)
        }
        Backend::RemoveBg => {
            let api_key = config.api_key.as_deref().unwrap_or_default().trim();
            Box::new(
                RemoveBgClient::new(&config.endpoint, api_key)?
                    .with_request_delay(config.request_delay()),
            )
        }
    };
    Ok(remover)
}
