use anyhow::{Context, Result};
use tracing::info;

use mascot_cutout::{
    logger, remover_from_config, BackgroundRemover, BatchRunner, Config, ConsoleReporter,
};

fn main() -> Result<()> {
    let config = Config::new();
    logger::init_cli_logger(config.verbose);

    let remover = remover_from_config(&config).context("Failed to set up background remover")?;
    info!(backend = remover.name(), "remover ready");

    let runner = BatchRunner::from_config(remover, &config);
    runner
        .run_with(&ConsoleReporter::new())
        .with_context(|| {
            format!(
                "Failed to prepare output directory: {}",
                config.output_dir.display()
            )
        })?;

    Ok(())
}
