use crate::cli::args::{Command, ConfigOverrides};
use crate::cli::params::{DownloadParams, PlanParams};
use crate::config::{Config, load_config};
use crate::error::ImgBatchError;
use crate::source::read_image_urls;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum ResolvedCommand {
    Download(DownloadParams),
    Plan(PlanParams),
}

fn apply_overrides(
    mut config: Config,
    overrides: ConfigOverrides,
) -> Result<Config, ImgBatchError> {
    if let Some(image_url_file) = overrides.image_url_file {
        config.image_url_file = image_url_file;
    }
    if let Some(download_directory) = overrides.download_directory {
        config.download_directory = download_directory;
    }
    if let Some(batch_size) = overrides.batch_size {
        if batch_size < 1 {
            return Err(ImgBatchError::CliArgumentValidation {
                details: format!("--batch-size must be at least 1, got {batch_size}"),
            });
        }
        config.batch_size = batch_size;
    }
    if overrides.wait_seed.is_some() {
        config.wait_seed = overrides.wait_seed;
    }
    Ok(config)
}

/// Everything that can fail before the first batch: loading and validating
/// the configuration and reading the URL list.
pub fn resolve_command(command: Command) -> Result<ResolvedCommand, ImgBatchError> {
    match command {
        Command::Download {
            config_path,
            overrides,
        } => {
            let (config, urls, request_timeout) = load_inputs(&config_path, overrides)?;
            Ok(ResolvedCommand::Download(DownloadParams {
                config,
                urls,
                request_timeout,
            }))
        }
        Command::Plan {
            config_path,
            overrides,
        } => {
            let (config, urls, request_timeout) = load_inputs(&config_path, overrides)?;
            Ok(ResolvedCommand::Plan(PlanParams {
                config,
                urls,
                request_timeout,
            }))
        }
    }
}

type Inputs = (
    Arc<crate::config::DownloaderConfig>,
    Vec<crate::download::ImageUrl>,
    Option<std::time::Duration>,
);

fn load_inputs(config_path: &str, overrides: ConfigOverrides) -> Result<Inputs, ImgBatchError> {
    tracing::info!("Loading configuration from {}", config_path);
    let app_config = apply_overrides(load_config(config_path)?, overrides)?;
    app_config.log_summary();

    let config = app_config.validate()?;
    let request_timeout = app_config.request_timeout()?;

    tracing::info!(
        "Reading image URLs from {}",
        app_config.image_url_file.display()
    );
    let urls = read_image_urls(&app_config.image_url_file)?;

    Ok((Arc::new(config), urls, request_timeout))
}
