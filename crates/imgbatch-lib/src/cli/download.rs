use crate::cli::params::DownloadParams;
use crate::cli::signals::listen_for_shutdown_signals;
use crate::download::{
    Dispatcher, HttpTransport, LocalStorage, RunSummary, ShutdownController, Storage,
};
use crate::error::ImgBatchError;
use std::sync::Arc;

pub async fn run_download(params: DownloadParams) -> Result<RunSummary, ImgBatchError> {
    let shutdown = ShutdownController::new();
    let listener = listen_for_shutdown_signals(shutdown.clone());
    let result = download_with_shutdown(params, shutdown).await;
    listener.abort();
    result
}

/// Same as [`run_download`] but driven by a caller-owned shutdown handle
/// instead of process signals.
pub async fn download_with_shutdown(
    params: DownloadParams,
    shutdown: ShutdownController,
) -> Result<RunSummary, ImgBatchError> {
    let DownloadParams {
        config,
        urls,
        request_timeout,
    } = params;

    let storage = Arc::new(LocalStorage::new());
    storage
        .ensure_directory(&config.download_directory)
        .await
        .map_err(|e| ImgBatchError::DownloadDirectoryCreation {
            path: config.download_directory.clone(),
            reason: e.to_string(),
        })?;

    let transport = Arc::new(HttpTransport::new(request_timeout)?);

    tracing::info!(
        "Downloading {} images into {} in batches of {}",
        urls.len(),
        config.download_directory.display(),
        config.batch_size
    );

    let mut dispatcher = Dispatcher::new(config, transport, storage, shutdown);
    Ok(dispatcher.run(&urls).await)
}
