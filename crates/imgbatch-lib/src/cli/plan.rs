use crate::cli::params::PlanParams;
use crate::config::DownloaderConfig;
use crate::download::{
    Decision, HttpTransport, ImageUrl, LocalStorage, Storage, Transport, evaluate_policy,
    partition,
};
use crate::error::ImgBatchError;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedItem {
    pub batch_index: usize,
    pub url: ImageUrl,
    pub target: Option<PathBuf>,
    /// `None` when no file name could be derived from the URL.
    pub decision: Option<Decision>,
}

/// Evaluate the download policy for every URL without writing anything.
pub async fn run_plan(params: PlanParams) -> Result<Vec<PlannedItem>, ImgBatchError> {
    let transport = HttpTransport::new(params.request_timeout)?;
    let plan = plan_downloads(&params.config, &params.urls, &transport, &LocalStorage::new()).await;

    let downloads = plan
        .iter()
        .filter(|item| matches!(item.decision, Some(Decision::Download)))
        .count();
    let replacements = plan
        .iter()
        .filter(|item| matches!(item.decision, Some(Decision::Replace)))
        .count();
    tracing::info!(
        "Plan: {} to download, {} to replace, {} to skip",
        downloads,
        replacements,
        plan.len() - downloads - replacements
    );

    Ok(plan)
}

pub async fn plan_downloads<T, S>(
    config: &DownloaderConfig,
    urls: &[ImageUrl],
    transport: &T,
    storage: &S,
) -> Vec<PlannedItem>
where
    T: Transport + ?Sized,
    S: Storage + ?Sized,
{
    let mut plan = Vec::with_capacity(urls.len());
    for batch in partition(urls, config.batch_size) {
        for url in batch.urls {
            let target = url.target_path(&config.download_directory);
            let decision = match &target {
                Some(target) => Some(evaluate_policy(url, target, config, transport, storage).await),
                None => None,
            };

            match &decision {
                Some(Decision::Download) => {
                    tracing::info!(batch = batch.index + 1, url = %url, "Would download")
                }
                Some(Decision::Replace) => {
                    tracing::info!(batch = batch.index + 1, url = %url, "Would replace")
                }
                Some(Decision::Skip(reason)) => {
                    tracing::info!(batch = batch.index + 1, url = %url, %reason, "Would skip")
                }
                None => {
                    tracing::warn!(batch = batch.index + 1, url = %url, "No file name in URL")
                }
            }

            plan.push(PlannedItem {
                batch_index: batch.index,
                url: url.clone(),
                target,
                decision,
            });
        }
    }
    plan
}
