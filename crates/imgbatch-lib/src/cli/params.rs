use crate::config::DownloaderConfig;
use crate::download::ImageUrl;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DownloadParams {
    pub config: Arc<DownloaderConfig>,
    pub urls: Vec<ImageUrl>,
    pub request_timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct PlanParams {
    pub config: Arc<DownloaderConfig>,
    pub urls: Vec<ImageUrl>,
    pub request_timeout: Option<Duration>,
}
