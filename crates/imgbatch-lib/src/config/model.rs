use crate::download::{SizeLimit, WaitRange};
use crate::error::ImgBatchError;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

const BYTES_PER_MEGABYTE: u64 = 1024 * 1024;

fn default_batch_size() -> i64 {
    10
}

fn default_skip_if_file_exists() -> bool {
    true
}

/// Configuration file contents, as written by the user.
///
/// Nothing here is validated yet; [`Config::validate`] turns it into the
/// immutable [`DownloaderConfig`] the dispatcher runs with.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub image_url_file: PathBuf,
    pub download_directory: PathBuf,
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
    #[serde(default)]
    pub min_wait_time: f64,
    #[serde(default)]
    pub max_wait_time: f64,
    #[serde(default)]
    pub max_image_size_mb: MaxImageSize,
    #[serde(default)]
    pub replace_downloaded_file_size: bool,
    #[serde(default = "default_skip_if_file_exists")]
    pub skip_if_file_exists: bool,
    /// Seed for the inter-batch wait generator. Unset means seeded from entropy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_seed: Option<u64>,
    /// Per-request HTTP timeout in seconds. Unset means no timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<f64>,
}

/// `max_image_size_mb` accepts either a number of megabytes or one of the
/// sentinels `UNBOUNDED` / `MAX`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "MaxImageSizeRepr", into = "MaxImageSizeRepr")]
pub enum MaxImageSize {
    #[default]
    Unbounded,
    Megabytes(u64),
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
enum MaxImageSizeRepr {
    Megabytes(u64),
    Text(String),
}

impl TryFrom<MaxImageSizeRepr> for MaxImageSize {
    type Error = String;

    fn try_from(repr: MaxImageSizeRepr) -> Result<Self, Self::Error> {
        match repr {
            MaxImageSizeRepr::Megabytes(mb) => Ok(Self::Megabytes(mb)),
            MaxImageSizeRepr::Text(text) => text.parse(),
        }
    }
}

impl From<MaxImageSize> for MaxImageSizeRepr {
    fn from(value: MaxImageSize) -> Self {
        match value {
            MaxImageSize::Unbounded => Self::Text("UNBOUNDED".to_string()),
            MaxImageSize::Megabytes(mb) => Self::Megabytes(mb),
        }
    }
}

impl std::str::FromStr for MaxImageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("UNBOUNDED") || trimmed.eq_ignore_ascii_case("MAX") {
            return Ok(Self::Unbounded);
        }
        trimmed.parse::<u64>().map(Self::Megabytes).map_err(|_| {
            format!("max_image_size_mb must be UNBOUNDED, MAX or a non-negative integer, got {s:?}")
        })
    }
}

impl std::fmt::Display for MaxImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unbounded => write!(f, "UNBOUNDED"),
            Self::Megabytes(mb) => write!(f, "{mb} MB"),
        }
    }
}

impl MaxImageSize {
    pub fn to_size_limit(self) -> Result<SizeLimit, ImgBatchError> {
        match self {
            Self::Unbounded => Ok(SizeLimit::Unbounded),
            Self::Megabytes(mb) => mb
                .checked_mul(BYTES_PER_MEGABYTE)
                .map(SizeLimit::Bytes)
                .ok_or_else(|| {
                    ImgBatchError::invalid_config(format!("max_image_size_mb {mb} is too large"))
                }),
        }
    }
}

/// Validated, immutable settings for one run of the dispatcher.
#[derive(Clone, Debug, PartialEq)]
pub struct DownloaderConfig {
    pub download_directory: PathBuf,
    pub batch_size: NonZeroUsize,
    pub wait: WaitRange,
    pub max_size: SizeLimit,
    pub replace_on_size_change: bool,
    pub skip_if_exists: bool,
    pub wait_seed: Option<u64>,
}

fn seconds(name: &str, value: f64) -> Result<Duration, ImgBatchError> {
    Duration::try_from_secs_f64(value).map_err(|_| {
        ImgBatchError::invalid_config(format!(
            "{name} must be a finite, non-negative number of seconds, got {value}"
        ))
    })
}

impl Config {
    pub fn validate(&self) -> Result<DownloaderConfig, ImgBatchError> {
        let batch_size = usize::try_from(self.batch_size)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or_else(|| {
                ImgBatchError::invalid_config(format!(
                    "batch_size must be at least 1, got {}",
                    self.batch_size
                ))
            })?;

        let min_wait = seconds("min_wait_time", self.min_wait_time)?;
        let max_wait = seconds("max_wait_time", self.max_wait_time)?;
        let wait = WaitRange::new(min_wait, max_wait).ok_or_else(|| {
            ImgBatchError::invalid_config(format!(
                "min_wait_time ({}) must not exceed max_wait_time ({})",
                self.min_wait_time, self.max_wait_time
            ))
        })?;

        if self.download_directory.as_os_str().is_empty() {
            return Err(ImgBatchError::invalid_config(
                "download_directory must not be empty",
            ));
        }

        Ok(DownloaderConfig {
            download_directory: self.download_directory.clone(),
            batch_size,
            wait,
            max_size: self.max_image_size_mb.to_size_limit()?,
            replace_on_size_change: self.replace_downloaded_file_size,
            skip_if_exists: self.skip_if_file_exists,
            wait_seed: self.wait_seed,
        })
    }

    pub fn request_timeout(&self) -> Result<Option<Duration>, ImgBatchError> {
        self.request_timeout
            .map(|secs| seconds("request_timeout", secs))
            .transpose()
    }

    pub fn log_summary(&self) {
        tracing::info!("Configuration:");
        tracing::info!("  - Image URL File: {}", self.image_url_file.display());
        tracing::info!("  - Download Directory: {}", self.download_directory.display());
        tracing::info!("  - Batch Size: {}", self.batch_size);
        tracing::info!("  - Min Wait Time: {:.2}", self.min_wait_time);
        tracing::info!("  - Max Wait Time: {:.2}", self.max_wait_time);
        tracing::info!("  - Max Image Size: {}", self.max_image_size_mb);
        tracing::info!(
            "  - Replace Downloaded File Size: {}",
            self.replace_downloaded_file_size
        );
        tracing::info!("  - Skip If File Exists: {}", self.skip_if_file_exists);
    }
}
