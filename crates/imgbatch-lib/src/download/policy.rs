use super::storage::Storage;
use super::transport::Transport;
use super::types::{ImageUrl, SkipReason, TransferKind};
use crate::config::DownloaderConfig;
use std::path::Path;

/// Upper bound on the remote size of an image that will be downloaded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SizeLimit {
    #[default]
    Unbounded,
    Bytes(u64),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Download,
    Replace,
    Skip(SkipReason),
}

impl Decision {
    /// The transfer to perform, or why the URL is skipped.
    pub fn into_transfer_kind(self) -> Result<TransferKind, SkipReason> {
        match self {
            Self::Download => Ok(TransferKind::Download),
            Self::Replace => Ok(TransferKind::Replace),
            Self::Skip(reason) => Err(reason),
        }
    }
}

/// Decide what to do with one URL. The first matching rule wins:
///
/// 1. `skip_if_exists` and the target exists: skip.
/// 2. `replace_on_size_change` and the target exists: replace when the
///    probed remote size differs from the local one, otherwise skip. A size
///    that cannot be determined on either side is a skip.
/// 3. A size limit is set: download unless the remote size exceeds it or
///    cannot be probed.
/// 4. Download.
///
/// Only reads: at most one `exists`, one local `size` and one remote probe.
pub async fn evaluate_policy<T, S>(
    url: &ImageUrl,
    target: &Path,
    config: &DownloaderConfig,
    transport: &T,
    storage: &S,
) -> Decision
where
    T: Transport + ?Sized,
    S: Storage + ?Sized,
{
    let exists = if config.skip_if_exists || config.replace_on_size_change {
        storage.exists(target).await
    } else {
        false
    };

    if config.skip_if_exists && exists {
        return Decision::Skip(SkipReason::AlreadyExists);
    }

    if config.replace_on_size_change && exists {
        let local_size = match storage.size(target).await {
            Ok(size) => size,
            Err(e) => {
                tracing::debug!(target = %target.display(), error = %e, "Could not read local size");
                return Decision::Skip(SkipReason::SizeIndeterminate);
            }
        };

        return match transport.probe_size(url).await {
            Ok(remote_size) if remote_size == local_size => {
                Decision::Skip(SkipReason::SizeUnchanged { size: local_size })
            }
            Ok(_) => Decision::Replace,
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Size probe failed");
                Decision::Skip(SkipReason::SizeIndeterminate)
            }
        };
    }

    if let SizeLimit::Bytes(limit) = config.max_size {
        return match transport.probe_size(url).await {
            Ok(size) if size > limit => Decision::Skip(SkipReason::TooLarge { size, limit }),
            Ok(_) => Decision::Download,
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Size probe failed");
                Decision::Skip(SkipReason::SizeUnknown)
            }
        };
    }

    Decision::Download
}
