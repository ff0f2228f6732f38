use super::transport::{ByteStream, TransportError};
use async_trait::async_trait;
use futures::StreamExt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Suffix of the staging file bodies are received into.
pub const TEMP_SUFFIX: &str = ".part";

#[derive(Error, Debug)]
pub enum TransferError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to {action} {}: {source}", path.display())]
    Storage {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TransferError {
    fn storage(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Storage {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Local side of a transfer.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    async fn exists(&self, path: &Path) -> bool;

    async fn size(&self, path: &Path) -> std::io::Result<u64>;

    /// Write `body` to `path`, replacing any file already there once the
    /// whole body arrived. Returns the byte count.
    async fn write_new(&self, path: &Path, body: ByteStream) -> Result<u64, TransferError>;

    /// Receive `body` completely into a temporary sibling of `path`, then
    /// rename it into place. `path` is untouched unless the whole body arrived.
    async fn atomic_replace(&self, path: &Path, body: ByteStream) -> Result<u64, TransferError>;

    async fn ensure_directory(&self, path: &Path) -> std::io::Result<()>;
}

/// Path of the staging file: `cat.jpg` → `cat.jpg.part`.
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut path = final_path.as_os_str().to_owned();
    path.push(TEMP_SUFFIX);
    PathBuf::from(path)
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LocalStorage;

impl LocalStorage {
    pub fn new() -> Self {
        Self
    }
}

async fn stream_to_file(path: &Path, mut body: ByteStream, sync: bool) -> Result<u64, TransferError> {
    let file = tokio::fs::File::create(path)
        .await
        .map_err(|e| TransferError::storage("create", path, e))?;
    let mut writer = BufWriter::new(file);

    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| TransferError::storage("write", path, e))?;
        written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| TransferError::storage("flush", path, e))?;
    if sync {
        writer
            .into_inner()
            .sync_all()
            .await
            .map_err(|e| TransferError::storage("sync", path, e))?;
    }
    Ok(written)
}

/// Receive the whole body into the staging sibling of `path`, then rename it
/// over `path`. On any failure only the staging file is removed.
async fn stage_and_rename(path: &Path, body: ByteStream, sync: bool) -> Result<u64, TransferError> {
    let staging = temp_path(path);
    let result = match stream_to_file(&staging, body, sync).await {
        Ok(written) => tokio::fs::rename(&staging, path)
            .await
            .map(|()| written)
            .map_err(|e| TransferError::storage("rename into", path, e)),
        Err(e) => Err(e),
    };

    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(&staging).await {
            tracing::debug!(path = %staging.display(), error = %e, "Could not remove staging file");
        }
    }
    result
}

#[async_trait]
impl Storage for LocalStorage {
    async fn exists(&self, path: &Path) -> bool {
        // Anything other than "not found" counts as present, so an unreadable
        // file is never silently overwritten.
        match tokio::fs::metadata(path).await {
            Ok(_) => true,
            Err(e) => e.kind() != ErrorKind::NotFound,
        }
    }

    async fn size(&self, path: &Path) -> std::io::Result<u64> {
        Ok(tokio::fs::metadata(path).await?.len())
    }

    async fn write_new(&self, path: &Path, body: ByteStream) -> Result<u64, TransferError> {
        stage_and_rename(path, body, false).await
    }

    async fn atomic_replace(&self, path: &Path, body: ByteStream) -> Result<u64, TransferError> {
        stage_and_rename(path, body, true).await
    }

    async fn ensure_directory(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::create_dir_all(path).await
    }
}
