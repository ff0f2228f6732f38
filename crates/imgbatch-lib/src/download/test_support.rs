//! In-memory transport and storage doubles for dispatcher and policy tests.

use super::storage::{Storage, TransferError};
use super::transport::{ByteStream, Transport, TransportError};
use super::types::{ImageUrl, TransferKind};
use super::{SizeLimit, WaitRange};
use crate::config::DownloaderConfig;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream};
use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;

pub fn test_config() -> DownloaderConfig {
    DownloaderConfig {
        download_directory: PathBuf::from("/images"),
        batch_size: NonZeroUsize::new(3).unwrap(),
        wait: WaitRange::new(Duration::ZERO, Duration::ZERO).unwrap(),
        max_size: SizeLimit::Unbounded,
        replace_on_size_change: false,
        skip_if_exists: true,
        wait_seed: Some(1),
    }
}

#[derive(Clone, Default)]
struct MockImage {
    body: Vec<u8>,
    fail_probe: bool,
    fail_status: Option<u16>,
    panic_on_fetch: bool,
}

/// Serves registered images from memory and records how it was used.
#[derive(Default)]
pub struct MockTransport {
    images: HashMap<String, MockImage>,
    fetch_delay: Duration,
    valve: Option<Arc<Semaphore>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    probes: AtomicUsize,
    fetched: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, url: &str, body: &[u8]) -> Self {
        self.images.entry(url.to_string()).or_default().body = body.to_vec();
        self
    }

    pub fn with_failing_probe(mut self, url: &str) -> Self {
        self.images.entry(url.to_string()).or_default().fail_probe = true;
        self
    }

    pub fn with_failing_fetch(mut self, url: &str, status: u16) -> Self {
        self.images.entry(url.to_string()).or_default().fail_status = Some(status);
        self
    }

    pub fn with_panicking_fetch(mut self, url: &str) -> Self {
        self.images.entry(url.to_string()).or_default().panic_on_fetch = true;
        self
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    /// Every fetch takes one permit from `valve` before completing; tests add
    /// permits to let transfers finish.
    pub fn with_valve(mut self, valve: Arc<Semaphore>) -> Self {
        self.valve = Some(valve);
        self
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    fn image(&self, url: &ImageUrl) -> Option<&MockImage> {
        self.images.get(url.as_str())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch(&self, url: &ImageUrl) -> Result<ByteStream, TransportError> {
        self.fetched.lock().unwrap().push(url.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        if let Some(valve) = &self.valve {
            valve.acquire().await.unwrap().forget();
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let image = self.image(url).ok_or_else(|| TransportError::Status {
            url: url.to_string(),
            status: 404,
        })?;
        if image.panic_on_fetch {
            panic!("transport exploded for {url}");
        }
        if let Some(status) = image.fail_status {
            return Err(TransportError::Status {
                url: url.to_string(),
                status,
            });
        }

        let chunks: Vec<Result<Bytes, TransportError>> = image
            .body
            .chunks(4)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();
        Ok(stream::iter(chunks).boxed())
    }

    async fn probe_size(&self, url: &ImageUrl) -> Result<u64, TransportError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        match self.image(url) {
            Some(image) if !image.fail_probe => Ok(image.body.len() as u64),
            _ => Err(TransportError::MissingContentLength {
                url: url.to_string(),
            }),
        }
    }
}

/// A filesystem in a hash map. Writes only land once the whole body arrived.
#[derive(Default)]
pub struct MemoryStorage {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
    writes: Mutex<Vec<(PathBuf, TransferKind)>>,
    read_only: HashSet<PathBuf>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<PathBuf>, content: &[u8]) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(path.into(), content.to_vec());
        self
    }

    pub fn with_read_only(mut self, path: impl Into<PathBuf>) -> Self {
        self.read_only.insert(path.into());
        self
    }

    pub fn file(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path.as_ref()).cloned()
    }

    pub fn writes(&self) -> Vec<(PathBuf, TransferKind)> {
        self.writes.lock().unwrap().clone()
    }

    async fn store(
        &self,
        path: &Path,
        mut body: ByteStream,
        kind: TransferKind,
    ) -> Result<u64, TransferError> {
        let mut content = Vec::new();
        while let Some(chunk) = body.next().await {
            content.extend_from_slice(&chunk?);
        }
        if self.read_only.contains(path) {
            return Err(TransferError::Storage {
                action: "create",
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            });
        }

        let written = content.len() as u64;
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), content);
        self.writes.lock().unwrap().push((path.to_path_buf(), kind));
        Ok(written)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    async fn size(&self, path: &Path) -> std::io::Result<u64> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .map(|content| content.len() as u64)
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
    }

    async fn write_new(&self, path: &Path, body: ByteStream) -> Result<u64, TransferError> {
        self.store(path, body, TransferKind::Download).await
    }

    async fn atomic_replace(&self, path: &Path, body: ByteStream) -> Result<u64, TransferError> {
        self.store(path, body, TransferKind::Replace).await
    }

    async fn ensure_directory(&self, _path: &Path) -> std::io::Result<()> {
        Ok(())
    }
}
