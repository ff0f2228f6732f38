use super::partition::{Batch, partition};
use super::policy::evaluate_policy;
use super::shutdown::ShutdownController;
use super::storage::{Storage, TransferError};
use super::transport::Transport;
use super::types::{BatchProgress, ImageUrl, ItemReport, Outcome, RunSummary, TaskId, TransferKind};
use super::wait::WaitTimeGenerator;
use crate::config::DownloaderConfig;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Semaphore, watch};
use tracing::{Instrument, debug, error, info, info_span, warn};

/// One accepted URL, from policy acceptance until its outcome is recorded.
struct DownloadTask {
    id: TaskId,
    url: ImageUrl,
    target: PathBuf,
    kind: TransferKind,
}

impl DownloadTask {
    async fn run<T: Transport, S: Storage>(
        self,
        transport: Arc<T>,
        storage: Arc<S>,
        gate: Arc<Semaphore>,
    ) -> ItemReport {
        let outcome = match gate.acquire_owned().await {
            Ok(permit) => {
                let result = self.transfer(transport.as_ref(), storage.as_ref()).await;
                drop(permit);
                match result {
                    Ok(bytes) => {
                        match self.kind {
                            TransferKind::Download => info!(bytes, "Downloaded"),
                            TransferKind::Replace => info!(bytes, "Replaced"),
                        }
                        Outcome::Succeeded {
                            kind: self.kind,
                            bytes,
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "Download failed");
                        Outcome::Failed {
                            reason: err.to_string(),
                        }
                    }
                }
            }
            Err(_) => Outcome::Failed {
                reason: "concurrency gate closed".to_string(),
            },
        };

        ItemReport {
            task_id: Some(self.id),
            url: self.url,
            outcome,
        }
    }

    async fn transfer<T: Transport, S: Storage>(
        &self,
        transport: &T,
        storage: &S,
    ) -> Result<u64, TransferError> {
        debug!(url = %self.url, target = %self.target.display(), "Fetching");
        let body = transport.fetch(&self.url).await?;
        match self.kind {
            TransferKind::Download => storage.write_new(&self.target, body).await,
            TransferKind::Replace => storage.atomic_replace(&self.target, body).await,
        }
    }
}

/// Runs a URL list batch by batch.
///
/// Every accepted URL of a batch becomes its own task on the runtime, gated by
/// a semaphore sized to the batch size. The dispatcher waits for all of them
/// before pausing and moving on to the next batch. A shutdown request stops
/// admission of new batches; the batch in flight always runs to completion.
pub struct Dispatcher<T, S> {
    config: Arc<DownloaderConfig>,
    transport: Arc<T>,
    storage: Arc<S>,
    shutdown: ShutdownController,
    wait: WaitTimeGenerator,
    progress: watch::Sender<BatchProgress>,
    next_task_id: u64,
}

impl<T: Transport, S: Storage> Dispatcher<T, S> {
    pub fn new(
        config: Arc<DownloaderConfig>,
        transport: Arc<T>,
        storage: Arc<S>,
        shutdown: ShutdownController,
    ) -> Self {
        let wait = WaitTimeGenerator::new(config.wait, config.wait_seed);
        let (progress, _) = watch::channel(BatchProgress::default());
        Self {
            config,
            transport,
            storage,
            shutdown,
            wait,
            progress,
            next_task_id: 0,
        }
    }

    /// Counters published after every batch barrier.
    pub fn subscribe(&self) -> watch::Receiver<BatchProgress> {
        self.progress.subscribe()
    }

    pub fn shutdown_handle(&self) -> ShutdownController {
        self.shutdown.clone()
    }

    pub async fn run(&mut self, urls: &[ImageUrl]) -> RunSummary {
        let batches = partition(urls, self.config.batch_size);
        let gate = Arc::new(Semaphore::new(self.config.batch_size.get()));
        let mut summary = RunSummary::new(urls.len(), batches.len());
        self.progress.send_replace(summary.progress());

        info!(
            images = urls.len(),
            batches = batches.len(),
            "Downloading {} images...",
            urls.len()
        );

        for batch in &batches {
            if self.shutdown.is_shutdown_requested() {
                info!(batch = batch.index + 1, "Shutdown requested, not starting batch");
                break;
            }

            let reports = self.run_batch(batch, &gate).await;
            summary.record_batch(reports);

            let progress = summary.progress();
            info!(
                batch = batch.index + 1,
                batches = batches.len(),
                succeeded = progress.succeeded,
                skipped = progress.skipped,
                failed = progress.failed,
                "Batch processed. {} images remaining...",
                progress.remaining
            );
            self.progress.send_replace(progress);

            if batch.index + 1 == batches.len() || self.shutdown.is_shutdown_requested() {
                break;
            }

            let delay = self.wait.next_wait();
            debug!(?delay, "Waiting before next batch");
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown.requested() => {
                    info!("Shutdown requested during inter-batch wait");
                }
            }
        }

        summary.interrupted = summary.batches_completed < summary.batch_count;
        self.shutdown.stop();

        if summary.interrupted {
            info!(%summary, "Stopped before all batches ran");
        } else {
            info!(%summary, "All images processed");
        }
        summary
    }

    fn allocate_task_id(&mut self) -> TaskId {
        self.next_task_id += 1;
        TaskId(self.next_task_id)
    }

    async fn run_batch(&mut self, batch: &Batch<'_>, gate: &Arc<Semaphore>) -> Vec<ItemReport> {
        let mut reports = Vec::with_capacity(batch.len());
        let mut in_flight = FuturesUnordered::new();
        let mut targets = HashSet::new();

        for url in batch.urls {
            let Some(target) = url.target_path(&self.config.download_directory) else {
                warn!(url = %url, "Cannot derive a file name from URL");
                reports.push(ItemReport {
                    task_id: None,
                    url: url.clone(),
                    outcome: Outcome::Failed {
                        reason: "URL has no file name".to_string(),
                    },
                });
                continue;
            };

            let decision = evaluate_policy(
                url,
                &target,
                &self.config,
                self.transport.as_ref(),
                self.storage.as_ref(),
            )
            .await;

            let kind = match decision.into_transfer_kind() {
                Ok(kind) => kind,
                Err(reason) => {
                    info!(file = %target.display(), %reason, "Skipped");
                    reports.push(ItemReport {
                        task_id: None,
                        url: url.clone(),
                        outcome: Outcome::Skipped(reason),
                    });
                    continue;
                }
            };

            if !targets.insert(target.clone()) {
                warn!(
                    url = %url,
                    file = %target.display(),
                    "Another URL in this batch writes to the same file"
                );
            }

            let task = DownloadTask {
                id: self.allocate_task_id(),
                url: url.clone(),
                target,
                kind,
            };
            let span = info_span!(
                "task",
                id = %task.id,
                file = %task.target.file_name().unwrap_or_default().to_string_lossy()
            );
            let (task_id, task_url) = (task.id, task.url.clone());
            let handle = tokio::spawn(
                task.run(
                    Arc::clone(&self.transport),
                    Arc::clone(&self.storage),
                    Arc::clone(gate),
                )
                .instrument(span),
            );
            in_flight.push(async move { (task_id, task_url, handle.await) });
        }

        let mut draining = false;
        loop {
            let watch_shutdown = !draining && !in_flight.is_empty();
            let next = tokio::select! {
                next = in_flight.next() => next,
                () = self.shutdown.requested(), if watch_shutdown => {
                    draining = true;
                    self.shutdown.begin_drain();
                    info!(
                        in_flight = in_flight.len(),
                        "Interrupt received, draining in-flight downloads"
                    );
                    continue;
                }
            };

            let Some((task_id, url, joined)) = next else {
                break;
            };
            match joined {
                Ok(report) => reports.push(report),
                Err(err) => {
                    error!(task = %task_id, url = %url, error = %err, "Download task panicked");
                    reports.push(ItemReport {
                        task_id: Some(task_id),
                        url,
                        outcome: Outcome::Failed {
                            reason: format!("task panicked: {err}"),
                        },
                    });
                }
            }
        }

        reports
    }
}
