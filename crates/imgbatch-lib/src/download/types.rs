use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// A remote image identifier, exactly as it appeared in the URL list.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageUrl(Arc<str>);

impl ImageUrl {
    pub fn new(url: impl Into<Arc<str>>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The file name the image is stored under: the last non-empty path
    /// segment, without query or fragment. `None` when the URL has no usable
    /// file name.
    pub fn basename(&self) -> Option<String> {
        let candidate = match Url::parse(&self.0) {
            Ok(url) => url
                .path_segments()
                .and_then(|mut segments| segments.rfind(|segment| !segment.is_empty()))
                .map(str::to_string),
            Err(_) => self
                .0
                .split(['?', '#'])
                .next()
                .and_then(|path| path.rsplit('/').find(|segment| !segment.is_empty()))
                .map(str::to_string),
        };

        candidate.filter(|name| name != "." && name != ".." && !name.contains('\\'))
    }

    pub fn target_path(&self, download_directory: &Path) -> Option<PathBuf> {
        self.basename().map(|name| download_directory.join(name))
    }
}

impl fmt::Display for ImageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageUrl {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for ImageUrl {
    fn from(url: String) -> Self {
        Self::new(url)
    }
}

/// Correlation id assigned to each download task by the dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferKind {
    /// Write straight to the target path.
    Download,
    /// Stage to a temporary file, then rename over the existing target.
    Replace,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyExists,
    SizeUnchanged { size: u64 },
    /// The remote size could not be compared against the local file.
    SizeIndeterminate,
    TooLarge { size: u64, limit: u64 },
    /// A size limit is configured but the remote size could not be probed.
    SizeUnknown,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyExists => write!(f, "already exists"),
            Self::SizeUnchanged { size } => write!(f, "unchanged size of {size} bytes"),
            Self::SizeIndeterminate => write!(f, "remote size could not be compared"),
            Self::TooLarge { size, limit } => {
                write!(f, "exceeded maximum size ({size} > {limit} bytes)")
            }
            Self::SizeUnknown => write!(f, "remote size unknown"),
        }
    }
}

/// Terminal state of one URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Succeeded { kind: TransferKind, bytes: u64 },
    Skipped(SkipReason),
    Failed { reason: String },
}

#[derive(Clone, Debug)]
pub struct ItemReport {
    /// `None` for items that never became a task (skips and unusable URLs).
    pub task_id: Option<TaskId>,
    pub url: ImageUrl,
    pub outcome: Outcome,
}

/// Cumulative counters published after every batch barrier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchProgress {
    /// Zero-based index of the batch that just finished; `None` before the first.
    pub batch_index: Option<usize>,
    pub batch_count: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub remaining: usize,
}

#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    pub total: usize,
    pub batch_count: usize,
    pub batches_completed: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Set when a shutdown request kept some batches from running.
    pub interrupted: bool,
    pub items: Vec<ItemReport>,
}

impl RunSummary {
    pub fn new(total: usize, batch_count: usize) -> Self {
        Self {
            total,
            batch_count,
            ..Self::default()
        }
    }

    pub fn remaining(&self) -> usize {
        self.total - self.succeeded - self.skipped - self.failed
    }

    pub(crate) fn record_batch(&mut self, reports: Vec<ItemReport>) {
        for report in &reports {
            match report.outcome {
                Outcome::Succeeded { .. } => self.succeeded += 1,
                Outcome::Skipped(_) => self.skipped += 1,
                Outcome::Failed { .. } => self.failed += 1,
            }
        }
        self.items.extend(reports);
        self.batches_completed += 1;
    }

    pub fn progress(&self) -> BatchProgress {
        BatchProgress {
            batch_index: self.batches_completed.checked_sub(1),
            batch_count: self.batch_count,
            succeeded: self.succeeded,
            skipped: self.skipped,
            failed: self.failed,
            remaining: self.remaining(),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} skipped, {} failed, {} remaining ({} of {} batches)",
            self.succeeded,
            self.skipped,
            self.failed,
            self.remaining(),
            self.batches_completed,
            self.batch_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basename_of_plain_url() {
        let url = ImageUrl::from("https://example.com/images/cat.jpg");
        assert_eq!(url.basename().as_deref(), Some("cat.jpg"));
    }

    #[test]
    fn test_basename_ignores_query_fragment_and_trailing_slash() {
        assert_eq!(
            ImageUrl::from("https://example.com/a/dog.png?size=large#top")
                .basename()
                .as_deref(),
            Some("dog.png")
        );
        assert_eq!(
            ImageUrl::from("https://example.com/gallery/album/")
                .basename()
                .as_deref(),
            Some("album")
        );
    }

    #[test]
    fn test_basename_without_path_is_none() {
        assert_eq!(ImageUrl::from("https://example.com").basename(), None);
        assert_eq!(ImageUrl::from("https://example.com/").basename(), None);
        assert_eq!(ImageUrl::from("").basename(), None);
    }

    #[test]
    fn test_basename_of_unparseable_identifier() {
        assert_eq!(
            ImageUrl::from("images/bird.gif?x=1").basename().as_deref(),
            Some("bird.gif")
        );
        assert_eq!(ImageUrl::from("..").basename(), None);
    }

    #[test]
    fn test_basename_is_stable() {
        let url = ImageUrl::from("https://example.com/x/y/z.webp");
        assert_eq!(url.basename(), url.basename());
    }

    #[test]
    fn test_target_path_joins_download_directory() {
        let url = ImageUrl::from("https://example.com/pics/a.jpg");
        assert_eq!(
            url.target_path(Path::new("/data/images")),
            Some(PathBuf::from("/data/images/a.jpg"))
        );
    }

    #[test]
    fn test_summary_counts_outcomes() {
        let mut summary = RunSummary::new(4, 2);
        summary.record_batch(vec![
            ItemReport {
                task_id: Some(TaskId(1)),
                url: "a".into(),
                outcome: Outcome::Succeeded {
                    kind: TransferKind::Download,
                    bytes: 3,
                },
            },
            ItemReport {
                task_id: None,
                url: "b".into(),
                outcome: Outcome::Skipped(SkipReason::AlreadyExists),
            },
            ItemReport {
                task_id: Some(TaskId(2)),
                url: "c".into(),
                outcome: Outcome::Failed {
                    reason: "boom".to_string(),
                },
            },
        ]);

        let progress = summary.progress();
        assert_eq!(progress.batch_index, Some(0));
        assert_eq!(progress.succeeded, 1);
        assert_eq!(progress.skipped, 1);
        assert_eq!(progress.failed, 1);
        assert_eq!(progress.remaining, 1);
        assert_eq!(
            summary.to_string(),
            "1 succeeded, 1 skipped, 1 failed, 1 remaining (1 of 2 batches)"
        );
    }
}
