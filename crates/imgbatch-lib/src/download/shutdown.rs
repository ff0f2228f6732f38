//! Cooperative shutdown.
//!
//! A request stops the dispatcher from admitting further batches. The batch
//! already running is drained, never aborted.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ShutdownState {
    Running,
    ShutdownRequested,
    Draining,
    Stopped,
}

impl fmt::Display for ShutdownState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Running => "running",
            Self::ShutdownRequested => "shutdown requested",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Shared handle to the shutdown state machine. Clones observe and drive the
/// same state, which only ever moves forward.
#[derive(Clone, Debug)]
pub struct ShutdownController {
    state: Arc<watch::Sender<ShutdownState>>,
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownController {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ShutdownState::Running);
        Self {
            state: Arc::new(state),
        }
    }

    pub fn state(&self) -> ShutdownState {
        *self.state.borrow()
    }

    /// Ask the dispatcher to stop after the batch in flight. Returns `false`
    /// if shutdown was already underway.
    pub fn request(&self) -> bool {
        self.advance(ShutdownState::ShutdownRequested)
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.state() >= ShutdownState::ShutdownRequested
    }

    pub(crate) fn begin_drain(&self) -> bool {
        self.advance(ShutdownState::Draining)
    }

    pub(crate) fn stop(&self) -> bool {
        self.advance(ShutdownState::Stopped)
    }

    /// Resolves once shutdown has been requested (or anything later).
    pub async fn requested(&self) {
        self.wait_until(ShutdownState::ShutdownRequested).await;
    }

    pub async fn stopped(&self) {
        self.wait_until(ShutdownState::Stopped).await;
    }

    async fn wait_until(&self, target: ShutdownState) {
        let mut receiver = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = receiver.wait_for(|state| *state >= target).await;
    }

    fn advance(&self, next: ShutdownState) -> bool {
        let moved = self.state.send_if_modified(|current| {
            if next > *current {
                *current = next;
                true
            } else {
                false
            }
        });
        if moved {
            tracing::debug!(state = %next, "Shutdown state changed");
        }
        moved
    }
}
