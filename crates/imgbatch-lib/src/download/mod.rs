mod dispatcher;
mod partition;
mod policy;
mod shutdown;
mod storage;
mod transport;
mod types;
mod wait;

#[cfg(test)]
pub(crate) mod test_support;

pub use dispatcher::Dispatcher;
pub use partition::{Batch, partition};
pub use policy::{Decision, SizeLimit, evaluate_policy};
pub use shutdown::{ShutdownController, ShutdownState};
pub use storage::{LocalStorage, Storage, TEMP_SUFFIX, TransferError, temp_path};
pub use transport::{ByteStream, HttpTransport, Transport, TransportError};
pub use types::{
    BatchProgress, ImageUrl, ItemReport, Outcome, RunSummary, SkipReason, TaskId, TransferKind,
};
pub use wait::{WaitRange, WaitTimeGenerator};
