mod args;
mod download;
mod params;
mod plan;
mod resolved_command;
mod signals;

pub use args::{Args, Command, ConfigOverrides, parse_args};
pub use download::{download_with_shutdown, run_download};
pub use params::{DownloadParams, PlanParams};
pub use plan::{PlannedItem, plan_downloads, run_plan};
pub use resolved_command::{ResolvedCommand, resolve_command};
pub use signals::listen_for_shutdown_signals;
