mod loader;
mod model;

pub use loader::{load_config, load_config_with_env};
pub use model::{Config, DownloaderConfig, MaxImageSize};
