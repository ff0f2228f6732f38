pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod source;

pub use config::{Config, DownloaderConfig};
pub use error::ImgBatchError;
