use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber;

/// Values given on the command line that override the configuration file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub image_url_file: Option<PathBuf>,
    pub download_directory: Option<PathBuf>,
    pub batch_size: Option<i64>,
    pub wait_seed: Option<u64>,
}

#[derive(Debug, Clone)]
pub enum Command {
    Download {
        config_path: String,
        overrides: ConfigOverrides,
    },
    Plan {
        config_path: String,
        overrides: ConfigOverrides,
    },
}

pub struct Args {
    pub command: Command,
    pub log_level: Level,
}

#[derive(Debug, Parser)]
#[command(
    name = "imgbatch",
    version,
    about = "Download a list of image URLs in rate-limited, bounded-concurrency batches"
)]
struct Cli {
    #[arg(
        short = 'v',
        long = "verbose",
        help = "Sets the level of verbosity",
        action = ArgAction::Count,
        global = true
    )]
    verbose: u8,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, clap::Args)]
struct SharedArgs {
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        help = "Sets a custom config file",
        default_value = "config.yaml"
    )]
    config: String,

    #[arg(
        short = 'u',
        long = "url-file",
        value_name = "FILE",
        help = "Overrides image_url_file from the config"
    )]
    url_file: Option<PathBuf>,

    #[arg(
        short = 'o',
        long = "download-dir",
        value_name = "DIR",
        help = "Overrides download_directory from the config"
    )]
    download_dir: Option<PathBuf>,

    #[arg(
        short = 'b',
        long = "batch-size",
        value_name = "N",
        help = "Overrides batch_size from the config",
        allow_negative_numbers = true
    )]
    batch_size: Option<i64>,

    #[arg(
        long = "seed",
        value_name = "N",
        help = "Seeds the inter-batch wait generator for reproducible pauses"
    )]
    seed: Option<u64>,
}

impl SharedArgs {
    fn into_parts(self) -> (String, ConfigOverrides) {
        (
            self.config,
            ConfigOverrides {
                image_url_file: self.url_file,
                download_directory: self.download_dir,
                batch_size: self.batch_size,
                wait_seed: self.seed,
            },
        )
    }
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Download every image in the URL list, batch by batch
    Download {
        #[command(flatten)]
        shared: SharedArgs,
    },

    /// Show what would happen to each URL without writing anything
    Plan {
        #[command(flatten)]
        shared: SharedArgs,
    },
}

pub fn parse_args() -> Args {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let mut env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();
    if let Ok(directive) = "hyper_util=warn".parse() {
        env_filter = env_filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_env_filter(env_filter)
        .init();

    let command = match cli.command {
        CliCommand::Download { shared } => {
            let (config_path, overrides) = shared.into_parts();
            Command::Download {
                config_path,
                overrides,
            }
        }
        CliCommand::Plan { shared } => {
            let (config_path, overrides) = shared.into_parts();
            Command::Plan {
                config_path,
                overrides,
            }
        }
    };

    Args { command, log_level }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_download_overrides_are_parsed() {
        let cli = Cli::try_parse_from([
            "imgbatch",
            "-v",
            "download",
            "-c",
            "my.yaml",
            "--batch-size",
            "7",
            "--download-dir",
            "out",
            "--seed",
            "99",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        let CliCommand::Download { shared } = cli.command else {
            panic!("expected download command");
        };
        let (config_path, overrides) = shared.into_parts();
        assert_eq!(config_path, "my.yaml");
        assert_eq!(overrides.batch_size, Some(7));
        assert_eq!(overrides.download_directory, Some(PathBuf::from("out")));
        assert_eq!(overrides.wait_seed, Some(99));
        assert_eq!(overrides.image_url_file, None);
    }

    #[test]
    fn test_config_path_defaults_to_config_yaml() {
        let cli = Cli::try_parse_from(["imgbatch", "plan"]).unwrap();
        let CliCommand::Plan { shared } = cli.command else {
            panic!("expected plan command");
        };
        assert_eq!(shared.config, "config.yaml");
    }
}
