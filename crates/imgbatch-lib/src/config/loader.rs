use super::Config;
use crate::error::ImgBatchError;
use config::Config as ConfigBuilder;

/// Environment variables starting with this prefix override file values,
/// e.g. `IMGBATCH_BATCH_SIZE=20`.
const ENV_PREFIX: &str = "IMGBATCH";

/// Keys of [`Config`] that may be set from the environment.
const CONFIG_KEYS: &[&str] = &[
    "image_url_file",
    "download_directory",
    "batch_size",
    "min_wait_time",
    "max_wait_time",
    "max_image_size_mb",
    "replace_downloaded_file_size",
    "skip_if_file_exists",
    "wait_seed",
    "request_timeout",
];

pub fn load_config(config_path: &str) -> Result<Config, ImgBatchError> {
    load_config_with_env(config_path, std::env::vars())
}

/// Load `config_path` and overlay the `IMGBATCH_*` entries of `env`.
///
/// Prefixed variables that do not name a configuration key are ignored with a
/// warning rather than rejected by `deny_unknown_fields`.
pub fn load_config_with_env<I>(config_path: &str, env: I) -> Result<Config, ImgBatchError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let config_builder = ConfigBuilder::builder()
        .add_source(config::File::with_name(config_path))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(Some(known_env_overrides(env))),
        )
        .build()?;

    config_builder.try_deserialize().map_err(Into::into)
}

fn known_env_overrides<I>(env: I) -> config::Map<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let prefix = format!("{ENV_PREFIX}_");
    env.into_iter()
        .filter(|(name, _)| {
            let Some(key) = name.strip_prefix(&prefix) else {
                return false;
            };
            let known = CONFIG_KEYS.contains(&key.to_ascii_lowercase().as_str());
            if !known {
                tracing::warn!("Ignoring unknown configuration variable {}", name);
            }
            known
        })
        .collect()
}
