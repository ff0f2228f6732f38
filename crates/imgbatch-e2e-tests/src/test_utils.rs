use eyre::Result;
use imgbatch_lib::config::{Config, MaxImageSize};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("imgbatch_lib=debug,imgbatch_e2e_tests=debug")
        .with_test_writer()
        .try_init()
        .ok();
}

pub fn create_test_config(root: &Path) -> Config {
    Config {
        image_url_file: root.join("urls.txt"),
        download_directory: root.join("images"),
        batch_size: 2,
        min_wait_time: 0.0,
        max_wait_time: 0.05,
        max_image_size_mb: MaxImageSize::Unbounded,
        replace_downloaded_file_size: false,
        skip_if_file_exists: true,
        wait_seed: Some(7),
        request_timeout: Some(10.0),
    }
}

/// A temporary directory holding `config.json`, `urls.txt` and the
/// `images/` download directory.
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub config: Config,
}

impl TestEnvironment {
    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join("config.json")
    }

    pub fn download_directory(&self) -> &Path {
        &self.config.download_directory
    }

    pub fn image_path(&self, name: &str) -> PathBuf {
        self.config.download_directory.join(name)
    }

    pub fn write_existing_image(&self, name: &str, content: &[u8]) -> Result<()> {
        std::fs::create_dir_all(self.download_directory())?;
        std::fs::write(self.image_path(name), content)?;
        Ok(())
    }
}

pub fn setup_test_environment(
    urls: &[String],
    customize: impl FnOnce(&mut Config),
) -> Result<TestEnvironment> {
    let temp_dir = tempfile::tempdir()?;

    let mut config = create_test_config(temp_dir.path());
    customize(&mut config);

    std::fs::write(temp_dir.path().join("urls.txt"), urls.join("\n"))?;
    std::fs::write(
        temp_dir.path().join("config.json"),
        serde_json::to_string_pretty(&config)?,
    )?;

    Ok(TestEnvironment { temp_dir, config })
}

/// Serve `body` at `image_path` for both GET and HEAD.
pub async fn mount_image(server: &MockServer, image_path: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(image_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
    Mock::given(method("HEAD"))
        .and(path(image_path))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Length", body.len().to_string())
                .set_body_bytes(body.to_vec()),
        )
        .mount(server)
        .await;
}

pub async fn mount_status(server: &MockServer, image_path: &str, status: u16) {
    Mock::given(path(image_path))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

pub fn image_url(server: &MockServer, image_path: &str) -> String {
    format!("{}{}", server.uri(), image_path)
}
