//! CLI command implementations

mod batch;
mod shell;
mod single;

use std::path::PathBuf;

use anyhow::{Context as _, Result, bail};

use depot_core::storage::{OssProvider, StorageClient, StorageType};
use depot_shared::AppConfig;

pub use batch::BatchCommand;
pub use shell::shell;
pub use single::{delete, upload, url};

/// Options shared by every subcommand.
pub struct Context {
    config_path: PathBuf,
    provider: Option<String>,
}

impl Context {
    pub fn new(config_path: PathBuf, provider: Option<String>) -> Self {
        Self {
            config_path,
            provider,
        }
    }

    /// Load the config file and apply the `--provider` override.
    pub fn load_config(&self) -> Result<AppConfig> {
        let path = self.config_path.to_string_lossy();
        let config = AppConfig::load(&path)
            .with_context(|| format!("failed to load configuration from {path}"))?;

        match &self.provider {
            Some(provider) => with_provider(&config, provider),
            None => Ok(config),
        }
    }

    /// Build the storage client for the loaded config.
    pub fn client(&self) -> Result<StorageClient> {
        let config = self.load_config()?;
        StorageClient::from_app_config(&config).context("failed to create uploader")
    }
}

/// Copy of `config` with a different cloud provider selected.
///
/// The original config is left untouched; the caller builds a new client
/// from the returned copy.
fn with_provider(config: &AppConfig, provider: &str) -> Result<AppConfig> {
    let provider: OssProvider = provider.parse()?;

    if config.upload.kind.parse::<StorageType>()? != StorageType::Oss {
        bail!(
            "--provider only applies to `upload.type: oss`, config uses '{}'",
            config.upload.kind
        );
    }

    let mut updated = config.clone();
    let oss = updated
        .upload
        .oss
        .as_mut()
        .context("upload.oss section is missing")?;
    oss.provider = provider.as_str().to_string();
    Ok(updated)
}
