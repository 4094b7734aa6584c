//! Client construction: one typed backend in, one ready client out.

use std::path::PathBuf;

use opendal::{Operator, services};
use tracing::info;

use depot_shared::AppConfig;

use super::client::{StorageClient, Transport};
use super::config::{BackendConfig, UploadSettings};
use super::error::ConfigError;
use super::url::{scheme, strip_scheme};

/// Build the client for `backend`.
///
/// The local backend gets its directory created here; remote backends get
/// their transport built once and reused for every call.
///
/// # Errors
///
/// Returns an error if a required field is missing, the local directory
/// cannot be created, or the transport cannot be initialised.
pub fn create_client(
    backend: BackendConfig,
    settings: UploadSettings,
) -> Result<StorageClient, ConfigError> {
    backend.validate()?;

    let transport = match &backend {
        BackendConfig::Local(local) => {
            let root = prepare_local_dir(&local.path)?;
            info!(path = %root.display(), "Local upload directory ready");
            Transport::Local {
                path: local.path.clone(),
            }
        }
        remote => Transport::Shared(create_operator(remote)?),
    };

    info!(
        backend = backend.name(),
        bucket = backend.bucket(),
        max_file_size_mb = settings.max_file_size_mb,
        "Storage client initialised"
    );

    Ok(StorageClient::new(backend, settings, transport))
}

impl StorageClient {
    /// Resolve the loaded configuration and build its client.
    ///
    /// # Errors
    ///
    /// Returns an error if the discriminators are unknown, the selected
    /// payload is missing, or the client cannot be built.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let backend = BackendConfig::try_from(&config.upload)?;
        let settings = UploadSettings::try_from(&config.upload_settings)?;
        create_client(backend, settings)
    }
}

/// Expand a leading `~/` and make the path absolute.
///
/// # Errors
///
/// Returns an error if the home directory is unknown or the current
/// directory cannot be read.
pub fn expand_local_path(path: &str) -> Result<PathBuf, ConfigError> {
    let expanded = match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .ok_or_else(|| ConfigError::HomeDirUnavailable(path.to_string()))?
            .join(rest),
        None if path == "~" => {
            dirs::home_dir().ok_or_else(|| ConfigError::HomeDirUnavailable(path.to_string()))?
        }
        None => PathBuf::from(path),
    };

    std::path::absolute(&expanded).map_err(|source| ConfigError::CreateDirectory {
        path: expanded,
        source,
    })
}

fn prepare_local_dir(path: &str) -> Result<PathBuf, ConfigError> {
    let root = expand_local_path(path)?;
    std::fs::create_dir_all(&root).map_err(|source| ConfigError::CreateDirectory {
        path: root.clone(),
        source,
    })?;
    Ok(root)
}

/// Filesystem operator rooted at the freshly expanded `path`.
pub(crate) fn local_operator(path: &str) -> Result<Operator, ConfigError> {
    let root = expand_local_path(path)?;
    let builder = services::Fs::default().root(&root.to_string_lossy());
    finish("local", builder)
}

fn create_operator(backend: &BackendConfig) -> Result<Operator, ConfigError> {
    match backend {
        BackendConfig::Local(local) => local_operator(&local.path),
        BackendConfig::Aliyun(c) => {
            let builder = services::Oss::default()
                .endpoint(&endpoint_url(&c.endpoint, &c.bucket, c.use_ssl))
                .bucket(&c.bucket)
                .access_key_id(&c.access_key_id)
                .access_key_secret(&c.access_key_secret);
            finish("aliyun", builder)
        }
        BackendConfig::Tencent(c) => {
            let endpoint = format!("{}://cos.{}.myqcloud.com", scheme(c.use_ssl), c.region);
            let builder = services::Cos::default()
                .endpoint(&endpoint)
                .bucket(&c.bucket)
                .secret_id(&c.secret_id)
                .secret_key(&c.secret_key);
            finish("tencent", builder)
        }
        BackendConfig::QCloud(c) => {
            let builder = services::Cos::default()
                .endpoint(&endpoint_url(&c.endpoint, &c.bucket, c.use_ssl))
                .bucket(&c.bucket)
                .secret_id(&c.access_key_id)
                .secret_key(&c.secret_access_key);
            finish("qcloud", builder)
        }
        BackendConfig::Huawei(c) => {
            let builder = services::Obs::default()
                .endpoint(&endpoint_url(&c.endpoint, &c.bucket, c.use_ssl))
                .bucket(&c.bucket)
                .access_key_id(&c.access_key_id)
                .secret_access_key(&c.secret_access_key);
            finish("huawei", builder)
        }
        BackendConfig::Aws(c) => {
            let mut builder = services::S3::default()
                .bucket(&c.bucket)
                .region(&c.region)
                .access_key_id(&c.access_key_id)
                .secret_access_key(&c.secret_access_key);
            if !c.endpoint.is_empty() {
                let endpoint = format!("{}://{}", scheme(c.use_ssl), strip_scheme(&c.endpoint));
                builder = builder.endpoint(&endpoint);
            }
            finish("aws", builder)
        }
        BackendConfig::Minio(c) => {
            let region = if c.region.is_empty() {
                "us-east-1"
            } else {
                c.region.as_str()
            };
            let endpoint = format!("{}://{}", scheme(c.use_ssl), strip_scheme(&c.endpoint));
            let builder = services::S3::default()
                .endpoint(&endpoint)
                .bucket(&c.bucket)
                .region(region)
                .access_key_id(&c.access_key)
                .secret_access_key(&c.secret_key);
            finish("minio", builder)
        }
    }
}

/// Endpoint with a scheme and without a virtual-host bucket label; the
/// transport adds the bucket itself.
fn endpoint_url(endpoint: &str, bucket: &str, use_ssl: bool) -> String {
    let host = strip_scheme(endpoint);
    let host = host
        .strip_prefix(bucket)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(host);
    format!("{}://{host}", scheme(use_ssl))
}

fn finish(backend: &'static str, builder: impl opendal::Builder) -> Result<Operator, ConfigError> {
    Ok(Operator::new(builder)
        .map_err(|source| ConfigError::Transport { backend, source })?
        .finish())
}
