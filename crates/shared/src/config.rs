//! Application configuration management.
//!
//! This is the raw, on-disk schema. Discriminators (`type`, `provider`,
//! `filename-strategy`) stay as strings here; `depot-core` turns them into
//! closed enums when it builds the typed storage model.

use serde::{Deserialize, Serialize};

/// Prefix for environment variable overrides (`DEPOT__UPLOAD__LOCAL__PATH`).
pub const ENV_PREFIX: &str = "DEPOT";

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Active storage backend.
    pub upload: UploadProviderConfig,
    /// Shared upload policy.
    #[serde(rename = "upload-settings", default)]
    pub upload_settings: UploadSettingsConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// The `upload` section: a discriminator plus one payload per backend kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadProviderConfig {
    /// Backend type: `local`, `oss` or `minio`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Local filesystem payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<LocalConfig>,
    /// Cloud object storage payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oss: Option<OssConfig>,
    /// MinIO payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minio: Option<MinioConfig>,
}

/// Local filesystem storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LocalConfig {
    /// Target directory. A leading `~/` is expanded to the home directory.
    pub path: String,
    /// Public URL prefix for stored files.
    #[serde(default)]
    pub url_prefix: String,
}

/// Cloud object storage with a nested provider discriminator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OssConfig {
    /// Provider: `aliyun`, `tencent`, `huawei`, `aws` or `qcloud`.
    pub provider: String,
    /// Aliyun OSS payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliyun: Option<AliyunOssConfig>,
    /// Tencent COS payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tencent: Option<TencentCosConfig>,
    /// Huawei OBS payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub huawei: Option<HuaweiObsConfig>,
    /// AWS S3 payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsS3Config>,
    /// Generic COS-compatible payload addressed by endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qcloud: Option<QCloudCosConfig>,
}

/// Aliyun OSS.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AliyunOssConfig {
    /// Endpoint, e.g. `oss-cn-hangzhou.aliyuncs.com`.
    #[serde(default)]
    pub endpoint: String,
    /// Access key ID.
    #[serde(default)]
    pub access_key_id: String,
    /// Access key secret.
    #[serde(default)]
    pub access_key_secret: String,
    /// Bucket name.
    #[serde(default)]
    pub bucket: String,
    /// Public domain override.
    #[serde(default)]
    pub domain: String,
    /// Key prefix.
    #[serde(default)]
    pub path_prefix: String,
    /// Use HTTPS for generated URLs.
    #[serde(default)]
    pub use_ssl: bool,
}

/// Tencent COS.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TencentCosConfig {
    /// Region, e.g. `ap-guangzhou`.
    #[serde(default)]
    pub region: String,
    /// Secret ID.
    #[serde(default)]
    pub secret_id: String,
    /// Secret key.
    #[serde(default)]
    pub secret_key: String,
    /// Bucket name (including the APPID suffix).
    #[serde(default)]
    pub bucket: String,
    /// Public domain override.
    #[serde(default)]
    pub domain: String,
    /// Key prefix.
    #[serde(default)]
    pub path_prefix: String,
    /// Use HTTPS.
    #[serde(default)]
    pub use_ssl: bool,
}

/// Huawei OBS.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HuaweiObsConfig {
    /// Endpoint, e.g. `obs.cn-north-4.myhuaweicloud.com`.
    #[serde(default)]
    pub endpoint: String,
    /// Access key ID.
    #[serde(default)]
    pub access_key_id: String,
    /// Secret access key.
    #[serde(default)]
    pub secret_access_key: String,
    /// Bucket name.
    #[serde(default)]
    pub bucket: String,
    /// Region.
    #[serde(default)]
    pub region: String,
    /// Public domain override.
    #[serde(default)]
    pub domain: String,
    /// Key prefix.
    #[serde(default)]
    pub path_prefix: String,
    /// Use HTTPS.
    #[serde(default)]
    pub use_ssl: bool,
}

/// AWS S3.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AwsS3Config {
    /// Region, e.g. `us-east-1`.
    #[serde(default)]
    pub region: String,
    /// Access key ID.
    #[serde(default)]
    pub access_key_id: String,
    /// Secret access key.
    #[serde(default)]
    pub secret_access_key: String,
    /// Bucket name.
    #[serde(default)]
    pub bucket: String,
    /// Custom endpoint; switches URLs to path style.
    #[serde(default)]
    pub endpoint: String,
    /// Public domain override.
    #[serde(default)]
    pub domain: String,
    /// Key prefix.
    #[serde(default)]
    pub path_prefix: String,
    /// Use HTTPS.
    #[serde(default)]
    pub use_ssl: bool,
}

/// COS-compatible storage reached through an explicit endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct QCloudCosConfig {
    /// Region.
    #[serde(default)]
    pub region: String,
    /// Access key ID.
    #[serde(default)]
    pub access_key_id: String,
    /// Secret access key.
    #[serde(default)]
    pub secret_access_key: String,
    /// Bucket name.
    #[serde(default)]
    pub bucket: String,
    /// Bucket endpoint.
    #[serde(default)]
    pub endpoint: String,
    /// Public domain override.
    #[serde(default)]
    pub domain: String,
    /// Key prefix.
    #[serde(default)]
    pub path_prefix: String,
    /// Use HTTPS.
    #[serde(default)]
    pub use_ssl: bool,
}

/// MinIO or any self-hosted S3-compatible server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MinioConfig {
    /// Endpoint `host:port`.
    #[serde(default)]
    pub endpoint: String,
    /// Access key.
    #[serde(default)]
    pub access_key: String,
    /// Secret key.
    #[serde(default)]
    pub secret_key: String,
    /// Bucket name.
    #[serde(default)]
    pub bucket: String,
    /// Use HTTPS.
    #[serde(default)]
    pub use_ssl: bool,
    /// Public domain override.
    #[serde(default)]
    pub domain: String,
    /// Key prefix.
    #[serde(default)]
    pub path_prefix: String,
    /// Region.
    #[serde(default)]
    pub region: String,
}

/// The `upload-settings` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UploadSettingsConfig {
    /// Maximum file size in megabytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Allowed extensions (`.jpg`); empty means unrestricted.
    #[serde(default)]
    pub allowed_extensions: Vec<String>,
    /// `original`, `uuid` or `timestamp`.
    #[serde(default = "default_filename_strategy")]
    pub filename_strategy: String,
    /// Prefix generated names with the original stem.
    #[serde(default)]
    pub keep_original_name: bool,
}

impl Default for UploadSettingsConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            allowed_extensions: Vec::new(),
            filename_strategy: default_filename_strategy(),
            keep_original_name: false,
        }
    }
}

fn default_max_file_size() -> u64 {
    100 // MB
}

fn default_filename_strategy() -> String {
    "uuid".to_string()
}

impl AppConfig {
    /// Loads configuration from a YAML file, then applies `DEPOT__*` environment overrides.
    ///
    /// Override keys are kebab-cased, so `DEPOT__UPLOAD_SETTINGS__MAX_FILE_SIZE`
    /// sets `upload-settings.max-file-size`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or does not match the schema.
    pub fn load(path: &str) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::new(path, config::FileFormat::Yaml))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .convert_case(config::Case::Kebab)
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Parses configuration from an in-memory YAML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not match the schema.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const LOCAL_YAML: &str = r"
upload:
  type: local
  local:
    path: ./uploads
    url-prefix: http://localhost:8080/files
upload-settings:
  max-file-size: 10
  allowed-extensions: ['.jpg', '.PNG']
  filename-strategy: original
  keep-original-name: true
";

    #[test]
    fn test_parse_local_config() {
        let config = AppConfig::from_yaml_str(LOCAL_YAML).expect("should parse");
        assert_eq!(config.upload.kind, "local");
        let local = config.upload.local.expect("local payload");
        assert_eq!(local.path, "./uploads");
        assert_eq!(local.url_prefix, "http://localhost:8080/files");
        assert_eq!(config.upload_settings.max_file_size, 10);
        assert_eq!(config.upload_settings.allowed_extensions, vec![".jpg", ".PNG"]);
        assert_eq!(config.upload_settings.filename_strategy, "original");
        assert!(config.upload_settings.keep_original_name);
    }

    #[test]
    fn test_server_and_settings_defaults() {
        let config = AppConfig::from_yaml_str("upload:\n  type: local\n").expect("should parse");
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.upload_settings, UploadSettingsConfig::default());
        assert_eq!(config.upload_settings.max_file_size, 100);
        assert_eq!(config.upload_settings.filename_strategy, "uuid");
        assert!(config.upload.local.is_none());
    }

    #[test]
    fn test_parse_oss_provider_block() {
        let yaml = r"
upload:
  type: oss
  oss:
    provider: aws
    aws:
      region: us-east-1
      access-key-id: AKIA
      secret-access-key: secret
      bucket: media
      use-ssl: true
";
        let config = AppConfig::from_yaml_str(yaml).expect("should parse");
        let oss = config.upload.oss.expect("oss payload");
        assert_eq!(oss.provider, "aws");
        assert!(oss.aliyun.is_none());
        let aws = oss.aws.expect("aws payload");
        assert_eq!(aws.region, "us-east-1");
        assert_eq!(aws.access_key_id, "AKIA");
        assert_eq!(aws.bucket, "media");
        assert!(aws.use_ssl);
        assert!(aws.endpoint.is_empty());
    }

    #[test]
    fn test_parse_minio_config() {
        let yaml = r"
upload:
  type: minio
  minio:
    endpoint: localhost:9000
    access-key: minioadmin
    secret-key: minioadmin
    bucket: uploads
    use-ssl: false
    path-prefix: images
";
        let config = AppConfig::from_yaml_str(yaml).expect("should parse");
        let minio = config.upload.minio.expect("minio payload");
        assert_eq!(minio.endpoint, "localhost:9000");
        assert_eq!(minio.path_prefix, "images");
        assert!(!minio.use_ssl);
    }

    #[test]
    fn test_missing_upload_section_is_an_error() {
        assert!(AppConfig::from_yaml_str("server:\n  port: 9000\n").is_err());
    }

    #[test]
    fn test_load_from_file_with_env_override() {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .expect("temp file");
        file.write_all(LOCAL_YAML.as_bytes()).expect("write yaml");
        let path = file.path().to_str().expect("utf-8 path").to_string();

        temp_env::with_var("DEPOT__SERVER__PORT", Some("9191"), || {
            let config = AppConfig::load(&path).expect("should load");
            assert_eq!(config.server.port, 9191);
            assert_eq!(config.upload.kind, "local");
        });
    }

    #[test]
    fn test_env_override_reaches_hyphenated_keys() {
        let yaml = r"
upload:
  type: oss
  oss:
    provider: aliyun
    aliyun:
      endpoint: oss-cn-hangzhou.aliyuncs.com
      access-key-id: from-file
      access-key-secret: from-file
      bucket: media
  local:
    path: ./uploads
upload-settings:
  max-file-size: 10
";
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .expect("temp file");
        file.write_all(yaml.as_bytes()).expect("write yaml");
        let path = file.path().to_str().expect("utf-8 path").to_string();

        temp_env::with_vars(
            [
                ("DEPOT__UPLOAD_SETTINGS__MAX_FILE_SIZE", Some("5")),
                ("DEPOT__UPLOAD__LOCAL__URL_PREFIX", Some("http://cdn")),
                ("DEPOT__UPLOAD__OSS__ALIYUN__ACCESS_KEY_SECRET", Some("from-env")),
            ],
            || {
                let config = AppConfig::load(&path).expect("should load");
                assert_eq!(config.upload_settings.max_file_size, 5);
                let local = config.upload.local.expect("local payload");
                assert_eq!(local.url_prefix, "http://cdn");
                let aliyun = config
                    .upload
                    .oss
                    .and_then(|oss| oss.aliyun)
                    .expect("aliyun payload");
                assert_eq!(aliyun.access_key_secret, "from-env");
                assert_eq!(aliyun.access_key_id, "from-file");
            },
        );
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(AppConfig::load("/definitely/not/here.yaml").is_err());
    }
}
