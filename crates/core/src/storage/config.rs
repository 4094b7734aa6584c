//! Storage configuration types.
//!
//! The raw schema from `depot-shared` carries string discriminators. This
//! module resolves them into closed enums once, at load time, so the rest of
//! the crate never dispatches on strings.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use depot_shared::config::{
    AliyunOssConfig, AwsS3Config, HuaweiObsConfig, LocalConfig, MinioConfig, QCloudCosConfig,
    TencentCosConfig, UploadProviderConfig, UploadSettingsConfig,
};

use super::error::ConfigError;

/// Top-level backend type (`upload.type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageType {
    /// Local filesystem.
    Local,
    /// Cloud object storage, refined by [`OssProvider`].
    Oss,
    /// MinIO / self-hosted S3.
    Minio,
}

impl FromStr for StorageType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "oss" => Ok(Self::Oss),
            "minio" => Ok(Self::Minio),
            other => Err(ConfigError::UnsupportedType(other.to_string())),
        }
    }
}

/// Cloud provider (`upload.oss.provider`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OssProvider {
    /// Aliyun OSS.
    Aliyun,
    /// Tencent COS.
    Tencent,
    /// Huawei OBS.
    Huawei,
    /// AWS S3.
    Aws,
    /// COS-compatible service reached by endpoint.
    QCloud,
}

impl OssProvider {
    /// All providers, in schema order.
    pub const ALL: [Self; 5] = [
        Self::Aliyun,
        Self::Tencent,
        Self::Huawei,
        Self::Aws,
        Self::QCloud,
    ];

    /// Schema name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Aliyun => "aliyun",
            Self::Tencent => "tencent",
            Self::Huawei => "huawei",
            Self::Aws => "aws",
            Self::QCloud => "qcloud",
        }
    }
}

impl FromStr for OssProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ConfigError::UnsupportedProvider(s.to_string()))
    }
}

impl fmt::Display for OssProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exactly one active storage backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    /// Local filesystem.
    Local(LocalConfig),
    /// Aliyun OSS.
    Aliyun(AliyunOssConfig),
    /// Tencent COS.
    Tencent(TencentCosConfig),
    /// Huawei OBS.
    Huawei(HuaweiObsConfig),
    /// AWS S3.
    Aws(AwsS3Config),
    /// COS-compatible endpoint.
    QCloud(QCloudCosConfig),
    /// MinIO.
    Minio(MinioConfig),
}

impl BackendConfig {
    /// Backend name used in logs and health output.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            Self::Aliyun(_) => "aliyun",
            Self::Tencent(_) => "tencent",
            Self::Huawei(_) => "huawei",
            Self::Aws(_) => "aws",
            Self::QCloud(_) => "qcloud",
            Self::Minio(_) => "minio",
        }
    }

    /// Bucket name, or the configured directory for the local backend.
    #[must_use]
    pub fn bucket(&self) -> &str {
        match self {
            Self::Local(c) => &c.path,
            Self::Aliyun(c) => &c.bucket,
            Self::Tencent(c) => &c.bucket,
            Self::Huawei(c) => &c.bucket,
            Self::Aws(c) => &c.bucket,
            Self::QCloud(c) => &c.bucket,
            Self::Minio(c) => &c.bucket,
        }
    }

    /// Key prefix prepended to every object name. Local storage has none.
    #[must_use]
    pub fn path_prefix(&self) -> &str {
        match self {
            Self::Local(_) => "",
            Self::Aliyun(c) => &c.path_prefix,
            Self::Tencent(c) => &c.path_prefix,
            Self::Huawei(c) => &c.path_prefix,
            Self::Aws(c) => &c.path_prefix,
            Self::QCloud(c) => &c.path_prefix,
            Self::Minio(c) => &c.path_prefix,
        }
    }

    /// Check that every field the backend needs to connect is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required: Vec<(&'static str, &str)> = match self {
            Self::Local(c) => vec![("path", c.path.as_str())],
            Self::Aliyun(c) => vec![
                ("endpoint", c.endpoint.as_str()),
                ("access-key-id", c.access_key_id.as_str()),
                ("access-key-secret", c.access_key_secret.as_str()),
                ("bucket", c.bucket.as_str()),
            ],
            Self::Tencent(c) => vec![
                ("region", c.region.as_str()),
                ("secret-id", c.secret_id.as_str()),
                ("secret-key", c.secret_key.as_str()),
                ("bucket", c.bucket.as_str()),
            ],
            Self::Huawei(c) => vec![
                ("endpoint", c.endpoint.as_str()),
                ("access-key-id", c.access_key_id.as_str()),
                ("secret-access-key", c.secret_access_key.as_str()),
                ("bucket", c.bucket.as_str()),
            ],
            Self::Aws(c) => vec![
                ("region", c.region.as_str()),
                ("access-key-id", c.access_key_id.as_str()),
                ("secret-access-key", c.secret_access_key.as_str()),
                ("bucket", c.bucket.as_str()),
            ],
            Self::QCloud(c) => vec![
                ("region", c.region.as_str()),
                ("access-key-id", c.access_key_id.as_str()),
                ("secret-access-key", c.secret_access_key.as_str()),
                ("bucket", c.bucket.as_str()),
                ("endpoint", c.endpoint.as_str()),
            ],
            Self::Minio(c) => vec![
                ("endpoint", c.endpoint.as_str()),
                ("access-key", c.access_key.as_str()),
                ("secret-key", c.secret_key.as_str()),
                ("bucket", c.bucket.as_str()),
            ],
        };

        match required.into_iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(ConfigError::missing_field(self.name(), field)),
            None => Ok(()),
        }
    }
}

impl TryFrom<&UploadProviderConfig> for BackendConfig {
    type Error = ConfigError;

    /// Two-level dispatch: `type`, then `provider` for `oss`.
    fn try_from(raw: &UploadProviderConfig) -> Result<Self, Self::Error> {
        let backend = match raw.kind.parse::<StorageType>()? {
            StorageType::Local => Self::Local(
                raw.local
                    .clone()
                    .ok_or_else(|| ConfigError::missing_payload("local"))?,
            ),
            StorageType::Minio => Self::Minio(
                raw.minio
                    .clone()
                    .ok_or_else(|| ConfigError::missing_payload("minio"))?,
            ),
            StorageType::Oss => {
                let oss = raw
                    .oss
                    .as_ref()
                    .ok_or_else(|| ConfigError::missing_payload("oss"))?;
                let provider = oss.provider.parse::<OssProvider>()?;
                let missing = || ConfigError::missing_payload(provider.as_str());
                match provider {
                    OssProvider::Aliyun => Self::Aliyun(oss.aliyun.clone().ok_or_else(missing)?),
                    OssProvider::Tencent => {
                        Self::Tencent(oss.tencent.clone().ok_or_else(missing)?)
                    }
                    OssProvider::Huawei => Self::Huawei(oss.huawei.clone().ok_or_else(missing)?),
                    OssProvider::Aws => Self::Aws(oss.aws.clone().ok_or_else(missing)?),
                    OssProvider::QCloud => Self::QCloud(oss.qcloud.clone().ok_or_else(missing)?),
                }
            }
        };

        backend.validate()?;
        Ok(backend)
    }
}

/// How the stored object's base name is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum FilenameStrategy {
    /// Keep the uploaded file's stem.
    Original,
    /// Random v4 UUID.
    #[default]
    Uuid,
    /// Unix seconds.
    Timestamp,
}

impl FilenameStrategy {
    /// Parse a strategy name. Unknown names fall back to [`FilenameStrategy::Uuid`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "original" => Self::Original,
            "uuid" => Self::Uuid,
            "timestamp" => Self::Timestamp,
            other => {
                warn!(strategy = %other, "Unknown filename strategy, falling back to uuid");
                Self::Uuid
            }
        }
    }
}

impl From<String> for FilenameStrategy {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

/// Shared upload policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSettings {
    /// Maximum file size in megabytes.
    pub max_file_size_mb: u64,
    /// Lower-cased, dot-prefixed extensions; empty means unrestricted.
    pub allowed_extensions: BTreeSet<String>,
    /// Base-name strategy.
    pub filename_strategy: FilenameStrategy,
    /// Prefix generated names with the original stem.
    pub keep_original_name: bool,
}

impl UploadSettings {
    /// Default max file size: 100MB.
    pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 100;

    /// Create settings with defaults: 100MB, unrestricted, uuid names.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_file_size_mb: Self::DEFAULT_MAX_FILE_SIZE_MB,
            allowed_extensions: BTreeSet::new(),
            filename_strategy: FilenameStrategy::default(),
            keep_original_name: false,
        }
    }

    /// Set maximum file size in megabytes.
    #[must_use]
    pub fn with_max_file_size_mb(mut self, mb: u64) -> Self {
        self.max_file_size_mb = mb;
        self
    }

    /// Set allowed extensions. Entries are lower-cased and dot-prefixed.
    #[must_use]
    pub fn with_allowed_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_extensions = extensions
            .into_iter()
            .filter_map(|ext| normalize_extension(ext.as_ref()))
            .collect();
        self
    }

    /// Set the filename strategy.
    #[must_use]
    pub fn with_filename_strategy(mut self, strategy: FilenameStrategy) -> Self {
        self.filename_strategy = strategy;
        self
    }

    /// Keep the original stem in generated names.
    #[must_use]
    pub fn with_keep_original_name(mut self, keep: bool) -> Self {
        self.keep_original_name = keep;
        self
    }

    /// Maximum file size in bytes.
    #[must_use]
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }

    /// Check a lower-cased extension against the allow-list.
    #[must_use]
    pub fn is_extension_allowed(&self, extension: &str) -> bool {
        self.allowed_extensions.is_empty() || self.allowed_extensions.contains(extension)
    }
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<&UploadSettingsConfig> for UploadSettings {
    type Error = ConfigError;

    fn try_from(raw: &UploadSettingsConfig) -> Result<Self, Self::Error> {
        if raw.max_file_size == 0 {
            return Err(ConfigError::InvalidSettings(
                "max-file-size must be greater than zero".into(),
            ));
        }

        Ok(Self::new()
            .with_max_file_size_mb(raw.max_file_size)
            .with_allowed_extensions(&raw.allowed_extensions)
            .with_filename_strategy(FilenameStrategy::parse(&raw.filename_strategy))
            .with_keep_original_name(raw.keep_original_name))
    }
}

fn normalize_extension(ext: &str) -> Option<String> {
    let ext = ext.trim().to_lowercase();
    match ext.as_str() {
        "" | "." => None,
        e if e.starts_with('.') => Some(ext),
        _ => Some(format!(".{ext}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_shared::config::OssConfig;
    use rstest::rstest;

    fn oss(provider: &str) -> OssConfig {
        OssConfig {
            provider: provider.to_string(),
            ..OssConfig::default()
        }
    }

    fn aliyun() -> AliyunOssConfig {
        AliyunOssConfig {
            endpoint: "oss-cn-hangzhou.aliyuncs.com".into(),
            access_key_id: "id".into(),
            access_key_secret: "secret".into(),
            bucket: "media".into(),
            ..AliyunOssConfig::default()
        }
    }

    #[rstest]
    #[case("local", StorageType::Local)]
    #[case("oss", StorageType::Oss)]
    #[case("minio", StorageType::Minio)]
    fn test_storage_type_parse(#[case] raw: &str, #[case] expected: StorageType) {
        assert_eq!(raw.parse::<StorageType>().expect("known type"), expected);
    }

    #[rstest]
    #[case("ftp")]
    #[case("")]
    #[case("LOCAL")]
    fn test_storage_type_rejects_unknown(#[case] raw: &str) {
        assert!(matches!(
            raw.parse::<StorageType>(),
            Err(ConfigError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_oss_provider_round_trips_names() {
        for provider in OssProvider::ALL {
            assert_eq!(
                provider.as_str().parse::<OssProvider>().expect("known"),
                provider
            );
        }
        assert!(matches!(
            "backblaze".parse::<OssProvider>(),
            Err(ConfigError::UnsupportedProvider(_))
        ));
    }

    #[test]
    fn test_missing_aliyun_payload() {
        let raw = UploadProviderConfig {
            kind: "oss".into(),
            oss: Some(oss("aliyun")),
            ..UploadProviderConfig::default()
        };
        let err = BackendConfig::try_from(&raw).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingPayload { backend: "aliyun" }
        ));
    }

    #[test]
    fn test_missing_oss_section() {
        let raw = UploadProviderConfig {
            kind: "oss".into(),
            ..UploadProviderConfig::default()
        };
        assert!(matches!(
            BackendConfig::try_from(&raw),
            Err(ConfigError::MissingPayload { backend: "oss" })
        ));
    }

    #[test]
    fn test_populated_payload_of_another_provider_is_ignored() {
        // Discriminator says tencent, only aliyun is filled in.
        let raw = UploadProviderConfig {
            kind: "oss".into(),
            oss: Some(OssConfig {
                aliyun: Some(aliyun()),
                ..oss("tencent")
            }),
            ..UploadProviderConfig::default()
        };
        assert!(matches!(
            BackendConfig::try_from(&raw),
            Err(ConfigError::MissingPayload { backend: "tencent" })
        ));
    }

    #[test]
    fn test_resolves_aliyun_backend() {
        let raw = UploadProviderConfig {
            kind: "oss".into(),
            oss: Some(OssConfig {
                aliyun: Some(aliyun()),
                ..oss("aliyun")
            }),
            ..UploadProviderConfig::default()
        };
        let backend = BackendConfig::try_from(&raw).expect("valid");
        assert_eq!(backend.name(), "aliyun");
        assert_eq!(backend.bucket(), "media");
        assert_eq!(backend.path_prefix(), "");
    }

    #[test]
    fn test_unsupported_provider() {
        let raw = UploadProviderConfig {
            kind: "oss".into(),
            oss: Some(oss("backblaze")),
            ..UploadProviderConfig::default()
        };
        assert!(matches!(
            BackendConfig::try_from(&raw),
            Err(ConfigError::UnsupportedProvider(p)) if p == "backblaze"
        ));
    }

    #[test]
    fn test_missing_required_field() {
        let mut cfg = aliyun();
        cfg.bucket = "  ".into();
        let err = BackendConfig::Aliyun(cfg).validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingField {
                backend: "aliyun",
                field: "bucket"
            }
        ));
    }

    #[test]
    fn test_qcloud_requires_endpoint() {
        let cfg = QCloudCosConfig {
            region: "ap-guangzhou".into(),
            access_key_id: "id".into(),
            secret_access_key: "secret".into(),
            bucket: "media-1250000000".into(),
            ..QCloudCosConfig::default()
        };
        assert!(matches!(
            BackendConfig::QCloud(cfg).validate(),
            Err(ConfigError::MissingField {
                field: "endpoint",
                ..
            })
        ));
    }

    #[rstest]
    #[case("original", FilenameStrategy::Original)]
    #[case("uuid", FilenameStrategy::Uuid)]
    #[case("timestamp", FilenameStrategy::Timestamp)]
    #[case("Timestamp", FilenameStrategy::Timestamp)]
    #[case("sha256", FilenameStrategy::Uuid)]
    #[case("", FilenameStrategy::Uuid)]
    fn test_filename_strategy_parse(#[case] raw: &str, #[case] expected: FilenameStrategy) {
        assert_eq!(FilenameStrategy::parse(raw), expected);
    }

    #[test]
    fn test_settings_from_raw_normalizes_extensions() {
        let raw = UploadSettingsConfig {
            max_file_size: 5,
            allowed_extensions: vec![".JPG".into(), "png".into(), " .Pdf ".into(), String::new()],
            filename_strategy: "original".into(),
            keep_original_name: true,
        };
        let settings = UploadSettings::try_from(&raw).expect("valid settings");
        assert_eq!(settings.max_file_size_bytes(), 5 * 1024 * 1024);
        assert_eq!(
            settings.allowed_extensions.iter().cloned().collect::<Vec<_>>(),
            vec![".jpg", ".pdf", ".png"]
        );
        assert_eq!(settings.filename_strategy, FilenameStrategy::Original);
        assert!(settings.keep_original_name);
        assert!(settings.is_extension_allowed(".png"));
        assert!(!settings.is_extension_allowed(".gif"));
    }

    #[test]
    fn test_settings_reject_zero_size() {
        let raw = UploadSettingsConfig {
            max_file_size: 0,
            ..UploadSettingsConfig::default()
        };
        assert!(matches!(
            UploadSettings::try_from(&raw),
            Err(ConfigError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_settings_defaults_unrestricted() {
        let settings = UploadSettings::default();
        assert_eq!(
            settings.max_file_size_mb,
            UploadSettings::DEFAULT_MAX_FILE_SIZE_MB
        );
        assert!(settings.is_extension_allowed(".anything"));
        assert_eq!(settings.filename_strategy, FilenameStrategy::Uuid);
    }
}
