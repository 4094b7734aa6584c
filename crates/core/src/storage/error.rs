//! Storage error types.

use std::path::PathBuf;

use thiserror::Error;

/// Backend configuration errors. Fatal at startup, never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `upload.type` is not one of `local`, `oss`, `minio`.
    #[error("unsupported upload type: '{0}'")]
    UnsupportedType(String),

    /// `upload.oss.provider` is not a known provider.
    #[error("unsupported oss provider: '{0}'")]
    UnsupportedProvider(String),

    /// The discriminator names a backend whose payload is absent.
    #[error("{backend} config is required when it is the selected backend")]
    MissingPayload {
        /// Backend named by the discriminator.
        backend: &'static str,
    },

    /// A required field of the selected backend is empty.
    #[error("{backend} {field} is required")]
    MissingField {
        /// Backend name.
        backend: &'static str,
        /// Schema field name.
        field: &'static str,
    },

    /// Upload policy is unusable.
    #[error("invalid upload settings: {0}")]
    InvalidSettings(String),

    /// `~/` could not be expanded.
    #[error("cannot resolve home directory for path '{0}'")]
    HomeDirUnavailable(String),

    /// Local upload directory could not be created.
    #[error("failed to create upload directory {}: {source}", .path.display())]
    CreateDirectory {
        /// Directory that was being created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The OpenDAL operator could not be built.
    #[error("failed to initialise {backend} transport: {source}")]
    Transport {
        /// Backend name.
        backend: &'static str,
        /// Underlying OpenDAL error.
        #[source]
        source: opendal::Error,
    },
}

impl ConfigError {
    /// Create a missing field error.
    #[must_use]
    pub fn missing_field(backend: &'static str, field: &'static str) -> Self {
        Self::MissingField { backend, field }
    }

    /// Create a missing payload error.
    #[must_use]
    pub fn missing_payload(backend: &'static str) -> Self {
        Self::MissingPayload { backend }
    }
}

/// Upload policy violations. Raised before any backend I/O.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// File size exceeds maximum allowed.
    #[error("file size {size} bytes exceeds maximum allowed {max} bytes")]
    FileTooLarge {
        /// Declared file size.
        size: u64,
        /// Maximum allowed size.
        max: u64,
    },

    /// Filename has no usable final component (empty, `.` or `..`).
    #[error("invalid filename '{filename}'")]
    InvalidFilename {
        /// Filename as received.
        filename: String,
    },

    /// Extension is not in the allow-list.
    #[error("file extension '{extension}' is not allowed")]
    ExtensionNotAllowed {
        /// Lower-cased extension, including the dot (empty if none).
        extension: String,
    },
}

/// Upload failures.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Rejected by the upload policy.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The caller's byte stream failed.
    #[error("failed to read upload source '{filename}': {source}")]
    Source {
        /// Original filename.
        filename: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The backend rejected the write.
    #[error("failed to write '{key}' to storage backend: {source}")]
    BackendWriteFailed {
        /// Object key being written.
        key: String,
        /// Underlying OpenDAL error.
        #[source]
        source: opendal::Error,
    },

    /// Cancellation signal fired before the upload finished.
    #[error("upload cancelled")]
    Cancelled,

    /// The task driving this upload terminated abnormally.
    #[error("upload aborted: {0}")]
    Aborted(String),

    /// Backend transport could not be resolved for this call.
    #[error(transparent)]
    Configuration(#[from] ConfigError),
}

impl UploadError {
    /// Create a backend write error.
    #[must_use]
    pub fn backend_write(key: impl Into<String>, source: opendal::Error) -> Self {
        Self::BackendWriteFailed {
            key: key.into(),
            source,
        }
    }

    /// Whether this is a policy rejection.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Whether the upload was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Delete failures.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// Empty object key.
    #[error("object key must not be empty")]
    EmptyKey,

    /// Key is absolute or leaves the backend root.
    #[error("invalid object key '{0}'")]
    InvalidKey(String),

    /// The backend reported an error, including a missing object.
    #[error("failed to delete '{key}' from storage backend: {source}")]
    BackendDeleteFailed {
        /// Object key.
        key: String,
        /// Underlying OpenDAL error.
        #[source]
        source: opendal::Error,
    },

    /// Backend transport could not be resolved for this call.
    #[error(transparent)]
    Configuration(#[from] ConfigError),
}

impl DeleteError {
    /// Create a backend delete error.
    #[must_use]
    pub fn backend_delete(key: impl Into<String>, source: opendal::Error) -> Self {
        Self::BackendDeleteFailed {
            key: key.into(),
            source,
        }
    }

    /// Whether the failure is a missing object. Callers wanting idempotent
    /// deletes treat this as success.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::BackendDeleteFailed { source, .. } if source.kind() == opendal::ErrorKind::NotFound
        )
    }
}

/// URL resolution failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    /// Empty object key.
    #[error("object key must not be empty")]
    EmptyKey,

    /// Key is absolute or leaves the backend root.
    #[error("invalid object key '{0}'")]
    InvalidKey(String),
}
