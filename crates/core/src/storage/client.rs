//! Storage client: the single upload capability every backend exposes.

use std::future::Future;

use bytes::BytesMut;
use opendal::Operator;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::{BackendConfig, UploadSettings};
use super::error::{ConfigError, DeleteError, UploadError, UrlError};
use super::factory;
use super::naming;
use super::types::{FileBody, FileInput, UploadDescriptor};
use super::url::resolve_url;

/// Bytes read from the caller's stream per backend write.
const CHUNK_SIZE: usize = 256 * 1024;

/// Upload capability shared by every storage backend.
///
/// Implemented by [`StorageClient`]; the batch pipeline and the HTTP layer
/// only depend on this trait.
pub trait Uploader: Send + Sync {
    /// Validate, name and store one file.
    fn upload(
        &self,
        file: FileInput,
    ) -> impl Future<Output = Result<UploadDescriptor, UploadError>> + Send;

    /// Remove an object by key.
    fn delete(&self, key: &str) -> impl Future<Output = Result<(), DeleteError>> + Send;

    /// Public URL for a key. No backend call is made.
    fn url(&self, key: &str) -> Result<String, UrlError>;

    /// [`Uploader::upload`] that stops early once `cancel` fires.
    ///
    /// A cancelled upload may leave a partial object behind on backends
    /// without multipart abort.
    fn upload_cancellable(
        &self,
        file: FileInput,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<UploadDescriptor, UploadError>> + Send {
        async move {
            if cancel.is_cancelled() {
                return Err(UploadError::Cancelled);
            }
            tokio::select! {
                biased;
                () = cancel.cancelled() => Err(UploadError::Cancelled),
                result = self.upload(file) => result,
            }
        }
    }
}

/// How the client reaches its backend.
pub(crate) enum Transport {
    /// Filesystem operator rebuilt per call from the configured path.
    Local {
        /// Path as configured, before `~/` expansion.
        path: String,
    },
    /// Long-lived operator for remote backends.
    Shared(Operator),
}

/// Backend-bound upload client.
///
/// Immutable after construction and safe to share across tasks.
pub struct StorageClient {
    backend: BackendConfig,
    settings: UploadSettings,
    transport: Transport,
}

impl StorageClient {
    pub(crate) fn new(backend: BackendConfig, settings: UploadSettings, transport: Transport) -> Self {
        Self {
            backend,
            settings,
            transport,
        }
    }

    /// Build a client over an existing operator.
    ///
    /// URLs and key prefixes still come from `backend`; bytes go to
    /// `operator`.
    #[must_use]
    pub fn with_operator(backend: BackendConfig, settings: UploadSettings, operator: Operator) -> Self {
        Self::new(backend, settings, Transport::Shared(operator))
    }

    /// Active backend configuration.
    #[must_use]
    pub fn backend(&self) -> &BackendConfig {
        &self.backend
    }

    /// Upload policy.
    #[must_use]
    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    fn operator(&self) -> Result<Operator, ConfigError> {
        match &self.transport {
            Transport::Local { path } => factory::local_operator(path),
            Transport::Shared(operator) => Ok(operator.clone()),
        }
    }
}

impl Uploader for StorageClient {
    async fn upload(&self, file: FileInput) -> Result<UploadDescriptor, UploadError> {
        let (filename, size, body) = file.into_parts();

        naming::validate(&filename, size, &self.settings)?;

        let name = naming::generate_object_name(&filename, &self.settings);
        let key = naming::build_object_key(&name, self.backend.path_prefix());
        let mime_type = naming::mime_type_for(&filename);
        let operator = self.operator()?;

        debug!(
            backend = self.backend.name(),
            filename = %filename,
            key = %key,
            declared_size = size,
            "Starting upload"
        );

        let reader: Box<dyn AsyncRead + Send + Unpin> = match body {
            FileBody::Reader(reader) => reader,
            FileBody::Path(path) => match tokio::fs::File::open(&path).await {
                Ok(file) => Box::new(file),
                Err(source) => return Err(UploadError::Source { filename, source }),
            },
        };

        let written = write_stream(&operator, &key, mime_type, &filename, reader).await?;
        let url = resolve_url(&self.backend, &key);

        info!(
            backend = self.backend.name(),
            key = %key,
            size = written,
            mime_type = mime_type,
            "File uploaded"
        );

        Ok(UploadDescriptor {
            url,
            key,
            size: written,
            mime_type: mime_type.to_string(),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), DeleteError> {
        if key.is_empty() {
            return Err(DeleteError::EmptyKey);
        }
        if !naming::is_valid_object_key(key) {
            return Err(DeleteError::InvalidKey(key.to_string()));
        }

        let operator = self.operator()?;

        // Most object stores delete missing keys silently; stat first so
        // every backend reports a missing object the same way.
        operator
            .stat(key)
            .await
            .map_err(|source| DeleteError::backend_delete(key, source))?;
        operator
            .delete(key)
            .await
            .map_err(|source| DeleteError::backend_delete(key, source))?;

        info!(backend = self.backend.name(), key = %key, "File deleted");
        Ok(())
    }

    fn url(&self, key: &str) -> Result<String, UrlError> {
        if key.is_empty() {
            return Err(UrlError::EmptyKey);
        }
        if !naming::is_valid_object_key(key) {
            return Err(UrlError::InvalidKey(key.to_string()));
        }
        Ok(resolve_url(&self.backend, key))
    }
}

/// Stream `reader` into `key`, returning the number of bytes written.
async fn write_stream(
    operator: &Operator,
    key: &str,
    mime_type: &str,
    filename: &str,
    mut reader: Box<dyn AsyncRead + Send + Unpin>,
) -> Result<u64, UploadError> {
    let writer = if operator.info().full_capability().write_with_content_type {
        operator.writer_with(key).content_type(mime_type).await
    } else {
        operator.writer(key).await
    };
    let mut writer = writer.map_err(|source| UploadError::backend_write(key, source))?;

    let mut buf = BytesMut::with_capacity(CHUNK_SIZE);
    let mut written = 0u64;

    loop {
        buf.reserve(CHUNK_SIZE);
        let read = match reader.read_buf(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(source) => {
                abort(&mut writer, key).await;
                return Err(UploadError::Source {
                    filename: filename.to_string(),
                    source,
                });
            }
        };

        written += read as u64;
        if let Err(source) = writer.write(buf.split().freeze()).await {
            abort(&mut writer, key).await;
            return Err(UploadError::backend_write(key, source));
        }
    }

    writer
        .close()
        .await
        .map_err(|source| UploadError::backend_write(key, source))?;

    Ok(written)
}

async fn abort(writer: &mut opendal::Writer, key: &str) {
    if let Err(e) = writer.abort().await {
        warn!(key = %key, error = %e, "Failed to abort partial upload");
    }
}
