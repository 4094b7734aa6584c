//! Upload inputs and results.

use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

/// Where an upload's bytes come from.
pub enum FileBody {
    /// An already-open stream.
    Reader(Box<dyn AsyncRead + Send + Unpin>),
    /// A file on disk, opened when the upload starts.
    Path(PathBuf),
}

/// One file to upload: a name, a declared size and a byte source.
///
/// The body is consumed by the upload, so a `FileInput` is used once.
pub struct FileInput {
    filename: String,
    size: u64,
    body: FileBody,
}

impl FileInput {
    /// Wrap an open stream.
    #[must_use]
    pub fn from_reader(
        filename: impl Into<String>,
        size: u64,
        reader: impl AsyncRead + Send + Unpin + 'static,
    ) -> Self {
        Self {
            filename: filename.into(),
            size,
            body: FileBody::Reader(Box::new(reader)),
        }
    }

    /// Wrap an in-memory buffer; the size is the buffer length.
    #[must_use]
    pub fn from_bytes(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            filename: filename.into(),
            size: data.len() as u64,
            body: FileBody::Reader(Box::new(Cursor::new(data))),
        }
    }

    /// Reference a file on disk. The size is read now, the file is opened
    /// lazily when the upload runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be stat'ed or is not a file.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            filename,
            size: metadata.len(),
            body: FileBody::Path(path.to_path_buf()),
        })
    }

    /// Original filename.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Declared size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Split into name, size and body.
    #[must_use]
    pub fn into_parts(self) -> (String, u64, FileBody) {
        (self.filename, self.size, self.body)
    }
}

impl fmt::Debug for FileInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = match &self.body {
            FileBody::Reader(_) => "reader".to_string(),
            FileBody::Path(path) => path.display().to_string(),
        };
        f.debug_struct("FileInput")
            .field("filename", &self.filename)
            .field("size", &self.size)
            .field("body", &body)
            .finish()
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadDescriptor {
    /// Public URL of the stored object.
    pub url: String,
    /// Backend object key.
    pub key: String,
    /// Bytes written.
    pub size: u64,
    /// Content type sent to the backend.
    pub mime_type: String,
}
