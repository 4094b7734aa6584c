//! Provider-selected object storage using Apache OpenDAL.
//!
//! One configured backend is resolved at startup into a [`StorageClient`]
//! exposing a single upload capability:
//! - Local filesystem
//! - Aliyun OSS, Tencent COS, Huawei OBS, AWS S3 and COS-compatible endpoints
//! - MinIO
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ AppConfig (depot-shared) ──TryFrom──► BackendConfig           │
//! │                                       UploadSettings          │
//! ├──────────────────────────────────────────────────────────────┤
//! │ create_client ──► StorageClient: Uploader                     │
//! │   upload: validate ► name ► key ► stream ► resolve_url        │
//! │   delete: stat ► delete                                       │
//! │   url:    resolve_url (pure)                                  │
//! ├──────────────────────────────────────────────────────────────┤
//! │ OpenDAL Operator: Fs | Oss | Cos | Obs | S3                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod client;
mod config;
mod error;
mod factory;
mod naming;
mod types;
mod url;

pub use client::{StorageClient, Uploader};
pub use config::{BackendConfig, FilenameStrategy, OssProvider, StorageType, UploadSettings};
pub use error::{ConfigError, DeleteError, UploadError, UrlError, ValidationError};
pub use factory::{create_client, expand_local_path};
pub use naming::{
    DEFAULT_MIME_TYPE, build_object_key, generate_object_name, is_valid_object_key, mime_type_for,
    split_extension, validate,
};
pub use types::{FileBody, FileInput, UploadDescriptor};
pub use url::resolve_url;
