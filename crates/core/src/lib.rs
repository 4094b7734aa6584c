//! Core storage logic for Depot.
//!
//! This crate contains the upload core with ZERO web dependencies: the typed
//! backend model, upload policy, object naming, URL resolution, the
//! OpenDAL-backed client and the batch pipeline.
//!
//! # Modules
//!
//! - `storage` - Backend selection, validation, naming and the `Uploader` client
//! - `batch` - Bounded-concurrency batch uploads with cancellation

pub mod batch;
pub mod storage;
