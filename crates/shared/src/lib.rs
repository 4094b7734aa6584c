//! Shared configuration and errors for Depot.
//!
//! This crate provides common types used across all other crates:
//! - The on-disk configuration schema and its loader
//! - Application-wide error types

pub mod config;
pub mod error;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
