//! Pre-upload validation, object naming and MIME lookup.
//!
//! Everything here is pure apart from the randomness and clock reads of the
//! `uuid` and `timestamp` strategies.

use chrono::Utc;
use uuid::Uuid;

use super::config::{FilenameStrategy, UploadSettings};
use super::error::ValidationError;

/// MIME type used when the extension is unknown.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Split a filename into `(stem, extension)`.
///
/// The extension runs from the last `.` inclusive; it is empty when there is
/// no dot. Any directory components are dropped first.
#[must_use]
pub fn split_extension(filename: &str) -> (&str, &str) {
    let name = base_name(filename);
    match name.rfind('.') {
        Some(idx) => name.split_at(idx),
        None => (name, ""),
    }
}

/// Final path component, accepting both separators.
fn base_name(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
}

/// Check a file against the upload policy.
///
/// Size is checked first; the first failing check is reported.
pub fn validate(filename: &str, size: u64, settings: &UploadSettings) -> Result<(), ValidationError> {
    let max = settings.max_file_size_bytes();
    if size > max {
        return Err(ValidationError::FileTooLarge { size, max });
    }

    if matches!(base_name(filename), "" | "." | "..") {
        return Err(ValidationError::InvalidFilename {
            filename: filename.to_string(),
        });
    }

    let extension = split_extension(filename).1.to_lowercase();
    if !settings.is_extension_allowed(&extension) {
        return Err(ValidationError::ExtensionNotAllowed { extension });
    }

    Ok(())
}

/// Derive the stored object name from the uploaded filename.
///
/// Deterministic for [`FilenameStrategy::Original`], fresh on every call
/// otherwise.
#[must_use]
pub fn generate_object_name(filename: &str, settings: &UploadSettings) -> String {
    let (stem, extension) = split_extension(filename);

    let base = match settings.filename_strategy {
        FilenameStrategy::Original => stem.to_string(),
        FilenameStrategy::Uuid => Uuid::new_v4().to_string(),
        FilenameStrategy::Timestamp => Utc::now().timestamp().to_string(),
    };

    if settings.keep_original_name && settings.filename_strategy != FilenameStrategy::Original {
        format!("{stem}_{base}{extension}")
    } else {
        format!("{base}{extension}")
    }
}

/// Join a key prefix and an object name with exactly one `/`.
#[must_use]
pub fn build_object_key(name: &str, path_prefix: &str) -> String {
    let prefix = path_prefix
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    let name = name.trim_start_matches('/');

    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Whether `key` is a relative `/`-separated path that stays below the
/// backend root: no empty, `.` or `..` segments and no backslashes.
#[must_use]
pub fn is_valid_object_key(key: &str) -> bool {
    !key.is_empty()
        && !key.contains('\\')
        && key
            .split('/')
            .all(|segment| !matches!(segment, "" | "." | ".."))
}

/// MIME type for a filename, from the static extension table.
#[must_use]
pub fn mime_type_for(filename: &str) -> &'static str {
    let extension = split_extension(filename).1.trim_start_matches('.');
    if extension.is_empty() {
        return DEFAULT_MIME_TYPE;
    }
    mime_guess::from_ext(extension)
        .first_raw()
        .unwrap_or(DEFAULT_MIME_TYPE)
}
