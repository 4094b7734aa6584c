//! Mapping from core errors to HTTP responses.

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use depot_core::storage::{DeleteError, UploadError, UrlError};
use depot_shared::AppError;

/// Handler error rendered as `{ "error": CODE, "message": ... }`.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }

        (
            status,
            Json(json!({
                "error": self.0.error_code(),
                "message": self.0.to_string(),
            })),
        )
            .into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        let message = err.to_string();
        Self(match err {
            UploadError::Validation(_) => AppError::Validation(message),
            UploadError::Source { .. } => AppError::BadRequest(message),
            UploadError::BackendWriteFailed { .. } => AppError::ExternalService(message),
            UploadError::Cancelled => AppError::Cancelled(message),
            UploadError::Aborted(_) => AppError::Internal(message),
            UploadError::Configuration(_) => AppError::Configuration(message),
        })
    }
}

impl From<DeleteError> for ApiError {
    fn from(err: DeleteError) -> Self {
        let message = err.to_string();
        Self(match err {
            DeleteError::EmptyKey | DeleteError::InvalidKey(_) => AppError::BadRequest(message),
            e if e.is_not_found() => AppError::NotFound(message),
            DeleteError::BackendDeleteFailed { .. } => AppError::ExternalService(message),
            DeleteError::Configuration(_) => AppError::Configuration(message),
        })
    }
}

impl From<UrlError> for ApiError {
    fn from(err: UrlError) -> Self {
        Self(AppError::BadRequest(err.to_string()))
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        let message = err.body_text();
        Self(if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(message)
        } else {
            AppError::BadRequest(message)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::storage::ValidationError;
    use opendal::ErrorKind;
    use rstest::rstest;

    fn backend_delete(kind: ErrorKind) -> DeleteError {
        DeleteError::backend_delete("a.png", opendal::Error::new(kind, "backend"))
    }

    #[rstest]
    #[case(
        UploadError::Validation(ValidationError::FileTooLarge { size: 2, max: 1 }),
        StatusCode::BAD_REQUEST
    )]
    #[case(
        UploadError::backend_write("a.png", opendal::Error::new(ErrorKind::Unexpected, "down")),
        StatusCode::BAD_GATEWAY
    )]
    #[case(UploadError::Cancelled, StatusCode::INTERNAL_SERVER_ERROR)]
    #[case(UploadError::Aborted("boom".into()), StatusCode::INTERNAL_SERVER_ERROR)]
    fn test_upload_error_status(#[case] err: UploadError, #[case] status: StatusCode) {
        assert_eq!(ApiError::from(err).into_response().status(), status);
    }

    #[rstest]
    #[case(DeleteError::EmptyKey, StatusCode::BAD_REQUEST)]
    #[case(DeleteError::InvalidKey("../a.png".into()), StatusCode::BAD_REQUEST)]
    #[case(backend_delete(ErrorKind::NotFound), StatusCode::NOT_FOUND)]
    #[case(backend_delete(ErrorKind::PermissionDenied), StatusCode::BAD_GATEWAY)]
    fn test_delete_error_status(#[case] err: DeleteError, #[case] status: StatusCode) {
        assert_eq!(ApiError::from(err).into_response().status(), status);
    }

    #[rstest]
    #[case(UrlError::EmptyKey)]
    #[case(UrlError::InvalidKey("/etc/passwd".into()))]
    fn test_url_error_is_bad_request(#[case] err: UrlError) {
        assert_eq!(
            ApiError::from(err).into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_invalid_filename_is_validation_error() {
        let err = UploadError::Validation(ValidationError::InvalidFilename {
            filename: String::new(),
        });
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
