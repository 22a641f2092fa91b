use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::paper_generation::GenerationError;
use crate::services::question_import::ImportError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    BadRequest(String),
    NotFound(String),
    PayloadTooLarge(String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Document(doc) => ApiError::BadRequest(doc.to_string()),
            ImportError::UnknownUnit { .. } => ApiError::BadRequest(err.to_string()),
            ImportError::Store(err) => ApiError::internal(format!("{err:#}"), "Failed to import questions"),
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::MissingSubject
            | GenerationError::EmptyPool { .. }
            | GenerationError::InvalidTemplate(_) => ApiError::BadRequest(err.to_string()),
            GenerationError::Store(err) => ApiError::internal(format!("{err:#}"), "Failed to generate paper"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::PayloadTooLarge(message) => (StatusCode::PAYLOAD_TOO_LARGE, message),
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };
        (status, Json(ErrorResponse { status: status.as_u16(), detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::document_text::DocumentError;
    use crate::services::slot_layout::LayoutError;

    #[test]
    fn expected_rejections_map_to_bad_request() {
        let err: ApiError =
            ImportError::Document(DocumentError::UnsupportedFormat { extension: "rtf".into() }).into();
        assert!(matches!(err, ApiError::BadRequest(ref detail) if detail.contains("rtf")));

        let err: ApiError =
            ImportError::UnknownUnit { unit_id: "u9".into(), subject_id: "s1".into() }.into();
        assert!(matches!(err, ApiError::BadRequest(ref detail) if detail.contains("u9")));

        let err: ApiError = GenerationError::EmptyPool { subject_id: "s1".into() }.into();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err: ApiError = GenerationError::InvalidTemplate(LayoutError::Empty).into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_failures_hide_details() {
        let err: ApiError = GenerationError::Store(anyhow::anyhow!("connection refused")).into();
        match err {
            ApiError::Internal(detail) => assert_eq!(detail, "Failed to generate paper"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
