//! Error types for the pdftools server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pdftools_core::TransformError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Caller sent something we refuse to process. The message is shown as-is.
    #[error("{0}")]
    BadRequest(String),

    /// Processing failed. Only `context` reaches the client.
    #[error("{context}: {source}")]
    Processing {
        context: &'static str,
        source: anyhow::Error,
    },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    /// Wrap any failure under a generic client-facing message.
    pub fn processing<E>(context: &'static str) -> impl FnOnce(E) -> ApiError
    where
        E: Into<anyhow::Error>,
    {
        move |e| ApiError::Processing {
            context,
            source: e.into(),
        }
    }

    /// Validation failures become 400s, everything else a generic 500.
    pub fn from_transform(context: &'static str, err: TransformError) -> Self {
        if err.is_validation() {
            ApiError::BadRequest(err.to_string())
        } else {
            ApiError::Processing {
                context,
                source: err.into(),
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Processing { context, source } => {
                tracing::error!("{}: {:#}", context, source);
                (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err = ApiError::from_transform(
            "Failed to split PDF",
            TransformError::Validation("Please provide page numbers".into()),
        );
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "Please provide page numbers"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_codec_maps_to_generic_500() {
        let err = ApiError::from_transform(
            "Internal server error during compression",
            TransformError::Codec("bad huffman table".into()),
        );
        assert!(matches!(err, ApiError::Processing { .. }));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
