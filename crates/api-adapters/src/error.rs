//! # ApiError
//!
//! Translates domain failures and request rejections into HTTP responses.
//! Server-side failures are logged in full and answered with a generic message.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use domains::DomainError;

const INTERNAL_MESSAGE: &str = "an internal error occurred";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Domain(err) => match err {
                DomainError::InvalidRequest(_) | DomainError::InvalidGenre(_) => {
                    StatusCode::BAD_REQUEST
                }
                DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
                DomainError::Constraint(_) => StatusCode::CONFLICT,
                DomainError::ConcurrencyConflict { .. } | DomainError::Storage(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            INTERNAL_MESSAGE.to_string()
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
            self.to_string()
        };
        let body = json!({
            "error": status.canonical_reason().unwrap_or("Error"),
            "message": message,
        });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn storage_failures_hide_their_detail() {
        let (status, body) =
            body_of(DomainError::Storage("password authentication failed".into()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], INTERNAL_MESSAGE);
    }

    #[tokio::test]
    async fn domain_errors_map_to_statuses() {
        let cases = [
            (DomainError::invalid("x"), StatusCode::BAD_REQUEST),
            (DomainError::InvalidGenre("jazz".into()), StatusCode::BAD_REQUEST),
            (DomainError::not_found("Game", 1), StatusCode::NOT_FOUND),
            (DomainError::Constraint("fk".into()), StatusCode::CONFLICT),
            (
                DomainError::ConcurrencyConflict { entity: "Game", id: 1 },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[tokio::test]
    async fn not_found_message_names_the_entity() {
        let (status, body) = body_of(DomainError::not_found("Purchase", 9).into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not Found");
        assert_eq!(body["message"], "Purchase not found with ID 9");
    }
}
