//! Mapping from [`ServiceError`] to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use crate::error::ServiceError;

use super::types::{QueryResponse, SubmitResponse};

/// Which endpoint produced the error, so the body keeps that endpoint's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Submit,
    Query,
}

/// A [`ServiceError`] on its way out of a handler.
#[derive(Debug)]
pub struct ApiError {
    pub endpoint: Endpoint,
    pub error: ServiceError,
}

impl ApiError {
    pub fn submit(error: ServiceError) -> Self {
        Self {
            endpoint: Endpoint::Submit,
            error,
        }
    }

    pub fn query(error: ServiceError) -> Self {
        Self {
            endpoint: Endpoint::Query,
            error,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        if self.error.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self.error);
        }
        match self.endpoint {
            Endpoint::Submit => (
                status,
                Json(SubmitResponse::Error {
                    error: self.error.to_string(),
                }),
            )
                .into_response(),
            // Query errors never carry detail.
            Endpoint::Query => (status, Json(QueryResponse::Error)).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_400() {
        let e = ApiError::submit(ServiceError::invalid_input("document file must be a PDF"));
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn everything_else_is_500() {
        let e = ApiError::query(ServiceError::InconsistentState {
            fingerprint: "f".into(),
            status: "completed".into(),
        });
        assert_eq!(e.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let e = ApiError::submit(ServiceError::storage("disk full"));
        assert_eq!(e.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
