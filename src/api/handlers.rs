//! API request handlers.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use tracing::debug;

use crate::error::ServiceError;
use crate::gateway::{QueryResult, SubmissionResult, MSG_DOCUMENT_REQUIRED};

use super::{
    error::ApiError,
    types::{ApiState, HealthResponse, QueryResponse, SubmitResponse},
};

/// Multipart field carrying the upload.
pub const DOCUMENT_FIELD: &str = "document";

/// Submit endpoint handler.
///
/// POST /submit
///
/// Accepts multipart form data with a single `document` file field. Other
/// fields are ignored.
///
/// - `400 {status: "ERROR", error}`: no document (including a body that is
///   not multipart at all), or not a PDF
/// - `200 {status: "COMPLETED", documentId, result}`: already processed
/// - `202 {status: "PENDING", documentId}`: queued (or already in progress)
pub async fn submit_handler(
    State(state): State<ApiState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let mut multipart = multipart.map_err(|e| {
        debug!("Rejected non-multipart submission: {}", e.body_text());
        ApiError::submit(ServiceError::invalid_input(MSG_DOCUMENT_REQUIRED))
    })?;
    let mut document: Option<(Vec<u8>, Option<String>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::submit(ServiceError::invalid_input(e.body_text())))?
    {
        if field.name() != Some(DOCUMENT_FIELD) || document.is_some() {
            continue;
        }
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::submit(ServiceError::invalid_input(e.body_text())))?;
        document = Some((data.to_vec(), content_type));
    }

    let (bytes, mime_type) = match document {
        Some((bytes, mime)) => (Some(bytes), mime),
        None => (None, None),
    };

    let result = state
        .gateway
        .submit(bytes.as_deref(), mime_type.as_deref())
        .await
        .map_err(ApiError::submit)?;

    let status = match result {
        SubmissionResult::Completed { .. } => StatusCode::OK,
        SubmissionResult::Pending { .. } => StatusCode::ACCEPTED,
    };
    Ok((status, Json(result.into())))
}

/// Query endpoint handler.
///
/// GET /query/{id}
pub async fn query_handler(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<QueryResponse>), ApiError> {
    let result = state.gateway.query(&id).await.map_err(ApiError::query)?;
    let status = match result {
        QueryResult::NotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::OK,
    };
    Ok((status, Json(result.into())))
}

/// Health check endpoint handler.
///
/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
