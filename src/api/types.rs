//! API request/response types.

use serde::{Deserialize, Serialize};

use crate::gateway::{Gateway, QueryResult, SubmissionResult};

/// Shared handler state.
#[derive(Clone)]
pub struct ApiState {
    pub gateway: Gateway,
}

/// Body of every `POST /submit` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmitResponse {
    Completed {
        #[serde(rename = "documentId")]
        document_id: String,
        result: Vec<String>,
    },
    Pending {
        #[serde(rename = "documentId")]
        document_id: String,
    },
    Error {
        error: String,
    },
}

impl From<SubmissionResult> for SubmitResponse {
    fn from(r: SubmissionResult) -> Self {
        match r {
            SubmissionResult::Completed {
                fingerprint,
                fragments,
            } => Self::Completed {
                document_id: fingerprint.to_string(),
                result: fragments,
            },
            SubmissionResult::Pending { fingerprint } => Self::Pending {
                document_id: fingerprint.to_string(),
            },
        }
    }
}

/// Body of every `GET /query/{id}` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryResponse {
    Completed {
        result: Vec<String>,
    },
    Pending,
    Failed {
        #[serde(rename = "failReason")]
        fail_reason: String,
    },
    NotFound,
    Error,
}

impl From<QueryResult> for QueryResponse {
    fn from(r: QueryResult) -> Self {
        match r {
            QueryResult::Completed { fragments } => Self::Completed { result: fragments },
            QueryResult::Pending => Self::Pending,
            QueryResult::Failed { reason } => Self::Failed {
                fail_reason: reason,
            },
            QueryResult::NotFound => Self::NotFound,
        }
    }
}

/// Health check response model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Health status
    pub status: String,
    /// API version
    pub version: String,
}
