//! HTTP error mapping.
//!
//! Every failure leaves the API as `{"error": "<message>"}` with a status
//! derived from the `LedgerError` variant.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use ledger_contracts::LedgerError;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

pub(crate) fn status_for(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
        LedgerError::StaleTip { .. } => StatusCode::CONFLICT,
        LedgerError::WriterClosed => StatusCode::SERVICE_UNAVAILABLE,
        LedgerError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        LedgerError::StoreUnavailable { .. }
        | LedgerError::CorruptRecord { .. }
        | LedgerError::AuditWriteFailed { .. }
        | LedgerError::ConfigError { .. }
        | LedgerError::ServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self {
            status: status_for(&err),
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, error = %self.message, "audit API request failed");
        } else {
            warn!(status = %self.status, error = %self.message, "audit API request rejected");
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
