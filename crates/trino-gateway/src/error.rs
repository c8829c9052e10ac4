use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::adapters::http::protocol::QueryResults;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("failed to open database: {path}: {source}")]
    DbOpenFailed {
        path: PathBuf,
        #[source]
        source: duckdb::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("connection unavailable: {0}")]
    ConnectionUnavailable(String),

    /// Engine error text, passed through unchanged.
    #[error("{0}")]
    SqlError(String),

    #[error("{0}")]
    Decode(String),

    #[error("query exceeded the {0} ms deadline")]
    Timeout(u64),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<duckdb::Error> for AppError {
    fn from(e: duckdb::Error) -> Self {
        AppError::SqlError(e.to_string())
    }
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "INVALID_REQUEST",
            AppError::DbOpenFailed { .. } => "DB_OPEN_FAILED",
            AppError::InvalidConfig(_) => "INVALID_CONFIG",
            AppError::ConnectionUnavailable(_) => "CONNECTION_UNAVAILABLE",
            AppError::SqlError(_) => "SQL_ERROR",
            AppError::Decode(_) => "DECODE_ERROR",
            AppError::Timeout(_) => "TIMEOUT",
            AppError::Io(_) => "IO_ERROR",
            AppError::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) | AppError::SqlError(_) | AppError::Decode(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::DbOpenFailed { .. }
            | AppError::InvalidConfig(_)
            | AppError::ConnectionUnavailable(_)
            | AppError::Io(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        } else {
            tracing::warn!(code = self.code(), error = %self, "request rejected");
        }
        let body = QueryResults::failure(self.to_string(), status);
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_keep_their_text() {
        let err = AppError::SqlError("Parser Error: syntax error at or near \"SELEC\"".into());
        assert_eq!(err.to_string(), "Parser Error: syntax error at or near \"SELEC\"");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn status_follows_fault_side() {
        assert_eq!(
            AppError::InvalidRequest("limit".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Decode("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::ConnectionUnavailable("gone".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::Timeout(10).status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
