//! Error taxonomy for the portal.
//!
//! Everything user-facing is caught at the handler boundary and surfaced as
//! an `ApiResponse` error message; nothing propagates to the client as an
//! unhandled failure.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    /// Neither an entity code nor a docket number was supplied.
    #[error("unsupported query: provide either an entity code or a docket number")]
    InvalidQuery,

    #[error("document {0} not found")]
    NotFound(i64),

    /// I/O or serialization failure while writing a report.
    #[error("report export failed: {0}")]
    Export(String),

    #[error("ingest input file missing: {0}")]
    MigrationFileMissing(String),

    #[error("ingest input file unreadable: {0}")]
    MigrationFileInvalid(String),

    #[error("ingest join key missing: {0}")]
    MigrationJoinKey(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl PortalError {
    fn status(&self) -> StatusCode {
        match self {
            PortalError::InvalidQuery => StatusCode::BAD_REQUEST,
            PortalError::NotFound(_) => StatusCode::NOT_FOUND,
            PortalError::Export(_)
            | PortalError::MigrationFileMissing(_)
            | PortalError::MigrationFileInvalid(_)
            | PortalError::MigrationJoinKey(_)
            | PortalError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<csv::Error> for PortalError {
    fn from(e: csv::Error) -> Self {
        PortalError::Export(e.to_string())
    }
}

impl From<std::io::Error> for PortalError {
    fn from(e: std::io::Error) -> Self {
        PortalError::Export(e.to_string())
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {}", self);
        }
        (
            status,
            Json(json!({
                "success": false,
                "data": null,
                "error": self.to_string(),
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(PortalError::InvalidQuery.status(), StatusCode::BAD_REQUEST);
        assert_eq!(PortalError::NotFound(7).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            PortalError::Export("disk full".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages_name_the_cause() {
        assert!(PortalError::NotFound(42).to_string().contains("42"));
        assert!(PortalError::MigrationFileMissing("oeb_data.csv".into())
            .to_string()
            .contains("oeb_data.csv"));
    }
}
