pub mod documents;
pub mod search;
pub mod server;

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use serde::Serialize;

use regdocs_backend::error::PortalError;
use regdocs_backend::report::Report;

/// Stream a generated report back as a CSV attachment. The report's temp
/// file is gone by the time the response body is built.
pub fn csv_attachment(report: Report) -> Result<Response, PortalError> {
    let filename = report.download_name().to_string();
    let bytes = report.into_bytes()?;
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from(bytes))
        .map_err(|e| PortalError::Export(e.to_string()))
}

/// API response envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let ok = serde_json::to_value(ApiResponse::success(5)).unwrap();
        assert_eq!(ok["success"], true);
        assert_eq!(ok["data"], 5);
        assert!(ok["error"].is_null());

        let err = serde_json::to_value(ApiResponse::<i32>::error("nope")).unwrap();
        assert_eq!(err["success"], false);
        assert!(err["data"].is_null());
        assert_eq!(err["error"], "nope");
    }
}
