//! HTTP error rendering

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sentiment_core::{Error, ExternalServiceError};
use serde_json::json;

/// Error returned from handlers, rendered as `{"error": {"message", "type"}}`
#[derive(Debug)]
pub struct AppError(pub Error);

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        AppError(err)
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::ExternalService(ExternalServiceError::MissingCredential(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Error::ExternalService(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let kind = self.0.kind();

        metrics::counter!("sentiment_errors_total", "kind" => kind).increment(1);

        if status.is_server_error() {
            tracing::error!("Request failed ({}): {}", status, self.0);
        } else {
            tracing::debug!("Rejected request ({}): {}", status, self.0);
        }

        let body = json!({
            "error": {
                "message": self.0.to_string(),
                "type": kind,
            }
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::invalid_request("bad method"), StatusCode::BAD_REQUEST),
            (Error::model_unavailable("no weights"), StatusCode::SERVICE_UNAVAILABLE),
            (
                ExternalServiceError::MissingCredential("OPENAI_API_KEY").into(),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ExternalServiceError::Status {
                    status: 401,
                    message: "bad key".to_string(),
                }
                .into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ExternalServiceError::Request("timeout".to_string()).into(),
                StatusCode::BAD_GATEWAY,
            ),
            (Error::storage("disk full"), StatusCode::INTERNAL_SERVER_ERROR),
            (
                Error::invalid_model_output("3 != 5"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(AppError(error).status_code(), expected);
        }
    }

    #[test]
    fn test_response_status() {
        let response = AppError(Error::storage("disk full")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
