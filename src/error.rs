//! Error types for the price relay.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Service-level errors that can occur while handling a price check.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Only shopping search supported")]
    UnsupportedSearchType(String),

    #[error("Oxylabs not configured")]
    ProviderNotConfigured,

    #[error("Timeout")]
    ProviderTimeout,

    #[error("Oxylabs HTTP {0}")]
    ProviderHttp(u16),

    #[error("{0}")]
    ProviderRequest(String),

    #[error("No organic results found")]
    NoOrganicResults,

    #[error("Summarizer error: {0}")]
    Summarizer(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::InvalidRequest(_) | ServiceError::UnsupportedSearchType(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Failures reported by the search vendor.
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            ServiceError::ProviderNotConfigured
                | ServiceError::ProviderTimeout
                | ServiceError::ProviderHttp(_)
                | ServiceError::ProviderRequest(_)
                | ServiceError::NoOrganicResults
        )
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ServiceError::ProviderTimeout
        } else if let Some(status) = err.status() {
            ServiceError::ProviderHttp(status.as_u16())
        } else {
            ServiceError::ProviderRequest(err.to_string())
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Price check failed");
        }

        // Provider failures keep the offer list shape so the extension can render "no offers".
        let body = if self.is_provider_error() {
            json!({
                "error": self.to_string(),
                "offers": [],
                "total_offers": 0,
            })
        } else {
            json!({ "error": self.to_string() })
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: ServiceError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_invalid_request_is_bad_request() {
        let (status, body) = body_json(ServiceError::InvalidRequest("query or upc required".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "query or upc required");
        assert!(body.get("offers").is_none());
    }

    #[tokio::test]
    async fn test_unsupported_search_type_message() {
        let (status, body) = body_json(ServiceError::UnsupportedSearchType("images".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Only shopping search supported");
    }

    #[tokio::test]
    async fn test_provider_http_error_keeps_offer_shape() {
        let (status, body) = body_json(ServiceError::ProviderHttp(401)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Oxylabs HTTP 401");
        assert_eq!(body["offers"], serde_json::json!([]));
        assert_eq!(body["total_offers"], 0);
    }

    #[tokio::test]
    async fn test_internal_error_has_plain_envelope() {
        let (status, body) = body_json(ServiceError::Internal("boom".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("boom"));
        assert!(body.get("total_offers").is_none());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(ServiceError::ProviderNotConfigured.to_string(), "Oxylabs not configured");
        assert_eq!(ServiceError::ProviderTimeout.to_string(), "Timeout");
        assert_eq!(ServiceError::NoOrganicResults.to_string(), "No organic results found");
    }
}
