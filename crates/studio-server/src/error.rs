//! API Error Types
//!
//! One error enum for every handler, mapped onto the status taxonomy the
//! SPA expects: 400 for bad input, 401 for webhook signatures, 403/404 for
//! ledger outcomes, 503 for unconfigured features, 500 for upstream
//! failures with the upstream body surfaced under `details`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

use studio_imaging::ImagingError;
use studio_ledger::LedgerError;
use studio_payments::PaymentError;

/// Errors a handler can surface to the SPA
#[derive(Error, Debug)]
pub enum ApiError {
    /// Required field missing or unusable
    #[error("{0}")]
    BadRequest(String),

    /// Webhook signature missing or mismatched
    #[error("Invalid signature")]
    InvalidSignature,

    /// Balance below the requested deduction
    #[error("Insufficient credits")]
    InsufficientCredits { available: i64 },

    /// No balance row exists for the user
    #[error("No credit record found")]
    NoCreditRecord,

    /// The feature's upstream credentials are absent
    #[error("{0} is not configured")]
    Unconfigured(&'static str),

    /// Upstream or store failure; detail goes to the caller
    #[error("{message}")]
    Upstream {
        message: String,
        details: Option<Value>,
    },
}

impl ApiError {
    /// Upstream failure with an endpoint-specific message
    pub fn upstream(message: impl Into<String>, details: Option<Value>) -> Self {
        ApiError::Upstream {
            message: message.into(),
            details,
        }
    }

    /// Map an imaging failure, keeping the original error body as detail
    pub fn from_imaging(message: &'static str, err: ImagingError) -> Self {
        match err {
            ImagingError::InvalidImage(detail) => {
                ApiError::BadRequest(format!("Invalid image data: {detail}"))
            }
            ImagingError::Api { body, .. } => ApiError::upstream(message, Some(detail_value(&body))),
            other => ApiError::upstream(message, Some(Value::String(other.to_string()))),
        }
    }
}

/// Upstream bodies are JSON when we are lucky, raw text otherwise
fn detail_value(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Upstream {
            message: err.user_message().to_string(),
            details: Some(Value::String(err.to_string())),
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::UnknownPlan(_) | PaymentError::UnknownInterval(_) => {
                ApiError::BadRequest(err.to_string())
            }
            PaymentError::WebhookParse(detail) => {
                ApiError::BadRequest(format!("Invalid webhook payload: {detail}"))
            }
            PaymentError::Signature => ApiError::InvalidSignature,
            PaymentError::Api { body, .. } => ApiError::Upstream {
                message: "Failed to create checkout session".into(),
                details: Some(detail_value(&body)),
            },
            PaymentError::Ledger(inner) => inner.into(),
            other => ApiError::Upstream {
                message: other.user_message().to_string(),
                details: Some(Value::String(other.to_string())),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Upstream { message, details } => {
                tracing::error!(details = ?details, "{message}");
            }
            ApiError::BadRequest(message) => tracing::debug!("Rejected request: {message}"),
            other => tracing::warn!("{other}"),
        }

        let (status, body) = match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, json!({"error": message}))
            }
            ApiError::InvalidSignature => (
                StatusCode::UNAUTHORIZED,
                json!({"error": "Invalid signature"}),
            ),
            ApiError::InsufficientCredits { available } => (
                StatusCode::FORBIDDEN,
                json!({"error": "Insufficient credits", "available": available}),
            ),
            ApiError::NoCreditRecord => (
                StatusCode::NOT_FOUND,
                json!({"error": "No credit record found"}),
            ),
            ApiError::Unconfigured(feature) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({"error": format!("{feature} is not configured")}),
            ),
            ApiError::Upstream { message, details } => {
                let mut body = json!({"error": message});
                if let Some(details) = details {
                    body["details"] = details;
                }
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_credits_carries_available() {
        let response = ApiError::InsufficientCredits { available: 2 }.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_unknown_plan_maps_to_bad_request() {
        let err = ApiError::from(PaymentError::UnknownPlan("enterprise".into()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_upstream_json_body_passes_through_as_detail() {
        let detail = detail_value(r#"{"errors": [{"title": "rate limited"}]}"#);
        assert!(detail.is_object());

        let detail = detail_value("plain text failure");
        assert_eq!(detail, Value::String("plain text failure".into()));
    }

    #[test]
    fn test_invalid_image_maps_to_bad_request() {
        let err = ApiError::from_imaging(
            "Failed to remove background",
            ImagingError::InvalidImage("empty image payload".into()),
        );
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_upstream_api_error_maps_to_internal() {
        let err = ApiError::from_imaging(
            "Failed to remove background",
            ImagingError::Api {
                status: 402,
                body: r#"{"errors":[{"title":"insufficient api credits"}]}"#.into(),
            },
        );
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
