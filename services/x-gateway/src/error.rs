//! Request-scoped error types
//!
//! Every failure in the authorization flow or the API facade becomes a
//! `FlowError` at the handler boundary and is rendered as
//! `{"error": "<safe summary>"}`. Provider error details are logged, never
//! returned to the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Failures a single gateway request can end in.
#[derive(Error, Debug)]
pub enum FlowError {
    /// Callback `state` missing, unknown, expired, replayed or mismatched
    #[error("invalid or expired state")]
    InvalidState,

    /// State matched but no verifier was stored for it
    #[error("invalid or expired verifier")]
    MissingVerifier,

    /// Required form field absent or empty
    #[error("missing form field: {0}")]
    MissingField(&'static str),

    /// No tokens stored yet; the user must complete /oAuth2 first
    #[error("not authorized: complete /oAuth2 first")]
    NotAuthorized,

    #[error(transparent)]
    Provider(#[from] x_oauth::Error),

    #[error("store error: {0}")]
    Store(#[from] kv_store::Error),
}

impl FlowError {
    /// 400 for problems the caller can fix by restarting the flow, 401 when
    /// no tokens exist yet, 504 for provider timeouts, 500 otherwise.
    pub fn status(&self) -> StatusCode {
        match self {
            FlowError::InvalidState | FlowError::MissingVerifier | FlowError::MissingField(_) => {
                StatusCode::BAD_REQUEST
            }
            FlowError::NotAuthorized => StatusCode::UNAUTHORIZED,
            FlowError::Provider(x_oauth::Error::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            FlowError::Provider(_) | FlowError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FlowError::InvalidState => "invalid_state",
            FlowError::MissingVerifier => "missing_verifier",
            FlowError::MissingField(_) => "missing_field",
            FlowError::NotAuthorized => "not_authorized",
            FlowError::Provider(x_oauth::Error::Http(_)) => "http",
            FlowError::Provider(x_oauth::Error::Timeout(_)) => "timeout",
            FlowError::Provider(x_oauth::Error::TokenExchange(_)) => "token_exchange",
            FlowError::Provider(x_oauth::Error::MalformedResponse(_)) => "malformed_response",
            FlowError::Provider(x_oauth::Error::ApiCall { .. }) => "api_call",
            FlowError::Provider(x_oauth::Error::InvalidEndpoint(_)) => "invalid_endpoint",
            FlowError::Store(_) => "store",
        }
    }

    /// Message safe to show the caller.
    fn public_message(&self) -> &'static str {
        match self {
            FlowError::InvalidState => "Invalid or expired state",
            FlowError::MissingVerifier => "Invalid or expired verifier",
            FlowError::MissingField(_) => "Missing required form field",
            FlowError::NotAuthorized => "Not authorized: complete /oAuth2 first",
            FlowError::Provider(x_oauth::Error::Timeout(_)) => "Upstream request timed out",
            FlowError::Provider(x_oauth::Error::ApiCall { .. }) => "X API call failed",
            FlowError::Provider(_) => "Failed to fetch token",
            FlowError::Store(_) => "Internal Server Error",
        }
    }
}

impl IntoResponse for FlowError {
    fn into_response(self) -> Response {
        let mut body = serde_json::json!({ "error": self.public_message() });
        if let FlowError::MissingField(field) = &self {
            body["field"] = serde_json::json!(field);
        }
        // Upstream status is useful to API callers and reveals nothing sensitive
        if let FlowError::Provider(x_oauth::Error::ApiCall { status, .. }) = &self {
            body["status"] = serde_json::json!(status);
        }
        (
            self.status(),
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
