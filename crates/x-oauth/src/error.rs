//! Error types for provider operations

/// Errors from the token endpoint and the v2 API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("API call failed with status {status}: {body}")]
    ApiCall { status: u16, body: String },

    #[error("invalid endpoint URL: {0}")]
    InvalidEndpoint(String),
}

impl Error {
    /// Classify a reqwest transport error, keeping timeouts distinct.
    pub(crate) fn transport(context: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(format!("{context}: {e}"))
        } else {
            Error::Http(format!("{context}: {e}"))
        }
    }
}

/// Result alias for provider operations.
pub type Result<T> = std::result::Result<T, Error>;
