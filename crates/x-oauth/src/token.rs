//! Token endpoint response shapes
//!
//! The provider answers both grant types (authorization_code, refresh_token)
//! with the same JSON body. Only `access_token` and `refresh_token` are
//! required here; everything else is informational.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Raw success body from the token endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Seconds until the access token expires (delta, not absolute)
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Parse a 2xx token endpoint body.
    pub fn parse(body: &str) -> Result<Self> {
        serde_json::from_str(body)
            .map_err(|e| Error::MalformedResponse(format!("token response is not valid JSON: {e}")))
    }

    /// Require both tokens to be present and nonempty.
    pub fn into_pair(self) -> Result<TokenPair> {
        let access_token = self
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::MalformedResponse("missing access_token".into()))?;
        let refresh_token = self
            .refresh_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                Error::MalformedResponse(
                    "missing refresh_token (is offline.access in the requested scopes?)".into(),
                )
            })?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}

/// Access + refresh token as handed back to HTTP callers.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Pull a human-readable reason out of a non-2xx token endpoint body.
///
/// Prefers `error_description`, then `error`, then the raw body.
pub(crate) fn provider_error_description(status: reqwest::StatusCode, body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<String>,
        error_description: Option<String>,
    }

    let parsed = serde_json::from_str::<ErrorBody>(body).ok();
    let reason = parsed
        .and_then(|b| b.error_description.or(b.error))
        .filter(|r| !r.is_empty());

    match reason {
        Some(reason) => reason,
        None if !body.trim().is_empty() => format!("{status}: {}", body.trim()),
        None => status.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_response_yields_pair() {
        let body = r#"{"token_type":"bearer","expires_in":7200,"access_token":"at_abc","scope":"tweet.read offline.access","refresh_token":"rt_def"}"#;
        let response = TokenResponse::parse(body).unwrap();
        assert_eq!(response.expires_in, Some(7200));
        assert_eq!(response.token_type.as_deref(), Some("bearer"));

        let pair = response.into_pair().unwrap();
        assert_eq!(pair.access_token, "at_abc");
        assert_eq!(pair.refresh_token, "rt_def");
    }

    #[test]
    fn missing_refresh_token_is_malformed() {
        let response = TokenResponse::parse(r#"{"access_token":"at_abc"}"#).unwrap();
        let err = response.into_pair().unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)), "got: {err:?}");
        assert!(err.to_string().contains("refresh_token"));
    }

    #[test]
    fn empty_access_token_is_malformed() {
        let response =
            TokenResponse::parse(r#"{"access_token":"","refresh_token":"rt"}"#).unwrap();
        assert!(matches!(
            response.into_pair(),
            Err(Error::MalformedResponse(_))
        ));
    }

    #[test]
    fn non_json_body_is_malformed() {
        let err = TokenResponse::parse("access_token=at&refresh_token=rt").unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[test]
    fn pair_serializes_camel_case() {
        let pair = TokenPair {
            access_token: "at".into(),
            refresh_token: "rt".into(),
        };
        let json = serde_json::to_value(&pair).unwrap();
        assert_eq!(json, serde_json::json!({"accessToken": "at", "refreshToken": "rt"}));
    }

    #[test]
    fn pair_debug_redacts_tokens() {
        let pair = TokenPair {
            access_token: "at_secret".into(),
            refresh_token: "rt_secret".into(),
        };
        let debug = format!("{pair:?}");
        assert!(!debug.contains("at_secret"));
        assert!(!debug.contains("rt_secret"));
    }

    #[test]
    fn error_description_preferred() {
        let status = reqwest::StatusCode::BAD_REQUEST;
        assert_eq!(
            provider_error_description(
                status,
                r#"{"error":"invalid_request","error_description":"invalid_grant"}"#
            ),
            "invalid_grant"
        );
        assert_eq!(
            provider_error_description(status, r#"{"error":"invalid_client"}"#),
            "invalid_client"
        );
        assert_eq!(
            provider_error_description(status, "upstream exploded"),
            "400 Bad Request: upstream exploded"
        );
        assert_eq!(provider_error_description(status, ""), "400 Bad Request");
    }
}
