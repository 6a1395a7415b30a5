//! X (Twitter) OAuth 2.0 endpoint defaults
//!
//! Official doc: https://developer.twitter.com/en/docs/authentication/oauth-2-0/user-access-token

use std::time::Duration;

/// Authorization endpoint the user's browser is redirected to.
pub const AUTHORIZE_ENDPOINT: &str = "https://twitter.com/i/oauth2/authorize";

/// Token endpoint for code exchange and token refresh.
pub const TOKEN_ENDPOINT: &str = "https://api.twitter.com/2/oauth2/token";

/// Base URL for the v2 API (`/2/tweets` and friends).
pub const API_BASE: &str = "https://api.twitter.com";

/// Only S256 is supported; `plain` offers no protection against code interception.
pub const CODE_CHALLENGE_METHOD: &str = "S256";

/// Scopes requested when the configuration doesn't override them.
/// `offline.access` is what makes the token endpoint return a refresh token.
pub const DEFAULT_SCOPES: &[&str] = &[
    "tweet.read",
    "users.read",
    "follows.read",
    "follows.write",
    "tweet.write",
    "offline.access",
];

/// Per-request timeout for the token endpoint and API calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
