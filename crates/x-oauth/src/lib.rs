//! X (Twitter) OAuth 2.0 PKCE client library
//!
//! Provides PKCE parameter generation, the authorize/token endpoint client,
//! and the two authenticated API calls the gateway exposes. Stateless: the
//! caller decides where the verifier, state and tokens are kept.
//!
//! Flow:
//! 1. Caller generates `pkce::generate_verifier()`, `pkce::generate_state()`
//!    and `pkce::compute_challenge()`, and persists verifier + state
//! 2. User is redirected to `OAuthClient::build_authorization_url()`
//! 3. On callback, caller validates state and calls `OAuthClient::exchange_code()`
//! 4. Later, `XApi` calls use the access token; `OAuthClient::refresh_token()`
//!    renews it on demand

pub mod api;
pub mod client;
pub mod constants;
pub mod error;
pub mod pkce;
pub mod token;

pub use api::XApi;
pub use client::{ClientAuth, OAuthClient, OAuthSettings};
pub use constants::*;
pub use error::{Error, Result};
pub use pkce::{basic_auth_header, compute_challenge, generate_state, generate_verifier};
pub use token::{TokenPair, TokenResponse};
