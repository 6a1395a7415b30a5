//! PKCE (Proof Key for Code Exchange) helpers per RFC 7636
//!
//! The verifier is stored server-side between the two legs of the redirect
//! and only sent during token exchange; the S256 challenge goes out in the
//! authorization URL so the provider can bind the code to this client.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use rand::RngExt;
use sha2::{Digest, Sha256};

/// Generate a cryptographically random PKCE code verifier.
///
/// 32 random bytes hex-encoded to 64 characters, inside RFC 7636's
/// 43-128 character range and made only of unreserved characters.
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// Compute the S256 code challenge from a verifier.
///
/// `challenge = BASE64URL-NOPAD(SHA256(verifier))`
pub fn compute_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Fresh opaque `state` value for CSRF binding between the two legs.
pub fn generate_state() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// HTTP Basic credentials for confidential-client authentication at the
/// token endpoint.
pub fn basic_auth_header(client_id: &str, client_secret: &str) -> String {
    let credentials = format!("{client_id}:{client_secret}");
    format!("Basic {}", STANDARD.encode(credentials))
}
