//! OAuth client for the provider's authorize and token endpoints
//!
//! Building the authorization URL is pure; only the two token endpoint
//! interactions touch the network:
//! 1. Authorization code exchange (completes the PKCE flow)
//! 2. Token refresh (caller-invoked)
//!
//! Both POST form-encoded bodies to the token endpoint. The client
//! authenticates either with an HTTP Basic header (canonical) or by putting
//! `client_secret` in the form body, never both.

use std::time::Duration;

use common::Secret;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::constants::{
    AUTHORIZE_ENDPOINT, CODE_CHALLENGE_METHOD, DEFAULT_SCOPES, DEFAULT_TIMEOUT, TOKEN_ENDPOINT,
};
use crate::error::{Error, Result};
use crate::pkce::basic_auth_header;
use crate::token::{TokenPair, TokenResponse, provider_error_description};

/// How the client proves its identity to the token endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientAuth {
    /// `Authorization: Basic base64(client_id:client_secret)`
    #[default]
    Basic,
    /// `client_secret` in the form body, for providers that reject Basic
    Body,
}

/// Everything needed to talk to the provider on behalf of one registered app.
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
    pub client_auth: ClientAuth,
    pub timeout: Duration,
}

impl OAuthSettings {
    /// Settings pointing at the production X endpoints with default scopes.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: Secret<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            redirect_uri: redirect_uri.into(),
            authorize_url: AUTHORIZE_ENDPOINT.to_string(),
            token_url: TOKEN_ENDPOINT.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            client_auth: ClientAuth::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Stateless client for the authorize/token endpoints.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
    authorize_url: Url,
    token_url: Url,
    settings: OAuthSettings,
}

impl OAuthClient {
    /// Validate the endpoint URLs once so later URL building can't fail.
    pub fn new(http: reqwest::Client, settings: OAuthSettings) -> Result<Self> {
        let authorize_url = Url::parse(&settings.authorize_url).map_err(|e| {
            Error::InvalidEndpoint(format!("authorize_url {}: {e}", settings.authorize_url))
        })?;
        let token_url = Url::parse(&settings.token_url)
            .map_err(|e| Error::InvalidEndpoint(format!("token_url {}: {e}", settings.token_url)))?;

        Ok(Self {
            http,
            authorize_url,
            token_url,
            settings,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.settings.client_id
    }

    pub fn redirect_uri(&self) -> &str {
        &self.settings.redirect_uri
    }

    /// Build the authorization URL the user's browser is redirected to.
    ///
    /// Appends exactly seven parameters, form-encoded: response_type,
    /// client_id, redirect_uri, scope (space-joined), state, code_challenge
    /// and code_challenge_method. No network call is made.
    pub fn build_authorization_url(&self, state: &str, challenge: &str) -> String {
        let scope = self.settings.scopes.join(" ");
        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.settings.client_id)
            .append_pair("redirect_uri", &self.settings.redirect_uri)
            .append_pair("scope", &scope)
            .append_pair("state", state)
            .append_pair("code_challenge", challenge)
            .append_pair("code_challenge_method", CODE_CHALLENGE_METHOD);
        url.into()
    }

    /// Exchange an authorization code plus the PKCE verifier for tokens.
    #[instrument(skip_all, fields(grant_type = "authorization_code"))]
    pub async fn exchange_code(&self, code: &str, verifier: &str) -> Result<TokenPair> {
        self.token_request(vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.settings.redirect_uri.as_str()),
            ("code_verifier", verifier),
        ])
        .await
    }

    /// Trade a refresh token for a new token pair.
    #[instrument(skip_all, fields(grant_type = "refresh_token"))]
    pub async fn refresh_token(&self, refresh: &str) -> Result<TokenPair> {
        self.token_request(vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh),
        ])
        .await
    }

    /// POST a grant to the token endpoint and classify the outcome.
    ///
    /// Non-2xx is always `TokenExchange`; a 2xx body that isn't a complete
    /// token pair is `MalformedResponse`. No retries.
    async fn token_request(&self, mut form: Vec<(&str, &str)>) -> Result<TokenPair> {
        form.push(("client_id", self.settings.client_id.as_str()));

        let mut request = self
            .http
            .post(self.token_url.clone())
            .timeout(self.settings.timeout);

        match self.settings.client_auth {
            ClientAuth::Basic => {
                request = request.header(
                    AUTHORIZATION,
                    basic_auth_header(
                        &self.settings.client_id,
                        self.settings.client_secret.expose(),
                    ),
                );
            }
            ClientAuth::Body => {
                form.push(("client_secret", self.settings.client_secret.expose().as_str()));
            }
        }

        let response = request
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::transport("token request", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport("reading token response", e))?;

        if !status.is_success() {
            let reason = provider_error_description(status, &body);
            warn!(%status, %reason, "token endpoint rejected request");
            return Err(Error::TokenExchange(reason));
        }

        let pair = TokenResponse::parse(&body)?.into_pair()?;
        debug!("token endpoint issued token pair");
        Ok(pair)
    }
}
