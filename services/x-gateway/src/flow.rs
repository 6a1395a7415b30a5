//! Authorization flow state machine
//!
//! `transition` is pure: it receives the current state and an event and
//! returns the next state. The `Orchestrator` performs the I/O implied by
//! each step (store reads/writes, the token exchange) and logs every
//! transition.
//!
//! Session data is keyed by the `state` parameter, so any number of
//! authorization attempts can be in flight at once:
//!
//! - `state:{state}`    -> the state itself (TTL)
//! - `verifier:{state}` -> the PKCE verifier (TTL)
//! - `accessToken`, `refreshToken` -> the latest token pair (no TTL)

use std::sync::Arc;
use std::time::Duration;

use kv_store::KvStore;
use tracing::{debug, info, warn};
use x_oauth::{OAuthClient, TokenPair};

use crate::error::FlowError;
use crate::metrics;

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

fn state_key(state: &str) -> String {
    format!("state:{state}")
}

fn verifier_key(state: &str) -> String {
    format!("verifier:{state}")
}

/// Where one authorization attempt currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    Start,
    /// Session persisted, user sent to the provider
    AwaitingCallback { state: String },
    /// Callback validated and session consumed; token request in flight
    Exchanging { state: String },
    /// Tokens persisted
    Complete,
    /// Terminal failure; absorbs every further event
    Error { reason: &'static str },
}

/// Events that drive a flow forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    /// Verifier and state persisted, authorize URL built
    AuthorizationStarted { state: String },
    /// Callback `state` matched the stored session and a verifier was found
    CallbackValidated,
    /// Token endpoint returned a pair and it was persisted
    TokensIssued,
    Failed { reason: &'static str },
}

/// Compute the next flow state. Pure function: no I/O.
pub fn transition(state: FlowState, event: FlowEvent) -> FlowState {
    match (state, event) {
        (error @ FlowState::Error { .. }, _) => error,

        (_, FlowEvent::Failed { reason }) => FlowState::Error { reason },

        (FlowState::Start, FlowEvent::AuthorizationStarted { state }) => {
            FlowState::AwaitingCallback { state }
        }

        (FlowState::AwaitingCallback { state }, FlowEvent::CallbackValidated) => {
            FlowState::Exchanging { state }
        }

        (FlowState::Exchanging { .. }, FlowEvent::TokensIssued) => FlowState::Complete,

        // Out-of-order event: stay put
        (state, _event) => state,
    }
}

/// Drives the PKCE flow against the key-value store and the token endpoint.
pub struct Orchestrator {
    store: Arc<dyn KvStore>,
    oauth: OAuthClient,
    session_ttl: Duration,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn KvStore>, oauth: OAuthClient, session_ttl: Duration) -> Self {
        Self {
            store,
            oauth,
            session_ttl,
        }
    }

    /// Start a new attempt: persist the session and return the authorize URL
    /// the caller should be redirected to.
    pub async fn begin_authorization(&self) -> Result<String, FlowError> {
        let result = self.start_session().await;
        match &result {
            Ok(_) => metrics::record_flow_step("authorize", "success"),
            Err(e) => {
                warn!(error = %e, kind = e.kind(), "failed to start authorization");
                metrics::record_flow_step("authorize", e.kind());
            }
        }
        result
    }

    async fn start_session(&self) -> Result<String, FlowError> {
        let verifier = x_oauth::generate_verifier();
        let state = x_oauth::generate_state();
        let challenge = x_oauth::compute_challenge(&verifier);

        self.store
            .put(&verifier_key(&state), verifier, Some(self.session_ttl))
            .await?;
        self.store
            .put(&state_key(&state), state.clone(), Some(self.session_ttl))
            .await?;

        let url = self.oauth.build_authorization_url(&state, &challenge);
        self.advance(
            FlowState::Start,
            FlowEvent::AuthorizationStarted {
                state: state.clone(),
            },
        );
        Ok(url)
    }

    /// Validate the provider callback, exchange the code, persist the tokens.
    ///
    /// The session is consumed before the exchange, so a replayed callback
    /// with the same `state` is rejected whatever the exchange outcome.
    pub async fn handle_callback(
        &self,
        code: Option<&str>,
        state: Option<&str>,
    ) -> Result<TokenPair, FlowError> {
        let result = self.complete_session(code, state).await;
        match &result {
            Ok(_) => metrics::record_flow_step("callback", "success"),
            Err(e) => {
                warn!(error = %e, kind = e.kind(), "authorization callback failed");
                metrics::record_flow_step("callback", e.kind());
            }
        }
        result
    }

    async fn complete_session(
        &self,
        code: Option<&str>,
        state: Option<&str>,
    ) -> Result<TokenPair, FlowError> {
        let code = code.filter(|c| !c.is_empty());
        let state = state.filter(|s| !s.is_empty());
        let (Some(code), Some(state)) = (code, state) else {
            return Err(FlowError::InvalidState);
        };

        let flow = FlowState::AwaitingCallback {
            state: state.to_owned(),
        };

        // The session lives under the exact state string, so an exact-key hit
        // is the equality check: no trimming, case folding or decoding.
        if self.store.get(&state_key(state)).await?.is_none() {
            return Err(self.fail(flow, FlowError::InvalidState));
        }

        let Some(verifier) = self.store.get(&verifier_key(state)).await? else {
            // Consume what is left of the session so the state can't be retried
            self.store.delete(&state_key(state)).await?;
            return Err(self.fail(flow, FlowError::MissingVerifier));
        };

        self.store.delete(&state_key(state)).await?;
        self.store.delete(&verifier_key(state)).await?;
        let flow = self.advance(flow, FlowEvent::CallbackValidated);

        let pair = match self.oauth.exchange_code(code, &verifier).await {
            Ok(pair) => pair,
            Err(e) => return Err(self.fail(flow, e.into())),
        };

        if let Err(e) = self.persist_tokens(&pair).await {
            return Err(self.fail(flow, e));
        }
        self.advance(flow, FlowEvent::TokensIssued);
        Ok(pair)
    }

    /// Trade the stored refresh token for a new pair and persist it.
    pub async fn refresh(&self) -> Result<TokenPair, FlowError> {
        let result = self.refresh_stored().await;
        match &result {
            Ok(_) => {
                info!("token pair refreshed");
                metrics::record_flow_step("refresh", "success");
            }
            Err(e) => {
                warn!(error = %e, kind = e.kind(), "token refresh failed");
                metrics::record_flow_step("refresh", e.kind());
            }
        }
        result
    }

    async fn refresh_stored(&self) -> Result<TokenPair, FlowError> {
        let refresh = self
            .store
            .get(REFRESH_TOKEN_KEY)
            .await?
            .ok_or(FlowError::NotAuthorized)?;
        let pair = self.oauth.refresh_token(&refresh).await?;
        self.persist_tokens(&pair).await?;
        Ok(pair)
    }

    /// The stored access token, or `NotAuthorized` if the flow never completed.
    pub async fn access_token(&self) -> Result<String, FlowError> {
        self.store
            .get(ACCESS_TOKEN_KEY)
            .await?
            .filter(|t| !t.is_empty())
            .ok_or(FlowError::NotAuthorized)
    }

    async fn persist_tokens(&self, pair: &TokenPair) -> Result<(), FlowError> {
        self.store
            .put(ACCESS_TOKEN_KEY, pair.access_token.clone(), None)
            .await?;
        self.store
            .put(REFRESH_TOKEN_KEY, pair.refresh_token.clone(), None)
            .await?;
        debug!(backend = self.store.backend(), "token pair persisted");
        Ok(())
    }

    fn advance(&self, from: FlowState, event: FlowEvent) -> FlowState {
        let to = transition(from.clone(), event);
        match &to {
            FlowState::Error { reason } => warn!(?from, reason, "flow failed"),
            FlowState::AwaitingCallback { state } | FlowState::Exchanging { state } => {
                info!(state = %state, ?from, "flow transition")
            }
            _ => info!(?from, to = ?to, "flow transition"),
        }
        to
    }

    fn fail(&self, from: FlowState, err: FlowError) -> FlowError {
        self.advance(from, FlowEvent::Failed { reason: err.kind() });
        err
    }
}
