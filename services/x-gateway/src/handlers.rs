//! HTTP surface
//!
//! Endpoints:
//! - GET  /               liveness
//! - GET  /oAuth2         start the PKCE flow, 302 to the provider
//! - GET  /callback       provider redirect target; returns the token pair
//! - POST /oAuth2/refresh trade the stored refresh token for a new pair
//! - GET  /x-tweets       look up posts by `ids`
//! - POST /x-tweets       publish a post with `text`
//! - GET  /metrics        Prometheus text exposition

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::extract::{Form, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use serde_json::Value;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use x_oauth::XApi;

use crate::error::FlowError;
use crate::flow::Orchestrator;
use crate::metrics;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub flow: Arc<Orchestrator>,
    pub api: XApi,
    pub prometheus: PrometheusHandle,
}

/// Build the router with CORS and the concurrency limit applied to every route.
pub fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/oAuth2", get(begin_oauth))
        .route("/oAuth2/refresh", post(refresh_tokens))
        .route("/callback", get(callback))
        .route("/x-tweets", get(fetch_tweets).post(publish_tweet))
        .route("/metrics", get(metrics_handler))
        .layer(CorsLayer::permissive())
        .layer(ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

fn json_response(status: StatusCode, body: Value) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
        .into_response()
}

/// Record the request duration against its route and pass the response through.
fn observed(route: &'static str, started: Instant, response: Response) -> Response {
    metrics::record_request(
        route,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, "x-oauth-gateway is running")
}

/// GET /oAuth2: persist a new session and redirect to the provider.
async fn begin_oauth(State(state): State<AppState>) -> Response {
    let started = Instant::now();
    let response = match state.flow.begin_authorization().await {
        Ok(url) => (StatusCode::FOUND, [(header::LOCATION, url)]).into_response(),
        Err(e) => e.into_response(),
    };
    observed("/oAuth2", started, response)
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
}

/// GET /callback: validate state, exchange the code, return the token pair.
///
/// A query string that doesn't parse (a repeated `state`, say) carries no
/// usable state and is answered like any other state failure.
async fn callback(
    State(state): State<AppState>,
    params: Result<Query<CallbackParams>, QueryRejection>,
) -> Response {
    let started = Instant::now();
    let params = match params {
        Ok(Query(params)) => params,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "unparseable callback query");
            CallbackParams {
                code: None,
                state: None,
            }
        }
    };
    let response = match state
        .flow
        .handle_callback(params.code.as_deref(), params.state.as_deref())
        .await
    {
        Ok(pair) => {
            info!("authorization completed");
            json_response(StatusCode::OK, serde_json::json!(pair))
        }
        Err(e) => e.into_response(),
    };
    observed("/callback", started, response)
}

/// POST /oAuth2/refresh
async fn refresh_tokens(State(state): State<AppState>) -> Response {
    let started = Instant::now();
    let response = match state.flow.refresh().await {
        Ok(pair) => json_response(StatusCode::OK, serde_json::json!(pair)),
        Err(e) => e.into_response(),
    };
    observed("/oAuth2/refresh", started, response)
}

#[derive(Debug, Deserialize)]
struct FetchForm {
    ids: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PublishForm {
    text: Option<String>,
}

/// GET /x-tweets: `ids` comes from the query string.
async fn fetch_tweets(
    State(state): State<AppState>,
    form: Result<Form<FetchForm>, FormRejection>,
) -> Response {
    let started = Instant::now();
    let result = match form {
        Ok(Form(form)) => fetch_posts(&state, form.ids).await,
        Err(rejection) => Err(unreadable_form(rejection, "ids")),
    };
    let response = api_response("fetch_posts", result);
    observed("/x-tweets", started, response)
}

/// POST /x-tweets: `text` comes from the urlencoded body.
async fn publish_tweet(
    State(state): State<AppState>,
    form: Result<Form<PublishForm>, FormRejection>,
) -> Response {
    let started = Instant::now();
    let result = match form {
        Ok(Form(form)) => publish_post(&state, form.text).await,
        Err(rejection) => Err(unreadable_form(rejection, "text")),
    };
    let response = api_response("publish_post", result);
    observed("/x-tweets", started, response)
}

/// A body or query the form extractor can't read never yields the field.
fn unreadable_form(rejection: FormRejection, field: &'static str) -> FlowError {
    warn!(
        field,
        status = rejection.status().as_u16(),
        error = %rejection.body_text(),
        "unreadable form"
    );
    FlowError::MissingField(field)
}

async fn fetch_posts(state: &AppState, ids: Option<String>) -> Result<Value, FlowError> {
    let ids = ids
        .filter(|ids| !ids.is_empty())
        .ok_or(FlowError::MissingField("ids"))?;
    let token = state.flow.access_token().await?;
    Ok(state.api.fetch_posts(&ids, &token).await?)
}

async fn publish_post(state: &AppState, text: Option<String>) -> Result<Value, FlowError> {
    let text = text
        .filter(|text| !text.is_empty())
        .ok_or(FlowError::MissingField("text"))?;
    let token = state.flow.access_token().await?;
    Ok(state.api.publish_post(&text, &token).await?)
}

fn api_response(operation: &'static str, result: Result<Value, FlowError>) -> Response {
    match result {
        Ok(data) => {
            metrics::record_api_call(operation, "success");
            json_response(StatusCode::OK, serde_json::json!({ "data": data }))
        }
        Err(e) => {
            warn!(operation, error = %e, kind = e.kind(), "API call failed");
            metrics::record_api_call(operation, e.kind());
            e.into_response()
        }
    }
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}
