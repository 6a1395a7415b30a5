//! Authenticated v2 API calls made with a user access token
//!
//! Thin pass-through: the upstream JSON is returned as-is and any non-2xx
//! status becomes `Error::ApiCall` carrying the upstream body.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::constants::{API_BASE, DEFAULT_TIMEOUT};
use crate::error::{Error, Result};

/// Client for the `/2/tweets` endpoints.
#[derive(Debug, Clone)]
pub struct XApi {
    http: reqwest::Client,
    tweets_url: Url,
    timeout: Duration,
}

impl XApi {
    pub fn new(http: reqwest::Client, api_base: &str, timeout: Duration) -> Result<Self> {
        let tweets_url = Url::parse(&format!("{}/2/tweets", api_base.trim_end_matches('/')))
            .map_err(|e| Error::InvalidEndpoint(format!("api_base {api_base}: {e}")))?;
        Ok(Self {
            http,
            tweets_url,
            timeout,
        })
    }

    /// Client for the production API with the default timeout.
    pub fn production(http: reqwest::Client) -> Result<Self> {
        Self::new(http, API_BASE, DEFAULT_TIMEOUT)
    }

    /// Look up posts by id. `ids` is a comma-separated list.
    #[instrument(skip_all, fields(operation = "fetch_posts"))]
    pub async fn fetch_posts(&self, ids: &str, access_token: &str) -> Result<Value> {
        let mut url = self.tweets_url.clone();
        url.query_pairs_mut()
            .append_pair("ids", ids)
            .append_pair("tweet.fields", "lang,author_id")
            .append_pair("user.fields", "created_at");

        let request = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .timeout(self.timeout);
        self.send(request).await
    }

    /// Publish a post with the given text.
    #[instrument(skip_all, fields(operation = "publish_post"))]
    pub async fn publish_post(&self, text: &str, access_token: &str) -> Result<Value> {
        let request = self
            .http
            .post(self.tweets_url.clone())
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "text": text }))
            .timeout(self.timeout);
        self.send(request).await
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::transport("API request", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport("reading API response", e))?;

        if !status.is_success() {
            warn!(%status, "API call rejected");
            return Err(Error::ApiCall {
                status: status.as_u16(),
                body,
            });
        }

        debug!(%status, "API call succeeded");
        // Non-JSON success bodies are passed through as a string
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode, Uri};
    use axum::routing::get;
    use tokio::net::TcpListener;

    /// Mock v2 API that echoes what it received, or fails for ids=404.
    async fn start_api_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let app = axum::Router::new().route(
            "/2/tweets",
            get(|headers: HeaderMap, uri: Uri| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                let query = uri.query().unwrap_or("").to_string();
                if query.contains("ids=404") {
                    return (
                        StatusCode::NOT_FOUND,
                        axum::Json(serde_json::json!({"title": "Not Found Error"})),
                    );
                }
                (
                    StatusCode::OK,
                    axum::Json(serde_json::json!({"auth": auth, "query": query})),
                )
            })
            .post(|headers: HeaderMap, axum::Json(body): axum::Json<Value>| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                if auth != "Bearer at_valid" {
                    return (
                        StatusCode::UNAUTHORIZED,
                        axum::Json(serde_json::json!({"title": "Unauthorized"})),
                    );
                }
                (
                    StatusCode::CREATED,
                    axum::Json(serde_json::json!({"data": {"id": "1", "text": body["text"]}})),
                )
            }),
        );
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{addr}")
    }

    fn api(base: &str) -> XApi {
        XApi::new(reqwest::Client::new(), base, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn fetch_posts_sends_bearer_and_fields() {
        let base = start_api_server().await;
        let json = api(&base).fetch_posts("20,21", "at_valid").await.unwrap();

        assert_eq!(json["auth"], "Bearer at_valid");
        let query = json["query"].as_str().unwrap();
        assert!(query.contains("ids=20%2C21"), "got: {query}");
        assert!(query.contains("tweet.fields=lang%2Cauthor_id"), "got: {query}");
        assert!(query.contains("user.fields=created_at"), "got: {query}");
    }

    #[tokio::test]
    async fn fetch_posts_non_success_is_api_call_error() {
        let base = start_api_server().await;
        let err = api(&base).fetch_posts("404", "at_valid").await.unwrap_err();
        match err {
            Error::ApiCall { status, body } => {
                assert_eq!(status, 404);
                assert!(body.contains("Not Found Error"));
            }
            other => panic!("expected ApiCall, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn publish_post_returns_upstream_json() {
        let base = start_api_server().await;
        let json = api(&base)
            .publish_post("hello from rust", "at_valid")
            .await
            .unwrap();
        assert_eq!(json["data"]["text"], "hello from rust");
    }

    #[tokio::test]
    async fn publish_post_with_bad_token_fails() {
        let base = start_api_server().await;
        let err = api(&base)
            .publish_post("hello", "at_expired")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ApiCall { status: 401, .. }), "got: {err:?}");
    }

    #[test]
    fn trailing_slash_in_base_is_ignored() {
        let api = api("https://api.twitter.com/");
        assert_eq!(api.tweets_url.as_str(), "https://api.twitter.com/2/tweets");
    }

    #[test]
    fn invalid_base_is_rejected() {
        let err = XApi::new(reqwest::Client::new(), "::nope", DEFAULT_TIMEOUT).unwrap_err();
        assert!(matches!(err, Error::InvalidEndpoint(_)));
    }
}
