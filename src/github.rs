//! Credential-scoped GitHub API client.
//!
//! A thin wrapper over `reqwest` for the REST and GraphQL calls the
//! contribution pipeline makes. Each instance carries exactly one token;
//! per submission two instances are in play:
//!
//! - the **user** client (contributor's OAuth token): forks, branches,
//!   content commits, and the pull request itself, so authorship reflects
//!   the real contributor;
//! - the **bot** client (app credential): label attachment only, which
//!   needs permissions user tokens are not granted.
//!
//! The API base URL and request timeout come from [`GithubConfig`], so
//! tests and GitHub Enterprise deployments can point the client elsewhere.
//!
//! Failures are reported as [`ApiError`] values carrying the HTTP status
//! and the remote's `message` field, which the calling components classify
//! into domain error variants.

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::config::GithubConfig;

/// Sent on every request; GitHub rejects requests without a user agent.
const USER_AGENT: &str = concat!("jargons-editor/", env!("CARGO_PKG_VERSION"));

/// A failure while talking to the GitHub API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The remote answered with a non-success HTTP status.
    #[error("GitHub API responded {status} on {method} {path}: {message}")]
    Status {
        status: u16,
        method: &'static str,
        path: String,
        /// The remote's own `message` body field when present, otherwise
        /// the status line reason.
        message: String,
    },

    /// The request never produced a response (connect failure, timeout).
    #[error("GitHub API request failed on {method} {path}")]
    Transport {
        method: &'static str,
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// The GraphQL endpoint accepted the request but returned errors.
    #[error("GitHub GraphQL query failed: {message}")]
    Graphql { message: String },

    /// A response body did not match the expected shape.
    #[error("unexpected GitHub API response: {0}")]
    Decode(String),

    /// The underlying HTTP client could not be constructed.
    #[error("failed to construct GitHub HTTP client")]
    Client(#[source] reqwest::Error),
}

impl ApiError {
    /// HTTP status of the remote's answer, if the request got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The remote's error message, if the request got an answer.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            ApiError::Status { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// A GitHub API client bound to a single credential.
///
/// Cheap to construct per request; holds no state beyond the token and the
/// connection pool of its inner `reqwest` client.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

impl GithubClient {
    /// Build a client for the given token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Client`] if the underlying HTTP client cannot be
    /// constructed (effectively only on broken TLS setup).
    pub fn new(token: impl Into<String>, config: &GithubConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ApiError::Client)?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// `GET` a REST path and parse the JSON body.
    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.send("GET", path, None).await
    }

    /// `POST` a JSON body to a REST path and parse the JSON response.
    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.send("POST", path, Some(body)).await
    }

    /// `PUT` a JSON body to a REST path and parse the JSON response.
    pub async fn put(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.send("PUT", path, Some(body)).await
    }

    /// `DELETE` a REST path. Returns the HTTP status code; GitHub answers
    /// ref deletions with `204 No Content` and an empty body.
    pub async fn delete(&self, path: &str) -> Result<u16, ApiError> {
        let resp = self.request("DELETE", path, None).await?;
        let status = resp.status();

        if !status.is_success() {
            return Err(self.status_error("DELETE", path, resp).await);
        }

        Ok(status.as_u16())
    }

    /// Run a GraphQL query against `{api_base}/graphql` and return the
    /// `data` payload.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Graphql`] when the response carries an `errors`
    /// array, with the first error's message.
    pub async fn graphql(&self, query: &str, variables: Value) -> Result<Value, ApiError> {
        let body = serde_json::json!({ "query": query, "variables": variables });
        let mut response = self.send("POST", "/graphql", Some(&body)).await?;

        if let Some(errors) = response.get("errors").and_then(|e| e.as_array()) {
            if !errors.is_empty() {
                let message = errors[0]
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown GraphQL error")
                    .to_string();
                return Err(ApiError::Graphql { message });
            }
        }

        match response.get_mut("data") {
            Some(data) => Ok(data.take()),
            None => Err(ApiError::Decode("GraphQL response without data".into())),
        }
    }

    // ============ Internals ============

    async fn request(
        &self,
        method: &'static str,
        path: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}{}", self.api_base, path);
        let http_method = match method {
            "GET" => reqwest::Method::GET,
            "POST" => reqwest::Method::POST,
            "PUT" => reqwest::Method::PUT,
            _ => reqwest::Method::DELETE,
        };

        let mut builder = self
            .http
            .request(http_method, &url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT);

        if let Some(body) = body {
            builder = builder.json(body);
        }

        builder.send().await.map_err(|e| ApiError::Transport {
            method,
            path: path.to_string(),
            source: e,
        })
    }

    async fn send(
        &self,
        method: &'static str,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let resp = self.request(method, path, body).await?;
        let status = resp.status();

        if !status.is_success() {
            return Err(self.status_error(method, path, resp).await);
        }

        let text = resp.text().await.map_err(|e| ApiError::Transport {
            method,
            path: path.to_string(),
            source: e,
        })?;

        if text.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text)
            .map_err(|e| ApiError::Decode(format!("invalid JSON from {} {}: {}", method, path, e)))
    }

    /// Build a [`ApiError::Status`] from a non-success response, preferring
    /// the remote's `message` body field over the bare status line.
    async fn status_error(
        &self,
        method: &'static str,
        path: &str,
        resp: reqwest::Response,
    ) -> ApiError {
        let status = resp.status();
        let message = resp
            .json::<Value>()
            .await
            .ok()
            .and_then(|v| {
                v.get("message")
                    .and_then(|m| m.as_str())
                    .map(|m| m.to_string())
            })
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            });

        ApiError::Status {
            status: status.as_u16(),
            method,
            path: path.to_string(),
            message,
        }
    }
}
