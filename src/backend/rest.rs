//! HTTP implementation of [`Backend`] against the service's REST gateway.
//!
//! Layout of the gateway:
//! - `POST /auth/v1/token?grant_type=password|refresh_token`
//! - `POST /auth/v1/logout`, `GET /auth/v1/user`
//! - `POST /rest/v1/rpc/{function}`
//! - `GET|PATCH|POST /rest/v1/{table}` with `column=eq.value` filters

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use super::{AuthSession, Backend, Identity, Query};
use crate::error::BackendError;

/// Backend client speaking the REST gateway protocol over `reqwest`.
pub struct RestBackend {
    base_url: String,
    api_key: SecretString,
    client: reqwest::Client,
}

impl RestBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Network(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Start a request carrying the gateway key and the bearer token
    /// (the caller's session token, or the key itself when anonymous).
    fn request(&self, method: Method, path: &str, access_token: Option<&str>) -> RequestBuilder {
        let key = self.api_key.expose_secret();
        self.client
            .request(method, self.url(path))
            .header("apikey", key)
            .bearer_auth(access_token.unwrap_or(key))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        what: &str,
        request: RequestBuilder,
    ) -> Result<T, BackendError> {
        let resp = request.send().await.map_err(|e| {
            tracing::warn!(call = what, error = %e, "Backend request failed");
            BackendError::Network(e.to_string())
        })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        if !status.is_success() {
            let err = status_error(status, &body);
            tracing::debug!(call = what, status = status.as_u16(), error = %err, "Backend call rejected");
            return Err(err);
        }

        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(body).map_err(|e| {
            tracing::warn!(call = what, error = %e, "Undecodable backend response");
            BackendError::Decode(e.to_string())
        })
    }
}

/// Map a non-success HTTP response to a [`BackendError`].
pub(crate) fn status_error(status: StatusCode, body: &str) -> BackendError {
    let message = error_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            BackendError::Validation(message)
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized(message),
        StatusCode::NOT_FOUND => BackendError::NotFound(message),
        StatusCode::CONFLICT => BackendError::Conflict(message),
        other => BackendError::Status {
            status: other.as_u16(),
            message,
        },
    }
}

/// Pull the human-readable message out of an error body.
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(json) => ["message", "msg", "error_description", "error"]
            .iter()
            .find_map(|key| json.get(*key).and_then(|v| v.as_str()))
            .map(String::from),
        Err(_) => Some(trimmed.chars().take(200).collect()),
    }
}

#[async_trait]
impl Backend for RestBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthSession, BackendError> {
        let body = serde_json::json!({
            "email": email,
            "password": password.expose_secret(),
        });
        let request = self
            .request(Method::POST, "/auth/v1/token", None)
            .query(&[("grant_type", "password")])
            .json(&body);
        self.send("sign_in", request).await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError> {
        let body = serde_json::json!({ "refresh_token": refresh_token });
        let request = self
            .request(Method::POST, "/auth/v1/token", None)
            .query(&[("grant_type", "refresh_token")])
            .json(&body);
        self.send("refresh_session", request).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let request = self.request(Method::POST, "/auth/v1/logout", Some(access_token));
        let _: serde_json::Value = self.send("sign_out", request).await?;
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<Identity, BackendError> {
        let request = self.request(Method::GET, "/auth/v1/user", Some(access_token));
        self.send("get_user", request).await
    }

    async fn rpc(
        &self,
        function: &str,
        params: serde_json::Value,
        access_token: Option<&str>,
    ) -> Result<serde_json::Value, BackendError> {
        let request = self
            .request(Method::POST, &format!("/rest/v1/rpc/{function}"), access_token)
            .json(&params);
        self.send(function, request).await
    }

    async fn select(
        &self,
        table: &str,
        query: &Query,
        access_token: Option<&str>,
    ) -> Result<Vec<serde_json::Value>, BackendError> {
        let mut pairs = vec![("select".to_string(), "*".to_string())];
        pairs.extend(query.to_pairs());
        let request = self
            .request(Method::GET, &format!("/rest/v1/{table}"), access_token)
            .query(&pairs);
        self.send(table, request).await
    }

    async fn update(
        &self,
        table: &str,
        query: &Query,
        patch: serde_json::Value,
        access_token: Option<&str>,
    ) -> Result<Vec<serde_json::Value>, BackendError> {
        let request = self
            .request(Method::PATCH, &format!("/rest/v1/{table}"), access_token)
            .header("Prefer", "return=representation")
            .query(&query.to_pairs())
            .json(&patch);
        self.send(table, request).await
    }

    async fn insert(
        &self,
        table: &str,
        row: serde_json::Value,
        access_token: Option<&str>,
    ) -> Result<serde_json::Value, BackendError> {
        let request = self
            .request(Method::POST, &format!("/rest/v1/{table}"), access_token)
            .header("Prefer", "return=representation")
            .json(&row);
        let rows: Vec<serde_json::Value> = self.send(table, request).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode(format!("insert into {table} returned no rows")))
    }
}
