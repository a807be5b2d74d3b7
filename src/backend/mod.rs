//! Remote backend boundary.
//!
//! Every data operation in the app is a named remote call against the
//! backend service: an auth call, a remote procedure (`rpc`), or a table
//! read/write. The [`Backend`] trait is the single seam services talk to;
//! [`RestBackend`] is the HTTP implementation.

pub mod rest;
#[cfg(test)]
pub(crate) mod testing;

pub use rest::RestBackend;

use std::fmt;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BackendError;

/// The authenticated user as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Role claim; admin screens require `"admin"`.
    #[serde(default)]
    pub role: Option<String>,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }
}

/// A backend-issued session.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds until the access token expires.
    #[serde(default)]
    pub expires_in: u64,
    pub user: Identity,
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[redacted]")
            .field("refresh_token", &"[redacted]")
            .field("expires_in", &self.expires_in)
            .field("user", &self.user)
            .finish()
    }
}

/// Ordering direction for table reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

/// Filter, ordering and limit for a table call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    filters: Vec<(String, String)>,
    order: Option<(String, Order)>,
    limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep rows where `column` equals `value`.
    pub fn eq(mut self, column: &str, value: impl fmt::Display) -> Self {
        self.filters.push((column.to_string(), format!("eq.{value}")));
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order = Some((column.to_string(), Order::Desc));
        self
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.order = Some((column.to_string(), Order::Asc));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Value of the equality filter on `column`, if any.
    pub fn eq_value(&self, column: &str) -> Option<&str> {
        self.filters
            .iter()
            .find(|(c, _)| c == column)
            .and_then(|(_, v)| v.strip_prefix("eq."))
    }

    /// Render as query-string pairs for the REST gateway.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self.filters.clone();
        if let Some((column, order)) = &self.order {
            let dir = match order {
                Order::Asc => "asc",
                Order::Desc => "desc",
            };
            pairs.push(("order".to_string(), format!("{column}.{dir}")));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }
}

/// Backend-agnostic interface to the remote service.
///
/// `access_token` is the caller's session token; when `None` the call is
/// made with the public key only.
#[async_trait]
pub trait Backend: Send + Sync {
    // ── Auth ────────────────────────────────────────────────────────

    /// Exchange email and password for a session.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthSession, BackendError>;

    /// Exchange a refresh token for a fresh session.
    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError>;

    /// Revoke the session on the backend.
    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError>;

    /// Fetch the user that owns `access_token`.
    async fn get_user(&self, access_token: &str) -> Result<Identity, BackendError>;

    // ── Data ────────────────────────────────────────────────────────

    /// Invoke a remote procedure.
    async fn rpc(
        &self,
        function: &str,
        params: serde_json::Value,
        access_token: Option<&str>,
    ) -> Result<serde_json::Value, BackendError>;

    /// Read rows from a table.
    async fn select(
        &self,
        table: &str,
        query: &Query,
        access_token: Option<&str>,
    ) -> Result<Vec<serde_json::Value>, BackendError>;

    /// Patch matching rows and return them.
    async fn update(
        &self,
        table: &str,
        query: &Query,
        patch: serde_json::Value,
        access_token: Option<&str>,
    ) -> Result<Vec<serde_json::Value>, BackendError>;

    /// Insert a row and return it.
    async fn insert(
        &self,
        table: &str,
        row: serde_json::Value,
        access_token: Option<&str>,
    ) -> Result<serde_json::Value, BackendError>;
}
