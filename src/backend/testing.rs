//! Scriptable in-memory backend for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use uuid::Uuid;

use super::{AuthSession, Backend, Identity, Query};
use crate::error::BackendError;

/// A recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// `rpc:<fn>`, `select:<table>`, `update:<table>`, `insert:<table>` or an auth verb.
    pub target: String,
    pub body: Value,
    pub access_token: Option<String>,
}

type Script = Mutex<HashMap<String, VecDeque<Result<Value, BackendError>>>>;

/// Backend stub: responses are queued per call target; unscripted targets
/// answer `null` (or an empty row list for table reads).
pub struct StubBackend {
    responses: Script,
    calls: Mutex<Vec<Call>>,
    pub password: String,
    pub user: Identity,
}

impl StubBackend {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            password: "correct horse".to_string(),
            user: Identity {
                id: Uuid::new_v4(),
                email: Some("bee@example.com".to_string()),
                phone: None,
                role: None,
            },
        }
    }

    pub fn admin() -> Self {
        let mut stub = Self::new();
        stub.user.role = Some("admin".to_string());
        stub
    }

    /// Queue a response for a call target such as `rpc:update_asset_price`.
    pub fn respond(&self, target: &str, response: Result<Value, BackendError>) {
        self.responses
            .lock()
            .unwrap()
            .entry(target.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, target: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.target == target)
            .collect()
    }

    pub fn session(&self, suffix: &str) -> AuthSession {
        AuthSession {
            access_token: format!("access-{suffix}"),
            refresh_token: format!("refresh-{suffix}"),
            expires_in: 3600,
            user: self.user.clone(),
        }
    }

    fn record(&self, target: String, body: Value, access_token: Option<&str>) -> Option<Result<Value, BackendError>> {
        self.calls.lock().unwrap().push(Call {
            target: target.clone(),
            body,
            access_token: access_token.map(String::from),
        });
        self.responses
            .lock()
            .unwrap()
            .get_mut(&target)
            .and_then(|queue| queue.pop_front())
    }
}

#[async_trait]
impl Backend for StubBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthSession, BackendError> {
        self.record("sign_in".into(), serde_json::json!({ "email": email }), None);
        if password.expose_secret() == self.password {
            Ok(self.session("signin"))
        } else {
            Err(BackendError::Validation("Invalid login credentials".into()))
        }
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError> {
        match self.record(
            "refresh".into(),
            serde_json::json!({ "refresh_token": refresh_token }),
            None,
        ) {
            Some(Err(e)) => Err(e),
            _ => Ok(self.session("refreshed")),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        match self.record("sign_out".into(), Value::Null, Some(access_token)) {
            Some(Err(e)) => Err(e),
            _ => Ok(()),
        }
    }

    async fn get_user(&self, access_token: &str) -> Result<Identity, BackendError> {
        self.record("get_user".into(), Value::Null, Some(access_token));
        Ok(self.user.clone())
    }

    async fn rpc(
        &self,
        function: &str,
        params: Value,
        access_token: Option<&str>,
    ) -> Result<Value, BackendError> {
        self.record(format!("rpc:{function}"), params, access_token)
            .unwrap_or(Ok(Value::Null))
    }

    async fn select(
        &self,
        table: &str,
        query: &Query,
        access_token: Option<&str>,
    ) -> Result<Vec<Value>, BackendError> {
        let body = serde_json::json!(query
            .to_pairs()
            .into_iter()
            .collect::<HashMap<String, String>>());
        match self.record(format!("select:{table}"), body, access_token) {
            Some(Ok(Value::Array(rows))) => Ok(rows),
            Some(Ok(other)) => Ok(vec![other]),
            Some(Err(e)) => Err(e),
            None => Ok(Vec::new()),
        }
    }

    async fn update(
        &self,
        table: &str,
        _query: &Query,
        patch: Value,
        access_token: Option<&str>,
    ) -> Result<Vec<Value>, BackendError> {
        match self.record(format!("update:{table}"), patch.clone(), access_token) {
            Some(Ok(Value::Array(rows))) => Ok(rows),
            Some(Ok(other)) => Ok(vec![other]),
            Some(Err(e)) => Err(e),
            None => Ok(vec![patch]),
        }
    }

    async fn insert(
        &self,
        table: &str,
        row: Value,
        access_token: Option<&str>,
    ) -> Result<Value, BackendError> {
        self.record(format!("insert:{table}"), row.clone(), access_token)
            .unwrap_or(Ok(row))
    }
}
