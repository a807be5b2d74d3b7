//! Fake REST gateway for integration tests.
//!
//! Speaks the same auth/rpc/table paths as the real backend, records every
//! request, and answers from scripted responses.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use uuid::Uuid;

/// Maximum time any test is allowed to run before we consider it hung.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

pub const API_KEY: &str = "anon-test-key";
pub const PASSWORD: &str = "correct horse";

/// One request as seen by the gateway.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub apikey: Option<String>,
    pub bearer: Option<String>,
    pub prefer: Option<String>,
    pub body: Value,
}

pub struct FakeGateway {
    pub user_id: Uuid,
    requests: Mutex<Vec<Recorded>>,
    scripted: Mutex<HashMap<String, VecDeque<(StatusCode, Value)>>>,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            user_id: Uuid::new_v4(),
            requests: Mutex::new(Vec::new()),
            scripted: Mutex::new(HashMap::new()),
        })
    }

    /// Queue a response for `METHOD /path`, e.g. `POST /rest/v1/rpc/get_user_balances`.
    pub fn respond(&self, route: &str, status: StatusCode, body: Value) {
        self.scripted
            .lock()
            .unwrap()
            .entry(route.to_string())
            .or_default()
            .push_back((status, body));
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    fn session(&self, suffix: &str) -> Value {
        json!({
            "access_token": format!("access-{suffix}"),
            "refresh_token": format!("refresh-{suffix}"),
            "expires_in": 3600,
            "token_type": "bearer",
            "user": { "id": self.user_id, "email": "bee@example.com", "role": "authenticated" }
        })
    }

    fn answer(&self, req: &Recorded) -> (StatusCode, Value) {
        let route = format!("{} {}", req.method, req.path);
        if let Some(scripted) = self
            .scripted
            .lock()
            .unwrap()
            .get_mut(&route)
            .and_then(VecDeque::pop_front)
        {
            return scripted;
        }

        match (req.method.as_str(), req.path.as_str()) {
            ("POST", "/auth/v1/token") => match req.query.get("grant_type").map(String::as_str) {
                Some("password") if req.body["password"] == PASSWORD => {
                    (StatusCode::OK, self.session("1"))
                }
                Some("refresh_token") if req.body["refresh_token"] == "refresh-1" => {
                    (StatusCode::OK, self.session("2"))
                }
                _ => (
                    StatusCode::BAD_REQUEST,
                    json!({ "error": "invalid_grant", "error_description": "Invalid login credentials" }),
                ),
            },
            ("POST", "/auth/v1/logout") => (StatusCode::NO_CONTENT, Value::Null),
            ("GET", "/auth/v1/user") => match req.bearer.as_deref() {
                Some(token) if token.starts_with("access-") => (
                    StatusCode::OK,
                    json!({ "id": self.user_id, "email": "bee@example.com" }),
                ),
                _ => (StatusCode::UNAUTHORIZED, json!({ "msg": "JWT expired" })),
            },
            ("GET", _) => (StatusCode::OK, json!([])),
            ("PATCH", _) => {
                let mut row = req.body.clone();
                if let Some(fields) = row.as_object_mut() {
                    fields.entry("id").or_insert_with(|| json!(self.user_id));
                }
                (StatusCode::OK, json!([row]))
            }
            ("POST", path) if !path.starts_with("/rest/v1/rpc/") => {
                (StatusCode::CREATED, json!([req.body]))
            }
            _ => (StatusCode::OK, Value::Null),
        }
    }
}

async fn handle(
    State(gateway): State<Arc<FakeGateway>>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };
    let recorded = Recorded {
        method,
        path: uri.path().to_string(),
        query,
        apikey: header("apikey"),
        bearer: header("authorization").and_then(|v| v.strip_prefix("Bearer ").map(String::from)),
        prefer: header("prefer"),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    };

    if recorded.apikey.as_deref() != Some(API_KEY) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "No API key found" })))
            .into_response();
    }

    let (status, body) = gateway.answer(&recorded);
    gateway.requests.lock().unwrap().push(recorded);
    if status == StatusCode::NO_CONTENT {
        return status.into_response();
    }
    (status, Json(body)).into_response()
}

/// Serve `router` on a random local port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://127.0.0.1:{port}")
}

/// Start the fake gateway and return its base URL.
pub async fn start_gateway(gateway: Arc<FakeGateway>) -> String {
    serve(Router::new().fallback(handle).with_state(gateway)).await
}
