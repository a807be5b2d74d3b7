//! REST endpoints for the session view-state.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use secrecy::SecretString;
use serde::Deserialize;

use super::provider::SessionProvider;
use crate::error::LOGIN_ROUTE;

#[derive(Deserialize)]
struct SignInRequest {
    email: String,
    password: SecretString,
}

/// GET /api/session
///
/// Returns `{identity, is_loading}`.
async fn get_session(State(provider): State<Arc<SessionProvider>>) -> impl IntoResponse {
    Json(provider.snapshot().await)
}

/// POST /api/session/sign-in
async fn sign_in(
    State(provider): State<Arc<SessionProvider>>,
    Json(req): Json<SignInRequest>,
) -> impl IntoResponse {
    match provider.sign_in(&req.email, &req.password).await {
        Ok(identity) => Json(serde_json::json!({ "identity": identity })).into_response(),
        Err(e) => (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": e.to_string(), "redirect": LOGIN_ROUTE })),
        )
            .into_response(),
    }
}

/// POST /api/session/sign-out
async fn sign_out(State(provider): State<Arc<SessionProvider>>) -> impl IntoResponse {
    provider.sign_out().await;
    StatusCode::NO_CONTENT
}

/// Build the session REST routes.
pub fn session_routes(provider: Arc<SessionProvider>) -> Router {
    Router::new()
        .route("/api/session", get(get_session))
        .route("/api/session/sign-in", post(sign_in))
        .route("/api/session/sign-out", post(sign_out))
        .with_state(provider)
}
