//! REST endpoints for the onboarding view.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use super::controller::History;
use super::manager::OnboardingManager;
use super::model::StepSubmission;
use crate::error::{BackendError, ErrorSurface, OnboardingError, ServiceError};

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub manager: Arc<OnboardingManager>,
    /// Navigation history of the headless view.
    pub history: History,
}

#[derive(Deserialize)]
struct RouteRequest {
    route: String,
}

impl OnboardingError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::OutsideFlow | Self::StepMismatch { .. } => StatusCode::CONFLICT,
            Self::InvalidInput { .. }
            | Self::NameTaken(_)
            | Self::InvalidReferral(_)
            | Self::CodeRejected => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Service(e) if e.requires_login() => StatusCode::UNAUTHORIZED,
            Self::Service(ServiceError::Invalid { .. })
            | Self::Service(ServiceError::Backend(BackendError::Validation(_))) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Service(ServiceError::AdminRequired) => StatusCode::FORBIDDEN,
            Self::Service(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for OnboardingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut body = serde_json::json!({ "error": self.to_string() });
        if let Some(redirect) = ErrorSurface::from(&self).redirect() {
            body["redirect"] = redirect.into();
        }
        (status, Json(body)).into_response()
    }
}

/// GET /api/onboarding/status
///
/// Returns the step indicator state; 409 when no flow is active.
async fn get_status(State(state): State<OnboardingRouteState>) -> Response {
    match state.manager.status().await {
        Ok(status) => Json(status).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/onboarding/enter
///
/// Mounts the flow at `route`.
async fn enter(
    State(state): State<OnboardingRouteState>,
    Json(req): Json<RouteRequest>,
) -> impl IntoResponse {
    state.history.push(&req.route);
    let status = state
        .manager
        .enter(&req.route, Box::new(state.history.clone()))
        .await;
    Json(status)
}

/// POST /api/onboarding/exit
async fn exit(State(state): State<OnboardingRouteState>) -> impl IntoResponse {
    let step = state.manager.exit().await;
    Json(serde_json::json!({ "step": step }))
}

/// POST /api/onboarding/advance
async fn advance(State(state): State<OnboardingRouteState>) -> Response {
    match state.manager.advance().await {
        Ok(status) => Json(status).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/onboarding/retreat
async fn retreat(State(state): State<OnboardingRouteState>) -> Response {
    match state.manager.retreat().await {
        Ok(status) => Json(status).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/onboarding/location
///
/// Reports a route change the view made on its own (back/forward, links).
async fn location(
    State(state): State<OnboardingRouteState>,
    Json(req): Json<RouteRequest>,
) -> Response {
    state.history.push(&req.route);
    match state.manager.sync_route(&req.route).await {
        Ok(status) => Json(status).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/onboarding/submit
///
/// Body is a step submission tagged by `step`.
async fn submit(
    State(state): State<OnboardingRouteState>,
    Json(submission): Json<StepSubmission>,
) -> Response {
    match state.manager.submit(submission).await {
        Ok(status) => Json(status).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route("/api/onboarding/status", get(get_status))
        .route("/api/onboarding/enter", post(enter))
        .route("/api/onboarding/exit", post(exit))
        .route("/api/onboarding/advance", post(advance))
        .route("/api/onboarding/retreat", post(retreat))
        .route("/api/onboarding/location", post(location))
        .route("/api/onboarding/submit", post(submit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::backend::testing::StubBackend;
    use crate::error::AuthError;
    use crate::services::ProfileService;
    use crate::services::test_support::signed_in;

    async fn app() -> (Router, History) {
        let (_stub, ctx) = signed_in(StubBackend::new()).await;
        let history = History::new();
        let state = OnboardingRouteState {
            manager: Arc::new(OnboardingManager::new(ProfileService::new(ctx))),
            history: history.clone(),
        };
        (onboarding_routes(state), history)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(json) => Body::from(json.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn status_outside_flow_is_conflict() {
        let (app, _) = app().await;
        let (status, body) = call(&app, "GET", "/api/onboarding/status", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Onboarding flow is not active");

        let (status, _) = call(&app, "POST", "/api/onboarding/advance", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn enter_advance_and_follow_location() {
        let (app, history) = app().await;
        let (status, body) = call(
            &app,
            "POST",
            "/api/onboarding/enter",
            Some(json!({ "route": "/onboarding/phone" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["step"], "phone");
        assert_eq!(body["step_number"], 5);

        let (_, body) = call(&app, "POST", "/api/onboarding/advance", None).await;
        assert_eq!(body["route"], "/onboarding/tax-info");
        assert_eq!(history.location().as_deref(), Some("/onboarding/tax-info"));

        let (_, body) = call(
            &app,
            "POST",
            "/api/onboarding/location",
            Some(json!({ "route": "/onboarding/country" })),
        )
        .await;
        assert_eq!(body["step"], "country");

        let (_, body) = call(&app, "POST", "/api/onboarding/exit", None).await;
        assert_eq!(body["step"], "country");
    }

    #[tokio::test]
    async fn invalid_submission_is_unprocessable() {
        let (app, _) = app().await;
        call(
            &app,
            "POST",
            "/api/onboarding/enter",
            Some(json!({ "route": "/onboarding/country" })),
        )
        .await;
        let (status, body) = call(
            &app,
            "POST",
            "/api/onboarding/submit",
            Some(json!({ "step": "country", "code": "USA" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid country"));
    }

    #[test]
    fn error_status_codes() {
        let err = OnboardingError::Service(ServiceError::Auth(AuthError::NoSession));
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            OnboardingError::StepMismatch {
                current: crate::onboarding::OnboardingStep::Phone,
                submitted: crate::onboarding::OnboardingStep::Country,
            }
            .status_code(),
            StatusCode::CONFLICT
        );
    }
}
