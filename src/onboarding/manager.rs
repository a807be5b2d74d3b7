//! OnboardingManager — validates step submissions, persists them through
//! the profile service and drives the controller.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::controller::{Navigator, OnboardingScope, OnboardingStatus};
use super::model::{StepSubmission, StepValidator};
use super::state::OnboardingStep;
use crate::error::OnboardingError;
use crate::services::{ProfilePatch, ProfileService};

/// Coordinates the onboarding flow for the signed-in user.
///
/// All controller access goes through one lock, so concurrent submissions
/// and navigation are applied one at a time.
pub struct OnboardingManager {
    profiles: ProfileService,
    scope: Arc<Mutex<OnboardingScope>>,
    validator: StepValidator,
}

impl OnboardingManager {
    pub fn new(profiles: ProfileService) -> Self {
        Self {
            profiles,
            scope: Arc::new(Mutex::new(OnboardingScope::new())),
            validator: StepValidator::new(),
        }
    }

    /// Enter the flow at `route` and return the resulting status.
    pub async fn enter(&self, route: &str, navigator: Box<dyn Navigator>) -> OnboardingStatus {
        let mut scope = self.scope.lock().await;
        let status = scope.enter(route, navigator).status();
        info!(route, step = %status.step, "Onboarding flow entered");
        status
    }

    pub async fn exit(&self) -> Option<OnboardingStep> {
        self.scope.lock().await.exit()
    }

    pub async fn is_active(&self) -> bool {
        self.scope.lock().await.is_active()
    }

    pub async fn status(&self) -> Result<OnboardingStatus, OnboardingError> {
        Ok(self.scope.lock().await.controller()?.status())
    }

    /// Advance without a submission. A no-op on the terminal step.
    pub async fn advance(&self) -> Result<OnboardingStatus, OnboardingError> {
        let mut scope = self.scope.lock().await;
        let controller = scope.controller_mut()?;
        controller.advance();
        Ok(controller.status())
    }

    /// Go back one step. A no-op on the first step.
    pub async fn retreat(&self) -> Result<OnboardingStatus, OnboardingError> {
        let mut scope = self.scope.lock().await;
        let controller = scope.controller_mut()?;
        controller.retreat();
        Ok(controller.status())
    }

    /// Follow a route change made outside the controller.
    pub async fn sync_route(&self, route: &str) -> Result<OnboardingStatus, OnboardingError> {
        let mut scope = self.scope.lock().await;
        let controller = scope.controller_mut()?;
        controller.sync_route(route);
        Ok(controller.status())
    }

    /// Validate and persist the current step's form, then advance.
    ///
    /// The step only moves once the profile write has succeeded; any
    /// failure leaves the flow where it was and is returned to the caller.
    pub async fn submit(&self, submission: StepSubmission) -> Result<OnboardingStatus, OnboardingError> {
        let mut scope = self.scope.lock().await;
        let controller = scope.controller_mut()?;

        let current = controller.current_step();
        let submitted = submission.step();
        if current != submitted {
            warn!(%current, %submitted, "Onboarding submission for wrong step");
            return Err(OnboardingError::StepMismatch { current, submitted });
        }

        let submission = self.validator.validate(submission)?;
        self.persist(submission).await?;

        controller.advance();
        let status = controller.status();
        info!(completed = %submitted, step = %status.step, "Onboarding step completed");
        Ok(status)
    }

    async fn persist(&self, submission: StepSubmission) -> Result<(), OnboardingError> {
        let patch = match submission {
            StepSubmission::Verify { code } => {
                if !self.profiles.verify_code(&code).await? {
                    return Err(OnboardingError::CodeRejected);
                }
                ProfilePatch {
                    email_verified: Some(true),
                    ..Default::default()
                }
            }
            StepSubmission::Referral { code: None } => return Ok(()),
            StepSubmission::Referral { code: Some(code) } => {
                if !self.profiles.validate_referral_code(&code).await? {
                    return Err(OnboardingError::InvalidReferral(code));
                }
                ProfilePatch {
                    referred_by_code: Some(code),
                    ..Default::default()
                }
            }
            StepSubmission::BeeName { name } => {
                if !self.profiles.is_bee_name_available(&name).await? {
                    return Err(OnboardingError::NameTaken(name));
                }
                ProfilePatch {
                    bee_name: Some(name),
                    ..Default::default()
                }
            }
            StepSubmission::Country { code } => ProfilePatch {
                country: Some(code),
                ..Default::default()
            },
            StepSubmission::Phone { number } => ProfilePatch {
                phone: Some(number),
                ..Default::default()
            },
            StepSubmission::TaxInfo { tax_id } => ProfilePatch {
                tax_id: Some(tax_id),
                ..Default::default()
            },
            StepSubmission::Agreements { .. } => ProfilePatch {
                agreements_accepted_at: Some(Utc::now()),
                onboarding_completed: Some(true),
                ..Default::default()
            },
        };
        self.profiles.update_profile(&patch).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::backend::testing::StubBackend;
    use crate::error::{BackendError, ServiceError};
    use crate::onboarding::controller::History;
    use crate::services::test_support::signed_in;

    async fn manager_at(stub: StubBackend, route: &str) -> (Arc<StubBackend>, OnboardingManager, History) {
        let (stub, ctx) = signed_in(stub).await;
        let manager = OnboardingManager::new(ProfileService::new(ctx));
        let history = History::starting_at(route);
        manager.enter(route, Box::new(history.clone())).await;
        (stub, manager, history)
    }

    fn profile_row(stub: &StubBackend) -> serde_json::Value {
        json!([{ "id": stub.user.id }])
    }

    #[tokio::test]
    async fn bee_name_submission_moves_to_country() {
        let stub = StubBackend::new();
        stub.respond("rpc:check_bee_name_available", Ok(json!(true)));
        stub.respond("update:profiles", Ok(profile_row(&stub)));
        let (stub, manager, history) = manager_at(stub, "/onboarding/bee-name").await;

        let status = manager
            .submit(StepSubmission::BeeName { name: "buzz".into() })
            .await
            .unwrap();
        assert_eq!(status.step, OnboardingStep::Country);
        assert_eq!(history.location().as_deref(), Some("/onboarding/country"));
        assert_eq!(stub.calls_to("update:profiles")[0].body, json!({ "bee_name": "buzz" }));
    }

    #[tokio::test]
    async fn taken_name_does_not_advance() {
        let stub = StubBackend::new();
        stub.respond("rpc:check_bee_name_available", Ok(json!(false)));
        let (stub, manager, history) = manager_at(stub, "/onboarding/bee-name").await;

        let err = manager
            .submit(StepSubmission::BeeName { name: "queen".into() })
            .await
            .unwrap_err();
        assert_eq!(err, OnboardingError::NameTaken("queen".into()));
        assert_eq!(manager.status().await.unwrap().step, OnboardingStep::BeeName);
        assert_eq!(history.entries().len(), 1);
        assert!(stub.calls_to("update:profiles").is_empty());
    }

    #[tokio::test]
    async fn failed_profile_write_does_not_advance() {
        let stub = StubBackend::new();
        stub.respond(
            "update:profiles",
            Err(BackendError::Status {
                status: 500,
                message: "boom".into(),
            }),
        );
        let (_stub, manager, _) = manager_at(stub, "/onboarding/country").await;

        let err = manager
            .submit(StepSubmission::Country { code: "nz".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, OnboardingError::Service(ServiceError::Backend(_))));
        assert_eq!(manager.status().await.unwrap().step, OnboardingStep::Country);
    }

    #[tokio::test]
    async fn submission_for_other_step_is_rejected() {
        let (_stub, manager, _) = manager_at(StubBackend::new(), "/onboarding/phone").await;
        let err = manager
            .submit(StepSubmission::Country { code: "US".into() })
            .await
            .unwrap_err();
        assert_eq!(
            err,
            OnboardingError::StepMismatch {
                current: OnboardingStep::Phone,
                submitted: OnboardingStep::Country,
            }
        );
    }

    #[tokio::test]
    async fn nothing_is_accepted_on_complete() {
        let (_stub, manager, _) = manager_at(StubBackend::new(), "/onboarding/complete").await;
        let err = manager
            .submit(StepSubmission::Agreements {
                terms: true,
                privacy: true,
                risk_disclosure: true,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, OnboardingError::StepMismatch { .. }));
    }

    #[tokio::test]
    async fn skipping_referral_writes_nothing() {
        let (stub, manager, _) = manager_at(StubBackend::new(), "/onboarding/referral").await;
        let status = manager
            .submit(StepSubmission::Referral { code: None })
            .await
            .unwrap();
        assert_eq!(status.step, OnboardingStep::BeeName);
        assert!(stub.calls().iter().all(|c| c.target != "update:profiles"));
    }

    #[tokio::test]
    async fn invalid_referral_is_rejected() {
        let stub = StubBackend::new();
        stub.respond("rpc:validate_referral_code", Ok(json!(false)));
        let (_stub, manager, _) = manager_at(stub, "/onboarding/referral").await;
        let err = manager
            .submit(StepSubmission::Referral { code: Some("nope".into()) })
            .await
            .unwrap_err();
        assert_eq!(err, OnboardingError::InvalidReferral("NOPE".into()));
    }

    #[tokio::test]
    async fn rejected_verification_code() {
        let stub = StubBackend::new();
        stub.respond("rpc:verify_onboarding_code", Ok(json!(false)));
        let (_stub, manager, _) = manager_at(stub, "/onboarding/verify").await;
        let err = manager
            .submit(StepSubmission::Verify { code: "123456".into() })
            .await
            .unwrap_err();
        assert_eq!(err, OnboardingError::CodeRejected);
    }

    #[tokio::test]
    async fn agreements_complete_onboarding() {
        let stub = StubBackend::new();
        stub.respond("update:profiles", Ok(profile_row(&stub)));
        let (stub, manager, _) = manager_at(stub, "/onboarding/agreements").await;

        let status = manager
            .submit(StepSubmission::Agreements {
                terms: true,
                privacy: true,
                risk_disclosure: true,
            })
            .await
            .unwrap();
        assert_eq!(status.step, OnboardingStep::Complete);
        // Progress visibility is fixed at mount time.
        assert!(status.show_progress);

        let body = &stub.calls_to("update:profiles")[0].body;
        assert_eq!(body["onboarding_completed"], json!(true));
        assert!(body["agreements_accepted_at"].is_string());
    }

    #[tokio::test]
    async fn navigation_outside_flow_fails_fast() {
        let (_stub, ctx) = signed_in(StubBackend::new()).await;
        let manager = OnboardingManager::new(ProfileService::new(ctx));
        assert_eq!(manager.advance().await, Err(OnboardingError::OutsideFlow));
        assert_eq!(
            manager.submit(StepSubmission::Country { code: "US".into() }).await,
            Err(OnboardingError::OutsideFlow)
        );

        manager.enter("/onboarding/tax-info", Box::new(History::new())).await;
        assert_eq!(manager.exit().await, Some(OnboardingStep::TaxInfo));
        assert_eq!(manager.status().await, Err(OnboardingError::OutsideFlow));
    }

    #[tokio::test]
    async fn concurrent_advances_are_serialized() {
        let (_stub, manager, _) = manager_at(StubBackend::new(), "/onboarding/verify").await;
        let manager = Arc::new(manager);

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.advance().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(manager.status().await.unwrap().step, OnboardingStep::Country);
    }
}
