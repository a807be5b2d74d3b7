//! Profile reads/writes and the onboarding lookups behind them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ServiceContext;
use crate::backend::Query;
use crate::error::ServiceError;

/// The user's profile row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default)]
    pub bee_name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub referred_by_code: Option<String>,
    #[serde(default)]
    pub onboarding_completed: bool,
    #[serde(default)]
    pub agreements_accepted_at: Option<DateTime<Utc>>,
}

/// Fields to change on the profile; unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referred_by_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bee_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agreements_accepted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onboarding_completed: Option<bool>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Money totals for the profile screen, aggregated server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialInfo {
    #[serde(default)]
    pub total_deposited_usd: Decimal,
    #[serde(default)]
    pub total_withdrawn_usd: Decimal,
    #[serde(default)]
    pub total_rewards_usd: Decimal,
    #[serde(default)]
    pub referral_code: Option<String>,
}

impl FinancialInfo {
    /// Deposits minus withdrawals.
    pub fn net_invested_usd(&self) -> Decimal {
        self.total_deposited_usd - self.total_withdrawn_usd
    }
}

#[derive(Clone)]
pub struct ProfileService {
    ctx: ServiceContext,
}

impl ProfileService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn profile(&self) -> Result<Profile, ServiceError> {
        let identity = self.ctx.identity().await?;
        let rows: Vec<Profile> = self
            .ctx
            .select("profiles", &Query::new().eq("id", identity.id).limit(1))
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| crate::error::BackendError::NotFound("profile".into()).into())
    }

    pub async fn financial_info(&self) -> Result<FinancialInfo, ServiceError> {
        let identity = self.ctx.identity().await?;
        self.ctx
            .rpc(
                "get_profile_financial_info",
                serde_json::json!({ "p_user_id": identity.id }),
            )
            .await
    }

    pub async fn update_profile(&self, patch: &ProfilePatch) -> Result<Profile, ServiceError> {
        if patch.is_empty() {
            return Err(ServiceError::invalid("profile", "nothing to update"));
        }
        let identity = self.ctx.identity().await?;
        let profile: Profile = self
            .ctx
            .update_one("profiles", &Query::new().eq("id", identity.id), patch)
            .await?;
        tracing::info!(user_id = %identity.id, "Profile updated");
        Ok(profile)
    }

    pub async fn is_bee_name_available(&self, name: &str) -> Result<bool, ServiceError> {
        self.ctx
            .rpc("check_bee_name_available", serde_json::json!({ "p_bee_name": name }))
            .await
    }

    pub async fn validate_referral_code(&self, code: &str) -> Result<bool, ServiceError> {
        self.ctx
            .rpc("validate_referral_code", serde_json::json!({ "p_code": code }))
            .await
    }

    /// Confirm the one-time code sent to the user at sign-up.
    pub async fn verify_code(&self, code: &str) -> Result<bool, ServiceError> {
        self.ctx
            .rpc("verify_onboarding_code", serde_json::json!({ "p_code": code }))
            .await
    }
}
