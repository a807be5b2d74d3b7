//! Referral rewards and pollen standing.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ServiceContext;
use crate::error::{BackendError, ServiceError};
use crate::rewards::{ActivitySummary, PollenRates, PollenTier, pollen_points};

/// Reward earned for one referred user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralReward {
    pub referred_user_id: Uuid,
    #[serde(default)]
    pub referred_bee_name: Option<String>,
    pub reward_tokens: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReferralSummary {
    pub count: usize,
    pub total_tokens: Decimal,
}

impl ReferralSummary {
    pub fn from_rewards(rewards: &[ReferralReward]) -> Self {
        Self {
            count: rewards.len(),
            total_tokens: rewards.iter().map(|r| r.reward_tokens).sum(),
        }
    }
}

#[derive(Clone)]
pub struct ReferralService {
    ctx: ServiceContext,
}

impl ReferralService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn rewards(&self) -> Result<Vec<ReferralReward>, ServiceError> {
        let identity = self.ctx.identity().await?;
        let rewards: Option<Vec<ReferralReward>> = self
            .ctx
            .rpc("get_referral_rewards", serde_json::json!({ "p_user_id": identity.id }))
            .await?;
        Ok(rewards.unwrap_or_default())
    }

    pub async fn summary(&self) -> Result<ReferralSummary, ServiceError> {
        Ok(ReferralSummary::from_rewards(&self.rewards().await?))
    }
}

/// Pollen points with the tier they earn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollenBalance {
    pub points: Decimal,
    pub tier: PollenTier,
    /// Points still needed for the next tier; `None` at the top tier.
    pub to_next_tier: Option<Decimal>,
    pub summary: ActivitySummary,
}

impl PollenBalance {
    pub fn compute(summary: ActivitySummary, rates: &PollenRates) -> Self {
        let points = pollen_points(&summary, rates);
        let tier = PollenTier::for_points(points);
        Self {
            points,
            tier,
            to_next_tier: tier.next_threshold().map(|t| t - points),
            summary,
        }
    }
}

#[derive(Clone)]
pub struct RewardsService {
    ctx: ServiceContext,
    rates: PollenRates,
}

impl RewardsService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self::with_rates(ctx, PollenRates::default())
    }

    pub fn with_rates(ctx: ServiceContext, rates: PollenRates) -> Self {
        Self { ctx, rates }
    }

    /// Pollen computed locally from the backend's activity totals.
    pub async fn pollen_balance(&self) -> Result<PollenBalance, ServiceError> {
        let identity = self.ctx.identity().await?;
        let summary: Option<ActivitySummary> = self
            .ctx
            .rpc(
                "get_user_activity_summary",
                serde_json::json!({ "p_user_id": identity.id }),
            )
            .await?;
        Ok(PollenBalance::compute(summary.unwrap_or_default(), &self.rates))
    }

    /// Record today's check-in. Returns `false` if the user already
    /// checked in today.
    pub async fn check_in(&self) -> Result<bool, ServiceError> {
        let identity = self.ctx.identity().await?;
        let row = serde_json::json!({
            "user_id": identity.id,
            "checked_in_on": Utc::now().date_naive(),
        });
        match self.ctx.insert("daily_check_ins", row).await {
            Ok(_) => {
                tracing::info!(user_id = %identity.id, "Daily check-in recorded");
                Ok(true)
            }
            Err(ServiceError::Backend(BackendError::Conflict(_))) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
