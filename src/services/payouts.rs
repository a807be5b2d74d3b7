//! Admin payout queue.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ServiceContext;
use crate::backend::Query;
use crate::error::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Paid,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub id: Uuid,
    pub user_id: Uuid,
    pub asset_symbol: String,
    pub amount: Decimal,
    pub status: PayoutStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct PayoutService {
    ctx: ServiceContext,
}

impl PayoutService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn pending(&self) -> Result<Vec<Payout>, ServiceError> {
        self.ctx.require_admin().await?;
        let query = Query::new().eq("status", "pending").order_asc("created_at");
        self.ctx.select("payouts", &query).await
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        asset_symbol: &str,
        amount: Decimal,
    ) -> Result<Payout, ServiceError> {
        if amount <= Decimal::ZERO {
            return Err(ServiceError::invalid("amount", "must be greater than zero"));
        }
        let asset_symbol = asset_symbol.trim();
        if asset_symbol.is_empty() {
            return Err(ServiceError::invalid("asset_symbol", "must not be empty"));
        }
        let admin = self.ctx.require_admin().await?;
        let payout: Payout = self
            .ctx
            .rpc(
                "create_payout",
                serde_json::json!({
                    "p_user_id": user_id,
                    "p_asset_symbol": asset_symbol,
                    "p_amount": amount,
                }),
            )
            .await?;
        tracing::info!(payout_id = %payout.id, %user_id, %amount, admin_id = %admin.id, "Payout created");
        Ok(payout)
    }

    pub async fn mark_paid(&self, payout_id: Uuid) -> Result<(), ServiceError> {
        let admin = self.ctx.require_admin().await?;
        let _: serde_json::Value = self
            .ctx
            .rpc("mark_payout_paid", serde_json::json!({ "p_payout_id": payout_id }))
            .await?;
        tracing::info!(%payout_id, admin_id = %admin.id, "Payout marked paid");
        Ok(())
    }
}
