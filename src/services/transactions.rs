//! Deposit/withdrawal history and the admin review queue.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ServiceContext;
use crate::backend::Query;
use crate::error::ServiceError;

/// Most rows a history read may request.
const MAX_HISTORY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Stake,
    Unstake,
    Reward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub asset_symbol: String,
    pub amount: Decimal,
    #[serde(default)]
    pub usd_value: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TransactionService {
    ctx: ServiceContext,
}

impl TransactionService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// The user's most recent transactions, newest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<Transaction>, ServiceError> {
        if limit == 0 || limit > MAX_HISTORY {
            return Err(ServiceError::invalid(
                "limit",
                format!("must be between 1 and {MAX_HISTORY}"),
            ));
        }
        let identity = self.ctx.identity().await?;
        let query = Query::new()
            .eq("user_id", identity.id)
            .order_desc("created_at")
            .limit(limit);
        self.ctx.select("transactions", &query).await
    }

    /// Transactions awaiting review, oldest first. Admin only.
    pub async fn pending(&self) -> Result<Vec<Transaction>, ServiceError> {
        self.ctx.require_admin().await?;
        let query = Query::new()
            .eq("status", TransactionStatus::Pending.as_str())
            .order_asc("created_at");
        self.ctx.select("transactions", &query).await
    }

    pub async fn approve(&self, id: Uuid) -> Result<(), ServiceError> {
        let admin = self.ctx.require_admin().await?;
        let _: serde_json::Value = self
            .ctx
            .rpc("approve_transaction", serde_json::json!({ "p_transaction_id": id }))
            .await?;
        tracing::info!(transaction_id = %id, admin_id = %admin.id, "Transaction approved");
        Ok(())
    }

    pub async fn reject(&self, id: Uuid, reason: &str) -> Result<(), ServiceError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ServiceError::invalid("reason", "must not be empty"));
        }
        let admin = self.ctx.require_admin().await?;
        let _: serde_json::Value = self
            .ctx
            .rpc(
                "reject_transaction",
                serde_json::json!({ "p_transaction_id": id, "p_reason": reason }),
            )
            .await?;
        tracing::info!(transaction_id = %id, admin_id = %admin.id, reason, "Transaction rejected");
        Ok(())
    }
}
