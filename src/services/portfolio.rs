//! Balances and staking positions for the portfolio view.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ServiceContext;
use crate::backend::Query;
use crate::error::ServiceError;
use crate::rewards::{StakingPool, StakingPosition, UserStake};

/// Holding of one asset, valued server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub asset_symbol: String,
    pub token_amount: Decimal,
    pub usd_value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortfolioOverview {
    pub balances: Vec<Balance>,
    pub positions: Vec<StakingPosition>,
    pub total_balance_usd: Decimal,
    pub total_staked_usd: Decimal,
    pub projected_daily_reward_usd: Decimal,
}

impl PortfolioOverview {
    fn new(balances: Vec<Balance>, positions: Vec<StakingPosition>) -> Self {
        let total_balance_usd = balances.iter().map(|b| b.usd_value).sum();
        let total_staked_usd = positions.iter().map(|p| p.usd_value).sum();
        let projected_daily_reward_usd = positions.iter().map(|p| p.projected_daily_reward_usd).sum();
        Self {
            balances,
            positions,
            total_balance_usd,
            total_staked_usd,
            projected_daily_reward_usd,
        }
    }

    pub fn net_worth_usd(&self) -> Decimal {
        self.total_balance_usd + self.total_staked_usd
    }
}

#[derive(Clone)]
pub struct PortfolioService {
    ctx: ServiceContext,
}

impl PortfolioService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn balances(&self) -> Result<Vec<Balance>, ServiceError> {
        let identity = self.ctx.identity().await?;
        self.ctx
            .rpc("get_user_balances", serde_json::json!({ "p_user_id": identity.id }))
            .await
    }

    /// The user's stakes evaluated against their pools. Stakes in a pool the
    /// backend no longer reports are dropped.
    pub async fn staking_positions(&self) -> Result<Vec<StakingPosition>, ServiceError> {
        let identity = self.ctx.identity().await?;
        let stakes_query = Query::new().eq("user_id", identity.id);
        let (pools, stakes): (Vec<StakingPool>, Vec<UserStake>) = futures::try_join!(
            self.ctx.rpc("get_staking_pools", serde_json::json!({})),
            self.ctx.select("user_stakes", &stakes_query),
        )?;

        let pools: HashMap<Uuid, StakingPool> = pools.into_iter().map(|p| (p.id, p)).collect();
        let now = Utc::now();
        Ok(stakes
            .iter()
            .filter_map(|stake| match pools.get(&stake.pool_id) {
                Some(pool) => Some(StakingPosition::evaluate(pool, stake, now)),
                None => {
                    tracing::warn!(pool_id = %stake.pool_id, "Stake references unknown pool");
                    None
                }
            })
            .collect())
    }

    /// Balances and positions, fetched concurrently.
    pub async fn overview(&self) -> Result<PortfolioOverview, ServiceError> {
        let (balances, positions) = futures::try_join!(self.balances(), self.staking_positions())?;
        Ok(PortfolioOverview::new(balances, positions))
    }
}
