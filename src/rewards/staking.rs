//! Staking pool math.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timers::Countdown;

/// Decimal places for USD amounts.
const USD_DP: u32 = 2;
/// Decimal places for token amounts.
const TOKEN_DP: u32 = 8;
/// Decimal places for pool share percentages.
const SHARE_DP: u32 = 4;

/// A staking pool as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingPool {
    pub id: Uuid,
    pub name: String,
    pub asset_symbol: String,
    /// Tokens staked by all users.
    pub total_staked: Decimal,
    /// Tokens the pool distributes per day across all stakers.
    pub daily_emission: Decimal,
    pub token_price_usd: Decimal,
}

/// The signed-in user's stake in one pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStake {
    pub pool_id: Uuid,
    pub staked_amount: Decimal,
    #[serde(default)]
    pub unlocks_at: Option<DateTime<Utc>>,
}

/// A stake evaluated against its pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StakingPosition {
    pub pool_id: Uuid,
    pub pool_name: String,
    pub asset_symbol: String,
    pub staked_tokens: Decimal,
    /// Percentage of the pool owned, 0–100.
    pub share_percent: Decimal,
    pub usd_value: Decimal,
    /// Tokens earned per day at the current emission rate.
    pub projected_daily_reward: Decimal,
    pub projected_daily_reward_usd: Decimal,
    pub unlocks_at: Option<DateTime<Utc>>,
    /// Time left until the stake unlocks, e.g. `"2d 04:00:00"`. `None` once
    /// unlocked or for stakes without a lock.
    pub unlocks_in: Option<String>,
}

impl StakingPosition {
    /// Evaluate `stake` against `pool` as of `now`.
    pub fn evaluate(pool: &StakingPool, stake: &UserStake, now: DateTime<Utc>) -> Self {
        let share_percent = pool_share_percent(stake.staked_amount, pool.total_staked);
        let projected_daily_reward = (pool.daily_emission * share_percent / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(TOKEN_DP, RoundingStrategy::ToZero);
        Self {
            pool_id: pool.id,
            pool_name: pool.name.clone(),
            asset_symbol: pool.asset_symbol.clone(),
            staked_tokens: stake.staked_amount,
            share_percent,
            usd_value: tokens_to_usd(stake.staked_amount, pool.token_price_usd),
            projected_daily_reward,
            projected_daily_reward_usd: tokens_to_usd(projected_daily_reward, pool.token_price_usd),
            unlocks_at: stake.unlocks_at,
            unlocks_in: stake
                .unlocks_at
                .map(Countdown::until)
                .filter(|c| !c.is_elapsed(now))
                .map(|c| c.display(now)),
        }
    }
}

/// Percentage of `pool_total` held by `user_staked`.
///
/// Zero for an empty pool, never above 100.
pub fn pool_share_percent(user_staked: Decimal, pool_total: Decimal) -> Decimal {
    if pool_total <= Decimal::ZERO || user_staked <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (user_staked / pool_total * Decimal::ONE_HUNDRED)
        .min(Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(SHARE_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// USD value of `tokens` at `price`, to the cent.
pub fn tokens_to_usd(tokens: Decimal, price: Decimal) -> Decimal {
    (tokens * price).round_dp_with_strategy(USD_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Tokens bought by `usd` at `price`; `None` when the price is not positive.
pub fn usd_to_tokens(usd: Decimal, price: Decimal) -> Option<Decimal> {
    if price <= Decimal::ZERO {
        return None;
    }
    Some((usd / price).round_dp_with_strategy(TOKEN_DP, RoundingStrategy::ToZero))
}
