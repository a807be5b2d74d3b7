//! Reward and staking formulas.
//!
//! Pure arithmetic over figures the backend has already aggregated: pool
//! ownership, token/USD conversion and activity-based pollen points.

pub mod pollen;
pub mod staking;

pub use pollen::{ActivitySummary, PollenRates, PollenTier, pollen_points};
pub use staking::{
    StakingPool, StakingPosition, UserStake, pool_share_percent, tokens_to_usd, usd_to_tokens,
};
