//! Pollen points — activity-based reward accrual.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Activity totals aggregated by the backend for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySummary {
    #[serde(default)]
    pub deposited_usd: Decimal,
    /// Sum over days of the USD value staked that day.
    #[serde(default)]
    pub staked_usd_days: Decimal,
    #[serde(default)]
    pub referrals: u32,
    #[serde(default)]
    pub check_ins: u32,
}

/// Points earned per unit of activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollenRates {
    pub per_usd_deposited: Decimal,
    pub per_usd_day_staked: Decimal,
    pub per_referral: Decimal,
    pub per_check_in: Decimal,
}

impl Default for PollenRates {
    fn default() -> Self {
        Self {
            per_usd_deposited: dec!(1),
            per_usd_day_staked: dec!(0.1),
            per_referral: dec!(50),
            per_check_in: dec!(5),
        }
    }
}

/// Total pollen for an activity summary, truncated to 2 dp and never negative.
pub fn pollen_points(summary: &ActivitySummary, rates: &PollenRates) -> Decimal {
    let points = summary.deposited_usd * rates.per_usd_deposited
        + summary.staked_usd_days * rates.per_usd_day_staked
        + Decimal::from(summary.referrals) * rates.per_referral
        + Decimal::from(summary.check_ins) * rates.per_check_in;
    points
        .max(Decimal::ZERO)
        .round_dp_with_strategy(2, RoundingStrategy::ToZero)
}

/// Standing derived from lifetime pollen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollenTier {
    Worker,
    Forager,
    Guardian,
    Queen,
}

impl PollenTier {
    pub fn for_points(points: Decimal) -> Self {
        if points >= dec!(20000) {
            Self::Queen
        } else if points >= dec!(5000) {
            Self::Guardian
        } else if points >= dec!(1000) {
            Self::Forager
        } else {
            Self::Worker
        }
    }

    /// Points needed to reach the next tier, `None` at the top.
    pub fn next_threshold(self) -> Option<Decimal> {
        match self {
            Self::Worker => Some(dec!(1000)),
            Self::Forager => Some(dec!(5000)),
            Self::Guardian => Some(dec!(20000)),
            Self::Queen => None,
        }
    }
}

impl std::fmt::Display for PollenTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Worker => "worker",
            Self::Forager => "forager",
            Self::Guardian => "guardian",
            Self::Queen => "queen",
        };
        write!(f, "{s}")
    }
}
