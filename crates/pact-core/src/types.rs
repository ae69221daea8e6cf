//! Core accounting types: reward periods, donors, contributions.
//!
//! All monetary values are in smallest token units (1 token = 10^18 units).
//! Ticks and period numbers are `u64`; period numbers start at 1.

use std::fmt;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, MathError};
use crate::math;

/// Parameters that shape the reward curve going forward.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduleParams {
    /// Ticks per reward period.
    pub period_length: u64,
    /// Decay numerator applied once per period transition.
    pub decay_numerator: u64,
    /// Decay denominator applied once per period transition.
    pub decay_denominator: u64,
}

impl ScheduleParams {
    /// Reject zero-length periods and zero decay denominators.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period_length == 0 {
            return Err(ConfigError::InvalidSchedule(
                "period length must be positive".to_string(),
            ));
        }
        if self.decay_denominator == 0 {
            return Err(ConfigError::InvalidSchedule(
                "decay denominator must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// One reward epoch.
///
/// `rate_per_tick`, the tick bounds and `staking_donation_ratio` are fixed
/// once the period closes. The two running totals are only ever touched
/// while the period is open.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RewardPeriod {
    /// Sequential period number, starting at 1.
    pub number: u64,
    /// First tick of the period.
    pub start_tick: u64,
    /// Last tick of the period (inclusive).
    pub end_tick: u64,
    /// Decayed reward issued per tick during this period.
    pub rate_per_tick: U256,
    /// Reward passed in from an earlier zero-weight period (zero unless
    /// carrying is enabled).
    pub carried_reward: U256,
    /// Scheduled issuance through and including this period.
    pub cumulative_reward_issued: U256,
    /// Sum of reward-eligible contribution amounts recorded in this period.
    pub contribution_total: U256,
    /// Raw staked principal in effect during this period.
    pub stake_principal_total: U256,
    /// Sum of every staker's credit, each truncated on its own:
    /// `sum(principal_i / staking_donation_ratio)`. Equal to the sum of the
    /// per-donor credits used as share numerators.
    pub stake_credit_total: U256,
    /// Staked principal per unit of donation weight, snapshotted at open.
    pub staking_donation_ratio: u64,
}

impl RewardPeriod {
    /// Number of ticks covered by the period.
    pub fn length(&self) -> u64 {
        self.end_tick - self.start_tick + 1
    }

    /// Whether `tick` falls inside the period.
    pub fn contains(&self, tick: u64) -> bool {
        (self.start_tick..=self.end_tick).contains(&tick)
    }

    /// Reward issued by the schedule for this period: `rate * length`.
    pub fn base_reward(&self) -> Result<U256, MathError> {
        math::scale_by_ticks(self.rate_per_tick, self.length())
    }

    /// Reward distributed among this period's participants.
    pub fn reward_amount(&self) -> Result<U256, MathError> {
        math::add(self.base_reward()?, self.carried_reward)
    }

    /// Contributions plus stake credit.
    pub fn total_weight(&self) -> Result<U256, MathError> {
        math::add(self.contribution_total, self.stake_credit_total)
    }
}

/// Per-participant claim state.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DonorRecord {
    /// Distinct periods with at least one recorded contribution.
    pub periods_participated: u64,
    /// Highest period already settled. 0 if never claimed.
    pub last_claimed_period: u64,
    /// Tick of the most recent claim. 0 if never claimed.
    pub last_claim_tick: u64,
}

/// Where the underlying value of a contribution went.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DonationTarget {
    /// The shared treasury.
    Treasury,
    /// A beneficiary community. Its reward-eligible amount is divided by the
    /// community donation ratio.
    Community(Address),
}

impl fmt::Display for DonationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Treasury => write!(f, "treasury"),
            Self::Community(addr) => write!(f, "community:{addr}"),
        }
    }
}

/// An append-only contribution log entry.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Contribution {
    /// Sequential id, starting at 1.
    pub id: u64,
    pub donor: Address,
    pub target: DonationTarget,
    pub period_number: u64,
    pub tick: u64,
    /// Amount after price conversion, before any community ratio.
    pub normalized_amount: U256,
    /// Amount counted toward reward weight.
    pub eligible_amount: U256,
    pub source_token: Address,
    pub raw_amount: U256,
}

/// Result of a read-only claim computation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClaimableReward {
    /// Amount that would be paid.
    pub amount: U256,
    /// Last period included in the computation (the donor's cursor after a
    /// matching claim). 0 when nothing is in range.
    pub last_period: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::tokens;

    fn period() -> RewardPeriod {
        RewardPeriod {
            number: 1,
            start_tick: 130,
            end_tick: 149,
            rate_per_tick: tokens(216_000),
            carried_reward: U256::ZERO,
            cumulative_reward_issued: tokens(4_320_000),
            contribution_total: U256::ZERO,
            stake_principal_total: U256::ZERO,
            stake_credit_total: U256::ZERO,
            staking_donation_ratio: 0,
        }
    }

    #[test]
    fn period_length_is_inclusive() {
        let p = period();
        assert_eq!(p.length(), 20);
        assert!(p.contains(130));
        assert!(p.contains(149));
        assert!(!p.contains(150));
        assert!(!p.contains(129));
    }

    #[test]
    fn reward_amount_includes_carry() {
        let mut p = period();
        assert_eq!(p.reward_amount().unwrap(), tokens(4_320_000));
        p.carried_reward = tokens(5);
        assert_eq!(p.reward_amount().unwrap(), tokens(4_320_005));
        assert_eq!(p.base_reward().unwrap(), tokens(4_320_000));
    }

    #[test]
    fn total_weight_adds_stake_credit() {
        let mut p = period();
        p.stake_principal_total = tokens(2_000_000);
        p.staking_donation_ratio = 1_000_000;
        assert_eq!(p.total_weight().unwrap(), U256::ZERO);
        p.stake_credit_total = tokens(2);
        p.contribution_total = tokens(98);
        assert_eq!(p.total_weight().unwrap(), tokens(100));
    }

    #[test]
    fn schedule_params_validation() {
        let ok = ScheduleParams { period_length: 20, decay_numerator: 1, decay_denominator: 10 };
        assert!(ok.validate().is_ok());
        let zero_len = ScheduleParams { period_length: 0, ..ok };
        assert!(matches!(zero_len.validate(), Err(ConfigError::InvalidSchedule(_))));
        let zero_den = ScheduleParams { decay_denominator: 0, ..ok };
        assert!(matches!(zero_den.validate(), Err(ConfigError::InvalidSchedule(_))));
    }

    #[test]
    fn target_display() {
        assert_eq!(DonationTarget::Treasury.to_string(), "treasury");
        let c = DonationTarget::Community(Address::ZERO);
        assert!(c.to_string().starts_with("community:0x"));
    }
}
