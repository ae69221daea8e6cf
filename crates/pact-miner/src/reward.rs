//! One donor's share of one period.
//!
//! `share = donor_weight * reward_amount / total_weight`, truncating. A
//! period with no weight pays nobody. Shares are recomputed from the stored
//! aggregates on every call; there is no running accumulator.

use alloy_primitives::{Address, U256};
use pact_core::error::MathError;
use pact_core::math;
use pact_core::types::RewardPeriod;

use crate::ledger::ContributionLedger;

/// Donation-equivalent credit of `donor`'s stake in `period`, using the
/// ratio snapshotted when the period opened.
pub fn stake_credit(ledger: &ContributionLedger, donor: &Address, period: &RewardPeriod) -> U256 {
    math::ratio_div(
        ledger.stake_at(donor, period.number),
        period.staking_donation_ratio,
    )
}

/// `period`'s stake credit total after one donor's principal moves from
/// `old_principal` to `new_principal`.
///
/// The total stays the sum of truncated per-donor credits, so the share
/// numerators of a period always add up to its stake weight.
pub fn rebase_credit_total(
    period: &RewardPeriod,
    old_principal: U256,
    new_principal: U256,
) -> Result<U256, MathError> {
    let ratio = period.staking_donation_ratio;
    let remaining = period
        .stake_credit_total
        .checked_sub(math::ratio_div(old_principal, ratio))
        .ok_or(MathError::ArithmeticOverflow)?;
    math::add(remaining, math::ratio_div(new_principal, ratio))
}

/// Contributions plus stake credit of `donor` in `period`.
pub fn donor_weight(
    ledger: &ContributionLedger,
    donor: &Address,
    period: &RewardPeriod,
) -> Result<U256, MathError> {
    math::add(
        ledger.contribution_in(donor, period.number),
        stake_credit(ledger, donor, period),
    )
}

/// Reward owed to `donor` for `period`.
pub fn share_of(
    ledger: &ContributionLedger,
    donor: &Address,
    period: &RewardPeriod,
) -> Result<U256, MathError> {
    let total = period.total_weight()?;
    if total.is_zero() {
        return Ok(U256::ZERO);
    }
    let weight = donor_weight(ledger, donor, period)?;
    if weight.is_zero() {
        return Ok(U256::ZERO);
    }
    math::mul_div(weight, period.reward_amount()?, total)
}
