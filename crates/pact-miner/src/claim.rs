//! Claim planning.
//!
//! A [`ClaimPlan`] is the read-only result of walking a donor's unclaimed
//! range. `claim` commits it; `calculate_claimable` only reports it. Both use
//! the same plan, so they cannot disagree.

use alloy_primitives::{Address, U256};
use pact_core::error::MathError;
use pact_core::math;

use crate::ledger::ContributionLedger;
use crate::reward;
use crate::schedule::ScheduleView;
use crate::window::EligibilityWindow;

/// How far a claim may reach.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimBound {
    /// Up to the claim frontier (`now_period - claim_delay`).
    Frontier,
    /// Up to the frontier, but no further than the given period.
    UpTo(u64),
    /// Up to the given period, ignoring the claim delay.
    IgnoreDelayUpTo(u64),
    /// Every closed period, ignoring the claim delay.
    AllClosed,
}

/// Outcome of walking one donor's unclaimed range.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClaimPlan {
    /// First period considered. 0 when the range is empty.
    pub from: u64,
    /// Last period considered and the donor's new cursor. 0 when empty.
    pub to: u64,
    /// Total owed across eligible periods in the range.
    pub amount: U256,
    /// Periods in the range skipped because they left the horizon.
    pub forfeited: u64,
}

impl ClaimPlan {
    /// Whether the plan covers any period at all.
    pub fn is_empty(&self) -> bool {
        self.to == 0
    }
}

/// Resolve the upper bound of a claim at `now_period`.
fn upper_bound(window: &EligibilityWindow, now_period: u64, bound: ClaimBound) -> Option<u64> {
    match bound {
        ClaimBound::Frontier => window.frontier(now_period),
        ClaimBound::UpTo(last) => window.frontier(now_period).map(|f| f.min(last)),
        ClaimBound::IgnoreDelayUpTo(last) => Some(now_period.min(last)),
        ClaimBound::AllClosed => Some(now_period),
    }
}

/// Walk `donor`'s unclaimed periods in `view` and total what is owed.
///
/// Periods outside the horizon are counted as forfeited without being
/// evaluated, so cost is bounded by the window size rather than by how far
/// the donor's cursor has fallen behind.
pub fn plan(
    view: &ScheduleView<'_>,
    ledger: &ContributionLedger,
    window: &EligibilityWindow,
    donor: &Address,
    bound: ClaimBound,
) -> Result<ClaimPlan, MathError> {
    let now_period = view.last_closed_number();
    let last_claimed = ledger.donor(donor).map_or(0, |r| r.last_claimed_period);

    let Some(to) = upper_bound(window, now_period, bound) else {
        return Ok(ClaimPlan::default());
    };
    let from = last_claimed.saturating_add(1);
    if to < from {
        return Ok(ClaimPlan::default());
    }

    let first_eligible = from.max(window.horizon_start(now_period));
    let forfeited = first_eligible.min(to.saturating_add(1)) - from;

    let mut amount = U256::ZERO;
    for number in first_eligible..=to {
        debug_assert!(window.within_horizon(number, now_period));
        let Some(period) = view.get(number) else {
            continue;
        };
        amount = math::add(amount, reward::share_of(ledger, donor, period)?)?;
    }

    Ok(ClaimPlan { from, to, amount, forfeited })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::NewContribution;
    use crate::schedule::{RewardSchedule, RollPolicy};
    use pact_core::constants::tokens;
    use pact_core::types::{DonationTarget, ScheduleParams};

    fn alice() -> Address {
        Address::repeat_byte(0xa1)
    }

    fn params() -> ScheduleParams {
        ScheduleParams { period_length: 20, decay_numerator: 998_902, decay_denominator: 1_000_000 }
    }

    fn policy() -> RollPolicy {
        RollPolicy {
            staking_donation_ratio: 0,
            carry_unallocated_rewards: false,
            rebased_stake_credit: U256::ZERO,
        }
    }

    /// Schedule with alice as the only contributor in period 1.
    fn setup() -> (RewardSchedule, ContributionLedger) {
        let mut schedule = RewardSchedule::new(130, tokens(216_000), &params(), 0).unwrap();
        let mut ledger = ContributionLedger::new();
        ledger.record(NewContribution {
            donor: alice(),
            target: DonationTarget::Treasury,
            period_number: 1,
            tick: 131,
            normalized_amount: tokens(100),
            eligible_amount: tokens(100),
            source_token: Address::ZERO,
            raw_amount: tokens(100),
        });
        schedule.open_mut().contribution_total = tokens(100);
        (schedule, ledger)
    }

    #[test]
    fn claims_first_period_after_close() {
        let (schedule, ledger) = setup();
        let window = EligibilityWindow::new(0, 8);
        let view = schedule.project(150, &params(), policy()).unwrap();
        let plan = plan(&view, &ledger, &window, &alice(), ClaimBound::Frontier).unwrap();
        assert_eq!(plan, ClaimPlan { from: 1, to: 1, amount: tokens(4_320_000), forfeited: 0 });
    }

    #[test]
    fn empty_before_anything_closes() {
        let (schedule, ledger) = setup();
        let window = EligibilityWindow::new(0, 8);
        let view = schedule.project(140, &params(), policy()).unwrap();
        let plan = plan(&view, &ledger, &window, &alice(), ClaimBound::Frontier).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.amount, U256::ZERO);
    }

    #[test]
    fn delay_is_honored_unless_ignored() {
        let (schedule, ledger) = setup();
        let window = EligibilityWindow::new(5, 8);
        let view = schedule.project(150, &params(), policy()).unwrap();
        let held = plan(&view, &ledger, &window, &alice(), ClaimBound::Frontier).unwrap();
        assert!(held.is_empty());
        let ignored = plan(&view, &ledger, &window, &alice(), ClaimBound::AllClosed).unwrap();
        assert_eq!(ignored.amount, tokens(4_320_000));
        let capped = plan(&view, &ledger, &window, &alice(), ClaimBound::IgnoreDelayUpTo(0)).unwrap();
        assert!(capped.is_empty());
    }

    #[test]
    fn out_of_horizon_periods_are_forfeited() {
        let (schedule, ledger) = setup();
        let window = EligibilityWindow::new(0, 2);
        // now_period = 4: horizon starts at period 2
        let view = schedule.project(130 + 20 * 4, &params(), policy()).unwrap();
        assert_eq!(view.last_closed_number(), 4);
        let plan = plan(&view, &ledger, &window, &alice(), ClaimBound::Frontier).unwrap();
        assert_eq!(plan.from, 1);
        assert_eq!(plan.to, 4);
        assert_eq!(plan.forfeited, 1);
        assert_eq!(plan.amount, U256::ZERO);
    }

    #[test]
    fn partial_bound_caps_range() {
        let (schedule, ledger) = setup();
        let window = EligibilityWindow::new(0, 8);
        let view = schedule.project(130 + 20 * 3, &params(), policy()).unwrap();
        let plan = plan(&view, &ledger, &window, &alice(), ClaimBound::UpTo(2)).unwrap();
        assert_eq!((plan.from, plan.to), (1, 2));
        assert_eq!(plan.amount, tokens(4_320_000));
    }
}
