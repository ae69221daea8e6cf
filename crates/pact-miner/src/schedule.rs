//! Reward schedule: period boundaries and the decaying rate curve.
//!
//! The schedule is a dense sequence of [`RewardPeriod`]s numbered from 1.
//! Exactly one period is open at any time; every earlier one is closed and
//! immutable. Periods advance lazily: nothing happens until a caller observes
//! a tick past the open period's end, at which point every crossed boundary
//! is materialized in order.
//!
//! Read paths use [`RewardSchedule::project`] to see the schedule as if it had
//! already been rolled to a tick, without mutating it. Write paths project,
//! validate, then [`apply`](RewardSchedule::apply) the same roll, so a
//! mutation never observes a different schedule than the queries before it.

use alloy_primitives::U256;
use pact_core::constants::FIRST_PERIOD;
use pact_core::error::MathError;
use pact_core::math;
use pact_core::types::{RewardPeriod, ScheduleParams};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Knobs captured by each period at the moment it opens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RollPolicy {
    /// Ratio snapshotted into newly opened periods.
    pub staking_donation_ratio: u64,
    /// Pass a zero-weight period's reward into the next period.
    pub carry_unallocated_rewards: bool,
    /// Stake credit of every staker's current principal under
    /// `staking_donation_ratio`. Only read when a period opens with a ratio
    /// different from its predecessor's.
    pub rebased_stake_credit: U256,
}

/// Periods produced by crossing one or more boundaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rolled {
    /// Newly closed periods, oldest first. The first entry is the period
    /// that was open before the roll.
    pub closed: Vec<RewardPeriod>,
    /// The new open period.
    pub open: RewardPeriod,
}

/// Last tick of a period starting at `start`.
fn end_of(start: u64, period_length: u64) -> u64 {
    start.saturating_add(period_length.saturating_sub(1))
}

/// Open the period following `prev`.
///
/// The rate decays once, the stake principal carries over, and the ratio in
/// `policy` is snapshotted. Stake credit carries over unless the ratio
/// changed, in which case it is taken from `policy`.
pub fn open_next(
    prev: &RewardPeriod,
    params: &ScheduleParams,
    policy: RollPolicy,
) -> Result<RewardPeriod, MathError> {
    let start = prev.end_tick.saturating_add(1);
    let carried_reward = if policy.carry_unallocated_rewards && prev.total_weight()?.is_zero() {
        prev.reward_amount()?
    } else {
        U256::ZERO
    };
    let stake_credit_total = if policy.staking_donation_ratio == prev.staking_donation_ratio {
        prev.stake_credit_total
    } else {
        policy.rebased_stake_credit
    };

    let mut next = RewardPeriod {
        number: prev.number + 1,
        start_tick: start,
        end_tick: end_of(start, params.period_length),
        rate_per_tick: math::decay(
            prev.rate_per_tick,
            params.decay_numerator,
            params.decay_denominator,
        )?,
        carried_reward,
        cumulative_reward_issued: U256::ZERO,
        contribution_total: U256::ZERO,
        stake_principal_total: prev.stake_principal_total,
        stake_credit_total,
        staking_donation_ratio: policy.staking_donation_ratio,
    };
    next.cumulative_reward_issued = math::add(prev.cumulative_reward_issued, next.base_reward()?)?;
    Ok(next)
}

/// Compute the periods crossed between `open` and `tick`.
///
/// Returns `None` when `tick` is still inside (or before) the open period.
pub fn roll_forward(
    open: &RewardPeriod,
    tick: u64,
    params: &ScheduleParams,
    policy: RollPolicy,
) -> Result<Option<Rolled>, MathError> {
    if tick <= open.end_tick {
        return Ok(None);
    }
    let mut closed = Vec::new();
    let mut current = open.clone();
    while tick > current.end_tick {
        let next = open_next(&current, params, policy)?;
        closed.push(current);
        current = next;
    }
    Ok(Some(Rolled { closed, open: current }))
}

/// The reward schedule.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RewardSchedule {
    closed: Vec<RewardPeriod>,
    open: RewardPeriod,
}

impl RewardSchedule {
    /// Create a schedule whose first period starts at `start_tick`.
    pub fn new(
        start_tick: u64,
        first_reward_per_tick: U256,
        params: &ScheduleParams,
        staking_donation_ratio: u64,
    ) -> Result<Self, MathError> {
        let mut first = RewardPeriod {
            number: FIRST_PERIOD,
            start_tick,
            end_tick: end_of(start_tick, params.period_length),
            rate_per_tick: first_reward_per_tick,
            carried_reward: U256::ZERO,
            cumulative_reward_issued: U256::ZERO,
            contribution_total: U256::ZERO,
            stake_principal_total: U256::ZERO,
            stake_credit_total: U256::ZERO,
            staking_donation_ratio,
        };
        first.cumulative_reward_issued = first.base_reward()?;
        Ok(Self { closed: Vec::new(), open: first })
    }

    /// The currently open period.
    pub fn open(&self) -> &RewardPeriod {
        &self.open
    }

    pub(crate) fn open_mut(&mut self) -> &mut RewardPeriod {
        &mut self.open
    }

    /// All closed periods, oldest first.
    pub fn closed(&self) -> &[RewardPeriod] {
        &self.closed
    }

    /// Number of the open period.
    pub fn current_number(&self) -> u64 {
        self.open.number
    }

    /// Number of stored periods, the open one included.
    pub fn period_count(&self) -> u64 {
        self.open.number
    }

    /// First tick of period 1.
    pub fn start_tick(&self) -> u64 {
        self.closed.first().unwrap_or(&self.open).start_tick
    }

    /// Look up a stored period by number.
    pub fn get(&self, number: u64) -> Option<&RewardPeriod> {
        if number == self.open.number {
            return Some(&self.open);
        }
        let index = number.checked_sub(FIRST_PERIOD)?;
        self.closed.get(index as usize)
    }

    /// View the schedule as if it had been rolled to `tick`.
    pub fn project(
        &self,
        tick: u64,
        params: &ScheduleParams,
        policy: RollPolicy,
    ) -> Result<ScheduleView<'_>, MathError> {
        let rolled = roll_forward(&self.open, tick, params, policy)?;
        Ok(ScheduleView { schedule: self, rolled })
    }

    /// Commit a roll computed by [`project`](Self::project).
    pub fn apply(&mut self, rolled: Option<Rolled>) {
        let Some(rolled) = rolled else {
            return;
        };
        info!(
            closed = rolled.closed.len(),
            open = rolled.open.number,
            start_tick = rolled.open.start_tick,
            rate_per_tick = %rolled.open.rate_per_tick,
            "rolled reward schedule"
        );
        self.closed.extend(rolled.closed);
        self.open = rolled.open;
    }

    /// Close every period that ended before `tick`. Returns the number of
    /// periods closed. Calling it again with the same tick is a no-op.
    pub fn ensure_rolled(
        &mut self,
        tick: u64,
        params: &ScheduleParams,
        policy: RollPolicy,
    ) -> Result<usize, MathError> {
        let rolled = roll_forward(&self.open, tick, params, policy)?;
        let count = rolled.as_ref().map_or(0, |r| r.closed.len());
        self.apply(rolled);
        Ok(count)
    }

    /// Reshape the schedule under new parameters at `tick`.
    ///
    /// The caller must already have rolled the schedule to `tick`. If the open
    /// period has not started yet it is resized in place. Otherwise it is
    /// closed at `tick` and a successor opens at `tick + 1`, decayed with the
    /// new numerator and denominator.
    pub fn force_close(
        &mut self,
        tick: u64,
        new_params: &ScheduleParams,
        policy: RollPolicy,
    ) -> Result<(), MathError> {
        let prev_cumulative = self
            .closed
            .last()
            .map_or(U256::ZERO, |p| p.cumulative_reward_issued);

        if tick < self.open.start_tick {
            let mut reshaped = self.open.clone();
            reshaped.end_tick = end_of(reshaped.start_tick, new_params.period_length);
            reshaped.cumulative_reward_issued = math::add(prev_cumulative, reshaped.base_reward()?)?;
            info!(
                period = reshaped.number,
                end_tick = reshaped.end_tick,
                "reshaped unstarted reward period"
            );
            self.open = reshaped;
            return Ok(());
        }

        let mut closing = self.open.clone();
        closing.end_tick = tick;
        closing.cumulative_reward_issued = math::add(prev_cumulative, closing.base_reward()?)?;
        let next = open_next(&closing, new_params, policy)?;

        info!(
            closed = closing.number,
            closed_at = tick,
            open = next.number,
            period_length = new_params.period_length,
            rate_per_tick = %next.rate_per_tick,
            "force-closed reward period"
        );
        self.closed.push(closing);
        self.open = next;
        Ok(())
    }
}

/// The schedule as seen from a particular tick.
#[derive(Debug)]
pub struct ScheduleView<'a> {
    schedule: &'a RewardSchedule,
    rolled: Option<Rolled>,
}

impl ScheduleView<'_> {
    /// The open period at the viewed tick.
    pub fn open(&self) -> &RewardPeriod {
        self.rolled.as_ref().map_or(&self.schedule.open, |r| &r.open)
    }

    /// Number of the open period at the viewed tick.
    pub fn current_number(&self) -> u64 {
        self.open().number
    }

    /// Number of the most recent closed period. 0 before period 1 closes.
    pub fn last_closed_number(&self) -> u64 {
        self.current_number() - FIRST_PERIOD
    }

    /// Look up a period by number.
    pub fn get(&self, number: u64) -> Option<&RewardPeriod> {
        let Some(rolled) = &self.rolled else {
            return self.schedule.get(number);
        };
        let base = self.schedule.open.number;
        if number < base {
            return self.schedule.get(number);
        }
        if number == rolled.open.number {
            return Some(&rolled.open);
        }
        rolled.closed.get((number - base) as usize)
    }

    /// Whether viewing required crossing a boundary.
    pub fn is_rolled(&self) -> bool {
        self.rolled.is_some()
    }

    /// Release the computed roll so it can be applied.
    pub fn into_rolled(self) -> Option<Rolled> {
        self.rolled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pact_core::constants::{tokens, DEFAULT_DECAY_DENOMINATOR, DEFAULT_DECAY_NUMERATOR};

    fn params() -> ScheduleParams {
        ScheduleParams {
            period_length: 20,
            decay_numerator: DEFAULT_DECAY_NUMERATOR,
            decay_denominator: DEFAULT_DECAY_DENOMINATOR,
        }
    }

    fn policy() -> RollPolicy {
        RollPolicy {
            staking_donation_ratio: 1_000_000,
            carry_unallocated_rewards: false,
            rebased_stake_credit: U256::ZERO,
        }
    }

    fn schedule() -> RewardSchedule {
        RewardSchedule::new(130, tokens(216_000), &params(), 1_000_000).unwrap()
    }

    // --- construction ---

    #[test]
    fn first_period_bounds() {
        let s = schedule();
        let p = s.open();
        assert_eq!(p.number, 1);
        assert_eq!((p.start_tick, p.end_tick), (130, 149));
        assert_eq!(p.cumulative_reward_issued, tokens(4_320_000));
        assert_eq!(s.start_tick(), 130);
        assert_eq!(s.period_count(), 1);
    }

    // --- rolling ---

    #[test]
    fn boundary_tick_opens_next_period() {
        let mut s = schedule();
        assert_eq!(s.ensure_rolled(149, &params(), policy()).unwrap(), 0);
        assert_eq!(s.current_number(), 1);
        assert_eq!(s.ensure_rolled(150, &params(), policy()).unwrap(), 1);
        assert_eq!(s.current_number(), 2);
        let p2 = s.open();
        assert_eq!((p2.start_tick, p2.end_tick), (150, 169));
        assert_eq!(p2.rate_per_tick, U256::from(215_762_832_000_000_000_000_000u128));
    }

    #[test]
    fn skipping_many_boundaries_closes_each() {
        let mut s = schedule();
        assert_eq!(s.ensure_rolled(130 + 20 * 5, &params(), policy()).unwrap(), 5);
        assert_eq!(s.current_number(), 6);
        for n in 1..=5 {
            let p = s.get(n).unwrap();
            assert_eq!(p.number, n);
            assert_eq!(p.length(), 20);
        }
        assert_eq!(s.get(3).unwrap().rate_per_tick, U256::from(215_525_924_410_464_000_000_000u128));
    }

    #[test]
    fn roll_is_idempotent() {
        let mut once = schedule();
        once.ensure_rolled(200, &params(), policy()).unwrap();
        let mut many = schedule();
        for _ in 0..5 {
            many.ensure_rolled(200, &params(), policy()).unwrap();
        }
        many.ensure_rolled(180, &params(), policy()).unwrap();
        assert_eq!(once, many);
    }

    #[test]
    fn cumulative_tracks_issuance() {
        let mut s = schedule();
        s.ensure_rolled(170, &params(), policy()).unwrap();
        let p1 = s.get(1).unwrap().clone();
        let p2 = s.get(2).unwrap().clone();
        assert_eq!(
            p2.cumulative_reward_issued,
            p1.cumulative_reward_issued + p2.base_reward().unwrap()
        );
    }

    #[test]
    fn stake_principal_and_ratio_carry_into_new_period() {
        let mut s = schedule();
        s.open_mut().stake_principal_total = tokens(7);
        let changed = RollPolicy { staking_donation_ratio: 5, ..policy() };
        s.ensure_rolled(150, &params(), changed).unwrap();
        assert_eq!(s.open().stake_principal_total, tokens(7));
        assert_eq!(s.open().staking_donation_ratio, 5);
        assert_eq!(s.get(1).unwrap().staking_donation_ratio, 1_000_000);
    }

    #[test]
    fn stake_credit_carries_until_ratio_changes() {
        let mut s = schedule();
        s.open_mut().stake_principal_total = U256::from(3_000_000u64);
        s.open_mut().stake_credit_total = U256::from(2);
        s.ensure_rolled(150, &params(), policy()).unwrap();
        assert_eq!(s.open().stake_credit_total, U256::from(2));

        let rebased = RollPolicy {
            staking_donation_ratio: 500_000,
            rebased_stake_credit: U256::from(5),
            ..policy()
        };
        s.ensure_rolled(190, &params(), rebased).unwrap();
        assert_eq!(s.get(3).unwrap().stake_credit_total, U256::from(5));
        // later periods keep the rebased credit since the ratio no longer changes
        assert_eq!(s.open().number, 4);
        assert_eq!(s.open().stake_credit_total, U256::from(5));
    }

    #[test]
    fn carry_passes_empty_period_reward_forward() {
        let carrying = RollPolicy { carry_unallocated_rewards: true, ..policy() };
        let mut s = schedule();
        s.ensure_rolled(150, &params(), carrying).unwrap();
        assert_eq!(s.open().carried_reward, tokens(4_320_000));
        assert_eq!(
            s.open().reward_amount().unwrap(),
            tokens(4_320_000) + s.open().base_reward().unwrap()
        );

        let mut plain = schedule();
        plain.ensure_rolled(150, &params(), policy()).unwrap();
        assert_eq!(plain.open().carried_reward, U256::ZERO);
    }

    #[test]
    fn carry_skips_periods_with_weight() {
        let carrying = RollPolicy { carry_unallocated_rewards: true, ..policy() };
        let mut s = schedule();
        s.open_mut().contribution_total = tokens(1);
        s.ensure_rolled(150, &params(), carrying).unwrap();
        assert_eq!(s.open().carried_reward, U256::ZERO);
    }

    // --- projection ---

    #[test]
    fn projection_matches_applied_roll() {
        let s = schedule();
        let view = s.project(215, &params(), policy()).unwrap();
        assert!(view.is_rolled());
        assert_eq!(view.current_number(), 5);
        assert_eq!(view.last_closed_number(), 4);
        let projected: Vec<_> = (1..=5).map(|n| view.get(n).cloned().unwrap()).collect();
        assert!(view.get(6).is_none());
        assert!(view.get(0).is_none());

        let mut applied = s.clone();
        applied.ensure_rolled(215, &params(), policy()).unwrap();
        let stored: Vec<_> = (1..=5).map(|n| applied.get(n).cloned().unwrap()).collect();
        assert_eq!(projected, stored);
    }

    #[test]
    fn projection_before_start_sees_period_one() {
        let s = schedule();
        let view = s.project(10, &params(), policy()).unwrap();
        assert!(!view.is_rolled());
        assert_eq!(view.current_number(), 1);
        assert_eq!(view.last_closed_number(), 0);
    }

    // --- forced close ---

    #[test]
    fn force_close_shortens_open_period() {
        let mut s = schedule();
        s.ensure_rolled(155, &params(), policy()).unwrap();
        let new = ScheduleParams { period_length: 10, decay_numerator: 1, decay_denominator: 2 };
        s.force_close(155, &new, policy()).unwrap();

        let p2 = s.get(2).unwrap();
        assert_eq!((p2.start_tick, p2.end_tick), (150, 155));
        assert_eq!(
            p2.cumulative_reward_issued,
            tokens(4_320_000) + p2.rate_per_tick * U256::from(6)
        );
        let p3 = s.open();
        assert_eq!(p3.number, 3);
        assert_eq!((p3.start_tick, p3.end_tick), (156, 165));
        assert_eq!(p3.rate_per_tick, p2.rate_per_tick / U256::from(2));
    }

    #[test]
    fn force_close_before_start_reshapes_in_place() {
        let mut s = schedule();
        let new = ScheduleParams { period_length: 50, ..params() };
        s.force_close(100, &new, policy()).unwrap();
        assert_eq!(s.current_number(), 1);
        let p1 = s.open();
        assert_eq!((p1.start_tick, p1.end_tick), (130, 179));
        assert_eq!(p1.rate_per_tick, tokens(216_000));
        assert_eq!(p1.cumulative_reward_issued, tokens(216_000 * 50));
    }

    #[test]
    fn force_close_at_first_tick_leaves_one_tick_period() {
        let mut s = schedule();
        s.force_close(130, &params(), policy()).unwrap();
        assert_eq!(s.get(1).unwrap().length(), 1);
        assert_eq!(s.open().start_tick, 131);
    }
}
