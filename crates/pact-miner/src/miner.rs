//! The donation-mining engine.
//!
//! [`DonationMiner`] owns the schedule, the ledger and the runtime
//! parameters, and talks to the outside world only through
//! [`Collaborators`]. Every mutating call reads the tick once, projects the
//! schedule to it, validates, and only then writes, so a rejected call leaves
//! all aggregates untouched.

use std::sync::Arc;

use alloy_primitives::{Address, I256, U256};
use pact_core::error::{ConfigError, ContributionError, MathError, MinerError};
use pact_core::math;
use pact_core::traits::{Clock, PayoutSink, PriceConversion, RewardStaker};
use pact_core::types::{
    ClaimableReward, Contribution, DonationTarget, DonorRecord, RewardPeriod, ScheduleParams,
};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::claim::{self, ClaimBound, ClaimPlan};
use crate::config::{Authority, MinerConfig, MinerParams};
use crate::ledger::{ContributionLedger, NewContribution};
use crate::reward;
use crate::schedule::{RewardSchedule, RollPolicy, ScheduleView};
use crate::snapshot::{MinerState, SNAPSHOT_FORMAT};

/// Engine behind a read/write lock: mutations take the write lock, queries
/// the read lock.
pub type SharedMiner = Arc<RwLock<DonationMiner>>;

/// External services the engine depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub clock: Arc<dyn Clock>,
    pub prices: Arc<dyn PriceConversion>,
    pub payout: Arc<dyn PayoutSink>,
    pub staker: Arc<dyn RewardStaker>,
}

pub struct DonationMiner {
    params: MinerParams,
    authority: Authority,
    schedule: RewardSchedule,
    ledger: ContributionLedger,
    collaborators: Collaborators,
}

impl DonationMiner {
    /// Build a fresh engine from validated configuration.
    pub fn new(config: &MinerConfig, collaborators: Collaborators) -> Result<Self, MinerError> {
        let params = config.params()?;
        let authority = config.authority()?;
        let schedule = RewardSchedule::new(
            config.start_tick,
            config.first_reward()?,
            &params.schedule,
            params.staking_donation_ratio,
        )?;
        info!(
            start_tick = config.start_tick,
            period_length = params.schedule.period_length,
            admin = %authority.admin,
            "donation miner initialized"
        );
        Ok(Self { params, authority, schedule, ledger: ContributionLedger::new(), collaborators })
    }

    /// Rebuild an engine from a [`snapshot`](Self::snapshot).
    pub fn restore(bytes: &[u8], collaborators: Collaborators) -> Result<Self, MinerError> {
        let state = MinerState::from_json(bytes)?;
        state.params.schedule.validate()?;
        info!(
            periods = state.schedule.period_count(),
            contributions = state.ledger.contribution_count(),
            "restored donation miner"
        );
        Ok(Self {
            params: state.params,
            authority: state.authority,
            schedule: state.schedule,
            ledger: state.ledger,
            collaborators,
        })
    }

    /// Serialize all state except the collaborators.
    pub fn snapshot(&self) -> Result<Vec<u8>, MinerError> {
        Ok(self.state().to_json()?)
    }

    /// A copy of all state except the collaborators.
    pub fn state(&self) -> MinerState {
        MinerState {
            format: SNAPSHOT_FORMAT,
            params: self.params,
            authority: self.authority,
            schedule: self.schedule.clone(),
            ledger: self.ledger.clone(),
        }
    }

    pub fn into_shared(self) -> SharedMiner {
        Arc::new(RwLock::new(self))
    }

    pub fn params(&self) -> &MinerParams {
        &self.params
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    pub fn schedule(&self) -> &RewardSchedule {
        &self.schedule
    }

    pub fn ledger(&self) -> &ContributionLedger {
        &self.ledger
    }

    fn tick(&self) -> u64 {
        self.collaborators.clock.current_tick()
    }

    /// Roll policy for the current parameters. Stake credit is rebased from
    /// the ledger only when the ratio differs from the open period's.
    fn roll_policy(&self) -> Result<RollPolicy, MathError> {
        let ratio = self.params.staking_donation_ratio;
        let rebased = if ratio == self.schedule.open().staking_donation_ratio {
            U256::ZERO
        } else {
            self.ledger.stake_credit_total(ratio)?
        };
        Ok(self.params.roll_policy(rebased))
    }

    fn view_at(&self, tick: u64) -> Result<ScheduleView<'_>, MathError> {
        self.schedule
            .project(tick, &self.params.schedule, self.roll_policy()?)
    }

    fn roll_to(&mut self, tick: u64) -> Result<(), MathError> {
        let policy = self.roll_policy()?;
        self.schedule.ensure_rolled(tick, &self.params.schedule, policy)?;
        Ok(())
    }

    fn require_started(&self, tick: u64) -> Result<(), ContributionError> {
        let start_tick = self.schedule.start_tick();
        if tick < start_tick {
            return Err(ContributionError::NotStarted { tick, start_tick });
        }
        Ok(())
    }

    fn require_admin(&self, caller: Address) -> Result<(), ConfigError> {
        self.authority
            .require_admin(caller)
            .inspect_err(|_| warn!(%caller, "rejected admin call"))
    }

    // ------------------------------------------------------------------
    // Contributions and stake
    // ------------------------------------------------------------------

    /// Record a contribution of `raw_amount` of `token` sent to `target`.
    /// Returns the new contribution id.
    pub fn record_contribution(
        &mut self,
        donor: Address,
        raw_amount: U256,
        token: Address,
        target: DonationTarget,
    ) -> Result<u64, MinerError> {
        let tick = self.tick();
        self.contribute(donor, raw_amount, token, target, tick)
    }

    /// Record a treasury contribution that moved no value. Admin only.
    pub fn record_virtual_contribution(
        &mut self,
        caller: Address,
        donor: Address,
        raw_amount: U256,
        token: Address,
    ) -> Result<u64, MinerError> {
        self.require_admin(caller)?;
        let tick = self.tick();
        let id = self.contribute(donor, raw_amount, token, DonationTarget::Treasury, tick)?;
        info!(id, %donor, "recorded virtual contribution");
        Ok(id)
    }

    fn contribute(
        &mut self,
        donor: Address,
        raw_amount: U256,
        token: Address,
        target: DonationTarget,
        tick: u64,
    ) -> Result<u64, MinerError> {
        if raw_amount.is_zero() {
            return Err(ContributionError::InvalidAmount.into());
        }
        self.require_started(tick)?;
        let normalized = self.collaborators.prices.normalize(token, raw_amount)?;
        let eligible = match target {
            DonationTarget::Treasury => normalized,
            DonationTarget::Community(_) => {
                math::ratio_div(normalized, self.params.community_donation_ratio)
            }
        };
        if eligible.is_zero() {
            return Err(ContributionError::InvalidAmount.into());
        }

        let view = self.view_at(tick)?;
        let period_number = view.current_number();
        let contribution_total = math::add(view.open().contribution_total, eligible)?;
        let rolled = view.into_rolled();

        self.schedule.apply(rolled);
        self.schedule.open_mut().contribution_total = contribution_total;
        let id = self.ledger.record(NewContribution {
            donor,
            target,
            period_number,
            tick,
            normalized_amount: normalized,
            eligible_amount: eligible,
            source_token: token,
            raw_amount,
        });
        debug!(id, %donor, %target, period = period_number, amount = %eligible, "recorded contribution");
        Ok(id)
    }

    /// Apply a stake change pushed by the staking ledger.
    ///
    /// The donor's new principal holds from the open period onward until the
    /// next change.
    pub fn record_stake_delta(
        &mut self,
        caller: Address,
        donor: Address,
        delta: I256,
    ) -> Result<(), MinerError> {
        self.authority
            .require_staking(caller)
            .inspect_err(|_| warn!(%caller, "rejected stake delta"))?;
        if delta.is_zero() {
            return Err(ContributionError::InvalidAmount.into());
        }
        let tick = self.tick();
        self.require_started(tick)?;

        let view = self.view_at(tick)?;
        let period_number = view.current_number();
        let staked = self.ledger.stake_at(&donor, period_number);
        let amount = delta.unsigned_abs();
        let period_total = view.open().stake_principal_total;
        let (principal, period_total) = if delta.is_negative() {
            let principal = staked
                .checked_sub(amount)
                .ok_or(ContributionError::InsufficientStake { staked, requested: amount })?;
            let total = period_total
                .checked_sub(amount)
                .ok_or(MathError::ArithmeticOverflow)?;
            (principal, total)
        } else {
            (math::add(staked, amount)?, math::add(period_total, amount)?)
        };
        let credit_total = reward::rebase_credit_total(view.open(), staked, principal)?;
        let rolled = view.into_rolled();

        self.schedule.apply(rolled);
        let open = self.schedule.open_mut();
        open.stake_principal_total = period_total;
        open.stake_credit_total = credit_total;
        self.ledger.set_stake(donor, period_number, principal);
        debug!(%donor, %delta, %principal, period = period_number, "recorded stake delta");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Claims
    // ------------------------------------------------------------------

    fn settle(&mut self, donor: Address, bound: ClaimBound) -> Result<ClaimPlan, MinerError> {
        let tick = self.tick();
        let view = self.view_at(tick)?;
        let plan = claim::plan(&view, &self.ledger, &self.params.window, &donor, bound)?;
        let rolled = view.into_rolled();

        self.schedule.apply(rolled);
        if plan.is_empty() {
            return Ok(plan);
        }
        self.ledger.mark_claimed(donor, plan.to, tick);
        if plan.forfeited > 0 {
            debug!(%donor, forfeited = plan.forfeited, "unclaimed periods left the eligibility horizon");
        }
        if !plan.amount.is_zero() {
            self.collaborators.payout.payout(donor, plan.amount);
        }
        info!(%donor, from = plan.from, to = plan.to, amount = %plan.amount, "claimed rewards");
        Ok(plan)
    }

    /// Pay everything currently claimable. Returns the amount paid.
    pub fn claim(&mut self, donor: Address) -> Result<U256, MinerError> {
        Ok(self.settle(donor, ClaimBound::Frontier)?.amount)
    }

    /// Pay claimable periods up to `last_period`.
    pub fn claim_partial(
        &mut self,
        donor: Address,
        last_period: u64,
    ) -> Result<ClaimableReward, MinerError> {
        let plan = self.settle(donor, ClaimBound::UpTo(last_period))?;
        Ok(ClaimableReward { amount: plan.amount, last_period: plan.to })
    }

    /// Claim every closed period regardless of claim delay and stake the
    /// proceeds for the donor instead of paying them out.
    pub fn stake_rewards(&mut self, donor: Address) -> Result<U256, MinerError> {
        let tick = self.tick();
        let view = self.view_at(tick)?;
        let plan = claim::plan(&view, &self.ledger, &self.params.window, &donor, ClaimBound::AllClosed)?;
        let period_number = view.current_number();
        let staked = self.ledger.stake_at(&donor, period_number);
        let principal = math::add(staked, plan.amount)?;
        let period_total = math::add(view.open().stake_principal_total, plan.amount)?;
        let credit_total = reward::rebase_credit_total(view.open(), staked, principal)?;
        let rolled = view.into_rolled();

        self.schedule.apply(rolled);
        if plan.is_empty() {
            return Ok(U256::ZERO);
        }
        self.ledger.mark_claimed(donor, plan.to, tick);
        if !plan.amount.is_zero() {
            let open = self.schedule.open_mut();
            open.stake_principal_total = period_total;
            open.stake_credit_total = credit_total;
            self.ledger.set_stake(donor, period_number, principal);
            self.collaborators.staker.stake_for(donor, plan.amount);
        }
        info!(%donor, from = plan.from, to = plan.to, amount = %plan.amount, "staked rewards");
        Ok(plan.amount)
    }

    // ------------------------------------------------------------------
    // Read-only queries
    // ------------------------------------------------------------------

    /// Donor's share of the open period given the weight recorded so far.
    pub fn estimate(&self, donor: Address) -> Result<U256, MinerError> {
        let view = self.view_at(self.tick())?;
        Ok(reward::share_of(&self.ledger, &donor, view.open())?)
    }

    /// What [`claim`](Self::claim) would pay right now.
    pub fn calculate_claimable(&self, donor: Address) -> Result<U256, MinerError> {
        let view = self.view_at(self.tick())?;
        let plan = claim::plan(&view, &self.ledger, &self.params.window, &donor, ClaimBound::Frontier)?;
        Ok(plan.amount)
    }

    /// Reward owed for closed periods up to `last_period`, ignoring the
    /// claim delay.
    pub fn calculate_claimable_by_period(
        &self,
        donor: Address,
        last_period: u64,
    ) -> Result<ClaimableReward, MinerError> {
        let view = self.view_at(self.tick())?;
        let plan = claim::plan(
            &view,
            &self.ledger,
            &self.params.window,
            &donor,
            ClaimBound::IgnoreDelayUpTo(last_period),
        )?;
        Ok(ClaimableReward { amount: plan.amount, last_period: plan.to })
    }

    /// A period as of the current tick. `None` for periods not yet opened.
    pub fn period_info(&self, number: u64) -> Result<Option<RewardPeriod>, MinerError> {
        let view = self.view_at(self.tick())?;
        Ok(view.get(number).cloned())
    }

    /// Number of the open period at the current tick.
    pub fn current_period_number(&self) -> Result<u64, MinerError> {
        Ok(self.view_at(self.tick())?.current_number())
    }

    /// Periods materialized in storage. Lags
    /// [`current_period_number`](Self::current_period_number) until the next
    /// mutation crosses the pending boundaries.
    pub fn period_count(&self) -> u64 {
        self.schedule.period_count()
    }

    pub fn donor(&self, donor: Address) -> Option<DonorRecord> {
        self.ledger.donor(&donor).copied()
    }

    pub fn contribution(&self, id: u64) -> Option<Contribution> {
        self.ledger.contribution(id).cloned()
    }

    pub fn contribution_count(&self) -> u64 {
        self.ledger.contribution_count()
    }

    /// Reward-eligible contributions by `donor` in `period`.
    pub fn donor_period_contribution(&self, period: u64, donor: Address) -> U256 {
        self.ledger.contribution_in(&donor, period)
    }

    /// Staked principal in effect for `donor` during `period`.
    pub fn donor_stake_at(&self, period: u64, donor: Address) -> U256 {
        self.ledger.stake_at(&donor, period)
    }

    // ------------------------------------------------------------------
    // Privileged configuration
    // ------------------------------------------------------------------

    /// Close the open period at the current tick and continue under new
    /// schedule parameters.
    pub fn update_schedule_params(
        &mut self,
        caller: Address,
        new_params: ScheduleParams,
    ) -> Result<(), MinerError> {
        self.require_admin(caller)?;
        new_params.validate()?;
        let tick = self.tick();
        self.roll_to(tick)?;
        let policy = self.roll_policy()?;
        self.schedule.force_close(tick, &new_params, policy)?;
        self.params.schedule = new_params;
        self.params.bump();
        info!(
            version = self.params.version,
            period_length = new_params.period_length,
            decay_numerator = new_params.decay_numerator,
            decay_denominator = new_params.decay_denominator,
            "updated schedule parameters"
        );
        Ok(())
    }

    pub fn update_claim_delay(&mut self, caller: Address, claim_delay: u64) -> Result<(), MinerError> {
        self.require_admin(caller)?;
        self.roll_to(self.tick())?;
        self.params.window.claim_delay = claim_delay;
        self.params.bump();
        info!(version = self.params.version, claim_delay, "updated claim delay");
        Ok(())
    }

    pub fn update_against_periods(
        &mut self,
        caller: Address,
        against_periods: u64,
    ) -> Result<(), MinerError> {
        self.require_admin(caller)?;
        self.roll_to(self.tick())?;
        self.params.window.against_periods = against_periods;
        self.params.bump();
        info!(version = self.params.version, against_periods, "updated against periods");
        Ok(())
    }

    /// Takes effect for periods opened after the call. Zero disables stake
    /// credit in those periods.
    pub fn update_staking_donation_ratio(
        &mut self,
        caller: Address,
        ratio: u64,
    ) -> Result<(), MinerError> {
        self.require_admin(caller)?;
        self.roll_to(self.tick())?;
        self.params.staking_donation_ratio = ratio;
        self.params.bump();
        info!(version = self.params.version, ratio, "updated staking donation ratio");
        Ok(())
    }

    pub fn update_community_donation_ratio(
        &mut self,
        caller: Address,
        ratio: u64,
    ) -> Result<(), MinerError> {
        self.require_admin(caller)?;
        if ratio == 0 {
            return Err(ConfigError::InvalidRatio("community donation ratio must be positive").into());
        }
        self.roll_to(self.tick())?;
        self.params.community_donation_ratio = ratio;
        self.params.bump();
        info!(version = self.params.version, ratio, "updated community donation ratio");
        Ok(())
    }

    /// Takes effect for periods closing after the call.
    pub fn update_carry_unallocated_rewards(
        &mut self,
        caller: Address,
        enabled: bool,
    ) -> Result<(), MinerError> {
        self.require_admin(caller)?;
        self.roll_to(self.tick())?;
        self.params.carry_unallocated_rewards = enabled;
        self.params.bump();
        info!(version = self.params.version, enabled, "updated unallocated reward carry");
        Ok(())
    }

    pub fn transfer_admin(&mut self, caller: Address, new_admin: Address) -> Result<(), MinerError> {
        self.require_admin(caller)?;
        self.authority.admin = new_admin;
        self.params.bump();
        info!(version = self.params.version, %new_admin, "transferred admin");
        Ok(())
    }

    pub fn update_staking_authority(
        &mut self,
        caller: Address,
        staking: Address,
    ) -> Result<(), MinerError> {
        self.require_admin(caller)?;
        self.authority.staking = staking;
        self.params.bump();
        info!(version = self.params.version, %staking, "updated staking authority");
        Ok(())
    }
}
