//! Contribution ledger.
//!
//! Holds the append-only contribution log, donor claim records, each donor's
//! contribution total per period, and staked principal per donor.
//!
//! Stake principal is stored sparsely: a donor has an entry only for the
//! periods in which their stake changed. The principal in effect for period
//! `n` is the entry with the greatest period `<= n`, or zero if none exists.
//!
//! Period-wide aggregates live on [`RewardPeriod`](pact_core::types::RewardPeriod)
//! and are updated by the engine alongside the rows recorded here.

use std::collections::{BTreeMap, HashMap};

use alloy_primitives::{Address, U256};
use pact_core::error::MathError;
use pact_core::math;
use pact_core::types::{Contribution, DonationTarget, DonorRecord};
use serde::{Deserialize, Serialize};

/// A contribution about to be appended. The ledger assigns the id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewContribution {
    pub donor: Address,
    pub target: DonationTarget,
    pub period_number: u64,
    pub tick: u64,
    pub normalized_amount: U256,
    pub eligible_amount: U256,
    pub source_token: Address,
    pub raw_amount: U256,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LedgerRows", into = "LedgerRows")]
pub struct ContributionLedger {
    contributions: Vec<Contribution>,
    donors: HashMap<Address, DonorRecord>,
    period_amounts: HashMap<(u64, Address), U256>,
    stakes: HashMap<Address, BTreeMap<u64, U256>>,
}

impl ContributionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a contribution and update the donor's per-period total.
    ///
    /// The caller checks that the period aggregate does not overflow; the
    /// donor's share of it cannot exceed it.
    pub fn record(&mut self, entry: NewContribution) -> u64 {
        let id = self.contributions.len() as u64 + 1;
        let key = (entry.period_number, entry.donor);
        let first_in_period = !self.period_amounts.contains_key(&key);

        let amount = self.period_amounts.entry(key).or_insert(U256::ZERO);
        *amount = amount.saturating_add(entry.eligible_amount);

        let record = self.donors.entry(entry.donor).or_default();
        if first_in_period {
            record.periods_participated += 1;
        }

        self.contributions.push(Contribution {
            id,
            donor: entry.donor,
            target: entry.target,
            period_number: entry.period_number,
            tick: entry.tick,
            normalized_amount: entry.normalized_amount,
            eligible_amount: entry.eligible_amount,
            source_token: entry.source_token,
            raw_amount: entry.raw_amount,
        });
        id
    }

    /// Set a donor's staked principal from `period` onward.
    pub fn set_stake(&mut self, donor: Address, period: u64, principal: U256) {
        self.stakes.entry(donor).or_default().insert(period, principal);
        self.donors.entry(donor).or_default();
    }

    /// Staked principal in effect for `donor` during `period`.
    pub fn stake_at(&self, donor: &Address, period: u64) -> U256 {
        self.stakes
            .get(donor)
            .and_then(|history| history.range(..=period).next_back())
            .map_or(U256::ZERO, |(_, principal)| *principal)
    }

    /// Sum of every donor's latest principal divided by `ratio`, each
    /// truncated separately.
    pub fn stake_credit_total(&self, ratio: u64) -> Result<U256, MathError> {
        self.stakes
            .values()
            .filter_map(|history| history.values().next_back())
            .try_fold(U256::ZERO, |acc, principal| {
                math::add(acc, math::ratio_div(*principal, ratio))
            })
    }

    /// Reward-eligible contributions by `donor` in `period`.
    pub fn contribution_in(&self, donor: &Address, period: u64) -> U256 {
        self.period_amounts
            .get(&(period, *donor))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    pub fn donor(&self, donor: &Address) -> Option<&DonorRecord> {
        self.donors.get(donor)
    }

    /// Move a donor's claim cursor, creating the record if needed.
    pub fn mark_claimed(&mut self, donor: Address, last_period: u64, tick: u64) {
        let record = self.donors.entry(donor).or_default();
        record.last_claimed_period = last_period;
        record.last_claim_tick = tick;
    }

    /// Look up a contribution by id.
    pub fn contribution(&self, id: u64) -> Option<&Contribution> {
        let index = id.checked_sub(1)?;
        self.contributions.get(index as usize)
    }

    pub fn contribution_count(&self) -> u64 {
        self.contributions.len() as u64
    }

    /// All contributions recorded in `period`, in log order.
    pub fn contributions_in(&self, period: u64) -> impl Iterator<Item = &Contribution> {
        self.contributions
            .iter()
            .filter(move |c| c.period_number == period)
    }

    /// Donors with a recorded contribution or stake in `period`, including
    /// stake carried forward from an earlier period.
    pub fn participants(&self, period: u64) -> Vec<Address> {
        let mut out: Vec<Address> = self
            .donors
            .keys()
            .filter(|d| {
                !self.contribution_in(d, period).is_zero() || !self.stake_at(d, period).is_zero()
            })
            .copied()
            .collect();
        out.sort();
        out
    }
}

/// Flat serialized form; JSON maps cannot key on tuples.
#[derive(Serialize, Deserialize)]
struct LedgerRows {
    contributions: Vec<Contribution>,
    donors: Vec<(Address, DonorRecord)>,
    period_amounts: Vec<(u64, Address, U256)>,
    stakes: Vec<(Address, u64, U256)>,
}

impl From<ContributionLedger> for LedgerRows {
    fn from(ledger: ContributionLedger) -> Self {
        let mut donors: Vec<_> = ledger.donors.into_iter().collect();
        donors.sort_by_key(|(addr, _)| *addr);

        let mut period_amounts: Vec<_> = ledger
            .period_amounts
            .into_iter()
            .map(|((period, donor), amount)| (period, donor, amount))
            .collect();
        period_amounts.sort_by_key(|(period, donor, _)| (*period, *donor));

        let mut stakes: Vec<_> = ledger
            .stakes
            .into_iter()
            .flat_map(|(donor, history)| {
                history
                    .into_iter()
                    .map(move |(period, principal)| (donor, period, principal))
            })
            .collect();
        stakes.sort_by_key(|(donor, period, _)| (*donor, *period));

        Self { contributions: ledger.contributions, donors, period_amounts, stakes }
    }
}

impl From<LedgerRows> for ContributionLedger {
    fn from(rows: LedgerRows) -> Self {
        let mut stakes: HashMap<Address, BTreeMap<u64, U256>> = HashMap::new();
        for (donor, period, principal) in rows.stakes {
            stakes.entry(donor).or_default().insert(period, principal);
        }
        Self {
            contributions: rows.contributions,
            donors: rows.donors.into_iter().collect(),
            period_amounts: rows
                .period_amounts
                .into_iter()
                .map(|(period, donor, amount)| ((period, donor), amount))
                .collect(),
            stakes,
        }
    }
}
