//! Eligibility window: which closed periods a donor may claim right now.
//!
//! `now_period` is always the most recent CLOSED period. A period becomes
//! claimable `claim_delay` periods after it closes, and stays claimable
//! until it falls more than `against_periods` behind the claim frontier
//! (`now_period - claim_delay`). A donor who lets a period fall out of the
//! horizon forfeits its reward permanently.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct EligibilityWindow {
    /// Periods that must close after a period before it can be claimed.
    pub claim_delay: u64,
    /// Periods behind the claim frontier that remain claimable.
    pub against_periods: u64,
}

impl EligibilityWindow {
    pub fn new(claim_delay: u64, against_periods: u64) -> Self {
        Self { claim_delay, against_periods }
    }

    /// Newest period claimable at `now_period`, or `None` while the delay
    /// has not elapsed for any period.
    pub fn frontier(&self, now_period: u64) -> Option<u64> {
        now_period
            .checked_sub(self.claim_delay)
            .filter(|frontier| *frontier > 0)
    }

    /// Oldest period still inside the horizon at `now_period`.
    pub fn horizon_start(&self, now_period: u64) -> u64 {
        let frontier = now_period.saturating_sub(self.claim_delay);
        frontier.saturating_sub(self.against_periods).max(1)
    }

    /// Periods a donor whose cursor is `last_claimed` may claim now.
    pub fn claimable_range(&self, last_claimed: u64, now_period: u64) -> Option<RangeInclusive<u64>> {
        let to = self.frontier(now_period)?;
        let from = last_claimed.saturating_add(1);
        (from <= to).then_some(from..=to)
    }

    /// Whether `period` is still inside the horizon at `now_period`.
    pub fn within_horizon(&self, period: u64, now_period: u64) -> bool {
        let frontier = now_period.saturating_sub(self.claim_delay);
        period.saturating_add(self.against_periods) >= frontier
    }
}
