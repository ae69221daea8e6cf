//! In-memory collaborator implementations.
//!
//! Intended for tests and simple hosts: nothing here persists, and the
//! recording sinks grow without bound.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::{Address, U256};
use parking_lot::{Mutex, RwLock};

use crate::error::ContributionError;
use crate::traits::{Clock, PayoutSink, PriceConversion, RewardStaker};

/// A clock advanced by hand.
#[derive(Debug, Default)]
pub struct ManualClock {
    tick: AtomicU64,
}

impl ManualClock {
    pub fn new(tick: u64) -> Self {
        Self { tick: AtomicU64::new(tick) }
    }

    /// Jump to `tick`. Going backward is allowed; the engine treats an
    /// earlier tick as "no new boundary crossed".
    pub fn set(&self, tick: u64) {
        self.tick.store(tick, Ordering::SeqCst);
    }

    /// Move forward by `ticks` and return the new tick.
    pub fn advance(&self, ticks: u64) -> u64 {
        self.tick.fetch_add(ticks, Ordering::SeqCst) + ticks
    }
}

impl Clock for ManualClock {
    fn current_tick(&self) -> u64 {
        self.tick.load(Ordering::SeqCst)
    }
}

/// Fixed price table: `normalized = raw * numerator / denominator`.
#[derive(Debug, Default)]
pub struct StaticPriceTable {
    prices: RwLock<HashMap<Address, (U256, U256)>>,
}

impl StaticPriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table accepting `token` at par.
    pub fn with_token(token: Address) -> Self {
        let table = Self::new();
        table.set_price(token, U256::from(1), U256::from(1));
        table
    }

    /// Accept `token`, converting at `numerator / denominator`.
    pub fn set_price(&self, token: Address, numerator: U256, denominator: U256) {
        self.prices.write().insert(token, (numerator, denominator));
    }

    /// Stop accepting `token`.
    pub fn remove(&self, token: &Address) {
        self.prices.write().remove(token);
    }
}

impl PriceConversion for StaticPriceTable {
    fn normalize(&self, token: Address, raw_amount: U256) -> Result<U256, ContributionError> {
        let (num, den) = *self
            .prices
            .read()
            .get(&token)
            .ok_or(ContributionError::InvalidToken(token))?;
        if den.is_zero() {
            return Err(ContributionError::InvalidToken(token));
        }
        // A price large enough to overflow is treated like an unusable asset.
        let product = raw_amount
            .checked_mul(num)
            .ok_or(ContributionError::InvalidToken(token))?;
        Ok(product / den)
    }

    fn is_accepted(&self, token: Address) -> bool {
        self.prices.read().contains_key(&token)
    }
}

/// Payout sink that records every transfer.
#[derive(Debug, Default)]
pub struct RecordingPayout {
    paid: Mutex<Vec<(Address, U256)>>,
}

impl RecordingPayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// All transfers in order.
    pub fn transfers(&self) -> Vec<(Address, U256)> {
        self.paid.lock().clone()
    }

    /// Sum of everything paid to `donor`.
    pub fn total_for(&self, donor: &Address) -> U256 {
        self.paid
            .lock()
            .iter()
            .filter(|(d, _)| d == donor)
            .fold(U256::ZERO, |acc, (_, amount)| acc.saturating_add(*amount))
    }

    /// Sum of everything paid.
    pub fn total(&self) -> U256 {
        self.paid
            .lock()
            .iter()
            .fold(U256::ZERO, |acc, (_, amount)| acc.saturating_add(*amount))
    }
}

impl PayoutSink for RecordingPayout {
    fn payout(&self, donor: Address, amount: U256) {
        self.paid.lock().push((donor, amount));
    }
}

/// Reward staker that records every deposit.
#[derive(Debug, Default)]
pub struct RecordingStaker {
    staked: Mutex<Vec<(Address, U256)>>,
}

impl RecordingStaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deposits(&self) -> Vec<(Address, U256)> {
        self.staked.lock().clone()
    }
}

impl RewardStaker for RecordingStaker {
    fn stake_for(&self, donor: Address, amount: U256) {
        self.staked.lock().push((donor, amount));
    }
}
