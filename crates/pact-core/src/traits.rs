//! Collaborator interfaces consumed by the donation-mining engine.
//!
//! - [`Clock`] — the host ledger's tick counter
//! - [`PriceConversion`] — normalizes contribution tokens into the canonical unit
//! - [`PayoutSink`] — transfers claimed rewards to donors
//! - [`RewardStaker`] — receives rewards a donor chose to stake instead of withdraw
//!
//! The staking ledger is not listed: it pushes stake deltas into the engine
//! and is never called back.

use alloy_primitives::{Address, U256};

use crate::error::ContributionError;

/// Monotonic tick source driving period boundaries.
pub trait Clock: Send + Sync {
    /// Current ledger tick.
    fn current_tick(&self) -> u64;
}

/// Converts a raw token amount into the canonical accounting unit.
pub trait PriceConversion: Send + Sync {
    /// Normalize `raw_amount` of `token`.
    ///
    /// Fails with [`ContributionError::InvalidToken`] when `token` is not an
    /// accepted contribution asset.
    fn normalize(&self, token: Address, raw_amount: U256) -> Result<U256, ContributionError>;

    /// Whether `token` is accepted.
    ///
    /// Default implementation tries [`normalize`](Self::normalize) with a
    /// zero amount.
    fn is_accepted(&self, token: Address) -> bool {
        self.normalize(token, U256::ZERO).is_ok()
    }
}

/// Destination of claimed rewards. A payout is assumed to always succeed.
pub trait PayoutSink: Send + Sync {
    /// Transfer `amount` canonical units to `donor`.
    fn payout(&self, donor: Address, amount: U256);
}

/// Destination of rewards restaked on the donor's behalf.
pub trait RewardStaker: Send + Sync {
    /// Stake `amount` canonical units for `donor`.
    fn stake_for(&self, donor: Address, amount: U256);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // ------------------------------------------------------------------
    // Mock: PriceConversion
    // ------------------------------------------------------------------

    struct MockPrices {
        prices: HashMap<Address, U256>,
    }

    impl PriceConversion for MockPrices {
        fn normalize(&self, token: Address, raw_amount: U256) -> Result<U256, ContributionError> {
            let price = self
                .prices
                .get(&token)
                .ok_or(ContributionError::InvalidToken(token))?;
            Ok(raw_amount * *price)
        }
    }

    #[test]
    fn price_conversion_default_acceptance() {
        let token = Address::repeat_byte(1);
        let prices = MockPrices { prices: HashMap::from([(token, U256::from(2))]) };
        assert!(prices.is_accepted(token));
        assert!(!prices.is_accepted(Address::repeat_byte(2)));
        assert_eq!(prices.normalize(token, U256::from(21)).unwrap(), U256::from(42));
    }

    // ------------------------------------------------------------------
    // Mock: PayoutSink
    // ------------------------------------------------------------------

    #[derive(Default)]
    struct MockSink {
        paid: Mutex<Vec<(Address, U256)>>,
    }

    impl PayoutSink for MockSink {
        fn payout(&self, donor: Address, amount: U256) {
            self.paid.lock().unwrap().push((donor, amount));
        }
    }

    #[test]
    fn payout_sink_is_object_safe() {
        let sink = MockSink::default();
        let dyn_sink: &dyn PayoutSink = &sink;
        dyn_sink.payout(Address::ZERO, U256::from(5));
        assert_eq!(sink.paid.lock().unwrap().as_slice(), &[(Address::ZERO, U256::from(5))]);
    }

    // ------------------------------------------------------------------
    // Mock: Clock
    // ------------------------------------------------------------------

    struct FixedClock(u64);

    impl Clock for FixedClock {
        fn current_tick(&self) -> u64 {
            self.0
        }
    }

    #[test]
    fn clock_behind_trait_object() {
        let clock: Box<dyn Clock> = Box::new(FixedClock(150));
        assert_eq!(clock.current_tick(), 150);
    }
}
