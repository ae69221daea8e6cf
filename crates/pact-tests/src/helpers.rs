//! Shared fixtures for scenario and property tests.

use std::sync::{Arc, Once};

use pact_core::constants::tokens;
use pact_core::memory::{ManualClock, RecordingPayout, RecordingStaker, StaticPriceTable};
use pact_core::types::DonationTarget;
use pact_core::{Address, I256, U256};
use pact_miner::{Collaborators, DonationMiner, MinerConfig};

/// First tick of period 1 in the reference fixture.
pub const START_TICK: u64 = 130;
/// Ticks per period in the reference fixture.
pub const PERIOD_LENGTH: u64 = 20;
/// Period-1 reward per tick, in whole tokens.
pub const FIRST_RATE_TOKENS: u64 = 216_000;
/// Staked principal per unit of donation weight.
pub const STAKING_RATIO: u64 = 1_000_000;

static TRACING: Once = Once::new();

/// Install a test subscriber honoring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Address from a seed byte.
pub fn addr(seed: u8) -> Address {
    Address::repeat_byte(seed)
}

pub fn admin() -> Address {
    addr(0xad)
}

pub fn staking() -> Address {
    addr(0x5e)
}

/// The accepted contribution token (converted at par).
pub fn token() -> Address {
    addr(0x70)
}

/// First tick of period `n` in the reference fixture.
pub fn period_start(n: u64) -> u64 {
    START_TICK + (n - 1) * PERIOD_LENGTH
}

/// Reference configuration: 20-tick periods from tick 130, 216000 tokens per
/// tick, production decay, no claim delay, 8-period horizon.
pub fn reference_config() -> MinerConfig {
    MinerConfig {
        start_tick: START_TICK,
        first_reward_per_tick: tokens(FIRST_RATE_TOKENS).to_string(),
        period_length: PERIOD_LENGTH,
        claim_delay: 0,
        against_periods: 8,
        staking_donation_ratio: STAKING_RATIO,
        admin: admin().to_string(),
        staking: staking().to_string(),
        ..MinerConfig::default()
    }
}

/// A miner wired to in-memory collaborators.
pub struct Harness {
    pub miner: DonationMiner,
    pub clock: Arc<ManualClock>,
    pub payout: Arc<RecordingPayout>,
    pub staker: Arc<RecordingStaker>,
    pub prices: Arc<StaticPriceTable>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(reference_config())
    }

    pub fn with_config(config: MinerConfig) -> Self {
        init_tracing();
        let clock = Arc::new(ManualClock::new(config.start_tick));
        let payout = Arc::new(RecordingPayout::new());
        let staker = Arc::new(RecordingStaker::new());
        let prices = Arc::new(StaticPriceTable::with_token(token()));
        let miner = DonationMiner::new(&config, Self::wire(&clock, &payout, &staker, &prices))
            .expect("reference config is valid");
        Self { miner, clock, payout, staker, prices }
    }

    fn wire(
        clock: &Arc<ManualClock>,
        payout: &Arc<RecordingPayout>,
        staker: &Arc<RecordingStaker>,
        prices: &Arc<StaticPriceTable>,
    ) -> Collaborators {
        Collaborators {
            clock: clock.clone(),
            prices: prices.clone(),
            payout: payout.clone(),
            staker: staker.clone(),
        }
    }

    /// Collaborators sharing this harness's clock and sinks.
    pub fn collaborators(&self) -> Collaborators {
        Self::wire(&self.clock, &self.payout, &self.staker, &self.prices)
    }

    /// Move the clock to `offset` ticks into period `n`.
    pub fn at(&self, n: u64, offset: u64) {
        self.clock.set(period_start(n) + offset);
    }

    /// Contribute `amount` whole tokens to the treasury.
    pub fn donate(&mut self, donor: Address, amount: u64) -> u64 {
        self.miner
            .record_contribution(donor, tokens(amount), token(), DonationTarget::Treasury)
            .expect("contribution accepted")
    }

    /// Push a stake change of `delta` whole tokens (negative to unstake).
    pub fn stake(&mut self, donor: Address, delta: i64) {
        let magnitude = I256::from_raw(tokens(delta.unsigned_abs()));
        let signed = if delta < 0 { -magnitude } else { magnitude };
        self.miner
            .record_stake_delta(staking(), donor, signed)
            .expect("stake delta accepted");
    }

    pub fn claim(&mut self, donor: Address) -> U256 {
        self.miner.claim(donor).expect("claim succeeds")
    }

    pub fn claimable(&self, donor: Address) -> U256 {
        self.miner.calculate_claimable(donor).expect("query succeeds")
    }

    /// Reward amount of period `n` as seen at the current tick.
    pub fn period_reward(&self, n: u64) -> U256 {
        self.miner
            .period_info(n)
            .expect("query succeeds")
            .expect("period exists")
            .reward_amount()
            .expect("no overflow")
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
