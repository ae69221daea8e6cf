//! Protocol constants. All monetary values are in the canonical token's
//! smallest unit (1 token = 10^18 units).

use alloy_primitives::U256;

/// Smallest units per whole canonical token.
pub const TOKEN_SCALE: u128 = 1_000_000_000_000_000_000;

/// Number of the first reward period. Period numbers are 1-based; 0 means
/// "no period" (e.g. a donor that never claimed).
pub const FIRST_PERIOD: u64 = 1;

/// Production period length in ticks (one day of 5-second blocks).
pub const DEFAULT_PERIOD_LENGTH: u64 = 17_280;

/// Production first-period reward rate, in whole tokens per tick.
pub const DEFAULT_FIRST_REWARD_PER_TICK_TOKENS: u64 = 250;

/// Geometric decay applied once per period transition: `rate * 998902 / 1000000`.
pub const DEFAULT_DECAY_NUMERATOR: u64 = 998_902;
pub const DEFAULT_DECAY_DENOMINATOR: u64 = 1_000_000;

/// Closed periods that must pass before a period becomes claimable.
pub const DEFAULT_CLAIM_DELAY: u64 = 0;

/// Periods behind the claim frontier that remain claimable.
pub const DEFAULT_AGAINST_PERIODS: u64 = 8;

/// Staked principal per unit of donation-equivalent weight. Zero disables
/// stake credit entirely.
pub const DEFAULT_STAKING_DONATION_RATIO: u64 = 0;

/// Divisor applied to the reward-eligible amount of community donations.
pub const DEFAULT_COMMUNITY_DONATION_RATIO: u64 = 1;

/// `n` whole tokens in smallest units.
///
/// Saturates at `U256::MAX`, which no realistic token amount approaches.
pub fn tokens(n: u64) -> U256 {
    U256::from(n).saturating_mul(U256::from(TOKEN_SCALE))
}
