//! Engine configuration.
//!
//! [`MinerConfig`] is the on-disk/environment form: plain numbers plus
//! strings for 256-bit amounts and addresses. It is validated and split into
//! the runtime [`MinerParams`] (versioned, changed only by privileged calls)
//! and the [`Authority`] addresses.
//!
//! Sources are layered with the `config` crate: an optional file (format
//! picked by extension), then `PACT_MINER_*` environment variables.

use std::path::Path;
use std::str::FromStr;

use alloy_primitives::{Address, U256};
use config::{Config, Environment, File};
use pact_core::constants::{
    tokens, DEFAULT_AGAINST_PERIODS, DEFAULT_CLAIM_DELAY, DEFAULT_COMMUNITY_DONATION_RATIO,
    DEFAULT_DECAY_DENOMINATOR, DEFAULT_DECAY_NUMERATOR, DEFAULT_FIRST_REWARD_PER_TICK_TOKENS,
    DEFAULT_PERIOD_LENGTH, DEFAULT_STAKING_DONATION_RATIO,
};
use pact_core::error::ConfigError;
use pact_core::types::ScheduleParams;
use serde::{Deserialize, Serialize};

use crate::schedule::RollPolicy;
use crate::window::EligibilityWindow;

/// Environment variable prefix, e.g. `PACT_MINER_CLAIM_DELAY=5`.
pub const ENV_PREFIX: &str = "PACT_MINER";

/// Initial engine configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct MinerConfig {
    /// First tick of period 1.
    pub start_tick: u64,
    /// Reward per tick in period 1, in smallest units (decimal or 0x-hex).
    pub first_reward_per_tick: String,
    pub period_length: u64,
    pub decay_numerator: u64,
    pub decay_denominator: u64,
    pub claim_delay: u64,
    pub against_periods: u64,
    pub staking_donation_ratio: u64,
    pub community_donation_ratio: u64,
    /// Pass a zero-weight period's reward into the next period.
    pub carry_unallocated_rewards: bool,
    /// Address allowed to change parameters and record virtual contributions.
    pub admin: String,
    /// Address allowed to push stake deltas.
    pub staking: String,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            start_tick: 0,
            first_reward_per_tick: tokens(DEFAULT_FIRST_REWARD_PER_TICK_TOKENS).to_string(),
            period_length: DEFAULT_PERIOD_LENGTH,
            decay_numerator: DEFAULT_DECAY_NUMERATOR,
            decay_denominator: DEFAULT_DECAY_DENOMINATOR,
            claim_delay: DEFAULT_CLAIM_DELAY,
            against_periods: DEFAULT_AGAINST_PERIODS,
            staking_donation_ratio: DEFAULT_STAKING_DONATION_RATIO,
            community_donation_ratio: DEFAULT_COMMUNITY_DONATION_RATIO,
            carry_unallocated_rewards: false,
            admin: Address::ZERO.to_string(),
            staking: Address::ZERO.to_string(),
        }
    }
}

impl MinerConfig {
    /// Load from an optional file plus `PACT_MINER_*` environment variables,
    /// then validate. Environment values override the file.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let loaded: MinerConfig = builder
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()
            .and_then(|c| c.try_deserialize::<MinerConfig>())
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Check every field without building anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.schedule_params().validate()?;
        if self.community_donation_ratio == 0 {
            return Err(ConfigError::InvalidRatio("community donation ratio must be positive"));
        }
        self.first_reward()?;
        self.authority()?;
        Ok(())
    }

    pub fn schedule_params(&self) -> ScheduleParams {
        ScheduleParams {
            period_length: self.period_length,
            decay_numerator: self.decay_numerator,
            decay_denominator: self.decay_denominator,
        }
    }

    /// Parsed period-1 reward per tick.
    pub fn first_reward(&self) -> Result<U256, ConfigError> {
        U256::from_str(self.first_reward_per_tick.trim())
            .map_err(|e| ConfigError::InvalidAmount(format!("first_reward_per_tick: {e}")))
    }

    /// Parsed privileged addresses.
    pub fn authority(&self) -> Result<Authority, ConfigError> {
        Ok(Authority {
            admin: parse_address("admin", &self.admin)?,
            staking: parse_address("staking", &self.staking)?,
        })
    }

    /// Runtime parameters at version 0.
    pub fn params(&self) -> Result<MinerParams, ConfigError> {
        self.validate()?;
        Ok(MinerParams {
            version: 0,
            schedule: self.schedule_params(),
            window: EligibilityWindow::new(self.claim_delay, self.against_periods),
            staking_donation_ratio: self.staking_donation_ratio,
            community_donation_ratio: self.community_donation_ratio,
            carry_unallocated_rewards: self.carry_unallocated_rewards,
        })
    }
}

fn parse_address(field: &str, value: &str) -> Result<Address, ConfigError> {
    Address::from_str(value.trim())
        .map_err(|e| ConfigError::InvalidAddress(format!("{field}: {e}")))
}

/// Addresses allowed to make privileged calls.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authority {
    pub admin: Address,
    pub staking: Address,
}

impl Authority {
    pub fn require_admin(&self, caller: Address) -> Result<(), ConfigError> {
        if caller == self.admin {
            Ok(())
        } else {
            Err(ConfigError::Unauthorized(caller))
        }
    }

    pub fn require_staking(&self, caller: Address) -> Result<(), ConfigError> {
        if caller == self.staking {
            Ok(())
        } else {
            Err(ConfigError::Unauthorized(caller))
        }
    }
}

/// Runtime parameters. `version` increments on every privileged update.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinerParams {
    pub version: u64,
    pub schedule: ScheduleParams,
    pub window: EligibilityWindow,
    pub staking_donation_ratio: u64,
    pub community_donation_ratio: u64,
    pub carry_unallocated_rewards: bool,
}

impl MinerParams {
    /// What the schedule snapshots into each newly opened period.
    /// `rebased_stake_credit` is the stake credit of all current principal
    /// under [`staking_donation_ratio`](Self::staking_donation_ratio).
    pub fn roll_policy(&self, rebased_stake_credit: U256) -> RollPolicy {
        RollPolicy {
            staking_donation_ratio: self.staking_donation_ratio,
            carry_unallocated_rewards: self.carry_unallocated_rewards,
            rebased_stake_credit,
        }
    }

    pub(crate) fn bump(&mut self) {
        self.version += 1;
    }
}
