//! Error types for Pact donation mining.
use alloy_primitives::{Address, U256};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContributionError {
    #[error("token not accepted: {0}")] InvalidToken(Address),
    #[error("amount must be positive")] InvalidAmount,
    #[error("rewards start at tick {start_tick}, now {tick}")] NotStarted { tick: u64, start_tick: u64 },
    #[error("insufficient stake: staked {staked}, requested {requested}")] InsufficientStake { staked: U256, requested: U256 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("caller {0} is not authorized")] Unauthorized(Address),
    #[error("invalid schedule: {0}")] InvalidSchedule(String),
    #[error("invalid ratio: {0}")] InvalidRatio(&'static str),
    #[error("invalid address: {0}")] InvalidAddress(String),
    #[error("invalid amount: {0}")] InvalidAmount(String),
    #[error("config load: {0}")] Load(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MathError {
    #[error("arithmetic overflow")] ArithmeticOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("snapshot encode: {0}")] Encode(String),
    #[error("snapshot decode: {0}")] Decode(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MinerError {
    #[error(transparent)] Contribution(#[from] ContributionError),
    #[error(transparent)] Config(#[from] ConfigError),
    #[error(transparent)] Math(#[from] MathError),
    #[error(transparent)] Snapshot(#[from] SnapshotError),
}
