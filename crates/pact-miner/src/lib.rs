//! # pact-miner
//! Donation-mining reward engine.
//!
//! Contributions and stake are recorded against fixed-length reward periods
//! whose per-tick rate decays geometrically. Donors later claim their
//! weighted share of each closed period inside an eligibility window.
//!
//! - [`schedule`] — period boundaries and the decaying rate curve
//! - [`ledger`] — contribution log, per-donor aggregates, stake carry-forward
//! - [`window`] — claim delay and eligibility horizon
//! - [`reward`] — one donor's share of one period
//! - [`claim`] — claim planning across a donor's unclaimed range
//! - [`miner`] — the [`DonationMiner`] facade
//! - [`config`] — configuration loading and runtime parameters
//! - [`snapshot`] — JSON state snapshots

pub mod claim;
pub mod config;
pub mod ledger;
pub mod miner;
pub mod reward;
pub mod schedule;
pub mod snapshot;
pub mod window;

pub use crate::config::{Authority, MinerConfig, MinerParams};
pub use crate::miner::{Collaborators, DonationMiner, SharedMiner};
