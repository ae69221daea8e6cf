//! Cross-module test suites for Pact donation mining.
//!
//! The integration tests under `tests/` drive a full [`DonationMiner`] through
//! multi-period scenarios and randomized properties. Shared fixtures live in
//! [`helpers`].
//!
//! [`DonationMiner`]: pact_miner::DonationMiner

pub mod helpers;
