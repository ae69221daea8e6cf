//! # pact-core
//! Foundation types, fixed-point math and collaborator traits for Pact
//! donation mining.

pub mod constants;
pub mod error;
pub mod math;
pub mod memory;
pub mod traits;
pub mod types;

pub use alloy_primitives::{Address, I256, U256};
