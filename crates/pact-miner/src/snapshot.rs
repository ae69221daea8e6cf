//! JSON snapshots of engine state.
//!
//! A snapshot holds everything except the collaborators: runtime parameters,
//! authority, the full schedule and the ledger. Amounts are encoded as hex
//! strings by `alloy-primitives`.

use pact_core::error::SnapshotError;
use serde::{Deserialize, Serialize};

use crate::config::{Authority, MinerParams};
use crate::ledger::ContributionLedger;
use crate::schedule::RewardSchedule;

/// Current snapshot layout.
pub const SNAPSHOT_FORMAT: u32 = 1;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MinerState {
    pub format: u32,
    pub params: MinerParams,
    pub authority: Authority,
    pub schedule: RewardSchedule,
    pub ledger: ContributionLedger,
}

impl MinerState {
    pub fn to_json(&self) -> Result<Vec<u8>, SnapshotError> {
        serde_json::to_vec_pretty(self).map_err(|e| SnapshotError::Encode(e.to_string()))
    }

    /// Decode a snapshot, rejecting unknown layouts.
    pub fn from_json(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let state: MinerState =
            serde_json::from_slice(bytes).map_err(|e| SnapshotError::Decode(e.to_string()))?;
        if state.format != SNAPSHOT_FORMAT {
            return Err(SnapshotError::Decode(format!(
                "unsupported snapshot format {} (expected {SNAPSHOT_FORMAT})",
                state.format
            )));
        }
        Ok(state)
    }
}
