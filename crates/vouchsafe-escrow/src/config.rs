//! Engine configuration.
//!
//! Loaded from the `[escrow]` table of a TOML config by the CLI, or built
//! directly by embedders.

use serde::{Deserialize, Serialize};
use vouchsafe_types::Address;

use crate::error::EscrowError;
use crate::tally::{DuplicateVotePolicy, QuorumPolicy};
use crate::unlock::UnlockRule;

/// Program id used when none is configured.
pub const DEFAULT_PROGRAM_ID: Address = Address::from_bytes(*b"vouchsafe-escrow-v1\0");

/// Upper bound on candidate-set size unless configured otherwise.
pub const DEFAULT_MAX_CANDIDATES: u64 = 1 << 20;

/// Escrow engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscrowConfig {
    /// Program id all derived addresses hang off
    pub program_id: Address,
    /// Quorum threshold, resolved per escrow at open
    pub quorum: QuorumPolicy,
    /// Unlock rule for escrows that do not choose one
    pub default_unlock: UnlockRule,
    /// Handling of repeat ballots from one voter
    pub duplicate_votes: DuplicateVotePolicy,
    /// Largest candidate set an escrow may commit to
    pub max_candidates: u64,
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            program_id: DEFAULT_PROGRAM_ID,
            quorum: QuorumPolicy::default(),
            default_unlock: UnlockRule::default(),
            duplicate_votes: DuplicateVotePolicy::default(),
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }
}

impl EscrowConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<(), EscrowError> {
        if self.max_candidates == 0 {
            return Err(EscrowError::Config("max_candidates cannot be 0".to_string()));
        }

        match self.quorum {
            QuorumPolicy::Absolute(0) | QuorumPolicy::PerCandidate(0) | QuorumPolicy::DepositBasisPoints(0) => {
                return Err(EscrowError::Config("quorum weight cannot be 0".to_string()));
            }
            QuorumPolicy::DepositBasisPoints(bps) if bps > 10_000 => {
                return Err(EscrowError::Config(format!(
                    "quorum basis points {} exceed 10000",
                    bps
                )));
            }
            _ => {}
        }

        if self.program_id.is_zero() {
            return Err(EscrowError::Config("program_id cannot be the zero address".to_string()));
        }

        Ok(())
    }
}
