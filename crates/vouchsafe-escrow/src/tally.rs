//! Weighted vote accumulation and quorum thresholds.
//!
//! Votes are keyed by candidate position. The running total decides when the
//! escrow leaves the voting phase; the per-position weights feed the
//! per-candidate unlock rules.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use vouchsafe_types::Address;

use crate::account::{EscrowAccount, Phase};
use crate::error::EscrowError;

/// How the quorum threshold is derived when an escrow is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuorumPolicy {
    /// Fixed total weight.
    Absolute(u64),
    /// Weight per candidate, multiplied by the candidate-set size.
    PerCandidate(u64),
    /// Fraction of the deposited amount, in basis points (10_000 = 100%).
    DepositBasisPoints(u16),
}

impl QuorumPolicy {
    /// Resolve the threshold for a set of `size` candidates and a deposit of
    /// `amount` units.
    ///
    /// A basis-point share that rounds down to zero resolves to 1, so a small
    /// deposit still needs one unit of weight.
    pub fn required_weight(&self, size: u64, amount: u64) -> u64 {
        match self {
            QuorumPolicy::Absolute(weight) => *weight,
            QuorumPolicy::PerCandidate(weight) => weight.saturating_mul(size),
            QuorumPolicy::DepositBasisPoints(bps) => {
                ((amount as u128 * *bps as u128 / 10_000) as u64).max(1)
            }
        }
    }
}

impl Default for QuorumPolicy {
    fn default() -> Self {
        QuorumPolicy::DepositBasisPoints(5_000)
    }
}

/// What to do when the same voter casts more than one ballot.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateVotePolicy {
    /// Every ballot adds its weight.
    #[default]
    Accumulate,
    /// A voter may cast one ballot per escrow.
    RejectRepeatVoter,
}

/// Vote weights for one escrow.
#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct VoteTally {
    total_weight: u64,
    by_position: BTreeMap<u64, u64>,
    /// Only populated under [`DuplicateVotePolicy::RejectRepeatVoter`].
    voters: BTreeSet<Address>,
}

impl VoteTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total weight cast across all positions.
    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// Weight cast for one candidate position.
    pub fn weight_for(&self, position: u64) -> u64 {
        self.by_position.get(&position).copied().unwrap_or(0)
    }

    /// Highest weight held by any single position.
    pub fn leading_weight(&self) -> u64 {
        self.by_position.values().copied().max().unwrap_or(0)
    }

    /// Positions holding the highest weight, ascending.
    pub fn leading_positions(&self) -> Vec<u64> {
        let lead = self.leading_weight();
        if lead == 0 {
            return Vec::new();
        }
        self.by_position
            .iter()
            .filter(|(_, weight)| **weight == lead)
            .map(|(position, _)| *position)
            .collect()
    }

    /// Number of positions that received any weight.
    pub fn positions_voted(&self) -> usize {
        self.by_position.len()
    }

    pub fn has_voted(&self, voter: &Address) -> bool {
        self.voters.contains(voter)
    }

    pub fn quorum_reached(&self, quorum: u64) -> bool {
        self.total_weight >= quorum
    }

    /// Add one ballot. Nothing changes unless every check passes.
    pub fn record(
        &mut self,
        voter: &Address,
        position: u64,
        weight: u64,
        policy: DuplicateVotePolicy,
    ) -> Result<(), EscrowError> {
        if weight == 0 {
            return Err(EscrowError::InvalidInput("vote weight must be positive".to_string()));
        }

        let reject_repeat = policy == DuplicateVotePolicy::RejectRepeatVoter;
        if reject_repeat && self.voters.contains(voter) {
            return Err(EscrowError::AlreadyVoted(*voter));
        }

        let total = self
            .total_weight
            .checked_add(weight)
            .ok_or_else(|| EscrowError::InvalidInput("total vote weight overflow".to_string()))?;
        let position_weight = self
            .weight_for(position)
            .checked_add(weight)
            .ok_or_else(|| EscrowError::InvalidInput("position vote weight overflow".to_string()))?;

        self.total_weight = total;
        self.by_position.insert(position, position_weight);
        if reject_repeat {
            self.voters.insert(*voter);
        }
        Ok(())
    }
}

/// Cast a weighted vote for the candidate at `position`.
///
/// Only accepted while the escrow is in [`Phase::Voting`]. Returns the phase
/// after the vote, which is [`Phase::Matured`] when this ballot reached quorum.
pub fn cast_vote(
    escrow: &mut EscrowAccount,
    voter: &Address,
    position: u64,
    weight: u64,
    now: u64,
) -> Result<Phase, EscrowError> {
    if escrow.phase(now) != Phase::Voting {
        return Err(EscrowError::VotingIsClosed);
    }
    if position >= escrow.size {
        return Err(EscrowError::InvalidInput(format!(
            "position {} out of range for {} candidates",
            position, escrow.size
        )));
    }

    escrow
        .tally
        .record(voter, position, weight, escrow.duplicate_votes)?;

    Ok(escrow.phase(now))
}
