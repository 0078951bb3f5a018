//! Per-candidate release conditions.
//!
//! Escrow-level maturity (quorum or deadline) says *whether* the escrow may
//! pay out at all. An unlock rule says *which* candidate may collect once it
//! does. The two are evaluated separately at collect time.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::account::EscrowAccount;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum UnlockRule {
    /// Any proven candidate may collect.
    #[default]
    Any,
    /// Only a candidate holding the highest per-position weight may collect.
    /// Tied leaders all qualify; with no votes cast every candidate does.
    Leading,
    /// The candidate's own weight must reach the given amount.
    ///
    /// Votes close once the escrow matures, so an escrow that matures by
    /// deadline or by a split quorum with no position at the threshold keeps
    /// its balance in custody for good.
    MinimumWeight(u64),
}

impl UnlockRule {
    /// Whether the candidate at `position` may collect from `escrow`.
    pub fn permits(&self, escrow: &EscrowAccount, position: u64) -> bool {
        let tally = &escrow.tally;
        match self {
            UnlockRule::Any => true,
            UnlockRule::Leading => tally.weight_for(position) == tally.leading_weight(),
            UnlockRule::MinimumWeight(required) => tally.weight_for(position) >= *required,
        }
    }
}
