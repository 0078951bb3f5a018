//! Persisted escrow state.

use borsh::{BorshDeserialize, BorshSerialize};
use std::fmt;
use vouchsafe_types::{Address, Asset, Hash};

use crate::error::EscrowError;
use crate::tally::{DuplicateVotePolicy, VoteTally};
use crate::unlock::UnlockRule;

/// Seed prefix for escrow account addresses.
pub const ESCROW_SEED: &[u8] = b"escrow";

/// Lifecycle phase, derived from the stored fields and the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Quorum not met and maturity not reached; votes accepted.
    Voting,
    /// Quorum met or maturity reached; a proven candidate may collect.
    Matured,
    /// Funds released. Terminal.
    Collected,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Voting => "voting",
            Phase::Matured => "matured",
            Phase::Collected => "collected",
        };
        f.write_str(name)
    }
}

/// Record of the one successful collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Collection {
    pub recipient: Address,
    pub position: u64,
    pub amount: u64,
    pub collected_at: u64,
}

/// One escrow instance, addressed by `(depositor, root[, mint])`.
///
/// Only the root and size of the candidate set are stored; members are proved
/// on demand.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct EscrowAccount {
    pub address: Address,
    pub depositor: Address,
    /// Merkle root of the candidate set
    pub root: Hash,
    /// Number of candidates committed under `root`
    pub size: u64,
    pub asset: Asset,
    /// Amount committed at open
    pub deposited: u64,
    /// Amount still held; zero once collected
    pub balance: u64,
    /// Total vote weight that ends the voting phase
    pub quorum: u64,
    pub tally: VoteTally,
    pub duplicate_votes: DuplicateVotePolicy,
    pub unlock: UnlockRule,
    pub opened_at: u64,
    /// Absolute time after which votes are no longer required
    pub maturity: u64,
    pub collected: Option<Collection>,
}

impl EscrowAccount {
    /// Address of the escrow opened by `depositor` over `root` for `asset`.
    ///
    /// Token escrows include the mint, so one depositor can hold a native and
    /// a token escrow over the same candidate set.
    pub fn derive_address(program_id: &Address, depositor: &Address, root: &Hash, asset: &Asset) -> Address {
        match asset.mint() {
            None => Address::derive(program_id, &[ESCROW_SEED, depositor.as_bytes(), root.as_bytes()]),
            Some(mint) => Address::derive(
                program_id,
                &[ESCROW_SEED, depositor.as_bytes(), root.as_bytes(), mint.as_bytes()],
            ),
        }
    }

    pub fn phase(&self, now: u64) -> Phase {
        if self.is_collected() {
            Phase::Collected
        } else if self.quorum_reached() || self.maturity_passed(now) {
            Phase::Matured
        } else {
            Phase::Voting
        }
    }

    pub fn quorum_reached(&self) -> bool {
        self.tally.quorum_reached(self.quorum)
    }

    pub fn maturity_passed(&self, now: u64) -> bool {
        now >= self.maturity
    }

    pub fn is_collected(&self) -> bool {
        self.collected.is_some()
    }

    /// Encode in the persisted account layout.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EscrowError> {
        borsh::to_vec(self).map_err(|e| EscrowError::Serialization(e.to_string()))
    }

    /// Decode from the persisted account layout.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EscrowError> {
        borsh::from_slice(bytes).map_err(|e| EscrowError::Serialization(e.to_string()))
    }
}
