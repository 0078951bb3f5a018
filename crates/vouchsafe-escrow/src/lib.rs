//! Vouchsafe Escrow - Quorum-gated Merkle escrow engine.
//!
//! This crate provides:
//! - Escrow accounts committing to a candidate set by Merkle root
//! - Weighted voting with configurable quorum
//! - Per-candidate unlock rules
//! - Native and token custody under a program-derived authority
//! - A concurrent engine over a pluggable ledger

pub mod account;
pub mod clock;
pub mod config;
pub mod custody;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod tally;
pub mod unlock;

pub use account::{Collection, EscrowAccount, Phase};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EscrowConfig;
pub use custody::{AssetCustody, CustodyAuthority, TokenAccountHandle};
pub use engine::{CandidateProof, EngineStats, EscrowEngine, EscrowHandle};
pub use error::{EscrowError, LedgerError};
pub use ledger::{associated_token_address, InMemoryLedger, Ledger, TokenAccount};
pub use lifecycle::OpenEscrow;
pub use tally::{DuplicateVotePolicy, QuorumPolicy, VoteTally};
pub use unlock::UnlockRule;
