use thiserror::Error;
use vouchsafe_types::Address;

/// Errors surfaced by the host ledger.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Account not found: {0}")]
    AccountNotFound(Address),

    #[error("Account already exists: {0}")]
    AccountExists(Address),

    #[error("Insufficient funds in {account}: required {required}, have {have}")]
    InsufficientFunds {
        account: Address,
        required: u64,
        have: u64,
    },

    #[error("{signer} cannot sign for {account}")]
    MissingSignature { signer: Address, account: Address },

    #[error("Token mint mismatch: expected {expected}, got {actual}")]
    MintMismatch { expected: Address, actual: Address },

    #[error("Balance overflow in {0}")]
    Overflow(Address),
}

/// Errors that can occur in escrow operations.
///
/// Every variant is raised before any escrow or ledger state changes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EscrowError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Voting in progress: quorum not reached and escrow not matured")]
    VotingInProgress,

    #[error("Voting is closed")]
    VotingIsClosed,

    #[error("Invalid candidate: proof does not match the committed candidate set")]
    InvalidCandidate,

    #[error("Unlock condition not met for candidate {position}")]
    UnlockConditionFail { position: u64 },

    #[error("Escrow already collected")]
    AlreadyCollected,

    #[error("Insufficient custody balance")]
    InsufficientCustodyBalance,

    #[error("Voter {0} already voted")]
    AlreadyVoted(Address),

    #[error("Escrow already exists: {0}")]
    EscrowExists(Address),

    #[error("Escrow not found: {0}")]
    EscrowNotFound(Address),

    #[error("Custody authority already initialized")]
    AuthorityAlreadyInitialized,

    #[error("Custody authority not initialized")]
    AuthorityNotInitialized,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Destination token account mint {actual} does not match escrow mint {expected}")]
    MintMismatch { expected: Address, actual: Address },

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
