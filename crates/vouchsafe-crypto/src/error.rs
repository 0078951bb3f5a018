use thiserror::Error;

/// Errors that can occur in cryptographic operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Cannot build a Merkle tree from an empty leaf set")]
    EmptyTree,

    #[error("Leaf position {position} out of range for {size} leaves")]
    PositionOutOfRange { position: u64, size: u64 },

    #[error("Merkle proof invalid")]
    MerkleProofInvalid,

    #[error("Malformed proof: expected {expected} path nodes, got {actual}")]
    MalformedProof { expected: usize, actual: usize },
}
