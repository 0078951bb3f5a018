//! Vouchsafe Crypto - Hashing and Merkle commitments.
//!
//! This crate provides:
//! - Blake3 hashing helpers with domain separation
//! - Candidate leaf derivation for recipient identities
//! - Merkle trees, authentication paths and position-bound verification

pub mod error;
pub mod hash;
pub mod merkle;

pub use error::CryptoError;
pub use hash::{candidate_leaf, hash_pair};
pub use merkle::{
    build_path, build_root, tree_depth, verify, AuthPath, MerkleProof, MerkleTree, PathNode, Side,
};
