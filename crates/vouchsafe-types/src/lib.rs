//! Vouchsafe Types - Core type definitions for the Vouchsafe escrow engine.
//!
//! This crate provides:
//! - Addresses (20-byte, Bech32m encoded) and program-derived addresses
//! - Hashes (32-byte, blake3 digests)
//! - The asset tag carried by every escrow (native coin or token mint)

pub mod address;
pub mod asset;
pub mod error;
pub mod hash;

#[cfg(any(feature = "serde", feature = "borsh"))]
mod serialization;

pub use address::Address;
pub use asset::Asset;
pub use error::TypesError;
pub use hash::Hash;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Address, Asset, Hash, TypesError};
}
