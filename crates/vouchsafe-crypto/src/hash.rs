use vouchsafe_types::{Address, Hash};

/// Blake3 hashing utilities.

/// Domain for recipient leaves in a candidate set.
pub const CANDIDATE_DOMAIN: &str = "vouchsafe/candidate";

/// Compute blake3 hash of data
pub fn hash(data: &[u8]) -> Hash {
    Hash::compute(data)
}

/// Compute blake3 hash of multiple data slices
pub fn hash_multi(data: &[&[u8]]) -> Hash {
    Hash::compute_multi(data)
}

/// Hash two values together (Merkle interior node). Order matters.
pub fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    hash_multi(&[left.as_bytes(), right.as_bytes()])
}

/// Hash with a domain separator
pub fn hash_with_domain(data: &[u8], domain: &str) -> Hash {
    hash_multi(&[domain.as_bytes(), data])
}

/// Leaf committed for a recipient address.
///
/// Candidate files, proofs and the collect path all go through this so a
/// claimant is bound to the identity that receives the funds.
pub fn candidate_leaf(recipient: &Address) -> Hash {
    hash_with_domain(recipient.as_bytes(), CANDIDATE_DOMAIN)
}
