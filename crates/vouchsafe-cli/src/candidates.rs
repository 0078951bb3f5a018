//! Candidate list files.
//!
//! One address per line, bech32m (`vsf1...`) or hex (`0x...`). Blank lines
//! and `#` comments are ignored. Line order is leaf order.

use anyhow::Context;
use std::path::Path;
use std::str::FromStr;
use vouchsafe_crypto::{candidate_leaf, MerkleTree};
use vouchsafe_types::{Address, Hash};

/// Parse a candidate list.
pub fn parse_candidates(contents: &str) -> anyhow::Result<Vec<Address>> {
    let mut candidates = Vec::new();

    for (index, line) in contents.lines().enumerate() {
        let entry = match line.split_once('#') {
            Some((before, _)) => before,
            None => line,
        }
        .trim();

        if entry.is_empty() {
            continue;
        }

        let address = Address::from_str(entry)
            .with_context(|| format!("line {}: invalid candidate address '{}'", index + 1, entry))?;
        candidates.push(address);
    }

    if candidates.is_empty() {
        anyhow::bail!("candidate list is empty");
    }
    Ok(candidates)
}

/// Read and parse a candidate list file.
pub fn load_candidates(path: &Path) -> anyhow::Result<Vec<Address>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read candidate file '{}': {}", path.display(), e))?;
    parse_candidates(&contents).with_context(|| format!("in candidate file '{}'", path.display()))
}

/// Merkle tree over the candidates' leaves.
pub fn candidate_tree(candidates: &[Address]) -> anyhow::Result<MerkleTree> {
    let leaves: Vec<Hash> = candidates.iter().map(candidate_leaf).collect();
    Ok(MerkleTree::from_leaves(&leaves)?)
}
