//! Binary Merkle commitments over an ordered candidate set.
//!
//! Level 0 holds the leaves. Each next level hashes adjacent pairs as
//! `blake3(left || right)`; a level of odd length pairs its last node with
//! itself. Only the root is ever committed; trees are rebuilt client side
//! whenever a path is needed.

use vouchsafe_types::Hash;

use crate::error::CryptoError;
use crate::hash::hash_pair;

/// Which side of the running node a sibling sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Side of the sibling for the node at `index` within its level.
    pub fn of_sibling(index: u64) -> Self {
        if index % 2 == 0 {
            Side::Right
        } else {
            Side::Left
        }
    }
}

/// One level of an authentication path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathNode {
    pub sibling: Hash,
    pub side: Side,
}

impl PathNode {
    pub fn new(sibling: Hash, side: Side) -> Self {
        Self { sibling, side }
    }

    fn fold(&self, running: &Hash) -> Hash {
        match self.side {
            Side::Left => hash_pair(&self.sibling, running),
            Side::Right => hash_pair(running, &self.sibling),
        }
    }
}

/// Sibling hashes from a leaf up to (excluding) the root, bottom first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct AuthPath {
    nodes: Vec<PathNode>,
}

impl AuthPath {
    pub fn new(nodes: Vec<PathNode>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[PathNode] {
        &self.nodes
    }

    /// Mutable access for callers that assemble or repair paths.
    pub fn nodes_mut(&mut self) -> &mut Vec<PathNode> {
        &mut self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Fold `leaf` through every sibling in order.
    pub fn compute_root(&self, leaf: &Hash) -> Hash {
        self.nodes
            .iter()
            .fold(*leaf, |running, node| node.fold(&running))
    }

    /// Check the path has exactly the depth of a tree over `size` leaves.
    pub fn check_length(&self, size: u64) -> Result<(), CryptoError> {
        let expected = tree_depth(size);
        if self.nodes.len() != expected {
            return Err(CryptoError::MalformedProof {
                expected,
                actual: self.nodes.len(),
            });
        }
        Ok(())
    }

    /// Whether this path is shaped for the leaf at `position` in a tree of
    /// `size` leaves.
    ///
    /// Every sibling side is re-derived from the position, so a path built for
    /// one position never binds another position of the same tree.
    pub fn binds_position(&self, position: u64, size: u64) -> bool {
        if position >= size || self.nodes.len() != tree_depth(size) {
            return false;
        }

        let mut index = position;
        for node in &self.nodes {
            if node.side != Side::of_sibling(index) {
                return false;
            }
            index /= 2;
        }
        true
    }
}

impl From<Vec<PathNode>> for AuthPath {
    fn from(nodes: Vec<PathNode>) -> Self {
        Self::new(nodes)
    }
}

/// Number of path nodes for a tree over `size` leaves.
pub fn tree_depth(size: u64) -> usize {
    let mut width = size;
    let mut depth = 0;
    while width > 1 {
        width = width / 2 + width % 2;
        depth += 1;
    }
    depth
}

/// Binary Merkle tree using blake3, kept as an arena of levels.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    /// levels[0] are the leaves, the last level holds only the root.
    /// Levels are stored unpadded.
    levels: Vec<Vec<Hash>>,
}

impl MerkleTree {
    /// Build a Merkle tree from leaf hashes.
    pub fn from_leaves(leaves: &[Hash]) -> Result<Self, CryptoError> {
        if leaves.is_empty() {
            return Err(CryptoError::EmptyTree);
        }

        let mut levels = Vec::with_capacity(tree_depth(leaves.len() as u64) + 1);
        let mut current = leaves.to_vec();

        while current.len() > 1 {
            let next: Vec<Hash> = current
                .chunks(2)
                .map(|pair| {
                    let left = &pair[0];
                    // Odd level: the last node pairs with itself
                    let right = pair.get(1).unwrap_or(left);
                    hash_pair(left, right)
                })
                .collect();
            levels.push(std::mem::replace(&mut current, next));
        }
        levels.push(current);

        Ok(Self { levels })
    }

    /// Get the root hash.
    pub fn root(&self) -> Hash {
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or(Hash::ZERO)
    }

    /// Number of leaves
    pub fn len(&self) -> u64 {
        self.levels.first().map_or(0, |leaves| leaves.len() as u64)
    }

    /// Always false for a built tree; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of levels above the leaves
    pub fn depth(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    /// Leaf at `position`, if any.
    pub fn leaf(&self, position: u64) -> Option<Hash> {
        let index = usize::try_from(position).ok()?;
        self.levels.first()?.get(index).copied()
    }

    /// Authentication path for the leaf at `position`.
    pub fn path(&self, position: u64) -> Result<AuthPath, CryptoError> {
        let size = self.len();
        if position >= size {
            return Err(CryptoError::PositionOutOfRange { position, size });
        }

        // position < size, and size came from a Vec length
        let mut index = position as usize;
        let mut nodes = Vec::with_capacity(self.depth());

        for level in &self.levels[..self.depth()] {
            let sibling = level.get(index ^ 1).unwrap_or(&level[index]);
            nodes.push(PathNode::new(*sibling, Side::of_sibling(index as u64)));
            index /= 2;
        }

        Ok(AuthPath::new(nodes))
    }

    /// Generate a full inclusion proof for the leaf at `position`.
    pub fn proof(&self, position: u64) -> Result<MerkleProof, CryptoError> {
        let path = self.path(position)?;
        let leaf = self
            .leaf(position)
            .ok_or(CryptoError::PositionOutOfRange { position, size: self.len() })?;

        Ok(MerkleProof { leaf, position, path })
    }
}

/// Merkle inclusion proof as presented by a claimant.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MerkleProof {
    pub leaf: Hash,
    pub position: u64,
    pub path: AuthPath,
}

impl MerkleProof {
    /// Verify this proof against an expected root, ignoring the position.
    pub fn verify(&self, root: &Hash) -> bool {
        verify(&self.leaf, &self.path, root)
    }

    /// Verify against `root` and require the path to be shaped for
    /// `self.position` in a set of `size` leaves.
    pub fn verify_bound(&self, root: &Hash, size: u64) -> bool {
        self.path.binds_position(self.position, size) && self.verify(root)
    }

    /// Like [`verify_bound`](Self::verify_bound) but explains the failure.
    pub fn check(&self, root: &Hash, size: u64) -> Result<(), CryptoError> {
        self.path.check_length(size)?;
        if self.verify_bound(root, size) {
            Ok(())
        } else {
            Err(CryptoError::MerkleProofInvalid)
        }
    }

    /// Proof size (number of siblings)
    pub fn depth(&self) -> usize {
        self.path.len()
    }
}

/// Root of the tree over `leaves`.
pub fn build_root(leaves: &[Hash]) -> Result<Hash, CryptoError> {
    Ok(MerkleTree::from_leaves(leaves)?.root())
}

/// Root of the tree over `leaves` together with the path for `position`.
pub fn build_path(leaves: &[Hash], position: u64) -> Result<(Hash, AuthPath), CryptoError> {
    let tree = MerkleTree::from_leaves(leaves)?;
    let path = tree.path(position)?;
    Ok((tree.root(), path))
}

/// Whether `leaf` folded through `path` reproduces `root`.
///
/// An empty path only verifies a single-leaf set, where the root is the leaf.
pub fn verify(leaf: &Hash, path: &AuthPath, root: &Hash) -> bool {
    &path.compute_root(leaf) == root
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn leaves(n: usize) -> Vec<Hash> {
        (0..n)
            .map(|i| Hash::compute(format!("leaf{}", i).as_bytes()))
            .collect()
    }

    fn flip_bit(hash: &Hash, bit: usize) -> Hash {
        let mut bytes = *hash.as_bytes();
        bytes[bit / 8] ^= 1 << (bit % 8);
        Hash::from_bytes(bytes)
    }

    #[test]
    fn test_empty_leaf_set_fails() {
        assert_eq!(MerkleTree::from_leaves(&[]).unwrap_err(), CryptoError::EmptyTree);
        assert_eq!(build_root(&[]), Err(CryptoError::EmptyTree));
        assert_eq!(build_path(&[], 0).unwrap_err(), CryptoError::EmptyTree);
    }

    #[test]
    fn test_single_leaf_is_its_own_root() {
        let leaf = Hash::compute(b"single");
        let (root, path) = build_path(&[leaf], 0).unwrap();

        assert_eq!(root, leaf);
        assert!(path.is_empty());
        assert!(verify(&leaf, &path, &root));
        assert!(!verify(&Hash::compute(b"other"), &path, &root));
        assert!(path.binds_position(0, 1));
    }

    #[test]
    fn test_two_leaves() {
        let l = leaves(2);
        let root = build_root(&l).unwrap();
        assert_eq!(root, hash_pair(&l[0], &l[1]));
    }

    #[test]
    fn test_odd_level_duplicates_last_element() {
        let l = leaves(3);
        let expected = hash_pair(&hash_pair(&l[0], &l[1]), &hash_pair(&l[2], &l[2]));
        assert_eq!(build_root(&l).unwrap(), expected);

        // Padding with a zero leaf would be a different commitment
        let zero_padded = hash_pair(&hash_pair(&l[0], &l[1]), &hash_pair(&l[2], &Hash::ZERO));
        assert_ne!(build_root(&l).unwrap(), zero_padded);
    }

    #[test]
    fn test_odd_interior_level_duplicates_last_element() {
        let l = leaves(5);
        let a = hash_pair(&l[0], &l[1]);
        let b = hash_pair(&l[2], &l[3]);
        let c = hash_pair(&l[4], &l[4]);
        let expected = hash_pair(&hash_pair(&a, &b), &hash_pair(&c, &c));
        assert_eq!(build_root(&l).unwrap(), expected);
    }

    #[test]
    fn test_duplicated_leaf_path_uses_itself_as_sibling() {
        let l = leaves(3);
        let (_, path) = build_path(&l, 2).unwrap();

        assert_eq!(path.nodes()[0], PathNode::new(l[2], Side::Right));
        assert_eq!(path.nodes()[1], PathNode::new(hash_pair(&l[0], &l[1]), Side::Left));
    }

    #[test]
    fn test_tree_depth() {
        assert_eq!(tree_depth(1), 0);
        assert_eq!(tree_depth(2), 1);
        assert_eq!(tree_depth(3), 2);
        assert_eq!(tree_depth(4), 2);
        assert_eq!(tree_depth(5), 3);
        assert_eq!(tree_depth(8), 3);
        assert_eq!(tree_depth(9), 4);

        for n in 1..40u64 {
            let tree = MerkleTree::from_leaves(&leaves(n as usize)).unwrap();
            assert_eq!(tree.depth(), tree_depth(n), "size {}", n);
        }
    }

    #[test]
    fn test_every_position_round_trips() {
        for n in 1..=17 {
            let l = leaves(n);
            let tree = MerkleTree::from_leaves(&l).unwrap();

            for (i, leaf) in l.iter().enumerate() {
                let proof = tree.proof(i as u64).unwrap();
                assert_eq!(proof.leaf, *leaf);
                assert_eq!(proof.depth(), tree_depth(n as u64));
                assert!(proof.verify(&tree.root()), "size {} position {}", n, i);
                assert!(proof.verify_bound(&tree.root(), n as u64));
                assert_eq!(proof.check(&tree.root(), n as u64), Ok(()));
            }
        }
    }

    #[test]
    fn test_wrong_root_fails() {
        let tree = MerkleTree::from_leaves(&leaves(8)).unwrap();
        let proof = tree.proof(3).unwrap();
        assert!(!proof.verify(&Hash::compute(b"wrong")));
    }

    #[test]
    fn test_position_out_of_bounds() {
        let tree = MerkleTree::from_leaves(&leaves(4)).unwrap();

        assert_eq!(
            tree.path(4).unwrap_err(),
            CryptoError::PositionOutOfRange { position: 4, size: 4 }
        );
        assert!(tree.proof(100).is_err());
        assert!(tree.leaf(4).is_none());
    }

    #[test]
    fn test_proof_replayed_at_neighbour_position_fails() {
        let l = leaves(8);
        let tree = MerkleTree::from_leaves(&l).unwrap();
        let mut proof = tree.proof(2).unwrap();

        proof.position = 3;
        assert!(!proof.verify_bound(&tree.root(), 8));
        assert_eq!(proof.check(&tree.root(), 8), Err(CryptoError::MerkleProofInvalid));

        // The raw fold ignores position and still matches
        assert!(proof.verify(&tree.root()));
    }

    #[test]
    fn test_last_position_cannot_be_shifted_past_size() {
        let l = leaves(5);
        let tree = MerkleTree::from_leaves(&l).unwrap();
        let path = tree.path(4).unwrap();

        assert!(path.binds_position(4, 5));
        assert!(!path.binds_position(5, 5));
        assert!(!path.binds_position(5, 6));
    }

    #[test]
    fn test_malformed_length() {
        let l = leaves(8);
        let tree = MerkleTree::from_leaves(&l).unwrap();
        let mut proof = tree.proof(0).unwrap();
        proof.path.nodes_mut().pop();

        assert_eq!(
            proof.check(&tree.root(), 8),
            Err(CryptoError::MalformedProof { expected: 3, actual: 2 })
        );
        assert!(!proof.path.binds_position(0, 8));
    }

    #[test]
    fn test_interior_node_cannot_pose_as_leaf() {
        let l = leaves(4);
        let tree = MerkleTree::from_leaves(&l).unwrap();
        let interior = hash_pair(&l[0], &l[1]);
        let path = AuthPath::new(vec![PathNode::new(hash_pair(&l[2], &l[3]), Side::Right)]);

        // Folds to the root, but is one level short for a 4-leaf set
        assert!(verify(&interior, &path, &tree.root()));
        assert!(!path.binds_position(0, 4));
    }

    #[test]
    fn test_reordering_changes_root() {
        let mut l = leaves(4);
        let root = build_root(&l).unwrap();
        l.swap(1, 2);
        assert_ne!(root, build_root(&l).unwrap());
    }

    #[test]
    fn test_deterministic() {
        let l = leaves(6);
        let (root1, path1) = build_path(&l, 5).unwrap();
        let (root2, path2) = build_path(&l, 5).unwrap();
        assert_eq!(root1, root2);
        assert_eq!(path1, path2);
    }

    #[test]
    #[cfg(feature = "serde")]
    fn test_proof_json_shape() {
        let tree = MerkleTree::from_leaves(&leaves(2)).unwrap();
        let proof = tree.proof(1).unwrap();
        let json = serde_json::to_value(&proof).unwrap();

        assert_eq!(json["position"], 1);
        assert_eq!(json["path"][0]["side"], "left");
        let back: MerkleProof = serde_json::from_value(json).unwrap();
        assert_eq!(back, proof);
    }

    fn leaf_set() -> impl Strategy<Value = Vec<Hash>> {
        prop::collection::vec(any::<[u8; 32]>().prop_map(Hash::from_bytes), 1..48)
    }

    proptest! {
        #[test]
        fn prop_round_trip(l in leaf_set(), pick in any::<prop::sample::Index>()) {
            let position = pick.index(l.len()) as u64;
            let (root, path) = build_path(&l, position).unwrap();

            prop_assert_eq!(root, build_root(&l).unwrap());
            prop_assert!(verify(&l[position as usize], &path, &root));
            prop_assert!(path.binds_position(position, l.len() as u64));
        }

        #[test]
        fn prop_tampering_is_detected(
            l in leaf_set(),
            pick in any::<prop::sample::Index>(),
            bit in 0usize..256,
            sibling_pick in any::<prop::sample::Index>(),
        ) {
            let position = pick.index(l.len()) as u64;
            let leaf = l[position as usize];
            let (root, path) = build_path(&l, position).unwrap();

            prop_assert!(!verify(&flip_bit(&leaf, bit), &path, &root));
            prop_assert!(!verify(&leaf, &path, &flip_bit(&root, bit)));

            if !path.is_empty() {
                let mut tampered = path.clone();
                let level = sibling_pick.index(tampered.len());
                let node = &mut tampered.nodes_mut()[level];
                node.sibling = flip_bit(&node.sibling, bit);
                prop_assert!(!verify(&leaf, &tampered, &root));
            }
        }

        #[test]
        fn prop_proof_is_bound_to_its_position(
            l in prop::collection::vec(any::<[u8; 32]>().prop_map(Hash::from_bytes), 2..48),
            a in any::<prop::sample::Index>(),
            b in any::<prop::sample::Index>(),
        ) {
            let size = l.len() as u64;
            let p = a.index(l.len()) as u64;
            let other = b.index(l.len()) as u64;
            prop_assume!(p != other);

            let tree = MerkleTree::from_leaves(&l).unwrap();
            let mut proof = tree.proof(p).unwrap();
            proof.position = other;

            prop_assert!(!proof.verify_bound(&tree.root(), size));
        }
    }
}
