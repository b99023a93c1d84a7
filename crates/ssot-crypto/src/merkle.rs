use serde::{Deserialize, Serialize};
use ssot_types::{Digest, TypeError};

use crate::hasher::ContentHasher;

/// Side of a sibling in a Merkle proof path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// Binary Merkle tree over an ordered sequence of leaf hashes.
///
/// The tree is order-sensitive: permuting the leaves changes the root. At
/// every level with an odd node count the last node is paired with itself.
/// Trees are never mutated; a changed leaf set means a new tree.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    /// The root hash, `None` for an empty tree.
    root: Option<Digest>,
    /// Original leaf hashes.
    leaves: Vec<Digest>,
    /// All tree nodes stored level by level.
    /// Level 0 = leaves, last element = root.
    levels: Vec<Vec<Digest>>,
}

impl MerkleTree {
    /// Build a Merkle tree from leaf hashes.
    ///
    /// An empty list produces no root. A single leaf is its own root.
    pub fn from_leaves(leaves: Vec<Digest>) -> Self {
        if leaves.is_empty() {
            return Self {
                root: None,
                leaves: vec![],
                levels: vec![],
            };
        }

        let mut levels: Vec<Vec<Digest>> = vec![leaves.clone()];
        let mut current = leaves.clone();

        while current.len() > 1 {
            let mut next = Vec::with_capacity(current.len().div_ceil(2));
            for pair in current.chunks(2) {
                let hash = match pair {
                    [left, right] => ContentHasher::hash_pair(left, right),
                    // Odd node: hash with itself
                    [last] => ContentHasher::hash_pair(last, last),
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                };
                next.push(hash);
            }
            levels.push(next.clone());
            current = next;
        }

        Self {
            root: Some(current[0]),
            leaves,
            levels,
        }
    }

    /// Build a tree from hex-encoded leaf hashes.
    pub fn from_hex_leaves<S: AsRef<str>>(leaves: &[S]) -> Result<Self, TypeError> {
        let leaves = leaves
            .iter()
            .map(|s| Digest::from_hex(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_leaves(leaves))
    }

    /// The root hash, or `None` for an empty tree.
    pub fn root(&self) -> Option<Digest> {
        self.root
    }

    /// The root as it appears on the wire: lowercase hex, or `""` when empty.
    pub fn root_hex(&self) -> String {
        self.root.map(|r| r.to_hex()).unwrap_or_default()
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// The leaf hashes in tree order.
    pub fn leaves(&self) -> &[Digest] {
        &self.leaves
    }

    /// Generate an inclusion proof for the leaf at `index`.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        let root = self.root?;
        if index >= self.leaves.len() {
            return None;
        }

        let mut path = Vec::new();
        let mut idx = index;

        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_idx = if idx % 2 == 0 { idx + 1 } else { idx - 1 };
            let sibling = if sibling_idx < level.len() {
                level[sibling_idx]
            } else {
                // Odd level: duplicate the last element
                level[idx]
            };
            let side = if idx % 2 == 0 { Side::Right } else { Side::Left };
            path.push((sibling, side));
            idx /= 2;
        }

        Some(MerkleProof {
            leaf: self.leaves[index],
            path,
            root,
        })
    }
}

/// Merkle inclusion proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// The leaf being proven.
    pub leaf: Digest,
    /// Path of (sibling_hash, sibling_side) pairs from leaf to root.
    pub path: Vec<(Digest, Side)>,
    /// Expected root hash.
    pub root: Digest,
}

impl MerkleProof {
    /// Verify the proof: recompute the root from the leaf and path.
    pub fn verify(&self) -> bool {
        let mut current = self.leaf;
        for (sibling, side) in &self.path {
            current = match side {
                Side::Left => ContentHasher::hash_pair(sibling, &current),
                Side::Right => ContentHasher::hash_pair(&current, sibling),
            };
        }
        current == self.root
    }
}
