//! Fixed-depth Merkle accumulator over committed leaves.
//!
//! Leaf order policy: leaves are sorted ascending by integer value and
//! deduplicated before insertion. The root therefore depends only on the leaf
//! set, which lets any client recompute an allow-list root independently.
//!
//! Unused positions hold the sentinel empty leaf `0`. Empty subtrees are never
//! materialized; their hashes come from a per-level table, so building costs
//! roughly one hash per real node.

use crate::constants::MAX_MERKLE_DEPTH;
use crate::error::ZkError;
use crate::field::FieldElement;
use crate::hash::HashBackend;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Value occupying every unused leaf position.
pub fn empty_leaf() -> FieldElement {
    FieldElement::zero()
}

/// Hashes of all-empty subtrees, indexed by height (`0..=depth`).
pub fn zero_hashes(backend: &HashBackend, depth: usize) -> Vec<FieldElement> {
    let mut out = Vec::with_capacity(depth + 1);
    out.push(empty_leaf());
    for level in 0..depth {
        let z = out[level];
        out.push(backend.hash_pair(z, z));
    }
    out
}

/// Root of a tree with no leaves. Serves as the "deny all" policy baseline.
pub fn empty_root(backend: &HashBackend, depth: usize) -> Result<FieldElement, ZkError> {
    check_depth(depth)?;
    Ok(zero_hashes(backend, depth)[depth])
}

fn check_depth(depth: usize) -> Result<(), ZkError> {
    if depth == 0 || depth > MAX_MERKLE_DEPTH {
        return Err(ZkError::InvalidInput(format!(
            "merkle depth must be 1-{MAX_MERKLE_DEPTH} (got {depth})"
        )));
    }
    Ok(())
}

#[derive(Clone, Debug)]
pub struct MerkleTree {
    depth: usize,
    /// `levels[0]` holds the sorted leaves; `levels[i]` the non-empty prefix of height `i`.
    levels: Vec<Vec<FieldElement>>,
    zero_hashes: Vec<FieldElement>,
    root: FieldElement,
}

impl MerkleTree {
    pub fn build(
        backend: &HashBackend,
        depth: usize,
        leaves: impl IntoIterator<Item = FieldElement>,
    ) -> Result<Self, ZkError> {
        check_depth(depth)?;

        let mut sorted: Vec<FieldElement> = leaves.into_iter().collect();
        sorted.sort_unstable();
        sorted.dedup();

        let capacity = 1u64 << depth;
        if sorted.len() as u64 > capacity {
            return Err(ZkError::CapacityExceeded { leaves: sorted.len(), depth });
        }

        let zero_hashes = zero_hashes(backend, depth);
        let mut levels = Vec::with_capacity(depth + 1);
        levels.push(sorted);

        for level in 0..depth {
            let current = &levels[level];
            let next: Vec<FieldElement> = current
                .chunks(2)
                .map(|pair| {
                    let right = pair.get(1).copied().unwrap_or(zero_hashes[level]);
                    backend.hash_pair(pair[0], right)
                })
                .collect();
            levels.push(next);
        }

        let root = levels[depth].first().copied().unwrap_or(zero_hashes[depth]);
        debug!(depth, leaves = levels[0].len(), root = %root, "merkle tree built");

        Ok(Self { depth, levels, zero_hashes, root })
    }

    pub fn root(&self) -> FieldElement {
        self.root
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The deduplicated leaves in canonical order.
    pub fn leaves(&self) -> &[FieldElement] {
        &self.levels[0]
    }

    pub fn contains(&self, leaf: &FieldElement) -> bool {
        self.levels[0].binary_search(leaf).is_ok()
    }

    fn node(&self, level: usize, index: usize) -> FieldElement {
        self.levels[level]
            .get(index)
            .copied()
            .unwrap_or(self.zero_hashes[level])
    }

    /// Sibling path for `leaf`, located by value.
    pub fn prove_membership(&self, leaf: FieldElement) -> Result<InclusionProof, ZkError> {
        let mut index = self.levels[0]
            .binary_search(&leaf)
            .map_err(|_| ZkError::NotFound)?;

        let mut siblings = Vec::with_capacity(self.depth);
        let mut path_bits = Vec::with_capacity(self.depth);
        for level in 0..self.depth {
            siblings.push(self.node(level, index ^ 1));
            path_bits.push(index & 1 == 1);
            index >>= 1;
        }

        Ok(InclusionProof { leaf, siblings, path_bits })
    }
}

/// Membership evidence. `path_bits[i]` is set when the node at height `i` is a right child.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InclusionProof {
    pub leaf: FieldElement,
    pub siblings: Vec<FieldElement>,
    pub path_bits: Vec<bool>,
}

impl InclusionProof {
    /// Leaf position encoded by the path bits.
    pub fn index(&self) -> u64 {
        self.path_bits
            .iter()
            .take(64)
            .enumerate()
            .fold(0u64, |acc, (i, &bit)| acc | ((bit as u64) << i))
    }

    /// Fold the leaf up to a root.
    pub fn compute_root(&self, backend: &HashBackend) -> FieldElement {
        self.siblings
            .iter()
            .zip(&self.path_bits)
            .fold(self.leaf, |node, (&sibling, &is_right)| {
                if is_right {
                    backend.hash_pair(sibling, node)
                } else {
                    backend.hash_pair(node, sibling)
                }
            })
    }
}

/// Check `proof` against a depth-`depth` tree with the given root.
///
/// The path must be exactly `depth` long; a shorter path would let an internal
/// node pose as a leaf.
pub fn verify_membership(
    backend: &HashBackend,
    root: FieldElement,
    depth: usize,
    proof: &InclusionProof,
) -> bool {
    if proof.siblings.len() != depth || proof.path_bits.len() != depth {
        return false;
    }
    proof.compute_root(backend) == root
}
