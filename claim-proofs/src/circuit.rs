//! R1CS circuits for claim predicates.
//!
//! Two circuit families:
//! - [`ClaimThresholdCircuit`]: the prover knows `(value, document_hash)` whose
//!   commitment is public, and `value >= threshold` for a public threshold.
//! - [`AllowListCircuit`]: the prover knows `(value, document_hash)` whose
//!   commitment is public, and `Poseidon([value])` is a leaf of the allow-list
//!   tree with a public root.
//!
//! The claim itself never becomes public; only the commitment, the policy
//! parameter (threshold or root) and the proof are revealed.

use crate::constants::{CIRCUIT_VERSION, THRESHOLD_BITS};
use crate::error::ZkError;
use crate::hash::HashBackend;
use ark_bn254::Fr;
use ark_crypto_primitives::sponge::constraints::CryptographicSpongeVar;
use ark_crypto_primitives::sponge::poseidon::constraints::PoseidonSpongeVar;
use ark_crypto_primitives::sponge::poseidon::PoseidonConfig;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Named circuit families with fixed verification keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitKind {
    ClaimThreshold,
    AllowListMembership,
}

impl CircuitKind {
    pub const ALL: [CircuitKind; 2] = [CircuitKind::ClaimThreshold, CircuitKind::AllowListMembership];

    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitKind::ClaimThreshold => "claim_threshold",
            CircuitKind::AllowListMembership => "allow_list_membership",
        }
    }

    /// Artifact stem, e.g. `claim_threshold.v1`.
    pub fn artifact_name(&self) -> String {
        format!("{}.v{CIRCUIT_VERSION}", self.as_str())
    }

    /// Public signal count, in allocation order.
    pub fn num_public_inputs(&self) -> usize {
        2
    }
}

impl fmt::Display for CircuitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CircuitKind {
    type Err = ZkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claim_threshold" => Ok(CircuitKind::ClaimThreshold),
            "allow_list_membership" => Ok(CircuitKind::AllowListMembership),
            other => Err(ZkError::CircuitNotFound(other.to_string())),
        }
    }
}

/// In-circuit twin of [`HashBackend::hash`]: arity first, then each input.
pub fn hash_gadget(
    cs: ConstraintSystemRef<Fr>,
    config: &PoseidonConfig<Fr>,
    inputs: &[FpVar<Fr>],
) -> Result<FpVar<Fr>, SynthesisError> {
    let mut sponge = PoseidonSpongeVar::<Fr>::new(cs, config);
    sponge.absorb(&FpVar::<Fr>::constant(Fr::from(inputs.len() as u64)))?;
    for x in inputs {
        sponge.absorb(x)?;
    }
    let mut out = sponge.squeeze_field_elements(1)?;
    Ok(out.remove(0))
}

/// Convert little-endian boolean bits into an FpVar.
fn bits_le_to_fp(bits_le: &[Boolean<Fr>]) -> Result<FpVar<Fr>, SynthesisError> {
    let mut acc = FpVar::<Fr>::constant(Fr::from(0u64));
    let mut coeff = FpVar::<Fr>::constant(Fr::from(1u64));

    for b in bits_le {
        let term = b.select(&coeff, &FpVar::<Fr>::constant(Fr::from(0u64)))?;
        acc += term;
        coeff += coeff.clone();
    }

    Ok(acc)
}

/// Enforce that `v` fits in `n` bits.
fn constrain_bits(v: &FpVar<Fr>, n: usize) -> Result<(), SynthesisError> {
    let bits = v.to_bits_le()?;
    let reconstructed = bits_le_to_fp(&bits[..n])?;
    reconstructed.enforce_equal(v)
}

/// Allocate the private claim and enforce its public commitment.
fn enforce_claim_commitment(
    cs: ConstraintSystemRef<Fr>,
    config: &PoseidonConfig<Fr>,
    value: Fr,
    document_hash: Fr,
    public_commitment: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    let value = FpVar::<Fr>::new_witness(cs.clone(), || Ok(value))?;
    let document_hash = FpVar::<Fr>::new_witness(cs.clone(), || Ok(document_hash))?;

    let commitment = hash_gadget(cs, config, &[value.clone(), document_hash])?;
    commitment.enforce_equal(public_commitment)?;
    Ok(value)
}

/// Proves `value >= threshold` for a committed claim.
#[derive(Clone, Debug)]
pub struct ClaimThresholdCircuit {
    pub backend: Arc<HashBackend>,

    /// Private claim.
    pub value: Fr,
    pub document_hash: Fr,

    /// Public inputs.
    pub commitment: Fr,
    pub threshold: Fr,
}

impl ConstraintSynthesizer<Fr> for ClaimThresholdCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        // Public input order MUST match `Witness::public_signals`: commitment, threshold.
        let commitment = FpVar::<Fr>::new_input(cs.clone(), || Ok(self.commitment))?;
        let threshold = FpVar::<Fr>::new_input(cs.clone(), || Ok(self.threshold))?;

        let config = self.backend.config();
        let value = enforce_claim_commitment(cs, config, self.value, self.document_hash, &commitment)?;

        // Both operands are bounded, so the difference fits iff value >= threshold.
        constrain_bits(&value, THRESHOLD_BITS)?;
        constrain_bits(&threshold, THRESHOLD_BITS)?;
        let diff = &value - &threshold;
        constrain_bits(&diff, THRESHOLD_BITS)?;

        Ok(())
    }
}

/// Proves that a committed claim's attribute leaf is in an allow-list tree.
#[derive(Clone, Debug)]
pub struct AllowListCircuit {
    pub backend: Arc<HashBackend>,
    pub depth: usize,

    /// Private claim and membership path.
    pub value: Fr,
    pub document_hash: Fr,
    pub siblings: Vec<Fr>,
    pub path_bits: Vec<bool>,

    /// Public inputs.
    pub root: Fr,
    pub commitment: Fr,
}

impl ConstraintSynthesizer<Fr> for AllowListCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        // Public input order MUST match `Witness::public_signals`: root, commitment.
        let root = FpVar::<Fr>::new_input(cs.clone(), || Ok(self.root))?;
        let commitment = FpVar::<Fr>::new_input(cs.clone(), || Ok(self.commitment))?;

        if self.siblings.len() != self.depth || self.path_bits.len() != self.depth {
            return Err(SynthesisError::Unsatisfiable);
        }

        let config = self.backend.config();
        let value = enforce_claim_commitment(cs.clone(), config, self.value, self.document_hash, &commitment)?;

        let mut node = hash_gadget(cs.clone(), config, &[value])?;
        for (sibling, is_right) in self.siblings.into_iter().zip(self.path_bits) {
            let sibling = FpVar::<Fr>::new_witness(cs.clone(), || Ok(sibling))?;
            let is_right = Boolean::new_witness(cs.clone(), || Ok(is_right))?;

            let left = is_right.select(&sibling, &node)?;
            let right = is_right.select(&node, &sibling)?;
            node = hash_gadget(cs.clone(), config, &[left, right])?;
        }

        node.enforce_equal(&root)?;
        Ok(())
    }
}
