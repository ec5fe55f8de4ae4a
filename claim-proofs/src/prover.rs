//! Proving and verifying capabilities.
//!
//! The pipeline talks to a proof system only through these traits, so the
//! orchestration can be exercised against a stub that returns canned proofs.

use crate::circuit::CircuitKind;
use crate::error::ZkError;
use crate::field::FieldElement;
use crate::witness::Witness;
use serde::{Deserialize, Serialize};

/// Output of one proving request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofArtifact {
    /// Opaque proof bytes (compressed Groth16 proof for the arkworks backend).
    pub proof: Vec<u8>,
    pub public_signals: Vec<FieldElement>,
}

pub trait Prover: Send + Sync {
    fn circuit(&self) -> CircuitKind;

    /// Prove a shape-checked witness. Expensive and CPU-bound.
    fn prove(&self, witness: Witness) -> Result<ProofArtifact, ZkError>;
}

pub trait Verifier: Send + Sync {
    /// `Ok(false)` for a well-formed but invalid proof; `Err` for malformed encodings.
    fn verify(&self, proof: &[u8], public_signals: &[FieldElement]) -> Result<bool, ZkError>;
}
