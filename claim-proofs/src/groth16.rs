//! Groth16 prover/verifier for the claim circuits.
//!
//! SECURITY NOTE: Groth16 requires a trusted setup that produces a proving key
//! (PK) and verifying key (VK) per circuit. [`setup_circuit`] generates them
//! locally, which is only suitable for development. Production keys must come
//! from an MPC ceremony and be shipped as immutable artifacts.

use crate::circuit::CircuitKind;
use crate::error::ZkError;
use crate::field::FieldElement;
use crate::hash::HashBackend;
use crate::prover::{ProofArtifact, Prover, Verifier};
use crate::witness::Witness;
use ark_bn254::{Bn254, Fr};
use ark_crypto_primitives::snark::SNARK;
use ark_groth16::{Groth16, PreparedVerifyingKey, Proof, ProvingKey, VerifyingKey};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Generate a Groth16 keypair for one circuit family.
///
/// Constraints depend only on the kind and the Merkle depth, so this runs
/// once per (kind, depth).
pub fn setup_circuit(
    backend: &Arc<HashBackend>,
    kind: CircuitKind,
    depth: usize,
    rng: &mut impl RngCore,
) -> Result<(ProvingKey<Bn254>, VerifyingKey<Bn254>), ZkError> {
    let started = Instant::now();
    let circuit = Witness::blank(kind, depth).into_circuit(backend.clone());

    let pk = Groth16::<Bn254>::generate_random_parameters_with_reduction(circuit, rng)
        .map_err(|e| ZkError::ProofGenerationFailed(format!("setup failed: {e}")))?;

    info!(
        circuit = %kind,
        depth,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "groth16 keys generated"
    );
    let vk = pk.vk.clone();
    Ok((pk, vk))
}

/// Arkworks Groth16 prover and verifier bound to one circuit's keys.
pub struct Groth16Backend {
    kind: CircuitKind,
    depth: usize,
    hasher: Arc<HashBackend>,
    pk: ProvingKey<Bn254>,
    verifier: Groth16Verifier,
}

impl Groth16Backend {
    pub fn new(
        kind: CircuitKind,
        depth: usize,
        hasher: Arc<HashBackend>,
        pk: ProvingKey<Bn254>,
    ) -> Result<Self, ZkError> {
        let verifier = Groth16Verifier::new(pk.vk.clone())?;
        Ok(Self { kind, depth, hasher, pk, verifier })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn verifying_key(&self) -> &VerifyingKey<Bn254> {
        self.verifier.verifying_key()
    }

    pub fn verifier(&self) -> &Groth16Verifier {
        &self.verifier
    }
}

impl Prover for Groth16Backend {
    fn circuit(&self) -> CircuitKind {
        self.kind
    }

    fn prove(&self, witness: Witness) -> Result<ProofArtifact, ZkError> {
        if witness.kind() != self.kind {
            return Err(ZkError::ProofGenerationFailed(format!(
                "witness for {} given to {} prover",
                witness.kind(),
                self.kind
            )));
        }

        let public_signals = witness.public_signals();
        let circuit = witness.into_circuit(self.hasher.clone());

        // Groth16 happily proves an unsatisfied witness; the proof just fails to
        // verify. Check satisfaction up front so the caller gets a clear error.
        let cs = ConstraintSystem::<Fr>::new_ref();
        circuit
            .clone()
            .generate_constraints(cs.clone())
            .map_err(|e| ZkError::ProofGenerationFailed(format!("{e}")))?;
        let satisfied = cs
            .is_satisfied()
            .map_err(|e| ZkError::ProofGenerationFailed(format!("{e}")))?;
        if !satisfied {
            let unsatisfied = cs.which_is_unsatisfied().ok().flatten().unwrap_or_default();
            warn!(circuit = %self.kind, constraint = %unsatisfied, "witness does not satisfy circuit");
            return Err(ZkError::ProofGenerationFailed(
                "witness does not satisfy the circuit".to_string(),
            ));
        }

        let started = Instant::now();
        let mut rng = OsRng;
        let proof = Groth16::<Bn254>::create_random_proof_with_reduction(circuit, &self.pk, &mut rng)
            .map_err(|e| ZkError::ProofGenerationFailed(format!("{e}")))?;
        debug!(
            circuit = %self.kind,
            constraints = cs.num_constraints(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "proof generated"
        );

        Ok(ProofArtifact { proof: serialize_proof(&proof)?, public_signals })
    }
}

impl Verifier for Groth16Backend {
    fn verify(&self, proof: &[u8], public_signals: &[FieldElement]) -> Result<bool, ZkError> {
        self.verifier.verify(proof, public_signals)
    }
}

/// Verification-only half, built from a verifying key.
#[derive(Clone)]
pub struct Groth16Verifier {
    vk: VerifyingKey<Bn254>,
    pvk: PreparedVerifyingKey<Bn254>,
}

impl Groth16Verifier {
    pub fn new(vk: VerifyingKey<Bn254>) -> Result<Self, ZkError> {
        let pvk = Groth16::<Bn254>::process_vk(&vk)
            .map_err(|e| ZkError::MalformedProof(format!("invalid verifying key: {e}")))?;
        Ok(Self { vk, pvk })
    }

    pub fn from_bytes(vk_bytes: &[u8]) -> Result<Self, ZkError> {
        let vk = VerifyingKey::<Bn254>::deserialize_compressed(vk_bytes)
            .map_err(|e| ZkError::MalformedProof(format!("invalid verifying key: {e}")))?;
        Self::new(vk)
    }

    pub fn verifying_key(&self) -> &VerifyingKey<Bn254> {
        &self.vk
    }

    /// Number of public signals this key expects.
    pub fn num_public_inputs(&self) -> usize {
        self.vk.gamma_abc_g1.len().saturating_sub(1)
    }
}

impl Verifier for Groth16Verifier {
    fn verify(&self, proof: &[u8], public_signals: &[FieldElement]) -> Result<bool, ZkError> {
        if public_signals.len() != self.num_public_inputs() {
            return Err(ZkError::MalformedProof(format!(
                "expected {} public signals, got {}",
                self.num_public_inputs(),
                public_signals.len()
            )));
        }
        let proof = deserialize_proof(proof)?;
        let inputs: Vec<Fr> = public_signals.iter().map(|x| x.into_fr()).collect();
        Groth16::<Bn254>::verify_proof(&self.pvk, &proof, &inputs)
            .map_err(|e| ZkError::MalformedProof(format!("{e}")))
    }
}

/// Verify proof bytes against serialized verifying-key bytes.
pub fn verify_proof(vk_bytes: &[u8], proof: &[u8], public_signals: &[FieldElement]) -> Result<bool, ZkError> {
    Groth16Verifier::from_bytes(vk_bytes)?.verify(proof, public_signals)
}

pub fn serialize_pk(pk: &ProvingKey<Bn254>) -> Result<Vec<u8>, ZkError> {
    let mut out = Vec::new();
    pk.serialize_compressed(&mut out)
        .map_err(|e| ZkError::Serialization(format!("{e}")))?;
    Ok(out)
}

pub fn deserialize_pk(bytes: &[u8]) -> Result<ProvingKey<Bn254>, ZkError> {
    ProvingKey::<Bn254>::deserialize_compressed(bytes)
        .map_err(|e| ZkError::Serialization(format!("{e}")))
}

pub fn serialize_vk(vk: &VerifyingKey<Bn254>) -> Result<Vec<u8>, ZkError> {
    let mut out = Vec::new();
    vk.serialize_compressed(&mut out)
        .map_err(|e| ZkError::Serialization(format!("{e}")))?;
    Ok(out)
}

pub fn deserialize_vk(bytes: &[u8]) -> Result<VerifyingKey<Bn254>, ZkError> {
    VerifyingKey::<Bn254>::deserialize_compressed(bytes)
        .map_err(|e| ZkError::MalformedProof(format!("invalid verifying key: {e}")))
}

pub fn serialize_proof(proof: &Proof<Bn254>) -> Result<Vec<u8>, ZkError> {
    let mut out = Vec::new();
    proof
        .serialize_compressed(&mut out)
        .map_err(|e| ZkError::Serialization(format!("{e}")))?;
    Ok(out)
}

pub fn deserialize_proof(bytes: &[u8]) -> Result<Proof<Bn254>, ZkError> {
    Proof::<Bn254>::deserialize_compressed(bytes)
        .map_err(|e| ZkError::MalformedProof(format!("invalid proof: {e}")))
}
