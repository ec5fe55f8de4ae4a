//! Proof pipeline orchestration.
//!
//! One request moves through
//! `WitnessAssembled -> Proving -> Proved -> (Verified | VerificationFailed)`,
//! with `ProofGenerationFailed` reachable from `Proving`. A freshly generated
//! proof is verified before it is handed out; a proof that does not verify is
//! never returned.

use crate::calldata::{export_calldata, CallData};
use crate::circuit::CircuitKind;
use crate::error::ZkError;
use crate::field::FieldElement;
use crate::prover::{ProofArtifact, Prover, Verifier};
use crate::witness::{CircuitInputs, Witness};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProofState {
    WitnessAssembled,
    Proving,
    Proved,
    Verified,
    VerificationFailed,
    ProofGenerationFailed,
}

impl ProofState {
    pub fn can_transition_to(self, next: ProofState) -> bool {
        use ProofState::*;
        matches!(
            (self, next),
            (WitnessAssembled, Proving)
                | (Proving, Proved)
                | (Proving, ProofGenerationFailed)
                | (Proved, Verified)
                | (Proved, VerificationFailed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ProofState::Verified | ProofState::VerificationFailed | ProofState::ProofGenerationFailed
        )
    }
}

/// Lifecycle tracker for a single proving request.
#[derive(Debug)]
pub struct ProofRequest {
    circuit: CircuitKind,
    state: ProofState,
}

impl ProofRequest {
    fn new(circuit: CircuitKind) -> Self {
        debug!(%circuit, state = ?ProofState::WitnessAssembled, "proof request");
        Self { circuit, state: ProofState::WitnessAssembled }
    }

    pub fn state(&self) -> ProofState {
        self.state
    }

    fn advance(&mut self, next: ProofState) -> Result<(), ZkError> {
        if !self.state.can_transition_to(next) {
            return Err(ZkError::ProofGenerationFailed(format!(
                "illegal proof state transition {:?} -> {next:?}",
                self.state
            )));
        }
        debug!(circuit = %self.circuit, from = ?self.state, to = ?next, "proof request");
        self.state = next;
        Ok(())
    }
}

/// Witness assembly, proving and verification for one circuit family.
#[derive(Clone)]
pub struct ProofPipeline {
    circuit: CircuitKind,
    depth: usize,
    prover: Arc<dyn Prover>,
    verifier: Arc<dyn Verifier>,
}

impl ProofPipeline {
    pub fn new(
        circuit: CircuitKind,
        depth: usize,
        prover: Arc<dyn Prover>,
        verifier: Arc<dyn Verifier>,
    ) -> Self {
        Self { circuit, depth, prover, verifier }
    }

    pub fn circuit(&self) -> CircuitKind {
        self.circuit
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Assemble the witness, prove it, and verify the result.
    ///
    /// Failures are reported, never retried.
    pub fn generate_proof(
        &self,
        private: &CircuitInputs,
        public: &CircuitInputs,
    ) -> Result<ProofArtifact, ZkError> {
        if self.prover.circuit() != self.circuit {
            return Err(ZkError::CircuitNotFound(format!(
                "pipeline for {} holds a {} prover",
                self.circuit,
                self.prover.circuit()
            )));
        }

        let witness = Witness::assemble(self.circuit, self.depth, private, public)?;
        let mut request = ProofRequest::new(self.circuit);

        request.advance(ProofState::Proving)?;
        let started = Instant::now();
        let artifact = match self.prover.prove(witness) {
            Ok(artifact) => artifact,
            Err(e) => {
                request.advance(ProofState::ProofGenerationFailed)?;
                warn!(circuit = %self.circuit, error = %e, "proof generation failed");
                return Err(match e {
                    ZkError::ProofGenerationFailed(_) => e,
                    other => ZkError::ProofGenerationFailed(other.to_string()),
                });
            }
        };
        request.advance(ProofState::Proved)?;

        // Fail closed: only `Ok(true)` counts as verified.
        let verified = matches!(
            self.verifier.verify(&artifact.proof, &artifact.public_signals),
            Ok(true)
        );
        if !verified {
            request.advance(ProofState::VerificationFailed)?;
            warn!(circuit = %self.circuit, "fresh proof failed verification");
            return Err(ZkError::ProofGenerationFailed(
                "generated proof did not verify".to_string(),
            ));
        }
        request.advance(ProofState::Verified)?;

        info!(
            circuit = %self.circuit,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "proof generated and verified"
        );
        Ok(artifact)
    }

    pub fn verify_proof(&self, proof: &[u8], public_signals: &[FieldElement]) -> Result<bool, ZkError> {
        self.verifier.verify(proof, public_signals)
    }

    pub fn export_calldata(&self, artifact: &ProofArtifact) -> Result<CallData, ZkError> {
        export_calldata(&artifact.proof, &artifact.public_signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::witness::InputValue;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a canned proof; counts calls so retries would be visible.
    struct CannedProver {
        calls: AtomicUsize,
        fail: bool,
    }

    impl Prover for CannedProver {
        fn circuit(&self) -> CircuitKind {
            CircuitKind::ClaimThreshold
        }

        fn prove(&self, witness: Witness) -> Result<ProofArtifact, ZkError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ZkError::ProofGenerationFailed("out of memory".to_string()));
            }
            Ok(ProofArtifact { proof: vec![0xAB; 4], public_signals: witness.public_signals() })
        }
    }

    /// Accepts exactly the canned proof bytes.
    struct CannedVerifier;

    impl Verifier for CannedVerifier {
        fn verify(&self, proof: &[u8], _public_signals: &[FieldElement]) -> Result<bool, ZkError> {
            if proof.is_empty() {
                return Err(ZkError::MalformedProof("empty proof".to_string()));
            }
            Ok(proof == [0xAB; 4])
        }
    }

    struct RejectingVerifier;

    impl Verifier for RejectingVerifier {
        fn verify(&self, _proof: &[u8], _public_signals: &[FieldElement]) -> Result<bool, ZkError> {
            Ok(false)
        }
    }

    fn inputs() -> (CircuitInputs, CircuitInputs) {
        let s = |x: u64| InputValue::Scalar(FieldElement::from(x));
        (
            CircuitInputs::from([("value".to_string(), s(30)), ("document_hash".to_string(), s(1))]),
            CircuitInputs::from([("commitment".to_string(), s(5)), ("threshold".to_string(), s(18))]),
        )
    }

    fn pipeline(prover: Arc<CannedProver>, verifier: Arc<dyn Verifier>) -> ProofPipeline {
        ProofPipeline::new(CircuitKind::ClaimThreshold, 0, prover, verifier)
    }

    #[test]
    fn happy_path_returns_verified_artifact() {
        let prover = Arc::new(CannedProver { calls: AtomicUsize::new(0), fail: false });
        let p = pipeline(prover.clone(), Arc::new(CannedVerifier));
        let (private, public) = inputs();
        let artifact = p.generate_proof(&private, &public).unwrap();
        assert_eq!(
            artifact.public_signals,
            vec![FieldElement::from(5u64), FieldElement::from(18u64)]
        );
        assert!(p.verify_proof(&artifact.proof, &artifact.public_signals).unwrap());
        assert!(!p.verify_proof(&[0xAC; 4], &artifact.public_signals).unwrap());
    }

    #[test]
    fn backend_failure_is_not_retried() {
        let prover = Arc::new(CannedProver { calls: AtomicUsize::new(0), fail: true });
        let p = pipeline(prover.clone(), Arc::new(CannedVerifier));
        let (private, public) = inputs();
        assert!(matches!(
            p.generate_proof(&private, &public),
            Err(ZkError::ProofGenerationFailed(_))
        ));
        assert_eq!(prover.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn malformed_witness_never_reaches_prover() {
        let prover = Arc::new(CannedProver { calls: AtomicUsize::new(0), fail: false });
        let p = pipeline(prover.clone(), Arc::new(CannedVerifier));
        let (mut private, public) = inputs();
        private.remove("value");
        assert!(p.generate_proof(&private, &public).is_err());
        assert_eq!(prover.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unverifiable_proof_is_withheld() {
        let prover = Arc::new(CannedProver { calls: AtomicUsize::new(0), fail: false });
        let p = pipeline(prover, Arc::new(RejectingVerifier));
        let (private, public) = inputs();
        assert!(matches!(
            p.generate_proof(&private, &public),
            Err(ZkError::ProofGenerationFailed(_))
        ));
    }

    #[test]
    fn state_machine_rejects_skips() {
        use ProofState::*;
        assert!(WitnessAssembled.can_transition_to(Proving));
        assert!(!WitnessAssembled.can_transition_to(Proved));
        assert!(!Proved.can_transition_to(ProofGenerationFailed));
        assert!(!Verified.can_transition_to(Proving));
        assert!(Verified.is_terminal() && ProofGenerationFailed.is_terminal());

        let mut request = ProofRequest::new(CircuitKind::ClaimThreshold);
        assert!(request.advance(Verified).is_err());
        assert_eq!(request.state(), WitnessAssembled);
    }
}
