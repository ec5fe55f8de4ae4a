use crate::config::Settings;
use crate::errors::ApiError;
use claim_proofs::artifacts::ArtifactStore;
use claim_proofs::calldata::CallData;
use claim_proofs::circuit::CircuitKind;
use claim_proofs::groth16::{Groth16Backend, Groth16Verifier};
use claim_proofs::pipeline::ProofPipeline;
use claim_proofs::prover::ProofArtifact;
use claim_proofs::witness::CircuitInputs;
use claim_proofs::{HashBackend, ZkError};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, Semaphore};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub hasher: Arc<HashBackend>,
    pub artifacts: ArtifactStore,
    proving_slots: Arc<Semaphore>,
    circuits: Arc<BTreeMap<CircuitKind, OnceCell<Arc<LoadedCircuit>>>>,
    verifiers: Arc<BTreeMap<CircuitKind, OnceCell<Arc<LoadedVerifier>>>>,
}

/// Proving and verifying keys for one circuit.
pub struct LoadedCircuit {
    pub pipeline: ProofPipeline,
}

/// Verifying key for one circuit. Needs only the `.vk.bin` file, so a
/// verify-only deployment can ship without proving keys.
pub struct LoadedVerifier {
    pub verifier: Groth16Verifier,
    pub vk_bytes: Vec<u8>,
}

impl AppState {
    pub fn new(settings: Settings, hasher: Arc<HashBackend>) -> Self {
        let artifacts = ArtifactStore::new(settings.artifact_dir.clone());
        let proving_slots = Arc::new(Semaphore::new(settings.proving_concurrency));
        let circuits = CircuitKind::ALL
            .into_iter()
            .map(|kind| (kind, OnceCell::new()))
            .collect();
        let verifiers = CircuitKind::ALL
            .into_iter()
            .map(|kind| (kind, OnceCell::new()))
            .collect();

        Self {
            settings: Arc::new(settings),
            hasher,
            artifacts,
            proving_slots,
            circuits: Arc::new(circuits),
            verifiers: Arc::new(verifiers),
        }
    }

    /// Load the circuit's keys on first use.
    ///
    /// Missing or mismatched artifacts are a `CircuitNotFound`; keys are never
    /// generated here. A failed load is not cached, so a later request retries
    /// once the operator has run `setup`.
    pub async fn ensure_circuit(&self, kind: CircuitKind) -> Result<Arc<LoadedCircuit>, ApiError> {
        let cell = self
            .circuits
            .get(&kind)
            .ok_or_else(|| ApiError::NotFound(format!("unknown circuit {kind}")))?;

        let artifacts = self.artifacts.clone();
        let hasher = self.hasher.clone();
        let depth = self.settings.merkle_depth;

        cell.get_or_try_init(|| async move {
            tokio::task::spawn_blocking(move || {
                artifacts.check_compatible(kind, depth)?;
                let pk = artifacts.load_proving_key(kind)?;
                let backend = Arc::new(Groth16Backend::new(kind, depth, hasher, pk)?);
                let pipeline = ProofPipeline::new(kind, depth, backend.clone(), backend);
                tracing::info!(circuit = %kind, depth, "circuit keys loaded");
                Ok::<_, ZkError>(Arc::new(LoadedCircuit { pipeline }))
            })
            .await
            .map_err(|_| ApiError::Internal)?
            .map_err(ApiError::from)
        })
        .await
        .cloned()
    }

    /// Load the circuit's verifying key on first use, without the proving key.
    pub async fn ensure_verifier(&self, kind: CircuitKind) -> Result<Arc<LoadedVerifier>, ApiError> {
        let cell = self
            .verifiers
            .get(&kind)
            .ok_or_else(|| ApiError::NotFound(format!("unknown circuit {kind}")))?;

        let artifacts = self.artifacts.clone();
        let depth = self.settings.merkle_depth;

        cell.get_or_try_init(|| async move {
            tokio::task::spawn_blocking(move || {
                artifacts.check_compatible(kind, depth)?;
                let vk_bytes = artifacts.verifying_key_bytes(kind)?;
                let verifier = Groth16Verifier::from_bytes(&vk_bytes)?;
                tracing::info!(circuit = %kind, "verifying key loaded");
                Ok::<_, ZkError>(Arc::new(LoadedVerifier { verifier, vk_bytes }))
            })
            .await
            .map_err(|_| ApiError::Internal)?
            .map_err(ApiError::from)
        })
        .await
        .cloned()
    }

    /// Prove on the blocking pool under the concurrency bound and timeout.
    ///
    /// On timeout the request is abandoned; the blocking task finishes on its
    /// own and its result is dropped.
    pub async fn generate_proof(
        &self,
        kind: CircuitKind,
        private: CircuitInputs,
        public: CircuitInputs,
    ) -> Result<(ProofArtifact, CallData), ApiError> {
        let circuit = self.ensure_circuit(kind).await?;
        let slots = self.proving_slots.clone();

        let run = async move {
            let permit = slots.acquire_owned().await.map_err(|_| ApiError::Internal)?;
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                let artifact = circuit.pipeline.generate_proof(&private, &public)?;
                let calldata = circuit.pipeline.export_calldata(&artifact)?;
                Ok::<_, ZkError>((artifact, calldata))
            })
            .await
            .map_err(|_| ApiError::Internal)?
            .map_err(ApiError::from)
        };

        match tokio::time::timeout(self.settings.proof_timeout, run).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    circuit = %kind,
                    timeout_ms = self.settings.proof_timeout.as_millis() as u64,
                    "proof generation timed out"
                );
                Err(ApiError::Timeout)
            }
        }
    }
}
