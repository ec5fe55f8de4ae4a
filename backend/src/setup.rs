//! Circuit-specific trusted setup, run by the `setup` subcommand.
//!
//! Uses a single-party setup from `OsRng`. Production deployments should
//! replace the proving/verifying keys with the output of an MPC ceremony.

use claim_proofs::artifacts::{ArtifactManifest, ArtifactStore};
use claim_proofs::circuit::CircuitKind;
use claim_proofs::groth16::setup_circuit;
use claim_proofs::{HashBackend, ZkError};
use rand::rngs::OsRng;
use std::sync::Arc;

/// Generate and store keys for every circuit family at `depth`.
///
/// Existing artifacts are immutable: unless `force` is set, finding any key
/// file already present, even half of a pair, aborts before anything is
/// written.
pub fn write_artifacts(
    store: &ArtifactStore,
    hasher: &Arc<HashBackend>,
    depth: usize,
    force: bool,
) -> Result<ArtifactManifest, ZkError> {
    if !force {
        if let Some(kind) = CircuitKind::ALL.into_iter().find(|k| store.has_any_artifact(*k)) {
            return Err(ZkError::InvalidInput(format!(
                "{kind} artifacts already exist in {}; pass --force to replace them",
                store.dir().display()
            )));
        }
    }

    for kind in CircuitKind::ALL {
        let (pk, vk) = setup_circuit(hasher, kind, depth, &mut OsRng)?;
        store.save(kind, &pk, &vk)?;
    }

    let manifest = ArtifactManifest::new(depth, CircuitKind::ALL.to_vec());
    store.write_manifest(&manifest)?;
    tracing::info!(depth, dir = %store.dir().display(), "artifact manifest written");
    Ok(manifest)
}
