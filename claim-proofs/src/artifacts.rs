//! On-disk circuit artifacts.
//!
//! Layout under the artifact directory:
//!
//! ```text
//! manifest.json
//! claim_threshold.v1.pk.bin
//! claim_threshold.v1.vk.bin
//! allow_list_membership.v1.pk.bin
//! allow_list_membership.v1.vk.bin
//! ```
//!
//! Artifacts are immutable once written. A missing file or a manifest that
//! disagrees with the running configuration is a `CircuitNotFound`; nothing
//! here ever regenerates keys behind the caller's back.

use crate::circuit::CircuitKind;
use crate::constants::CIRCUIT_VERSION;
use crate::error::ZkError;
use crate::groth16::{deserialize_pk, deserialize_vk, serialize_pk, serialize_vk};
use ark_bn254::Bn254;
use ark_groth16::{ProvingKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

const MANIFEST_FILE: &str = "manifest.json";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactManifest {
    pub version: u32,
    pub curve: String,
    pub proof_system: String,
    pub merkle_depth: usize,
    pub circuits: Vec<CircuitKind>,
}

impl ArtifactManifest {
    pub fn new(merkle_depth: usize, circuits: Vec<CircuitKind>) -> Self {
        Self {
            version: CIRCUIT_VERSION,
            curve: "bn254".to_string(),
            proof_system: "groth16".to_string(),
            merkle_depth,
            circuits,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn pk_path(&self, kind: CircuitKind) -> PathBuf {
        self.dir.join(format!("{}.pk.bin", kind.artifact_name()))
    }

    fn vk_path(&self, kind: CircuitKind) -> PathBuf {
        self.dir.join(format!("{}.vk.bin", kind.artifact_name()))
    }

    /// Whether both key files for `kind` are present.
    pub fn has_artifacts(&self, kind: CircuitKind) -> bool {
        self.pk_path(kind).is_file() && self.vk_path(kind).is_file()
    }

    /// Whether either key file for `kind` is present.
    pub fn has_any_artifact(&self, kind: CircuitKind) -> bool {
        self.pk_path(kind).exists() || self.vk_path(kind).exists()
    }

    fn read(&self, path: &Path, kind: CircuitKind) -> Result<Vec<u8>, ZkError> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ZkError::CircuitNotFound(
                format!("{kind}: {} is missing", path.display()),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(
        &self,
        kind: CircuitKind,
        pk: &ProvingKey<Bn254>,
        vk: &VerifyingKey<Bn254>,
    ) -> Result<(), ZkError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.pk_path(kind), serialize_pk(pk)?)?;
        std::fs::write(self.vk_path(kind), serialize_vk(vk)?)?;
        info!(circuit = %kind, dir = %self.dir.display(), "circuit artifacts written");
        Ok(())
    }

    pub fn write_manifest(&self, manifest: &ArtifactManifest) -> Result<(), ZkError> {
        std::fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_vec_pretty(manifest)
            .map_err(|e| ZkError::Serialization(format!("{e}")))?;
        std::fs::write(self.dir.join(MANIFEST_FILE), json)?;
        Ok(())
    }

    pub fn manifest(&self) -> Result<ArtifactManifest, ZkError> {
        let path = self.dir.join(MANIFEST_FILE);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ZkError::CircuitNotFound(format!("{} is missing", path.display())));
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|e| ZkError::Serialization(format!("{e}")))
    }

    /// Check that the stored artifacts were built for this configuration.
    pub fn check_compatible(&self, kind: CircuitKind, merkle_depth: usize) -> Result<(), ZkError> {
        let manifest = self.manifest()?;
        if manifest.version != CIRCUIT_VERSION {
            return Err(ZkError::CircuitNotFound(format!(
                "artifacts are version {}, expected {CIRCUIT_VERSION}",
                manifest.version
            )));
        }
        if !manifest.circuits.contains(&kind) {
            return Err(ZkError::CircuitNotFound(format!("{kind} is not in the manifest")));
        }
        if kind == CircuitKind::AllowListMembership && manifest.merkle_depth != merkle_depth {
            return Err(ZkError::CircuitNotFound(format!(
                "{kind} artifacts are for depth {}, configured depth is {merkle_depth}",
                manifest.merkle_depth
            )));
        }
        Ok(())
    }

    pub fn load_proving_key(&self, kind: CircuitKind) -> Result<ProvingKey<Bn254>, ZkError> {
        deserialize_pk(&self.read(&self.pk_path(kind), kind)?)
    }

    pub fn load_verifying_key(&self, kind: CircuitKind) -> Result<VerifyingKey<Bn254>, ZkError> {
        deserialize_vk(&self.read(&self.vk_path(kind), kind)?)
    }

    /// Raw verifying-key bytes, as published to verifiers.
    pub fn verifying_key_bytes(&self, kind: CircuitKind) -> Result<Vec<u8>, ZkError> {
        self.read(&self.vk_path(kind), kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_artifacts_are_circuit_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(matches!(
            store.load_proving_key(CircuitKind::ClaimThreshold),
            Err(ZkError::CircuitNotFound(_))
        ));
        assert!(matches!(
            store.check_compatible(CircuitKind::ClaimThreshold, 16),
            Err(ZkError::CircuitNotFound(_))
        ));
    }

    #[test]
    fn a_lone_key_file_counts_as_present() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(!store.has_any_artifact(CircuitKind::ClaimThreshold));

        let vk = dir.path().join(format!("{}.vk.bin", CircuitKind::ClaimThreshold.artifact_name()));
        std::fs::write(&vk, b"vk").unwrap();
        assert!(store.has_any_artifact(CircuitKind::ClaimThreshold));
        assert!(!store.has_artifacts(CircuitKind::ClaimThreshold));
    }

    #[test]
    fn manifest_gates_depth_and_membership() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store
            .write_manifest(&ArtifactManifest::new(8, vec![CircuitKind::AllowListMembership]))
            .unwrap();

        assert!(store.check_compatible(CircuitKind::AllowListMembership, 8).is_ok());
        assert!(matches!(
            store.check_compatible(CircuitKind::AllowListMembership, 16),
            Err(ZkError::CircuitNotFound(_))
        ));
        assert!(matches!(
            store.check_compatible(CircuitKind::ClaimThreshold, 8),
            Err(ZkError::CircuitNotFound(_))
        ));
    }
}
