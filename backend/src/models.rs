use chrono::{DateTime, Utc};
use claim_proofs::calldata::CallDataJson;
use claim_proofs::witness::CircuitInputs;
use claim_proofs::FieldElement;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentRequest {
    /// Attribute value: a JSON integer, a decimal string or a `0x` hex string.
    pub value: FieldElement,

    /// Hex digest of the source document (any width; reduced into the field).
    pub document_hash: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentResponse {
    pub commitment: FieldElement,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowListRootRequest {
    pub values: Vec<FieldElement>,

    /// Defaults to the configured Merkle depth.
    pub depth: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowListRootResponse {
    pub root: FieldElement,
    pub depth: usize,
    pub leaf_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowListProofRequest {
    pub values: Vec<FieldElement>,
    pub target: FieldElement,
    pub depth: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowListProofResponse {
    pub root: FieldElement,
    pub leaf: FieldElement,
    pub siblings: Vec<FieldElement>,
    pub path_bits: Vec<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateProofRequest {
    pub private_inputs: CircuitInputs,
    pub public_inputs: CircuitInputs,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateProofResponse {
    pub request_id: Uuid,
    pub circuit: String,

    /// Base64 of the compressed Groth16 proof.
    pub proof: String,
    pub public_signals: Vec<FieldElement>,
    pub calldata: CallDataJson,

    /// `verifyProof` arguments as accepted by Solidity tooling.
    pub solidity_calldata: String,
    pub generation_time_ms: u64,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyProofRequest {
    pub proof: String,
    /// Must be canonical residues; `x + P` is rejected rather than reduced.
    #[serde(deserialize_with = "claim_proofs::field::deserialize_canonical_vec")]
    pub public_signals: Vec<FieldElement>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyProofResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VkResponse {
    pub circuit: String,
    pub curve: String,
    pub proof_system: String,
    pub version: u32,
    pub num_public_inputs: usize,
    pub vk_b64: String,
}
