use crate::errors::ApiError;
use crate::models::*;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use claim_proofs::circuit::CircuitKind;
use claim_proofs::commitment::{attribute_leaf, Claim, RawDigest};
use claim_proofs::constants::CIRCUIT_VERSION;
use claim_proofs::merkle::MerkleTree;
use claim_proofs::prover::Verifier;
use claim_proofs::{FieldElement, HashBackend};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/v1/claims/commitment", post(claim_commitment))
        .route("/api/v1/allowlists/root", post(allow_list_root))
        .route("/api/v1/allowlists/proof", post(allow_list_proof))
        .route("/api/v1/proofs/:circuit/generate", post(generate_proof))
        .route("/api/v1/proofs/:circuit/verify", post(verify_proof))
        .route("/api/v1/circuits/:circuit/vk", get(get_vk))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

fn parse_circuit(name: &str) -> Result<CircuitKind, ApiError> {
    Ok(name.parse::<CircuitKind>()?)
}

async fn claim_commitment(
    State(state): State<AppState>,
    body: Result<Json<CommitmentRequest>, JsonRejection>,
) -> Result<Json<CommitmentResponse>, ApiError> {
    let Json(req) = body?;
    let digest = RawDigest::from_hex(&req.document_hash)?;
    let commitment = Claim::new(req.value, &digest).commit(&state.hasher);
    Ok(Json(CommitmentResponse { commitment }))
}

/// Hash the values into leaves and build the tree off the async runtime.
async fn build_allow_list(
    hasher: Arc<HashBackend>,
    values: Vec<FieldElement>,
    depth: usize,
) -> Result<MerkleTree, ApiError> {
    tokio::task::spawn_blocking(move || {
        let leaves: Vec<FieldElement> = values.into_iter().map(|v| attribute_leaf(&hasher, v)).collect();
        MerkleTree::build(&hasher, depth, leaves)
    })
    .await
    .map_err(|_| ApiError::Internal)?
    .map_err(ApiError::from)
}

async fn allow_list_root(
    State(state): State<AppState>,
    body: Result<Json<AllowListRootRequest>, JsonRejection>,
) -> Result<Json<AllowListRootResponse>, ApiError> {
    let Json(req) = body?;
    let depth = req.depth.unwrap_or(state.settings.merkle_depth);
    let tree = build_allow_list(state.hasher.clone(), req.values, depth).await?;

    Ok(Json(AllowListRootResponse {
        root: tree.root(),
        depth: tree.depth(),
        leaf_count: tree.leaves().len(),
    }))
}

async fn allow_list_proof(
    State(state): State<AppState>,
    body: Result<Json<AllowListProofRequest>, JsonRejection>,
) -> Result<Json<AllowListProofResponse>, ApiError> {
    let Json(req) = body?;
    let depth = req.depth.unwrap_or(state.settings.merkle_depth);
    let tree = build_allow_list(state.hasher.clone(), req.values, depth).await?;
    let proof = tree.prove_membership(attribute_leaf(&state.hasher, req.target))?;

    Ok(Json(AllowListProofResponse {
        root: tree.root(),
        leaf: proof.leaf,
        siblings: proof.siblings,
        path_bits: proof.path_bits,
    }))
}

async fn generate_proof(
    State(state): State<AppState>,
    Path(circuit): Path<String>,
    body: Result<Json<GenerateProofRequest>, JsonRejection>,
) -> Result<Json<GenerateProofResponse>, ApiError> {
    let Json(req) = body?;
    let kind = parse_circuit(&circuit)?;
    let request_id = Uuid::new_v4();
    let started = Instant::now();

    let (artifact, calldata) = state
        .generate_proof(kind, req.private_inputs, req.public_inputs)
        .await
        .inspect_err(|e| tracing::warn!(%request_id, circuit = %kind, error = %e, "proof request failed"))?;

    let generation_time_ms = started.elapsed().as_millis() as u64;
    tracing::info!(%request_id, circuit = %kind, generation_time_ms, "proof request served");

    Ok(Json(GenerateProofResponse {
        request_id,
        circuit: kind.to_string(),
        proof: base64::engine::general_purpose::STANDARD.encode(&artifact.proof),
        solidity_calldata: calldata.to_solidity_args(),
        calldata: calldata.to_json(),
        public_signals: artifact.public_signals,
        generation_time_ms,
        generated_at: chrono::Utc::now(),
    }))
}

async fn verify_proof(
    State(state): State<AppState>,
    Path(circuit): Path<String>,
    body: Result<Json<VerifyProofRequest>, JsonRejection>,
) -> Result<Json<VerifyProofResponse>, ApiError> {
    let Json(req) = body?;
    let kind = parse_circuit(&circuit)?;
    let proof = base64::engine::general_purpose::STANDARD
        .decode(req.proof)
        .map_err(|_| ApiError::BadRequest("invalid proof base64".to_string()))?;

    let loaded = state.ensure_verifier(kind).await?;
    let signals = req.public_signals;
    let ok = tokio::task::spawn_blocking(move || loaded.verifier.verify(&proof, &signals))
        .await
        .map_err(|_| ApiError::Internal)??;

    Ok(Json(VerifyProofResponse { ok }))
}

async fn get_vk(
    State(state): State<AppState>,
    Path(circuit): Path<String>,
) -> Result<Json<VkResponse>, ApiError> {
    let kind = parse_circuit(&circuit)?;
    let loaded = state.ensure_verifier(kind).await?;

    Ok(Json(VkResponse {
        circuit: kind.to_string(),
        curve: "bn254".to_string(),
        proof_system: "groth16".to_string(),
        version: CIRCUIT_VERSION,
        num_public_inputs: kind.num_public_inputs(),
        vk_b64: base64::engine::general_purpose::STANDARD.encode(&loaded.vk_bytes),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::logging::LogFormat;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use claim_proofs::artifacts::ArtifactStore;
    use claim_proofs::commitment::country_allow_list;
    use claim_proofs::merkle::{verify_membership, InclusionProof};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    const DEPTH: usize = 4;

    fn test_state(dir: &std::path::Path) -> AppState {
        let settings = Settings {
            addr: "127.0.0.1:0".to_string(),
            artifact_dir: dir.to_path_buf(),
            proving_concurrency: 2,
            proof_timeout: Duration::from_secs(120),
            merkle_depth: DEPTH,
            log_format: LogFormat::Pretty,
            rejected: Vec::new(),
        };
        AppState::new(settings, HashBackend::shared().unwrap())
    }

    async fn call(state: &AppState, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(v) => Body::from(v.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        });
        (status, value)
    }

    fn field(v: &Value) -> FieldElement {
        serde_json::from_value(v.clone()).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = call(&test_state(dir.path()), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("ok".to_string()));
    }

    #[tokio::test]
    async fn commitment_matches_library() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let (status, body) = call(
            &state,
            "POST",
            "/api/v1/claims/commitment",
            Some(json!({ "value": 1000, "documentHash": "0x01" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let expected = Claim::parse("1000", "0x01").unwrap().commit(&state.hasher);
        assert_eq!(field(&body["commitment"]), expected);

        // String and numeric values commit identically.
        let (_, again) = call(
            &state,
            "POST",
            "/api/v1/claims/commitment",
            Some(json!({ "value": "1000", "documentHash": "01" })),
        )
        .await;
        assert_eq!(again["commitment"], body["commitment"]);
    }

    #[tokio::test]
    async fn commitment_rejects_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let (status, _) = call(
            &state,
            "POST",
            "/api/v1/claims/commitment",
            Some(json!({ "value": 1, "documentHash": "0xzz" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(
            &state,
            "POST",
            "/api/v1/claims/commitment",
            Some(json!({ "value": "twelve", "documentHash": "0x01" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn allow_list_root_and_membership() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let values = json!([840, 124, 484, 124]);

        let (status, body) = call(
            &state,
            "POST",
            "/api/v1/allowlists/root",
            Some(json!({ "values": values })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["depth"], json!(DEPTH));
        assert_eq!(body["leafCount"], json!(3));

        let leaves = country_allow_list(&state.hasher, &[840, 124, 484]).unwrap();
        let tree = MerkleTree::build(&state.hasher, DEPTH, leaves).unwrap();
        assert_eq!(field(&body["root"]), tree.root());

        let (status, body) = call(
            &state,
            "POST",
            "/api/v1/allowlists/proof",
            Some(json!({ "values": values, "target": 484 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let proof = InclusionProof {
            leaf: field(&body["leaf"]),
            siblings: serde_json::from_value(body["siblings"].clone()).unwrap(),
            path_bits: serde_json::from_value(body["pathBits"].clone()).unwrap(),
        };
        assert_eq!(proof.siblings.len(), DEPTH);
        assert!(verify_membership(&state.hasher, tree.root(), DEPTH, &proof));

        let (status, _) = call(
            &state,
            "POST",
            "/api/v1/allowlists/proof",
            Some(json!({ "values": values, "target": 36 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn allow_list_capacity_and_depth_errors() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let (status, _) = call(
            &state,
            "POST",
            "/api/v1/allowlists/root",
            Some(json!({ "values": [1, 2, 3], "depth": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = call(
            &state,
            "POST",
            "/api/v1/allowlists/root",
            Some(json!({ "values": [1], "depth": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_artifacts_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let (status, _) = call(&state, "GET", "/api/v1/circuits/claim_threshold/vk", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&state, "GET", "/api/v1/circuits/age_over/vk", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(
            &state,
            "POST",
            "/api/v1/proofs/claim_threshold/generate",
            Some(json!({ "privateInputs": {}, "publicInputs": {} })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    fn threshold_request(state: &AppState, value: u64, threshold: u64) -> Value {
        let claim = Claim::new(value, &RawDigest::from_hex("0x01").unwrap());
        json!({
            "privateInputs": {
                "value": claim.value,
                "document_hash": claim.document_hash.element(),
            },
            "publicInputs": {
                "commitment": claim.commit(&state.hasher),
                "threshold": threshold,
            },
        })
    }

    #[tokio::test]
    async fn threshold_proof_over_http() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        crate::setup::write_artifacts(
            &ArtifactStore::new(dir.path()),
            &state.hasher,
            DEPTH,
            false,
        )
        .unwrap();

        let (status, vk) = call(&state, "GET", "/api/v1/circuits/claim_threshold/vk", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(vk["proofSystem"], json!("groth16"));
        assert_eq!(vk["numPublicInputs"], json!(2));

        let (status, generated) = call(
            &state,
            "POST",
            "/api/v1/proofs/claim_threshold/generate",
            Some(threshold_request(&state, 25, 18)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(generated["calldata"]["inputs"].as_array().unwrap().len(), 2);
        assert_eq!(generated["publicSignals"][1], json!(FieldElement::from(18u64)));

        let (status, verified) = call(
            &state,
            "POST",
            "/api/v1/proofs/claim_threshold/verify",
            Some(json!({
                "proof": generated["proof"],
                "publicSignals": generated["publicSignals"],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(verified["ok"], json!(true));

        let (_, rejected) = call(
            &state,
            "POST",
            "/api/v1/proofs/claim_threshold/verify",
            Some(json!({
                "proof": generated["proof"],
                "publicSignals": [generated["publicSignals"][0], 17],
            })),
        )
        .await;
        assert_eq!(rejected["ok"], json!(false));

        let (status, _) = call(
            &state,
            "POST",
            "/api/v1/proofs/claim_threshold/verify",
            Some(json!({ "proof": "AAAA", "publicSignals": [1, 2] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // threshold + P reduces to the proven threshold but is not canonical.
        let (status, _) = call(
            &state,
            "POST",
            "/api/v1/proofs/claim_threshold/verify",
            Some(json!({
                "proof": generated["proof"],
                "publicSignals": [
                    generated["publicSignals"][0],
                    "21888242871839275222246405745257275088548364400416034343698204186575808495635",
                ],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // Unsatisfiable witness: value below threshold.
        let (status, _) = call(
            &state,
            "POST",
            "/api/v1/proofs/claim_threshold/generate",
            Some(threshold_request(&state, 16, 18)),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn verifying_needs_only_the_verifying_key() {
        let dir = tempfile::tempdir().unwrap();
        let prover_state = test_state(dir.path());
        crate::setup::write_artifacts(
            &ArtifactStore::new(dir.path()),
            &prover_state.hasher,
            DEPTH,
            false,
        )
        .unwrap();

        let (status, generated) = call(
            &prover_state,
            "POST",
            "/api/v1/proofs/claim_threshold/generate",
            Some(threshold_request(&prover_state, 25, 18)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        for kind in CircuitKind::ALL {
            std::fs::remove_file(dir.path().join(format!("{}.pk.bin", kind.artifact_name()))).unwrap();
        }
        let state = test_state(dir.path());

        let (status, verified) = call(
            &state,
            "POST",
            "/api/v1/proofs/claim_threshold/verify",
            Some(json!({
                "proof": generated["proof"],
                "publicSignals": generated["publicSignals"],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(verified["ok"], json!(true));

        let (status, _) = call(&state, "GET", "/api/v1/circuits/claim_threshold/vk", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(
            &state,
            "POST",
            "/api/v1/proofs/claim_threshold/generate",
            Some(threshold_request(&state, 25, 18)),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn slow_proof_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let hasher = HashBackend::shared().unwrap();
        crate::setup::write_artifacts(&ArtifactStore::new(dir.path()), &hasher, DEPTH, false).unwrap();

        let mut settings = Settings::from_lookup(|_| None);
        settings.artifact_dir = dir.path().to_path_buf();
        settings.merkle_depth = DEPTH;
        settings.proof_timeout = Duration::from_millis(1);
        let state = AppState::new(settings, hasher);

        // Load keys first so the timeout only covers proving.
        state.ensure_circuit(CircuitKind::ClaimThreshold).await.unwrap();

        let (status, _) = call(
            &state,
            "POST",
            "/api/v1/proofs/claim_threshold/generate",
            Some(threshold_request(&state, 25, 18)),
        )
        .await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    }
}
