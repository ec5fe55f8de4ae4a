use thiserror::Error;

/// Errors surfaced by the attestation and proof pipeline.
///
/// A false proof is not an error: verification returns `Ok(false)` for it.
#[derive(Debug, Error)]
pub enum ZkError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("merkle capacity exceeded: {leaves} leaves do not fit a depth-{depth} tree")]
    CapacityExceeded { leaves: usize, depth: usize },

    #[error("leaf not found in accumulator")]
    NotFound,

    #[error("proof generation failed: {0}")]
    ProofGenerationFailed(String),

    #[error("circuit not found: {0}")]
    CircuitNotFound(String),

    #[error("hash backend initialization failed: {0}")]
    BackendInitFailed(String),

    #[error("malformed proof material: {0}")]
    MalformedProof(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
