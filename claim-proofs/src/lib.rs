//! Claim attestation and zero-knowledge proof pipeline.
//!
//! This crate contains:
//! - Canonical BN254 field elements and the shared Poseidon hash backend.
//! - Claim commitments and the Merkle allow-list accumulator.
//! - R1CS circuits for threshold and allow-list predicates over committed claims.
//! - Groth16 proving/verification behind the `Prover`/`Verifier` traits, artifact
//!   storage, and calldata export for on-chain verifiers.

pub mod artifacts;
pub mod calldata;
pub mod circuit;
pub mod commitment;
pub mod constants;
pub mod error;
pub mod field;
pub mod groth16;
pub mod hash;
pub mod merkle;
pub mod pipeline;
pub mod prover;
pub mod witness;

pub use error::ZkError;
pub use field::FieldElement;
pub use hash::HashBackend;
