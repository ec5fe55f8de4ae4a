//! Crate-wide constants shared by the circuits and host-side orchestration.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::{find_poseidon_ark_and_mds, PoseidonConfig};
use ark_ff::PrimeField;

/// Version stamped into the artifact manifest.
///
/// Bump whenever a circuit's constraints or public-input order change, so
/// prover artifacts and the on-chain verifier are redeployed together.
pub const CIRCUIT_VERSION: u32 = 1;

/// Default depth of allow-list Merkle trees (65,536 leaves).
pub const DEFAULT_MERKLE_DEPTH: usize = 16;

/// Largest supported Merkle depth.
pub const MAX_MERKLE_DEPTH: usize = 32;

/// Bit width of values and thresholds in the threshold circuit.
pub const THRESHOLD_BITS: usize = 64;

/// Largest ISO 3166-1 numeric country code.
pub const MAX_COUNTRY_CODE: u16 = 999;

// Poseidon sponge configuration.
//
// Width 3 (rate 2, capacity 1) so a pair of field elements is absorbed per
// permutation. The native hasher and the in-circuit gadget both derive their
// constants from this one function.
pub const POSEIDON_RATE: usize = 2;
pub const POSEIDON_CAPACITY: usize = 1;
pub const POSEIDON_FULL_ROUNDS: usize = 8;
pub const POSEIDON_PARTIAL_ROUNDS: usize = 57;

/// Poseidon S-box exponent.
pub const POSEIDON_ALPHA: u64 = 5;

/// Deterministically derive Poseidon parameters for BN254::Fr.
///
/// Deriving the round constants and MDS matrix is the expensive part of
/// bringing up a hash backend; callers should hold on to the result.
pub fn poseidon_config() -> PoseidonConfig<Fr> {
    let prime_bits = Fr::MODULUS_BIT_SIZE as u64;

    let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
        prime_bits,
        POSEIDON_RATE,
        POSEIDON_FULL_ROUNDS as u64,
        POSEIDON_PARTIAL_ROUNDS as u64,
        0,
    );

    PoseidonConfig::new(
        POSEIDON_FULL_ROUNDS,
        POSEIDON_PARTIAL_ROUNDS,
        POSEIDON_ALPHA,
        mds,
        ark,
        POSEIDON_RATE,
        POSEIDON_CAPACITY,
    )
}
