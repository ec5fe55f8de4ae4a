//! Poseidon hash backend.
//!
//! A `HashBackend` owns the derived Poseidon parameters. It holds no mutable
//! state, so one instance is shared (`Arc`) across every request and thread.
//! The circuits hash through the same parameters via [`crate::circuit`], which
//! keeps native commitments and in-circuit commitments identical.

use crate::constants::{poseidon_config, POSEIDON_CAPACITY, POSEIDON_RATE};
use crate::error::ZkError;
use crate::field::FieldElement;
use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::{PoseidonConfig, PoseidonSponge};
use ark_crypto_primitives::sponge::CryptographicSponge;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::{debug, info};

static SHARED: OnceLock<Result<Arc<HashBackend>, String>> = OnceLock::new();

pub struct HashBackend {
    config: PoseidonConfig<Fr>,
}

impl HashBackend {
    /// Derive the Poseidon parameters and check their shape.
    pub fn new() -> Result<Self, ZkError> {
        let started = Instant::now();
        let config = poseidon_config();

        let width = POSEIDON_RATE + POSEIDON_CAPACITY;
        if config.mds.len() != width || config.mds.iter().any(|row| row.len() != width) {
            return Err(ZkError::BackendInitFailed(format!(
                "mds matrix is not {width}x{width}"
            )));
        }
        let rounds = config.full_rounds + config.partial_rounds;
        if config.ark.len() != rounds {
            return Err(ZkError::BackendInitFailed(format!(
                "expected {rounds} round-constant rows, got {}",
                config.ark.len()
            )));
        }

        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "poseidon parameters derived");
        Ok(Self { config })
    }

    /// Process-wide instance, built on first use.
    ///
    /// Concurrent first callers block on the same initialization.
    pub fn shared() -> Result<Arc<Self>, ZkError> {
        SHARED
            .get_or_init(|| {
                info!("initializing shared hash backend");
                Self::new().map(Arc::new).map_err(|e| e.to_string())
            })
            .clone()
            .map_err(ZkError::BackendInitFailed)
    }

    /// Force initialization of the shared instance, typically at startup.
    pub fn warm_up() -> Result<Arc<Self>, ZkError> {
        let backend = Self::shared()?;
        // One hash call so the first real request pays nothing extra.
        let _ = backend.hash(&[FieldElement::zero()]);
        Ok(backend)
    }

    pub fn config(&self) -> &PoseidonConfig<Fr> {
        &self.config
    }

    /// Hash an ordered sequence of field elements.
    ///
    /// The sponge absorbs the arity first, then each input in order, and
    /// squeezes one element. `circuit::hash_gadget` mirrors this exactly.
    pub fn hash(&self, inputs: &[FieldElement]) -> FieldElement {
        let mut sponge = PoseidonSponge::<Fr>::new(&self.config);
        sponge.absorb(&Fr::from(inputs.len() as u64));
        for x in inputs {
            sponge.absorb(&x.into_fr());
        }
        FieldElement::from_fr(sponge.squeeze_field_elements::<Fr>(1)[0])
    }

    pub fn hash_pair(&self, left: FieldElement, right: FieldElement) -> FieldElement {
        self.hash(&[left, right])
    }
}

impl fmt::Debug for HashBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashBackend")
            .field("full_rounds", &self.config.full_rounds)
            .field("partial_rounds", &self.config.partial_rounds)
            .field("rate", &self.config.rate)
            .finish_non_exhaustive()
    }
}
