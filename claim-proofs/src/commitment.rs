//! Claim commitments.
//!
//! A claim binds a private numeric attribute to the document it was read
//! from. Its commitment is `Poseidon([value, document_hash])`, deterministic
//! and unsalted, so the same claim always commits to the same field element.
//!
//! Document digests (e.g. SHA-256) are wider than the field. Turning a
//! [`RawDigest`] into a [`DocumentHashField`] takes it modulo `P`; this
//! narrowing is lossy on purpose and is the only way to obtain the field form.

use crate::constants::MAX_COUNTRY_CODE;
use crate::error::ZkError;
use crate::field::{decode_hex_digits, FieldElement};
use crate::hash::HashBackend;
use serde::{Deserialize, Serialize};

/// A document digest exactly as supplied upstream, big-endian.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawDigest(Vec<u8>);

impl RawDigest {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Parse a hex digest, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, ZkError> {
        let s = s.trim();
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        decode_hex_digits(digits).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Reduce the digest into the field.
    pub fn reduce(&self) -> DocumentHashField {
        DocumentHashField(FieldElement::from_be_bytes_mod_order(&self.0))
    }
}

/// A document digest already reduced modulo `P`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentHashField(FieldElement);

impl DocumentHashField {
    pub fn element(&self) -> FieldElement {
        self.0
    }
}

/// A private attribute together with its document binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Claim {
    pub value: FieldElement,
    pub document_hash: DocumentHashField,
}

impl Claim {
    pub fn new(value: impl Into<FieldElement>, document_hash: &RawDigest) -> Self {
        Self {
            value: value.into(),
            document_hash: document_hash.reduce(),
        }
    }

    /// Parse the string forms supplied by the document producer.
    pub fn parse(value: &str, document_hash: &str) -> Result<Self, ZkError> {
        Ok(Self {
            value: FieldElement::parse(value)?,
            document_hash: RawDigest::from_hex(document_hash)?.reduce(),
        })
    }

    pub fn commit(&self, backend: &HashBackend) -> FieldElement {
        compute_claim_hash(backend, self.value, &self.document_hash)
    }
}

pub fn compute_claim_hash(
    backend: &HashBackend,
    value: FieldElement,
    document_hash: &DocumentHashField,
) -> FieldElement {
    backend.hash(&[value, document_hash.element()])
}

/// String-level entry point: returns the canonical hex commitment.
pub fn compute_claim_hash_hex(
    backend: &HashBackend,
    value: &str,
    document_hash: &str,
) -> Result<String, ZkError> {
    Ok(Claim::parse(value, document_hash)?.commit(backend).to_hex())
}

/// Allow-list leaf for a bare attribute value.
pub fn attribute_leaf(backend: &HashBackend, value: FieldElement) -> FieldElement {
    backend.hash(&[value])
}

/// Leaves for an allow-list of ISO 3166-1 numeric country codes.
pub fn country_allow_list(backend: &HashBackend, codes: &[u16]) -> Result<Vec<FieldElement>, ZkError> {
    codes
        .iter()
        .map(|&code| {
            if code > MAX_COUNTRY_CODE {
                return Err(ZkError::InvalidInput(format!(
                    "country code must be 0-{MAX_COUNTRY_CODE} (got {code})"
                )));
            }
            Ok(attribute_leaf(backend, FieldElement::from(code as u64)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::poseidon_config;
    use ark_bn254::Fr;
    use ark_crypto_primitives::sponge::poseidon::PoseidonSponge;
    use ark_crypto_primitives::sponge::CryptographicSponge;

    fn backend() -> HashBackend {
        HashBackend::new().unwrap()
    }

    /// Commitment for value 1000 and document hash 0x01. Changing it breaks
    /// every issued commitment and deployed verifier.
    const GOLDEN_CLAIM_1000_DOC_01: &str =
        "0x1ca8b781b5fab8255325ab405221a580cc03fc5fdfcba9d7782c50aebcccb9b7";

    #[test]
    fn golden_commitment_is_reproducible() {
        let first = compute_claim_hash_hex(&backend(), "1000", "0x01").unwrap();

        // Independent recomputation: arity, value, document hash.
        let mut sponge = PoseidonSponge::<Fr>::new(&poseidon_config());
        sponge.absorb(&Fr::from(2u64));
        sponge.absorb(&Fr::from(1000u64));
        sponge.absorb(&Fr::from(1u64));
        let expected = FieldElement::from_fr(sponge.squeeze_field_elements::<Fr>(1)[0]);

        assert_eq!(first, expected.to_hex());
        assert_eq!(first, GOLDEN_CLAIM_1000_DOC_01);
        // A fresh backend stands in for a process restart.
        assert_eq!(compute_claim_hash_hex(&backend(), "1000", "0x01").unwrap(), first);
    }

    #[test]
    fn value_changes_commitment() {
        let h = backend();
        let a = compute_claim_hash_hex(&h, "1000", "0x01").unwrap();
        let b = compute_claim_hash_hex(&h, "1001", "0x01").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn native_and_bigint_inputs_agree() {
        let h = backend();
        let digest = RawDigest::from_hex("01").unwrap();
        let native = Claim::new(1000u64, &digest).commit(&h);
        let parsed = Claim::parse("0x3e8", "0x0001").unwrap().commit(&h);
        assert_eq!(native, parsed);
    }

    #[test]
    fn sha256_width_digest_is_reduced() {
        // All-ones 256-bit digest exceeds P.
        let digest = RawDigest::from_hex(&"f".repeat(64)).unwrap();
        let reduced = digest.reduce().element();
        assert_eq!(reduced, FieldElement::from_be_bytes_mod_order(&[0xff; 32]));
        assert_ne!(reduced.to_be_bytes(), [0xff; 32]);
    }

    #[test]
    fn unparseable_inputs_are_invalid() {
        let h = backend();
        assert!(matches!(
            compute_claim_hash_hex(&h, "ten", "0x01"),
            Err(ZkError::InvalidInput(_))
        ));
        assert!(matches!(
            compute_claim_hash_hex(&h, "10", "not-hex"),
            Err(ZkError::InvalidInput(_))
        ));
    }

    #[test]
    fn out_of_range_value_is_reduced_not_rejected() {
        let h = backend();
        let p_plus_five =
            "21888242871839275222246405745257275088548364400416034343698204186575808495622";
        assert_eq!(
            compute_claim_hash_hex(&h, p_plus_five, "0x01").unwrap(),
            compute_claim_hash_hex(&h, "5", "0x01").unwrap()
        );
    }

    #[test]
    fn country_codes_are_range_checked() {
        let h = backend();
        assert_eq!(country_allow_list(&h, &[840, 124, 484]).unwrap().len(), 3);
        assert!(matches!(
            country_allow_list(&h, &[1200]),
            Err(ZkError::InvalidInput(_))
        ));
    }
}
