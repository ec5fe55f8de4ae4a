//! Canonical field elements over the BN254 scalar field.
//!
//! Every constructor reduces modulo `P`, so a `FieldElement` can never hold an
//! out-of-range integer. The canonical text form is `0x` followed by 64
//! lowercase, zero-padded, big-endian hex digits.

use crate::error::ZkError;
use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField, Zero};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Byte width of a canonical big-endian encoding.
pub const FIELD_BYTES: usize = 32;

/// Decimal form of the field modulus `P`.
pub const MODULUS_DECIMAL: &str =
    "21888242871839275222246405745257275088548364400416034343698204186575808495617";

const MODULUS_HEX_DIGITS: &str = "30644e72e131a029b85045b68181585d2833e84879b9709143e1f593f0000001";

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FieldElement(Fr);

impl FieldElement {
    pub fn zero() -> Self {
        Self(Fr::zero())
    }

    pub fn from_fr(x: Fr) -> Self {
        Self(x)
    }

    pub fn into_fr(self) -> Fr {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Reduce a big-endian byte string of any length modulo `P`.
    pub fn from_be_bytes_mod_order(bytes: &[u8]) -> Self {
        Self(Fr::from_be_bytes_mod_order(bytes))
    }

    /// Parse an integer string and reduce it modulo `P`.
    ///
    /// Accepts signed decimal (`"1000"`, `"-1"`) and `0x`-prefixed hex of any
    /// length. Out-of-range values are reduced, never rejected.
    pub fn parse(s: &str) -> Result<Self, ZkError> {
        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let magnitude = if let Some(hex_digits) = digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
        {
            Self::from_be_bytes_mod_order(&decode_hex_digits(hex_digits)?)
        } else {
            parse_decimal(digits)?
        };

        Ok(if negative { -magnitude } else { magnitude })
    }

    /// Parse an integer string that must already be a canonical residue.
    ///
    /// Same syntax as [`FieldElement::parse`], but a negative value or one at
    /// or above `P` is an `InvalidInput` instead of being reduced. Verifiers
    /// use this so that `x` and `x + P` are not both accepted as a signal.
    pub fn parse_canonical(s: &str) -> Result<Self, ZkError> {
        let value = Self::parse(s)?;
        let s = s.trim();
        if s.starts_with('-') {
            return Err(ZkError::InvalidInput(format!("negative field element: {s}")));
        }
        let in_range = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex_digits) => below_modulus(&hex_digits.to_ascii_lowercase(), MODULUS_HEX_DIGITS),
            None => below_modulus(s, MODULUS_DECIMAL),
        };
        if !in_range {
            return Err(ZkError::InvalidInput(format!("{s} is not below the field modulus")));
        }
        Ok(value)
    }

    /// Canonical 32-byte big-endian encoding.
    pub fn to_be_bytes(&self) -> [u8; FIELD_BYTES] {
        let mut out = [0u8; FIELD_BYTES];
        let bytes = self.0.into_bigint().to_bytes_be();
        out[FIELD_BYTES - bytes.len()..].copy_from_slice(&bytes);
        out
    }

    /// Canonical `0x`-prefixed, zero-padded hex form.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_be_bytes()))
    }

    /// Decimal form, as used by snarkjs-style public signal arrays.
    pub fn to_decimal(&self) -> String {
        self.0.into_bigint().to_string()
    }
}

/// Decode hex digits, tolerating an odd digit count.
pub(crate) fn decode_hex_digits(digits: &str) -> Result<Vec<u8>, ZkError> {
    if digits.is_empty() {
        return Err(ZkError::InvalidInput("empty hex string".to_string()));
    }
    let padded;
    let digits = if digits.len() % 2 == 1 {
        padded = format!("0{digits}");
        padded.as_str()
    } else {
        digits
    };
    hex::decode(digits).map_err(|e| ZkError::InvalidInput(format!("invalid hex: {e}")))
}

/// Compare validated digit strings of the same radix by magnitude.
fn below_modulus(digits: &str, modulus: &str) -> bool {
    let digits = digits.trim_start_matches('0');
    match digits.len().cmp(&modulus.len()) {
        std::cmp::Ordering::Less => true,
        std::cmp::Ordering::Greater => false,
        std::cmp::Ordering::Equal => digits < modulus,
    }
}

fn parse_decimal(digits: &str) -> Result<FieldElement, ZkError> {
    if digits.is_empty() {
        return Err(ZkError::InvalidInput("empty integer string".to_string()));
    }
    let ten = Fr::from(10u64);
    let mut acc = Fr::zero();
    for c in digits.chars() {
        let d = c
            .to_digit(10)
            .ok_or_else(|| ZkError::InvalidInput(format!("not an integer: {digits:?}")))?;
        acc = acc * ten + Fr::from(d as u64);
    }
    Ok(FieldElement(acc))
}

impl std::ops::Neg for FieldElement {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl From<Fr> for FieldElement {
    fn from(x: Fr) -> Self {
        Self(x)
    }
}

impl From<FieldElement> for Fr {
    fn from(x: FieldElement) -> Self {
        x.0
    }
}

impl From<u64> for FieldElement {
    fn from(x: u64) -> Self {
        Self(Fr::from(x))
    }
}

impl From<u128> for FieldElement {
    fn from(x: u128) -> Self {
        Self(Fr::from(x))
    }
}

impl From<i64> for FieldElement {
    fn from(x: i64) -> Self {
        let magnitude = Self(Fr::from(x.unsigned_abs()));
        if x < 0 { -magnitude } else { magnitude }
    }
}

impl From<bool> for FieldElement {
    fn from(x: bool) -> Self {
        Self::from(x as u64)
    }
}

impl FromStr for FieldElement {
    type Err = ZkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldElement({})", self.to_hex())
    }
}

impl Serialize for FieldElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldVisitor;

        impl Visitor<'_> for FieldVisitor {
            type Value = FieldElement;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an integer or an integer string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<FieldElement, E> {
                Ok(FieldElement::from(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<FieldElement, E> {
                Ok(FieldElement::from(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<FieldElement, E> {
                FieldElement::parse(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(FieldVisitor)
    }
}

/// Deserialize a list of field elements, rejecting any non-canonical entry.
///
/// For use with `#[serde(deserialize_with = ...)]` on inputs that are checked
/// against a proof, where the reduced and unreduced forms must not alias.
pub fn deserialize_canonical_vec<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<FieldElement>, D::Error> {
    struct Canonical(FieldElement);

    impl<'de> Deserialize<'de> for Canonical {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            struct CanonicalVisitor;

            impl Visitor<'_> for CanonicalVisitor {
                type Value = Canonical;

                fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str("a non-negative integer below the field modulus")
                }

                fn visit_u64<E: de::Error>(self, v: u64) -> Result<Canonical, E> {
                    Ok(Canonical(FieldElement::from(v)))
                }

                fn visit_i64<E: de::Error>(self, v: i64) -> Result<Canonical, E> {
                    u64::try_from(v)
                        .map(|v| Canonical(FieldElement::from(v)))
                        .map_err(|_| E::custom(format!("negative field element: {v}")))
                }

                fn visit_str<E: de::Error>(self, v: &str) -> Result<Canonical, E> {
                    FieldElement::parse_canonical(v).map(Canonical).map_err(E::custom)
                }
            }

            deserializer.deserialize_any(CanonicalVisitor)
        }
    }

    let items = Vec::<Canonical>::deserialize(deserializer)?;
    Ok(items.into_iter().map(|c| c.0).collect())
}
