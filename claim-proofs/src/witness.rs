//! Witness assembly.
//!
//! Callers supply named private and public inputs. Each circuit family
//! declares the names and arities it expects; anything missing, unexpected or
//! mis-shaped is rejected before any proving work starts.

use crate::circuit::{AllowListCircuit, CircuitKind, ClaimThresholdCircuit};
use crate::error::ZkError;
use crate::field::FieldElement;
use crate::hash::HashBackend;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A named circuit input: a single element or a fixed-length array.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    Scalar(FieldElement),
    Array(Vec<FieldElement>),
}

pub type CircuitInputs = BTreeMap<String, InputValue>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Private,
    Public,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    Scalar,
    Array(usize),
}

#[derive(Clone, Copy, Debug)]
pub struct InputSpec {
    pub name: &'static str,
    pub visibility: Visibility,
    pub arity: Arity,
}

/// Declared inputs of a circuit family. `depth` only matters for allow lists.
pub fn input_schema(kind: CircuitKind, depth: usize) -> Vec<InputSpec> {
    use Arity::*;
    use Visibility::*;
    fn input(name: &'static str, visibility: Visibility, arity: Arity) -> InputSpec {
        InputSpec { name, visibility, arity }
    }
    match kind {
        CircuitKind::ClaimThreshold => vec![
            input("value", Private, Scalar),
            input("document_hash", Private, Scalar),
            input("commitment", Public, Scalar),
            input("threshold", Public, Scalar),
        ],
        CircuitKind::AllowListMembership => vec![
            input("value", Private, Scalar),
            input("document_hash", Private, Scalar),
            input("siblings", Private, Array(depth)),
            input("path_bits", Private, Array(depth)),
            input("root", Public, Scalar),
            input("commitment", Public, Scalar),
        ],
    }
}

/// A shape-checked witness, ready to become a circuit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Witness {
    ClaimThreshold {
        value: FieldElement,
        document_hash: FieldElement,
        commitment: FieldElement,
        threshold: FieldElement,
    },
    AllowListMembership {
        value: FieldElement,
        document_hash: FieldElement,
        siblings: Vec<FieldElement>,
        path_bits: Vec<bool>,
        root: FieldElement,
        commitment: FieldElement,
    },
}

fn malformed(msg: String) -> ZkError {
    ZkError::ProofGenerationFailed(format!("malformed witness: {msg}"))
}

struct Inputs<'a> {
    private: &'a CircuitInputs,
    public: &'a CircuitInputs,
}

impl Inputs<'_> {
    fn source(&self, visibility: Visibility) -> &CircuitInputs {
        match visibility {
            Visibility::Private => self.private,
            Visibility::Public => self.public,
        }
    }

    fn scalar(&self, name: &str, visibility: Visibility) -> Result<FieldElement, ZkError> {
        match self.source(visibility).get(name) {
            Some(InputValue::Scalar(x)) => Ok(*x),
            Some(InputValue::Array(_)) => Err(malformed(format!("`{name}` must be a scalar"))),
            None => Err(malformed(format!("missing input `{name}`"))),
        }
    }

    fn array(&self, name: &str, visibility: Visibility, len: usize) -> Result<Vec<FieldElement>, ZkError> {
        match self.source(visibility).get(name) {
            Some(InputValue::Array(xs)) if xs.len() == len => Ok(xs.clone()),
            Some(InputValue::Array(xs)) => Err(malformed(format!(
                "`{name}` must have {len} elements (got {})",
                xs.len()
            ))),
            Some(InputValue::Scalar(_)) => Err(malformed(format!("`{name}` must be an array"))),
            None => Err(malformed(format!("missing input `{name}`"))),
        }
    }
}

impl Witness {
    /// Check shapes against the circuit's schema and build the witness.
    pub fn assemble(
        kind: CircuitKind,
        depth: usize,
        private: &CircuitInputs,
        public: &CircuitInputs,
    ) -> Result<Self, ZkError> {
        let schema = input_schema(kind, depth);
        for (inputs, visibility) in [(private, Visibility::Private), (public, Visibility::Public)] {
            for name in inputs.keys() {
                let declared = schema
                    .iter()
                    .any(|s| s.name == name.as_str() && s.visibility == visibility);
                if !declared {
                    return Err(malformed(format!("unexpected {visibility:?} input `{name}` for {kind}")));
                }
            }
        }

        let inputs = Inputs { private, public };
        use Visibility::*;
        match kind {
            CircuitKind::ClaimThreshold => Ok(Witness::ClaimThreshold {
                value: inputs.scalar("value", Private)?,
                document_hash: inputs.scalar("document_hash", Private)?,
                commitment: inputs.scalar("commitment", Public)?,
                threshold: inputs.scalar("threshold", Public)?,
            }),
            CircuitKind::AllowListMembership => {
                let path_bits = inputs
                    .array("path_bits", Private, depth)?
                    .into_iter()
                    .map(|bit| {
                        if bit.is_zero() {
                            Ok(false)
                        } else if bit == FieldElement::from(1u64) {
                            Ok(true)
                        } else {
                            Err(malformed("`path_bits` entries must be 0 or 1".to_string()))
                        }
                    })
                    .collect::<Result<Vec<bool>, ZkError>>()?;

                Ok(Witness::AllowListMembership {
                    value: inputs.scalar("value", Private)?,
                    document_hash: inputs.scalar("document_hash", Private)?,
                    siblings: inputs.array("siblings", Private, depth)?,
                    path_bits,
                    root: inputs.scalar("root", Public)?,
                    commitment: inputs.scalar("commitment", Public)?,
                })
            }
        }
    }

    /// Empty witness with the right shape, used for key generation.
    pub fn blank(kind: CircuitKind, depth: usize) -> Self {
        let zero = FieldElement::zero();
        match kind {
            CircuitKind::ClaimThreshold => Witness::ClaimThreshold {
                value: zero,
                document_hash: zero,
                commitment: zero,
                threshold: zero,
            },
            CircuitKind::AllowListMembership => Witness::AllowListMembership {
                value: zero,
                document_hash: zero,
                siblings: vec![zero; depth],
                path_bits: vec![false; depth],
                root: zero,
                commitment: zero,
            },
        }
    }

    pub fn kind(&self) -> CircuitKind {
        match self {
            Witness::ClaimThreshold { .. } => CircuitKind::ClaimThreshold,
            Witness::AllowListMembership { .. } => CircuitKind::AllowListMembership,
        }
    }

    /// Public signals in circuit allocation order.
    pub fn public_signals(&self) -> Vec<FieldElement> {
        match self {
            Witness::ClaimThreshold { commitment, threshold, .. } => vec![*commitment, *threshold],
            Witness::AllowListMembership { root, commitment, .. } => vec![*root, *commitment],
        }
    }

    pub fn into_circuit(self, backend: Arc<HashBackend>) -> CircuitInstance {
        match self {
            Witness::ClaimThreshold { value, document_hash, commitment, threshold } => {
                CircuitInstance::ClaimThreshold(ClaimThresholdCircuit {
                    backend,
                    value: value.into_fr(),
                    document_hash: document_hash.into_fr(),
                    commitment: commitment.into_fr(),
                    threshold: threshold.into_fr(),
                })
            }
            Witness::AllowListMembership { value, document_hash, siblings, path_bits, root, commitment } => {
                CircuitInstance::AllowListMembership(AllowListCircuit {
                    backend,
                    depth: siblings.len(),
                    value: value.into_fr(),
                    document_hash: document_hash.into_fr(),
                    siblings: siblings.into_iter().map(FieldElement::into_fr).collect(),
                    path_bits,
                    root: root.into_fr(),
                    commitment: commitment.into_fr(),
                })
            }
        }
    }
}

/// A concrete circuit, either family.
#[derive(Clone, Debug)]
pub enum CircuitInstance {
    ClaimThreshold(ClaimThresholdCircuit),
    AllowListMembership(AllowListCircuit),
}

impl ark_relations::r1cs::ConstraintSynthesizer<ark_bn254::Fr> for CircuitInstance {
    fn generate_constraints(
        self,
        cs: ark_relations::r1cs::ConstraintSystemRef<ark_bn254::Fr>,
    ) -> Result<(), ark_relations::r1cs::SynthesisError> {
        match self {
            CircuitInstance::ClaimThreshold(c) => c.generate_constraints(cs),
            CircuitInstance::AllowListMembership(c) => c.generate_constraints(cs),
        }
    }
}
