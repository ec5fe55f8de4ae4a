//! Calldata for Solidity Groth16 verifiers.
//!
//! Targets the usual generated verifier interface:
//!
//! ```text
//! function verifyProof(uint[2] a, uint[2][2] b, uint[2] c, uint[N] input)
//! ```
//!
//! All arguments are static, so the ABI encoding is the words in order, each a
//! 32-byte big-endian integer. The EVM pairing precompile wants G2
//! coordinates with the imaginary coefficient first, hence `[c1, c0]` in `b`.
//! The point at infinity encodes as `(0, 0)`.

use crate::error::ZkError;
use crate::field::FieldElement;
use crate::groth16::deserialize_proof;
use ark_bn254::{Fq, Fq2, G1Affine, G2Affine};
use ark_ff::{BigInteger, PrimeField};
use serde::{Deserialize, Serialize};

pub type Word = [u8; 32];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallData {
    pub a: [Word; 2],
    pub b: [[Word; 2]; 2],
    pub c: [Word; 2],
    pub inputs: Vec<Word>,
}

fn fq_word(x: &Fq) -> Word {
    let mut out = [0u8; 32];
    let bytes = x.into_bigint().to_bytes_be();
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}

fn fq2_words(x: &Fq2) -> [Word; 2] {
    [fq_word(&x.c1), fq_word(&x.c0)]
}

fn g1_words(p: &G1Affine) -> [Word; 2] {
    if p.infinity {
        return [[0u8; 32]; 2];
    }
    [fq_word(&p.x), fq_word(&p.y)]
}

fn g2_words(p: &G2Affine) -> [[Word; 2]; 2] {
    if p.infinity {
        return [[[0u8; 32]; 2]; 2];
    }
    [fq2_words(&p.x), fq2_words(&p.y)]
}

fn word_hex(w: &Word) -> String {
    format!("0x{}", hex::encode(w))
}

/// Encode proof bytes and public signals for the on-chain verifier.
pub fn export_calldata(proof: &[u8], public_signals: &[FieldElement]) -> Result<CallData, ZkError> {
    let proof = deserialize_proof(proof)?;
    Ok(CallData {
        a: g1_words(&proof.a),
        b: g2_words(&proof.b),
        c: g1_words(&proof.c),
        inputs: public_signals.iter().map(FieldElement::to_be_bytes).collect(),
    })
}

impl CallData {
    /// ABI argument encoding, without a function selector.
    pub fn to_abi_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32 * (8 + self.inputs.len()));
        for w in self
            .a
            .iter()
            .chain(self.b.iter().flatten())
            .chain(self.c.iter())
            .chain(self.inputs.iter())
        {
            out.extend_from_slice(w);
        }
        out
    }

    /// Text form accepted by Solidity tooling: `[a],[[b0],[b1]],[c],[inputs]`.
    pub fn to_solidity_args(&self) -> String {
        let list = |ws: &[Word]| {
            ws.iter()
                .map(|w| format!("\"{}\"", word_hex(w)))
                .collect::<Vec<_>>()
                .join(",")
        };
        format!(
            "[{}],[[{}],[{}]],[{}],[{}]",
            list(&self.a[..]),
            list(&self.b[0][..]),
            list(&self.b[1][..]),
            list(&self.c[..]),
            list(&self.inputs[..])
        )
    }

    pub fn to_json(&self) -> CallDataJson {
        let hexes = |ws: &[Word]| ws.iter().map(word_hex).collect::<Vec<_>>();
        CallDataJson {
            a: hexes(&self.a[..]),
            b: self.b.iter().map(|pair| hexes(&pair[..])).collect(),
            c: hexes(&self.c[..]),
            inputs: hexes(&self.inputs[..]),
        }
    }
}

/// Hex-string view of [`CallData`] for JSON transport.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallDataJson {
    pub a: Vec<String>,
    pub b: Vec<Vec<String>>,
    pub c: Vec<String>,
    pub inputs: Vec<String>,
}
