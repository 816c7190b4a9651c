//! Blindjack
//!
//! Mental Poker (1979) blackjack using ElGamal masking over BLS12-381.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

//! Chaum-Pedersen proof of equality of discrete logarithms, made non-interactive with
//! the Fiat-Shamir transform over Keccak-256.
//!
//! Statement: public `(g, h, a, b)` with `a = g * x` and `b = h * x`. The prover shows it
//! knows `x` without revealing it. Used to bind unmask shares to declared public keys,
//! to prove ownership of a declared key, and to prove a card was re-masked in place.

use alloy_primitives::Keccak256;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::{
    error::EcError,
    group::Group,
    types::{GroupElement, Scalar},
    util::{
        PointHex, decode_point, encode_point, point_to_uncompressed, scalar_from_digest,
        scalar_from_hex, scalar_to_hex,
    },
};

const DLEQ_DOMAIN: &[u8] = b"BJK_DLEQ_KECCAK-256_V1";

/// Public part of a discrete-log equality claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DleqStatement {
    pub g: GroupElement,
    pub h: GroupElement,
    /// `g * x`
    pub a: GroupElement,
    /// `h * x`
    pub b: GroupElement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SigmaProof {
    /// `g * k`
    pub i: GroupElement,
    /// `h * k`
    pub j: GroupElement,
    /// `x * c + k`
    pub response: Scalar,
    pub challenge: Scalar,
}

impl DleqStatement {
    pub const fn new(g: GroupElement, h: GroupElement, a: GroupElement, b: GroupElement) -> Self {
        Self { g, h, a, b }
    }

    /// Knowledge of the secret key behind `pk`, i.e. `g = h = G`.
    pub fn key_ownership(group: &Group, pk: GroupElement) -> Self {
        Self::new(group.generator(), group.generator(), pk, pk)
    }

    /// The transcript hash. Computed by the verifier from public data only.
    /// It covers the commitments `i` and `j`, so proofs do not interoperate with a prover
    /// that hashes only `A`, `g`, `h` and `B`.
    pub fn challenge(&self, i: &GroupElement, j: &GroupElement) -> Scalar {
        let mut hasher = Keccak256::new();
        hasher.update(DLEQ_DOMAIN);
        for p in [&self.a, &self.g, &self.h, &self.b, i, j] {
            hasher.update(point_to_uncompressed(p));
        }
        let digest: [u8; 32] = hasher.finalize().into();
        scalar_from_digest(&digest)
    }
}

pub fn prove(
    group: &Group,
    statement: &DleqStatement,
    x: &Scalar,
    rng: &mut (impl RngCore + CryptoRng),
) -> SigmaProof {
    let k = group.random_scalar(rng);
    let i = group.scalar_mul(&statement.g, &k);
    let j = group.scalar_mul(&statement.h, &k);
    let challenge = statement.challenge(&i, &j);
    let response = x * challenge + k;
    SigmaProof {
        i,
        j,
        response,
        challenge,
    }
}

/// Never trusts the challenge carried in the proof: it must equal the locally recomputed
/// transcript hash, and both verification equations must hold under that value.
pub fn verify(group: &Group, statement: &DleqStatement, proof: &SigmaProof) -> bool {
    let c = statement.challenge(&proof.i, &proof.j);
    if proof.challenge != c {
        return false;
    }

    // g^s == I + A*c
    let lhs_g = group.scalar_mul(&statement.g, &proof.response);
    let rhs_g = group.add(&proof.i, &group.scalar_mul(&statement.a, &c));

    // h^s == J + B*c
    let lhs_h = group.scalar_mul(&statement.h, &proof.response);
    let rhs_h = group.add(&proof.j, &group.scalar_mul(&statement.b, &c));

    group.equals(&lhs_g, &rhs_g) && group.equals(&lhs_h, &rhs_h)
}

/// Wire form of a [`SigmaProof`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigmaProofHex {
    #[serde(rename = "I")]
    pub i: PointHex,
    #[serde(rename = "J")]
    pub j: PointHex,
    pub response: String,
    pub challenge: String,
}

impl From<&SigmaProof> for SigmaProofHex {
    fn from(proof: &SigmaProof) -> Self {
        Self {
            i: encode_point(&proof.i),
            j: encode_point(&proof.j),
            response: scalar_to_hex(&proof.response),
            challenge: scalar_to_hex(&proof.challenge),
        }
    }
}

impl TryFrom<&SigmaProofHex> for SigmaProof {
    type Error = EcError;

    fn try_from(proof: &SigmaProofHex) -> Result<Self, Self::Error> {
        Ok(Self {
            i: decode_point(&proof.i)?,
            j: decode_point(&proof.j)?,
            response: scalar_from_hex(&proof.response)?,
            challenge: scalar_from_hex(&proof.challenge)?,
        })
    }
}
