//! Blindjack
//!
//! Mental Poker (1979) blackjack using ElGamal masking over BLS12-381.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

use bls12_381::G1Projective;

pub type Scalar = bls12_381::Scalar;
pub type GroupElement = G1Projective;
pub type SecretKey = Scalar;
pub type PublicKey = GroupElement;

/// Partial decryption `A * sk` contributed by one participant for one card.
pub type UnmaskShare = GroupElement;
