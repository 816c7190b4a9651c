//! Blindjack
//!
//! Mental Poker (1979) blackjack using ElGamal masking over BLS12-381.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

/// Group & Scalar Field context
use ff::Field;
use rand_core::{CryptoRng, RngCore};

use crate::types::{GroupElement, Scalar};

/// Curve parameters every operation is evaluated against.
///
/// Both sides of a session must hold the same context; nothing here is mutable once
/// constructed, so a single value can be shared between any number of sessions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Group {
    generator: GroupElement,
}

impl Default for Group {
    fn default() -> Self {
        Self::bls12_381()
    }
}

impl Group {
    /// BLS12-381 G1 with its standard generator.
    pub fn bls12_381() -> Self {
        Self {
            generator: GroupElement::generator(),
        }
    }

    pub const fn generator(&self) -> GroupElement {
        self.generator
    }

    pub fn identity(&self) -> GroupElement {
        GroupElement::identity()
    }

    pub fn add(&self, p: &GroupElement, q: &GroupElement) -> GroupElement {
        p + q
    }

    pub fn negate(&self, p: &GroupElement) -> GroupElement {
        -p
    }

    pub fn scalar_mul(&self, p: &GroupElement, s: &Scalar) -> GroupElement {
        p * s
    }

    pub fn mul_generator(&self, s: &Scalar) -> GroupElement {
        self.generator * s
    }

    pub fn equals(&self, p: &GroupElement, q: &GroupElement) -> bool {
        p.eq(q)
    }

    pub fn is_identity(&self, p: &GroupElement) -> bool {
        p.is_identity().into()
    }

    /// Uniform scalar from [1, q-1].
    pub fn random_scalar(&self, rng: &mut (impl RngCore + CryptoRng)) -> Scalar {
        loop {
            let s = Scalar::random(&mut *rng);
            if !bool::from(s.is_zero()) {
                return s;
            }
        }
    }
}
