//! Blindjack
//!
//! Mental Poker (1979) blackjack using ElGamal masking over BLS12-381.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

use std::fmt;

use rand_core::{CryptoRng, RngCore};

use crate::{
    group::Group,
    types::{PublicKey, SecretKey},
    util::point_fingerprint,
};

/// Per-session key pair. A fresh one is sampled for every session and dropped with it.
#[derive(Clone)]
pub struct KeyPair {
    sk: SecretKey,
    pk: PublicKey,
}

impl KeyPair {
    pub fn generate(group: &Group, rng: &mut (impl RngCore + CryptoRng)) -> Self {
        let sk = group.random_scalar(rng);
        Self::from_secret(group, sk)
    }

    pub fn from_secret(group: &Group, sk: SecretKey) -> Self {
        Self {
            pk: make_public_key_from_signing_key(group, &sk),
            sk,
        }
    }

    pub const fn secret(&self) -> &SecretKey {
        &self.sk
    }

    pub const fn public(&self) -> &PublicKey {
        &self.pk
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("sk", &"<redacted>")
            .field("pk", &point_fingerprint(&self.pk))
            .finish()
    }
}

pub fn make_public_key_from_signing_key(group: &Group, sk: &SecretKey) -> PublicKey {
    group.mul_generator(sk)
}
