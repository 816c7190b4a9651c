//! Blindjack
//!
//! Mental Poker (1979) blackjack using ElGamal masking over BLS12-381.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

use bjk_ec::{
    group::Group,
    types::{GroupElement, PublicKey},
};

use crate::error::ProtocolError;

/// Joint encryption key `K = sum PK_j`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AggregateKey(GroupElement);

impl AggregateKey {
    pub const fn point(&self) -> &GroupElement {
        &self.0
    }
}

pub fn register(group: &Group, public_keys: &[PublicKey]) -> Result<AggregateKey, ProtocolError> {
    if public_keys.is_empty() {
        return Err(ProtocolError::MissingPublicKeys);
    }
    let k = public_keys
        .iter()
        .fold(group.identity(), |acc, pk| group.add(&acc, pk));
    Ok(AggregateKey(k))
}

/// Seat-indexed public keys of one session.
///
/// The aggregate key is computed once, when the last seat declares, and stays frozen.
#[derive(Clone, Debug)]
pub struct KeyRegistry {
    player_keys: Vec<Option<PublicKey>>,
    frozen: Option<AggregateKey>,
}

impl KeyRegistry {
    pub fn new(num_seats: usize) -> Self {
        Self {
            player_keys: vec![None; num_seats],
            frozen: None,
        }
    }

    /// Records the key of `seat`. Returns the aggregate key when this declaration
    /// completed the set.
    pub fn declare(
        &mut self,
        group: &Group,
        seat: usize,
        pk: PublicKey,
    ) -> Result<Option<AggregateKey>, ProtocolError> {
        let Some(slot) = self.player_keys.get_mut(seat) else {
            return Err(ProtocolError::OutOfTurn(format!("no seat {}", seat)));
        };

        if let Some(existing) = slot {
            if group.equals(existing, &pk) {
                return Ok(None);
            }
            return Err(ProtocolError::AggregateKeyMismatch);
        }

        if group.is_identity(&pk) {
            return Err(ProtocolError::MalformedPoint(
                "identity is not a valid public key".into(),
            ));
        }

        *slot = Some(pk);

        if self.player_keys.iter().all(Option::is_some) {
            let aggregate = register(group, &self.public_keys())?;
            self.frozen = Some(aggregate);
            return Ok(Some(aggregate));
        }

        Ok(None)
    }

    pub fn aggregate(&self) -> Result<AggregateKey, ProtocolError> {
        self.frozen.ok_or(ProtocolError::MissingPublicKeys)
    }

    pub const fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }

    pub fn key(&self, seat: usize) -> Option<PublicKey> {
        self.player_keys.get(seat).copied().flatten()
    }

    /// Declared keys in seat order; undeclared seats are skipped.
    pub fn public_keys(&self) -> Vec<PublicKey> {
        self.player_keys.iter().flatten().copied().collect()
    }

    /// A hand-off must carry exactly the frozen key set, in seat order.
    pub fn ensure_matches(&self, group: &Group, keys: &[PublicKey]) -> Result<(), ProtocolError> {
        let frozen = self.aggregate()?;
        let declared = self.public_keys();
        if declared.len() != keys.len()
            || declared.iter().zip(keys).any(|(a, b)| !group.equals(a, b))
            || register(group, keys)? != frozen
        {
            return Err(ProtocolError::AggregateKeyMismatch);
        }
        Ok(())
    }
}
