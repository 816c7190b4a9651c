//! Blindjack
//!
//! Mental Poker (1979) blackjack using ElGamal masking over BLS12-381.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

use std::collections::HashSet;

use bjk_ec::card_codec::DECK_SIZE;
use rand::Rng;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::{
    deck::{Card, Deck},
    error::ProtocolError,
};

/// Input document of the shuffle proof.
///
/// `shuffled_deck[i] == original_deck[permutation[i]]`, where `original_deck` is the
/// deck as it was immediately before the shuffle that produced this record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessRecord {
    pub original_deck: Vec<String>,
    pub shuffled_deck: Vec<String>,
    pub permutation: Vec<usize>,
}

/// The part of a witness the verifier sees.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicInputs {
    pub original_deck: Vec<String>,
    pub shuffled_deck: Vec<String>,
}

impl WitnessRecord {
    /// Record of the trivial shuffle of `cards`.
    pub fn identity(cards: &[Card]) -> Self {
        let encoded: Vec<String> = cards.iter().map(Card::fingerprint).collect();
        Self {
            original_deck: encoded.clone(),
            shuffled_deck: encoded,
            permutation: (0..cards.len()).collect(),
        }
    }

    pub fn public_inputs(&self) -> PublicInputs {
        PublicInputs {
            original_deck: self.original_deck.clone(),
            shuffled_deck: self.shuffled_deck.clone(),
        }
    }

    /// Copy without the permutation, for transmission to the counterparty.
    pub fn redacted(&self) -> Self {
        Self {
            permutation: vec![],
            ..self.clone()
        }
    }

    /// Length and bijection checks, then the mapping invariant.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        self.validate_shape()?;
        if self.permutation.len() != DECK_SIZE {
            return Err(ProtocolError::InvalidPermutationWitness(format!(
                "permutation has {} entries",
                self.permutation.len()
            )));
        }

        let mut used_before_indices = HashSet::new();
        for &before in &self.permutation {
            if before >= DECK_SIZE {
                return Err(ProtocolError::InvalidPermutationWitness(format!(
                    "index {} out of bounds",
                    before
                )));
            }
            if !used_before_indices.insert(before) {
                return Err(ProtocolError::InvalidPermutationWitness(format!(
                    "index {} used twice",
                    before
                )));
            }
        }

        for (after, &before) in self.permutation.iter().enumerate() {
            if self.shuffled_deck[after] != self.original_deck[before] {
                return Err(ProtocolError::InvalidPermutationWitness(format!(
                    "position {} does not hold original card {}",
                    after, before
                )));
            }
        }

        Ok(())
    }

    /// Checks only what a redacted record can show: both decks are complete.
    pub fn validate_shape(&self) -> Result<(), ProtocolError> {
        if self.original_deck.len() != DECK_SIZE || self.shuffled_deck.len() != DECK_SIZE {
            return Err(ProtocolError::InvalidPermutationWitness(format!(
                "expected {} cards, got {} original and {} shuffled",
                DECK_SIZE,
                self.original_deck.len(),
                self.shuffled_deck.len()
            )));
        }
        Ok(())
    }
}

impl Deck {
    /// Fisher-Yates shuffle. The same swaps are applied to an index array, so the
    /// permutation is known without searching for cards afterwards.
    pub fn shuffle(&mut self, rng: &mut (impl RngCore + CryptoRng)) -> &WitnessRecord {
        let before: Vec<String> = self.cards().iter().map(Card::fingerprint).collect();
        let mut permutation: Vec<usize> = (0..self.cards().len()).collect();

        let cards = self.cards_mut();
        for i in (1..cards.len()).rev() {
            let j = rng.gen_range(0..=i);
            cards.swap(i, j);
            permutation.swap(i, j);
        }

        let after: Vec<String> = self.cards().iter().map(Card::fingerprint).collect();
        self.set_witness(WitnessRecord {
            original_deck: before,
            shuffled_deck: after,
            permutation,
        });
        self.witness()
    }
}
