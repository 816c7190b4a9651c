//! Blindjack
//!
//! Mental Poker (1979) blackjack using ElGamal masking over BLS12-381.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

use bls12_381::G1Affine;
use pairing::group::Curve;

use crate::{error::EcError, group::Group, types::GroupElement};

pub const DECK_SIZE: usize = 52;

const RANK_CHARS: &[u8; 13] = b"A23456789TJQK";
const SUIT_CHARS: &[u8; 4] = b"shdc";

/// Public table of the 52 plaintext points `G * i`, i in 1..=52.
///
/// Decoding searches this closed set only. It is not a discrete log solver and must not
/// be used on anything but fully unmasked cards.
#[derive(Clone, Debug)]
pub struct CardCodec {
    cards_g1: Vec<G1Affine>,
}

impl CardCodec {
    pub fn new(group: &Group) -> Self {
        let g = group.generator();
        let mut acc = group.identity();
        let cards_g1 = (1..=DECK_SIZE)
            .map(|_| {
                acc = group.add(&acc, &g);
                acc.to_affine()
            })
            .collect();
        Self { cards_g1 }
    }

    pub fn encode(&self, i: usize) -> Result<GroupElement, EcError> {
        if !(1..=DECK_SIZE).contains(&i) {
            return Err(EcError::CardOutOfRange(i));
        }
        Ok(GroupElement::from(self.cards_g1[i - 1]))
    }

    pub fn decode(&self, p: &GroupElement) -> Result<usize, EcError> {
        let revealed_point = p.to_affine();
        let Some(card_index) = self.cards_g1.iter().position(|x| revealed_point.eq(x)) else {
            return Err(EcError::UnknownCardEncoding);
        };
        Ok(card_index + 1)
    }
}

/// Blackjack value of plaintext card `i`: aces count 11, face cards 10.
pub const fn blackjack_rank(i: usize) -> u8 {
    let r = i % 13;
    if r == 0 {
        11
    } else if r >= 10 {
        10
    } else {
        (r + 1) as u8
    }
}

/// Two character label such as `As` or `Td`.
pub fn card_label(i: usize) -> String {
    if !(1..=DECK_SIZE).contains(&i) {
        return "??".to_string();
    }
    let rank = RANK_CHARS[i % 13] as char;
    let suit = SUIT_CHARS[(i - 1) / 13] as char;
    format!("{}{}", rank, suit)
}
