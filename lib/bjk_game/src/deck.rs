//! Blindjack
//!
//! Mental Poker (1979) blackjack using ElGamal masking over BLS12-381.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

use alloy_primitives::Keccak256;
use bjk_ec::{
    card_codec::{CardCodec, DECK_SIZE},
    group::Group,
    sigma::{self, DleqStatement, SigmaProof},
    types::{GroupElement, PublicKey, Scalar, SecretKey, UnmaskShare},
    util::{
        POINT_UNCOMPRESSED_LEN, PointHex, decode_point, encode_point, point_from_uncompressed,
        point_to_uncompressed,
    },
};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::{aggregate::AggregateKey, error::ProtocolError, shuffle::WitnessRecord};

/// ElGamal ciphertext `(A, B)` of one card.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Card {
    pub a: GroupElement,
    pub b: GroupElement,
}

impl Card {
    /// Unmasked card for plaintext `i`: `(identity, G * i)`.
    pub fn fresh(group: &Group, codec: &CardCodec, i: usize) -> Result<Self, ProtocolError> {
        Ok(Self {
            a: group.identity(),
            b: codec.encode(i)?,
        })
    }

    /// Re-randomizes with factor `r`: `A + r*G`, `B + r*K`. The plaintext is unchanged.
    pub fn mask(&self, group: &Group, key: &AggregateKey, r: &Scalar) -> Self {
        Self {
            a: group.add(&self.a, &group.mul_generator(r)),
            b: group.add(&self.b, &group.scalar_mul(key.point(), r)),
        }
    }

    pub fn partial_decrypt(&self, group: &Group, sk: &SecretKey) -> UnmaskShare {
        group.scalar_mul(&self.a, sk)
    }

    /// `B - sum(shares)`, decoded against the 52 plaintexts.
    ///
    /// Every participant that contributed to the aggregate key must be represented in
    /// `shares`, otherwise the result is not a card.
    pub fn unmask(
        &self,
        group: &Group,
        codec: &CardCodec,
        shares: &[UnmaskShare],
    ) -> Result<usize, ProtocolError> {
        let u = shares
            .iter()
            .fold(group.identity(), |acc, share| group.add(&acc, share));
        let plaintext = group.add(&self.b, &group.negate(&u));
        Ok(codec.decode(&plaintext)?)
    }

    /// Statement proving `self` was obtained from `before` by [`Card::mask`] under `key`.
    pub fn masking_statement(&self, before: &Card, group: &Group, key: &AggregateKey) -> DleqStatement {
        DleqStatement::new(
            group.generator(),
            *key.point(),
            group.add(&self.a, &group.negate(&before.a)),
            group.add(&self.b, &group.negate(&before.b)),
        )
    }

    /// Statement binding an unmask share of this card to the owner's public key.
    pub fn share_statement(&self, group: &Group, pk: &PublicKey, share: &UnmaskShare) -> DleqStatement {
        DleqStatement::new(group.generator(), self.a, *pk, *share)
    }

    pub fn to_bytes(&self) -> [u8; 2 * POINT_UNCOMPRESSED_LEN] {
        let mut out = [0u8; 2 * POINT_UNCOMPRESSED_LEN];
        out[..POINT_UNCOMPRESSED_LEN].copy_from_slice(&point_to_uncompressed(&self.a));
        out[POINT_UNCOMPRESSED_LEN..].copy_from_slice(&point_to_uncompressed(&self.b));
        out
    }

    /// Coordinate encoding used in witness records: hex of `A.x || A.y || B.x || B.y`.
    pub fn fingerprint(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn from_fingerprint(data: &str) -> Result<Self, ProtocolError> {
        if data.len() != 4 * POINT_UNCOMPRESSED_LEN {
            return Err(ProtocolError::MalformedPoint(format!(
                "card encoding must be {} hex characters",
                4 * POINT_UNCOMPRESSED_LEN
            )));
        }
        let bytes = hex::decode(data).map_err(|e| ProtocolError::MalformedPoint(e.to_string()))?;
        let card = Self {
            a: point_from_uncompressed(&bytes[..POINT_UNCOMPRESSED_LEN])?,
            b: point_from_uncompressed(&bytes[POINT_UNCOMPRESSED_LEN..])?,
        };
        if card.fingerprint() != data {
            return Err(ProtocolError::MalformedPoint("non-canonical card encoding".into()));
        }
        Ok(card)
    }
}

/// Wire form of a [`Card`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardHex {
    #[serde(rename = "A")]
    pub a: PointHex,
    #[serde(rename = "B")]
    pub b: PointHex,
}

impl From<&Card> for CardHex {
    fn from(card: &Card) -> Self {
        Self {
            a: encode_point(&card.a),
            b: encode_point(&card.b),
        }
    }
}

impl TryFrom<&CardHex> for Card {
    type Error = ProtocolError;

    fn try_from(card: &CardHex) -> Result<Self, Self::Error> {
        Ok(Self {
            a: decode_point(&card.a)?,
            b: decode_point(&card.b)?,
        })
    }
}

/// The 52 ciphertexts held by whichever participant currently owns the deck.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: Vec<Card>,
    original_cards: Vec<Card>,
    witness: WitnessRecord,
}

impl Deck {
    /// Session-initial deck: slot `s` holds plaintext `s + 1`, unmasked.
    pub fn new(group: &Group, codec: &CardCodec) -> Result<Self, ProtocolError> {
        let cards = (1..=DECK_SIZE)
            .map(|i| Card::fresh(group, codec, i))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            original_cards: cards.clone(),
            witness: WitnessRecord::identity(&cards),
            cards,
        })
    }

    pub(crate) fn from_parts(cards: Vec<Card>, original_cards: Vec<Card>, witness: WitnessRecord) -> Self {
        Self {
            cards,
            original_cards,
            witness,
        }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub(crate) fn cards_mut(&mut self) -> &mut Vec<Card> {
        &mut self.cards
    }

    /// Snapshot of the session-initial ordering.
    pub fn original_cards(&self) -> &[Card] {
        &self.original_cards
    }

    pub const fn witness(&self) -> &WitnessRecord {
        &self.witness
    }

    pub(crate) fn set_witness(&mut self, witness: WitnessRecord) {
        self.witness = witness;
    }

    pub fn card(&self, index: usize) -> Result<&Card, ProtocolError> {
        self.cards.get(index).ok_or_else(|| {
            ProtocolError::MalformedMessage(format!("card index {} out of range", index))
        })
    }

    /// Masks every card with its own fresh factor.
    pub fn mask(&mut self, group: &Group, key: &AggregateKey, rng: &mut (impl RngCore + CryptoRng)) {
        self.cards.iter_mut().for_each(|card| {
            let r = group.random_scalar(rng);
            *card = card.mask(group, key, &r);
        });
    }

    /// As [`Deck::mask`], also proving for each card that it was masked in place.
    pub fn mask_with_proofs(
        &mut self,
        group: &Group,
        key: &AggregateKey,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Vec<SigmaProof> {
        let mut proofs = Vec::with_capacity(self.cards.len());
        for card in self.cards.iter_mut() {
            let r = group.random_scalar(rng);
            let masked = card.mask(group, key, &r);
            let statement = masked.masking_statement(card, group, key);
            proofs.push(sigma::prove(group, &statement, &r, rng));
            *card = masked;
        }
        proofs
    }

    pub fn partial_decrypt(
        &self,
        index: usize,
        group: &Group,
        sk: &SecretKey,
    ) -> Result<UnmaskShare, ProtocolError> {
        Ok(self.card(index)?.partial_decrypt(group, sk))
    }

    pub fn unmask(
        &self,
        index: usize,
        group: &Group,
        codec: &CardCodec,
        shares: &[UnmaskShare],
    ) -> Result<usize, ProtocolError> {
        self.card(index)?.unmask(group, codec, shares)
    }

    pub fn hash(&self) -> [u8; 32] {
        let mut hasher = Keccak256::new();
        for card in &self.cards {
            hasher.update(card.to_bytes());
        }
        hasher.finalize().into()
    }
}

/// Checks that `masked[i]` is `before[i]` re-randomized under `key`, one proof per card.
pub fn verify_masking(
    group: &Group,
    key: &AggregateKey,
    before: &[Card],
    masked: &[Card],
    proofs: &[SigmaProof],
) -> Result<(), ProtocolError> {
    if before.len() != masked.len() || masked.len() != proofs.len() {
        return Err(ProtocolError::ProofVerificationFailed(format!(
            "masking proof count mismatch: {} cards before, {} after, {} proofs",
            before.len(),
            masked.len(),
            proofs.len()
        )));
    }

    for (index, ((b, m), proof)) in before.iter().zip(masked).zip(proofs).enumerate() {
        let statement = m.masking_statement(b, group, key);
        if !sigma::verify(group, &statement, proof) {
            return Err(ProtocolError::ProofVerificationFailed(format!(
                "card {} was not masked in place",
                index
            )));
        }
    }

    Ok(())
}
