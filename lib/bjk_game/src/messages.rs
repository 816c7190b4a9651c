//! Blindjack
//!
//! Mental Poker (1979) blackjack using ElGamal masking over BLS12-381.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

use bjk_ec::{
    card_codec::{CardCodec, DECK_SIZE},
    group::Group,
    sigma::SigmaProofHex,
    types::PublicKey,
    util::{PointHex, decode_point, encode_point},
};
use serde::{Deserialize, Serialize};

use crate::{
    backend::ShuffleProof,
    deck::{Card, CardHex, Deck},
    error::ProtocolError,
    shuffle::WitnessRecord,
};

/// Everything exchanged between dealer and player, as `{"event": .., "data": ..}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum Message {
    #[serde(rename = "connected")]
    Connected,
    #[serde(rename = "player-declare-PK")]
    PlayerDeclarePk(DeclareKey),
    #[serde(rename = "dealer-declare-PK")]
    DealerDeclarePk(DeclareKey),
    #[serde(rename = "dealer-mask")]
    DealerMask,
    #[serde(rename = "dealer-shuffle")]
    DealerShuffle,
    #[serde(rename = "player-mask")]
    PlayerMask,
    #[serde(rename = "player-shuffle")]
    PlayerShuffle,
    #[serde(rename = "send-deck")]
    SendDeck(Box<DeckHandOff>),
    #[serde(rename = "game-start")]
    GameStart,
    #[serde(rename = "deal-card-player")]
    DealCardPlayer([usize; 1]),
    #[serde(rename = "reveal-dealer-card")]
    RevealDealerCard([usize; 1]),
    #[serde(rename = "dealer-unmask-card")]
    DealerUnmaskCard(UnmaskCard),
    #[serde(rename = "player-unmask-card")]
    PlayerUnmaskCard(UnmaskCard),
    #[serde(rename = "player-action")]
    PlayerAction(PlayerAction),
    /// `1` when the player won, `0` otherwise.
    #[serde(rename = "result")]
    GameResult(u8),
}

impl Message {
    pub const fn event_name(&self) -> &'static str {
        match self {
            Message::Connected => "connected",
            Message::PlayerDeclarePk(_) => "player-declare-PK",
            Message::DealerDeclarePk(_) => "dealer-declare-PK",
            Message::DealerMask => "dealer-mask",
            Message::DealerShuffle => "dealer-shuffle",
            Message::PlayerMask => "player-mask",
            Message::PlayerShuffle => "player-shuffle",
            Message::SendDeck(_) => "send-deck",
            Message::GameStart => "game-start",
            Message::DealCardPlayer(_) => "deal-card-player",
            Message::RevealDealerCard(_) => "reveal-dealer-card",
            Message::DealerUnmaskCard(_) => "dealer-unmask-card",
            Message::PlayerUnmaskCard(_) => "player-unmask-card",
            Message::PlayerAction(_) => "player-action",
            Message::GameResult(_) => "result",
        }
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(data: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(data)?)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclareKey {
    #[serde(rename = "publicKey")]
    pub public_key: PointHex,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<SigmaProofHex>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmaskCard {
    #[serde(rename = "cardIndex")]
    pub card_index: usize,
    #[serde(rename = "unmaskKey")]
    pub unmask_key: PointHex,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<SigmaProofHex>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PlayerAction {
    Hit,
    Stand,
}

/// Serialized deck: the key set it is masked under, its witness and its cards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckWire {
    pub public_keys: Vec<PointHex>,
    pub witness_data: WitnessRecord,
    pub cards: Vec<CardHex>,
}

/// Payload of `send-deck`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeckHandOff {
    #[serde(flatten)]
    pub deck: DeckWire,
    pub proof: ShuffleProof,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_proofs: Option<Vec<SigmaProofHex>>,
}

impl Deck {
    pub fn to_wire(&self, public_keys: &[PublicKey]) -> DeckWire {
        DeckWire {
            public_keys: public_keys.iter().map(encode_point).collect(),
            witness_data: self.witness().clone(),
            cards: self.cards().iter().map(CardHex::from).collect(),
        }
    }

    /// Rebuilds a deck and its key list. The session-initial snapshot is public and is
    /// recomputed rather than transmitted.
    pub fn from_wire(
        wire: &DeckWire,
        group: &Group,
        codec: &CardCodec,
    ) -> Result<(Self, Vec<PublicKey>), ProtocolError> {
        let public_keys = wire
            .public_keys
            .iter()
            .map(decode_point)
            .collect::<Result<Vec<_>, _>>()?;

        if wire.cards.len() != DECK_SIZE {
            return Err(ProtocolError::InvalidPermutationWitness(format!(
                "deck has {} cards",
                wire.cards.len()
            )));
        }
        let cards = wire
            .cards
            .iter()
            .map(Card::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let original_cards = Deck::new(group, codec)?.original_cards().to_vec();
        Ok((
            Deck::from_parts(cards, original_cards, wire.witness_data.clone()),
            public_keys,
        ))
    }
}
