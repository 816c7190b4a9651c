//! Blindjack
//!
//! Mental Poker (1979) blackjack using ElGamal masking over BLS12-381.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

use bjk_ec::card_codec::DECK_SIZE;

use crate::error::ProtocolError;

pub const BLACKJACK: u32 = 21;

/// Which deck indexes went where. Cards are dealt strictly by increasing unused index.
#[derive(Clone, Debug, Default)]
pub struct TableState {
    next_index: usize,
    dealer_card: Option<usize>,
    player_cards: Vec<usize>,
    player_ranks: Vec<u8>,
    dealer_rank: Option<u8>,
}

impl TableState {
    pub fn new() -> Self {
        Self::default()
    }

    fn draw(&mut self) -> Result<usize, ProtocolError> {
        if self.next_index >= DECK_SIZE {
            return Err(ProtocolError::DeckExhausted);
        }
        let index = self.next_index;
        self.next_index += 1;
        Ok(index)
    }

    /// Dealer's face-down card.
    pub fn draw_dealer(&mut self) -> Result<usize, ProtocolError> {
        let index = self.draw()?;
        self.dealer_card = Some(index);
        Ok(index)
    }

    pub fn draw_player(&mut self) -> Result<usize, ProtocolError> {
        let index = self.draw()?;
        self.player_cards.push(index);
        Ok(index)
    }

    /// Player side: record a card the dealer announced. It has to be the next unused one.
    pub fn accept_player_card(&mut self, index: usize) -> Result<(), ProtocolError> {
        if index != self.next_index {
            return Err(ProtocolError::MalformedMessage(format!(
                "dealt index {} but next unused index is {}",
                index, self.next_index
            )));
        }
        self.draw_player().map(|_| ())
    }

    pub const fn dealer_card(&self) -> Option<usize> {
        self.dealer_card
    }

    pub fn player_cards(&self) -> &[usize] {
        &self.player_cards
    }

    pub fn is_player_card(&self, index: usize) -> bool {
        self.player_cards.contains(&index)
    }

    pub fn record_rank(&mut self, index: usize, rank: u8) {
        if self.dealer_card == Some(index) {
            self.dealer_rank = Some(rank);
        } else if self.is_player_card(index) {
            self.player_ranks.push(rank);
        }
    }

    pub fn all_player_cards_revealed(&self) -> bool {
        self.player_ranks.len() == self.player_cards.len()
    }

    pub fn player_total(&self) -> u32 {
        self.player_ranks.iter().map(|r| *r as u32).sum()
    }

    pub const fn dealer_rank(&self) -> Option<u8> {
        self.dealer_rank
    }

    pub fn is_player_bust(&self) -> bool {
        self.player_total() > BLACKJACK
    }
}

/// The player wins when their cards plus the dealer's single card stay within 21.
pub fn player_wins(player_total: u32, dealer_rank: u8) -> bool {
    player_total + dealer_rank as u32 <= BLACKJACK
}
