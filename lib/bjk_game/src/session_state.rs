//! Blindjack
//!
//! Mental Poker (1979) blackjack using ElGamal masking over BLS12-381.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

use std::fmt;

pub const SESSION_STATE_KEY_EXCHANGE: u8 = 0;
pub const SESSION_STATE_MASK_SHUFFLE: u8 = 1;
pub const SESSION_STATE_READY: u8 = 2;
pub const SESSION_STATE_DEALING: u8 = 3;
pub const SESSION_STATE_REVEAL: u8 = 4;
pub const SESSION_STATE_TERMINAL: u8 = 5;

pub const DEALER_SEAT: usize = 0;
pub const PLAYER_SEAT: usize = 1;
pub const NUM_SEATS: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Dealer,
    Player,
}

impl Role {
    /// Seat in the key registry and in the mask-and-shuffle turn order.
    pub const fn seat(self) -> usize {
        match self {
            Role::Dealer => DEALER_SEAT,
            Role::Player => PLAYER_SEAT,
        }
    }

    pub const fn counterpart(self) -> Role {
        match self {
            Role::Dealer => Role::Player,
            Role::Player => Role::Dealer,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Dealer => f.write_str("dealer"),
            Role::Player => f.write_str("player"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    PlayerWon,
    PlayerLost,
    Aborted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    KeyExchange,
    /// Waiting for seat `turn` to mask and shuffle.
    MaskShuffle { turn: usize },
    Ready,
    Dealing,
    /// Both unmask shares of deck index `index` are being exchanged.
    Reveal { index: usize },
    Terminal(Outcome),
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::KeyExchange => f.write_str("KeyExchange"),
            SessionPhase::MaskShuffle { turn } => write!(f, "MaskShuffle{{turn: {}}}", turn),
            SessionPhase::Ready => f.write_str("Ready"),
            SessionPhase::Dealing => f.write_str("Dealing"),
            SessionPhase::Reveal { index } => write!(f, "Reveal{{index: {}}}", index),
            SessionPhase::Terminal(outcome) => write!(f, "Terminal({:?})", outcome),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SessionState {
    current_state: u8,
    current_turn: usize,
    current_index: usize,
    outcome: Option<Outcome>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub const fn new() -> Self {
        Self {
            current_state: SESSION_STATE_KEY_EXCHANGE,
            current_turn: 0,
            current_index: 0,
            outcome: None,
        }
    }

    pub const fn is_terminal(&self) -> bool {
        self.current_state == SESSION_STATE_TERMINAL
    }

    pub fn begin_mask_shuffle(&mut self, turn: usize) {
        self.current_state = SESSION_STATE_MASK_SHUFFLE;
        self.current_turn = turn;
    }

    pub fn set_ready(&mut self) {
        self.current_state = SESSION_STATE_READY;
    }

    pub fn set_dealing(&mut self) {
        self.current_state = SESSION_STATE_DEALING;
    }

    pub fn set_reveal(&mut self, index: usize) {
        self.current_state = SESSION_STATE_REVEAL;
        self.current_index = index;
    }

    pub fn finish(&mut self, outcome: Outcome) {
        self.current_state = SESSION_STATE_TERMINAL;
        self.outcome = Some(outcome);
    }

    pub const fn to_enum(&self) -> SessionPhase {
        match self.current_state {
            SESSION_STATE_KEY_EXCHANGE => SessionPhase::KeyExchange,
            SESSION_STATE_MASK_SHUFFLE => SessionPhase::MaskShuffle {
                turn: self.current_turn,
            },
            SESSION_STATE_READY => SessionPhase::Ready,
            SESSION_STATE_DEALING => SessionPhase::Dealing,
            SESSION_STATE_REVEAL => SessionPhase::Reveal {
                index: self.current_index,
            },
            _ => match self.outcome {
                Some(outcome) => SessionPhase::Terminal(outcome),
                None => SessionPhase::Terminal(Outcome::Aborted),
            },
        }
    }
}
