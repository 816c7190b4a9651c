//! Blindjack
//!
//! Mental Poker (1979) blackjack using ElGamal masking over BLS12-381.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

pub mod aggregate;
pub mod backend;
pub mod config;
pub mod deck;
pub mod error;
pub mod messages;
pub mod session;
pub mod session_state;
pub mod shuffle;
pub mod table;

#[cfg(test)]
pub mod tests;
