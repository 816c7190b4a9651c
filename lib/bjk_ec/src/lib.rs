//! Blindjack
//!
//! Mental Poker (1979) blackjack using ElGamal masking over BLS12-381.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

pub mod card_codec;
pub mod error;
pub mod group;
pub mod keys;
pub mod sigma;
pub mod types;
pub mod util;
