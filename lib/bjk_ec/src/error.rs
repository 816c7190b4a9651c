//! Blindjack
//!
//! Mental Poker (1979) blackjack using ElGamal masking over BLS12-381.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcError {
    #[error("Malformed point: {0}")]
    MalformedPoint(String),

    #[error("Malformed scalar: {0}")]
    MalformedScalar(String),

    #[error("Point does not encode any of the 52 cards")]
    UnknownCardEncoding,

    #[error("Card index {0} outside of 1..=52")]
    CardOutOfRange(usize),
}
